//! Event arithmetic for the offset and limit windows.
//!
//! Both the data-level and adapter-level windows translate upstream events
//! with the same arithmetic, so it lives here as pure functions of the
//! window parameter, the upstream size after the event, and the event
//! itself. The upstream size before the event is recovered from the event's
//! own delta.
//!
//! The limit translation is the subtlest arithmetic in the library: an
//! insertion or removal that straddles the limit boundary must be split so
//! that the emitted deltas sum exactly to `sizeAfter - sizeBefore`, both
//! clamped to the limit.

use crate::event::ListEvent;

/// Translate an upstream event through an offset window.
///
/// `inner_after` is the upstream size after the event was applied. Events
/// entirely below the offset are dropped; straddling events are clipped to
/// the visible portion. Moves degrade to a coarse change unless they are
/// entirely hidden.
pub(crate) fn offset_events(offset: usize, inner_after: usize, event: &ListEvent) -> Vec<ListEvent> {
    match *event {
        ListEvent::Changed => vec![ListEvent::changed()],
        ListEvent::RangeChanged { start, count } => {
            if start + count <= offset {
                return Vec::new();
            }
            let clipped = count.min(start + count - offset);
            vec![ListEvent::range_changed(start.saturating_sub(offset), clipped)]
        }
        ListEvent::RangeInserted { start, count } => {
            let inner_before = inner_after - count;
            let delta = inner_after.saturating_sub(offset) - inner_before.saturating_sub(offset);
            if delta == 0 {
                return Vec::new();
            }
            vec![ListEvent::inserted(start.saturating_sub(offset), delta)]
        }
        ListEvent::RangeRemoved { start, count } => {
            let inner_before = inner_after + count;
            let delta = inner_before.saturating_sub(offset) - inner_after.saturating_sub(offset);
            if delta == 0 {
                return Vec::new();
            }
            vec![ListEvent::removed(start.saturating_sub(offset), delta)]
        }
        ListEvent::RangeMoved { from, to, count } => {
            if from + count <= offset && to + count <= offset {
                return Vec::new();
            }
            vec![ListEvent::changed()]
        }
    }
}

/// The size delta and replacement events produced by changing the offset
/// itself. Deltas surface at the head of the window.
pub(crate) fn offset_update_events(
    old_offset: usize,
    new_offset: usize,
    inner: usize,
) -> Vec<ListEvent> {
    let old_size = inner.saturating_sub(old_offset);
    let new_size = inner.saturating_sub(new_offset);
    if new_size > old_size {
        vec![ListEvent::inserted(0, new_size - old_size)]
    } else if old_size > new_size {
        vec![ListEvent::removed(0, old_size - new_size)]
    } else {
        Vec::new()
    }
}

/// Translate an upstream event through a limit window.
///
/// `inner_after` is the upstream size after the event was applied.
pub(crate) fn limit_events(limit: usize, inner_after: usize, event: &ListEvent) -> Vec<ListEvent> {
    match *event {
        ListEvent::Changed => vec![ListEvent::changed()],
        ListEvent::RangeChanged { start, count } => {
            if start >= limit {
                return Vec::new();
            }
            vec![ListEvent::range_changed(start, count.min(limit - start))]
        }
        ListEvent::RangeInserted { start, count } => {
            if start >= limit {
                return Vec::new();
            }
            let inner_before = inner_after - count;
            let size_before = inner_before.min(limit);
            if size_before >= limit {
                // Window was already full: the insertion shifts every
                // visible item at and after `start`, but the count is
                // unchanged.
                return vec![ListEvent::range_changed(start, limit - start)];
            }
            let insert_count = count.min(limit - start);
            let evicted = (size_before + insert_count).saturating_sub(limit);
            let mut events = Vec::with_capacity(2);
            if evicted > 0 {
                events.push(ListEvent::removed(size_before - evicted, evicted));
            }
            events.push(ListEvent::inserted(start, insert_count));
            events
        }
        ListEvent::RangeRemoved { start, count } => {
            if start >= limit {
                return Vec::new();
            }
            if inner_after >= limit {
                // Enough items remain beyond the boundary to backfill the
                // window completely.
                return vec![ListEvent::range_changed(start, limit - start)];
            }
            let inner_before = inner_after + count;
            let size_before = inner_before.min(limit);
            let removed = count.min(limit - start);
            let kept = size_before - removed;
            let size_after = inner_after.min(limit);
            let mut events = Vec::with_capacity(2);
            events.push(ListEvent::removed(start, removed));
            if size_after > kept {
                events.push(ListEvent::inserted(kept, size_after - kept));
            }
            events
        }
        ListEvent::RangeMoved { from, to, count } => {
            if from + count <= limit && to + count <= limit {
                return vec![ListEvent::moved(from, to, count)];
            }
            vec![ListEvent::changed()]
        }
    }
}

/// The size delta produced by changing the limit itself.
pub(crate) fn limit_update_events(
    old_limit: usize,
    new_limit: usize,
    inner: usize,
) -> Vec<ListEvent> {
    let old_size = inner.min(old_limit);
    let new_size = inner.min(new_limit);
    if new_size > old_size {
        vec![ListEvent::inserted(old_size, new_size - old_size)]
    } else if old_size > new_size {
        vec![ListEvent::removed(new_size, old_size - new_size)]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inserted(start: usize, count: usize) -> ListEvent {
        ListEvent::inserted(start, count)
    }

    fn removed(start: usize, count: usize) -> ListEvent {
        ListEvent::removed(start, count)
    }

    fn changed(start: usize, count: usize) -> ListEvent {
        ListEvent::range_changed(start, count)
    }

    // Limit fixtures: each case is (limit, size before, event).

    #[test]
    fn test_limit_insert_out_of_bounds_dropped() {
        assert!(limit_events(5, 11, &inserted(10, 1)).is_empty());
    }

    #[test]
    fn test_limit_insert_boundary_straddling() {
        // limit 5, size 3, insert(1, 3): one eviction plus the insertion.
        assert_eq!(
            limit_events(5, 6, &inserted(1, 3)),
            vec![removed(2, 1), inserted(1, 3)]
        );
    }

    #[test]
    fn test_limit_insert_into_full_window_is_change() {
        // limit 5, size 10, insert(0, 4).
        assert_eq!(limit_events(5, 14, &inserted(0, 4)), vec![changed(0, 5)]);
        // limit 5, size 10, insert(4, 2).
        assert_eq!(limit_events(5, 12, &inserted(4, 2)), vec![changed(4, 1)]);
        // limit 5, size 5, insert(0, 5).
        assert_eq!(limit_events(5, 10, &inserted(0, 5)), vec![changed(0, 5)]);
    }

    #[test]
    fn test_limit_insert_straddling_non_empty() {
        // limit 3, size 1, insert(0, 6).
        assert_eq!(
            limit_events(3, 7, &inserted(0, 6)),
            vec![removed(0, 1), inserted(0, 3)]
        );
        // limit 4, size 2, insert(1, 6).
        assert_eq!(
            limit_events(4, 8, &inserted(1, 6)),
            vec![removed(1, 1), inserted(1, 3)]
        );
        // limit 7, size 6, insert(3, 6).
        assert_eq!(
            limit_events(7, 12, &inserted(3, 6)),
            vec![removed(3, 3), inserted(3, 4)]
        );
    }

    #[test]
    fn test_limit_insert_append_within_window() {
        // limit 5, size 2, append 2.
        assert_eq!(limit_events(5, 4, &inserted(2, 2)), vec![inserted(2, 2)]);
        // limit 5, size 0, append 2.
        assert_eq!(limit_events(5, 2, &inserted(0, 2)), vec![inserted(0, 2)]);
    }

    #[test]
    fn test_limit_remove_out_of_bounds_dropped() {
        assert!(limit_events(5, 9, &removed(5, 1)).is_empty());
    }

    #[test]
    fn test_limit_remove_all() {
        // limit 5, size 8, remove everything.
        assert_eq!(limit_events(5, 0, &removed(0, 8)), vec![removed(0, 5)]);
    }

    #[test]
    fn test_limit_remove_boundary_straddling_split() {
        // limit 5, size 9, remove(2, 5).
        assert_eq!(
            limit_events(5, 4, &removed(2, 5)),
            vec![removed(2, 3), inserted(2, 2)]
        );
        // limit 5, size 9, remove(1, 5).
        assert_eq!(
            limit_events(5, 4, &removed(1, 5)),
            vec![removed(1, 4), inserted(1, 3)]
        );
    }

    #[test]
    fn test_limit_remove_backfilled_entirely_is_change() {
        // limit 5, size 10, remove(0, 2): backfill keeps the window full.
        assert_eq!(limit_events(5, 8, &removed(0, 2)), vec![changed(0, 5)]);
    }

    #[test]
    fn test_limit_remove_within_window() {
        assert_eq!(limit_events(5, 4, &removed(4, 1)), vec![removed(4, 1)]);
        assert_eq!(limit_events(5, 4, &removed(2, 1)), vec![removed(2, 1)]);
    }

    #[test]
    fn test_limit_change_clipped() {
        assert_eq!(limit_events(5, 10, &changed(3, 3)), vec![changed(3, 2)]);
        assert_eq!(limit_events(5, 10, &changed(0, 3)), vec![changed(0, 3)]);
        assert!(limit_events(5, 10, &changed(5, 1)).is_empty());
    }

    #[test]
    fn test_limit_move_inside_forwards_outside_coarsens() {
        assert_eq!(
            limit_events(5, 10, &ListEvent::moved(0, 1, 1)),
            vec![ListEvent::moved(0, 1, 1)]
        );
        assert_eq!(
            limit_events(5, 10, &ListEvent::moved(0, 6, 1)),
            vec![ListEvent::changed()]
        );
    }

    #[test]
    fn test_limit_update_delta() {
        assert_eq!(limit_update_events(5, 10, 10), vec![inserted(5, 5)]);
        assert_eq!(limit_update_events(5, 0, 10), vec![removed(0, 5)]);
        assert!(limit_update_events(5, 7, 5).is_empty());
    }

    // Offset fixtures.

    #[test]
    fn test_offset_change_clipped() {
        assert_eq!(offset_events(5, 10, &changed(3, 3)), vec![changed(0, 1)]);
        assert!(offset_events(5, 10, &changed(2, 1)).is_empty());
        assert_eq!(offset_events(5, 10, &changed(7, 2)), vec![changed(2, 2)]);
    }

    #[test]
    fn test_offset_insert_delta() {
        // offset 5, size 10 -> 13, insert(3, 3): window grows by 3 at the head.
        assert_eq!(offset_events(5, 13, &inserted(3, 3)), vec![inserted(0, 3)]);
        // Insert below the offset while the window is empty and stays empty.
        assert!(offset_events(5, 4, &inserted(1, 2)).is_empty());
        // Partially filling the hidden region.
        assert_eq!(offset_events(5, 7, &inserted(0, 4)), vec![inserted(0, 2)]);
    }

    #[test]
    fn test_offset_remove_delta() {
        // offset 5, size 10 -> 0.
        assert_eq!(offset_events(5, 0, &removed(0, 10)), vec![removed(0, 5)]);
        // Removal entirely below the offset with a non-empty window shrinks
        // the window from the head.
        assert_eq!(offset_events(5, 8, &removed(0, 2)), vec![removed(0, 2)]);
        // Removal below the offset with nothing visible before or after.
        assert!(offset_events(5, 3, &removed(0, 1)).is_empty());
    }

    #[test]
    fn test_offset_move_hidden_dropped() {
        assert!(offset_events(5, 10, &ListEvent::moved(0, 1, 2)).is_empty());
        assert_eq!(
            offset_events(5, 10, &ListEvent::moved(0, 6, 2)),
            vec![ListEvent::changed()]
        );
    }

    #[test]
    fn test_offset_update_delta() {
        assert_eq!(offset_update_events(5, 2, 10), vec![inserted(0, 3)]);
        assert_eq!(offset_update_events(2, 5, 10), vec![removed(0, 3)]);
        assert!(offset_update_events(10, 12, 8).is_empty());
    }

    #[test]
    fn test_net_delta_matches_clamped_sizes() {
        // Property spot-checks: the emitted deltas must sum to the clamped
        // size difference for a grid of limit insertions and removals.
        for limit in 0..8 {
            for before in 0..8 {
                for start in 0..=before {
                    for count in 1..4 {
                        let after = before + count;
                        let delta: isize = limit_events(limit, after, &inserted(start, count))
                            .iter()
                            .map(event_delta)
                            .sum();
                        assert_eq!(
                            delta,
                            after.min(limit) as isize - before.min(limit) as isize,
                            "insert limit={limit} before={before} start={start} count={count}"
                        );
                    }
                    for count in 1..=(before - start) {
                        let after = before - count;
                        let delta: isize = limit_events(limit, after, &removed(start, count))
                            .iter()
                            .map(event_delta)
                            .sum();
                        assert_eq!(
                            delta,
                            after.min(limit) as isize - before.min(limit) as isize,
                            "remove limit={limit} before={before} start={start} count={count}"
                        );
                    }
                }
            }
        }
    }

    fn event_delta(event: &ListEvent) -> isize {
        match *event {
            ListEvent::RangeInserted { count, .. } => count as isize,
            ListEvent::RangeRemoved { count, .. } => -(count as isize),
            _ => 0,
        }
    }
}
