//! Change events describing list transitions.

/// A change notification emitted on a rows channel.
///
/// Every event describes the transition from the list's previous state to
/// its current one, in the emitting node's own position space. By the time
/// observers run, the node already reports the new state: a
/// `RangeInserted { start: 2, count: 3 }` means positions 2..5 hold the new
/// items right now.
///
/// Range events never cover zero items; emission helpers drop empty ranges
/// before any observer sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEvent {
    /// Anything may have changed, including the item count. Observers must
    /// re-read whatever they were tracking.
    Changed,
    /// `count` items starting at `start` changed in place. The item count
    /// is unchanged.
    RangeChanged { start: usize, count: usize },
    /// `count` new items now occupy positions `start .. start + count`.
    /// Prior items at and after `start` shifted up.
    RangeInserted { start: usize, count: usize },
    /// `count` items were removed from positions `start .. start + count`.
    /// Later items shifted down.
    RangeRemoved { start: usize, count: usize },
    /// A contiguous block of `count` items relocated from `from` to `to`,
    /// where `to` is the destination measured after the block was taken out.
    RangeMoved { from: usize, to: usize, count: usize },
}

impl ListEvent {
    /// A coarse change covering the whole list.
    pub fn changed() -> Self {
        Self::Changed
    }

    /// An in-place change of `count` items at `start`.
    pub fn range_changed(start: usize, count: usize) -> Self {
        Self::RangeChanged { start, count }
    }

    /// An insertion of `count` items at `start`.
    pub fn inserted(start: usize, count: usize) -> Self {
        Self::RangeInserted { start, count }
    }

    /// A removal of `count` items at `start`.
    pub fn removed(start: usize, count: usize) -> Self {
        Self::RangeRemoved { start, count }
    }

    /// A relocation of `count` items from `from` to `to`.
    pub fn moved(from: usize, to: usize, count: usize) -> Self {
        Self::RangeMoved { from, to, count }
    }

    /// Whether this is a range event covering zero items.
    ///
    /// Such events carry no information and are suppressed at emission.
    pub fn is_empty_range(&self) -> bool {
        match *self {
            Self::Changed => false,
            Self::RangeChanged { count, .. }
            | Self::RangeInserted { count, .. }
            | Self::RangeRemoved { count, .. }
            | Self::RangeMoved { count, .. } => count == 0,
        }
    }
}

static_assertions::assert_impl_all!(ListEvent: Send, Sync, Copy);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_range_detection() {
        assert!(ListEvent::inserted(3, 0).is_empty_range());
        assert!(ListEvent::removed(0, 0).is_empty_range());
        assert!(ListEvent::range_changed(5, 0).is_empty_range());
        assert!(ListEvent::moved(1, 2, 0).is_empty_range());

        assert!(!ListEvent::changed().is_empty_range());
        assert!(!ListEvent::inserted(3, 1).is_empty_range());
    }
}
