//! Expandable root rows with nested child adapters.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers, ThreadAffinity};

use crate::adapter::{Adapter, AdapterSlot, ViewHandle, ViewKind};
use crate::event::ListEvent;

type ChildFactory = Box<dyn Fn(usize) -> Arc<dyn Adapter> + Send + Sync>;

/// Root rows from one adapter, each optionally followed by the rows of a
/// child adapter supplied on demand.
///
/// Expansion state is keyed by root position and re-keyed when roots are
/// inserted, removed, or moved, so an expanded root stays expanded as it
/// shifts. The factory is queried when a root expands and re-queried when a
/// root reports a change; a different instance swaps the child rows
/// wholesale. Collapsed children are not observed at all.
///
/// Outer layout is resolved through a lazily rebuilt table of per-root
/// start positions with a floor lookup, the same way [`ConcatAdapter`]
/// routes, except every root always occupies its own row.
///
/// [`ConcatAdapter`]: crate::adapter::ConcatAdapter
pub struct TreeAdapter {
    inner: Arc<TreeNode>,
}

struct TreeNode {
    roots: Box<dyn Adapter>,
    children: ChildFactory,
    auto_expand: Mutex<bool>,
    state: Mutex<TreeState>,
    observers: Observers<ListEvent>,
    root_link: Mutex<Option<ConnectionId>>,
    affinity: ThreadAffinity,
}

struct TreeState {
    entries: BTreeMap<usize, Entry>,
    /// Per-root outer starts plus the total, cached only while observed.
    groups: Option<Groups>,
}

struct Entry {
    child: Arc<dyn Adapter>,
    link: Option<ConnectionId>,
}

#[derive(Clone)]
struct Groups {
    starts: Vec<usize>,
    total: usize,
}

/// Identity of a child instance, used to route relayed events back to the
/// owning entry after re-keying.
fn token_of(child: &Arc<dyn Adapter>) -> usize {
    Arc::as_ptr(child) as *const () as usize
}

impl Clone for TreeAdapter {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl TreeAdapter {
    /// Present `roots` with child adapters from `children`.
    ///
    /// The factory receives the root's current position and must return the
    /// same instance for as long as the root's content is unchanged.
    pub fn new<R, F>(roots: R, children: F) -> Self
    where
        R: Adapter,
        F: Fn(usize) -> Arc<dyn Adapter> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(TreeNode {
                roots: Box::new(roots),
                children: Box::new(children),
                auto_expand: Mutex::new(false),
                state: Mutex::new(TreeState {
                    entries: BTreeMap::new(),
                    groups: None,
                }),
                observers: Observers::new(),
                root_link: Mutex::new(None),
                affinity: ThreadAffinity::current(),
            }),
        }
    }

    /// Expand new roots automatically, and every root on activation.
    pub fn set_auto_expand(&self, auto_expand: bool) {
        self.inner.affinity.debug_assert_owner();
        *self.inner.auto_expand.lock() = auto_expand;
    }

    /// Whether `root` is currently expanded.
    pub fn is_expanded(&self, root: usize) -> bool {
        self.inner.state.lock().entries.contains_key(&root)
    }

    /// Expand or collapse `root`. Idempotent; works while dormant, in which
    /// case the state is honored without events.
    ///
    /// # Panics
    ///
    /// Panics if `root` is not a root position.
    pub fn set_expanded(&self, root: usize, expanded: bool) {
        self.inner.affinity.debug_assert_owner();
        let roots = self.inner.roots.count();
        assert!(root < roots, "root {root} out of bounds (count {roots})");
        if expanded {
            self.inner.expand(root);
        } else {
            self.inner.collapse(root);
        }
    }

    /// Flip the expansion of `root`.
    pub fn toggle(&self, root: usize) {
        self.set_expanded(root, !self.is_expanded(root));
    }

    /// Expand or collapse every root.
    pub fn set_all_expanded(&self, expanded: bool) {
        if expanded {
            for root in 0..self.inner.roots.count() {
                self.set_expanded(root, true);
            }
        } else {
            let expanded_roots: Vec<usize> =
                self.inner.state.lock().entries.keys().copied().collect();
            for root in expanded_roots {
                self.set_expanded(root, false);
            }
        }
    }
}

impl TreeNode {
    fn active(&self) -> bool {
        !self.observers.is_empty()
    }

    /// Child rows contributed by expanded roots below `root`.
    fn child_rows_below(entries: &BTreeMap<usize, Entry>, root: usize) -> usize {
        entries
            .range(..root)
            .map(|(_, entry)| entry.child.count())
            .sum()
    }

    fn build_groups(&self, entries: &BTreeMap<usize, Entry>) -> Groups {
        let roots = self.roots.count();
        let mut starts = Vec::with_capacity(roots);
        let mut total = 0;
        for root in 0..roots {
            starts.push(total);
            total += 1;
            if let Some(entry) = entries.get(&root) {
                total += entry.child.count();
            }
        }
        Groups { starts, total }
    }

    fn groups(&self, state: &mut TreeState) -> Groups {
        if let Some(groups) = state.groups.as_ref() {
            return groups.clone();
        }
        let groups = self.build_groups(&state.entries);
        if self.active() {
            state.groups = Some(groups.clone());
        }
        groups
    }

    /// Resolve an outer position to its root and, for child rows, the
    /// position within the root's child adapter.
    fn route(&self, position: usize) -> (usize, Option<usize>) {
        let mut state = self.state.lock();
        let groups = self.groups(&mut state);
        assert!(
            position < groups.total,
            "position {position} out of bounds (count {})",
            groups.total
        );
        let root = groups.starts.partition_point(|&start| start <= position) - 1;
        let inner = position - groups.starts[root];
        (root, inner.checked_sub(1))
    }

    fn connect_child(self: &Arc<Self>, child: &Arc<dyn Adapter>) -> ConnectionId {
        let token = token_of(child);
        let weak: Weak<TreeNode> = Arc::downgrade(self);
        child.connect_rows(Box::new(move |event| {
            if let Some(node) = weak.upgrade() {
                node.on_child_rows(token, event);
            }
        }))
    }

    fn expand(self: &Arc<Self>, root: usize) {
        if self.state.lock().entries.contains_key(&root) {
            return;
        }
        let child = (self.children)(root);
        let active = self.active();
        let link = active.then(|| self.connect_child(&child));
        let event = {
            let mut state = self.state.lock();
            let outer = root + Self::child_rows_below(&state.entries, root);
            let count = child.count();
            state.entries.insert(root, Entry { child, link });
            state.groups = None;
            ListEvent::inserted(outer + 1, count)
        };
        tracing::debug!(target: "trellis::adapter", root, "root expanded");
        if active && !event.is_empty_range() {
            self.observers.emit(&event);
        }
    }

    fn collapse(&self, root: usize) {
        let (entry, event) = {
            let mut state = self.state.lock();
            let Some(entry) = state.entries.remove(&root) else {
                return;
            };
            state.groups = None;
            let outer = root + Self::child_rows_below(&state.entries, root);
            let event = ListEvent::removed(outer + 1, entry.child.count());
            (entry, event)
        };
        if let Some(link) = entry.link {
            entry.child.disconnect_rows(link);
        }
        if self.active() && !event.is_empty_range() {
            self.observers.emit(&event);
        }
    }

    fn on_root_rows(self: &Arc<Self>, event: &ListEvent) {
        match *event {
            ListEvent::RangeInserted { start, count } => self.on_roots_inserted(start, count),
            ListEvent::RangeRemoved { start, count } => self.on_roots_removed(start, count),
            ListEvent::RangeMoved { from, to, count } => self.on_roots_moved(from, to, count),
            ListEvent::RangeChanged { start, count } => self.on_roots_changed(start, count),
            ListEvent::Changed => self.on_roots_reset(),
        }
    }

    fn on_roots_inserted(self: &Arc<Self>, start: usize, count: usize) {
        let outer = {
            let mut state = self.state.lock();
            let shifted: Vec<(usize, Entry)> = state
                .entries
                .split_off(&start)
                .into_iter()
                .map(|(root, entry)| (root + count, entry))
                .collect();
            state.entries.extend(shifted);
            state.groups = None;
            start + Self::child_rows_below(&state.entries, start)
        };
        let mut added = 0;
        if *self.auto_expand.lock() {
            for root in start..start + count {
                let child = (self.children)(root);
                let link = self.connect_child(&child);
                added += child.count();
                let mut state = self.state.lock();
                state.entries.insert(
                    root,
                    Entry {
                        child,
                        link: Some(link),
                    },
                );
            }
        }
        self.observers.emit(&ListEvent::inserted(outer, count + added));
    }

    fn on_roots_removed(&self, start: usize, count: usize) {
        let (dropped, event) = {
            let mut state = self.state.lock();
            let mut tail = state.entries.split_off(&start);
            let keep = tail.split_off(&(start + count));
            let dropped: Vec<Entry> = tail.into_values().collect();
            state
                .entries
                .extend(keep.into_iter().map(|(root, entry)| (root - count, entry)));
            state.groups = None;
            let child_rows: usize = dropped.iter().map(|entry| entry.child.count()).sum();
            let outer = start + Self::child_rows_below(&state.entries, start);
            (dropped, ListEvent::removed(outer, count + child_rows))
        };
        for entry in dropped {
            if let Some(link) = entry.link {
                entry.child.disconnect_rows(link);
            }
        }
        self.observers.emit(&event);
    }

    fn on_roots_moved(&self, from: usize, to: usize, count: usize) {
        let event = {
            let mut state = self.state.lock();
            let from_outer = from + Self::child_rows_below(&state.entries, from);
            let entries = std::mem::take(&mut state.entries);
            let mut block_rows = 0;
            let mut to_outer = to;
            let mut rekeyed = BTreeMap::new();
            for (root, entry) in entries {
                let new_root = if root >= from && root < from + count {
                    block_rows += entry.child.count();
                    to + (root - from)
                } else {
                    let removed = if root >= from + count { root - count } else { root };
                    if removed < to {
                        to_outer += entry.child.count();
                        removed
                    } else {
                        removed + count
                    }
                };
                rekeyed.insert(new_root, entry);
            }
            state.entries = rekeyed;
            state.groups = None;
            ListEvent::moved(from_outer, to_outer, count + block_rows)
        };
        self.observers.emit(&event);
    }

    fn on_roots_changed(self: &Arc<Self>, start: usize, count: usize) {
        for root in start..start + count {
            let expanded = self.state.lock().entries.contains_key(&root);
            let mut swap_events = Vec::new();
            if expanded {
                let fresh = (self.children)(root);
                let stale = {
                    let state = self.state.lock();
                    let entry = &state.entries[&root];
                    !Arc::ptr_eq(&entry.child, &fresh)
                };
                if stale {
                    let link = self.connect_child(&fresh);
                    let (old, events) = {
                        let mut state = self.state.lock();
                        let outer = root + Self::child_rows_below(&state.entries, root);
                        let old = state
                            .entries
                            .insert(
                                root,
                                Entry {
                                    child: fresh.clone(),
                                    link: Some(link),
                                },
                            )
                            .expect("changed root lost its expansion entry");
                        state.groups = None;
                        let old_count = old.child.count();
                        (
                            old,
                            vec![
                                ListEvent::removed(outer + 1, old_count),
                                ListEvent::inserted(outer + 1, fresh.count()),
                            ],
                        )
                    };
                    if let Some(link) = old.link {
                        old.child.disconnect_rows(link);
                    }
                    swap_events = events;
                }
            }
            let changed = {
                let state = self.state.lock();
                let outer = root + Self::child_rows_below(&state.entries, root);
                ListEvent::range_changed(outer, 1)
            };
            for event in swap_events {
                if !event.is_empty_range() {
                    self.observers.emit(&event);
                }
            }
            self.observers.emit(&changed);
        }
    }

    /// A coarse root change invalidates position keys entirely: drop every
    /// entry, re-expand if auto-expansion is on, and pass the coarse change
    /// through.
    fn on_roots_reset(self: &Arc<Self>) {
        let dropped: Vec<Entry> = {
            let mut state = self.state.lock();
            state.groups = None;
            std::mem::take(&mut state.entries).into_values().collect()
        };
        for entry in dropped {
            if let Some(link) = entry.link {
                entry.child.disconnect_rows(link);
            }
        }
        if *self.auto_expand.lock() {
            for root in 0..self.roots.count() {
                let child = (self.children)(root);
                let link = self.connect_child(&child);
                self.state.lock().entries.insert(
                    root,
                    Entry {
                        child,
                        link: Some(link),
                    },
                );
            }
        }
        self.observers.emit(&ListEvent::changed());
    }

    fn on_child_rows(&self, token: usize, event: &ListEvent) {
        let outer = {
            let mut state = self.state.lock();
            let Some((&root, _)) = state
                .entries
                .iter()
                .find(|(_, entry)| token_of(&entry.child) == token)
            else {
                return;
            };
            if matches!(
                event,
                ListEvent::Changed
                    | ListEvent::RangeInserted { .. }
                    | ListEvent::RangeRemoved { .. }
            ) {
                state.groups = None;
            }
            let base = root + Self::child_rows_below(&state.entries, root) + 1;
            match *event {
                ListEvent::Changed => ListEvent::changed(),
                ListEvent::RangeChanged { start, count } => {
                    ListEvent::range_changed(base + start, count)
                }
                ListEvent::RangeInserted { start, count } => ListEvent::inserted(base + start, count),
                ListEvent::RangeRemoved { start, count } => ListEvent::removed(base + start, count),
                ListEvent::RangeMoved { from, to, count } => {
                    ListEvent::moved(base + from, base + to, count)
                }
            }
        };
        if !outer.is_empty_range() {
            self.observers.emit(&outer);
        }
    }
}

impl Adapter for TreeAdapter {
    fn count(&self) -> usize {
        let mut state = self.inner.state.lock();
        self.inner.groups(&mut state).total
    }

    fn view_kind(&self, position: usize) -> ViewKind {
        match self.inner.route(position) {
            (root, None) => self.inner.roots.view_kind(root),
            (root, Some(inner)) => self.inner.state.lock().entries[&root].child.view_kind(inner),
        }
    }

    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        if let Some(view) = self.inner.roots.try_create_view(kind) {
            return Some(view);
        }
        let children: Vec<Arc<dyn Adapter>> = {
            let state = self.inner.state.lock();
            state.entries.values().map(|entry| entry.child.clone()).collect()
        };
        children.iter().find_map(|child| child.try_create_view(kind))
    }

    fn bind_view(&self, position: usize, view: &mut ViewHandle) {
        match self.inner.route(position) {
            (root, None) => self.inner.roots.bind_view(root, view),
            (root, Some(inner)) => {
                let child = self.inner.state.lock().entries[&root].child.clone();
                child.bind_view(inner, view)
            }
        }
    }

    fn is_interactive(&self, position: usize) -> bool {
        match self.inner.route(position) {
            (root, None) => self.inner.roots.is_interactive(root),
            (root, Some(inner)) => self.inner.state.lock().entries[&root]
                .child
                .is_interactive(inner),
        }
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        match self.inner.route(position) {
            (root, None) => self.inner.roots.stable_id(root),
            (root, Some(inner)) => self.inner.state.lock().entries[&root].child.stable_id(inner),
        }
    }

    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId {
        let first = self.inner.observers.is_empty();
        let id = self.inner.observers.connect(move |event| slot(event));
        if first {
            if *self.inner.auto_expand.lock() {
                // Activation expansion happens before anything can observe
                // the counts, so it is eventless by construction.
                for root in 0..self.inner.roots.count() {
                    if !self.inner.state.lock().entries.contains_key(&root) {
                        let child = (self.inner.children)(root);
                        self.inner
                            .state
                            .lock()
                            .entries
                            .insert(root, Entry { child, link: None });
                    }
                }
            }
            let weak: Weak<TreeNode> = Arc::downgrade(&self.inner);
            *self.inner.root_link.lock() =
                Some(self.inner.roots.connect_rows(Box::new(move |event| {
                    if let Some(node) = weak.upgrade() {
                        node.on_root_rows(event);
                    }
                })));
            let children: Vec<(usize, Arc<dyn Adapter>)> = {
                let state = self.inner.state.lock();
                state
                    .entries
                    .iter()
                    .map(|(&root, entry)| (root, entry.child.clone()))
                    .collect()
            };
            for (root, child) in children {
                let link = self.inner.connect_child(&child);
                let mut state = self.inner.state.lock();
                match state.entries.get_mut(&root) {
                    Some(entry) => entry.link = Some(link),
                    None => child.disconnect_rows(link),
                }
            }
            let mut state = self.inner.state.lock();
            let groups = self.inner.build_groups(&state.entries);
            state.groups = Some(groups);
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.observers.disconnect(id);
        if self.inner.observers.is_empty() {
            if let Some(link) = self.inner.root_link.lock().take() {
                self.inner.roots.disconnect_rows(link);
            }
            let detached: Vec<(Arc<dyn Adapter>, ConnectionId)> = {
                let mut state = self.inner.state.lock();
                state.groups = None;
                state
                    .entries
                    .values_mut()
                    .filter_map(|entry| entry.link.take().map(|link| (entry.child.clone(), link)))
                    .collect()
            };
            for (child, link) in detached {
                child.disconnect_rows(link);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterExt;
    use crate::test_util::{Recorder, ShadowVerifier, StubAdapter};

    struct Fixture {
        roots: StubAdapter,
        kids: Vec<StubAdapter>,
        table: Arc<Mutex<Vec<Arc<dyn Adapter>>>>,
        tree: TreeAdapter,
    }

    fn fixture(kid_counts: &[usize]) -> Fixture {
        let roots = StubAdapter::with_count(kid_counts.len());
        let kids: Vec<StubAdapter> = kid_counts
            .iter()
            .map(|&count| StubAdapter::with_count(count))
            .collect();
        let table: Arc<Mutex<Vec<Arc<dyn Adapter>>>> = Arc::new(Mutex::new(
            kids.iter()
                .map(|kid| Arc::new(kid.clone()) as Arc<dyn Adapter>)
                .collect(),
        ));
        let lookup = table.clone();
        let tree = TreeAdapter::new(roots.clone(), move |root| lookup.lock()[root].clone());
        Fixture {
            roots,
            kids,
            table,
            tree,
        }
    }

    #[test]
    fn test_expand_and_collapse_emit_at_outer_offsets() {
        let f = fixture(&[2, 3, 1]);
        let recorder = Recorder::new();
        f.tree.on_rows(recorder.rows_slot());
        assert_eq!(f.tree.count(), 3);

        f.tree.set_expanded(1, true);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(2, 3)]);

        f.tree.set_expanded(0, true);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(1, 2)]);
        assert_eq!(f.tree.count(), 8);

        // Idempotent.
        f.tree.set_expanded(1, true);
        assert!(recorder.take().is_empty());

        f.tree.set_expanded(1, false);
        assert_eq!(recorder.take(), vec![ListEvent::removed(4, 3)]);
        assert_eq!(f.tree.count(), 5);
    }

    #[test]
    fn test_routing_through_expanded_roots() {
        let f = fixture(&[2, 3, 1]);
        f.tree.set_expanded(0, true);
        f.tree.set_expanded(1, true);

        // Layout: R0 c00 c01 R1 c10 c11 c12 R2
        assert_eq!(f.tree.view_kind(0), f.roots.kind());
        assert_eq!(f.tree.view_kind(1), f.kids[0].kind());
        assert_eq!(f.tree.view_kind(3), f.roots.kind());
        assert_eq!(f.tree.view_kind(6), f.kids[1].kind());
        assert_eq!(f.tree.view_kind(7), f.roots.kind());
    }

    #[test]
    fn test_child_events_remap_into_the_span() {
        let f = fixture(&[2, 3, 1]);
        f.tree.set_expanded(0, true);
        f.tree.set_expanded(1, true);
        let recorder = Recorder::new();
        f.tree.on_rows(recorder.rows_slot());

        f.kids[1].insert(1, 1);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(5, 1)]);

        f.kids[0].remove(0, 1);
        assert_eq!(recorder.take(), vec![ListEvent::removed(1, 1)]);
        assert_eq!(f.tree.count(), 8);
    }

    #[test]
    fn test_collapsed_child_events_ignored() {
        let f = fixture(&[2, 3]);
        let recorder = Recorder::new();
        f.tree.on_rows(recorder.rows_slot());

        f.kids[1].insert(0, 4);
        assert!(recorder.take().is_empty());
        assert_eq!(f.tree.count(), 2);
    }

    #[test]
    fn test_root_insert_rekeys_expansion() {
        let f = fixture(&[2, 3, 1]);
        f.tree.set_expanded(1, true);
        let recorder = Recorder::new();
        f.tree.on_rows(recorder.rows_slot());

        f.roots.insert(0, 1);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(0, 1)]);
        assert!(f.tree.is_expanded(2));
        assert!(!f.tree.is_expanded(1));

        // The old root 1 now sits at 2; its child rows follow it.
        f.kids[1].change(0, 1);
        assert_eq!(recorder.take(), vec![ListEvent::range_changed(3, 1)]);
    }

    #[test]
    fn test_root_removal_spans_children() {
        let f = fixture(&[2, 3, 1]);
        f.tree.set_expanded(0, true);
        f.tree.set_expanded(1, true);
        let recorder = Recorder::new();
        f.tree.on_rows(recorder.rows_slot());

        f.roots.remove(0, 2);
        assert_eq!(recorder.take(), vec![ListEvent::removed(0, 7)]);
        assert_eq!(f.tree.count(), 1);
        assert!(!f.tree.is_expanded(0));

        // The dropped children are no longer relayed.
        f.kids[0].insert(0, 1);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_root_move_carries_the_block() {
        let f = fixture(&[2, 3, 1]);
        f.tree.set_expanded(0, true);
        let recorder = Recorder::new();
        f.tree.on_rows(recorder.rows_slot());

        // Layout: R0 c00 c01 R1 R2 -> R1 R0 c00 c01 R2
        f.roots.move_range(0, 1, 1);
        assert_eq!(recorder.take(), vec![ListEvent::moved(0, 1, 3)]);
        assert!(f.tree.is_expanded(1));
        assert_eq!(f.tree.view_kind(2), f.kids[0].kind());
    }

    #[test]
    fn test_root_change_swaps_a_changed_child_instance() {
        let f = fixture(&[2, 3]);
        f.tree.set_expanded(1, true);
        let recorder = Recorder::new();
        f.tree.on_rows(recorder.rows_slot());

        // Same instance: only the root row changes.
        f.roots.change(1, 1);
        assert_eq!(recorder.take(), vec![ListEvent::range_changed(1, 1)]);

        let replacement = StubAdapter::with_count(1);
        f.table.lock()[1] = Arc::new(replacement.clone());
        f.roots.change(1, 1);
        assert_eq!(
            recorder.take(),
            vec![
                ListEvent::removed(2, 3),
                ListEvent::inserted(2, 1),
                ListEvent::range_changed(1, 1),
            ]
        );

        replacement.insert(0, 1);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(2, 1)]);
    }

    #[test]
    fn test_dormant_expansion_is_eventless() {
        let f = fixture(&[2, 3]);
        f.tree.set_expanded(0, true);
        assert_eq!(f.tree.count(), 4);
        assert!(f.tree.is_expanded(0));

        let recorder = Recorder::new();
        f.tree.on_rows(recorder.rows_slot());
        assert!(recorder.take().is_empty());

        // The dormant expansion is live once observed.
        f.kids[0].insert(0, 1);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(1, 1)]);
    }

    #[test]
    fn test_auto_expand() {
        let f = fixture(&[2, 1]);
        f.tree.set_auto_expand(true);
        let recorder = Recorder::new();
        f.tree.on_rows(recorder.rows_slot());
        assert_eq!(f.tree.count(), 5);

        let new_kid = StubAdapter::with_count(2);
        f.table.lock().insert(1, Arc::new(new_kid.clone()));
        f.roots.insert(1, 1);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(3, 3)]);
        assert!(f.tree.is_expanded(1));
        assert_eq!(f.tree.count(), 8);
    }

    #[test]
    fn test_set_all_expanded() {
        let f = fixture(&[1, 1, 1]);
        f.tree.set_all_expanded(true);
        assert_eq!(f.tree.count(), 6);
        f.tree.set_all_expanded(false);
        assert_eq!(f.tree.count(), 3);
    }

    #[test]
    fn test_children_observed_only_while_tree_is() {
        let f = fixture(&[2]);
        f.tree.set_expanded(0, true);
        assert_eq!(f.kids[0].observer_count(), 0);
        assert_eq!(f.roots.observer_count(), 0);

        let id = f.tree.on_rows(|_| {});
        assert_eq!(f.kids[0].observer_count(), 1);
        assert_eq!(f.roots.observer_count(), 1);

        f.tree.disconnect_rows(id);
        assert_eq!(f.kids[0].observer_count(), 0);
        assert_eq!(f.roots.observer_count(), 0);
    }

    #[test]
    fn test_shadow_consistency() {
        let f = fixture(&[2, 3, 1]);
        f.tree.set_expanded(0, true);
        f.tree.set_expanded(2, true);
        let verifier = ShadowVerifier::for_adapter(&f.tree);

        f.kids[0].insert(0, 2);
        f.tree.set_expanded(1, true);
        f.roots.move_range(0, 1, 1);
        f.kids[1].remove(0, 1);
        f.roots.remove(0, 2);
        f.tree.set_expanded(0, false);

        verifier.assert_consistent();
    }
}
