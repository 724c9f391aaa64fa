//! Observable boolean conditions driving adapter visibility.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers};

use crate::adapter::Adapter;

/// Slot receiving condition transitions.
pub type BoolSlot = Box<dyn Fn(&bool) + Send + Sync>;

pub(crate) type Unsubscribe = Box<dyn FnOnce() + Send>;

/// The behavior behind a [`Condition`] handle.
///
/// Notifications are edge-triggered: a slot runs only when the evaluated
/// value actually changed. Derived nodes observe their sources lazily, on
/// their own first and last observer.
pub(crate) trait ConditionNode: Send + Sync + 'static {
    fn eval(&self) -> bool;
    fn connect(&self, slot: BoolSlot) -> ConnectionId;
    fn disconnect(&self, id: ConnectionId);
    /// The value this node always evaluates to, if it is a constant.
    /// Combinators fold constants away instead of observing them.
    fn as_constant(&self) -> Option<bool> {
        None
    }
}

/// An observable boolean.
///
/// Conditions gate [`ConditionalAdapter`](crate::adapter::ConditionalAdapter)s
/// and compose with `and`/`or`/`xor`/`not`. Combinators fold constants, so
/// `x.and(Condition::always())` is just `x` and `x.and(Condition::never())`
/// never observes `x` at all.
#[derive(Clone)]
pub struct Condition {
    node: Arc<dyn ConditionNode>,
}

impl Condition {
    pub(crate) fn from_node(node: Arc<dyn ConditionNode>) -> Self {
        Self { node }
    }

    /// A condition that is always true.
    pub fn always() -> Self {
        Self::constant(true)
    }

    /// A condition that is never true.
    pub fn never() -> Self {
        Self::constant(false)
    }

    /// A constant condition.
    pub fn constant(value: bool) -> Self {
        Self::from_node(Arc::new(ConstantNode {
            value,
            observers: Observers::new(),
        }))
    }

    /// A condition derived from an adapter's row count.
    ///
    /// Re-evaluates on every rows event of the adapter; the adapter is
    /// observed only while the condition itself is.
    pub fn from_adapter<A, P>(adapter: A, predicate: P) -> Self
    where
        A: Adapter,
        P: Fn(usize) -> bool + Send + Sync + 'static,
    {
        let adapter = Arc::new(adapter);
        let probe = adapter.clone();
        Self::from_node(DerivedNode::new(
            move |weak| {
                let weak = weak.clone();
                let id = adapter.connect_rows(Box::new(move |_| {
                    if let Some(node) = weak.upgrade() {
                        node.reevaluate();
                    }
                }));
                let adapter = adapter.clone();
                Box::new(move || adapter.disconnect_rows(id)) as Unsubscribe
            },
            move || predicate(probe.count()),
        ))
    }

    /// The current value.
    pub fn eval(&self) -> bool {
        self.node.eval()
    }

    /// Connect an observer; it runs on every value transition.
    pub fn connect(&self, slot: BoolSlot) -> ConnectionId {
        self.node.connect(slot)
    }

    /// Disconnect an observer.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not connected.
    pub fn disconnect(&self, id: ConnectionId) {
        self.node.disconnect(id)
    }

    /// Connect an observer without boxing at the call site.
    pub fn on_changed<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.connect(Box::new(slot))
    }

    /// True while both are true.
    pub fn and(self, other: Condition) -> Condition {
        match (self.node.as_constant(), other.node.as_constant()) {
            (Some(true), _) => other,
            (Some(false), _) => Condition::never(),
            (_, Some(true)) => self,
            (_, Some(false)) => Condition::never(),
            _ => combine(self, other, |a, b| a && b),
        }
    }

    /// True while either is true.
    pub fn or(self, other: Condition) -> Condition {
        match (self.node.as_constant(), other.node.as_constant()) {
            (Some(false), _) => other,
            (Some(true), _) => Condition::always(),
            (_, Some(false)) => self,
            (_, Some(true)) => Condition::always(),
            _ => combine(self, other, |a, b| a || b),
        }
    }

    /// True while exactly one is true.
    pub fn xor(self, other: Condition) -> Condition {
        match (self.node.as_constant(), other.node.as_constant()) {
            (Some(true), _) => other.not(),
            (Some(false), _) => other,
            (_, Some(true)) => self.not(),
            (_, Some(false)) => self,
            _ => combine(self, other, |a, b| a != b),
        }
    }

    /// True while this is false.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Condition {
        match self.node.as_constant() {
            Some(value) => Condition::constant(!value),
            None => {
                let operand = self.clone();
                Condition::from_node(DerivedNode::new(
                    move |weak| {
                        let weak = weak.clone();
                        let id = self.connect(Box::new(move |_| {
                            if let Some(node) = weak.upgrade() {
                                node.reevaluate();
                            }
                        }));
                        let source = self.clone();
                        Box::new(move || source.disconnect(id)) as Unsubscribe
                    },
                    move || !operand.eval(),
                ))
            }
        }
    }
}

fn combine(left: Condition, right: Condition, op: fn(bool, bool) -> bool) -> Condition {
    let (eval_left, eval_right) = (left.clone(), right.clone());
    Condition::from_node(DerivedNode::new(
        move |weak| {
            let relay = weak.clone();
            let left_id = left.connect(Box::new(move |_| {
                if let Some(node) = relay.upgrade() {
                    node.reevaluate();
                }
            }));
            let relay = weak.clone();
            let right_id = right.connect(Box::new(move |_| {
                if let Some(node) = relay.upgrade() {
                    node.reevaluate();
                }
            }));
            let (left, right) = (left.clone(), right.clone());
            Box::new(move || {
                left.disconnect(left_id);
                right.disconnect(right_id);
            }) as Unsubscribe
        },
        move || op(eval_left.eval(), eval_right.eval()),
    ))
}

struct ConstantNode {
    value: bool,
    /// Never emits, but connections must still hand out disconnectable IDs.
    observers: Observers<bool>,
}

impl ConditionNode for ConstantNode {
    fn eval(&self) -> bool {
        self.value
    }

    fn connect(&self, slot: BoolSlot) -> ConnectionId {
        self.observers.connect(move |value| slot(value))
    }

    fn disconnect(&self, id: ConnectionId) {
        self.observers.disconnect(id);
    }

    fn as_constant(&self) -> Option<bool> {
        Some(self.value)
    }
}

/// A condition computed from observed sources.
///
/// `subscribe` attaches the node to its sources and returns the matching
/// detach; it runs on the 0→1 observer transition, and the detach on 1→0.
/// While attached the node keeps the last evaluated value and emits only on
/// change.
pub(crate) struct DerivedNode {
    weak: Weak<DerivedNode>,
    subscribe: Box<dyn Fn(&Weak<DerivedNode>) -> Unsubscribe + Send + Sync>,
    eval: Box<dyn Fn() -> bool + Send + Sync>,
    observers: Observers<bool>,
    active: Mutex<Option<Active>>,
}

struct Active {
    unsubscribe: Unsubscribe,
    last: bool,
}

impl DerivedNode {
    pub(crate) fn new(
        subscribe: impl Fn(&Weak<DerivedNode>) -> Unsubscribe + Send + Sync + 'static,
        eval: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            subscribe: Box::new(subscribe),
            eval: Box::new(eval),
            observers: Observers::new(),
            active: Mutex::new(None),
        })
    }

    pub(crate) fn reevaluate(&self) {
        let transition = {
            let mut active = self.active.lock();
            match active.as_mut() {
                Some(state) => {
                    let value = (self.eval)();
                    if state.last == value {
                        None
                    } else {
                        state.last = value;
                        Some(value)
                    }
                }
                None => None,
            }
        };
        if let Some(value) = transition {
            self.observers.emit(&value);
        }
    }
}

impl ConditionNode for DerivedNode {
    fn eval(&self) -> bool {
        (self.eval)()
    }

    fn connect(&self, slot: BoolSlot) -> ConnectionId {
        let first = self.observers.is_empty();
        let id = self.observers.connect(move |value| slot(value));
        if first {
            let unsubscribe = (self.subscribe)(&self.weak);
            let last = (self.eval)();
            *self.active.lock() = Some(Active { unsubscribe, last });
        }
        id
    }

    fn disconnect(&self, id: ConnectionId) {
        self.observers.disconnect(id);
        if self.observers.is_empty() {
            if let Some(active) = self.active.lock().take() {
                (active.unsubscribe)();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::StubAdapter;

    fn bool_recorder() -> (Arc<Mutex<Vec<bool>>>, BoolSlot) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, Box::new(move |value: &bool| sink.lock().push(*value)))
    }

    #[test]
    fn test_constants() {
        assert!(Condition::always().eval());
        assert!(!Condition::never().eval());

        // Constants never transition, but connections still round-trip.
        let constant = Condition::constant(true);
        let (seen, slot) = bool_recorder();
        let id = constant.connect(slot);
        constant.disconnect(id);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_adapter_condition_is_edge_triggered() {
        let stub = StubAdapter::with_count(3);
        let empty = Condition::from_adapter(stub.clone(), |count| count == 0);
        assert!(!empty.eval());

        let (seen, slot) = bool_recorder();
        empty.connect(slot);

        // Count stays 3: no transition.
        stub.change(0, 2);
        assert!(seen.lock().is_empty());

        stub.remove(0, 3);
        assert_eq!(seen.lock().as_slice(), &[true]);

        stub.insert(0, 2);
        assert_eq!(seen.lock().as_slice(), &[true, false]);
    }

    #[test]
    fn test_adapter_observed_lazily() {
        let stub = StubAdapter::with_count(1);
        let condition = Condition::from_adapter(stub.clone(), |count| count > 0);
        assert_eq!(stub.observer_count(), 0);

        let first = condition.on_changed(|_| {});
        let second = condition.on_changed(|_| {});
        assert_eq!(stub.observer_count(), 1);

        condition.disconnect(first);
        assert_eq!(stub.observer_count(), 1);
        condition.disconnect(second);
        assert_eq!(stub.observer_count(), 0);
    }

    #[test]
    fn test_constant_folding_skips_the_operand() {
        let stub = StubAdapter::with_count(1);
        let condition = Condition::from_adapter(stub.clone(), |count| count > 0);

        let gated = condition.and(Condition::never());
        assert!(!gated.eval());
        let id = gated.on_changed(|_| {});
        // Folded to a constant: the adapter is never observed.
        assert_eq!(stub.observer_count(), 0);
        gated.disconnect(id);

        assert!(!Condition::constant(true).xor(Condition::constant(true)).eval());
        assert!(Condition::constant(false).or(Condition::constant(true)).eval());
    }

    #[test]
    fn test_compound_transitions_on_the_combination() {
        let left = StubAdapter::with_count(0);
        let right = StubAdapter::with_count(0);
        let both = Condition::from_adapter(left.clone(), |count| count > 0)
            .and(Condition::from_adapter(right.clone(), |count| count > 0));
        assert!(!both.eval());

        let (seen, slot) = bool_recorder();
        both.connect(slot);

        left.insert(0, 1);
        // Only one side is true: the conjunction has not flipped.
        assert!(seen.lock().is_empty());

        right.insert(0, 1);
        assert_eq!(seen.lock().as_slice(), &[true]);

        left.remove(0, 1);
        assert_eq!(seen.lock().as_slice(), &[true, false]);
    }

    #[test]
    fn test_not_inverts() {
        let stub = StubAdapter::with_count(0);
        let non_empty = Condition::from_adapter(stub.clone(), |count| count > 0);
        let empty = non_empty.not();
        assert!(empty.eval());

        let (seen, slot) = bool_recorder();
        empty.connect(slot);
        stub.insert(0, 2);
        assert_eq!(seen.lock().as_slice(), &[false]);
        assert_eq!(stub.observer_count(), 1);
    }
}
