//! Conditions derived from a data source's state.
//!
//! Each condition watches every channel of its source while it is itself
//! observed, since size, loading, and availability can each shift on a
//! different channel. Notifications stay edge-triggered.

use crate::adapter::condition::{Condition, DerivedNode, Unsubscribe};
use crate::data::{Data, DataExt};

fn data_condition<D, P>(data: &D, predicate: P) -> Condition
where
    D: Data + Clone,
    P: Fn(&D) -> bool + Send + Sync + 'static,
{
    let source = data.clone();
    let probe = data.clone();
    Condition::from_node(DerivedNode::new(
        move |weak| {
            let relay = weak.clone();
            let rows = source.on_rows(move |_| {
                if let Some(node) = relay.upgrade() {
                    node.reevaluate();
                }
            });
            let relay = weak.clone();
            let loading = source.on_loading(move |_| {
                if let Some(node) = relay.upgrade() {
                    node.reevaluate();
                }
            });
            let relay = weak.clone();
            let available = source.on_available(move |_| {
                if let Some(node) = relay.upgrade() {
                    node.reevaluate();
                }
            });
            let relay = weak.clone();
            let error = source.on_error(move |_| {
                if let Some(node) = relay.upgrade() {
                    node.reevaluate();
                }
            });
            let source = source.clone();
            Box::new(move || {
                source.disconnect_rows(rows);
                source.disconnect_loading(loading);
                source.disconnect_available(available);
                source.disconnect_error(error);
            }) as Unsubscribe
        },
        move || predicate(&probe),
    ))
}

/// True while the data holds no items.
pub fn is_empty<D: Data + Clone>(data: &D) -> Condition {
    data_condition(data, |data| data.size() == 0)
}

/// True while the data holds at least one item.
pub fn is_not_empty<D: Data + Clone>(data: &D) -> Condition {
    data_condition(data, |data| data.size() > 0)
}

/// True while a load is in flight.
pub fn is_loading<D: Data + Clone>(data: &D) -> Condition {
    data_condition(data, |data| data.is_loading())
}

/// True while no load is in flight.
pub fn is_not_loading<D: Data + Clone>(data: &D) -> Condition {
    data_condition(data, |data| !data.is_loading())
}

/// True while the source knows more items exist beyond the loaded ones.
pub fn has_more_available<D: Data + Clone>(data: &D) -> Condition {
    data_condition(data, |data| data.available().has_more())
}

/// True while the source does not know of further items.
pub fn has_no_more_available<D: Data + Clone>(data: &D) -> Condition {
    data_condition(data, |data| !data.available().has_more())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::data::VecData;

    fn bool_recorder() -> (Arc<Mutex<Vec<bool>>>, Box<dyn Fn(&bool) + Send + Sync>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, Box::new(move |value: &bool| sink.lock().push(*value)))
    }

    #[test]
    fn test_emptiness_tracks_size() {
        let data = VecData::<i32>::new();
        let empty = is_empty(&data);
        let non_empty = is_not_empty(&data);
        assert!(empty.eval());
        assert!(!non_empty.eval());

        let (seen, slot) = bool_recorder();
        empty.connect(slot);

        data.push(1);
        data.push(2);
        // Edge-triggered: only the first push flips the condition.
        assert_eq!(seen.lock().as_slice(), &[false]);

        data.clear();
        assert_eq!(seen.lock().as_slice(), &[false, true]);
    }

    #[test]
    fn test_channels_observed_while_condition_is() {
        let data = VecData::from(vec![1]);
        let condition = is_not_empty(&data);

        let id = condition.on_changed(|_| {});
        // Mutating while observed must reach the condition through rows.
        data.remove(0);
        assert!(!condition.eval());
        condition.disconnect(id);

        // Dormant conditions still evaluate fresh.
        data.push(5);
        assert!(condition.eval());
    }

    #[test]
    fn test_loading_and_availability_constants_on_vec() {
        let data = VecData::from(vec![1]);
        assert!(!is_loading(&data).eval());
        assert!(is_not_loading(&data).eval());
        assert!(!has_more_available(&data).eval());
        assert!(has_no_more_available(&data).eval());
    }
}
