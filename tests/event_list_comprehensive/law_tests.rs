//! Algebraic laws of list mutations, checked with proptest

use crate::test_utils::Recorder;
use eventlist::{
    coverage, net_size_delta, ChangeKind, EventList, ListEvent, SharedListEventListener,
};
use proptest::prelude::*;
use std::sync::Arc;

fn list_of(values: &[i32]) -> EventList<i32> {
    values.iter().copied().collect()
}

proptest! {
    /// insert(i, v) then get(i) yields v and grows the list by one
    #[test]
    fn insert_then_get(
        values in prop::collection::vec(any::<i32>(), 0..32),
        at in any::<usize>(),
        v in any::<i32>(),
    ) {
        let list = list_of(&values);
        let index = at % (values.len() + 1);
        let size = list.insert(index, v).unwrap();
        prop_assert_eq!(size, values.len() + 1);
        prop_assert_eq!(list.get(index), Some(v));
    }

    /// Removing the front n times in a batch covers the same elements as clear
    #[test]
    fn front_removal_covers_like_clear(values in prop::collection::vec(any::<i32>(), 1..32)) {
        let n = values.len();

        let removed = list_of(&values);
        let rec_removed = Recorder::attach(&removed);
        removed.batch(|l| {
            for _ in 0..n {
                l.remove_at(0)?;
            }
            Ok(())
        }).unwrap();

        let cleared = list_of(&values);
        let rec_cleared = Recorder::attach(&cleared);
        cleared.clear().unwrap();

        let a = rec_removed.take();
        let b = rec_cleared.take();
        prop_assert_eq!(a.len(), 1);
        prop_assert_eq!(b.len(), 1);
        prop_assert_eq!(coverage(&a[0], ChangeKind::Delete), n);
        prop_assert_eq!(coverage(&b[0], ChangeKind::Delete), n);
        prop_assert!(removed.is_empty() && cleared.is_empty());
    }

    /// A second retain_all with the same values changes nothing
    #[test]
    fn retain_all_is_idempotent(
        values in prop::collection::vec(0..8i32, 0..32),
        keep in prop::collection::vec(0..8i32, 0..6),
    ) {
        let list = list_of(&values);
        list.retain_all(&keep).unwrap();
        let after_first = list.to_vec();

        let rec = Recorder::attach(&list);
        prop_assert!(!list.retain_all(&keep).unwrap());
        prop_assert_eq!(list.to_vec(), after_first);
        prop_assert_eq!(rec.count(), 0);
    }

    /// After k adds and j removes of distinct listeners, k - j remain
    #[test]
    fn listener_count_tracks_registrations(k in 0usize..10, j in 0usize..10) {
        let j = j.min(k);
        let list: EventList<i32> = EventList::new();
        let listeners: Vec<SharedListEventListener<i32>> = (0..k)
            .map(|_| Arc::new(|_: &ListEvent<'_, i32>| {}) as SharedListEventListener<i32>)
            .collect();
        for l in &listeners {
            list.add_listener(Arc::clone(l));
        }
        for l in listeners.iter().take(j) {
            prop_assert!(list.remove_listener(l));
        }
        prop_assert_eq!(list.listener_count(), k - j);
    }

    /// Every event's block deltas sum to the size change it caused
    #[test]
    fn block_deltas_sum_to_size_change(
        values in prop::collection::vec(0..5i32, 0..24),
        remove in prop::collection::vec(0..5i32, 0..3),
        append in prop::collection::vec(any::<i32>(), 0..8),
    ) {
        let list = list_of(&values);
        let rec = Recorder::attach(&list);
        let before = list.size() as isize;
        list.batch(|l| {
            l.remove_all(&remove)?;
            l.append_all(append.clone())
        }).unwrap();
        let after = list.size() as isize;

        let delta: isize = rec.take().iter().map(|blocks| net_size_delta(blocks)).sum();
        prop_assert_eq!(delta, after - before);
    }
}

/// Appending an empty source opens no transaction at all
#[test]
fn test_empty_append_is_no_op() {
    let list = list_of(&[1, 2]);
    let rec = Recorder::attach(&list);
    assert!(!list.append_all(Vec::new()).unwrap());
    assert!(!list.insert_all(1, Vec::new()).unwrap());
    assert_eq!(rec.count(), 0);
    assert_eq!(list.lock().write_hold_count(), 0);
}

/// Removing an unregistered listener reports false and changes nothing
#[test]
fn test_remove_unknown_listener() {
    let list = list_of(&[]);
    let registered: SharedListEventListener<i32> = Arc::new(|_: &ListEvent<'_, i32>| {});
    let stranger: SharedListEventListener<i32> = Arc::new(|_: &ListEvent<'_, i32>| {});
    list.add_listener(Arc::clone(&registered));
    assert!(!list.remove_listener(&stranger));
    assert_eq!(list.listener_count(), 1);
}

/// N registered listeners mean N invocations per event, all sharing one
/// frozen block sequence
#[test]
fn test_each_listener_invoked_once_with_shared_blocks() {
    use eventlist::ChangeBlock;
    use parking_lot::Mutex;

    let list = list_of(&[1, 2, 3]);
    let seen: Arc<Mutex<Vec<Arc<[ChangeBlock]>>>> = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..5 {
        let sink = Arc::clone(&seen);
        list.add_listener(Arc::new(move |e: &ListEvent<'_, i32>| {
            sink.lock().push(e.shared_blocks());
        }));
    }

    list.remove_at(0).unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 5);
    assert!(seen.iter().all(|b| Arc::ptr_eq(b, &seen[0])));
    assert_eq!(&*seen[0], &[ChangeBlock::delete(0, 0)]);
}
