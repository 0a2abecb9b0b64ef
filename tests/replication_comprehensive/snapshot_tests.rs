//! Snapshot round trips and payload rejection

use eventlist::{
    Error, Payload, Resource, ResourceState, SharedResourceListener, StringResource,
    ValueResource,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting(resource: &dyn Resource) -> (SharedResourceListener, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let listener: SharedResourceListener = Arc::new(move |_: &dyn Resource, _: &Payload| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    resource.add_resource_listener(Arc::clone(&listener));
    (listener, calls)
}

// ============================================================================
// Round Trip
// ============================================================================

/// A snapshot of "hello" restores into a fresh resource with one notification
#[test]
fn test_snapshot_into_fresh_resource() {
    let first = StringResource::new("greeting");
    first.set_value("hello".to_string()).unwrap();

    let second = StringResource::new("greeting");
    let (_listener, calls) = counting(&second);
    assert_eq!(second.state(), ResourceState::Uninitialized);

    second.from_snapshot(&first.to_snapshot().unwrap()).unwrap();

    assert_eq!(second.value(), "hello");
    assert_eq!(second.state(), ResourceState::Synchronized);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Cursor {
    user: String,
    line: u32,
    column: u32,
    selection: Option<(u32, u32)>,
}

proptest! {
    /// Any string survives to_snapshot / from_snapshot
    #[test]
    fn string_round_trip(value in ".*") {
        let source = StringResource::new("s");
        source.set_value(value.clone()).unwrap();
        let target = StringResource::new("s");
        target.from_snapshot(&source.to_snapshot().unwrap()).unwrap();
        prop_assert_eq!(target.value(), value);
    }

    /// Structured values survive too
    #[test]
    fn struct_round_trip(
        user in "[a-z]{0,12}",
        line in any::<u32>(),
        column in any::<u32>(),
        selection in proptest::option::of((any::<u32>(), any::<u32>())),
    ) {
        let value = Cursor { user, line, column, selection };
        let source: ValueResource<Cursor> = ValueResource::new("cursor");
        source.set_value(value.clone()).unwrap();
        let target: ValueResource<Cursor> = ValueResource::new("cursor");
        target.from_snapshot(&source.to_snapshot().unwrap()).unwrap();
        prop_assert_eq!(target.value(), value);
    }
}

// ============================================================================
// Rejection
// ============================================================================

/// A payload of another type is rejected and changes nothing
#[test]
fn test_wrong_type_payload_rejected() {
    let resource: ValueResource<Cursor> = ValueResource::new("cursor");
    let (_listener, calls) = counting(&resource);

    let result = resource.from_snapshot(&Payload::encode(&42u64).unwrap());

    assert!(matches!(result, Err(Error::Deserialization(_))));
    assert_eq!(resource.value(), Cursor::default());
    assert_eq!(resource.state(), ResourceState::Uninitialized);
    assert_eq!(resource.version(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Truncated snapshots are rejected through the delta path as well
#[test]
fn test_truncated_delta_rejected() {
    let resource = StringResource::new("doc");
    resource.set_value("stable".to_string()).unwrap();
    let (_listener, calls) = counting(&resource);

    let full = Payload::encode("a much longer replacement").unwrap();
    let truncated = Payload::from_bytes(&full.as_bytes()[..4]);

    assert!(matches!(resource.update(&truncated), Err(Error::Deserialization(_))));
    assert_eq!(resource.value(), "stable");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Listener Bookkeeping
// ============================================================================

/// Removed listeners stop receiving updates; others keep going
#[test]
fn test_removed_listener_stops_receiving() {
    let resource = StringResource::new("doc");
    let (gone, gone_calls) = counting(&resource);
    let (_kept, kept_calls) = counting(&resource);

    resource.set_value("one".to_string()).unwrap();
    assert!(resource.remove_resource_listener(&gone));
    resource.set_value("two".to_string()).unwrap();

    assert_eq!(gone_calls.load(Ordering::SeqCst), 1);
    assert_eq!(kept_calls.load(Ordering::SeqCst), 2);
    assert_eq!(resource.listener_count(), 1);
}

/// Listeners receive the full post-change snapshot, in order
#[test]
fn test_listener_receives_snapshots_in_order() {
    let resource = StringResource::new("doc");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let baseline = resource
        .subscribe(Arc::new(move |r: &dyn Resource, p: &Payload| {
            sink.lock().push((r.version(), p.decode::<String>().unwrap()));
        }))
        .unwrap();

    assert_eq!(baseline.decode::<String>().unwrap(), "");
    resource.set_value("a".to_string()).unwrap();
    resource.update(&Payload::encode("b").unwrap()).unwrap();

    assert_eq!(
        *seen.lock(),
        vec![(1, "a".to_string()), (2, "b".to_string())]
    );
}
