//! Sequential replay of random operation streams
//!
//! A shadow listener replays every event block by block. After any stream of
//! operations (including nested batches) it must agree with the list, under
//! both coalescing policies.

use crate::test_utils::{Recorder, Shadow};
use eventlist::{Coalescing, EventList, EventListConfig, Result};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(usize, u8),
    Push(u8),
    InsertAll(usize, Vec<u8>),
    RemoveAt(usize),
    RemoveValue(u8),
    RemoveAll(Vec<u8>),
    RetainAll(Vec<u8>),
    Set(usize, u8),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), 0..6u8).prop_map(|(i, v)| Op::Insert(i, v)),
        3 => (0..6u8).prop_map(Op::Push),
        2 => (any::<usize>(), prop::collection::vec(0..6u8, 0..4))
            .prop_map(|(i, v)| Op::InsertAll(i, v)),
        3 => any::<usize>().prop_map(Op::RemoveAt),
        2 => (0..6u8).prop_map(Op::RemoveValue),
        1 => prop::collection::vec(0..6u8, 0..3).prop_map(Op::RemoveAll),
        1 => prop::collection::vec(0..6u8, 0..5).prop_map(Op::RetainAll),
        3 => (any::<usize>(), 0..6u8).prop_map(|(i, v)| Op::Set(i, v)),
        1 => Just(Op::Clear),
    ]
}

#[derive(Debug, Clone)]
enum Step {
    Single(Op),
    Batch(Vec<Op>),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => op().prop_map(Step::Single),
        1 => prop::collection::vec(op(), 0..8).prop_map(Step::Batch),
    ]
}

fn apply(list: &EventList<u8>, op: &Op) -> Result<()> {
    let size = list.size();
    match op {
        Op::Insert(i, v) => {
            list.insert(i % (size + 1), *v)?;
        }
        Op::Push(v) => {
            list.push(*v)?;
        }
        Op::InsertAll(i, vs) => {
            list.insert_all(i % (size + 1), vs.clone())?;
        }
        Op::RemoveAt(i) if size > 0 => {
            list.remove_at(i % size)?;
        }
        Op::RemoveValue(v) => {
            list.remove_value(v)?;
        }
        Op::RemoveAll(vs) => {
            list.remove_all(vs)?;
        }
        Op::RetainAll(vs) => {
            list.retain_all(vs)?;
        }
        Op::Set(i, v) if size > 0 => {
            list.set(i % size, *v)?;
        }
        Op::Clear => list.clear()?,
        _ => {}
    }
    Ok(())
}

fn run(
    coalescing: Coalescing,
    initial: Vec<u8>,
    steps: &[Step],
) -> std::result::Result<(), TestCaseError> {
    let config = EventListConfig::default().with_coalescing(coalescing);
    let list: EventList<u8> = EventList::with_storage(initial, config);
    let shadow = Shadow::attach(&list);
    let rec = Recorder::attach(&list);

    for step in steps {
        match step {
            Step::Single(op) => apply(&list, op).unwrap(),
            Step::Batch(ops) => list
                .batch(|l| ops.iter().try_for_each(|op| apply(l, op)))
                .unwrap(),
        }
    }

    prop_assert!(shadow.failures().is_empty(), "{:?}", shadow.failures());
    prop_assert_eq!(shadow.mirror(), list.to_vec());
    for blocks in rec.events() {
        prop_assert!(!blocks.is_empty());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn shadow_replay_with_coalescing(
        initial in prop::collection::vec(0..6u8, 0..12),
        steps in prop::collection::vec(step(), 0..24),
    ) {
        run(Coalescing::Adjacent, initial, &steps)?;
    }

    #[test]
    fn shadow_replay_without_coalescing(
        initial in prop::collection::vec(0..6u8, 0..12),
        steps in prop::collection::vec(step(), 0..24),
    ) {
        run(Coalescing::Disabled, initial, &steps)?;
    }
}
