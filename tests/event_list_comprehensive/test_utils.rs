//! Shared helpers for the event list suite

use eventlist::{ChangeBlock, ChangeKind, EventList, ListEvent, ListEventListener};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;

/// Records the blocks of every event it receives
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Vec<ChangeBlock>>>,
}

impl Recorder {
    pub fn attach<E: Send + Sync + 'static>(list: &EventList<E>) -> Arc<Self> {
        let recorder = Arc::new(Self::default());
        list.add_listener(recorder.clone());
        recorder
    }

    pub fn events(&self) -> Vec<Vec<ChangeBlock>> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn take(&self) -> Vec<Vec<ChangeBlock>> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl<E, S> ListEventListener<E, S> for Recorder {
    fn list_changed(&self, event: &ListEvent<'_, E, S>) {
        self.events.lock().push(event.blocks().to_vec());
    }
}

/// Mirrors a list by replaying each event's blocks in order.
///
/// Surviving elements must land where the list has them; inserted and
/// updated slots are then refreshed from the list. Mismatches are collected
/// rather than asserted, since listener panics are swallowed by dispatch.
pub struct Shadow<E> {
    mirror: Mutex<Vec<E>>,
    failures: Mutex<Vec<String>>,
}

impl<E> Shadow<E>
where
    E: Clone + PartialEq + Debug + Send + Sync + 'static,
{
    pub fn attach(list: &EventList<E>) -> Arc<Self> {
        let shadow = Arc::new(Self {
            mirror: Mutex::new(list.to_vec()),
            failures: Mutex::new(Vec::new()),
        });
        list.add_listener(shadow.clone());
        shadow
    }

    pub fn mirror(&self) -> Vec<E> {
        self.mirror.lock().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    fn replay(&self, blocks: &[ChangeBlock], current: &[E]) -> Result<(), String> {
        let mut slots: Vec<Option<E>> = self.mirror.lock().drain(..).map(Some).collect();
        for block in blocks {
            match block.kind {
                ChangeKind::Insert => {
                    if block.start > slots.len() {
                        return Err(format!("{} past end {}", block, slots.len()));
                    }
                    for i in block.start..=block.end {
                        slots.insert(i, None);
                    }
                }
                ChangeKind::Delete => {
                    if block.end >= slots.len() {
                        return Err(format!("{} past end {}", block, slots.len()));
                    }
                    slots.drain(block.start..=block.end);
                }
                ChangeKind::Update => {
                    if block.end >= slots.len() {
                        return Err(format!("{} past end {}", block, slots.len()));
                    }
                    for slot in &mut slots[block.start..=block.end] {
                        *slot = None;
                    }
                }
            }
        }
        if slots.len() != current.len() {
            return Err(format!(
                "replayed size {} but list has {}",
                slots.len(),
                current.len()
            ));
        }
        for (i, slot) in slots.iter().enumerate() {
            if let Some(kept) = slot {
                if kept != &current[i] {
                    return Err(format!(
                        "index {}: replay has {:?}, list has {:?}",
                        i, kept, current[i]
                    ));
                }
            }
        }
        Ok(())
    }
}

impl<E> ListEventListener<E> for Shadow<E>
where
    E: Clone + PartialEq + Debug + Send + Sync + 'static,
{
    fn list_changed(&self, event: &ListEvent<'_, E>) {
        let current = event.source().to_vec();
        if let Err(failure) = self.replay(event.blocks(), &current) {
            self.failures
                .lock()
                .push(format!("event {}: {}", event.sequence(), failure));
        }
        *self.mirror.lock() = current;
    }
}
