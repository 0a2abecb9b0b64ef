//! Backing storage strategy for event lists
//!
//! An event list owns exactly one [`ListStorage`] and is the only path through
//! which it is mutated. The trait is the capability "indexable, insertable,
//! deletable backing store"; callers validate indices before calling, so
//! implementations may panic on out-of-range input just like `Vec` does.

use std::collections::VecDeque;

/// Indexable, insertable, deletable backing store
pub trait ListStorage<E>: Send + Sync {
    /// Number of stored elements
    fn len(&self) -> usize;

    /// True when no element is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, if any
    fn get(&self, index: usize) -> Option<&E>;

    /// Insert `value` at `index`, shifting later elements right
    fn insert(&mut self, index: usize, value: E);

    /// Insert every element of `values` starting at `index`, preserving order
    fn insert_all(&mut self, index: usize, values: Vec<E>) {
        for (offset, value) in values.into_iter().enumerate() {
            self.insert(index + offset, value);
        }
    }

    /// Remove and return the element at `index`
    fn remove(&mut self, index: usize) -> E;

    /// Replace the element at `index`, returning the previous one
    fn set(&mut self, index: usize, value: E) -> E;

    /// Remove every element
    fn clear(&mut self);

    /// Index of the first element matching `pred`
    fn position(&self, pred: &mut dyn FnMut(&E) -> bool) -> Option<usize> {
        (0..self.len()).find(|&i| self.get(i).map_or(false, |e| pred(e)))
    }
}

impl<E: Send + Sync> ListStorage<E> for Vec<E> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> Option<&E> {
        <[E]>::get(self, index)
    }

    fn insert(&mut self, index: usize, value: E) {
        Vec::insert(self, index, value);
    }

    fn insert_all(&mut self, index: usize, values: Vec<E>) {
        self.splice(index..index, values);
    }

    fn remove(&mut self, index: usize) -> E {
        Vec::remove(self, index)
    }

    fn set(&mut self, index: usize, value: E) -> E {
        std::mem::replace(&mut self[index], value)
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn position(&self, pred: &mut dyn FnMut(&E) -> bool) -> Option<usize> {
        self.iter().position(|e| pred(e))
    }
}

impl<E: Send + Sync> ListStorage<E> for VecDeque<E> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn get(&self, index: usize) -> Option<&E> {
        VecDeque::get(self, index)
    }

    fn insert(&mut self, index: usize, value: E) {
        VecDeque::insert(self, index, value);
    }

    fn remove(&mut self, index: usize) -> E {
        match VecDeque::remove(self, index) {
            Some(value) => value,
            None => panic!("VecDeque storage: remove index {} out of bounds", index),
        }
    }

    fn set(&mut self, index: usize, value: E) -> E {
        std::mem::replace(&mut self[index], value)
    }

    fn clear(&mut self) {
        VecDeque::clear(self);
    }

    fn position(&self, pred: &mut dyn FnMut(&E) -> bool) -> Option<usize> {
        self.iter().position(|e| pred(e))
    }
}
