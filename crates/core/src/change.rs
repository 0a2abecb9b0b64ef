//! Change blocks: the unit of a list change event
//!
//! A transaction on an event list produces an ordered sequence of
//! [`ChangeBlock`]s. Order is significant: each block's indices are relative
//! to the state obtained by replaying every earlier block of the same
//! transaction against the pre-transaction list. Replaying the blocks in
//! order on a shadow copy therefore reproduces the post-transaction shape.
//!
//! - `Insert [a, b]`: elements now live at `a..=b` (post-insert indexing)
//! - `Delete [a, b]`: elements that lived at `a..=b` are gone (pre-delete indexing)
//! - `Update [a, b]`: elements at `a..=b` were replaced in place

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a primitive edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Elements were inserted
    Insert,
    /// Elements were deleted
    Delete,
    /// Elements were replaced in place
    Update,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "INSERT"),
            ChangeKind::Delete => write!(f, "DELETE"),
            ChangeKind::Update => write!(f, "UPDATE"),
        }
    }
}

/// One coalesced edit record with an inclusive index range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeBlock {
    /// What happened
    pub kind: ChangeKind,
    /// First affected index
    pub start: usize,
    /// Last affected index (inclusive)
    pub end: usize,
}

impl ChangeBlock {
    /// Create a block. Callers validate `start <= end`.
    pub fn new(kind: ChangeKind, start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "change block start must not exceed end");
        Self { kind, start, end }
    }

    /// Insert block covering `start..=end`
    pub fn insert(start: usize, end: usize) -> Self {
        Self::new(ChangeKind::Insert, start, end)
    }

    /// Delete block covering `start..=end`
    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(ChangeKind::Delete, start, end)
    }

    /// Update block covering `start..=end`
    pub fn update(start: usize, end: usize) -> Self {
        Self::new(ChangeKind::Update, start, end)
    }

    /// Number of indices covered
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// A block always covers at least one index
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Effect of this block on the list size
    pub fn size_delta(&self) -> isize {
        match self.kind {
            ChangeKind::Insert => self.len() as isize,
            ChangeKind::Delete => -(self.len() as isize),
            ChangeKind::Update => 0,
        }
    }
}

impl fmt::Display for ChangeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{},{}]", self.kind, self.start, self.end)
    }
}

/// Net effect of a block sequence on the list size
pub fn net_size_delta(blocks: &[ChangeBlock]) -> isize {
    blocks.iter().map(ChangeBlock::size_delta).sum()
}

/// Total number of indices covered by blocks of `kind`
pub fn coverage(blocks: &[ChangeBlock], kind: ChangeKind) -> usize {
    blocks
        .iter()
        .filter(|b| b.kind == kind)
        .map(ChangeBlock::len)
        .sum()
}
