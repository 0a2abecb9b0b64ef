//! Change assembler: turns primitive edits into one change event
//!
//! A `ChangeAssembler` belongs to exactly one event list and is only touched
//! while that list's exclusive lock is held, so it needs no synchronization
//! of its own.
//!
//! ## Transaction Sequence
//!
//! ```text
//! 1. begin(allow_nested)   - open, or re-enter when nesting is allowed
//! 2. add_insert/add_delete/add_update - append (and maybe merge) a block
//! 3. commit()              - decrement depth; at depth 0 freeze the blocks
//! 4. owner dispatches the frozen ChangeSet to its listeners
//! ```
//!
//! Nesting is an explicit depth counter. Only the outermost commit freezes
//! and clears the pending blocks; an outermost commit with no blocks yields
//! [`Commit::Empty`] and must not notify anyone.
//!
//! ## Coalescing
//!
//! With [`Coalescing::Adjacent`] a new block is folded into the last pending
//! block when both have the same kind and their ranges touch, in a way that
//! keeps in-order replay exact:
//!
//! - `Insert [a,b]` + `Insert [c,d]`, `a <= c <= b+1` → `Insert [a, b+(d-c+1)]`
//! - `Delete [a,b]` + `Delete [c,d]`, `c <= a <= d+1` → `Delete [c, d+(b-a+1)]`
//! - `Update [a,b]` + `Update [c,d]`, overlapping or adjacent → `Update [min, max]`
//!
//! Only the last block is a merge candidate, so blocks of different kinds are
//! never reordered.

use eventlist_core::{ChangeBlock, ChangeKind, Coalescing, Error, Result};
use std::sync::Arc;

/// Frozen, immutable outcome of one outermost commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Per-assembler commit counter, starting at 1
    pub sequence: u64,
    /// Blocks in emission order, shared by every listener
    pub blocks: Arc<[ChangeBlock]>,
}

/// Result of [`ChangeAssembler::commit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// An enclosing transaction is still open
    Nested,
    /// Outermost commit with nothing recorded
    Empty,
    /// Outermost commit with blocks to dispatch
    Ready(ChangeSet),
}

/// Accumulates the change blocks of one logical transaction
#[derive(Debug)]
pub struct ChangeAssembler {
    depth: usize,
    pending: Vec<ChangeBlock>,
    coalescing: Coalescing,
    committed: u64,
}

impl Default for ChangeAssembler {
    fn default() -> Self {
        Self::new(Coalescing::default())
    }
}

impl ChangeAssembler {
    /// Create an assembler with no open transaction
    pub fn new(coalescing: Coalescing) -> Self {
        Self {
            depth: 0,
            pending: Vec::new(),
            coalescing,
            committed: 0,
        }
    }

    /// Current nesting depth (0 = no open transaction)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True while a transaction is open
    pub fn is_open(&self) -> bool {
        self.depth > 0
    }

    /// Blocks recorded so far in the open transaction
    pub fn pending(&self) -> &[ChangeBlock] {
        &self.pending
    }

    /// Number of outermost commits that produced a change set
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// `IllegalTransactionState` if a transaction is already open and
    /// `allow_nested` is false.
    pub fn begin(&mut self, allow_nested: bool) -> Result<()> {
        if self.depth > 0 && !allow_nested {
            return Err(Error::illegal_state(format!(
                "cannot begin a non-nested transaction at depth {}",
                self.depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Record inserted elements now living at `start..=end`
    pub fn add_insert(&mut self, start: usize, end: usize) -> Result<()> {
        self.add(ChangeKind::Insert, start, end)
    }

    /// Record deleted elements that lived at `start..=end`
    pub fn add_delete(&mut self, start: usize, end: usize) -> Result<()> {
        self.add(ChangeKind::Delete, start, end)
    }

    /// Record replaced elements at `start..=end`
    pub fn add_update(&mut self, start: usize, end: usize) -> Result<()> {
        self.add(ChangeKind::Update, start, end)
    }

    /// Record a block of any kind.
    ///
    /// # Errors
    ///
    /// - `IllegalTransactionState` outside a transaction
    /// - `InvalidRange` if `start > end`
    pub fn add(&mut self, kind: ChangeKind, start: usize, end: usize) -> Result<()> {
        if self.depth == 0 {
            return Err(Error::illegal_state(format!(
                "cannot record {} outside a transaction",
                kind
            )));
        }
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        self.push(ChangeBlock::new(kind, start, end));
        Ok(())
    }

    fn push(&mut self, block: ChangeBlock) {
        if self.coalescing == Coalescing::Adjacent {
            if let Some(last) = self.pending.last_mut() {
                if let Some(merged) = merge(last, &block) {
                    *last = merged;
                    return;
                }
            }
        }
        self.pending.push(block);
    }

    /// Close one nesting level.
    ///
    /// # Errors
    ///
    /// `IllegalTransactionState` if no transaction is open.
    pub fn commit(&mut self) -> Result<Commit> {
        if self.depth == 0 {
            return Err(Error::illegal_state("commit without a matching begin"));
        }
        self.depth -= 1;
        if self.depth > 0 {
            return Ok(Commit::Nested);
        }
        if self.pending.is_empty() {
            return Ok(Commit::Empty);
        }
        self.committed += 1;
        let blocks: Arc<[ChangeBlock]> = std::mem::take(&mut self.pending).into();
        Ok(Commit::Ready(ChangeSet {
            sequence: self.committed,
            blocks,
        }))
    }

    /// Discard pending blocks and close every nesting level.
    ///
    /// Returns the discarded blocks.
    pub fn abort(&mut self) -> Vec<ChangeBlock> {
        self.depth = 0;
        std::mem::take(&mut self.pending)
    }
}

fn merge(last: &ChangeBlock, next: &ChangeBlock) -> Option<ChangeBlock> {
    if last.kind != next.kind {
        return None;
    }
    match last.kind {
        ChangeKind::Insert if last.start <= next.start && next.start <= last.end + 1 => {
            Some(ChangeBlock::insert(last.start, last.end + next.len()))
        }
        ChangeKind::Delete if next.start <= last.start && last.start <= next.end + 1 => {
            Some(ChangeBlock::delete(next.start, next.end + last.len()))
        }
        ChangeKind::Update if next.start <= last.end + 1 && last.start <= next.end + 1 => Some(
            ChangeBlock::update(last.start.min(next.start), last.end.max(next.end)),
        ),
        _ => None,
    }
}
