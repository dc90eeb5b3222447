//! Branch frames of the traversal stack
//!
//! A frame is one group of samples that currently share the same virtual
//! sequence. Its segment cursor first walks the inserted symbols of the
//! delta that created it, then the reference from the end of the delta's
//! deleted span. Branch frames end at their merge boundary; their samples
//! travel down the stack as pending merges until a base frame absorbs them.
//!
//! Base frames (the root and the siblings continuing it) have no boundary
//! and only ever hold reference windows.

use std::collections::VecDeque;

use tracing::trace;

use crate::delta::{Coverage, DeltaEndType, DeltaEntry, DeltaMap};

use super::{SymbolOrigin, TraversalConfig};

/// Cursor of a frame inside its current segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Segment {
    /// Walking the inserted symbols of a delta payload.
    Inserted {
        payload: usize,
        offset: usize,
        /// Reference position to continue at afterwards.
        resume: usize,
        /// Reference position of the delta.
        position: usize,
    },
    /// Next reference position to emit.
    Reference(usize),
}

/// Samples that left the root and come back at `position`.
#[derive(Debug, Clone)]
pub(super) struct PendingMerge {
    pub(super) position: usize,
    pub(super) coverage: Coverage,
}

#[derive(Debug, Clone)]
pub(super) struct BranchFrame {
    pub(super) coverage: Coverage,
    pub(super) segment: Segment,
    /// Reference position at which the frame's samples rejoin; `None` for
    /// base frames, which run to the end of the reference.
    pub(super) boundary: Option<usize>,
    /// Scan cursor into the delta map.
    pub(super) next_delta: usize,
    pub(super) pending: Vec<PendingMerge>,
    /// Trailing symbols of the frame's virtual sequence, newest last.
    pub(super) window: VecDeque<u8>,
    pub(super) origin: SymbolOrigin,
}

impl BranchFrame {
    pub(super) fn root(dimension: usize, context_size: usize) -> Self {
        Self {
            coverage: Coverage::full(dimension),
            segment: Segment::Reference(0),
            boundary: None,
            next_delta: 0,
            pending: Vec::new(),
            window: VecDeque::with_capacity(context_size + 1),
            origin: SymbolOrigin::Reference(0),
        }
    }

    /// Child frame for the samples in `coverage` that carry the record at
    /// `index`.
    ///
    /// A branch opened from a base frame runs `branch_length - 1` reference
    /// symbols past the deleted span. A nested branch keeps the boundary of
    /// the branch it splits from, stretched only as far as needed to leave
    /// `context_size - 1` reference symbols after its own delta.
    pub(super) fn branch(
        parent: &BranchFrame,
        index: usize,
        entry: DeltaEntry<'_>,
        coverage: Coverage,
        config: TraversalConfig,
    ) -> Self {
        let position = entry.position();
        let resume = position + entry.value().deleted_len();
        let boundary = match parent.boundary {
            None => resume + config.branch_length - 1,
            Some(outer) => outer.max(resume + config.context_size - 1),
        };
        Self {
            coverage,
            segment: Segment::Inserted {
                payload: entry.payload_index(),
                offset: 0,
                resume,
                position,
            },
            boundary: Some(boundary),
            next_delta: index + 1,
            pending: Vec::new(),
            window: parent.window.clone(),
            origin: parent.origin,
        }
    }

    /// Continuation of this frame for the samples left over by a split.
    /// Shares cursor, boundary and window; takes over the pending merges.
    pub(super) fn sibling(&mut self, coverage: Coverage) -> Self {
        Self {
            coverage,
            segment: self.segment,
            boundary: self.boundary,
            next_delta: self.next_delta,
            pending: std::mem::take(&mut self.pending),
            window: self.window.clone(),
            origin: self.origin,
        }
    }

    #[inline]
    pub(super) fn is_base(&self) -> bool {
        self.boundary.is_none()
    }

    pub(super) fn push_symbol(&mut self, symbol: u8, origin: SymbolOrigin, context_size: usize) {
        self.window.push_back(symbol);
        if self.window.len() > context_size {
            self.window.pop_front();
        }
        self.origin = origin;
    }

    #[inline]
    pub(super) fn has_full_window(&self, context_size: usize) -> bool {
        self.window.len() >= context_size
    }

    /// Refill the window with the reference symbols preceding `position`.
    pub(super) fn reset_window(&mut self, reference: &[u8], position: usize, context_size: usize) {
        let end = position.min(reference.len());
        let start = end.saturating_sub(context_size);
        self.window.clear();
        self.window.extend(reference[start..end].iter().copied());
    }

    /// Union every merge due at or before `position` into the coverage.
    pub(super) fn absorb_pending(&mut self, position: usize) {
        let coverage = &mut self.coverage;
        self.pending.retain(|merge| {
            if merge.position > position {
                return true;
            }
            trace!(position, samples = merge.coverage.count(), "merge");
            coverage.union_with(&merge.coverage);
            false
        });
    }

    pub(super) fn next_merge_position(&self) -> Option<usize> {
        self.pending.iter().map(|merge| merge.position).min()
    }

    /// Advance the scan cursor over the records at `position` and return
    /// the first one carried by some of this frame's samples, with those
    /// samples.
    pub(super) fn next_divergence(
        &mut self,
        deltas: &DeltaMap,
        position: usize,
    ) -> Option<(usize, Coverage)> {
        while let Some(entry) = deltas.get(self.next_delta) {
            if entry.position() > position {
                break;
            }
            let index = self.next_delta;
            self.next_delta += 1;
            if entry.position() < position || entry.end_type() == DeltaEndType::Right {
                continue;
            }
            let shared = entry.coverage().intersection(&self.coverage);
            if !shared.is_empty() {
                return Some((index, shared));
            }
        }
        None
    }

    /// Pass this frame's samples (when they rejoin at `rejoin_at`) and its
    /// pending merges to the frame below.
    pub(super) fn hand_over(self, below: &mut BranchFrame, rejoin_at: Option<usize>) {
        if let Some(position) = rejoin_at {
            if !self.coverage.is_empty() {
                below.pending.push(PendingMerge {
                    position,
                    coverage: self.coverage,
                });
            }
        }
        below.pending.extend(self.pending);
    }
}
