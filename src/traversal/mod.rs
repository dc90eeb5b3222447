//! Lockstep traversal of every sample's virtual sequence
//!
//! The traverser walks the reference once with a root frame covering all
//! samples. At every delta carried by some of the current frame's samples
//! it splits the frame: a child frame takes exactly those samples and a
//! sibling frame takes the rest, both pushed over the now empty parent.
//! A child opened from the reference walks the delta's inserted symbols and
//! then `branch_length - 1` reference symbols past the deleted span before
//! its samples rejoin. Frames are processed depth-first over an explicit
//! stack, so each sample's symbols come out in order and every context
//! window of every sample is reported exactly once, tagged with the
//! coverage of all samples sharing it.

mod config;
mod frame;
mod windows;

pub use config::TraversalConfig;
pub use windows::{ContextWindow, Windows};

use tracing::{debug, trace};

use crate::container::JournaledStringTree;
use crate::delta::{Coverage, DeltaMap};
use crate::JstError;

use frame::{BranchFrame, Segment};

/// Lifecycle of a traverser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverserState {
    /// No container bound.
    Unbound,
    /// Positioned on a window.
    Initialized,
    /// Every sample's sequence has been consumed.
    AtEnd,
}

/// Where the newest symbol of the current window comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolOrigin {
    /// Reference symbol at this position.
    Reference(usize),
    /// Symbol `offset` of the value inserted by the delta at `position`.
    Inserted {
        /// Reference position of the delta.
        position: usize,
        /// Offset inside the inserted value.
        offset: usize,
    },
}

/// Cursor over all samples of a [`JournaledStringTree`].
///
/// Cloning copies the frame stack and shares the container; the copies
/// advance independently.
#[derive(Debug, Clone)]
pub struct Traverser<'a> {
    container: Option<&'a JournaledStringTree>,
    config: TraversalConfig,
    stack: Vec<BranchFrame>,
    /// Samples whose sequence has been consumed completely.
    finished: Coverage,
    state: TraverserState,
}

impl Default for Traverser<'_> {
    fn default() -> Self {
        Self {
            container: None,
            config: TraversalConfig::default(),
            stack: Vec::new(),
            finished: Coverage::empty(0),
            state: TraverserState::Unbound,
        }
    }
}

impl<'a> Traverser<'a> {
    /// Traverser over `container` with single-symbol windows.
    pub fn new(container: &'a JournaledStringTree) -> Self {
        let mut traverser = Self::default();
        traverser.bind(container, TraversalConfig::default());
        traverser
    }

    /// Bind to `container` and move to the first full window of
    /// `context_size` symbols.
    pub fn init(
        &mut self,
        container: &'a JournaledStringTree,
        context_size: usize,
    ) -> Result<(), JstError> {
        self.init_with(container, TraversalConfig::new(context_size)?)
    }

    /// Bind to `container` with explicit window and lookahead sizes.
    pub fn init_with(
        &mut self,
        container: &'a JournaledStringTree,
        config: TraversalConfig,
    ) -> Result<(), JstError> {
        let config =
            TraversalConfig::new(config.context_size)?.with_branch_length(config.branch_length)?;
        self.bind(container, config);
        Ok(())
    }

    fn bind(&mut self, container: &'a JournaledStringTree, config: TraversalConfig) {
        self.container = Some(container);
        self.config = config;
        self.stack.clear();
        self.finished = Coverage::empty(container.dimension());
        self.stack
            .push(BranchFrame::root(container.dimension(), config.context_size));
        self.state = if self.advance() {
            TraverserState::Initialized
        } else {
            TraverserState::AtEnd
        };
        debug!(
            context_size = config.context_size,
            branch_length = config.branch_length,
            depth = self.stack.len(),
            state = ?self.state,
            "traverser initialized"
        );
    }

    /// Move `steps` windows forward.
    ///
    /// Stops early, in [`TraverserState::AtEnd`], once every sample has
    /// been consumed.
    pub fn go_next(&mut self, steps: usize) -> Result<(), JstError> {
        self.current_frame()?;
        for _ in 0..steps {
            if !self.advance() {
                self.state = TraverserState::AtEnd;
                break;
            }
        }
        Ok(())
    }

    /// Newest symbol of the current window.
    pub fn context_iterator(&self) -> Result<u8, JstError> {
        self.current_frame()?
            .window
            .back()
            .copied()
            .ok_or(JstError::InvalidState(self.state))
    }

    /// Samples sharing the current window.
    pub fn coverage(&self) -> Result<&Coverage, JstError> {
        Ok(&self.current_frame()?.coverage)
    }

    /// The current window, oldest symbol first.
    pub fn context(&self) -> Result<Vec<u8>, JstError> {
        Ok(self.current_frame()?.window.iter().copied().collect())
    }

    /// Origin of the newest symbol of the current window.
    pub fn origin(&self) -> Result<SymbolOrigin, JstError> {
        Ok(self.current_frame()?.origin)
    }

    /// Whether every sample's sequence has been consumed. Unbound
    /// traversers have nothing left to consume either.
    pub fn at_end(&self) -> bool {
        self.state != TraverserState::Initialized
    }

    /// Lifecycle state.
    pub fn state(&self) -> TraverserState {
        self.state
    }

    /// Bound container, if any.
    pub fn container(&self) -> Option<&'a JournaledStringTree> {
        self.container
    }

    /// Symbols per reported window.
    pub fn context_size(&self) -> usize {
        self.config.context_size
    }

    /// Lookahead of branches past their delta.
    pub fn branch_length(&self) -> usize {
        self.config.branch_length
    }

    /// Number of frames on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Coverage of every frame, of every group waiting to rejoin the root
    /// and of the samples already consumed. Together they partition the
    /// sample universe while the traversal runs.
    pub fn partition(&self) -> Vec<Coverage> {
        let mut groups = Vec::new();
        if !self.finished.is_empty() {
            groups.push(self.finished.clone());
        }
        for frame in &self.stack {
            if !frame.coverage.is_empty() {
                groups.push(frame.coverage.clone());
            }
            groups.extend(frame.pending.iter().map(|merge| merge.coverage.clone()));
        }
        groups
    }

    /// Report remaining windows as owned items.
    pub fn windows(self) -> Windows<'a> {
        Windows::new(self)
    }

    fn current_frame(&self) -> Result<&BranchFrame, JstError> {
        if self.state != TraverserState::Initialized {
            return Err(JstError::InvalidState(self.state));
        }
        self.stack
            .last()
            .ok_or(JstError::InvalidState(self.state))
    }

    /// Run the frame stack until the top frame emits a symbol completing a
    /// full window. Returns `false` once the stack is exhausted.
    fn advance(&mut self) -> bool {
        let Some(jst) = self.container else {
            return false;
        };
        let reference: &[u8] = jst.reference();
        let deltas = jst.deltas();
        let config = self.config;
        let context_size = config.context_size;

        while let Some(top) = self.stack.last_mut() {
            let position = match top.segment {
                Segment::Inserted {
                    payload,
                    offset,
                    resume,
                    position,
                } => {
                    match deltas.payload(payload).value.inserted().get(offset) {
                        Some(&symbol) => {
                            top.segment = Segment::Inserted {
                                payload,
                                offset: offset + 1,
                                resume,
                                position,
                            };
                            top.push_symbol(
                                symbol,
                                SymbolOrigin::Inserted { position, offset },
                                context_size,
                            );
                            if top.has_full_window(context_size) {
                                return true;
                            }
                        }
                        None => top.segment = Segment::Reference(resume),
                    }
                    continue;
                }
                Segment::Reference(position) => position,
            };

            // Only base windows are guaranteed to be pure reference.
            if top.is_base() {
                top.absorb_pending(position);
            }
            if top.boundary.is_some_and(|boundary| position >= boundary) {
                self.pop_frame(Some(position));
                continue;
            }

            if let Some((index, shared)) = top.next_divergence(deltas, position) {
                self.split(deltas, index, shared, config);
                continue;
            }

            if top.coverage.is_empty() {
                if !top.is_base() {
                    self.pop_frame(None);
                } else if let Some(next) = top.next_merge_position() {
                    // Nobody follows the reference until the next merge.
                    top.segment = Segment::Reference(next);
                    top.reset_window(reference, next, context_size);
                } else {
                    self.stack.pop();
                }
                continue;
            }

            if position >= reference.len() {
                // Branches running off the reference end never rejoin.
                self.finished.union_with(&top.coverage);
                self.pop_frame(None);
                continue;
            }

            top.segment = Segment::Reference(position + 1);
            top.push_symbol(
                reference[position],
                SymbolOrigin::Reference(position),
                context_size,
            );
            if top.has_full_window(context_size) {
                return true;
            }
        }
        false
    }

    /// Split the top frame at the record at `index`: the samples in
    /// `shared` follow the record in a child frame, the others continue in
    /// a sibling. The parent stays below them as an empty shell.
    fn split(
        &mut self,
        deltas: &DeltaMap,
        index: usize,
        shared: Coverage,
        config: TraversalConfig,
    ) {
        let (Some(entry), Some(parent)) = (deltas.get(index), self.stack.last_mut()) else {
            return;
        };
        let dimension = parent.coverage.dimension();
        let mut complement = std::mem::replace(&mut parent.coverage, Coverage::empty(dimension));
        complement.subtract(&shared);
        trace!(
            position = entry.position(),
            delta = %entry.delta_type(),
            samples = shared.count(),
            remaining = complement.count(),
            "split"
        );
        let child = BranchFrame::branch(parent, index, entry, shared, config);
        if !complement.is_empty() {
            let sibling = parent.sibling(complement);
            self.stack.push(sibling);
        }
        self.stack.push(child);
    }

    fn pop_frame(&mut self, rejoin_at: Option<usize>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        if let Some(below) = self.stack.last_mut() {
            frame.hand_over(below, rejoin_at);
        }
        self.collapse_shells();
    }

    /// Drop the empty parents left under a sibling once the sibling is back
    /// on top. A shell and its sibling share one boundary.
    fn collapse_shells(&mut self) {
        while let [.., below, top] = self.stack.as_mut_slice() {
            if !below.coverage.is_empty() || below.boundary != top.boundary {
                break;
            }
            top.pending.append(&mut below.pending);
            let shell = self.stack.len() - 2;
            self.stack.remove(shell);
        }
    }
}
