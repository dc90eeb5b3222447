use std::iter::FusedIterator;

use crate::delta::Coverage;

use super::{SymbolOrigin, Traverser, TraverserState};

/// One reported context window and the samples sharing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// Samples whose sequence contains this window here.
    pub coverage: Coverage,
    /// Window symbols, oldest first; `context_size` long.
    pub context: Vec<u8>,
    /// Origin of the newest symbol.
    pub origin: SymbolOrigin,
}

impl ContextWindow {
    /// Newest symbol of the window.
    pub fn symbol(&self) -> u8 {
        self.context.last().copied().unwrap_or_default()
    }
}

/// Iterator over the remaining windows of a traverser.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    traverser: Traverser<'a>,
}

impl<'a> Windows<'a> {
    pub(super) fn new(traverser: Traverser<'a>) -> Self {
        Self { traverser }
    }

    /// The traverser driving this iterator.
    pub fn traverser(&self) -> &Traverser<'a> {
        &self.traverser
    }
}

impl Iterator for Windows<'_> {
    type Item = ContextWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.traverser.state != TraverserState::Initialized {
            return None;
        }
        let frame = self.traverser.stack.last()?;
        let window = ContextWindow {
            coverage: frame.coverage.clone(),
            context: frame.window.iter().copied().collect(),
            origin: frame.origin,
        };
        if !self.traverser.advance() {
            self.traverser.state = TraverserState::AtEnd;
        }
        Some(window)
    }
}

impl FusedIterator for Windows<'_> {}
