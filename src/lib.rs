//! # Journaled String Tree
//!
//! Delta-encoded storage for many near-identical sequences (one reference,
//! many samples) and a traversal engine that walks every sample's sequence
//! at once without materializing any of them.
//!
//! ## Components
//!
//! 1. **Delta map**: sorted SNP/DEL/INS/SV records, each tagged with the
//!    coverage set of samples carrying it
//! 2. **Container**: reference + delta map, built once and frozen
//! 3. **Materializer**: explicit reconstruction of one sample
//! 4. **Traverser**: explicit stack of branch frames that splits sample
//!    groups at divergent deltas and merges them back afterwards
//!
//! ## Usage Example
//!
//! ```
//! use jstree::{DeltaValue, JstBuilder};
//!
//! let mut builder = JstBuilder::new(b"ACGTACGT".to_vec(), 3);
//! builder.insert_ids(2, DeltaValue::Snp(b'T'), &[1])?;
//! let jst = builder.freeze()?;
//!
//! let mut traverser = jst.traverser(1)?;
//! let mut sample_one = Vec::new();
//! while !traverser.at_end() {
//!     if traverser.coverage()?.contains(1) {
//!         sample_one.push(traverser.context_iterator()?);
//!     }
//!     traverser.go_next(1)?;
//! }
//! assert_eq!(sample_one, b"ACTTACGT");
//! assert_eq!(jst.materialize(1)?, sample_one);
//! # Ok::<(), jstree::JstError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod container; // Reference + delta map, builder and frozen form
pub mod delta; // Delta records and coverage sets
pub mod traversal; // Branch-stack traversal engine

// Re-exports for convenience
pub use container::{materialize, materialize_all, JournaledStringTree, JstBuilder};
pub use delta::{
    Coverage, DeltaEndType, DeltaEntry, DeltaMap, DeltaType, DeltaValue, SampleId,
};
pub use traversal::{
    ContextWindow, SymbolOrigin, TraversalConfig, Traverser, TraverserState, Windows,
};

use thiserror::Error;

/// Errors raised while building or traversing a journaled string tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JstError {
    /// Delta position or deleted span reaches past the reference
    #[error("delta at {position} spans to {span_end}, past reference length {reference_len}")]
    OutOfRange {
        /// Position the delta was inserted at
        position: usize,
        /// End of the reference span the delta consumes
        span_end: usize,
        /// Length of the reference
        reference_len: usize,
    },

    /// Sample id outside the sample universe
    #[error("sample id {id} outside dimension {dimension}")]
    InvalidCoverage {
        /// Offending sample id
        id: usize,
        /// Number of samples
        dimension: usize,
    },

    /// Coverage built over a different sample universe
    #[error("coverage over {found} samples, expected {expected}")]
    CoverageDimension {
        /// Dimension of the container
        expected: usize,
        /// Dimension of the supplied coverage
        found: usize,
    },

    /// Delta value accessed under the wrong tag
    #[error("delta value is {found}, not {expected}")]
    TypeMismatch {
        /// Tag the caller asked for
        expected: DeltaType,
        /// Tag actually stored
        found: DeltaType,
    },

    /// Operation not allowed in the traverser's current state
    #[error("traverser is {0:?}")]
    InvalidState(TraverserState),

    /// Delta value that edits nothing
    #[error("invalid delta: {0}")]
    InvalidDelta(String),

    /// Two deltas of one sample touch the same reference span
    #[error("sample {sample} has overlapping deltas at position {position}")]
    OverlappingDelta {
        /// Sample carrying both deltas
        sample: usize,
        /// Position of the later delta
        position: usize,
    },

    /// Traversal parameters out of range
    #[error("invalid traversal configuration: {0}")]
    InvalidConfiguration(String),
}
