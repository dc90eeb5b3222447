//! Journaled string tree container
//!
//! Construction happens on a [`JstBuilder`]; [`JstBuilder::freeze`] validates
//! the delta set and hands back an immutable [`JournaledStringTree`].
//! Traversers only ever borrow the frozen form, so the delta map cannot
//! change underneath a running traversal.

mod materialize;

pub use materialize::{materialize, materialize_all};

use std::sync::Arc;

use tracing::debug;

use crate::delta::{Coverage, DeltaEndType, DeltaMap, DeltaType, DeltaValue, SampleId};
use crate::traversal::{TraversalConfig, Traverser};
use crate::JstError;

/// Mutable construction phase of a journaled string tree.
#[derive(Debug, Clone)]
pub struct JstBuilder {
    reference: Arc<[u8]>,
    deltas: DeltaMap,
}

impl JstBuilder {
    /// Start a collection of `dimension` samples over `reference`.
    pub fn new(reference: impl Into<Arc<[u8]>>, dimension: usize) -> Self {
        let reference = reference.into();
        let deltas = DeltaMap::new(reference.len(), dimension);
        Self { reference, deltas }
    }

    /// Add one delta carried by `coverage`.
    pub fn insert(
        &mut self,
        position: usize,
        value: DeltaValue,
        coverage: Coverage,
    ) -> Result<(), JstError> {
        self.deltas.insert(position, value, coverage)
    }

    /// Add one delta carried by the listed samples.
    pub fn insert_ids(
        &mut self,
        position: usize,
        value: DeltaValue,
        ids: &[SampleId],
    ) -> Result<(), JstError> {
        self.deltas.insert_ids(position, value, ids)
    }

    /// Number of samples.
    pub fn dimension(&self) -> usize {
        self.deltas.dimension()
    }

    /// Finish construction.
    ///
    /// Rejects sample sets in which one sample carries two deltas touching
    /// the same reference span; such a sample has no well-defined sequence.
    pub fn freeze(self) -> Result<JournaledStringTree, JstError> {
        check_overlaps(&self.deltas)?;
        debug!(
            reference_len = self.reference.len(),
            dimension = self.deltas.dimension(),
            records = self.deltas.len(),
            "froze journaled string tree"
        );
        Ok(JournaledStringTree {
            reference: self.reference,
            deltas: self.deltas,
        })
    }
}

/// Sweep records in map order tracking, per sample, the end of the last
/// consumed reference span.
fn check_overlaps(deltas: &DeltaMap) -> Result<(), JstError> {
    let mut busy_until = vec![0usize; deltas.dimension()];
    for entry in deltas.iter() {
        if entry.end_type() == DeltaEndType::Right {
            continue;
        }
        let position = entry.position();
        let span_end = position + entry.value().deleted_len();
        for sample in entry.coverage().iter() {
            if position < busy_until[sample] {
                return Err(JstError::OverlappingDelta { sample, position });
            }
            busy_until[sample] = busy_until[sample].max(span_end);
        }
    }
    Ok(())
}

/// Frozen reference + delta map, shareable across threads.
#[derive(Debug, Clone)]
pub struct JournaledStringTree {
    reference: Arc<[u8]>,
    deltas: DeltaMap,
}

impl JournaledStringTree {
    /// Shared reference sequence.
    #[inline]
    pub fn reference(&self) -> &Arc<[u8]> {
        &self.reference
    }

    /// Sorted delta records.
    #[inline]
    pub fn deltas(&self) -> &DeltaMap {
        &self.deltas
    }

    /// Number of samples.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.deltas.dimension()
    }

    /// Explicit sequence of one sample.
    pub fn materialize(&self, sample: SampleId) -> Result<Vec<u8>, JstError> {
        materialize(self, sample)
    }

    /// Explicit sequences of every sample, indexed by sample id.
    pub fn materialize_all(&self) -> Result<Vec<Vec<u8>>, JstError> {
        materialize_all(self)
    }

    /// Traverser bound to this tree, positioned on its first window.
    pub fn traverser(&self, context_size: usize) -> Result<Traverser<'_>, JstError> {
        self.traverser_with(TraversalConfig::new(context_size)?)
    }

    /// Traverser bound to this tree with explicit parameters.
    pub fn traverser_with(&self, config: TraversalConfig) -> Result<Traverser<'_>, JstError> {
        let mut traverser = Traverser::default();
        traverser.init_with(self, config)?;
        Ok(traverser)
    }

    /// Digest of reference, dimension and records.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.reference.len() as u64).to_le_bytes());
        hasher.update(&self.reference);
        hasher.update(&(self.dimension() as u64).to_le_bytes());
        for entry in self.deltas.iter() {
            hasher.update(&(entry.position() as u64).to_le_bytes());
            let tag: u8 = match entry.delta_type() {
                DeltaType::Snp => 0,
                DeltaType::Del => 1,
                DeltaType::Ins => 2,
                DeltaType::Sv => 3,
            };
            let end: u8 = match entry.end_type() {
                DeltaEndType::Whole => 0,
                DeltaEndType::Left => 1,
                DeltaEndType::Right => 2,
            };
            hasher.update(&[tag, end]);
            hasher.update(&(entry.value().deleted_len() as u64).to_le_bytes());
            let inserted = entry.value().inserted();
            hasher.update(&(inserted.len() as u64).to_le_bytes());
            hasher.update(inserted);
            let coverage = entry.coverage();
            hasher.update(&(coverage.count() as u64).to_le_bytes());
            for sample in coverage.iter() {
                hasher.update(&(sample as u64).to_le_bytes());
            }
        }
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeze_rejects_overlapping_deltas_of_one_sample() {
        let mut builder = JstBuilder::new(b"ACGTACGTAC".to_vec(), 3);
        builder.insert_ids(2, DeltaValue::Del(3), &[0, 1]).unwrap();
        builder.insert_ids(4, DeltaValue::Snp(b'A'), &[2, 1]).unwrap();
        assert_eq!(
            builder.freeze().unwrap_err(),
            JstError::OverlappingDelta { sample: 1, position: 4 }
        );
    }

    #[test]
    fn freeze_accepts_adjacent_and_stacked_edits() {
        let mut builder = JstBuilder::new(b"ACGTACGTAC".to_vec(), 2);
        builder.insert_ids(2, DeltaValue::Del(3), &[0]).unwrap();
        builder.insert_ids(5, DeltaValue::Ins(b"TT".to_vec()), &[0]).unwrap();
        builder.insert_ids(5, DeltaValue::Snp(b'G'), &[0]).unwrap();
        builder.insert_ids(5, DeltaValue::Ins(b"C".to_vec()), &[0, 1]).unwrap();
        let jst = builder.freeze().unwrap();
        assert_eq!(jst.dimension(), 2);
        assert_eq!(jst.deltas().len(), 5);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let build = |symbol: u8| {
            let mut builder = JstBuilder::new(b"ACGTACGT".to_vec(), 2);
            builder.insert_ids(3, DeltaValue::Snp(symbol), &[1]).unwrap();
            builder.freeze().unwrap()
        };
        assert_eq!(build(b'A').fingerprint(), build(b'A').fingerprint());
        assert_ne!(build(b'A').fingerprint(), build(b'C').fingerprint());
    }
}
