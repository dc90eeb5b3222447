//! Explicit reconstruction of single samples
//!
//! Edits are applied highest position first onto a copy of the reference.
//! An edit at `p` only shifts symbols at or after `p`, so every lower,
//! not-yet-applied position stays valid without coordinate translation.

use crate::delta::{DeltaEndType, DeltaValue, SampleId};
use crate::JstError;

use super::JournaledStringTree;

/// Build the full sequence of `sample`.
///
/// Linear in the map size; meant for validation and one-off extraction,
/// not for scanning the whole collection.
pub fn materialize(jst: &JournaledStringTree, sample: SampleId) -> Result<Vec<u8>, JstError> {
    if sample >= jst.dimension() {
        return Err(JstError::InvalidCoverage {
            id: sample,
            dimension: jst.dimension(),
        });
    }

    let mut sequence = jst.reference().to_vec();
    for entry in jst.deltas().iter().rev() {
        if !entry.coverage().contains(sample) {
            continue;
        }
        let position = entry.position();
        match (entry.value(), entry.end_type()) {
            // Split records are applied once, from their right half.
            (DeltaValue::Del(_) | DeltaValue::Sv { .. }, DeltaEndType::Left) => {}
            (DeltaValue::Snp(symbol), _) => sequence[position] = *symbol,
            (DeltaValue::Ins(symbols), _) => {
                sequence.splice(position..position, symbols.iter().copied());
            }
            (DeltaValue::Del(len), end_type) => {
                let start = span_start(position, *len, end_type);
                sequence.drain(start..start + len);
            }
            (DeltaValue::Sv { deleted, inserted }, end_type) => {
                let start = span_start(position, *deleted, end_type);
                sequence.splice(start..start + deleted, inserted.iter().copied());
            }
        }
    }
    Ok(sequence)
}

/// Sequences of every sample, indexed by sample id.
pub fn materialize_all(jst: &JournaledStringTree) -> Result<Vec<Vec<u8>>, JstError> {
    (0..jst.dimension())
        .map(|sample| materialize(jst, sample))
        .collect()
}

fn span_start(position: usize, len: usize, end_type: DeltaEndType) -> usize {
    match end_type {
        DeltaEndType::Right => position - len,
        _ => position,
    }
}
