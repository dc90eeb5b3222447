#![allow(dead_code)]

use jstree::{DeltaValue, JournaledStringTree, JstBuilder, TraversalConfig};

pub const SIMPLE_REFERENCE: &[u8] = b"AGATCGAGCGAGCTAGCGACTCAG";
pub const SIMPLE_CARRIERS: [usize; 4] = [0, 3, 9, 99];

/// Reference of 24 symbols, 100 samples, five deltas carried by samples
/// 0, 3, 9 and 99.
pub fn simple_jst() -> JournaledStringTree {
    let mut builder = JstBuilder::new(SIMPLE_REFERENCE.to_vec(), 100);
    builder
        .insert_ids(1, DeltaValue::Del(3), &SIMPLE_CARRIERS)
        .expect("deletion fits");
    builder
        .insert_ids(8, DeltaValue::Ins(b"CGTA".to_vec()), &SIMPLE_CARRIERS)
        .expect("insertion fits");
    builder
        .insert_ids(10, DeltaValue::Snp(b'C'), &SIMPLE_CARRIERS)
        .expect("snp fits");
    builder
        .insert_ids(15, DeltaValue::Del(2), &SIMPLE_CARRIERS)
        .expect("deletion fits");
    builder
        .insert_ids(20, DeltaValue::Snp(b'A'), &SIMPLE_CARRIERS)
        .expect("snp fits");
    builder.freeze().expect("deltas do not overlap")
}

/// Rebuild every sample from the reported windows: the first window of a
/// sample contributes all its symbols, every later one its newest symbol.
pub fn reconstruct(jst: &JournaledStringTree, config: TraversalConfig) -> Vec<Vec<u8>> {
    let mut sequences = vec![Vec::new(); jst.dimension()];
    let traverser = jst.traverser_with(config).expect("valid configuration");
    for window in traverser.windows() {
        assert_eq!(window.context.len(), config.context_size);
        for sample in window.coverage.iter() {
            let sequence = &mut sequences[sample];
            if sequence.is_empty() {
                sequence.extend_from_slice(&window.context);
            } else {
                sequence.push(window.symbol());
            }
        }
    }
    sequences
}

/// What [`reconstruct`] must yield for one sample: its sequence, or
/// nothing when it is shorter than one window.
pub fn expected_reconstruction(jst: &JournaledStringTree, sample: usize, context_size: usize) -> Vec<u8> {
    let sequence = jst.materialize(sample).expect("sample in range");
    if sequence.len() < context_size {
        Vec::new()
    } else {
        sequence
    }
}
