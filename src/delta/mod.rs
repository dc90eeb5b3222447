//! Delta map: sorted edit records over reference coordinates
//!
//! Every logical delta owns one payload (value + coverage) in an arena.
//! Records point at payloads by index, so the two halves of a deletion or
//! structural variant share one coverage set without aliasing.
//!
//! Ordering: ascending position; at equal position RIGHT halves first,
//! then insertions, then everything else; remaining ties keep insertion
//! order.

mod coverage;

pub use coverage::{Coverage, SampleId};

use std::fmt;

use crate::JstError;

/// Kind of edit a delta applies to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeltaType {
    /// Single-symbol substitution.
    Snp,
    /// Deletion of a reference span.
    Del,
    /// Insertion before a reference position.
    Ins,
    /// Deletion followed by an insertion at the same position.
    Sv,
}

impl fmt::Display for DeltaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeltaType::Snp => "SNP",
            DeltaType::Del => "DEL",
            DeltaType::Ins => "INS",
            DeltaType::Sv => "SV",
        };
        f.write_str(name)
    }
}

/// Which half of a split record this is.
///
/// Deletions and structural variants are stored twice: a `Left` half at the
/// deletion start and a `Right` half at the deletion end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeltaEndType {
    /// Record is not split.
    Whole,
    /// Start of a split record.
    Left,
    /// End of a split record.
    Right,
}

/// Type-specific value of a delta.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeltaValue {
    /// Substituted symbol.
    Snp(u8),
    /// Number of deleted reference symbols.
    Del(usize),
    /// Inserted symbols.
    Ins(Vec<u8>),
    /// Deleted length and inserted replacement.
    Sv {
        /// Number of deleted reference symbols.
        deleted: usize,
        /// Symbols inserted in place of the deleted span.
        inserted: Vec<u8>,
    },
}

impl DeltaValue {
    /// Tag of this value.
    pub fn delta_type(&self) -> DeltaType {
        match self {
            DeltaValue::Snp(_) => DeltaType::Snp,
            DeltaValue::Del(_) => DeltaType::Del,
            DeltaValue::Ins(_) => DeltaType::Ins,
            DeltaValue::Sv { .. } => DeltaType::Sv,
        }
    }

    /// Reference symbols consumed by the edit (an SNP replaces one).
    pub fn deleted_len(&self) -> usize {
        match self {
            DeltaValue::Snp(_) => 1,
            DeltaValue::Del(len) => *len,
            DeltaValue::Ins(_) => 0,
            DeltaValue::Sv { deleted, .. } => *deleted,
        }
    }

    /// Symbols the edit puts in place of the consumed span.
    pub fn inserted(&self) -> &[u8] {
        match self {
            DeltaValue::Snp(symbol) => std::slice::from_ref(symbol),
            DeltaValue::Del(_) => &[],
            DeltaValue::Ins(symbols) => symbols,
            DeltaValue::Sv { inserted, .. } => inserted,
        }
    }

    /// Substituted symbol of an SNP.
    pub fn as_snp(&self) -> Result<u8, JstError> {
        match self {
            DeltaValue::Snp(symbol) => Ok(*symbol),
            other => Err(other.mismatch(DeltaType::Snp)),
        }
    }

    /// Deleted length of a DEL.
    pub fn as_del(&self) -> Result<usize, JstError> {
        match self {
            DeltaValue::Del(len) => Ok(*len),
            other => Err(other.mismatch(DeltaType::Del)),
        }
    }

    /// Inserted symbols of an INS.
    pub fn as_ins(&self) -> Result<&[u8], JstError> {
        match self {
            DeltaValue::Ins(symbols) => Ok(symbols),
            other => Err(other.mismatch(DeltaType::Ins)),
        }
    }

    /// Deleted length and inserted symbols of an SV.
    pub fn as_sv(&self) -> Result<(usize, &[u8]), JstError> {
        match self {
            DeltaValue::Sv { deleted, inserted } => Ok((*deleted, inserted)),
            other => Err(other.mismatch(DeltaType::Sv)),
        }
    }

    fn mismatch(&self, expected: DeltaType) -> JstError {
        JstError::TypeMismatch {
            expected,
            found: self.delta_type(),
        }
    }
}

/// Value and carriers of one logical delta.
#[derive(Debug, Clone)]
pub(crate) struct Payload {
    pub(crate) value: DeltaValue,
    pub(crate) coverage: Coverage,
}

/// One entry of the sorted record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeltaRecord {
    position: usize,
    end_type: DeltaEndType,
    payload: usize,
}

impl DeltaRecord {
    fn sort_key(&self, value: &DeltaValue) -> (usize, u8) {
        let rank = match (self.end_type, value) {
            (DeltaEndType::Right, _) => 0,
            (_, DeltaValue::Ins(_)) => 1,
            _ => 2,
        };
        (self.position, rank)
    }
}

/// Read view of one record together with its payload.
#[derive(Debug, Clone, Copy)]
pub struct DeltaEntry<'a> {
    record: &'a DeltaRecord,
    payload: &'a Payload,
}

impl<'a> DeltaEntry<'a> {
    /// Reference position of this record.
    #[inline]
    pub fn position(&self) -> usize {
        self.record.position
    }

    /// Tag of the record's value.
    #[inline]
    pub fn delta_type(&self) -> DeltaType {
        self.payload.value.delta_type()
    }

    /// Samples carrying the delta.
    #[inline]
    pub fn coverage(&self) -> &'a Coverage {
        &self.payload.coverage
    }

    /// Half marker of split records.
    #[inline]
    pub fn end_type(&self) -> DeltaEndType {
        self.record.end_type
    }

    /// Untagged access to the value.
    #[inline]
    pub fn value(&self) -> &'a DeltaValue {
        &self.payload.value
    }

    /// Value access checked against the caller's expectation.
    pub fn value_as(&self, expected: DeltaType) -> Result<&'a DeltaValue, JstError> {
        let value = &self.payload.value;
        if value.delta_type() != expected {
            return Err(value.mismatch(expected));
        }
        Ok(value)
    }

    /// Index of the payload shared by both halves of a split record.
    #[inline]
    pub(crate) fn payload_index(&self) -> usize {
        self.record.payload
    }
}

/// Sorted collection of deltas over one reference.
#[derive(Debug, Clone)]
pub struct DeltaMap {
    records: Vec<DeltaRecord>,
    payloads: Vec<Payload>,
    reference_len: usize,
    dimension: usize,
}

impl DeltaMap {
    /// Empty map for a reference of `reference_len` symbols and
    /// `dimension` samples.
    pub fn new(reference_len: usize, dimension: usize) -> Self {
        Self {
            records: Vec::new(),
            payloads: Vec::new(),
            reference_len,
            dimension,
        }
    }

    /// Insert one delta, keeping the record list sorted.
    ///
    /// Deltas arriving in position order append at the end of the record
    /// list after a binary search. An out-of-order delta shifts the records
    /// behind it, so building from unsorted input costs `O(n)` per insert.
    pub fn insert(
        &mut self,
        position: usize,
        value: DeltaValue,
        coverage: Coverage,
    ) -> Result<(), JstError> {
        self.validate(position, &value, &coverage)?;

        let payload = self.payloads.len();
        let split = matches!(value.delta_type(), DeltaType::Del | DeltaType::Sv);
        let deleted = value.deleted_len();
        self.payloads.push(Payload { value, coverage });

        if split {
            self.insert_record(DeltaRecord {
                position,
                end_type: DeltaEndType::Left,
                payload,
            });
            self.insert_record(DeltaRecord {
                position: position + deleted,
                end_type: DeltaEndType::Right,
                payload,
            });
        } else {
            self.insert_record(DeltaRecord {
                position,
                end_type: DeltaEndType::Whole,
                payload,
            });
        }
        Ok(())
    }

    /// Insert one delta carried by the listed samples.
    pub fn insert_ids(
        &mut self,
        position: usize,
        value: DeltaValue,
        ids: &[SampleId],
    ) -> Result<(), JstError> {
        let coverage = Coverage::from_ids(self.dimension, ids.iter().copied())?;
        self.insert(position, value, coverage)
    }

    fn validate(
        &self,
        position: usize,
        value: &DeltaValue,
        coverage: &Coverage,
    ) -> Result<(), JstError> {
        if coverage.dimension() != self.dimension {
            return Err(JstError::CoverageDimension {
                expected: self.dimension,
                found: coverage.dimension(),
            });
        }
        match value {
            DeltaValue::Del(0) | DeltaValue::Sv { deleted: 0, .. } => {
                return Err(JstError::InvalidDelta(format!(
                    "{} at {position} deletes nothing",
                    value.delta_type()
                )));
            }
            DeltaValue::Ins(symbols) if symbols.is_empty() => {
                return Err(JstError::InvalidDelta(format!(
                    "INS at {position} inserts nothing"
                )));
            }
            _ => {}
        }
        let span_end = position.saturating_add(value.deleted_len());
        if position > self.reference_len || span_end > self.reference_len {
            return Err(JstError::OutOfRange {
                position,
                span_end,
                reference_len: self.reference_len,
            });
        }
        Ok(())
    }

    /// Binary search for the slot after every record with a key `<=` the new
    /// one; for sorted input that slot is the end of the list.
    fn insert_record(&mut self, record: DeltaRecord) {
        let key = record.sort_key(&self.payloads[record.payload].value);
        let payloads = &self.payloads;
        let index = self
            .records
            .partition_point(|existing| existing.sort_key(&payloads[existing.payload].value) <= key);
        if index == self.records.len() {
            self.records.push(record);
        } else {
            self.records.insert(index, record);
        }
    }

    /// Number of records (split deltas count twice).
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no delta was inserted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of samples the coverages range over.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Length of the reference the positions refer to.
    #[inline]
    pub fn reference_len(&self) -> usize {
        self.reference_len
    }

    /// Record at `index` in map order.
    pub fn get(&self, index: usize) -> Option<DeltaEntry<'_>> {
        let record = self.records.get(index)?;
        Some(DeltaEntry {
            record,
            payload: &self.payloads[record.payload],
        })
    }

    /// Records in map order; `.rev()` walks them highest position first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = DeltaEntry<'_>> + ExactSizeIterator {
        self.records.iter().map(move |record| DeltaEntry {
            record,
            payload: &self.payloads[record.payload],
        })
    }

    /// Number of logical deltas of the given type.
    pub fn count(&self, delta_type: DeltaType) -> usize {
        self.payloads
            .iter()
            .filter(|payload| payload.value.delta_type() == delta_type)
            .count()
    }

    pub(crate) fn payload(&self, index: usize) -> &Payload {
        &self.payloads[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(deltas: &[(usize, DeltaValue)]) -> DeltaMap {
        let mut map = DeltaMap::new(24, 4);
        for (position, value) in deltas {
            map.insert_ids(*position, value.clone(), &[0, 2]).unwrap();
        }
        map
    }

    #[test]
    fn records_stay_sorted_by_position() {
        let map = map_with(&[
            (10, DeltaValue::Snp(b'C')),
            (1, DeltaValue::Del(3)),
            (8, DeltaValue::Ins(b"CGTA".to_vec())),
        ]);
        let positions: Vec<usize> = map.iter().map(|entry| entry.position()).collect();
        assert_eq!(positions, vec![1, 4, 8, 10]);
        assert_eq!(map.get(1).unwrap().end_type(), DeltaEndType::Right);
        assert_eq!(map.count(DeltaType::Del), 1);
    }

    #[test]
    fn insertion_order_does_not_change_the_record_order() {
        let deltas: Vec<(usize, DeltaValue)> = (0..20)
            .map(|position| (position, DeltaValue::Snp(b'A')))
            .chain([(20, DeltaValue::Del(2)), (20, DeltaValue::Ins(b"T".to_vec()))])
            .collect();
        let ascending = map_with(&deltas);
        let mut reversed = deltas.clone();
        reversed.reverse();
        let descending = map_with(&reversed);

        let order = |map: &DeltaMap| -> Vec<(usize, DeltaType, DeltaEndType)> {
            map.iter()
                .map(|entry| (entry.position(), entry.delta_type(), entry.end_type()))
                .collect()
        };
        assert_eq!(order(&ascending), order(&descending));
        assert_eq!(ascending.len(), 23);
        assert_eq!(ascending.get(20).unwrap().delta_type(), DeltaType::Ins);
        assert_eq!(ascending.get(22).unwrap().position(), 22);
    }

    #[test]
    fn equal_positions_order_right_halves_then_insertions() {
        let map = map_with(&[
            (5, DeltaValue::Snp(b'T')),
            (5, DeltaValue::Ins(b"AA".to_vec())),
            (2, DeltaValue::Del(3)),
            (5, DeltaValue::Ins(b"G".to_vec())),
        ]);
        let at_five: Vec<(DeltaType, DeltaEndType)> = map
            .iter()
            .filter(|entry| entry.position() == 5)
            .map(|entry| (entry.delta_type(), entry.end_type()))
            .collect();
        assert_eq!(
            at_five,
            vec![
                (DeltaType::Del, DeltaEndType::Right),
                (DeltaType::Ins, DeltaEndType::Whole),
                (DeltaType::Ins, DeltaEndType::Whole),
                (DeltaType::Snp, DeltaEndType::Whole),
            ]
        );
        let inserted: Vec<&[u8]> = map
            .iter()
            .filter(|entry| entry.delta_type() == DeltaType::Ins)
            .map(|entry| entry.value().inserted())
            .collect();
        assert_eq!(inserted, vec![b"AA".as_slice(), b"G".as_slice()]);
    }

    #[test]
    fn split_halves_share_one_coverage() {
        let map = map_with(&[(3, DeltaValue::Sv { deleted: 2, inserted: b"TT".to_vec() })]);
        let left = map.get(0).unwrap();
        let right = map.get(1).unwrap();
        assert_eq!(left.payload_index(), right.payload_index());
        assert!(std::ptr::eq(left.coverage(), right.coverage()));
        assert_eq!(right.position(), 5);
    }

    #[test]
    fn insert_rejects_positions_past_the_reference() {
        let mut map = DeltaMap::new(24, 4);
        assert!(matches!(
            map.insert_ids(25, DeltaValue::Ins(b"A".to_vec()), &[0]),
            Err(JstError::OutOfRange { position: 25, .. })
        ));
        assert!(matches!(
            map.insert_ids(24, DeltaValue::Snp(b'A'), &[0]),
            Err(JstError::OutOfRange { span_end: 25, .. })
        ));
        assert!(matches!(
            map.insert_ids(20, DeltaValue::Del(5), &[0]),
            Err(JstError::OutOfRange { .. })
        ));
        map.insert_ids(24, DeltaValue::Ins(b"A".to_vec()), &[0]).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn insert_rejects_foreign_coverage() {
        let mut map = DeltaMap::new(24, 4);
        assert!(matches!(
            map.insert_ids(3, DeltaValue::Snp(b'A'), &[4]),
            Err(JstError::InvalidCoverage { id: 4, dimension: 4 })
        ));
        assert!(matches!(
            map.insert(3, DeltaValue::Snp(b'A'), Coverage::full(5)),
            Err(JstError::CoverageDimension { expected: 4, found: 5 })
        ));
        assert!(matches!(
            map.insert_ids(3, DeltaValue::Del(0), &[1]),
            Err(JstError::InvalidDelta(_))
        ));
        assert!(map.is_empty());
    }

    #[test]
    fn tagged_access_checks_the_type() {
        let map = map_with(&[(4, DeltaValue::Ins(b"CG".to_vec()))]);
        let entry = map.get(0).unwrap();
        assert_eq!(entry.value_as(DeltaType::Ins).unwrap().as_ins().unwrap(), b"CG");
        assert!(matches!(
            entry.value_as(DeltaType::Snp),
            Err(JstError::TypeMismatch {
                expected: DeltaType::Snp,
                found: DeltaType::Ins
            })
        ));
        assert!(matches!(
            entry.value().as_del(),
            Err(JstError::TypeMismatch { .. })
        ));
        assert_eq!(DeltaValue::Snp(b'G').as_snp().unwrap(), b'G');
        assert_eq!(
            DeltaValue::Sv { deleted: 3, inserted: b"A".to_vec() }.as_sv().unwrap(),
            (3, b"A".as_slice())
        );
    }
}
