//! Sample coverage sets
//!
//! A coverage is a subset of the fixed sample universe `[0, dimension)`.
//! One bit per sample, so splitting and merging sample groups during
//! traversal is a handful of word operations.

use std::fmt;

use bitvec::prelude::*;

use crate::JstError;

/// Identifier of one sample (one sequence of the collection).
pub type SampleId = usize;

/// Set of samples over a universe fixed at construction.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Coverage {
    bits: BitVec,
}

impl Coverage {
    /// Coverage containing no sample.
    pub fn empty(dimension: usize) -> Self {
        Self {
            bits: bitvec![0; dimension],
        }
    }

    /// Coverage containing every sample of the universe.
    pub fn full(dimension: usize) -> Self {
        Self {
            bits: bitvec![1; dimension],
        }
    }

    /// Build a coverage from sample ids.
    ///
    /// Fails with [`JstError::InvalidCoverage`] on the first id outside
    /// `[0, dimension)`. Duplicate ids are accepted.
    pub fn from_ids<I>(dimension: usize, ids: I) -> Result<Self, JstError>
    where
        I: IntoIterator<Item = SampleId>,
    {
        let mut coverage = Self::empty(dimension);
        for id in ids {
            coverage.insert(id)?;
        }
        Ok(coverage)
    }

    /// Size of the sample universe.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.bits.len()
    }

    /// Add one sample.
    pub fn insert(&mut self, id: SampleId) -> Result<(), JstError> {
        if id >= self.dimension() {
            return Err(JstError::InvalidCoverage {
                id,
                dimension: self.dimension(),
            });
        }
        self.bits.set(id, true);
        Ok(())
    }

    /// Whether `id` belongs to the set. Ids outside the universe never do.
    #[inline]
    pub fn contains(&self, id: SampleId) -> bool {
        self.bits.get(id).map(|bit| *bit).unwrap_or(false)
    }

    /// Whether no sample is covered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Number of covered samples.
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Covered sample ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SampleId> + '_ {
        self.bits.iter_ones()
    }

    /// Samples covered by both `self` and `other`.
    pub fn intersection(&self, other: &Coverage) -> Coverage {
        debug_assert_eq!(self.dimension(), other.dimension());
        Coverage {
            bits: self.bits.clone() & other.bits.as_bitslice(),
        }
    }

    /// Remove every sample of `other` from `self`.
    pub fn subtract(&mut self, other: &Coverage) {
        debug_assert_eq!(self.dimension(), other.dimension());
        let keep = !other.bits.clone();
        self.bits &= keep.as_bitslice();
    }

    /// Add every sample of `other` to `self`.
    pub fn union_with(&mut self, other: &Coverage) {
        debug_assert_eq!(self.dimension(), other.dimension());
        self.bits |= other.bits.as_bitslice();
    }

    /// Whether the two sets share no sample.
    pub fn is_disjoint(&self, other: &Coverage) -> bool {
        self.intersection(other).is_empty()
    }
}

impl fmt::Debug for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{id}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ids_rejects_ids_outside_universe() {
        let result = Coverage::from_ids(4, [0, 4]);
        assert!(matches!(
            result,
            Err(JstError::InvalidCoverage { id: 4, dimension: 4 })
        ));
    }

    #[test]
    fn split_and_merge_restore_the_original_set() {
        let full = Coverage::full(70);
        let carriers = Coverage::from_ids(70, [1, 3, 64, 69]).unwrap();

        let shared = full.intersection(&carriers);
        assert_eq!(shared, carriers);

        let mut rest = full.clone();
        rest.subtract(&shared);
        assert_eq!(rest.count(), 66);
        assert!(rest.is_disjoint(&shared));
        assert!(!rest.contains(64));

        rest.union_with(&shared);
        assert_eq!(rest, full);
    }

    #[test]
    fn display_lists_sample_ids() {
        let coverage = Coverage::from_ids(10, [9, 0, 3]).unwrap();
        assert_eq!(coverage.to_string(), "0,3,9");
        assert_eq!(format!("{coverage:?}"), "{0, 3, 9}");
        assert!(Coverage::empty(10).is_empty());
    }

    #[test]
    fn set_algebra_spans_several_words() {
        let dimension = 130;
        let evens = Coverage::from_ids(dimension, (0..dimension).step_by(2)).unwrap();
        let tail = Coverage::from_ids(dimension, 120..dimension).unwrap();

        let shared = evens.intersection(&tail);
        assert_eq!(shared.iter().collect::<Vec<_>>(), vec![120, 122, 124, 126, 128]);

        let mut odds = Coverage::full(dimension);
        odds.subtract(&evens);
        assert_eq!(odds.count(), 65);
        assert!(odds.is_disjoint(&evens));
        assert!(!odds.is_disjoint(&tail));
        assert!(odds.iter().all(|id| id % 2 == 1));
        assert_eq!(odds.dimension(), dimension);

        odds.union_with(&tail);
        assert_eq!(odds.count(), 70);
        assert!(odds.contains(128) && odds.contains(129));
        assert!(!odds.contains(130));
    }
}
