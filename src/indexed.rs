//! Index/count pairs, the unit of per-message metadata.
//!
//! Dictionaries (words, emojis, domains, ...) live once in the database;
//! messages refer to them by index. An [`IndexCounts`] list states which
//! entries appear in a context and how often, e.g. "word 13 twice, word 7
//! once" for one message's text.

use std::collections::BTreeMap;

/// A list of `(index, count)` pairs.
///
/// Producers sort by count (descending); consumers must not assume the list
/// is free of duplicate indices, since the wire codec may split an entry.
/// Treat it as a multiset.
pub type IndexCounts = Vec<(u32, u32)>;

/// Accumulates counts per index and produces a sorted [`IndexCounts`].
///
/// Output is ordered by count descending; ties keep ascending index order.
/// The tie order matters more than it looks: count-1 entries (the common
/// case) stay index-consecutive, which the wire codec folds into runs.
///
/// # Example
///
/// ```rust
/// use chatstats::indexed::IndexCountsBuilder;
///
/// let mut counts = IndexCountsBuilder::new();
/// counts.incr(4);
/// counts.incr(1);
/// counts.incr(4);
/// assert_eq!(counts.into_vec(), vec![(4, 2), (1, 1)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IndexCountsBuilder {
    data: BTreeMap<u32, u32>,
}

impl IndexCountsBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        IndexCountsBuilder::default()
    }

    /// Builds counts from a plain list of indices.
    #[must_use]
    pub fn from_list(list: &[u32]) -> Self {
        let mut builder = IndexCountsBuilder::new();
        for &index in list {
            builder.incr(index);
        }
        builder
    }

    /// Increments the count for `index` by one.
    pub fn incr(&mut self, index: u32) {
        self.incr_by(index, 1);
    }

    /// Increments the count for `index` by `amount`.
    pub fn incr_by(&mut self, index: u32, amount: u32) {
        *self.data.entry(index).or_insert(0) += amount;
    }

    /// `true` if nothing has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Converts into `(index, count)` pairs, count descending, ties by
    /// ascending index.
    #[must_use]
    pub fn into_vec(self) -> IndexCounts {
        let mut pairs: IndexCounts = self.data.into_iter().collect();
        // BTreeMap iterates in index order; the stable sort keeps that order
        // within equal counts.
        pairs.sort_by(|a, b| b.1.cmp(&a.1));
        pairs
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_increments() {
        let mut builder = IndexCountsBuilder::new();
        builder.incr(1);
        builder.incr(3);
        builder.incr_by(3, 4);
        assert_eq!(builder.into_vec(), vec![(3, 5), (1, 1)]);
    }

    #[test]
    fn from_list_counts_occurrences() {
        let counts = IndexCountsBuilder::from_list(&[1, 4, 4, 1, 2, 4]).into_vec();
        assert_eq!(counts, vec![(4, 3), (1, 2), (2, 1)]);
    }

    #[test]
    fn ties_keep_ascending_index_order() {
        let counts = IndexCountsBuilder::from_list(&[9, 3, 7, 5]).into_vec();
        assert_eq!(counts, vec![(3, 1), (5, 1), (7, 1), (9, 1)]);
    }

    #[test]
    fn empty_builder_yields_empty_vec() {
        let builder = IndexCountsBuilder::new();
        assert!(builder.is_empty());
        assert!(builder.into_vec().is_empty());
    }
}
