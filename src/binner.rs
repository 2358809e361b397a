//! The bins-array manager shared by every algorithm.
//!
//! A partitioning algorithm keeps one or more arrays of bins and fills them
//! incrementally; branch-and-bound algorithms keep many candidate arrays
//! alive at once. The [`Binner`] is a flyweight that owns the data shared by
//! all arrays of one invocation (bin count, item values, item copies) and
//! provides the operations to create, clone, extend, combine and sort
//! [`BinsArray`] instances cheaply.
//!
//! Two flavors exist: sums-only arrays track one running sum per bin;
//! contents arrays additionally track which items went where, preserving
//! insertion order. [`Binner::add_item_to_bin`] is the only mutating
//! primitive and runs in amortized constant time.

use std::collections::HashSet;

use itertools::Itertools;
use ordered_float::OrderedFloat;

/// Dense index of an item; assigned by the adapter during normalization.
pub type ItemId = usize;

/// A hashable key built from a sums vector, usable in sets and maps.
pub type SumsKey = Vec<OrderedFloat<f64>>;

/// Whether bin-arrays track only sums, or sums plus per-bin item lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinnerFlavor {
    KeepSums,
    KeepContents,
}

/// A candidate partition of some prefix of the items into bins.
///
/// Invariants: `sums[i]` always equals the total value of the items assigned
/// to bin `i`; when contents are tracked, the item lists are parallel to the
/// sums and are co-permuted by sorting.
#[derive(Debug, Clone, PartialEq)]
pub struct BinsArray {
    sums: Vec<f64>,
    contents: Option<Vec<Vec<ItemId>>>,
}

impl BinsArray {
    /// The current number of bins.
    pub fn numbins(&self) -> usize {
        self.sums.len()
    }

    /// The current bin sums.
    pub fn sums(&self) -> &[f64] {
        &self.sums
    }

    /// The per-bin item lists, if this array tracks contents.
    pub fn contents(&self) -> Option<&[Vec<ItemId>]> {
        self.contents.as_deref()
    }

    /// Difference between the largest and smallest bin sum (0 for no bins).
    pub fn sums_difference(&self) -> f64 {
        if self.sums.is_empty() {
            return 0.0;
        }
        let max = self.sums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = self.sums.iter().copied().fold(f64::INFINITY, f64::min);
        max - min
    }

    pub(crate) fn from_sums(sums: Vec<f64>) -> Self {
        BinsArray {
            sums,
            contents: None,
        }
    }
}

/// Flyweight manager for [`BinsArray`] instances.
///
/// All arrays created by the same binner share the bin count, the item
/// values and the item multiplicities. The binner itself holds no mutable
/// state; it is created per top-level call and discarded afterwards.
#[derive(Debug, Clone)]
pub struct Binner {
    numbins: usize,
    values: Vec<f64>,
    copies: Vec<usize>,
    flavor: BinnerFlavor,
}

impl Binner {
    pub fn new(numbins: usize, values: Vec<f64>, flavor: BinnerFlavor) -> Self {
        let copies = vec![1; values.len()];
        Binner {
            numbins,
            values,
            copies,
            flavor,
        }
    }

    pub fn with_copies(
        numbins: usize,
        values: Vec<f64>,
        copies: Vec<usize>,
        flavor: BinnerFlavor,
    ) -> Self {
        assert_eq!(values.len(), copies.len(), "values and copies must be parallel");
        Binner {
            numbins,
            values,
            copies,
            flavor,
        }
    }

    /// The bin count of the top-level problem.
    pub fn numbins(&self) -> usize {
        self.numbins
    }

    pub fn flavor(&self) -> BinnerFlavor {
        self.flavor
    }

    /// The value of one item.
    pub fn valueof(&self, item: ItemId) -> f64 {
        self.values[item]
    }

    /// The multiplicity of one item.
    pub fn copiesof(&self, item: ItemId) -> usize {
        self.copies[item]
    }

    /// Total value of a slice of items.
    pub fn total_value(&self, items: &[ItemId]) -> f64 {
        items.iter().map(|&item| self.values[item]).sum()
    }

    /// A copy of this binner with a different bin count and flavor.
    /// Used when an algorithm recurses into a smaller sub-problem, e.g.
    /// two-way differencing inside a k-way search.
    pub fn with_numbins(&self, numbins: usize, flavor: BinnerFlavor) -> Binner {
        Binner {
            numbins,
            values: self.values.clone(),
            copies: self.copies.clone(),
            flavor,
        }
    }

    /// Create a new array of `numbins` empty bins.
    pub fn new_bins(&self, numbins: usize) -> BinsArray {
        BinsArray {
            sums: vec![0.0; numbins],
            contents: match self.flavor {
                BinnerFlavor::KeepSums => None,
                BinnerFlavor::KeepContents => Some(vec![Vec::new(); numbins]),
            },
        }
    }

    /// A copy of `bins` with `count` empty bins appended.
    pub fn add_empty_bins(&self, bins: &BinsArray, count: usize) -> BinsArray {
        let mut sums = bins.sums.clone();
        sums.extend(std::iter::repeat(0.0).take(count));
        let contents = bins.contents.as_ref().map(|lists| {
            let mut lists = lists.clone();
            lists.extend(std::iter::repeat(Vec::new()).take(count));
            lists
        });
        BinsArray { sums, contents }
    }

    /// A copy of `bins` with `count` bins removed from the end.
    pub fn remove_bins(&self, bins: &BinsArray, count: usize) -> BinsArray {
        let keep = bins.numbins() - count;
        BinsArray {
            sums: bins.sums[..keep].to_vec(),
            contents: bins.contents.as_ref().map(|lists| lists[..keep].to_vec()),
        }
    }

    /// Add one item to the given bin, updating the sum (and the item list
    /// when contents are tracked). The only mutating primitive.
    pub fn add_item_to_bin(&self, bins: &mut BinsArray, item: ItemId, bin_index: usize) {
        bins.sums[bin_index] += self.values[item];
        if let Some(lists) = bins.contents.as_mut() {
            lists[bin_index].push(item);
        }
    }

    /// Sort the bins by ascending sum, co-permuting the item lists.
    /// Ties break deterministically by the original bin index.
    pub fn sort_by_ascending_sum(&self, bins: &mut BinsArray) {
        match bins.contents.as_mut() {
            None => bins.sums.sort_by(f64::total_cmp),
            Some(lists) => {
                let mut order: Vec<usize> = (0..bins.sums.len()).collect();
                order.sort_by(|&a, &b| bins.sums[a].total_cmp(&bins.sums[b]).then(a.cmp(&b)));
                bins.sums = order.iter().map(|&i| bins.sums[i]).collect();
                *lists = order.iter().map(|&i| std::mem::take(&mut lists[i])).collect();
            }
        }
    }

    /// A hashable key built from the current sums, e.g. for seen-state sets.
    pub fn sums_key(&self, bins: &BinsArray) -> SumsKey {
        bins.sums.iter().copied().map(OrderedFloat).collect()
    }

    /// Merge bin `src_bin` of `src` into bin `dst_bin` of `dst`:
    /// the sums add up and the item lists concatenate.
    ///
    /// Panics if exactly one of the two arrays tracks contents.
    pub fn combine_bins(
        &self,
        dst: &mut BinsArray,
        dst_bin: usize,
        src: &BinsArray,
        src_bin: usize,
    ) {
        dst.sums[dst_bin] += src.sums[src_bin];
        match (dst.contents.as_mut(), src.contents.as_ref()) {
            (None, None) => {}
            (Some(dst_lists), Some(src_lists)) => {
                dst_lists[dst_bin].extend_from_slice(&src_lists[src_bin]);
            }
            _ => panic!("combine_bins called on arrays of different flavors"),
        }
    }

    /// A new array holding the bins of `first` followed by the bins of
    /// `second`.
    pub fn concatenate_bins(&self, first: &BinsArray, second: &BinsArray) -> BinsArray {
        let mut sums = first.sums.clone();
        sums.extend_from_slice(&second.sums);
        let contents = match (first.contents.as_ref(), second.contents.as_ref()) {
            (None, None) => None,
            (Some(a), Some(b)) => {
                let mut lists = a.clone();
                lists.extend_from_slice(b);
                Some(lists)
            }
            _ => panic!("concatenate_bins called on arrays of different flavors"),
        };
        BinsArray { sums, contents }
    }

    /// All distinct ways of pairing the bins of `first` with the bins of
    /// `second`, one merged array per permutation of `first`'s bins.
    ///
    /// Each yielded array is sorted by ascending sum. Duplicates are
    /// suppressed: two merges count as equal when they have the same sorted
    /// sums (sums-only flavor) or the same sorted item lists (contents
    /// flavor).
    pub fn all_combinations<'a>(
        &'a self,
        first: &'a BinsArray,
        second: &'a BinsArray,
    ) -> AllCombinations<'a> {
        let numbins = first.numbins();
        assert_eq!(
            numbins,
            second.numbins(),
            "all_combinations needs arrays with the same number of bins"
        );
        AllCombinations {
            binner: self,
            first,
            second,
            permutations: (0..numbins).permutations(numbins),
            seen: HashSet::new(),
        }
    }
}

/// Lazy iterator over the distinct bin-pairings of two arrays.
pub struct AllCombinations<'a> {
    binner: &'a Binner,
    first: &'a BinsArray,
    second: &'a BinsArray,
    permutations: itertools::structs::Permutations<std::ops::Range<usize>>,
    seen: HashSet<CombinationKey>,
}

#[derive(PartialEq, Eq, Hash)]
enum CombinationKey {
    Sums(SumsKey),
    Lists(Vec<Vec<ItemId>>),
}

impl Iterator for AllCombinations<'_> {
    type Item = BinsArray;

    fn next(&mut self) -> Option<BinsArray> {
        let numbins = self.first.numbins();
        for perm in self.permutations.by_ref() {
            let sums: Vec<f64> = (0..numbins)
                .map(|i| self.first.sums()[perm[i]] + self.second.sums()[i])
                .collect();
            let contents = match (self.first.contents(), self.second.contents()) {
                (None, None) => None,
                (Some(a), Some(b)) => Some(
                    (0..numbins)
                        .map(|i| {
                            let mut list = a[perm[i]].clone();
                            list.extend_from_slice(&b[i]);
                            // Canonical item order, so that equal merges
                            // produce equal dedup keys.
                            list.sort_unstable();
                            list
                        })
                        .collect::<Vec<_>>(),
                ),
                _ => panic!("all_combinations called on arrays of different flavors"),
            };
            let mut merged = BinsArray { sums, contents };
            self.binner.sort_by_ascending_sum(&mut merged);
            let key = match merged.contents.as_ref() {
                None => CombinationKey::Sums(self.binner.sums_key(&merged)),
                Some(lists) => CombinationKey::Lists(lists.clone()),
            };
            if self.seen.insert(key) {
                return Some(merged);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums_binner(numbins: usize, values: Vec<f64>) -> Binner {
        Binner::new(numbins, values, BinnerFlavor::KeepSums)
    }

    fn contents_binner(numbins: usize, values: Vec<f64>) -> Binner {
        Binner::new(numbins, values, BinnerFlavor::KeepContents)
    }

    #[test]
    fn test_add_and_sort_keeping_sums() {
        // values: a=3, b=4, c=5
        let binner = sums_binner(3, vec![3.0, 4.0, 5.0]);
        let mut bins = binner.new_bins(3);
        binner.add_item_to_bin(&mut bins, 0, 0);
        binner.add_item_to_bin(&mut bins, 1, 1);
        binner.add_item_to_bin(&mut bins, 2, 1);
        assert_eq!(bins.sums(), &[3.0, 9.0, 0.0]);

        binner.sort_by_ascending_sum(&mut bins);
        assert_eq!(bins.sums(), &[0.0, 3.0, 9.0]);
        assert_eq!(
            binner.sums_key(&bins),
            vec![OrderedFloat(0.0), OrderedFloat(3.0), OrderedFloat(9.0)]
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let binner = contents_binner(2, vec![3.0, 4.0]);
        let mut bins = binner.new_bins(2);
        binner.add_item_to_bin(&mut bins, 0, 0);

        let mut copy = bins.clone();
        binner.add_item_to_bin(&mut copy, 1, 0);
        assert_eq!(bins.sums(), &[3.0, 0.0]);
        assert_eq!(copy.sums(), &[7.0, 0.0]);
        assert_eq!(bins.contents().unwrap()[0], vec![0]);
        assert_eq!(copy.contents().unwrap()[0], vec![0, 1]);
    }

    #[test]
    fn test_sort_co_permutes_contents() {
        let binner = contents_binner(3, vec![3.0, 4.0, 5.0]);
        let mut bins = binner.new_bins(3);
        binner.add_item_to_bin(&mut bins, 1, 1);
        binner.add_item_to_bin(&mut bins, 2, 1);
        binner.add_item_to_bin(&mut bins, 0, 2);
        binner.sort_by_ascending_sum(&mut bins);
        assert_eq!(bins.sums(), &[0.0, 3.0, 9.0]);
        assert_eq!(bins.contents().unwrap()[0], Vec::<ItemId>::new());
        assert_eq!(bins.contents().unwrap()[1], vec![0]);
        assert_eq!(bins.contents().unwrap()[2], vec![1, 2]);
    }

    #[test]
    fn test_add_and_remove_bins() {
        let binner = sums_binner(2, vec![1.0]);
        let mut bins = binner.new_bins(2);
        binner.add_item_to_bin(&mut bins, 0, 1);
        let grown = binner.add_empty_bins(&bins, 2);
        assert_eq!(grown.sums(), &[0.0, 1.0, 0.0, 0.0]);
        let shrunk = binner.remove_bins(&grown, 3);
        assert_eq!(shrunk.sums(), &[0.0]);
        // The original is untouched by both.
        assert_eq!(bins.sums(), &[0.0, 1.0]);
    }

    #[test]
    fn test_combine_and_concatenate() {
        let binner = contents_binner(2, vec![3.0, 4.0, 5.0]);
        let mut first = binner.new_bins(2);
        binner.add_item_to_bin(&mut first, 0, 0);
        let mut second = binner.new_bins(2);
        binner.add_item_to_bin(&mut second, 1, 0);
        binner.add_item_to_bin(&mut second, 2, 1);

        binner.combine_bins(&mut first, 1, &second, 1);
        assert_eq!(first.sums(), &[3.0, 5.0]);
        assert_eq!(first.contents().unwrap()[1], vec![2]);

        let both = binner.concatenate_bins(&first, &second);
        assert_eq!(both.sums(), &[3.0, 5.0, 4.0, 5.0]);
        assert_eq!(both.numbins(), 4);
    }

    #[test]
    fn test_all_combinations_sums() {
        // Mirror of the classic example: [1,2,3] x [4,5,6] has 6 permutations
        // but only 5 distinct sorted merges.
        let binner = sums_binner(3, vec![]);
        let first = BinsArray::from_sums(vec![1.0, 2.0, 3.0]);
        let second = BinsArray::from_sums(vec![4.0, 5.0, 6.0]);
        let merged: Vec<Vec<f64>> = binner
            .all_combinations(&first, &second)
            .map(|bins| bins.sums().to_vec())
            .collect();
        assert_eq!(merged.len(), 5);
        assert!(merged.contains(&vec![5.0, 7.0, 9.0]));
        assert!(merged.contains(&vec![7.0, 7.0, 7.0]));
        // No duplicates under the sorted-sums signature.
        for (i, a) in merged.iter().enumerate() {
            for b in &merged[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_all_combinations_all_distinct() {
        let binner = sums_binner(3, vec![]);
        let first = BinsArray::from_sums(vec![1.0, 20.0, 300.0]);
        let second = BinsArray::from_sums(vec![4.0, 50.0, 600.0]);
        let merged: Vec<Vec<f64>> = binner
            .all_combinations(&first, &second)
            .map(|bins| bins.sums().to_vec())
            .collect();
        assert_eq!(merged.len(), 6);
        assert!(merged.contains(&vec![5.0, 70.0, 900.0]));
        assert!(merged.contains(&vec![70.0, 304.0, 601.0]));
    }

    #[test]
    fn test_all_combinations_yields_ascending() {
        let binner = sums_binner(2, vec![]);
        let first = BinsArray::from_sums(vec![1.0, 9.0]);
        let second = BinsArray::from_sums(vec![2.0, 3.0]);
        for bins in binner.all_combinations(&first, &second) {
            let sums = bins.sums();
            assert!(sums.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
