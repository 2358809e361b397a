//! MultiFit (Coffman, Garey and Johnson, 1978): k-way partitioning with the
//! min-max objective through repeated bin packing.
//!
//! Binary search on a common bin capacity: a capacity that first-fit-
//! decreasing packs into at most k bins is feasible and the search moves
//! down, otherwise up. The window starts at
//! `[max(largest_item, total/k), max(largest_item, 2*total/k)]`; after
//! `iterations` halvings the relative error is at most `2^-iterations`.

use log::info;

use crate::binner::{Binner, BinsArray, ItemId};
use crate::packing::first_fit::first_fit;

/// Partition into `numbins` bins by binary search over first-fit-decreasing
/// capacities. The result is padded with empty bins up to exactly
/// `numbins`, sorted by ascending sum.
pub fn multifit(binner: &Binner, numbins: usize, items: &[ItemId], iterations: usize) -> BinsArray {
    if items.is_empty() {
        return binner.new_bins(numbins);
    }
    let total: f64 = binner.total_value(items);
    let largest = items
        .iter()
        .map(|&item| binner.valueof(item))
        .fold(f64::NEG_INFINITY, f64::max);
    let mut lower = (total / numbins as f64).max(largest);
    let mut upper = (2.0 * total / numbins as f64).max(largest);
    info!(
        "multifit with sum {total}, largest item {largest}, capacity window [{lower}, {upper}]"
    );

    let sorted = crate::partitioning::greedy::sorted_descending(binner, items);
    for _ in 0..iterations {
        let capacity = (lower + upper) / 2.0;
        let packed = first_fit(binner, capacity, &sorted);
        info!(
            "first-fit-decreasing with capacity {capacity} needs {} bins",
            packed.numbins()
        );
        if packed.numbins() <= numbins {
            upper = capacity;
        } else {
            lower = capacity;
        }
    }

    let mut bins = first_fit(binner, upper, &sorted);
    if bins.numbins() < numbins {
        bins = binner.add_empty_bins(&bins, numbins - bins.numbins());
    }
    binner.sort_by_ascending_sum(&mut bins);
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binner::BinnerFlavor;

    fn binner_for(values: &[f64]) -> Binner {
        Binner::new(0, values.to_vec(), BinnerFlavor::KeepContents)
    }

    fn ids(n: usize) -> Vec<ItemId> {
        (0..n).collect()
    }

    #[test]
    fn test_small_even_split() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let binner = binner_for(&values);
        let bins = multifit(&binner, 2, &ids(4), 10);
        assert_eq!(bins.sums(), &[5.0, 5.0]);
    }

    #[test]
    fn test_wikipedia_four_bins() {
        let values = [
            9.0, 7.0, 6.0, 5.0, 5.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0,
        ];
        let binner = binner_for(&values);
        let bins = multifit(&binner, 4, &ids(14), 10);
        assert_eq!(bins.sums()[3], 20.0);
    }

    #[test]
    fn test_thirteen_machines() {
        // 8 copies of (40,13,13), 3 of (25,25,16), 2 of (25,24,17): with 13
        // bins every machine can finish by 78.
        let mut values: Vec<f64> = Vec::new();
        for _ in 0..8 {
            values.extend([40.0, 13.0, 13.0]);
        }
        for _ in 0..3 {
            values.extend([25.0, 25.0, 16.0]);
        }
        for _ in 0..2 {
            values.extend([25.0, 24.0, 17.0]);
        }
        let binner = binner_for(&values);
        let bins = multifit(&binner, 13, &ids(values.len()), 10);
        assert_eq!(bins.numbins(), 13);
        let largest = bins.sums().iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(largest, 78.0);
        for &sum in bins.sums() {
            assert!(sum <= 78.0);
        }
    }

    #[test]
    fn test_empty_items() {
        let binner = binner_for(&[]);
        let bins = multifit(&binner, 3, &[], 10);
        assert_eq!(bins.sums(), &[0.0, 0.0, 0.0]);
    }
}
