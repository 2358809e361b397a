//! Bin completion (Korf, 2002): optimal bin packing by depth-first search
//! over completions of one bin at a time.
//!
//! Each search node takes the largest unpacked item, enumerates the
//! undominated sets of further items that fit beside it, and branches on
//! the choice. A best-fit-decreasing solution provides the initial upper
//! bound; wasted-space lower bounds prune nodes that cannot use fewer bins.

use itertools::Itertools;
use log::{debug, info};

use crate::binner::{Binner, BinsArray, ItemId};
use crate::packing::best_fit::best_fit_decreasing;

/// L1 bound: total value over capacity, rounded up.
pub(crate) fn l1_lower_bound(binner: &Binner, binsize: f64, items: &[ItemId]) -> usize {
    (binner.total_value(items) / binsize).ceil() as usize
}

/// L2 bound (wasted space): items above half the capacity each occupy a bin
/// of their own, and the room left beside them can only be used by the
/// smaller items. Any small value the large bins cannot absorb, even
/// fractionally, is provably wasted capacity.
pub(crate) fn l2_lower_bound(binner: &Binner, binsize: f64, items: &[ItemId]) -> usize {
    let values: Vec<f64> = items.iter().map(|&item| binner.valueof(item)).collect();
    let total: f64 = values.iter().sum();
    let mut large_count = 0usize;
    let mut residual_room = 0.0;
    let mut small_total = 0.0;
    for &value in &values {
        if value > binsize / 2.0 {
            large_count += 1;
            residual_room += binsize - value;
        } else {
            small_total += value;
        }
    }
    let wasted = (residual_room - small_total).max(0.0);
    let by_waste = ((total + wasted) / binsize).ceil() as usize;
    by_waste.max(large_count)
}

/// Pairs `(large, small)` from `values` (descending) that are undominated
/// completions beside a partial bin of sum `x`: together they fit, and they
/// beat the single best item `y`.
fn undominated_pairs(x: f64, y: f64, values: &[f64], binsize: f64) -> Vec<Vec<f64>> {
    let mut pairs = Vec::new();
    if values.is_empty() {
        return pairs;
    }
    let mut start = 0;
    let mut end = values.len() - 1;
    while start < end {
        let sum = values[start] + values[end];
        if x + sum > binsize {
            start += 1;
        } else if sum <= y {
            end -= 1;
        } else {
            pairs.push(vec![values[start], values[end]]);
            start += 1;
            end -= 1;
        }
    }
    pairs
}

/// All undominated completions of a bin already holding `x`, drawn from
/// `values` (sorted descending), largest total first.
pub(crate) fn find_bin_completions(x: f64, values: &[f64], binsize: f64) -> Vec<Vec<f64>> {
    let Some(&y) = values.iter().find(|&&value| x + value <= binsize) else {
        return Vec::new();
    };

    let mut found: Vec<Vec<f64>> = vec![vec![y]];
    for size in 0..=values.len() {
        for combination in values.iter().copied().combinations(size) {
            let combination_sum: f64 = combination.iter().sum();
            if x + combination_sum > binsize {
                continue;
            }
            let mut left = values.to_vec();
            for value in &combination {
                if let Some(position) = left.iter().position(|v| v == value) {
                    left.remove(position);
                }
            }
            let pairs = undominated_pairs(x + combination_sum, y, &left, binsize);
            if !pairs.is_empty() {
                found.extend(pairs);
            } else if !combination.is_empty() {
                found.push(combination);
            }
        }
    }

    found.sort_by(|a, b| {
        let sum_a: f64 = a.iter().sum();
        let sum_b: f64 = b.iter().sum();
        sum_b.total_cmp(&sum_a)
    });
    let mut seen: std::collections::HashSet<Vec<ordered_float::OrderedFloat<f64>>> =
        std::collections::HashSet::new();
    found.retain(|completion| {
        seen.insert(completion.iter().copied().map(ordered_float::OrderedFloat).collect())
    });
    found
}

/// Optimal bin packing by bin completion.
pub fn bin_completion(binner: &Binner, binsize: f64, items: &[ItemId]) -> BinsArray {
    // Zero-valued items do not constrain the packing; they are appended to
    // the first bin afterwards.
    let (zeros, positive): (Vec<ItemId>, Vec<ItemId>) = items
        .iter()
        .copied()
        .partition(|&item| binner.valueof(item) == 0.0);

    let bfd = best_fit_decreasing(binner, binsize, &positive);
    let lower_bound = l1_lower_bound(binner, binsize, &positive)
        .max(l2_lower_bound(binner, binsize, &positive));
    info!(
        "bin completion: best-fit-decreasing uses {} bins, lower bound {}",
        bfd.numbins(),
        lower_bound
    );

    let mut best = bfd;
    if best.numbins() > lower_bound && !positive.is_empty() {
        let sorted = crate::partitioning::greedy::sorted_descending(binner, &positive);
        let empty = binner.new_bins(0);
        fill_bins(binner, binsize, &sorted, &empty, lower_bound, &mut best);
    }

    let mut packed = best;
    if !zeros.is_empty() {
        if packed.numbins() == 0 {
            packed = binner.add_empty_bins(&packed, 1);
        }
        for &item in &zeros {
            binner.add_item_to_bin(&mut packed, item, 0);
        }
    }
    packed
}

/// Depth-first branch over completions of the next bin.
fn fill_bins(
    binner: &Binner,
    binsize: f64,
    remaining: &[ItemId],
    packed: &BinsArray,
    lower_bound: usize,
    best: &mut BinsArray,
) {
    if best.numbins() == lower_bound {
        return;
    }
    if remaining.is_empty() {
        if packed.numbins() < best.numbins() {
            debug!("improved packing to {} bins", packed.numbins());
            *best = packed.clone();
        }
        return;
    }
    // Even a perfect packing of the remainder cannot beat the best.
    let needed = l1_lower_bound(binner, binsize, remaining).max(1);
    if packed.numbins() + needed >= best.numbins() {
        return;
    }

    let seed = remaining[0];
    let seed_value = binner.valueof(seed);
    let rest = &remaining[1..];
    let rest_values: Vec<f64> = rest.iter().map(|&item| binner.valueof(item)).collect();

    let mut completions = find_bin_completions(seed_value, &rest_values, binsize);
    if completions.is_empty() {
        completions.push(Vec::new());
    }
    for completion in completions {
        let mut bins = binner.add_empty_bins(packed, 1);
        let bin_index = bins.numbins() - 1;
        binner.add_item_to_bin(&mut bins, seed, bin_index);

        // Map the chosen values back onto concrete items.
        let mut leftover: Vec<ItemId> = rest.to_vec();
        for value in &completion {
            let position = leftover
                .iter()
                .position(|&item| binner.valueof(item) == *value)
                .expect("completion values come from the remaining items");
            binner.add_item_to_bin(&mut bins, leftover[position], bin_index);
            leftover.remove(position);
        }
        fill_bins(binner, binsize, &leftover, &bins, lower_bound, best);
        if best.numbins() == lower_bound {
            return;
        }
    }
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
    fn test_full_bins() {
        let values = [100.0; 6];
        let binner = binner_for(&values);
        let bins = bin_completion(&binner, 100.0, &ids(6));
        assert_eq!(bins.numbins(), 6);
    }

    #[test]
    fn test_single_bin() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 85.0];
        let binner = binner_for(&values);
        let bins = bin_completion(&binner, 100.0, &ids(6));
        assert_eq!(bins.numbins(), 1);
        assert_eq!(bins.sums(), &[100.0]);
    }

    #[test]
    fn test_korf_small_example() {
        let values = [6.0, 12.0, 15.0, 40.0, 43.0, 82.0];
        let binner = binner_for(&values);
        let bins = bin_completion(&binner, 100.0, &ids(6));
        assert_eq!(bins.numbins(), 2);
    }

    #[test]
    fn test_complex_instance_is_optimal() {
        let values = [
            99.0, 94.0, 79.0, 64.0, 50.0, 44.0, 43.0, 37.0, 32.0, 19.0, 18.0, 7.0, 3.0,
        ];
        let binner = binner_for(&values);
        let bins = bin_completion(&binner, 100.0, &ids(13));
        assert_eq!(bins.numbins(), 6);
        // All items packed, no bin overflows.
        let mut all: Vec<ItemId> = bins.contents().unwrap().concat();
        all.sort_unstable();
        assert_eq!(all, ids(13));
        for &sum in bins.sums() {
            assert!(sum <= 100.0);
        }
    }

    #[test]
    fn test_find_bin_completions() {
        assert!(find_bin_completions(99.0, &[94.0, 79.0, 64.0, 50.0], 100.0).is_empty());
        let completions = find_bin_completions(94.0, &[79.0, 64.0, 50.0, 3.0], 100.0);
        assert_eq!(completions, vec![vec![3.0]]);
        let completions = find_bin_completions(50.0, &[44.0, 43.0, 37.0, 18.0, 7.0], 100.0);
        assert_eq!(completions[0], vec![43.0, 7.0]);
    }

    #[test]
    fn test_l2_bound_dominates_l1_here() {
        let values = [99.0, 97.0, 94.0, 93.0, 8.0, 5.0, 4.0, 2.0];
        let binner = binner_for(&values);
        assert_eq!(l1_lower_bound(&binner, 100.0, &ids(8)), 5);
        assert_eq!(l2_lower_bound(&binner, 100.0, &ids(8)), 5);
    }
}
