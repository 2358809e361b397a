//! Best-fit bin packing, online and decreasing.

use crate::binner::{Binner, BinsArray, ItemId};

/// Online best-fit: each item goes into the fullest bin that still has room
/// for it; a new bin opens when none fits.
pub fn best_fit(binner: &Binner, binsize: f64, items: &[ItemId]) -> BinsArray {
    let mut bins = binner.new_bins(1);
    for &item in items {
        let value = binner.valueof(item);
        debug_assert!(value <= binsize, "oversized item reached the packer");
        let mut best: Option<(usize, f64)> = None;
        for index in 0..bins.numbins() {
            let new_sum = bins.sums()[index] + value;
            if new_sum <= binsize && best.map_or(true, |(_, sum)| new_sum > sum) {
                best = Some((index, new_sum));
            }
        }
        match best {
            Some((index, _)) => binner.add_item_to_bin(&mut bins, item, index),
            None => {
                bins = binner.add_empty_bins(&bins, 1);
                let last = bins.numbins() - 1;
                binner.add_item_to_bin(&mut bins, item, last);
            }
        }
    }
    bins
}

/// Best-fit decreasing: sort the items by descending value, then run
/// best-fit.
pub fn best_fit_decreasing(binner: &Binner, binsize: f64, items: &[ItemId]) -> BinsArray {
    let sorted = crate::partitioning::greedy::sorted_descending(binner, items);
    best_fit(binner, binsize, &sorted)
}
