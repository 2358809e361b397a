//! First-fit bin packing, online and decreasing.

use crate::binner::{Binner, BinsArray, ItemId};

/// Online first-fit: each item goes into the first bin it fits in; a new
/// bin opens when none fits. Items are handled in the order given.
///
/// Items larger than `binsize` must be rejected by the caller beforehand.
pub fn first_fit(binner: &Binner, binsize: f64, items: &[ItemId]) -> BinsArray {
    let mut bins = binner.new_bins(1);
    for &item in items {
        let value = binner.valueof(item);
        debug_assert!(value <= binsize, "oversized item reached the packer");
        match (0..bins.numbins()).find(|&index| bins.sums()[index] + value <= binsize) {
            Some(index) => binner.add_item_to_bin(&mut bins, item, index),
            None => {
                bins = binner.add_empty_bins(&bins, 1);
                let last = bins.numbins() - 1;
                binner.add_item_to_bin(&mut bins, item, last);
            }
        }
    }
    bins
}

/// First-fit decreasing: sort the items by descending value, then run
/// first-fit.
pub fn first_fit_decreasing(binner: &Binner, binsize: f64, items: &[ItemId]) -> BinsArray {
    let sorted = crate::partitioning::greedy::sorted_descending(binner, items);
    first_fit(binner, binsize, &sorted)
}
