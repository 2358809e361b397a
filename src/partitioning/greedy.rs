//! Single-pass heuristic partitioners: greedy (LPT), round-robin and
//! bidirectional balanced. All three sort the items by descending value and
//! place each item in one pass; they are used directly and as seeds for the
//! exact algorithms.

use crate::binner::{Binner, BinsArray, ItemId};

/// Items in descending order of value, ties broken by input order.
pub(crate) fn sorted_descending(binner: &Binner, items: &[ItemId]) -> Vec<ItemId> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|&a, &b| binner.valueof(b).total_cmp(&binner.valueof(a)));
    sorted
}

/// Greedy number partitioning (longest processing time first): each item
/// goes to the currently least-loaded bin, lowest index on ties.
pub fn greedy(binner: &Binner, numbins: usize, items: &[ItemId]) -> BinsArray {
    let mut bins = binner.new_bins(numbins);
    for item in sorted_descending(binner, items) {
        let least_full = (0..numbins)
            .min_by(|&a, &b| bins.sums()[a].total_cmp(&bins.sums()[b]))
            .expect("at least one bin");
        binner.add_item_to_bin(&mut bins, item, least_full);
    }
    bins
}

/// Round-robin partitioning: the i-th largest item goes to bin `i % numbins`.
pub fn round_robin(binner: &Binner, numbins: usize, items: &[ItemId]) -> BinsArray {
    let mut bins = binner.new_bins(numbins);
    let mut bin_index = 0;
    for item in sorted_descending(binner, items) {
        binner.add_item_to_bin(&mut bins, item, bin_index);
        bin_index = (bin_index + 1) % numbins;
    }
    bins
}

/// Bidirectional balanced partitioning (ABCCBA order): traverse the bin
/// indices forward and backward alternately, reversing at the endpoints.
pub fn bidirectional_balanced(binner: &Binner, numbins: usize, items: &[ItemId]) -> BinsArray {
    let mut bins = binner.new_bins(numbins);
    let mut bin_index: isize = 0;
    let mut direction: isize = 1;
    for item in sorted_descending(binner, items) {
        binner.add_item_to_bin(&mut bins, item, bin_index as usize);
        bin_index += direction;
        if bin_index > numbins as isize - 1 {
            bin_index = numbins as isize - 1;
            direction = -1;
        }
        if bin_index < 0 {
            bin_index = 0;
            direction = 1;
        }
    }
    bins
}
