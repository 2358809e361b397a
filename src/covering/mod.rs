//! Bin-covering algorithms: fill as many bins as possible up to at least a
//! given threshold.
//!
//! The greedy variant and the 2/3- and 3/4-approximation algorithms of
//! Csirik, Frenk, Labbe and Zhang ("Two simple algorithms for bin
//! covering", 1999). All three grow the last bin until it reaches the
//! threshold, then open a new one; the final, unfilled bin is discarded.

use crate::binner::{Binner, BinsArray, ItemId};

/// Fill the current last bin of `bins` with `sorted_items` in the given
/// order, opening a fresh bin whenever the threshold is reached. Consumes
/// items from the front and returns the leftovers.
fn fill_decreasing(
    binner: &Binner,
    bins: &mut BinsArray,
    binsize: f64,
    sorted_items: &[ItemId],
) {
    for &item in sorted_items {
        let last = bins.numbins() - 1;
        binner.add_item_to_bin(bins, item, last);
        if bins.sums()[last] >= binsize {
            *bins = binner.add_empty_bins(bins, 1);
        }
    }
}

/// Simple greedy covering: items in descending order fill one bin until it
/// reaches the threshold, then the next.
pub fn decreasing_greedy(binner: &Binner, binsize: f64, items: &[ItemId]) -> BinsArray {
    let sorted = crate::partitioning::greedy::sorted_descending(binner, items);
    let mut bins = binner.new_bins(1);
    fill_decreasing(binner, &mut bins, binsize, &sorted);
    binner.remove_bins(&bins, 1)
}

/// The 2/3-approximation: open each bin with the largest remaining item,
/// then top it up with the smallest remaining items in ascending order.
pub fn twothirds(binner: &Binner, binsize: f64, items: &[ItemId]) -> BinsArray {
    let mut queue = crate::partitioning::greedy::sorted_descending(binner, items);
    let mut bins = binner.new_bins(1);
    while !queue.is_empty() {
        let largest = queue.remove(0);
        let last = bins.numbins() - 1;
        binner.add_item_to_bin(&mut bins, largest, last);
        while !queue.is_empty() && bins.sums()[last] < binsize {
            let smallest = queue.pop().expect("queue is non-empty");
            binner.add_item_to_bin(&mut bins, smallest, last);
        }
        if bins.sums()[last] >= binsize {
            bins = binner.add_empty_bins(&bins, 1);
        }
    }
    binner.remove_bins(&bins, 1)
}

/// The 3/4-approximation: open each bin with either the single largest
/// "big" item (at least half the threshold) or the two largest "medium"
/// items (between a third and a half), whichever is larger, then top up
/// with the smallest items. Once either side runs out, the remainder is
/// covered greedily.
pub fn threequarters(binner: &Binner, binsize: f64, items: &[ItemId]) -> BinsArray {
    let sorted = crate::partitioning::greedy::sorted_descending(binner, items);
    let mut big: Vec<ItemId> = Vec::new();
    let mut medium: Vec<ItemId> = Vec::new();
    let mut small: Vec<ItemId> = Vec::new();
    for &item in &sorted {
        let value = binner.valueof(item);
        if value >= binsize / 2.0 {
            big.push(item);
        } else if value >= binsize / 3.0 {
            medium.push(item);
        } else {
            small.push(item);
        }
    }

    let mut bins = binner.new_bins(1);
    loop {
        if small.is_empty() {
            // The items remaining in the unfinished last bin are reused as
            // ordinary contents; only full bins count.
            fill_decreasing(binner, &mut bins, binsize, &big);
            fill_decreasing(binner, &mut bins, binsize, &medium);
            break;
        }
        if big.is_empty() && medium.is_empty() {
            fill_decreasing(binner, &mut bins, binsize, &small);
            break;
        }

        // Open with a single big item or the two largest medium items.
        let big_total = big.first().map_or(0.0, |&item| binner.valueof(item));
        let medium_total: f64 = medium
            .iter()
            .take(2)
            .map(|&item| binner.valueof(item))
            .sum();
        let last = bins.numbins() - 1;
        if big_total >= medium_total {
            let item = big.remove(0);
            binner.add_item_to_bin(&mut bins, item, last);
        } else {
            for _ in 0..medium.len().min(2) {
                let item = medium.remove(0);
                binner.add_item_to_bin(&mut bins, item, last);
            }
        }
        while !small.is_empty() && bins.sums()[last] < binsize {
            let item = small.pop().expect("small is non-empty");
            binner.add_item_to_bin(&mut bins, item, last);
        }
        if bins.sums()[last] >= binsize {
            bins = binner.add_empty_bins(&bins, 1);
        }
    }
    binner.remove_bins(&bins, 1)
}
