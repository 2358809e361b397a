//! Shared short-circuit for degenerate partitioning instances.

use crate::binner::{Binner, BinsArray, ItemId};

/// Solve the instance directly when it is trivial: zero bins, one bin, or
/// at least as many bins as items. Returns `None` when a real search is
/// needed.
pub fn trivial_partition(binner: &Binner, numbins: usize, items: &[ItemId]) -> Option<BinsArray> {
    if numbins == 0 {
        return Some(binner.new_bins(0));
    }
    if numbins == 1 {
        let mut bins = binner.new_bins(1);
        for &item in items {
            binner.add_item_to_bin(&mut bins, item, 0);
        }
        return Some(bins);
    }
    if items.len() <= numbins {
        let mut bins = binner.new_bins(numbins);
        for (index, &item) in items.iter().enumerate() {
            binner.add_item_to_bin(&mut bins, item, index);
        }
        binner.sort_by_ascending_sum(&mut bins);
        return Some(bins);
    }
    None
}
