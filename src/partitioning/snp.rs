//! Sequential number partitioning (Korf, 2009).
//!
//! Builds the partition one bin at a time. At each level an
//! inclusion-exclusion tree enumerates candidate contents for the next bin,
//! bounded above by the average of the remaining items (a bin cannot exceed
//! it without becoming the largest) and below by what would force another
//! bin to fall too far behind. When two bins remain, the leftover items are
//! split optimally by two-way complete Karmarkar-Karp.
//!
//! When a recursive call improves the best partition, the lower bounds of
//! every active tree on the ancestor path are retightened in place, pruning
//! branches that were viable when those trees were created.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, info};

use crate::binner::{Binner, BinsArray, ItemId};
use crate::partitioning::ckk::best_ckk_partition;
use crate::partitioning::inclusion_exclusion::InExclusionBinTree;
use crate::partitioning::karmarkar_karp::karmarkar_karp;

/// A live inclusion-exclusion tree on the recursion path, with the data
/// needed to retighten its lower bound after an improvement.
pub(crate) struct ActiveBound {
    pub lower: Rc<Cell<f64>>,
    pub total: f64,
    pub bins: usize,
}

impl ActiveBound {
    /// The tightest sound lower bound for a bin at this level, given the
    /// best difference found so far.
    pub fn retighten(&self, best_difference: f64) {
        self.lower
            .set((self.total - (self.bins as f64 - 1.0) * best_difference) / self.bins as f64);
    }
}

/// Sequential number partitioning: exact for the minimize-difference
/// objective, seeded by plain differencing.
pub fn sequential_number_partitioning(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    epsilon: f64,
) -> BinsArray {
    info!(
        "sequential number partitioning of {} items into {} bins",
        items.len(),
        numbins
    );
    let mut best = karmarkar_karp(binner, numbins, items);
    binner.sort_by_ascending_sum(&mut best);
    let mut best_difference = best.sums_difference();
    if best_difference <= epsilon {
        return best;
    }
    if numbins == 2 {
        return best_ckk_partition(binner, 2, items, None, epsilon);
    }

    let prior = binner.new_bins(0);
    let mut trees: Vec<ActiveBound> = Vec::new();
    generate_bins(
        binner,
        numbins,
        numbins,
        &prior,
        items,
        &mut best,
        &mut best_difference,
        &mut trees,
        epsilon,
    );
    binner.sort_by_ascending_sum(&mut best);
    best
}

/// Recursive level of SNP: fix the next bin via the tree, recurse on the
/// remainder with one bin fewer, bottom out at two-way differencing.
#[allow(clippy::too_many_arguments)]
fn generate_bins(
    binner: &Binner,
    total_numbins: usize,
    current_numbins: usize,
    prior: &BinsArray,
    items: &[ItemId],
    best: &mut BinsArray,
    best_difference: &mut f64,
    trees: &mut Vec<ActiveBound>,
    epsilon: f64,
) {
    debug!(
        "SNP level with {} bins left and {} items",
        current_numbins,
        items.len()
    );
    if current_numbins == 2 {
        let two_bins = best_ckk_partition(binner, 2, items, None, epsilon);
        let difference = {
            let all_sums: Vec<f64> = two_bins
                .sums()
                .iter()
                .chain(prior.sums())
                .copied()
                .collect();
            let max = all_sums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = all_sums.iter().copied().fold(f64::INFINITY, f64::min);
            max - min
        };
        if difference < *best_difference {
            info!("improved partition with difference {difference}");
            *best = binner.concatenate_bins(&two_bins, prior);
            *best_difference = difference;
            for tree in trees.iter() {
                tree.retighten(difference);
            }
        }
        return;
    }

    let total = binner.total_value(items);
    let lower = Rc::new(Cell::new(
        (total - (current_numbins as f64 - 1.0) * *best_difference) / current_numbins as f64,
    ));
    let upper = total / current_numbins as f64;
    let tree = InExclusionBinTree::new(binner, items, lower.clone(), upper);
    trees.push(ActiveBound {
        lower,
        total,
        bins: current_numbins,
    });

    let bin_index = total_numbins - current_numbins;
    for bin_items in tree {
        let mut extended = binner.add_empty_bins(prior, 1);
        for &item in &bin_items {
            binner.add_item_to_bin(&mut extended, item, bin_index);
        }
        let chosen: HashSet<ItemId> = bin_items.iter().copied().collect();
        let remaining: Vec<ItemId> = items
            .iter()
            .copied()
            .filter(|item| !chosen.contains(item))
            .collect();
        generate_bins(
            binner,
            total_numbins,
            current_numbins - 1,
            &extended,
            &remaining,
            best,
            best_difference,
            trees,
            epsilon,
        );
        if *best_difference <= epsilon {
            break;
        }
    }
    trees.pop();
}
