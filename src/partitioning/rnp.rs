//! Recursive number partitioning (Korf, 2009).
//!
//! Divide and conquer on the bin count. An even level splits the items two
//! ways with anytime complete Karmarkar-Karp and recursively partitions
//! each half into half as many bins; an odd level fixes one bin through an
//! inclusion-exclusion tree (as in sequential number partitioning) and
//! recurses with one bin fewer. Two bins are solved exactly by two-way
//! complete Karmarkar-Karp.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, info};

use crate::binner::{Binner, BinnerFlavor, BinsArray, ItemId};
use crate::partitioning::ckk::{best_ckk_partition, complete_karmarkar_karp_bounded};
use crate::partitioning::inclusion_exclusion::InExclusionBinTree;
use crate::partitioning::karmarkar_karp::karmarkar_karp;
use crate::partitioning::snp::ActiveBound;

/// Recursive number partitioning: exact for the minimize-difference
/// objective. Usually faster than the sequential variant when the bin
/// count is composite.
pub fn recursive_number_partitioning(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    epsilon: f64,
) -> BinsArray {
    info!(
        "recursive number partitioning of {} items into {} bins",
        items.len(),
        numbins
    );
    let mut best = solve(binner, numbins, items, epsilon);
    binner.sort_by_ascending_sum(&mut best);
    best
}

/// Best-effort minimum-difference partition of `items` into `numbins` bins.
fn solve(binner: &Binner, numbins: usize, items: &[ItemId], epsilon: f64) -> BinsArray {
    if numbins == 1 {
        let mut bins = binner.new_bins(1);
        for &item in items {
            binner.add_item_to_bin(&mut bins, item, 0);
        }
        return bins;
    }
    if numbins == 2 {
        return best_ckk_partition(binner, 2, items, None, epsilon);
    }

    let mut best = karmarkar_karp(binner, numbins, items);
    binner.sort_by_ascending_sum(&mut best);
    let mut best_difference = best.sums_difference();
    if best_difference <= epsilon {
        return best;
    }

    if numbins % 2 == 1 {
        odd_level(binner, numbins, items, &mut best, &mut best_difference, epsilon);
    } else {
        even_level(binner, numbins, items, &mut best, &mut best_difference, epsilon);
    }
    best
}

/// Fix one bin through the inclusion-exclusion tree and recurse with one
/// bin fewer, retightening the tree whenever the level improves.
fn odd_level(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    best: &mut BinsArray,
    best_difference: &mut f64,
    epsilon: f64,
) {
    let total = binner.total_value(items);
    let lower = Rc::new(Cell::new(
        (total - (numbins as f64 - 1.0) * *best_difference) / numbins as f64,
    ));
    let upper = total / numbins as f64;
    let tree = InExclusionBinTree::new(binner, items, lower.clone(), upper);
    let bound = ActiveBound {
        lower,
        total,
        bins: numbins,
    };

    for bin_items in tree {
        let mut first_bin = binner.new_bins(1);
        for &item in &bin_items {
            binner.add_item_to_bin(&mut first_bin, item, 0);
        }
        let chosen: HashSet<ItemId> = bin_items.iter().copied().collect();
        let remaining: Vec<ItemId> = items
            .iter()
            .copied()
            .filter(|item| !chosen.contains(item))
            .collect();
        let rest = solve(binner, numbins - 1, &remaining, epsilon);
        let candidate = binner.concatenate_bins(&first_bin, &rest);
        let difference = candidate.sums_difference();
        if difference < *best_difference {
            debug!("odd level improved difference to {difference}");
            *best = candidate;
            *best_difference = difference;
            bound.retighten(difference);
        }
        if *best_difference <= epsilon {
            return;
        }
    }
}

/// Split the items two ways with anytime complete Karmarkar-Karp and
/// recursively partition each half into `numbins / 2` bins. Only two-way
/// splits that are more balanced than the best difference found so far
/// are worth recursing into.
fn even_level(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    best: &mut BinsArray,
    best_difference: &mut f64,
    epsilon: f64,
) {
    let half = numbins / 2;
    // The two-way split needs bin contents even when the outer call only
    // tracks sums. The bound stays fixed at this level's entry difference:
    // a split more skewed than that cannot refine into an improvement.
    let splitter = binner.with_numbins(2, BinnerFlavor::KeepContents);
    complete_karmarkar_karp_bounded(&splitter, 2, items, *best_difference, &mut |split, _| {
        let halves = split.contents().expect("the splitter tracks contents");
        let left = solve(binner, half, &halves[0], epsilon);
        let right = solve(binner, half, &halves[1], epsilon);
        let candidate = binner.concatenate_bins(&left, &right);
        let difference = candidate.sums_difference();
        if difference < *best_difference {
            debug!("even level improved difference to {difference}");
            *best = candidate;
            *best_difference = difference;
        }
        *best_difference > epsilon
    });
}
