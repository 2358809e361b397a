//! Complete balanced largest differencing (Mertens, 1999): two-way
//! partitioning that bounds the difference in bin *cardinalities* as well
//! as minimizing the difference in bin sums.
//!
//! Each sub-partition is a two-bin array. The branching step takes the two
//! most skewed sub-partitions and either merges them aligned (small bin
//! with small, large with large) or crossed (small with large), which is
//! the differencing decision tree restricted to balanced shapes.

use std::time::Instant;

use log::{debug, info};

use crate::binner::{Binner, BinnerFlavor, BinsArray, ItemId};
use crate::error::{PartitionError, Result};
use crate::partitioning::karmarkar_karp::karmarkar_karp;

struct CbldmSearch<'a> {
    binner: &'a Binner,
    numitems: usize,
    /// Cap on the cardinality difference between the two bins.
    max_cardinality_difference: usize,
    best: Option<BinsArray>,
    best_sum_difference: f64,
    deadline: Option<(Instant, f64)>,
    optimal: bool,
}

/// Anytime balanced two-way partitioning.
///
/// `max_cardinality_difference` caps how many more items one bin may hold
/// than the other; 1 forces an even split (up to parity).
pub fn cbldm(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    max_cardinality_difference: usize,
    time_limit: Option<f64>,
    epsilon: f64,
) -> Result<BinsArray> {
    if numbins != 2 {
        return Err(PartitionError::InvalidParameter {
            name: "numbins",
            reason: format!("balanced differencing is two-way only, got {numbins} bins"),
        });
    }
    if max_cardinality_difference < 1 {
        return Err(PartitionError::InvalidParameter {
            name: "partition_difference",
            reason: "the cardinality difference cap must be at least 1".to_string(),
        });
    }
    info!(
        "balanced differencing of {} items, cardinality cap {}",
        items.len(),
        max_cardinality_difference
    );

    // Cardinality pruning needs the item lists even when the caller only
    // wants sums.
    let contents_binner = binner.with_numbins(2, BinnerFlavor::KeepContents);
    if items.is_empty() {
        return Ok(contents_binner.new_bins(2));
    }

    let mut sub_partitions: Vec<BinsArray> = Vec::new();
    for &item in super::greedy::sorted_descending(binner, items).iter() {
        let mut bins = contents_binner.new_bins(2);
        contents_binner.add_item_to_bin(&mut bins, item, 1);
        sub_partitions.push(bins);
    }

    let mut search = CbldmSearch {
        binner: &contents_binner,
        numitems: items.len(),
        max_cardinality_difference,
        best: None,
        best_sum_difference: f64::INFINITY,
        deadline: time_limit.map(|limit| (Instant::now(), limit)),
        optimal: false,
    };
    search.explore(sub_partitions, epsilon);
    // If the budget expired before any leaf was reached, fall back to the
    // differencing seed.
    Ok(search
        .best
        .unwrap_or_else(|| karmarkar_karp(&contents_binner, 2, items)))
}

impl CbldmSearch<'_> {
    fn explore(&mut self, mut sub_partitions: Vec<BinsArray>, epsilon: f64) {
        if self.optimal {
            return;
        }
        if let Some((start, limit)) = self.deadline {
            if start.elapsed().as_secs_f64() >= limit {
                return;
            }
        }

        if sub_partitions.len() == 1 {
            let candidate = sub_partitions.pop().expect("one sub-partition");
            let lists = candidate.contents().expect("contents are tracked");
            let cardinality_difference = lists[0].len().abs_diff(lists[1].len());
            let sum_difference = (candidate.sums()[0] - candidate.sums()[1]).abs();
            if cardinality_difference <= self.max_cardinality_difference
                && sum_difference < self.best_sum_difference
            {
                debug!("improved balanced partition with difference {sum_difference}");
                self.best_sum_difference = sum_difference;
                if sum_difference <= epsilon {
                    self.optimal = true;
                }
                self.best = Some(candidate);
            }
            return;
        }

        // Prune on the reachable sum difference and cardinality difference.
        let mut sum_of_differences = 0.0;
        let mut max_difference: f64 = 0.0;
        let mut sum_of_cardinality_differences = 0usize;
        let mut max_cardinality: usize = 0;
        for sub in &sub_partitions {
            let difference = (sub.sums()[0] - sub.sums()[1]).abs();
            sum_of_differences += difference;
            max_difference = max_difference.max(difference);
            let lists = sub.contents().expect("contents are tracked");
            let cardinality = lists[0].len().abs_diff(lists[1].len());
            sum_of_cardinality_differences += cardinality;
            max_cardinality = max_cardinality.max(cardinality);
        }
        if 2.0 * max_difference - sum_of_differences >= self.best_sum_difference {
            return;
        }
        // The published test also allows an "or" clause on the total
        // cardinality slack, but that form rejects valid branches on inputs
        // with many equal items; only the difference form is used.
        if (2 * max_cardinality).saturating_sub(sum_of_cardinality_differences)
            > self.max_cardinality_difference
        {
            return;
        }

        if sub_partitions.len() <= self.numitems.div_ceil(2) {
            sub_partitions.sort_by(|a, b| {
                let diff_a = (a.sums()[0] - a.sums()[1]).abs();
                let diff_b = (b.sums()[0] - b.sums()[1]).abs();
                diff_b.total_cmp(&diff_a)
            });
        }

        // Aligned merge: small bin with small, large with large.
        let mut combined = self.binner.new_bins(2);
        for section in 0..2 {
            for bin_index in 0..2 {
                self.binner
                    .combine_bins(&mut combined, bin_index, &sub_partitions[section], bin_index);
            }
        }
        self.binner.sort_by_ascending_sum(&mut combined);

        // Crossed merge: small bin with large, large with small.
        let mut split = self.binner.new_bins(2);
        for section in 0..2 {
            for bin_index in 0..2 {
                self.binner.combine_bins(
                    &mut split,
                    bin_index,
                    &sub_partitions[section],
                    (bin_index + section + 1) % 2,
                );
            }
        }
        self.binner.sort_by_ascending_sum(&mut split);

        let rest = &sub_partitions[2..];
        let mut left_branch: Vec<BinsArray> = rest.to_vec();
        left_branch.push(split);
        let mut right_branch: Vec<BinsArray> = rest.to_vec();
        right_branch.push(combined);
        self.explore(left_branch, epsilon);
        self.explore(right_branch, epsilon);
    }
}
