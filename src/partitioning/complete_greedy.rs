//! Complete greedy number partitioning (Korf, 1995): depth-first
//! branch-and-bound over the tree of bin assignments.
//!
//! Items are considered in descending order of value; at each node the next
//! item is tried in every bin, least-loaded bin first. Four independently
//! toggleable pruning devices keep the tree small: equal-sum branch
//! deduplication, a fast objective-specific bound computed before the child
//! is materialized, the objective's full lower bound, and a set of
//! already-seen sum vectors.

use std::collections::HashSet;
use std::time::Instant;

use log::{debug, info};

use crate::binner::{Binner, BinsArray, ItemId, SumsKey};
use crate::objectives::Objective;
use crate::partitioning::karmarkar_karp::karmarkar_karp;

/// Tuning knobs of the complete greedy search.
#[derive(Debug, Clone)]
pub struct CompleteGreedyConfig {
    pub objective: Objective,
    /// Prune branches whose optimistic objective bound cannot beat the best
    /// value found so far.
    pub use_lower_bound: bool,
    /// A cheaper bound checked before the child node is created. Effective
    /// for the min-max and max-min objectives only.
    pub use_fast_lower_bound: bool,
    /// Korf's third heuristic: when the remaining items cannot lift the
    /// smallest bin past the largest, dump them all into the smallest bin.
    /// Valid for minimize-largest-sum only.
    pub use_heuristic_3: bool,
    /// Skip sum vectors that were already expanded. Memory-bounded by the
    /// number of reachable states.
    pub use_set_of_seen_states: bool,
    /// Wall-clock budget in seconds; the best partition so far is returned
    /// on expiry.
    pub time_limit: Option<f64>,
    /// Tolerance used when comparing objective values for optimality.
    pub epsilon: f64,
}

impl Default for CompleteGreedyConfig {
    fn default() -> Self {
        CompleteGreedyConfig {
            objective: Objective::MinimizeDifference,
            use_lower_bound: true,
            use_fast_lower_bound: true,
            use_heuristic_3: false,
            use_set_of_seen_states: true,
            time_limit: None,
            epsilon: 0.0,
        }
    }
}

/// Complete greedy search returning the best partition found.
pub fn complete_greedy(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    config: &CompleteGreedyConfig,
) -> BinsArray {
    complete_greedy_anytime(binner, numbins, items, config, &mut |_, _| true)
}

/// Complete greedy search reporting every improvement through
/// `on_improvement`; the callback returns `false` to stop early.
///
/// The search starts from the differencing heuristic's partition, so the
/// first reported improvement is already better than Karmarkar-Karp.
pub fn complete_greedy_anytime(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    config: &CompleteGreedyConfig,
    on_improvement: &mut dyn FnMut(&BinsArray, f64) -> bool,
) -> BinsArray {
    let objective = &config.objective;
    let numitems = items.len();
    let start = Instant::now();

    let sorted_items = super::greedy::sorted_descending(binner, items);
    // sums_of_remaining[d] is the total value of the items at depth d and
    // deeper; used by the bounds and by heuristic 3.
    let mut sums_of_remaining = vec![0.0; numitems + 1];
    for depth in (0..numitems).rev() {
        sums_of_remaining[depth] = sums_of_remaining[depth + 1] + binner.valueof(sorted_items[depth]);
    }

    let empty = binner.new_bins(numbins);
    let global_lower_bound = objective.lower_bound(empty.sums(), sums_of_remaining[0], true);
    info!(
        "complete greedy {} partitioning of {} items into {} bins, lower bound {}",
        objective, numitems, numbins, global_lower_bound
    );

    // Seed with differencing; the search can only improve on it.
    let mut best_bins = karmarkar_karp(binner, numbins, items);
    binner.sort_by_ascending_sum(&mut best_bins);
    let mut best_value = objective.value_to_minimize(best_bins.sums(), true);
    if best_value <= global_lower_bound + config.epsilon {
        return best_bins;
    }

    let mut stack: Vec<(BinsArray, usize)> = Vec::new();
    let mut seen_states: HashSet<SumsKey> = HashSet::new();
    if config.use_set_of_seen_states {
        seen_states.insert(binner.sums_key(&empty));
    }
    stack.push((empty, 0));

    let mut complete_checked: u64 = 0;
    let mut intermediate_checked: u64 = 1;

    while let Some((current_bins, depth)) = stack.pop() {
        if depth == numitems {
            complete_checked += 1;
            let value = objective.value_to_minimize(current_bins.sums(), true);
            if value < best_value {
                info!("found a better partition with value {value}");
                best_value = value;
                best_bins = current_bins;
                if !on_improvement(&best_bins, best_value) {
                    break;
                }
                if best_value <= global_lower_bound + config.epsilon {
                    info!("solution matches the global lower bound, stopping");
                    break;
                }
            }
            if let Some(limit) = config.time_limit {
                if start.elapsed().as_secs_f64() > limit {
                    info!("time limit of {limit}s reached, stopping");
                    break;
                }
            }
            continue;
        }

        // Heuristic 3: when even the whole remainder cannot lift the
        // smallest bin past the largest one, the optimal completion of this
        // node puts everything in the smallest bin.
        if config.use_heuristic_3 && matches!(objective, Objective::MinimizeLargestSum) {
            let sums = current_bins.sums();
            if sums_of_remaining[depth] + sums[0] <= sums[numbins - 1] {
                let mut leaf = current_bins.clone();
                for &item in &sorted_items[depth..] {
                    binner.add_item_to_bin(&mut leaf, item, 0);
                }
                binner.sort_by_ascending_sum(&mut leaf);
                stack.push((leaf, numitems));
                continue;
            }
        }

        let next_item = sorted_items[depth];
        let next_value = binner.valueof(next_item);
        let remaining_after = sums_of_remaining[depth + 1];

        let mut previous_bin_sum = None;
        for bin_index in (0..numbins).rev() {
            // Heuristic 1: bins with equal sums produce symmetric subtrees;
            // extend only one of them.
            let current_bin_sum = current_bins.sums()[bin_index];
            if Some(current_bin_sum) == previous_bin_sum {
                continue;
            }
            previous_bin_sum = Some(current_bin_sum);

            // Heuristic 2: a fast bound that avoids materializing the child.
            if config.use_fast_lower_bound {
                let fast_lower_bound = match objective {
                    Objective::MinimizeLargestSum => {
                        (current_bin_sum + next_value).max(current_bins.sums()[numbins - 1])
                    }
                    Objective::MaximizeSmallestSum => {
                        // The projected smallest sum cannot exceed the current
                        // smallest bin plus everything still unassigned.
                        let projected_smallest = if bin_index == 0 {
                            (current_bins.sums()[0] + next_value).min(current_bins.sums()[1])
                        } else {
                            current_bins.sums()[0]
                        };
                        -(projected_smallest + remaining_after)
                    }
                    _ => f64::NEG_INFINITY,
                };
                if fast_lower_bound >= best_value {
                    continue;
                }
            }

            let mut new_sums = current_bins.sums().to_vec();
            new_sums[bin_index] += next_value;
            new_sums.sort_by(f64::total_cmp);

            // Heuristic 3 of the pruning family: the objective's own bound.
            if config.use_lower_bound {
                let lower_bound = objective.lower_bound(&new_sums, remaining_after, true);
                if lower_bound >= best_value {
                    debug!("lower bound {lower_bound} cannot beat {best_value}");
                    continue;
                }
            }

            if config.use_set_of_seen_states {
                let state: SumsKey = new_sums.iter().copied().map(ordered_float::OrderedFloat).collect();
                if !seen_states.insert(state) {
                    continue;
                }
            }

            let mut new_bins = current_bins.clone();
            binner.add_item_to_bin(&mut new_bins, next_item, bin_index);
            binner.sort_by_ascending_sum(&mut new_bins);
            stack.push((new_bins, depth + 1));
            intermediate_checked += 1;
        }
    }

    info!(
        "checked {complete_checked} complete and {intermediate_checked} intermediate partitions"
    );
    best_bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binner::BinnerFlavor;

    fn binner_for(values: &[f64], flavor: BinnerFlavor) -> Binner {
        Binner::new(0, values.to_vec(), flavor)
    }

    fn ids(n: usize) -> Vec<ItemId> {
        (0..n).collect()
    }

    fn config_with(objective: Objective) -> CompleteGreedyConfig {
        CompleteGreedyConfig {
            objective,
            ..CompleteGreedyConfig::default()
        }
    }

    const WALTER_NUMBERS: [f64; 7] = [46.0, 39.0, 27.0, 26.0, 16.0, 13.0, 10.0];

    #[test]
    fn test_perfect_two_way_split() {
        let values = [4.0, 5.0, 6.0, 7.0, 8.0];
        let binner = binner_for(&values, BinnerFlavor::KeepContents);
        let bins = complete_greedy(
            &binner,
            2,
            &ids(5),
            &config_with(Objective::MinimizeDifference),
        );
        assert_eq!(bins.sums(), &[15.0, 15.0]);
    }

    #[test]
    fn test_walter_minimize_difference() {
        let binner = binner_for(&WALTER_NUMBERS, BinnerFlavor::KeepSums);
        let bins = complete_greedy(
            &binner,
            3,
            &ids(7),
            &config_with(Objective::MinimizeDifference),
        );
        assert_eq!(bins.sums(), &[55.0, 59.0, 63.0]);
    }

    #[test]
    fn test_walter_minimize_largest_sum() {
        let binner = binner_for(&WALTER_NUMBERS, BinnerFlavor::KeepSums);
        let bins = complete_greedy(
            &binner,
            3,
            &ids(7),
            &config_with(Objective::MinimizeLargestSum),
        );
        assert_eq!(bins.sums()[2], 62.0);
    }

    #[test]
    fn test_walter_maximize_smallest_sum() {
        let binner = binner_for(&WALTER_NUMBERS, BinnerFlavor::KeepSums);
        let bins = complete_greedy(
            &binner,
            3,
            &ids(7),
            &config_with(Objective::MaximizeSmallestSum),
        );
        assert_eq!(bins.sums()[0], 56.0);
    }

    #[test]
    fn test_heuristics_do_not_change_the_optimum() {
        let values = [37.0, 29.0, 28.0, 23.0, 19.0, 14.0, 9.0, 6.0, 4.0, 2.0];
        let binner = binner_for(&values, BinnerFlavor::KeepSums);
        let mut reference: Option<f64> = None;
        for use_lower_bound in [false, true] {
            for use_fast_lower_bound in [false, true] {
                for use_set_of_seen_states in [false, true] {
                    let config = CompleteGreedyConfig {
                        objective: Objective::MinimizeLargestSum,
                        use_lower_bound,
                        use_fast_lower_bound,
                        use_heuristic_3: use_lower_bound,
                        use_set_of_seen_states,
                        ..CompleteGreedyConfig::default()
                    };
                    let bins = complete_greedy(&binner, 3, &ids(10), &config);
                    let value = bins.sums()[2];
                    match reference {
                        None => reference = Some(value),
                        Some(expected) => assert_eq!(value, expected),
                    }
                }
            }
        }
    }

    #[test]
    fn test_anytime_values_strictly_decrease() {
        let values = [27.0, 26.0, 21.0, 17.0, 14.0, 9.0, 5.0, 3.0];
        let binner = binner_for(&values, BinnerFlavor::KeepSums);
        let mut reported: Vec<f64> = Vec::new();
        complete_greedy_anytime(
            &binner,
            3,
            &ids(8),
            &config_with(Objective::MinimizeDifference),
            &mut |_, value| {
                reported.push(value);
                true
            },
        );
        for window in reported.windows(2) {
            assert!(window[1] < window[0]);
        }
    }

    #[test]
    fn test_contents_are_consistent_with_sums() {
        let binner = binner_for(&WALTER_NUMBERS, BinnerFlavor::KeepContents);
        let bins = complete_greedy(
            &binner,
            3,
            &ids(7),
            &config_with(Objective::MinimizeDifference),
        );
        for (index, list) in bins.contents().unwrap().iter().enumerate() {
            let sum: f64 = list.iter().map(|&i| WALTER_NUMBERS[i]).sum();
            assert_eq!(sum, bins.sums()[index]);
        }
        let mut all: Vec<ItemId> = bins.contents().unwrap().concat();
        all.sort_unstable();
        assert_eq!(all, ids(7));
    }
}
