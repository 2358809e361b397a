//! Optimization objectives for partitioning algorithms.
//!
//! An [`Objective`] is a stateless strategy over the vector of bin sums.
//! The search algorithms always *minimize* [`Objective::value_to_minimize`];
//! maximization objectives return a negated value. [`Objective::lower_bound`]
//! is an optimistic estimate used by branch-and-bound pruning.

use std::fmt;
use std::sync::Arc;

/// A user-supplied objective, first-class next to the built-in ones.
pub trait CustomObjective: fmt::Debug {
    /// The value the search minimizes, given the current bin sums.
    /// `ascending` promises that `sums` is sorted in nondecreasing order.
    fn value_to_minimize(&self, sums: &[f64], ascending: bool) -> f64;

    /// An optimistic (lower) bound on the final objective value, given the
    /// current sums and the total value of the items not yet assigned.
    /// The default bound prunes nothing.
    fn lower_bound(&self, _sums: &[f64], _sum_of_remaining_items: f64, _ascending: bool) -> f64 {
        f64::NEG_INFINITY
    }
}

/// Objective over the k-vector of bin sums.
#[derive(Debug, Clone)]
pub enum Objective {
    /// Minimize the largest bin sum (makespan).
    MinimizeLargestSum,
    /// Maximize the smallest bin sum (Santa-Claus / egalitarian).
    MaximizeSmallestSum,
    /// Minimize the difference between the largest and smallest sums.
    MinimizeDifference,
    /// Maximize the total of the p smallest sums.
    MaximizeKSmallestSums(usize),
    /// Minimize the total of the p largest sums.
    MinimizeKLargestSums(usize),
    /// Maximize the smallest sum after dividing each sum by its weight.
    /// The weights are indexed by bin; the sums must not be pre-sorted.
    MaximizeSmallestWeightedSum(Vec<f64>),
    /// Minimize half the total absolute deviation of the sums from their
    /// average.
    MinimizeDistAvg,
    /// A caller-supplied objective.
    Custom(Arc<dyn CustomObjective>),
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::MinimizeLargestSum => write!(f, "minimize-largest-sum"),
            Objective::MaximizeSmallestSum => write!(f, "maximize-smallest-sum"),
            Objective::MinimizeDifference => write!(f, "minimize-difference"),
            Objective::MaximizeKSmallestSums(p) => write!(f, "maximize-{p}-smallest-sums"),
            Objective::MinimizeKLargestSums(p) => write!(f, "minimize-{p}-largest-sums"),
            Objective::MaximizeSmallestWeightedSum(_) => {
                write!(f, "maximize-smallest-weighted-sum")
            }
            Objective::MinimizeDistAvg => write!(f, "minimize-distance-from-average"),
            Objective::Custom(_) => write!(f, "custom"),
        }
    }
}

impl Objective {
    /// The value the search minimizes, given the current bin sums.
    ///
    /// `ascending` promises that `sums` is already sorted in nondecreasing
    /// order, which lets min/max objectives read the endpoints directly.
    pub fn value_to_minimize(&self, sums: &[f64], ascending: bool) -> f64 {
        match self {
            Objective::MinimizeLargestSum => {
                if ascending {
                    sums[sums.len() - 1]
                } else {
                    max_of(sums)
                }
            }
            Objective::MaximizeSmallestSum => {
                if ascending {
                    -sums[0]
                } else {
                    -min_of(sums)
                }
            }
            Objective::MinimizeDifference => {
                if ascending {
                    sums[sums.len() - 1] - sums[0]
                } else {
                    max_of(sums) - min_of(sums)
                }
            }
            Objective::MaximizeKSmallestSums(p) => {
                let sorted = sorted_copy(sums, ascending);
                -sorted[..(*p).min(sorted.len())].iter().sum::<f64>()
            }
            Objective::MinimizeKLargestSums(p) => {
                let sorted = sorted_copy(sums, ascending);
                let start = sorted.len().saturating_sub(*p);
                sorted[start..].iter().sum::<f64>()
            }
            Objective::MaximizeSmallestWeightedSum(weights) => {
                assert!(
                    !ascending,
                    "the weighted objective pairs sums with per-bin weights and cannot be \
                     evaluated on a re-sorted sums vector"
                );
                -min_of(
                    &sums
                        .iter()
                        .zip(weights)
                        .map(|(s, w)| s / w)
                        .collect::<Vec<_>>(),
                )
            }
            Objective::MinimizeDistAvg => {
                let avg = sums.iter().sum::<f64>() / sums.len() as f64;
                0.5 * sums.iter().map(|s| (s - avg).abs()).sum::<f64>()
            }
            Objective::Custom(custom) => custom.value_to_minimize(sums, ascending),
        }
    }

    /// An optimistic (lower) bound on the final objective value, given the
    /// current sums and the total value of the still-unassigned items.
    ///
    /// Used by branch-and-bound to prune subtrees that cannot improve on
    /// the best value found so far. Objectives without a useful bound
    /// return negative infinity, which prunes nothing.
    pub fn lower_bound(&self, sums: &[f64], sum_of_remaining_items: f64, ascending: bool) -> f64 {
        match self {
            Objective::MinimizeLargestSum => {
                let current_largest = if ascending {
                    sums[sums.len() - 1]
                } else {
                    max_of(sums)
                };
                let average =
                    (sums.iter().sum::<f64>() + sum_of_remaining_items) / sums.len() as f64;
                current_largest.max(average)
            }
            Objective::MaximizeSmallestSum => {
                let current_smallest = if ascending { sums[0] } else { min_of(sums) };
                let average =
                    (sums.iter().sum::<f64>() + sum_of_remaining_items) / sums.len() as f64;
                -(current_smallest + sum_of_remaining_items).min(average)
            }
            Objective::MinimizeDifference => {
                // The largest sum never shrinks and the smallest can grow by
                // at most everything still unassigned.
                let (smallest, largest) = if ascending {
                    (sums[0], sums[sums.len() - 1])
                } else {
                    (min_of(sums), max_of(sums))
                };
                (largest - (smallest + sum_of_remaining_items)).max(0.0)
            }
            Objective::Custom(custom) => {
                custom.lower_bound(sums, sum_of_remaining_items, ascending)
            }
            _ => f64::NEG_INFINITY,
        }
    }
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn sorted_copy(sums: &[f64], ascending: bool) -> Vec<f64> {
    let mut sorted = sums.to_vec();
    if !ascending {
        sorted.sort_by(f64::total_cmp);
    }
    sorted
}
