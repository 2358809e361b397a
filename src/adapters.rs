//! Input normalization and the top-level entry points.
//!
//! [`partition`], [`pack`] and [`cover`] accept items in three shapes
//! (plain values, a name-to-value mapping, or names with an external value
//! function), normalize them into dense item ids with parallel value and
//! label tables, run the selected algorithm through a [`Binner`] of the
//! flavor the requested output needs, and project the final bins through
//! the output shape.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::binner::{Binner, BinsArray, ItemId};
use crate::covering;
use crate::error::{PartitionError, Result};
use crate::objectives::Objective;
use crate::outputs::{extract, ItemLabel, OutputShape, PartitionResult};
use crate::packing::{self, ImprovedBinCompletionConfig};
use crate::partitioning::{self, CompleteGreedyConfig, IlpConfig};

/// The items to split, in one of the supported input shapes.
#[derive(Debug, Clone)]
pub struct Items {
    labels: Vec<ItemLabel>,
    values: Vec<f64>,
}

impl Items {
    /// Plain numeric items; each value is its own identity.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let values: Vec<f64> = values.into_iter().collect();
        Items {
            labels: values.iter().map(|&value| ItemLabel::Value(value)).collect(),
            values,
        }
    }

    /// Named items with explicit values.
    pub fn from_map(entries: impl IntoIterator<Item = (impl Into<String>, f64)>) -> Self {
        let (labels, values) = entries
            .into_iter()
            .map(|(name, value)| (ItemLabel::Name(name.into()), value))
            .unzip();
        Items { labels, values }
    }

    /// Named items with the values obtained from an external function.
    pub fn from_names(
        names: impl IntoIterator<Item = impl Into<String>>,
        valueof: impl Fn(&str) -> f64,
    ) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let values = names.iter().map(|name| valueof(name)).collect();
        Items {
            labels: names.into_iter().map(ItemLabel::Name).collect(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-item multiplicities.
#[derive(Debug, Clone)]
pub enum Copies {
    /// Every item has the same multiplicity.
    Uniform(usize),
    /// One multiplicity per item, in input order.
    PerItem(Vec<usize>),
    /// Multiplicities by item name; unnamed items default to one copy.
    ByName(HashMap<String, usize>),
}

impl Default for Copies {
    fn default() -> Self {
        Copies::Uniform(1)
    }
}

/// The partitioning algorithms selectable through [`partition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitioningAlgorithm {
    Greedy,
    RoundRobin,
    BidirectionalBalanced,
    MultiFit,
    KarmarkarKarp,
    CompleteKarmarkarKarp,
    CompleteGreedy,
    DynamicProgramming,
    SequentialNumberPartitioning,
    RecursiveNumberPartitioning,
    IntegerProgramming,
    Cbldm,
}

/// The packing algorithms selectable through [`pack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingAlgorithm {
    FirstFit,
    FirstFitDecreasing,
    BestFit,
    BestFitDecreasing,
    BinCompletion,
    ImprovedBinCompletion,
}

/// The covering algorithms selectable through [`cover`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoveringAlgorithm {
    DecreasingGreedy,
    TwoThirds,
    ThreeQuarters,
}

/// Options shared by the partitioning algorithms. Algorithm-specific
/// fields are ignored by the algorithms that do not use them.
#[derive(Clone)]
pub struct PartitionConfig {
    pub objective: Objective,
    pub output: OutputShape,
    pub copies: Copies,
    /// Wall-clock budget for the anytime searches, in seconds.
    pub time_limit: Option<f64>,
    /// Complete greedy: toggle the objective lower-bound prune.
    pub use_lower_bound: bool,
    /// Complete greedy: toggle the fast objective-specific prune.
    pub use_fast_lower_bound: bool,
    /// Complete greedy: toggle Korf's heuristic 3 (min-max only).
    pub use_heuristic_3: bool,
    /// Complete greedy: toggle the seen-states set.
    pub use_set_of_seen_states: bool,
    /// Tolerance for optimality comparisons; keep 0 for integral inputs.
    pub epsilon: f64,
    /// Integer programming: per-bin divisors for weighted fairness.
    pub entitlements: Option<Vec<f64>>,
    /// Integer programming: per-bin target shares for the
    /// distance-from-average objective.
    pub relative_values: Option<Vec<f64>>,
    /// Integer programming: extra constraints over the ascending sums.
    pub additional_constraints: Option<Arc<dyn Fn(&[good_lp::Expression]) -> Vec<good_lp::Constraint>>>,
    /// Integer programming: debug dump paths.
    pub model_path: Option<PathBuf>,
    pub solution_path: Option<PathBuf>,
    /// MultiFit: binary-search depth.
    pub iterations: usize,
    /// Balanced differencing: cap on the bin cardinality difference.
    pub partition_difference: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        PartitionConfig {
            objective: Objective::MinimizeDifference,
            output: OutputShape::Partition,
            copies: Copies::default(),
            time_limit: None,
            use_lower_bound: true,
            use_fast_lower_bound: true,
            use_heuristic_3: false,
            use_set_of_seen_states: true,
            epsilon: 0.0,
            entitlements: None,
            relative_values: None,
            additional_constraints: None,
            model_path: None,
            solution_path: None,
            iterations: 10,
            partition_difference: usize::MAX,
        }
    }
}

impl std::fmt::Debug for PartitionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionConfig")
            .field("objective", &self.objective)
            .field("output", &self.output)
            .field("copies", &self.copies)
            .field("time_limit", &self.time_limit)
            .field("use_lower_bound", &self.use_lower_bound)
            .field("use_fast_lower_bound", &self.use_fast_lower_bound)
            .field("use_heuristic_3", &self.use_heuristic_3)
            .field("use_set_of_seen_states", &self.use_set_of_seen_states)
            .field("epsilon", &self.epsilon)
            .field("entitlements", &self.entitlements)
            .field("relative_values", &self.relative_values)
            .field(
                "additional_constraints",
                &self.additional_constraints.as_ref().map(|_| "<callback>"),
            )
            .field("model_path", &self.model_path)
            .field("solution_path", &self.solution_path)
            .field("iterations", &self.iterations)
            .field("partition_difference", &self.partition_difference)
            .finish()
    }
}

/// Options for the packing and covering algorithms.
#[derive(Debug, Clone)]
pub struct PackConfig {
    pub output: OutputShape,
    /// Improved bin completion: completions generated per chunk.
    pub chunk_size: usize,
    /// Improved bin completion: limited-discrepancy branch ordering.
    pub limited_discrepancy: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        PackConfig {
            output: OutputShape::Partition,
            chunk_size: 50,
            limited_discrepancy: false,
        }
    }
}

/// Normalized instance: one entry per physical item copy, plus the compact
/// distinct-item view used by the integer-programming backend.
struct Instance {
    /// Expanded labels and values, one per copy.
    labels: Vec<ItemLabel>,
    values: Vec<f64>,
    /// Compact values and copies, one per distinct input item.
    distinct_values: Vec<f64>,
    distinct_copies: Vec<usize>,
    /// Label of each distinct item (for the compact binner's output).
    distinct_labels: Vec<ItemLabel>,
}

fn normalize(items: &Items, copies: &Copies) -> Result<Instance> {
    let count = items.len();
    let per_item: Vec<usize> = match copies {
        Copies::Uniform(n) => vec![*n; count],
        Copies::PerItem(list) => {
            if list.len() != count {
                return Err(PartitionError::InvalidParameter {
                    name: "copies",
                    reason: format!("expected {count} multiplicities, got {}", list.len()),
                });
            }
            list.clone()
        }
        Copies::ByName(map) => items
            .labels
            .iter()
            .map(|label| match label {
                ItemLabel::Name(name) => map.get(name).copied().unwrap_or(1),
                ItemLabel::Value(_) => 1,
            })
            .collect(),
    };

    for (label, &value) in items.labels.iter().zip(&items.values) {
        if !value.is_finite() {
            return Err(PartitionError::NonFiniteValue {
                item: label.to_string(),
                value,
            });
        }
        if value < 0.0 {
            return Err(PartitionError::NegativeValue {
                item: label.to_string(),
                value,
            });
        }
    }

    let mut labels = Vec::new();
    let mut values = Vec::new();
    for ((label, &value), &multiplicity) in
        items.labels.iter().zip(&items.values).zip(&per_item)
    {
        for _ in 0..multiplicity {
            labels.push(label.clone());
            values.push(value);
        }
    }
    Ok(Instance {
        labels,
        values,
        distinct_values: items.values.clone(),
        distinct_copies: per_item,
        distinct_labels: items.labels.clone(),
    })
}

/// Partition `items` into `numbins` bins with the chosen algorithm.
pub fn partition(
    algorithm: PartitioningAlgorithm,
    numbins: usize,
    items: &Items,
    config: &PartitionConfig,
) -> Result<PartitionResult> {
    let instance = normalize(items, &config.copies)?;
    let flavor = config.output.flavor();
    let binner = Binner::new(numbins, instance.values.clone(), flavor);
    let item_ids: Vec<ItemId> = (0..instance.values.len()).collect();

    if let Some(trivial) = partitioning::trivial_partition(&binner, numbins, &item_ids) {
        return extract(config.output, &trivial, &instance.labels);
    }

    // The integer-programming backend works on distinct items with
    // multiplicities; everything else searches over expanded copies.
    if algorithm == PartitioningAlgorithm::IntegerProgramming {
        let binner = Binner::with_copies(
            numbins,
            instance.distinct_values.clone(),
            instance.distinct_copies.clone(),
            flavor,
        );
        let item_ids: Vec<ItemId> = (0..instance.distinct_values.len()).collect();
        let ilp_config = IlpConfig {
            time_limit: config.time_limit,
            entitlements: config.entitlements.clone(),
            relative_values: config.relative_values.clone(),
            model_path: config.model_path.clone(),
            solution_path: config.solution_path.clone(),
        };
        let builder = config.additional_constraints.as_deref();
        let bins = partitioning::integer_programming(
            &binner,
            numbins,
            &item_ids,
            &config.objective,
            &ilp_config,
            builder,
        )?;
        return extract(config.output, &bins, &instance.distinct_labels);
    }

    let bins = run_partitioning(algorithm, &binner, numbins, &item_ids, config)?;
    extract(config.output, &bins, &instance.labels)
}

fn run_partitioning(
    algorithm: PartitioningAlgorithm,
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    config: &PartitionConfig,
) -> Result<BinsArray> {
    let mut bins = match algorithm {
        PartitioningAlgorithm::Greedy => partitioning::greedy(binner, numbins, items),
        PartitioningAlgorithm::RoundRobin => partitioning::round_robin(binner, numbins, items),
        PartitioningAlgorithm::BidirectionalBalanced => {
            partitioning::bidirectional_balanced(binner, numbins, items)
        }
        PartitioningAlgorithm::MultiFit => {
            partitioning::multifit(binner, numbins, items, config.iterations)
        }
        PartitioningAlgorithm::KarmarkarKarp => {
            partitioning::karmarkar_karp(binner, numbins, items)
        }
        PartitioningAlgorithm::CompleteKarmarkarKarp => partitioning::best_ckk_partition(
            binner,
            numbins,
            items,
            config.time_limit,
            config.epsilon,
        ),
        PartitioningAlgorithm::CompleteGreedy => {
            let greedy_config = CompleteGreedyConfig {
                objective: config.objective.clone(),
                use_lower_bound: config.use_lower_bound,
                use_fast_lower_bound: config.use_fast_lower_bound,
                use_heuristic_3: config.use_heuristic_3,
                use_set_of_seen_states: config.use_set_of_seen_states,
                time_limit: config.time_limit,
                epsilon: config.epsilon,
            };
            partitioning::complete_greedy(binner, numbins, items, &greedy_config)
        }
        PartitioningAlgorithm::DynamicProgramming => {
            partitioning::dynamic_programming(binner, numbins, items, &config.objective)
        }
        PartitioningAlgorithm::SequentialNumberPartitioning => {
            partitioning::sequential_number_partitioning(binner, numbins, items, config.epsilon)
        }
        PartitioningAlgorithm::RecursiveNumberPartitioning => {
            partitioning::recursive_number_partitioning(binner, numbins, items, config.epsilon)
        }
        PartitioningAlgorithm::Cbldm => partitioning::cbldm(
            binner,
            numbins,
            items,
            config.partition_difference,
            config.time_limit,
            config.epsilon,
        )?,
        PartitioningAlgorithm::IntegerProgramming => {
            unreachable!("handled by partition")
        }
    };
    binner.sort_by_ascending_sum(&mut bins);
    Ok(bins)
}

/// Pack `items` into the fewest bins of capacity `binsize`.
pub fn pack(
    algorithm: PackingAlgorithm,
    binsize: f64,
    items: &Items,
    config: &PackConfig,
) -> Result<PartitionResult> {
    let instance = normalize(items, &Copies::Uniform(1))?;
    for (label, &value) in instance.labels.iter().zip(&instance.values) {
        if value > binsize {
            return Err(PartitionError::ItemTooLarge {
                item: label.to_string(),
                value,
                binsize,
            });
        }
    }
    let binner = Binner::new(0, instance.values.clone(), config.output.flavor());
    let item_ids: Vec<ItemId> = (0..instance.values.len()).collect();
    let bins = match algorithm {
        PackingAlgorithm::FirstFit => packing::first_fit(&binner, binsize, &item_ids),
        PackingAlgorithm::FirstFitDecreasing => {
            packing::first_fit_decreasing(&binner, binsize, &item_ids)
        }
        PackingAlgorithm::BestFit => packing::best_fit(&binner, binsize, &item_ids),
        PackingAlgorithm::BestFitDecreasing => {
            packing::best_fit_decreasing(&binner, binsize, &item_ids)
        }
        PackingAlgorithm::BinCompletion => packing::bin_completion(&binner, binsize, &item_ids),
        PackingAlgorithm::ImprovedBinCompletion => {
            let improved_config = ImprovedBinCompletionConfig {
                chunk_size: config.chunk_size,
                limited_discrepancy: config.limited_discrepancy,
            };
            packing::improved_bin_completion(&binner, binsize, &item_ids, &improved_config)
        }
    };
    extract(config.output, &bins, &instance.labels)
}

/// Cover as many bins as possible up to at least `binsize`.
pub fn cover(
    algorithm: CoveringAlgorithm,
    binsize: f64,
    items: &Items,
    config: &PackConfig,
) -> Result<PartitionResult> {
    let instance = normalize(items, &Copies::Uniform(1))?;
    let binner = Binner::new(0, instance.values.clone(), config.output.flavor());
    let item_ids: Vec<ItemId> = (0..instance.values.len()).collect();
    let bins = match algorithm {
        CoveringAlgorithm::DecreasingGreedy => {
            covering::decreasing_greedy(&binner, binsize, &item_ids)
        }
        CoveringAlgorithm::TwoThirds => covering::twothirds(&binner, binsize, &item_ids),
        CoveringAlgorithm::ThreeQuarters => covering::threequarters(&binner, binsize, &item_ids),
    };
    extract(config.output, &bins, &instance.labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative_values() {
        let items = Items::from_values([3.0, -1.0]);
        let err = partition(
            PartitioningAlgorithm::Greedy,
            2,
            &items,
            &PartitionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PartitionError::NegativeValue { .. }));
    }

    #[test]
    fn test_rejects_nan_values() {
        let items = Items::from_values([3.0, f64::NAN]);
        let err = partition(
            PartitioningAlgorithm::Greedy,
            2,
            &items,
            &PartitionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PartitionError::NonFiniteValue { .. }));
    }

    #[test]
    fn test_rejects_oversized_packing_item() {
        let items = Items::from_values([3.0, 12.0]);
        let err = pack(
            PackingAlgorithm::FirstFit,
            10.0,
            &items,
            &PackConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PartitionError::ItemTooLarge { .. }));
    }

    #[test]
    fn test_copies_by_name_defaults_to_one() {
        let items = Items::from_map([("a", 1.0), ("b", 2.0)]);
        let copies = Copies::ByName(HashMap::from([("a".to_string(), 3)]));
        let config = PartitionConfig {
            copies,
            output: OutputShape::Sums,
            ..PartitionConfig::default()
        };
        let result = partition(PartitioningAlgorithm::Greedy, 1, &items, &config).unwrap();
        // 3 copies of a (1.0 each) and one b (2.0).
        assert_eq!(result.sums().unwrap(), &[5.0]);
    }

    #[test]
    fn test_copies_length_mismatch() {
        let items = Items::from_values([1.0, 2.0]);
        let config = PartitionConfig {
            copies: Copies::PerItem(vec![1]),
            ..PartitionConfig::default()
        };
        let err =
            partition(PartitioningAlgorithm::Greedy, 2, &items, &config).unwrap_err();
        assert!(matches!(err, PartitionError::InvalidParameter { .. }));
    }

    #[test]
    fn test_from_names_with_value_function() {
        let weights = HashMap::from([("x".to_string(), 4.0), ("y".to_string(), 6.0)]);
        let items = Items::from_names(["x", "y"], |name| weights[name]);
        let config = PartitionConfig {
            output: OutputShape::Sums,
            ..PartitionConfig::default()
        };
        let result = partition(PartitioningAlgorithm::Greedy, 2, &items, &config).unwrap();
        assert_eq!(result.sums().unwrap(), &[4.0, 6.0]);
    }
}
