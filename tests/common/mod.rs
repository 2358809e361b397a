//! Shared helpers for the integration tests.

use multiway::{Items, OutputShape, PartitionConfig, PartitionResult};

/// Ascending bin sums of a result produced with the `Sums` output shape.
pub fn sums_of(result: &PartitionResult) -> Vec<f64> {
    result.sums().expect("result carries sums").to_vec()
}

/// A config asking for ascending bin sums only.
pub fn sums_config() -> PartitionConfig {
    PartitionConfig {
        output: OutputShape::Sums,
        ..PartitionConfig::default()
    }
}

/// Items from a slice of numbers.
pub fn value_items(values: &[f64]) -> Items {
    Items::from_values(values.iter().copied())
}

/// The multiset of values across all bins of a full partition, sorted.
pub fn all_partitioned_values(result: &PartitionResult) -> Vec<f64> {
    let mut values: Vec<f64> = result
        .bins()
        .expect("result carries bins")
        .iter()
        .flatten()
        .map(|label| match label {
            multiway::ItemLabel::Value(value) => *value,
            multiway::ItemLabel::Name(name) => panic!("unexpected named item {name}"),
        })
        .collect();
    values.sort_by(f64::total_cmp);
    values
}
