//! Output shapes: what a partitioning call returns.
//!
//! Every algorithm produces a [`BinsArray`]; the requested [`OutputShape`]
//! selects which view of it is handed back to the caller. Shapes that need
//! the bin contents (the actual item lists) require a contents-tracking
//! binner; asking for them from a sums-only run is an error.

use std::fmt;

use serde::Serialize;

use crate::binner::{BinnerFlavor, BinsArray};
use crate::error::{PartitionError, Result};

/// Display identity of one input item, preserved through the algorithms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemLabel {
    /// The item was given as a plain number; its value is its identity.
    Value(f64),
    /// The item was given by name, with the value looked up externally.
    Name(String),
}

impl fmt::Display for ItemLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemLabel::Value(v) => write!(f, "{v}"),
            ItemLabel::Name(n) => write!(f, "{n}"),
        }
    }
}

/// Selector for the return value of [`crate::partition`] and
/// [`crate::pack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputShape {
    /// The full partition: one item list per bin.
    Partition,
    /// The bin sums, in ascending order of the final array.
    Sums,
    /// Only the largest bin sum.
    LargestSum,
    /// Only the smallest bin sum.
    SmallestSum,
    /// The smallest and largest bin sums.
    ExtremeSums,
    /// The difference between the largest and smallest bin sums.
    Difference,
    /// The number of bins (useful for packing and covering).
    BinCount,
    /// The full partition together with the bin sums.
    PartitionAndSums,
}

impl OutputShape {
    /// Whether this shape needs per-bin item lists.
    pub fn needs_contents(self) -> bool {
        matches!(self, OutputShape::Partition | OutputShape::PartitionAndSums)
    }

    /// The binner flavor an algorithm must run with to serve this shape.
    pub fn flavor(self) -> BinnerFlavor {
        if self.needs_contents() {
            BinnerFlavor::KeepContents
        } else {
            BinnerFlavor::KeepSums
        }
    }
}

/// The value returned by a partitioning, packing or covering call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PartitionResult {
    Partition(Vec<Vec<ItemLabel>>),
    Sums(Vec<f64>),
    LargestSum(f64),
    SmallestSum(f64),
    ExtremeSums { smallest: f64, largest: f64 },
    Difference(f64),
    BinCount(usize),
    PartitionAndSums {
        bins: Vec<Vec<ItemLabel>>,
        sums: Vec<f64>,
    },
}

impl PartitionResult {
    /// The sums vector, for shapes that carry one.
    pub fn sums(&self) -> Option<&[f64]> {
        match self {
            PartitionResult::Sums(sums) => Some(sums),
            PartitionResult::PartitionAndSums { sums, .. } => Some(sums),
            _ => None,
        }
    }

    /// The bin item lists, for shapes that carry them.
    pub fn bins(&self) -> Option<&[Vec<ItemLabel>]> {
        match self {
            PartitionResult::Partition(bins) => Some(bins),
            PartitionResult::PartitionAndSums { bins, .. } => Some(bins),
            _ => None,
        }
    }

    /// The scalar carried by single-value shapes.
    pub fn value(&self) -> Option<f64> {
        match self {
            PartitionResult::LargestSum(v)
            | PartitionResult::SmallestSum(v)
            | PartitionResult::Difference(v) => Some(*v),
            PartitionResult::BinCount(n) => Some(*n as f64),
            _ => None,
        }
    }
}

/// Project the final bins through the requested shape.
///
/// `labels` maps each [`crate::binner::ItemId`] back to the caller's item
/// identity.
pub(crate) fn extract(
    shape: OutputShape,
    bins: &BinsArray,
    labels: &[ItemLabel],
) -> Result<PartitionResult> {
    let sums = bins.sums();
    let smallest = sums.iter().copied().fold(f64::INFINITY, f64::min);
    let largest = sums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    match shape {
        OutputShape::Sums => Ok(PartitionResult::Sums(sums.to_vec())),
        OutputShape::LargestSum => Ok(PartitionResult::LargestSum(largest)),
        OutputShape::SmallestSum => Ok(PartitionResult::SmallestSum(smallest)),
        OutputShape::ExtremeSums => Ok(PartitionResult::ExtremeSums { smallest, largest }),
        OutputShape::Difference => Ok(PartitionResult::Difference(largest - smallest)),
        OutputShape::BinCount => Ok(PartitionResult::BinCount(bins.numbins())),
        OutputShape::Partition => Ok(PartitionResult::Partition(labeled_bins(shape, bins, labels)?)),
        OutputShape::PartitionAndSums => Ok(PartitionResult::PartitionAndSums {
            bins: labeled_bins(shape, bins, labels)?,
            sums: sums.to_vec(),
        }),
    }
}

fn labeled_bins(
    shape: OutputShape,
    bins: &BinsArray,
    labels: &[ItemLabel],
) -> Result<Vec<Vec<ItemLabel>>> {
    let contents = bins
        .contents()
        .ok_or(PartitionError::UnsupportedOutput { shape })?;
    Ok(contents
        .iter()
        .map(|list| list.iter().map(|&item| labels[item].clone()).collect())
        .collect())
}
