//! Multiway number partitioning, bin packing and bin covering.
//!
//! Split a multiset of nonnegative numbers into k bins optimizing an
//! [`Objective`] over the bin sums, with a catalog of heuristic, anytime
//! and exact algorithms, plus the companion packing and covering problems.

pub mod adapters;
pub mod binner;
pub mod covering;
pub mod error;
pub mod objectives;
pub mod outputs;
pub mod packing;
pub mod partitioning;

pub use adapters::{
    cover, pack, partition, Copies, CoveringAlgorithm, Items, PackConfig, PackingAlgorithm,
    PartitionConfig, PartitioningAlgorithm,
};
pub use binner::{Binner, BinnerFlavor, BinsArray, ItemId};
pub use error::{PartitionError, Result};
pub use objectives::{CustomObjective, Objective};
pub use outputs::{ItemLabel, OutputShape, PartitionResult};
