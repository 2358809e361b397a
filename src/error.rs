//! Error types for partitioning, packing and covering.
//!
//! Invalid user input and solver failures are reported through
//! [`PartitionError`]. Out-of-range bin indices and mixing bin-arrays of
//! different flavors are programmer errors and panic instead.

use thiserror::Error;

use crate::outputs::OutputShape;

/// Errors that can occur when partitioning, packing or covering items.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// An item has a negative value. All item values must be nonnegative.
    #[error("item '{item}' has negative value {value}")]
    NegativeValue { item: String, value: f64 },

    /// An item value is NaN or infinite.
    #[error("item '{item}' has non-finite value {value}")]
    NonFiniteValue { item: String, value: f64 },

    /// A packing item is larger than the declared bin size.
    #[error("item '{item}' has size {value} which is larger than the bin size {binsize}")]
    ItemTooLarge {
        item: String,
        value: f64,
        binsize: f64,
    },

    /// A parameter is out of its legal range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The requested output needs bin contents, but the algorithm ran with
    /// a sums-only binner.
    #[error("the {shape:?} output needs bin contents, but only sums were tracked")]
    UnsupportedOutput { shape: OutputShape },

    /// The requested objective has no encoding in the selected backend.
    #[error("objective {objective} is not supported by {algorithm}")]
    UnsupportedObjective {
        objective: String,
        algorithm: &'static str,
    },

    /// The MILP backend finished with a non-optimal status.
    #[error("solver finished with non-optimal status: {status}")]
    SolverFailure { status: String },

    /// I/O failure while writing a debug dump.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PartitionError>;
