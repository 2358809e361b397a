//! Bin-packing algorithms: pack all items into the fewest bins of a fixed
//! capacity.

pub mod best_fit;
pub mod bin_completion;
pub mod first_fit;
pub mod improved;

pub use best_fit::{best_fit, best_fit_decreasing};
pub use bin_completion::bin_completion;
pub use first_fit::{first_fit, first_fit_decreasing};
pub use improved::{improved_bin_completion, ImprovedBinCompletionConfig};
