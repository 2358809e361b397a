//! Partitioning algorithms: heuristic seeds, differencing, branch-and-bound
//! search, dynamic programming and the integer-programming oracle.

pub mod cbldm;
pub mod ckk;
pub mod complete_greedy;
pub mod dp;
pub mod greedy;
pub mod ilp;
pub mod inclusion_exclusion;
pub mod karmarkar_karp;
pub mod multifit;
pub mod rnp;
pub mod snp;
pub mod trivial;

pub use cbldm::cbldm;
pub use ckk::{best_ckk_partition, complete_karmarkar_karp_anytime};
pub use complete_greedy::{complete_greedy, complete_greedy_anytime, CompleteGreedyConfig};
pub use dp::dynamic_programming;
pub use greedy::{bidirectional_balanced, greedy, round_robin};
pub use ilp::{integer_programming, IlpConfig};
pub use inclusion_exclusion::InExclusionBinTree;
pub use karmarkar_karp::karmarkar_karp;
pub use multifit::multifit;
pub use rnp::recursive_number_partitioning;
pub use snp::sequential_number_partitioning;
pub use trivial::trivial_partition;
