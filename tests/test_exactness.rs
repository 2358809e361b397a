//! Randomized cross-checks: every exact algorithm must report the same
//! optimal objective value on the same instance.

mod common;

use common::{sums_of, value_items};
use multiway::{partition, Objective, OutputShape, PartitionConfig, PartitioningAlgorithm};
use rand::prelude::*;
use rand::rngs::StdRng;

fn random_values(rng: &mut StdRng, count: usize, bits: u32) -> Vec<f64> {
    (0..count)
        .map(|_| rng.gen_range(1..(1u64 << bits)) as f64)
        .collect()
}

fn difference_of(algorithm: PartitioningAlgorithm, numbins: usize, values: &[f64]) -> f64 {
    let items = value_items(values);
    let config = PartitionConfig {
        output: OutputShape::Difference,
        ..PartitionConfig::default()
    };
    partition(algorithm, numbins, &items, &config)
        .unwrap()
        .value()
        .unwrap()
}

#[test]
fn test_minimize_difference_cross_check() {
    let mut rng = StdRng::seed_from_u64(42);
    let exact = [
        PartitioningAlgorithm::DynamicProgramming,
        PartitioningAlgorithm::CompleteKarmarkarKarp,
        PartitioningAlgorithm::CompleteGreedy,
        PartitioningAlgorithm::SequentialNumberPartitioning,
        PartitioningAlgorithm::RecursiveNumberPartitioning,
    ];
    for numbins in [2, 3, 4] {
        for _ in 0..4 {
            let count = rng.gen_range(numbins + 1..=8);
            let values = random_values(&mut rng, count, 6);
            let reference = difference_of(PartitioningAlgorithm::DynamicProgramming, numbins, &values);
            for algorithm in exact {
                let value = difference_of(algorithm, numbins, &values);
                assert_eq!(
                    value, reference,
                    "algorithm {algorithm:?} differs on {values:?} with {numbins} bins"
                );
            }
        }
    }
}

#[test]
fn test_minimize_difference_five_bins() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..3 {
        let values = random_values(&mut rng, 7, 5);
        let reference = difference_of(PartitioningAlgorithm::DynamicProgramming, 5, &values);
        for algorithm in [
            PartitioningAlgorithm::CompleteKarmarkarKarp,
            PartitioningAlgorithm::CompleteGreedy,
            PartitioningAlgorithm::SequentialNumberPartitioning,
        ] {
            let value = difference_of(algorithm, 5, &values);
            assert_eq!(
                value, reference,
                "algorithm {algorithm:?} differs on {values:?} with 5 bins"
            );
        }
        // The recursive variant is sandwiched between the optimum and its
        // differencing seed.
        let recursive =
            difference_of(PartitioningAlgorithm::RecursiveNumberPartitioning, 5, &values);
        let seed = difference_of(PartitioningAlgorithm::KarmarkarKarp, 5, &values);
        assert!(recursive >= reference);
        assert!(recursive <= seed);
    }
}

#[test]
fn test_ilp_agrees_with_dynamic_programming() {
    let mut rng = StdRng::seed_from_u64(11);
    for numbins in [2, 3] {
        for _ in 0..2 {
            let values = random_values(&mut rng, 6, 6);
            let reference =
                difference_of(PartitioningAlgorithm::DynamicProgramming, numbins, &values);
            let ilp = difference_of(PartitioningAlgorithm::IntegerProgramming, numbins, &values);
            assert_eq!(
                ilp, reference,
                "integer programming differs on {values:?} with {numbins} bins"
            );
        }
    }
}

#[test]
fn test_minimize_largest_sum_cross_check() {
    let mut rng = StdRng::seed_from_u64(23);
    let config = PartitionConfig {
        objective: Objective::MinimizeLargestSum,
        output: OutputShape::LargestSum,
        ..PartitionConfig::default()
    };
    for numbins in [2, 3] {
        for _ in 0..3 {
            let values = random_values(&mut rng, 7, 6);
            let items = value_items(&values);
            let exact = [
                PartitioningAlgorithm::DynamicProgramming,
                PartitioningAlgorithm::CompleteGreedy,
                PartitioningAlgorithm::IntegerProgramming,
            ];
            let reference = partition(exact[0], numbins, &items, &config)
                .unwrap()
                .value()
                .unwrap();
            for algorithm in exact {
                let value = partition(algorithm, numbins, &items, &config)
                    .unwrap()
                    .value()
                    .unwrap();
                assert_eq!(
                    value, reference,
                    "algorithm {algorithm:?} differs on {values:?} with {numbins} bins"
                );
            }
        }
    }
}

#[test]
fn test_maximize_smallest_sum_cross_check() {
    let mut rng = StdRng::seed_from_u64(31);
    let config = PartitionConfig {
        objective: Objective::MaximizeSmallestSum,
        output: OutputShape::SmallestSum,
        ..PartitionConfig::default()
    };
    for _ in 0..3 {
        let values = random_values(&mut rng, 7, 6);
        let items = value_items(&values);
        let exact = [
            PartitioningAlgorithm::DynamicProgramming,
            PartitioningAlgorithm::CompleteGreedy,
            PartitioningAlgorithm::IntegerProgramming,
        ];
        let reference = partition(exact[0], 3, &items, &config)
            .unwrap()
            .value()
            .unwrap();
        for algorithm in exact {
            let value = partition(algorithm, 3, &items, &config)
                .unwrap()
                .value()
                .unwrap();
            assert_eq!(
                value, reference,
                "algorithm {algorithm:?} differs on {values:?}"
            );
        }
    }
}

#[test]
fn test_heuristics_bound_the_optimum() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..3 {
        let values = random_values(&mut rng, 8, 6);
        let optimum = difference_of(PartitioningAlgorithm::DynamicProgramming, 3, &values);
        for heuristic in [
            PartitioningAlgorithm::Greedy,
            PartitioningAlgorithm::RoundRobin,
            PartitioningAlgorithm::BidirectionalBalanced,
            PartitioningAlgorithm::KarmarkarKarp,
        ] {
            let value = difference_of(heuristic, 3, &values);
            assert!(
                value >= optimum,
                "heuristic {heuristic:?} beat the optimum on {values:?}"
            );
        }
    }
}

#[test]
fn test_sums_match_across_exact_algorithms() {
    // Not only the objective value: the optimal sum multiset itself is
    // unique on this instance and every exact algorithm must find it.
    let values = [27.0, 23.0, 19.0, 17.0, 13.0, 11.0, 7.0];
    let items = value_items(&values);
    let config = PartitionConfig {
        output: OutputShape::Sums,
        ..PartitionConfig::default()
    };
    let reference = sums_of(
        &partition(
            PartitioningAlgorithm::DynamicProgramming,
            3,
            &items,
            &config,
        )
        .unwrap(),
    );
    for algorithm in [
        PartitioningAlgorithm::CompleteGreedy,
        PartitioningAlgorithm::CompleteKarmarkarKarp,
        PartitioningAlgorithm::SequentialNumberPartitioning,
        PartitioningAlgorithm::RecursiveNumberPartitioning,
    ] {
        let sums = sums_of(&partition(algorithm, 3, &items, &config).unwrap());
        assert_eq!(sums, reference, "algorithm {algorithm:?}");
    }
}
