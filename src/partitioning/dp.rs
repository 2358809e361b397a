//! Exact partitioning by dynamic programming over sum tuples.
//!
//! A state is the vector of current bin sums, canonicalized by ascending
//! sort (which collapses the k! permutations of each reachable tuple). One
//! layer of states is produced per item. Appropriate only when the item
//! values and the bin count are small: the reachable-state count is bounded
//! by `(sum_of_values + 1)^(numbins - 1)`.

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use ordered_float::OrderedFloat;

use crate::binner::{Binner, BinnerFlavor, BinsArray, ItemId, SumsKey};
use crate::objectives::Objective;

/// Exact partitioning by state-set dynamic programming.
///
/// With a sums-only binner, only the set of reachable canonical sum tuples
/// is tracked and the best final tuple is returned. With a contents binner,
/// every state carries a back-pointer into an arena and the best final
/// state's assignment path is replayed to reconstruct the full partition.
pub fn dynamic_programming(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    objective: &Objective,
) -> BinsArray {
    info!(
        "dynamic programming {} partitioning of {} items into {} bins",
        objective,
        items.len(),
        numbins
    );
    match binner.flavor() {
        BinnerFlavor::KeepSums => optimal_sums(binner, numbins, items, objective),
        BinnerFlavor::KeepContents => optimal_partition(binner, numbins, items, objective),
    }
}

fn state_key(sums: &[f64]) -> SumsKey {
    sums.iter().copied().map(OrderedFloat).collect()
}

/// Successor of a canonical state: add `value` to the bin at `bin_index`
/// and re-sort.
fn successor(sums: &[f64], bin_index: usize, value: f64) -> Vec<f64> {
    let mut next = sums.to_vec();
    next[bin_index] += value;
    next.sort_by(f64::total_cmp);
    next
}

fn optimal_sums(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    objective: &Objective,
) -> BinsArray {
    let mut current: HashSet<SumsKey> = HashSet::new();
    current.insert(state_key(&vec![0.0; numbins]));
    let mut processed = 1usize;

    for &item in items {
        let value = binner.valueof(item);
        let mut next: HashSet<SumsKey> = HashSet::new();
        for state in &current {
            let sums: Vec<f64> = state.iter().map(|s| s.into_inner()).collect();
            for bin_index in 0..numbins {
                next.insert(state_key(&successor(&sums, bin_index, value)));
            }
        }
        processed += next.len();
        debug!("processed item {item}, {} states in the layer", next.len());
        current = next;
    }
    info!("processed {processed} states in total");

    let best = current
        .iter()
        .min_by(|a, b| {
            let value_a =
                objective.value_to_minimize(&a.iter().map(|s| s.into_inner()).collect::<Vec<_>>(), true);
            let value_b =
                objective.value_to_minimize(&b.iter().map(|s| s.into_inner()).collect::<Vec<_>>(), true);
            value_a.total_cmp(&value_b)
        })
        .expect("the state set is never empty");
    BinsArray::from_sums(best.iter().map(|s| s.into_inner()).collect())
}

/// One node in the back-pointer arena: the canonical sums after the
/// assignment, the arena index of the predecessor, and the position (in the
/// predecessor's canonical order) of the bin the item was added to.
struct StateRecord {
    sums: Vec<f64>,
    prev: Option<usize>,
    bin_index: usize,
}

fn optimal_partition(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    objective: &Objective,
) -> BinsArray {
    let mut arena: Vec<StateRecord> = vec![StateRecord {
        sums: vec![0.0; numbins],
        prev: None,
        bin_index: 0,
    }];
    let mut current: HashMap<SumsKey, usize> = HashMap::new();
    current.insert(state_key(&arena[0].sums), 0);

    for &item in items {
        let value = binner.valueof(item);
        let mut next: HashMap<SumsKey, usize> = HashMap::new();
        for &record_index in current.values() {
            for bin_index in 0..numbins {
                let sums = successor(&arena[record_index].sums, bin_index, value);
                let key = state_key(&sums);
                if !next.contains_key(&key) {
                    arena.push(StateRecord {
                        sums,
                        prev: Some(record_index),
                        bin_index,
                    });
                    next.insert(key, arena.len() - 1);
                }
            }
        }
        debug!("processed item {item}, {} state records in the layer", next.len());
        current = next;
    }

    let &best_index = current
        .values()
        .min_by(|&&a, &&b| {
            objective
                .value_to_minimize(&arena[a].sums, true)
                .total_cmp(&objective.value_to_minimize(&arena[b].sums, true))
        })
        .expect("the state set is never empty");

    // Chase the back-pointers to recover, for every item in order, the
    // canonical position of the bin it was assigned to.
    let mut path = Vec::with_capacity(items.len());
    let mut record = &arena[best_index];
    while let Some(prev) = record.prev {
        path.push(record.bin_index);
        record = &arena[prev];
    }
    path.reverse();
    debug!("path to the best state: {path:?}");

    // Replay the path. Keeping the actual bins sorted ascending after each
    // step aligns them positionally with the canonical states.
    let mut bins = binner.new_bins(numbins);
    for (&item, &bin_index) in items.iter().zip(&path) {
        binner.add_item_to_bin(&mut bins, item, bin_index);
        binner.sort_by_ascending_sum(&mut bins);
    }
    bins
}
