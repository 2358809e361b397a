//! Improved bin completion (Schreiber and Korf, 2013).
//!
//! Branches over completions of one bin at a time like plain bin
//! completion, but generates candidate completions through a chunked
//! power-set enumerator: subsets are drawn in chunks, deduplicated within
//! the chunk and ordered largest-sum-first before being handed to the
//! search. Larger chunks deduplicate and order more thoroughly at the cost
//! of latency. An optional limited-discrepancy ordering explores branches
//! that deviate from the heuristic ordering later.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::iter::Peekable;

use itertools::Itertools;
use log::{debug, info};

use crate::binner::{Binner, BinsArray, ItemId};
use crate::packing::best_fit::best_fit_decreasing;
use crate::packing::bin_completion::{l1_lower_bound, l2_lower_bound};

/// Knobs of the improved bin completion search.
#[derive(Debug, Clone)]
pub struct ImprovedBinCompletionConfig {
    /// How many power-set entries are drawn, deduplicated and sorted per
    /// chunk. Larger chunks dedupe more thoroughly but take longer.
    pub chunk_size: usize,
    /// Order branches by limited discrepancy instead of plain depth first.
    pub limited_discrepancy: bool,
}

impl Default for ImprovedBinCompletionConfig {
    fn default() -> Self {
        ImprovedBinCompletionConfig {
            chunk_size: 50,
            limited_discrepancy: false,
        }
    }
}

/// Largest sum first, then fewer elements, then larger smallest elements.
fn completion_order(a: &[f64], b: &[f64]) -> Ordering {
    let sum_a: f64 = a.iter().sum();
    let sum_b: f64 = b.iter().sum();
    sum_b
        .total_cmp(&sum_a)
        .then_with(|| a.len().cmp(&b.len()))
        .then_with(|| {
            for (x, y) in a.iter().rev().zip(b.iter().rev()) {
                match y.total_cmp(x) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        })
}

/// Chunked lazy generator of candidate completions: every completion holds
/// the largest remaining value plus a feasible subset of the rest. Subsets
/// are drawn `chunk_size` at a time from the power set, deduplicated within
/// the chunk and sorted largest-sum-first before being yielded.
struct CompletionGenerator {
    binsize: f64,
    biggest: f64,
    chunk_size: usize,
    power_set: itertools::structs::Powerset<std::vec::IntoIter<f64>>,
    exhausted: bool,
    chunk: std::vec::IntoIter<Vec<f64>>,
}

impl CompletionGenerator {
    fn new(binsize: f64, values: &[f64], chunk_size: usize) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| b.total_cmp(a));
        let (biggest, exhausted) = if sorted.is_empty() {
            (0.0, true)
        } else {
            (sorted.remove(0), false)
        };
        CompletionGenerator {
            binsize,
            biggest,
            chunk_size: chunk_size.max(1),
            power_set: sorted.into_iter().powerset(),
            exhausted,
            chunk: Vec::new().into_iter(),
        }
    }

    fn refill_chunk(&mut self) {
        let mut chunk: Vec<Vec<f64>> = Vec::new();
        let mut seen: HashSet<Vec<ordered_float::OrderedFloat<f64>>> = HashSet::new();
        for _ in 0..self.chunk_size {
            match self.power_set.next() {
                None => {
                    self.exhausted = true;
                    break;
                }
                Some(subset) => {
                    let mut completion = vec![self.biggest];
                    completion.extend(subset);
                    if completion.iter().sum::<f64>() <= self.binsize
                        && seen.insert(
                            completion
                                .iter()
                                .copied()
                                .map(ordered_float::OrderedFloat)
                                .collect(),
                        )
                    {
                        chunk.push(completion);
                    }
                }
            }
        }
        chunk.sort_by(|a, b| completion_order(a, b));
        self.chunk = chunk.into_iter();
    }

    fn into_iter(self) -> impl Iterator<Item = Vec<f64>> {
        let mut generator = self;
        std::iter::from_fn(move || loop {
            if let Some(entry) = generator.chunk.next() {
                return Some(entry);
            }
            if generator.exhausted {
                return None;
            }
            generator.refill_chunk();
        })
    }
}

/// One open branch: a partial packing, the items still to place, and the
/// lazy stream of completions for the next bin.
struct Branch {
    items: Vec<ItemId>,
    bins: BinsArray,
    bin_index: usize,
    last_completion_sum: f64,
    completions: Peekable<Box<dyn Iterator<Item = Vec<f64>>>>,
    priority: usize,
}

fn open_branch(
    binner: &Binner,
    binsize: f64,
    items: Vec<ItemId>,
    bins: BinsArray,
    bin_index: usize,
    chunk_size: usize,
    priority: usize,
) -> Branch {
    let values: Vec<f64> = items.iter().map(|&item| binner.valueof(item)).collect();
    let generator: Box<dyn Iterator<Item = Vec<f64>>> =
        Box::new(CompletionGenerator::new(binsize, &values, chunk_size).into_iter());
    Branch {
        items,
        bins,
        bin_index,
        last_completion_sum: binsize,
        completions: generator.peekable(),
        priority,
    }
}

/// Optimal bin packing by improved bin completion.
pub fn improved_bin_completion(
    binner: &Binner,
    binsize: f64,
    items: &[ItemId],
    config: &ImprovedBinCompletionConfig,
) -> BinsArray {
    let (zeros, positive): (Vec<ItemId>, Vec<ItemId>) = items
        .iter()
        .copied()
        .partition(|&item| binner.valueof(item) == 0.0);

    let bfd = best_fit_decreasing(binner, binsize, &positive);
    let lower_bound = l1_lower_bound(binner, binsize, &positive)
        .max(l2_lower_bound(binner, binsize, &positive));
    info!(
        "improved bin completion: best-fit-decreasing uses {} bins, lower bound {}",
        bfd.numbins(),
        lower_bound
    );

    let mut best = bfd;
    if best.numbins() > lower_bound && !positive.is_empty() {
        let sorted = crate::partitioning::greedy::sorted_descending(binner, &positive);
        let root = open_branch(
            binner,
            binsize,
            sorted,
            binner.new_bins(0),
            0,
            config.chunk_size,
            1,
        );
        let mut open: Vec<Branch> = vec![root];
        while let Some(mut branch) = pop_next(&mut open, config.limited_discrepancy) {
            if branch.completions.peek().is_some() {
                let completion = branch.completions.next().expect("peeked");
                let completion_sum: f64 = completion.iter().sum();

                let mut priority = branch.priority;
                if config.limited_discrepancy {
                    // Taking a smaller completion than last time is a
                    // discrepancy from the heuristic ordering.
                    if branch.last_completion_sum > completion_sum {
                        priority += 1;
                    }
                    branch.last_completion_sum = completion_sum;
                }

                let mut child_bins = binner.add_empty_bins(&branch.bins, 1);
                let bin_index = branch.bin_index;
                let mut child_items = branch.items.clone();
                for value in &completion {
                    let position = child_items
                        .iter()
                        .position(|&item| binner.valueof(item) == *value)
                        .expect("completion values come from the remaining items");
                    binner.add_item_to_bin(&mut child_bins, child_items[position], bin_index);
                    child_items.remove(position);
                }
                open.push(branch);

                // Children that already use as many bins as the best known
                // packing cannot improve on it.
                if child_bins.numbins() + usize::from(!child_items.is_empty()) < best.numbins() {
                    let child = open_branch(
                        binner,
                        binsize,
                        child_items,
                        child_bins,
                        bin_index + 1,
                        config.chunk_size,
                        priority,
                    );
                    open.push(child);
                }
                continue;
            }

            if branch.items.is_empty() && branch.bins.numbins() < best.numbins() {
                debug!("improved packing to {} bins", branch.bins.numbins());
                best = branch.bins;
                if best.numbins() == lower_bound {
                    break;
                }
            }
        }
    }

    let mut packed = best;
    if !zeros.is_empty() {
        if packed.numbins() == 0 {
            packed = binner.add_empty_bins(&packed, 1);
        }
        for &item in &zeros {
            binner.add_item_to_bin(&mut packed, item, 0);
        }
    }
    packed
}

/// Depth-first pop, or lowest-discrepancy pop in limited-discrepancy mode.
fn pop_next(open: &mut Vec<Branch>, limited_discrepancy: bool) -> Option<Branch> {
    if open.is_empty() {
        return None;
    }
    if limited_discrepancy {
        let mut chosen = 0;
        for index in 1..open.len() {
            if open[index].priority <= open[chosen].priority {
                chosen = index;
            }
        }
        Some(open.remove(chosen))
    } else {
        open.pop()
    }
}
