//! Complete Karmarkar-Karp: an anytime, exact extension of differencing.
//!
//! Where plain differencing commits to a single reverse-order merge at every
//! step, the complete variant branches over *all* distinct combinations of
//! the two popped sub-partitions and explores the resulting tree depth
//! first. Each stack frame is a whole differencing heap. Frames whose best
//! achievable difference cannot beat the best partition found so far are
//! pruned.

use std::time::Instant;

use log::debug;

use crate::binner::{Binner, BinsArray, ItemId};
use crate::partitioning::karmarkar_karp::{initial_heap, karmarkar_karp, MaxDiffHeap};

/// The smallest difference any completion of this heap can reach:
/// `max_sum - (total_sum - max_sum) / (numbins - 1)` over all sums of all
/// sub-partitions flattened together.
fn possible_difference_lower_bound(heap: &MaxDiffHeap, numbins: usize) -> f64 {
    let mut max = f64::NEG_INFINITY;
    let mut total = 0.0;
    for bins in heap.iter() {
        for &sum in bins.sums() {
            total += sum;
            max = max.max(sum);
        }
    }
    max - (total - max) / (numbins as f64 - 1.0)
}

/// Depth-first complete Karmarkar-Karp search.
///
/// Reports every partition that strictly improves on `initial_bound`
/// through `on_improvement`; the callback returns `false` to stop the
/// search. Returns the best partition found that beats the bound, or `None`
/// when no frame did.
///
/// The search is anytime: when the optional time limit expires, the best
/// partition so far is the result. A difference at most `epsilon` is
/// treated as perfect and ends the search.
pub fn complete_karmarkar_karp_anytime(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    initial_bound: f64,
    time_limit: Option<f64>,
    epsilon: f64,
    on_improvement: &mut dyn FnMut(&BinsArray, f64) -> bool,
) -> Option<BinsArray> {
    debug!(
        "Complete Karmarkar-Karp partitioning of {} items into {} bins",
        items.len(),
        numbins
    );
    if items.is_empty() {
        return None;
    }
    let start = Instant::now();
    let mut best_difference = initial_bound;
    let mut best_partition: Option<BinsArray> = None;

    let mut stack: Vec<MaxDiffHeap> = vec![initial_heap(binner, numbins, items)];
    while let Some(mut heap) = stack.pop() {
        if let Some(limit) = time_limit {
            if start.elapsed().as_secs_f64() > limit {
                debug!("time limit of {limit}s reached, returning best so far");
                break;
            }
        }

        if possible_difference_lower_bound(&heap, numbins) >= best_difference {
            continue;
        }

        if heap.len() == 1 {
            // A complete partition. The frame-level bound is optimistic, so
            // the actual difference still has to be checked.
            let diff = heap.top_diff();
            if diff < best_difference {
                let partition = heap.pop().expect("heap has one entry");
                debug!("improved partition with difference {diff}");
                best_difference = diff;
                let keep_going = on_improvement(&partition, diff);
                best_partition = Some(partition);
                if diff <= epsilon || !keep_going {
                    break;
                }
            }
            continue;
        }

        let first = heap.pop().expect("heap has at least two entries");
        let second = heap.pop().expect("heap has at least two entries");

        let mut extension: Vec<MaxDiffHeap> = Vec::new();
        for merged in binner.all_combinations(&first, &second) {
            let mut branch = heap.clone();
            branch.push(binner, merged);
            extension.push(branch);
        }
        // Push the most promising branch (smallest top difference) last, so
        // the depth-first pop explores it first.
        extension.sort_by(|a, b| b.top_diff().total_cmp(&a.top_diff()));
        stack.extend(extension);
    }
    best_partition
}

/// Depth-first complete Karmarkar-Karp enumeration with a fixed bound.
///
/// Reports through `on_partition` every complete partition whose difference
/// is strictly below `bound`, in the order the search reaches them; the
/// bound is not tightened along the way. The callback returns `false` to
/// stop. Recursive number partitioning uses this to walk all sufficiently
/// balanced two-way splits.
pub fn complete_karmarkar_karp_bounded(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    bound: f64,
    on_partition: &mut dyn FnMut(&BinsArray, f64) -> bool,
) {
    if items.is_empty() {
        return;
    }
    let mut stack: Vec<MaxDiffHeap> = vec![initial_heap(binner, numbins, items)];
    while let Some(mut heap) = stack.pop() {
        if possible_difference_lower_bound(&heap, numbins) >= bound {
            continue;
        }
        if heap.len() == 1 {
            let diff = heap.top_diff();
            if diff < bound {
                let partition = heap.pop().expect("heap has one entry");
                if !on_partition(&partition, diff) {
                    return;
                }
            }
            continue;
        }
        let first = heap.pop().expect("heap has at least two entries");
        let second = heap.pop().expect("heap has at least two entries");
        let mut extension: Vec<MaxDiffHeap> = Vec::new();
        for merged in binner.all_combinations(&first, &second) {
            let mut branch = heap.clone();
            branch.push(binner, merged);
            extension.push(branch);
        }
        extension.sort_by(|a, b| b.top_diff().total_cmp(&a.top_diff()));
        stack.extend(extension);
    }
}

/// The best partition found by a full complete-Karmarkar-Karp search,
/// falling back to the plain differencing result when the search is cut
/// short before finding any complete partition.
pub fn best_ckk_partition(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    time_limit: Option<f64>,
    epsilon: f64,
) -> BinsArray {
    complete_karmarkar_karp_anytime(
        binner,
        numbins,
        items,
        f64::INFINITY,
        time_limit,
        epsilon,
        &mut |_, _| true,
    )
    .unwrap_or_else(|| karmarkar_karp(binner, numbins, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binner::BinnerFlavor;

    fn binner_for(values: &[f64], flavor: BinnerFlavor) -> Binner {
        Binner::new(0, values.to_vec(), flavor)
    }

    fn ids(n: usize) -> Vec<ItemId> {
        (0..n).collect()
    }

    #[test]
    fn test_finds_perfect_two_way_split() {
        let values = [4.0, 5.0, 6.0, 7.0, 8.0];
        let binner = binner_for(&values, BinnerFlavor::KeepContents);
        let bins = best_ckk_partition(&binner, 2, &ids(5), None, 0.0);
        assert_eq!(bins.sums(), &[15.0, 15.0]);
    }

    #[test]
    fn test_four_way_optimal() {
        let values = [1.0, 2.0, 3.0, 3.0, 5.0, 9.0, 9.0];
        let binner = binner_for(&values, BinnerFlavor::KeepSums);
        let bins = best_ckk_partition(&binner, 4, &ids(7), None, 0.0);
        assert_eq!(bins.sums(), &[7.0, 7.0, 9.0, 9.0]);
    }

    #[test]
    fn test_contents_four_way() {
        let values = [1.0, 3.0, 3.0, 4.0, 4.0, 5.0, 5.0, 5.0];
        let binner = binner_for(&values, BinnerFlavor::KeepContents);
        let bins = best_ckk_partition(&binner, 4, &ids(8), None, 0.0);
        assert_eq!(bins.sums(), &[6.0, 8.0, 8.0, 8.0]);
        // Coverage: every item appears exactly once.
        let mut seen: Vec<ItemId> = bins.contents().unwrap().concat();
        seen.sort_unstable();
        assert_eq!(seen, ids(8));
    }

    #[test]
    fn test_improvements_are_strictly_decreasing() {
        let values = [18.0, 17.0, 12.0, 11.0, 8.0, 2.0];
        let binner = binner_for(&values, BinnerFlavor::KeepSums);
        let mut reported: Vec<f64> = Vec::new();
        complete_karmarkar_karp_anytime(
            &binner,
            2,
            &ids(6),
            f64::INFINITY,
            None,
            0.0,
            &mut |_, diff| {
                reported.push(diff);
                true
            },
        );
        assert!(!reported.is_empty());
        for window in reported.windows(2) {
            assert!(window[1] < window[0]);
        }
    }

    #[test]
    fn test_bound_excludes_equal_partitions() {
        // With a bound equal to the optimum, nothing is reported.
        let values = [4.0, 5.0, 6.0, 7.0, 8.0];
        let binner = binner_for(&values, BinnerFlavor::KeepSums);
        let best = complete_karmarkar_karp_anytime(
            &binner,
            2,
            &ids(5),
            0.0,
            None,
            0.0,
            &mut |_, _| true,
        );
        assert!(best.is_none());
    }
}
