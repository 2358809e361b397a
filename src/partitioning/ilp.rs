//! Exact partitioning through a mixed-integer program.
//!
//! One integer variable per (item, bin) pair counts how many copies of the
//! item land in the bin. The bin sums, scaled by optional per-bin
//! entitlements, are constrained to ascending order as a symmetry break,
//! which makes the min/max-style objectives linear. Solved with the HiGHS
//! backend via good_lp. Used primarily as a correctness oracle for the
//! search algorithms.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use good_lp::{
    constraint, default_solver, variable, Constraint, Expression, ProblemVariables, Solution,
    SolverModel, Variable,
};
use log::{debug, info};
use serde::Serialize;

use crate::binner::{Binner, BinsArray, ItemId};
use crate::error::{PartitionError, Result};
use crate::objectives::Objective;

/// Extra linear constraints over the ascending bin-sum expressions.
pub type ConstraintBuilder<'a> = &'a dyn Fn(&[Expression]) -> Vec<Constraint>;

/// Configuration for the integer-programming solver.
#[derive(Debug, Clone, Default)]
pub struct IlpConfig {
    /// Wall-clock budget in seconds. Carried for parity with the search
    /// algorithms; the portable good_lp interface does not expose it to
    /// the HiGHS backend.
    pub time_limit: Option<f64>,
    /// Per-bin divisors applied to the sums before the objective.
    pub entitlements: Option<Vec<f64>>,
    /// Per-bin target shares of the total, for the distance-from-average
    /// objective. Defaults to equal shares.
    pub relative_values: Option<Vec<f64>>,
    /// Write the model in LP format to this path, for debugging.
    pub model_path: Option<PathBuf>,
    /// Write the solution as JSON to this path, for debugging.
    pub solution_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct SolutionDump {
    objective_value: f64,
    sums: Vec<f64>,
    /// How many copies of each item each bin received; `counts[i][j]` is
    /// item i in bin j.
    counts: Vec<Vec<usize>>,
}

/// Produce a partition minimizing the objective by solving a MILP.
///
/// `items` are the distinct items; multiplicities come from the binner's
/// copies. Non-optimal solver status is surfaced as
/// [`PartitionError::SolverFailure`].
pub fn integer_programming(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    objective: &Objective,
    config: &IlpConfig,
    additional_constraints: Option<ConstraintBuilder<'_>>,
) -> Result<BinsArray> {
    info!(
        "integer programming {} partitioning of {} items into {} bins",
        objective,
        items.len(),
        numbins
    );
    if let Some(entitlements) = &config.entitlements {
        if entitlements.len() != numbins {
            return Err(PartitionError::InvalidParameter {
                name: "entitlements",
                reason: format!(
                    "expected one entitlement per bin ({numbins}), got {}",
                    entitlements.len()
                ),
            });
        }
    }
    match objective {
        Objective::MinimizeDistAvg => minimize_dist_avg(binner, numbins, items, config),
        Objective::MaximizeSmallestWeightedSum(_) | Objective::Custom(_) => {
            Err(PartitionError::UnsupportedObjective {
                objective: objective.to_string(),
                algorithm: "integer programming",
            })
        }
        _ => minimize_ordered_objective(binner, numbins, items, objective, config, additional_constraints),
    }
}

/// Integer count variables `x[i][j]`, one per (item, bin) pair.
fn count_variables(
    vars: &mut ProblemVariables,
    numitems: usize,
    numbins: usize,
) -> Vec<Vec<Variable>> {
    (0..numitems)
        .map(|_| {
            (0..numbins)
                .map(|_| vars.add(variable().integer().min(0)))
                .collect()
        })
        .collect()
}

/// The (entitlement-scaled) sum expression of each bin.
fn bin_sum_expressions(
    binner: &Binner,
    items: &[ItemId],
    counts: &[Vec<Variable>],
    numbins: usize,
    entitlements: Option<&Vec<f64>>,
) -> Vec<Expression> {
    (0..numbins)
        .map(|bin| {
            let divisor = entitlements.map_or(1.0, |weights| weights[bin]);
            items
                .iter()
                .enumerate()
                .map(|(index, &item)| (binner.valueof(item) / divisor) * counts[index][bin])
                .sum()
        })
        .collect()
}

fn minimize_ordered_objective(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    objective: &Objective,
    config: &IlpConfig,
    additional_constraints: Option<ConstraintBuilder<'_>>,
) -> Result<BinsArray> {
    let mut vars = ProblemVariables::new();
    let counts = count_variables(&mut vars, items.len(), numbins);
    let sums = bin_sum_expressions(binner, items, &counts, numbins, config.entitlements.as_ref());

    // With the ascending symmetry break in place, every supported
    // objective is a linear function of the endpoint sums.
    let (objective_expression, maximise) = match objective {
        Objective::MinimizeLargestSum => (sums[numbins - 1].clone(), false),
        Objective::MaximizeSmallestSum => (sums[0].clone(), true),
        Objective::MinimizeDifference => (sums[numbins - 1].clone() - sums[0].clone(), false),
        Objective::MinimizeKLargestSums(p) => {
            let start = numbins.saturating_sub(*p);
            (sums[start..].iter().cloned().sum(), false)
        }
        Objective::MaximizeKSmallestSums(p) => {
            (sums[..(*p).min(numbins)].iter().cloned().sum(), true)
        }
        _ => unreachable!("routed by integer_programming"),
    };

    if let Some(path) = &config.model_path {
        write_lp_model(binner, numbins, items, objective, config, path)?;
    }

    let mut problem = if maximise {
        vars.maximise(objective_expression).using(default_solver)
    } else {
        vars.minimise(objective_expression).using(default_solver)
    };

    // Every copy of every item lands in exactly one bin.
    for (index, &item) in items.iter().enumerate() {
        let placed: Expression = counts[index].iter().copied().sum();
        problem = problem.with(constraint!(placed == binner.copiesof(item) as f64));
    }
    // Symmetry break: scaled sums in ascending order.
    for bin in 0..numbins - 1 {
        let ordered = sums[bin + 1].clone() - sums[bin].clone();
        problem = problem.with(constraint!(ordered >= 0.0));
    }
    if let Some(builder) = additional_constraints {
        for extra in builder(&sums) {
            problem = problem.with(extra);
        }
    }

    let solution = problem
        .solve()
        .map_err(|error| PartitionError::SolverFailure {
            status: error.to_string(),
        })?;

    build_output(binner, numbins, items, &counts, &solution, config, true)
}

/// Minimize half the total absolute deviation of the bin sums from their
/// targets, with auxiliary variables `t[j] >= |sum[j] - target[j]|`.
fn minimize_dist_avg(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    config: &IlpConfig,
) -> Result<BinsArray> {
    let total: f64 = items
        .iter()
        .map(|&item| binner.valueof(item) * binner.copiesof(item) as f64)
        .sum();
    let targets: Vec<f64> = match &config.relative_values {
        Some(shares) => {
            if shares.len() != numbins {
                return Err(PartitionError::InvalidParameter {
                    name: "relative_values",
                    reason: format!(
                        "expected one share per bin ({numbins}), got {}",
                        shares.len()
                    ),
                });
            }
            shares.iter().map(|share| total * share).collect()
        }
        None => vec![total / numbins as f64; numbins],
    };

    let mut vars = ProblemVariables::new();
    let counts = count_variables(&mut vars, items.len(), numbins);
    let sums = bin_sum_expressions(binner, items, &counts, numbins, None);
    let deviations: Vec<Variable> = (0..numbins)
        .map(|_| vars.add(variable().min(0)))
        .collect();

    let objective_expression: Expression =
        deviations.iter().map(|&deviation| 0.5 * deviation).sum();
    let mut problem = vars.minimise(objective_expression).using(default_solver);

    for (index, &item) in items.iter().enumerate() {
        let placed: Expression = counts[index].iter().copied().sum();
        problem = problem.with(constraint!(placed == binner.copiesof(item) as f64));
    }
    for bin in 0..numbins {
        // t[j] >= sum[j] - target[j]  and  t[j] >= target[j] - sum[j].
        let above = Expression::from(deviations[bin]) - sums[bin].clone();
        problem = problem.with(constraint!(above >= -targets[bin]));
        let below = Expression::from(deviations[bin]) + sums[bin].clone();
        problem = problem.with(constraint!(below >= targets[bin]));
    }

    let solution = problem
        .solve()
        .map_err(|error| PartitionError::SolverFailure {
            status: error.to_string(),
        })?;

    // With explicit targets the bin order is meaningful; only the default
    // equal-share form is reported in ascending order.
    let sort = config.relative_values.is_none();
    build_output(binner, numbins, items, &counts, &solution, config, sort)
}

fn build_output(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    counts: &[Vec<Variable>],
    solution: &impl Solution,
    config: &IlpConfig,
    sort: bool,
) -> Result<BinsArray> {
    let mut output = binner.new_bins(numbins);
    let mut count_values: Vec<Vec<usize>> = vec![vec![0; numbins]; items.len()];
    for (index, &item) in items.iter().enumerate() {
        for bin in 0..numbins {
            let count = solution.value(counts[index][bin]).round() as usize;
            count_values[index][bin] = count;
            for _ in 0..count {
                binner.add_item_to_bin(&mut output, item, bin);
            }
        }
    }
    if sort {
        binner.sort_by_ascending_sum(&mut output);
    }

    if let Some(path) = &config.solution_path {
        let dump = SolutionDump {
            objective_value: output.sums_difference(),
            sums: output.sums().to_vec(),
            counts: count_values,
        };
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &dump).map_err(std::io::Error::from)?;
        debug!("solution written to {}", path.display());
    }
    Ok(output)
}

/// Write the formulation in LP format. The variable naming follows the
/// solver model: `x_i_j` counts copies of item i in bin j.
fn write_lp_model(
    binner: &Binner,
    numbins: usize,
    items: &[ItemId],
    objective: &Objective,
    config: &IlpConfig,
    path: &PathBuf,
) -> Result<()> {
    let mut file = File::create(path)?;
    let scaled = |item: ItemId, bin: usize| {
        let divisor = config
            .entitlements
            .as_ref()
            .map_or(1.0, |weights| weights[bin]);
        binner.valueof(item) / divisor
    };
    let sum_terms = |bin: usize, sign: f64| -> String {
        items
            .iter()
            .enumerate()
            .map(|(index, &item)| format!("{:+} x_{index}_{bin}", sign * scaled(item, bin)))
            .collect::<Vec<_>>()
            .join(" ")
    };

    writeln!(file, "\\ {objective} over {numbins} bins")?;
    writeln!(file, "Minimize")?;
    let objective_line = match objective {
        Objective::MinimizeLargestSum => sum_terms(numbins - 1, 1.0),
        Objective::MaximizeSmallestSum => sum_terms(0, -1.0),
        Objective::MinimizeDifference => {
            format!("{} {}", sum_terms(numbins - 1, 1.0), sum_terms(0, -1.0))
        }
        Objective::MinimizeKLargestSums(p) => (numbins.saturating_sub(*p)..numbins)
            .map(|bin| sum_terms(bin, 1.0))
            .collect::<Vec<_>>()
            .join(" "),
        Objective::MaximizeKSmallestSums(p) => (0..(*p).min(numbins))
            .map(|bin| sum_terms(bin, -1.0))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    };
    writeln!(file, " obj: {objective_line}")?;
    writeln!(file, "Subject To")?;
    for (index, &item) in items.iter().enumerate() {
        let placed = (0..numbins)
            .map(|bin| format!("+1 x_{index}_{bin}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(file, " copies_{index}: {placed} = {}", binner.copiesof(item))?;
    }
    for bin in 0..numbins - 1 {
        writeln!(
            file,
            " order_{bin}: {} {} >= 0",
            sum_terms(bin + 1, 1.0),
            sum_terms(bin, -1.0)
        )?;
    }
    writeln!(file, "General")?;
    for index in 0..items.len() {
        for bin in 0..numbins {
            writeln!(file, " x_{index}_{bin}")?;
        }
    }
    writeln!(file, "End")?;
    debug!("model written to {}", path.display());
    Ok(())
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

    const WALTER_NUMBERS: [f64; 7] = [46.0, 39.0, 27.0, 26.0, 16.0, 13.0, 10.0];

    #[test]
    fn test_maximize_smallest_sum() {
        let values = [11.1, 11.0, 11.0, 11.0, 22.0];
        let binner = binner_for(&values, BinnerFlavor::KeepSums);
        let bins = integer_programming(
            &binner,
            2,
            &ids(5),
            &Objective::MaximizeSmallestSum,
            &IlpConfig::default(),
            None,
        )
        .unwrap();
        assert!((bins.sums()[0] - 33.0).abs() < 1e-9);
        assert!((bins.sums()[1] - 33.1).abs() < 1e-9);
    }

    #[test]
    fn test_walter_minimize_difference() {
        let binner = binner_for(&WALTER_NUMBERS, BinnerFlavor::KeepContents);
        let bins = integer_programming(
            &binner,
            3,
            &ids(7),
            &Objective::MinimizeDifference,
            &IlpConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(bins.sums(), &[55.0, 59.0, 63.0]);
    }

    #[test]
    fn test_entitlements() {
        let values = [11.1, 11.0, 11.0, 11.0, 22.0];
        let binner = binner_for(&values, BinnerFlavor::KeepSums);
        let config = IlpConfig {
            entitlements: Some(vec![1.0, 2.0]),
            ..IlpConfig::default()
        };
        let bins = integer_programming(
            &binner,
            2,
            &ids(5),
            &Objective::MaximizeSmallestSum,
            &config,
            None,
        )
        .unwrap();
        assert!((bins.sums()[0] - 22.0).abs() < 1e-9);
        assert!((bins.sums()[1] - 44.1).abs() < 1e-9);
    }

    #[test]
    fn test_additional_constraints() {
        let binner = binner_for(&WALTER_NUMBERS, BinnerFlavor::KeepSums);
        let empty_first_bin = |sums: &[Expression]| {
            let first = sums[0].clone();
            vec![constraint!(first == 0.0)]
        };
        let bins = integer_programming(
            &binner,
            3,
            &ids(7),
            &Objective::MinimizeLargestSum,
            &IlpConfig::default(),
            Some(&empty_first_bin),
        )
        .unwrap();
        assert_eq!(bins.sums()[0], 0.0);
        assert_eq!(bins.sums()[1] + bins.sums()[2], 177.0);
        assert_eq!(bins.sums()[2], 89.0);
    }

    #[test]
    fn test_copies() {
        let binner = Binner::with_copies(
            0,
            vec![1.0, 2.0, 3.0],
            vec![2, 1, 4],
            BinnerFlavor::KeepContents,
        );
        let bins = integer_programming(
            &binner,
            3,
            &ids(3),
            &Objective::MinimizeDifference,
            &IlpConfig::default(),
            None,
        )
        .unwrap();
        // 2*1 + 1*2 + 4*3 = 16 over three bins: optimum is {5, 5, 6}.
        assert_eq!(bins.sums(), &[5.0, 5.0, 6.0]);
        let total_items: usize = bins.contents().unwrap().iter().map(Vec::len).sum();
        assert_eq!(total_items, 7);
    }

    #[test]
    fn test_dist_avg() {
        let values = [11.0, 11.0, 11.0, 11.0, 22.0];
        let binner = binner_for(&values, BinnerFlavor::KeepSums);
        let bins = integer_programming(
            &binner,
            2,
            &ids(5),
            &Objective::MinimizeDistAvg,
            &IlpConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(bins.sums(), &[33.0, 33.0]);
    }

    #[test]
    fn test_dist_avg_uneven() {
        let values = [2.0, 2.0, 5.0, 5.0, 5.0, 5.0, 9.0];
        let binner = binner_for(&values, BinnerFlavor::KeepSums);
        let bins = integer_programming(
            &binner,
            5,
            &ids(7),
            &Objective::MinimizeDistAvg,
            &IlpConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(bins.sums(), &[5.0, 5.0, 7.0, 7.0, 9.0]);
    }

    #[test]
    fn test_unsupported_objective() {
        let binner = binner_for(&[1.0], BinnerFlavor::KeepSums);
        let result = integer_programming(
            &binner,
            2,
            &[0],
            &Objective::MaximizeSmallestWeightedSum(vec![1.0, 2.0]),
            &IlpConfig::default(),
            None,
        );
        assert!(matches!(
            result,
            Err(PartitionError::UnsupportedObjective { .. })
        ));
    }

    #[test]
    fn test_debug_dumps() {
        let directory = tempfile::tempdir().unwrap();
        let model_path = directory.path().join("model.lp");
        let solution_path = directory.path().join("solution.json");
        let binner = binner_for(&[4.0, 5.0, 6.0, 7.0, 8.0], BinnerFlavor::KeepSums);
        let config = IlpConfig {
            model_path: Some(model_path.clone()),
            solution_path: Some(solution_path.clone()),
            ..IlpConfig::default()
        };
        let bins = integer_programming(
            &binner,
            2,
            &ids(5),
            &Objective::MinimizeDifference,
            &config,
            None,
        )
        .unwrap();
        assert_eq!(bins.sums(), &[15.0, 15.0]);

        let model = std::fs::read_to_string(model_path).unwrap();
        assert!(model.starts_with("\\ minimize-difference"));
        assert!(model.contains("Subject To"));
        let solution: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(solution_path).unwrap()).unwrap();
        assert_eq!(solution["sums"], serde_json::json!([15.0, 15.0]));
    }
}
