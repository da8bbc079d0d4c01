#![deny(clippy::all, clippy::cargo, clippy::expect_used, clippy::unwrap_used)]
#![deny(clippy::pedantic, clippy::nursery, unsafe_code)]
#![warn(clippy::unimplemented, clippy::redundant_type_annotations)]

use anyhow::Result;
use std::io::BufRead;

pub mod algo;
pub mod core;
pub mod data;
pub mod model;
pub mod solver;

use crate::core::{Error, Instance, Problem, Report, Schedule};
use crate::solver::{SolveOptions, Solver};

/// Validates the instance, builds its model, solves it and extracts the schedule.
///
/// # Errors
/// - If the instance is malformed. The solver is never called then.
/// - If the solver finds no optimal assignment (infeasible, unbounded, timeout).
/// - If the extracted schedule breaks an invariant.
pub fn solve(
    instance: &Instance,
    solver: &mut dyn Solver,
    options: &SolveOptions,
) -> Result<Schedule, Error> {
    let problem = instance.validate()?;
    solve_problem(&problem, solver, options)
}

/// Builds the model of a validated problem, solves it once and extracts the schedule.
/// The backend has released its resources by the time extraction starts.
///
/// # Errors
/// - If the solver finds no optimal assignment.
/// - If the extracted schedule breaks an invariant.
pub fn solve_problem(
    problem: &Problem,
    solver: &mut dyn Solver,
    options: &SolveOptions,
) -> Result<Schedule, Error> {
    let formulation = algo::formulate(problem);

    let time = std::time::Instant::now();
    let result = solver.solve(&formulation.model, options);
    let elapsed = time.elapsed().as_secs_f64();

    let assignment = match result {
        Ok(assignment) => assignment,
        Err(err) => {
            tracing::info!(solver = solver.name(), elapsed, %err, "no schedule");
            return Err(err.into());
        }
    };
    tracing::info!(
        solver = solver.name(),
        elapsed,
        objective = assignment.evaluate(formulation.model.objective()),
        "solved"
    );

    algo::extract(&formulation, &assignment, options.epsilon)
}

/// Turns the outcome of a solve into the printable report.
/// An inconsistent solution is reported with its list of failed checks.
///
/// # Errors
/// - If the instance was invalid, since no solve took place.
pub fn report(result: Result<Schedule, Error>) -> Result<Report, Error> {
    let err = match result {
        Ok(schedule) => return Ok(schedule.into()),
        Err(err) => err,
    };
    let Some(status) = err.status() else {
        return Err(err);
    };

    let message = Some(err.to_string());
    let issues = match err {
        Error::Inconsistent(issues) => issues,
        _ => Vec::new(),
    };
    Ok(Report {
        status,
        schedule: None,
        message,
        issues,
    })
}

/// Solves the instance read from reader and writes the JSON report to stdout.
///
/// # Errors
/// - If the instance could not be read or is invalid.
/// - If the report could not be written.
pub fn run_reader(
    solver: &mut dyn Solver,
    reader: &mut impl BufRead,
    options: &SolveOptions,
) -> Result<()> {
    let instance: Instance = data::deserialize(reader)?;
    let report = report(solve(&instance, solver, options))?;

    println!("{}", data::to_string(&report)?);

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::{
        Channel, Expedite, Inconsistency, MaterialSpec, ProductSpec, SolverError, Status,
    };
    use crate::solver::MicroLp;

    fn product(id: &str, due: f64, processing_time: f64, quantity: u64) -> ProductSpec {
        ProductSpec {
            id: id.into(),
            due,
            processing_time,
            requirements: [("R1".to_string(), quantity)].into_iter().collect(),
        }
    }

    fn material(inventory: f64, lead_time: f64) -> MaterialSpec {
        MaterialSpec {
            id: "R1".into(),
            inventory,
            lead_time,
            expedite: None,
        }
    }

    fn gated(inventory: f64) -> Instance {
        Instance::new(
            vec![product("P1", 3.0, 0.0, 10), product("P2", 1.0, 0.0, 10)],
            vec![material(inventory, 5.0)],
        )
    }

    fn total(instance: &Instance) -> anyhow::Result<f64> {
        let schedule = solve(instance, &mut MicroLp, &SolveOptions::default())?;
        Ok(schedule.total_tardiness)
    }

    #[test]
    fn empty_pool_delays_both_products() -> anyhow::Result<()> {
        let schedule = solve(&gated(0.0), &mut MicroLp, &SolveOptions::default())?;

        assert_eq!(schedule.status, Status::Optimal);
        assert!((schedule.total_tardiness - 6.0).abs() < 1e-6);
        assert!((schedule.average_tardiness - 3.0).abs() < 1e-6);
        for (id, tardiness) in [("P1", 2.0), ("P2", 4.0)] {
            let job = schedule.job(id).ok_or_else(|| anyhow::anyhow!("missing {id}"))?;
            assert!(job.start >= 5.0 - 1e-6);
            assert!((job.tardiness - tardiness).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn inventory_serves_earliest_due_date() -> anyhow::Result<()> {
        let schedule = solve(&gated(10.0), &mut MicroLp, &SolveOptions::default())?;

        assert!((schedule.total_tardiness - 2.0).abs() < 1e-6);
        let usage = schedule
            .usage("R1", Channel::Standard)
            .ok_or_else(|| anyhow::anyhow!("missing usage"))?;
        assert!(usage.within_capacity(1e-6));
        let early = schedule.job("P2").ok_or_else(|| anyhow::anyhow!("missing P2"))?;
        assert!(early.tardiness.abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn expedite_pool_shortens_wait() -> anyhow::Result<()> {
        let mut instance = gated(0.0);
        instance.materials[0].expedite = Some(Expedite {
            lead_time: 2.0,
            capacity: 20.0,
        });

        // Channels gate independently: the empty standard pool still holds both until 5.
        assert!((total(&instance)? - 6.0).abs() < 1e-6);

        instance.materials[0].inventory = 20.0;
        assert!(total(&instance)?.abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn expedite_capacity_never_hurts() -> anyhow::Result<()> {
        let with_expedite = |inventory: f64, capacity: f64| {
            let mut instance = gated(inventory);
            instance.materials[0].expedite = Some(Expedite {
                lead_time: 2.0,
                capacity,
            });
            total(&instance)
        };

        for inventory in [0.0, 10.0, 20.0] {
            let mut previous = f64::INFINITY;
            for capacity in [0.0, 10.0, 20.0] {
                let current = with_expedite(inventory, capacity)?;
                assert!(current <= previous + 1e-6, "inventory {inventory}, capacity {capacity}");
                previous = current;
            }
        }
        Ok(())
    }

    #[test]
    fn user_big_m_keeps_optimum() -> anyhow::Result<()> {
        let derived = total(&gated(10.0))?;
        let schedule = solve(
            &gated(10.0).with_big_m(1e4),
            &mut MicroLp,
            &SolveOptions::default(),
        )?;

        assert!((schedule.total_tardiness - derived).abs() < 1e-6);
        let usage = schedule
            .usage("R1", Channel::Standard)
            .ok_or_else(|| anyhow::anyhow!("missing usage"))?;
        assert!(usage.used <= usage.capacity + 1e-6);
        Ok(())
    }

    #[test]
    fn tardiness_is_positive_part_of_lateness() -> anyhow::Result<()> {
        let instance = Instance::new(
            vec![product("P1", 1.0, 2.0, 0), product("P2", 9.0, 3.0, 5)],
            vec![material(0.0, 4.0)],
        );
        let schedule = solve(&instance, &mut MicroLp, &SolveOptions::default())?;

        for job in &schedule.jobs {
            let expected = (job.end - job.due).max(0.0);
            assert!((job.tardiness - expected).abs() < 1e-6);
        }
        assert!((schedule.total_tardiness - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn relaxing_inputs_never_hurts() -> anyhow::Result<()> {
        let base = total(&gated(0.0))?;

        let mut later = gated(0.0);
        later.products[1].due = 4.0;
        assert!(total(&later)? <= base + 1e-6);

        let stocked = total(&gated(10.0))?;
        assert!(stocked <= base + 1e-6);
        assert!(total(&gated(20.0))? <= stocked + 1e-6);
        Ok(())
    }

    #[test]
    fn resolving_is_idempotent() -> anyhow::Result<()> {
        let instance = gated(10.0);
        assert!((total(&instance)? - total(&instance)?).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn single_line_orders_jobs() -> anyhow::Result<()> {
        let instance = Instance::new(
            vec![product("P1", 1.0, 3.0, 0), product("P2", 4.0, 1.0, 0)],
            vec![material(0.0, 0.0)],
        )
        .with_lines(1);

        let schedule = solve(&instance, &mut MicroLp, &SolveOptions::default())?;

        assert!((schedule.total_tardiness - 2.0).abs() < 1e-6);
        let lines = schedule.lines.ok_or_else(|| anyhow::anyhow!("missing lines"))?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].jobs, vec!["P1".to_string(), "P2".to_string()]);
        Ok(())
    }

    #[test]
    fn parallel_lines_cover_every_job_once() -> anyhow::Result<()> {
        let instance = Instance::new(
            vec![
                product("P1", 2.0, 2.0, 0),
                product("P2", 2.0, 2.0, 0),
                product("P3", 4.0, 2.0, 0),
            ],
            vec![material(0.0, 0.0)],
        )
        .with_lines(2);

        let schedule = solve(&instance, &mut MicroLp, &SolveOptions::default())?;

        assert!(schedule.total_tardiness.abs() < 1e-6);
        let lines = schedule.lines.ok_or_else(|| anyhow::anyhow!("missing lines"))?;
        let mut jobs: Vec<_> = lines.iter().flat_map(|line| line.jobs.clone()).collect();
        assert!(lines.iter().all(|line| !line.jobs.is_empty()));
        jobs.sort();
        assert_eq!(jobs, vec!["P1", "P2", "P3"]);
        Ok(())
    }

    #[test]
    fn lines_respect_material_gates() -> anyhow::Result<()> {
        let instance = Instance::new(
            vec![product("P1", 2.0, 1.0, 5), product("P2", 2.0, 1.0, 5)],
            vec![material(5.0, 3.0)],
        )
        .with_lines(2);

        let schedule = solve(&instance, &mut MicroLp, &SolveOptions::default())?;

        // One product uses the stock at time 0, the other waits for supply at 3.
        assert!((schedule.total_tardiness - 2.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn invalid_instance_never_reaches_solver() {
        let instance = gated(0.0).with_big_m(1.0);
        let result = solve(&instance, &mut MicroLp, &SolveOptions::default());

        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(report(result).is_err());
    }

    #[test]
    fn solver_failure_becomes_status_report() -> anyhow::Result<()> {
        let failed: Result<Schedule, Error> = Err(SolverError::Infeasible.into());
        let report = report(failed)?;

        assert_eq!(report.status, Status::Infeasible);
        assert!(report.schedule.is_none());
        assert!(report.issues.is_empty());
        Ok(())
    }

    #[test]
    fn every_solver_outcome_has_a_report() -> anyhow::Result<()> {
        for (err, status) in [
            (SolverError::Unbounded, Status::Unbounded),
            (SolverError::Timeout, Status::Timeout),
            (SolverError::Unknown("InfOrUnbd".into()), Status::Unknown),
            (SolverError::Backend("no licence".into()), Status::Unknown),
        ] {
            let report = report(Err(err.into()))?;
            assert_eq!(report.status, status);
            assert!(report.message.is_some());
        }
        Ok(())
    }

    #[test]
    fn inconsistent_solution_is_not_reported_optimal() -> anyhow::Result<()> {
        let issue = Inconsistency::ConstraintViolated("capacity_0_standard".into());
        let report = report(Err(Error::Inconsistent(vec![issue.clone()])))?;

        assert_eq!(report.status, Status::Inconsistent);
        assert!(report.schedule.is_none());
        assert_eq!(report.issues, vec![issue]);

        let json = data::to_string(&report)?;
        assert!(json.contains("\"INCONSISTENT\""));
        assert!(json.contains("capacity_0_standard"));
        Ok(())
    }
}
