use super::formulation::Formulation;
use super::sequencing::{Node, Sequencing};
use crate::core::{
    BoundaryFlag, Channel, Error, Inconsistency, JobSchedule, LineSequence, MaterialUsage,
    Problem, Schedule, Status,
};
use crate::model::Assignment;

/// Relative feasibility tolerance. Each row, bound and recomputed quantity is
/// checked against `FEASIBILITY_TOLERANCE` times its own magnitude, never
/// against `BIG_M`, so a large M cannot hide an overfilled pool.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Reconstructs the schedule from an optimal assignment and re-checks it.
///
/// Starts within `epsilon` of a gating lead time are reported as warnings on the
/// schedule. Any broken invariant is collected and returned as
/// [`Error::Inconsistent`] instead of a schedule.
///
/// # Errors
/// - If the assignment violates a row, overfills a pool, leaves a gate open,
///   or its precedence edges do not form one path per line.
pub fn extract(
    formulation: &Formulation,
    assignment: &Assignment,
    epsilon: f64,
) -> Result<Schedule, Error> {
    let problem = formulation.problem;

    let mut issues: Vec<_> = formulation
        .model
        .violations(assignment, FEASIBILITY_TOLERANCE)
        .into_iter()
        .map(Inconsistency::ConstraintViolated)
        .collect();

    let jobs = jobs(formulation, assignment, &mut issues);
    let (materials, warnings) = usage(formulation, assignment, &jobs, epsilon, &mut issues);
    let lines = formulation
        .sequencing
        .as_ref()
        .map(|sequencing| lines(problem, sequencing, assignment, &mut issues));

    if !issues.is_empty() {
        for issue in &issues {
            tracing::warn!(%issue, "inconsistent solution");
        }
        return Err(Error::Inconsistent(issues));
    }

    for flag in &warnings {
        tracing::warn!(
            product = %flag.product,
            material = %flag.material,
            channel = %flag.channel,
            start = flag.start,
            lead_time = flag.lead_time,
            "start lies on a lead time boundary"
        );
    }

    let total_tardiness: f64 = jobs.iter().map(|job| job.tardiness).sum();
    #[allow(clippy::cast_precision_loss)]
    let average_tardiness = total_tardiness / jobs.len() as f64;

    Ok(Schedule {
        status: Status::Optimal,
        jobs,
        materials,
        lines,
        total_tardiness,
        average_tardiness,
        warnings,
    })
}

fn jobs(
    formulation: &Formulation,
    assignment: &Assignment,
    issues: &mut Vec<Inconsistency>,
) -> Vec<JobSchedule> {
    let products = formulation.problem.products();
    let vars = formulation.start.iter().zip(&formulation.tardiness);

    products
        .iter()
        .zip(vars)
        .map(|(product, (&start, &tardiness))| {
            let start = assignment.value(start).max(0.0);
            let end = start + product.processing_time;
            let expected = (end - product.due).max(0.0);

            let reported = assignment.value(tardiness);
            if (reported - expected).abs() > FEASIBILITY_TOLERANCE * expected.max(1.0) {
                issues.push(Inconsistency::TardinessMismatch {
                    product: product.id.clone(),
                    reported,
                    expected,
                });
            }

            JobSchedule {
                product: product.id.clone(),
                start,
                end,
                due: product.due,
                tardiness: expected,
            }
        })
        .collect()
}

fn usage(
    formulation: &Formulation,
    assignment: &Assignment,
    jobs: &[JobSchedule],
    epsilon: f64,
    issues: &mut Vec<Inconsistency>,
) -> (Vec<MaterialUsage>, Vec<BoundaryFlag>) {
    let problem = formulation.problem;
    let pool = |material: usize, channel: Channel| material * Channel::ALL.len() + channel.index();
    let pools = problem.materials().len() * Channel::ALL.len();
    let mut usages: Vec<Option<MaterialUsage>> = vec![None; pools];
    let mut flags = Vec::new();

    for gate in &formulation.gates {
        let material = &problem.materials()[gate.material];
        let product = &problem.products()[gate.product];
        let spec = material.channel(gate.channel);
        let start = jobs[gate.product].start;
        let ready = assignment.is_set(gate.ready);

        let usage = usages[pool(gate.material, gate.channel)].get_or_insert_with(|| {
            MaterialUsage {
                material: material.id.clone(),
                channel: gate.channel,
                lead_time: spec.lead_time,
                capacity: spec.capacity,
                used: 0.0,
                products: Vec::new(),
            }
        });

        if ready {
            #[allow(clippy::cast_precision_loss)]
            let quantity = problem.requirement(gate.product, gate.material) as f64;
            usage.used += quantity;
            usage.products.push(product.id.clone());
        }

        if (start - spec.lead_time).abs() <= epsilon {
            flags.push(BoundaryFlag {
                product: product.id.clone(),
                material: material.id.clone(),
                channel: gate.channel,
                start,
                lead_time: spec.lead_time,
            });
        } else if start < spec.lead_time && !ready {
            issues.push(Inconsistency::GateNotForced {
                product: product.id.clone(),
                material: material.id.clone(),
                channel: gate.channel,
                start,
                lead_time: spec.lead_time,
            });
        }
    }

    let usages: Vec<_> = usages.into_iter().flatten().collect();
    for usage in &usages {
        if !usage.within_capacity(FEASIBILITY_TOLERANCE * usage.capacity.max(1.0)) {
            issues.push(Inconsistency::CapacityExceeded {
                material: usage.material.clone(),
                channel: usage.channel,
                used: usage.used,
                capacity: usage.capacity,
            });
        }
    }

    (usages, flags)
}

/// Walks every line from its first job along the chosen edges until the end node.
fn lines(
    problem: &Problem,
    sequencing: &Sequencing,
    assignment: &Assignment,
    issues: &mut Vec<Inconsistency>,
) -> Vec<LineSequence> {
    let products = problem.products();
    let n = products.len();
    let mut visited = vec![false; n];
    let mut sequences = Vec::with_capacity(sequencing.starts_line.len());

    for (line, starts) in sequencing.starts_line.iter().enumerate() {
        let mut jobs = Vec::new();
        let first = starts.iter().position(|&var| assignment.is_set(var));
        let Some(first) = first else {
            issues.push(Inconsistency::MissingLineStart(line));
            sequences.push(LineSequence { line, jobs });
            continue;
        };

        let mut current = Some(Node::Job(first));
        while let Some(Node::Job(i)) = current {
            if visited[i] {
                let product = products[i].id.clone();
                issues.push(Inconsistency::Revisited { line, product });
                break;
            }
            visited[i] = true;
            jobs.push(products[i].id.clone());
            current = sequencing.successor(assignment, Node::Job(i), n);
        }

        sequences.push(LineSequence { line, jobs });
    }

    for (i, product) in products.iter().enumerate() {
        let lines = sequencing
            .on_line
            .iter()
            .filter(|members| assignment.is_set(members[i]))
            .count();
        if lines != 1 {
            let product = product.id.clone();
            issues.push(Inconsistency::AmbiguousLine { product, lines });
        }
    }

    let unreachable: Vec<_> = products
        .iter()
        .zip(&visited)
        .filter(|&(_, &visited)| !visited)
        .map(|(product, _)| product.id.clone())
        .collect();
    if !unreachable.is_empty() {
        issues.push(Inconsistency::Unreachable(unreachable));
    }

    sequences
}
