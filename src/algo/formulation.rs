use super::gate::{add_gates, Gate};
use super::objective::{minimize_total_tardiness, tardiness_vars};
use super::sequencing::{add_sequencing, Sequencing};
use crate::core::Problem;
use crate::model::Model;
use good_lp::Variable;

/// The complete model of a problem together with handles to its variables.
/// Built once per problem; the problem itself is only borrowed.
#[derive(Debug)]
pub struct Formulation<'a> {
    pub problem: &'a Problem,
    pub model: Model,
    pub start: Vec<Variable>,
    pub tardiness: Vec<Variable>,
    pub gates: Vec<Gate>,
    pub sequencing: Option<Sequencing>,
}

/// Builds gates, sequencing (when the problem has lines) and the objective into one model.
#[must_use]
pub fn formulate(problem: &Problem) -> Formulation<'_> {
    let name = if problem.lines().is_some() {
        "line_sequencing"
    } else {
        "material_gating"
    };
    let mut model = Model::new(name);

    // A left-shifted schedule completes every job by the horizon.
    let start: Vec<_> = problem
        .products()
        .iter()
        .enumerate()
        .map(|(p, product)| {
            let latest = problem.horizon() - product.processing_time;
            model.add_continuous(format!("start_{p}"), 0.0, Some(latest))
        })
        .collect();

    let tardiness = tardiness_vars(&mut model, problem, &start);
    let gates = add_gates(&mut model, problem, &start);
    let sequencing = problem
        .lines()
        .map(|lines| add_sequencing(&mut model, problem, &start, lines));
    minimize_total_tardiness(&mut model, &tardiness);

    tracing::debug!(
        model = model.name(),
        vars = model.vars().len(),
        binaries = model.binary_count(),
        constraints = model.constraints().len(),
        big_m = problem.big_m(),
        "model built"
    );

    Formulation {
        problem,
        model,
        start,
        tardiness,
        gates,
        sequencing,
    }
}
