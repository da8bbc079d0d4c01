use crate::core::Problem;
use crate::model::{geq, Model};
use good_lp::{Expression, Variable};

/// Adds the tardiness slack of every product, bounded below by the lateness
/// `start + processingTime − due` and by zero. Minimizing drives it to the positive part.
pub fn tardiness_vars(model: &mut Model, problem: &Problem, start: &[Variable]) -> Vec<Variable> {
    let mut tardiness = Vec::with_capacity(start.len());
    for (p, (product, &start)) in problem.products().iter().zip(start).enumerate() {
        let var = model.add_continuous(format!("tardiness_{p}"), 0.0, None);
        model.add_constr(
            format!("tardy_{p}"),
            geq(var - start, product.processing_time - product.due),
        );
        tardiness.push(var);
    }
    tardiness
}

/// Minimizes the unweighted total tardiness.
pub fn minimize_total_tardiness(model: &mut Model, tardiness: &[Variable]) {
    model.set_objective(tardiness.iter().copied().sum::<Expression>());
}
