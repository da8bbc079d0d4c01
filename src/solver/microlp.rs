use super::{SolveOptions, Solver};
use crate::core::SolverError;
use crate::model::{Assignment, Model, Sense, VarKind};
use ahash::HashMap;
use good_lp::{IntoAffineExpression, Variable};
use microlp::{ComparisonOp, OptimizationDirection, Problem};

/// Binaries this close to 0 or 1 are snapped; anything further is left for the
/// extractor's integrality check to report.
const SNAP_TOLERANCE: f64 = 1e-5;

/// Pure Rust branch-and-bound solver. Fine for small and medium instances;
/// it has no time limit.
#[derive(Clone, Debug, Default)]
pub struct MicroLp;

impl Solver for MicroLp {
    fn solve(&mut self, model: &Model, options: &SolveOptions) -> Result<Assignment, SolverError> {
        if options.time_limit.is_some() {
            tracing::warn!("microlp ignores the time limit");
        }

        let objective: HashMap<Variable, f64> = model.objective().linear_coefficients().collect();

        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: HashMap<Variable, microlp::Variable> = model
            .vars()
            .iter()
            .map(|def| {
                let coefficient = objective.get(&def.var).copied().unwrap_or_default();
                let var = match def.kind {
                    VarKind::Binary => problem.add_binary_var(coefficient),
                    VarKind::Continuous => {
                        let upper = def.upper.unwrap_or(f64::INFINITY);
                        problem.add_var(coefficient, (def.lower, upper))
                    }
                };
                (def.var, var)
            })
            .collect();

        for constraint in model.constraints() {
            let comparison = &constraint.comparison;
            let expr: Vec<_> = comparison
                .terms()
                .map(|(var, coefficient)| (vars[&var], coefficient))
                .collect();
            let op = match comparison.sense {
                Sense::Le => ComparisonOp::Le,
                Sense::Ge => ComparisonOp::Ge,
                Sense::Eq => ComparisonOp::Eq,
            };
            problem.add_constraint(expr, op, comparison.rhs());
        }

        let solution = problem.solve().map_err(|err| match err {
            microlp::Error::Infeasible => SolverError::Infeasible,
            microlp::Error::Unbounded => SolverError::Unbounded,
            microlp::Error::InternalError(message) => SolverError::Backend(message),
        })?;

        let values = model.vars().iter().map(|def| {
            let value = *solution.var_value(vars[&def.var]);
            let snapped = value.round();
            match def.kind {
                VarKind::Binary if (value - snapped).abs() <= SNAP_TOLERANCE => (def.var, snapped),
                _ => (def.var, value),
            }
        });
        Ok(values.collect())
    }

    fn name(&self) -> &'static str {
        "microlp"
    }
}

#[allow(unsafe_code)]
#[linkme::distributed_slice(super::SOLVERS)]
static INSTANCE: fn() -> Box<dyn Solver> = || Box::new(MicroLp);

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{geq, leq};

    #[test]
    fn solves_small_knapsack() -> anyhow::Result<()> {
        let mut model = Model::new("knapsack");
        let items: Vec<_> = (0..3).map(|i| model.add_binary(format!("x_{i}"))).collect();
        let weight = 3.0 * items[0] + 2.0 * items[1] + 2.0 * items[2];
        model.add_constr("weight".into(), leq(weight, 4.0));
        // Maximize 5, 3, 3 by minimizing the negation.
        let value = -(5.0 * items[0] + 3.0 * items[1] + 3.0 * items[2]);
        model.set_objective(value);

        let assignment = MicroLp.solve(&model, &SolveOptions::default())?;

        assert!((assignment.evaluate(model.objective()) + 6.0).abs() < 1e-6);
        assert!(!assignment.is_set(items[0]));
        Ok(())
    }

    #[test]
    fn reports_infeasibility() {
        let mut model = Model::new("infeasible");
        let x = model.add_continuous("x".into(), 0.0, Some(1.0));
        model.add_constr("too_big".into(), geq(x, 2.0));

        let result = MicroLp.solve(&model, &SolveOptions::default());

        assert_eq!(result, Err(SolverError::Infeasible));
    }

    #[test]
    fn keeps_continuous_values_unrounded() -> anyhow::Result<()> {
        let mut model = Model::new("fraction");
        let x = model.add_continuous("x".into(), 0.0, None);
        let b = model.add_binary("b".into());
        model.add_constr("half".into(), geq(x, 0.5));
        model.add_constr("link".into(), geq(b, x));
        model.set_objective(x + b);

        let assignment = MicroLp.solve(&model, &SolveOptions::default())?;

        assert!((assignment.value(x) - 0.5).abs() < 1e-9);
        assert!((assignment.value(b) - 1.0).abs() < f64::EPSILON);
        assert!(model.violations(&assignment, 1e-6).is_empty());
        Ok(())
    }
}
