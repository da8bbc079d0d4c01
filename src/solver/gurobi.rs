use super::{SolveOptions, Solver};
use crate::core::SolverError;
use crate::model::{Assignment, Model, Sense, VarKind};
use ahash::HashMap;
use good_lp::{Expression, IntoAffineExpression, Variable};
use grb::expr::LinExpr;
use grb::{add_binvar, add_ctsvar, attr, c, param, Env, ModelSense, Status, Var};

/// Gurobi solver. The environment and model live only for the duration of one solve.
#[derive(Clone, Debug, Default)]
pub struct Gurobi;

impl Solver for Gurobi {
    fn solve(&mut self, model: &Model, options: &SolveOptions) -> Result<Assignment, SolverError> {
        gurobi_impl(model, options)
    }

    fn name(&self) -> &'static str {
        "gurobi"
    }
}

#[allow(unsafe_code)]
#[linkme::distributed_slice(super::SOLVERS)]
static INSTANCE: fn() -> Box<dyn Solver> = || Box::new(Gurobi);

#[allow(clippy::needless_pass_by_value)]
fn backend(err: grb::Error) -> SolverError {
    SolverError::Backend(err.to_string())
}

fn gurobi_impl(model: &Model, options: &SolveOptions) -> Result<Assignment, SolverError> {
    let mut gurobi = create_model(model.name(), options).map_err(backend)?;

    let mut vars: HashMap<Variable, Var> = HashMap::default();
    for def in model.vars() {
        let var = match (def.kind, def.upper) {
            (VarKind::Binary, _) => add_binvar!(gurobi, name: &def.name),
            (VarKind::Continuous, Some(upper)) => {
                add_ctsvar!(gurobi, name: &def.name, bounds: def.lower..upper)
            }
            (VarKind::Continuous, None) => add_ctsvar!(gurobi, name: &def.name, bounds: def.lower..),
        };
        vars.insert(def.var, var.map_err(backend)?);
    }

    for constraint in model.constraints() {
        let comparison = &constraint.comparison;
        let mut lhs = LinExpr::new();
        for (var, coefficient) in comparison.terms() {
            lhs.add_term(coefficient, vars[&var]);
        }
        let rhs = comparison.rhs();
        let constr = match comparison.sense {
            Sense::Le => c!(lhs <= rhs),
            Sense::Ge => c!(lhs >= rhs),
            Sense::Eq => c!(lhs == rhs),
        };
        gurobi.add_constr(&constraint.name, constr).map_err(backend)?;
    }

    let objective = expression(model.objective(), &vars);
    gurobi
        .set_objective(objective, ModelSense::Minimize)
        .map_err(backend)?;
    gurobi.optimize().map_err(backend)?;

    match gurobi.status().map_err(backend)? {
        Status::Optimal => {}
        Status::Infeasible => return Err(SolverError::Infeasible),
        Status::Unbounded => return Err(SolverError::Unbounded),
        Status::TimeLimit => return Err(SolverError::Timeout),
        status => return Err(SolverError::Unknown(format!("{status:?}"))),
    }

    let mut assignment = Assignment::default();
    for (&var, grb_var) in &vars {
        assignment.set(var, gurobi.get_obj_attr(attr::X, grb_var).map_err(backend)?);
    }
    Ok(assignment)
}

fn create_model(name: &str, options: &SolveOptions) -> grb::Result<grb::Model> {
    let mut env = Env::new("")?;
    env.set(param::OutputFlag, 0)?;
    env.set(param::LogToConsole, 0)?;
    if let Some(limit) = options.time_limit {
        env.set(param::TimeLimit, limit.as_secs_f64())?;
    }
    grb::Model::with_env(name, env)
}

fn expression(expr: &Expression, vars: &HashMap<Variable, Var>) -> LinExpr {
    let mut result = LinExpr::new();
    for (var, coefficient) in expr.linear_coefficients() {
        result.add_term(coefficient, vars[&var]);
    }
    result.add_constant(expr.constant());
    result
}
