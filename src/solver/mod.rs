//! Solver backends. Each backend translates a [`Model`] into its own API,
//! solves it in one blocking call and releases everything it allocated before returning.

#[cfg(feature = "gurobi")]
mod gurobi;
mod microlp;

#[cfg(feature = "gurobi")]
pub use gurobi::Gurobi;
pub use microlp::MicroLp;

use crate::core::SolverError;
use crate::model::{Assignment, Model};
use std::time::Duration;

/// Registered solver backends.
#[allow(unsafe_code)]
#[linkme::distributed_slice]
pub static SOLVERS: [fn() -> Box<dyn Solver>];

/// Options of a single solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveOptions {
    /// Wall-clock limit handed to the backend, if it supports one.
    pub time_limit: Option<Duration>,
    /// Distance from a lead time under which a start is flagged as ambiguous.
    pub epsilon: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit: None,
            epsilon: 1e-6,
        }
    }
}

/// A mixed-integer solver.
pub trait Solver {
    /// Minimizes the model's objective.
    /// Returns the value of every variable, or why no optimal assignment exists.
    ///
    /// # Errors
    /// - If the model is infeasible or unbounded.
    /// - If the solver stops without proving optimality.
    /// - If the backend itself fails.
    fn solve(&mut self, model: &Model, options: &SolveOptions) -> Result<Assignment, SolverError>;

    /// Returns the name of the solver.
    fn name(&self) -> &'static str;
}

/// Creates the registered solver with the given name.
#[must_use]
pub fn by_name(name: &str) -> Option<Box<dyn Solver>> {
    SOLVERS.iter().map(|init| init()).find(|solver| solver.name() == name)
}

/// Returns the names of every registered solver.
#[must_use]
pub fn names() -> Vec<&'static str> {
    SOLVERS.iter().map(|init| init().name()).collect()
}
