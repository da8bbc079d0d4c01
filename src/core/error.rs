use super::Channel;
use serde::Serialize;
use thiserror::Error;

/// Malformed instance. Raised before any model is built.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("instance has no products")]
    NoProducts,
    #[error("instance has no materials")]
    NoMaterials,
    #[error("duplicate product id `{0}`")]
    DuplicateProduct(String),
    #[error("duplicate material id `{0}`")]
    DuplicateMaterial(String),
    #[error("{field} of `{id}` must be a finite nonnegative number, got {value}")]
    Negative {
        field: &'static str,
        id: String,
        value: f64,
    },
    #[error("product `{product}` requires unknown material `{material}`")]
    UnknownMaterial { product: String, material: String },
    #[error("expedite lead time {expedite} of `{material}` exceeds its standard lead time {standard}")]
    ExpediteSlower {
        material: String,
        expedite: f64,
        standard: f64,
    },
    #[error("line count must be positive")]
    NoLines,
    #[error("{lines} lines cannot each start with one of {products} products")]
    TooManyLines { lines: usize, products: usize },
    #[error("big M {big_m} must exceed the planning horizon {horizon}")]
    BigMTooSmall { big_m: f64, horizon: f64 },
}

/// Terminal outcome of a solver call that produced no assignment.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("model is infeasible")]
    Infeasible,
    #[error("model is unbounded")]
    Unbounded,
    #[error("solver hit its time limit without a proof of optimality")]
    Timeout,
    #[error("solver stopped without a proof: {0}")]
    Unknown(String),
    #[error("solver backend failed: {0}")]
    Backend(String),
}

/// A sanity check failed on an extracted schedule.
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Inconsistency {
    #[error("row `{0}` is violated by the solver assignment")]
    ConstraintViolated(String),
    #[error("{channel} demand {used} of `{material}` exceeds capacity {capacity}")]
    CapacityExceeded {
        material: String,
        channel: Channel,
        used: f64,
        capacity: f64,
    },
    #[error("`{product}` starts at {start} before {channel} lead time {lead_time} of `{material}` without drawing on its pool")]
    GateNotForced {
        product: String,
        material: String,
        channel: Channel,
        start: f64,
        lead_time: f64,
    },
    #[error("tardiness variable of `{product}` is {reported}, expected {expected}")]
    TardinessMismatch {
        product: String,
        reported: f64,
        expected: f64,
    },
    #[error("jobs {0:?} are not reachable from any line start (sub-tour)")]
    Unreachable(Vec<String>),
    #[error("line {line} visits `{product}` more than once")]
    Revisited { line: usize, product: String },
    #[error("`{product}` is placed on {lines} lines")]
    AmbiguousLine { product: String, lines: usize },
    #[error("line {0} has no start job")]
    MissingLineStart(usize),
}

/// Overall status of a solve.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Optimal,
    Infeasible,
    Unbounded,
    Timeout,
    Unknown,
    /// The solver reported optimality but its assignment failed the sanity checks.
    Inconsistent,
}

/// Every way producing a schedule can fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid instance: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("extracted schedule is inconsistent: {}", summarize(.0))]
    Inconsistent(Vec<Inconsistency>),
}

impl Error {
    /// Returns the solve status this error corresponds to, if the solver was reached.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::Validation(_) => None,
            Self::Solver(SolverError::Infeasible) => Some(Status::Infeasible),
            Self::Solver(SolverError::Unbounded) => Some(Status::Unbounded),
            Self::Solver(SolverError::Timeout) => Some(Status::Timeout),
            Self::Solver(SolverError::Unknown(_) | SolverError::Backend(_)) => Some(Status::Unknown),
            Self::Inconsistent(_) => Some(Status::Inconsistent),
        }
    }
}

fn summarize(issues: &[Inconsistency]) -> String {
    let messages: Vec<_> = issues.iter().map(ToString::to_string).collect();
    messages.join("; ")
}
