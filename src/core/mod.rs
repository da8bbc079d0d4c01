mod error;
mod problem;
mod schedule;

pub use error::*;
pub use problem::*;
pub use schedule::*;
