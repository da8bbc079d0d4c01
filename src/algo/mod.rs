mod extract;
mod formulation;
mod gate;
mod objective;
mod sequencing;

pub use extract::{extract, FEASIBILITY_TOLERANCE};
pub use formulation::{formulate, Formulation};
pub use gate::{add_gates, Gate};
pub use objective::{minimize_total_tardiness, tardiness_vars};
pub use sequencing::{add_sequencing, Node, Sequencing};
