use super::{Channel, Inconsistency, Status};
use serde::Serialize;

/// Timing of one product in the extracted schedule.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobSchedule {
    pub product: String,
    pub start: f64,
    pub end: f64,
    pub due: f64,
    pub tardiness: f64,
}

/// Demand drawn from the capacity-limited pool of one material channel.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MaterialUsage {
    pub material: String,
    pub channel: Channel,
    pub lead_time: f64,
    pub capacity: f64,
    pub used: f64,
    /// Products drawing on the pool.
    pub products: Vec<String>,
}

impl MaterialUsage {
    /// Returns whether the realized demand fits the pool within `tolerance`.
    #[must_use]
    pub fn within_capacity(&self, tolerance: f64) -> bool {
        self.used <= self.capacity + tolerance
    }
}

/// Jobs of a production line in processing order.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineSequence {
    pub line: usize,
    pub jobs: Vec<String>,
}

/// A start lying within the numeric tolerance of a channel lead time.
/// Whether the product really draws on the limited pool is ambiguous there.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundaryFlag {
    pub product: String,
    pub material: String,
    pub channel: Channel,
    pub start: f64,
    pub lead_time: f64,
}

/// The schedule reconstructed from an optimal assignment.
/// This is everything a renderer or printer gets to see.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Schedule {
    pub status: Status,
    pub jobs: Vec<JobSchedule>,
    pub materials: Vec<MaterialUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LineSequence>>,
    pub total_tardiness: f64,
    pub average_tardiness: f64,
    pub warnings: Vec<BoundaryFlag>,
}

impl Schedule {
    /// Returns the schedule entry of a product.
    #[must_use]
    pub fn job(&self, product: &str) -> Option<&JobSchedule> {
        self.jobs.iter().find(|job| job.product == product)
    }

    /// Returns the pool usage of a material channel.
    #[must_use]
    pub fn usage(&self, material: &str, channel: Channel) -> Option<&MaterialUsage> {
        self.materials
            .iter()
            .find(|usage| usage.material == material && usage.channel == channel)
    }
}

/// What gets printed for a solve: the schedule, or the status explaining why there is none.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failed sanity checks when the status is `INCONSISTENT`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Inconsistency>,
}

impl From<Schedule> for Report {
    fn from(schedule: Schedule) -> Self {
        Self {
            status: schedule.status,
            schedule: Some(schedule),
            message: None,
            issues: Vec::new(),
        }
    }
}
