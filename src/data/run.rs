use crate::core::{Instance, Status};
use crate::data::deserialize;
use crate::solver::{SolveOptions, Solver};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result};
use std::fs::File;
use std::io::BufReader;

/// Report of solving a directory of instances.
#[derive(Debug, Serialize)]
pub struct Report {
    solver: String,
    entries: Vec<ReportEntry>,
}

impl Report {
    /// Create a new report.
    fn new(solver: String) -> Self {
        let entries = Vec::new();
        Self { solver, entries }
    }

    /// Get the solver name.
    #[must_use]
    pub fn solver_name(&self) -> &str {
        &self.solver
    }

    /// Get the entries.
    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Solver: {}", self.solver)?;
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        writeln!(f, "-------------------")
    }
}

/// Report of solving a single instance.
#[non_exhaustive]
#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub status: Status,
    pub total_tardiness: Option<f64>,
    pub time: f64,
}

impl Display for ReportEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.total_tardiness {
            Some(total) => write!(f, "{}: {total:.2} in {:.2} sec", self.name, self.time),
            None => write!(f, "{}: {:?} in {:.2} sec", self.name, self.status, self.time),
        }
    }
}

/// Solve every `*.json` instance in the `dir` directory, in file name order.
///
/// # Errors
/// - If a file cannot be read or is not a valid instance.
/// - If an extracted schedule is inconsistent.
pub fn run(dir: &str, solver: &mut dyn Solver, options: &SolveOptions) -> anyhow::Result<Report> {
    let mut report = Report::new(solver.name().into());

    let mut files: Vec<_> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<_>>()?;
    files.retain(|path| path.extension().is_some_and(|ext| ext == "json"));
    files.sort();

    for path in files {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let instance: Instance = deserialize(&mut BufReader::new(File::open(&path)?))?;

        let time = std::time::Instant::now();
        let result = crate::solve(&instance, solver, options);
        let time = time.elapsed().as_secs_f64();

        let entry = match result {
            Ok(schedule) => ReportEntry {
                name,
                status: schedule.status,
                total_tardiness: Some(schedule.total_tardiness),
                time,
            },
            Err(err) => match err.status() {
                Some(status) => ReportEntry {
                    name,
                    status,
                    total_tardiness: None,
                    time,
                },
                None => return Err(err.into()),
            },
        };
        report.entries.push(entry);
    }

    Ok(report)
}
