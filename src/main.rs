use clap::{Parser, ValueEnum};
use material_gated_scheduling::data::{self, GenConfig, Generator};
use material_gated_scheduling::run_reader;
use material_gated_scheduling::solver::{SolveOptions, Solver, SOLVERS};
use std::io::Write;
use std::num::NonZero;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Copy, Clone, Debug)]
struct SolverName(usize, &'static str);

impl From<SolverName> for Box<dyn Solver> {
    fn from(value: SolverName) -> Self {
        SOLVERS[value.0]()
    }
}

impl std::fmt::Display for SolverName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.1)
    }
}

impl ValueEnum for SolverName {
    fn value_variants<'a>() -> &'a [Self] {
        static NAMES: std::sync::LazyLock<Vec<SolverName>> = std::sync::LazyLock::new(|| {
            let iter = SOLVERS.iter().enumerate();
            iter.map(|(i, init)| SolverName(i, init().name())).collect()
        });

        NAMES.as_slice()
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.1))
    }
}

/// Schedules production against raw-material availability, minimizing total tardiness.
#[derive(Debug, Parser)]
#[command(version, about)]
enum Application {
    /// Solve one instance and print the JSON report.
    Solve {
        /// The solver backend.
        #[clap(short, long, default_value = "microlp")]
        solver: SolverName,
        /// Time limit of the solve in seconds.
        #[clap(short, long)]
        time_limit: Option<f64>,
        /// Distance from a lead time under which a start is flagged.
        #[clap(short, long, default_value = "1e-6")]
        epsilon: f64,
        /// The instance file. Reads stdin when omitted.
        input: Option<String>,
    },
    /// Solve every instance of a directory.
    Bench {
        /// The input directory.
        input: String,
        /// Run only this solver instead of every registered one.
        #[clap(short, long)]
        solver: Option<SolverName>,
        /// Time limit of each solve in seconds.
        #[clap(short, long)]
        time_limit: Option<f64>,
    },
    /// Generate random instances.
    Gen {
        /// The number of products.
        #[clap(short, long)]
        products: NonZero<usize>,
        /// The number of materials.
        #[clap(short, long)]
        materials: NonZero<usize>,
        /// Generate the line-sequencing variant with this many lines.
        #[clap(short, long)]
        lines: Option<NonZero<usize>>,
        /// Give every material an expedite channel.
        #[clap(short, long, default_value = "false")]
        expedite: bool,
        /// Seed of the generator. Random when omitted.
        #[clap(long)]
        seed: Option<u64>,
        /// Number of instances to generate.
        #[clap(short, long, default_value = "1")]
        amount: NonZero<u64>,
        /// Path to output the generated instances. If the directory does not exist, it will be created.
        #[clap(short, long, default_value = "output")]
        output: String,
    },
}

fn options(time_limit: Option<f64>, epsilon: f64) -> anyhow::Result<SolveOptions> {
    let time_limit = time_limit.map(Duration::try_from_secs_f64).transpose()?;
    Ok(SolveOptions { time_limit, epsilon })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    match Application::parse() {
        Application::Solve {
            solver,
            time_limit,
            epsilon,
            input,
        } => {
            let options = options(time_limit, epsilon)?;
            let mut solver = Box::<dyn Solver>::from(solver);
            match input {
                Some(path) => {
                    let file = std::fs::File::open(path)?;
                    run_reader(solver.as_mut(), &mut std::io::BufReader::new(file), &options)
                }
                None => run_reader(solver.as_mut(), &mut std::io::stdin().lock(), &options),
            }
        }
        Application::Bench {
            input,
            solver,
            time_limit,
        } => {
            let options = options(time_limit, SolveOptions::default().epsilon)?;
            let solvers: Vec<Box<dyn Solver>> = match solver {
                Some(name) => vec![name.into()],
                None => SOLVERS.iter().map(|init| init()).collect(),
            };
            for mut solver in solvers {
                println!("{}", data::run(&input, solver.as_mut(), &options)?);
            }
            Ok(())
        }
        Application::Gen {
            products,
            materials,
            lines,
            expedite,
            seed,
            amount,
            output,
        } => {
            let output = std::path::Path::new(&output);
            if !output.try_exists()? {
                std::fs::create_dir_all(output)?;
            }

            let config = GenConfig {
                products,
                materials,
                lines,
                expedite,
            };
            let mut generator = seed.map_or_else(Generator::default, Generator::new);
            for i in 0..amount.get() {
                let instance = generator.generate(&config);
                let lines = lines.map_or(0, NonZero::get);
                let filename = format!("{products}_{materials}_{lines}_{i}.json");
                std::fs::File::create(output.join(filename))?
                    .write_all(data::to_string(&instance)?.as_bytes())?;
            }
            Ok(())
        }
    }
}
