use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use lloyd_parallel::{
    cluster_with_reporter, points_from_matrix, ClusterConfig, ClusterRun, DataLoader, Executor,
    IterationReport, Point, PointSource, Result as ClusterResult, UniformGrid,
};

#[derive(Parser, Debug)]
#[command(name = "lloyd-parallel")]
#[command(about = "Parallel Lloyd's k-means over 2-D points", long_about = None)]
struct Args {
    /// Number of points to generate (ignored with --input)
    points: usize,

    /// Number of clusters; non-positive values are clamped to 1
    #[arg(allow_negative_numbers = true)]
    k: i64,

    /// Number of assignment workers; non-positive values are clamped to 1
    #[arg(allow_negative_numbers = true)]
    workers: i64,

    /// RNG seed for generated points
    #[arg(long, default_value_t = 42u64)]
    seed: u64,

    /// Maximum number of iterations
    #[arg(long, default_value_t = lloyd_parallel::MAX_ITERATIONS)]
    max_iterations: usize,

    /// How workers are executed each iteration
    #[arg(long, value_parser = parse_executor, default_value = "threads")]
    executor: Executor,

    /// Input dataset with two numeric columns (CSV or Parquet)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Explicitly specify the input file format (default: auto-detect from extension)
    #[arg(long, value_enum)]
    format: Option<InputFormat>,

    /// Output file for the full run (JSON)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optional file containing per-point cluster assignments (CSV)
    #[arg(long)]
    assignments: Option<PathBuf>,

    /// Skip the per-point listing on stdout
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Verbosity: set RUST_LOG style level (info, debug, warn)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum InputFormat {
    Csv,
    Parquet,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = init_logging(&args.log_level) {
        eprintln!("failed to initialise logging: {err}");
    }

    if let Err(err) = run(args) {
        error!(error = %err, "clustering run failed");
        process::exit(1);
    }
}

fn init_logging(level: &str) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(match level {
            "debug" => tracing::Level::DEBUG,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|err| err.to_string())
}

fn run(args: Args) -> ClusterResult<()> {
    let config = ClusterConfig {
        max_iterations: args.max_iterations,
        executor: args.executor,
        ..ClusterConfig::from_signed(args.k, args.workers)
    };

    let points = load_points(&args)?;

    println!(
        "running k={} with {} workers over {} points\n",
        config.k,
        config.workers,
        points.len()
    );

    let start = Instant::now();
    let mut print_progress = |report: &IterationReport| {
        println!(
            "iteration {} complete, changes: {}",
            report.iteration,
            if report.changed { "yes" } else { "no" }
        );
    };
    let run = cluster_with_reporter(&points, &config, &mut print_progress)?;
    let elapsed = start.elapsed();
    info!(
        iterations = run.iterations,
        outcome = %run.outcome,
        inertia = run.inertia,
        took_seconds = elapsed.as_secs_f64(),
        "clustering finished"
    );
    info!(?run.cluster_sizes, "cluster population counts");

    print_result(&run, args.quiet);

    if let Some(path) = args.output.as_ref() {
        run.save_json(path)?;
        info!(path = ?path, "wrote clustering run");
    }

    if let Some(path) = args.assignments.as_ref() {
        write_assignments(path, &run)?;
    }

    Ok(())
}

fn load_points(args: &Args) -> ClusterResult<Vec<Point>> {
    match args.input.as_deref() {
        Some(path) => {
            let format_to_use = args
                .format
                .unwrap_or_else(|| infer_format(path).unwrap_or(InputFormat::Csv));
            info!(path = ?path, ?format_to_use, "loading input data");
            let matrix = match format_to_use {
                InputFormat::Csv => DataLoader::load_csv(path)?,
                InputFormat::Parquet => DataLoader::load_parquet(path)?,
            };
            points_from_matrix(&matrix)
        }
        None => {
            if let Some(requested) = args.format {
                info!(
                    ?requested,
                    "ignoring --format because points will be generated"
                );
            }
            info!(points = args.points, seed = args.seed, "generating uniform grid points");
            UniformGrid::new(args.points, args.seed).points()
        }
    }
}

fn infer_format(path: &Path) -> Option<InputFormat> {
    path.extension().and_then(|ext| ext.to_str()).map(|ext| {
        match ext.to_ascii_lowercase().as_str() {
            "parquet" | "pq" => InputFormat::Parquet,
            _ => InputFormat::Csv,
        }
    })
}

fn print_result(run: &ClusterRun, quiet: bool) {
    println!("\n--- results ---");
    println!("iterations: {} ({})", run.iterations, run.outcome);
    if quiet {
        return;
    }
    println!("\npoints:");
    for (idx, point) in run.points.iter().enumerate() {
        println!(
            "point {idx:3}: ({:.2}, {:.2}) -> cluster {}",
            point.x, point.y, point.cluster_id
        );
    }
}

fn write_assignments(path: &Path, run: &ClusterRun) -> ClusterResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["index", "x", "y", "cluster"])?;
    for (idx, point) in run.points.iter().enumerate() {
        writer.write_record([
            idx.to_string(),
            point.x.to_string(),
            point.y.to_string(),
            point.cluster_id.to_string(),
        ])?;
    }
    writer.flush()?;
    info!(path = ?path, "wrote assignments CSV");
    Ok(())
}

fn parse_executor(raw: &str) -> Result<Executor, String> {
    Executor::from_str(raw).map_err(|err| err.to_string())
}
