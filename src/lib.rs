//! Parallel Lloyd's k-means over 2-D points.
//!
//! Each iteration partitions the labelled points into contiguous ranges,
//! reassigns every range on its own worker, waits for all workers at a
//! barrier and then recomputes the centroids sequentially. The run stops as
//! soon as an iteration leaves every assignment untouched, or after
//! [`MAX_ITERATIONS`] rounds.

use csv::ReaderBuilder;
use ndarray::Array2;
use ndarray_rand::rand_distr::{Distribution, Normal, Uniform};
use ndarray_rand::RandomExt;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::collections::TryReserveError;
use std::fmt;
use std::fs::File;
use std::ops::Range;
use std::path::Path;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use thiserror::Error;

/// Dense interchange representation (rows = points, columns = `x`, `y`).
pub type DataMatrix = Array2<f64>;

/// Iteration cap applied when the configuration does not override it.
pub const MAX_ITERATIONS: usize = 100;

/// Error type used by operations in this crate.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("failed to allocate {what} storage")]
    Allocation {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },
    #[error("failed to spawn assignment worker {worker}")]
    ThreadSpawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("assignment worker {worker} panicked")]
    WorkerPanicked { worker: usize },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    ParseFloat(#[from] std::num::ParseFloatError),
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Convenient alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// A bare 2-D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point together with the index of the centroid it currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub x: f64,
    pub y: f64,
    /// Index into the centroid collection; always `< k` during a run.
    pub cluster_id: usize,
}

impl LabeledPoint {
    /// Label `point` with cluster 0.
    pub fn new(point: Point) -> Self {
        Self::with_cluster(point, 0)
    }

    /// Label `point` with an explicit seed assignment.
    pub fn with_cluster(point: Point, cluster_id: usize) -> Self {
        Self {
            x: point.x,
            y: point.y,
            cluster_id,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Centroid location plus the member count from the latest recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterCenter {
    pub x: f64,
    pub y: f64,
    /// Scratch accumulator, rebuilt on every recomputation pass.
    pub count: usize,
}

impl ClusterCenter {
    pub fn at(point: Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
            count: 0,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Euclidean distance between two coordinates.
pub fn distance(a: Point, b: Point) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Squared Euclidean distance, used for the potential function.
pub fn squared_distance(a: Point, b: Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Split `[0, total)` into `workers` contiguous ranges whose sizes differ by
/// at most one; the first `total % workers` ranges take the extra point.
///
/// When `total < workers` the trailing ranges are empty. A worker count of
/// zero is treated as one.
pub fn partition_ranges(total: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let base = total / workers;
    let remainder = total % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0usize;
    for worker in 0..workers {
        let extra = usize::from(worker < remainder);
        let end = start + base + extra;
        ranges.push(start..end);
        start = end;
    }
    debug_assert_eq!(start, total);
    ranges
}

/// Carve `points` into disjoint mutable views matching `ranges`.
///
/// `ranges` must be contiguous, ordered and start at zero, as produced by
/// [`partition_ranges`].
fn split_into_ranges<'a, T>(points: &'a mut [T], ranges: &[Range<usize>]) -> Vec<&'a mut [T]> {
    let mut chunks = Vec::with_capacity(ranges.len());
    let mut rest = points;
    let mut offset = 0usize;
    for range in ranges {
        debug_assert_eq!(range.start, offset, "ranges must be contiguous");
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
        chunks.push(head);
        rest = tail;
        offset = range.end;
    }
    chunks
}

/// Index of the closest centroid to `point`.
///
/// Centroids are scanned in index order and the best is only replaced on a
/// strictly smaller distance, so exact ties go to the lowest index.
pub fn nearest_centroid(point: Point, centroids: &[ClusterCenter]) -> usize {
    debug_assert!(!centroids.is_empty());
    let mut best = 0usize;
    let mut best_distance = distance(point, centroids[0].position());
    for (cid, centre) in centroids.iter().enumerate().skip(1) {
        let d = distance(point, centre.position());
        if d < best_distance {
            best_distance = d;
            best = cid;
        }
    }
    best
}

/// Reassign every point in `points` to its nearest centroid.
///
/// Sets `changed` whenever a label moves. The flag is only ever raised here,
/// never cleared, so concurrent writers need no ordering beyond atomicity.
pub fn assign_range(points: &mut [LabeledPoint], centroids: &[ClusterCenter], changed: &AtomicBool) {
    for point in points.iter_mut() {
        let best = nearest_centroid(point.position(), centroids);
        if point.cluster_id != best {
            point.cluster_id = best;
            changed.store(true, Ordering::Relaxed);
        }
    }
}

/// Move each centroid to the mean of its members.
///
/// Counts are rebuilt from scratch. A centroid without members keeps its
/// previous coordinates.
pub fn recompute_centroids(points: &[LabeledPoint], centroids: &mut [ClusterCenter]) {
    let mut sums = vec![(0.0f64, 0.0f64); centroids.len()];
    for centre in centroids.iter_mut() {
        centre.count = 0;
    }

    for point in points {
        let cid = point.cluster_id;
        sums[cid].0 += point.x;
        sums[cid].1 += point.y;
        centroids[cid].count += 1;
    }

    for (centre, (sx, sy)) in centroids.iter_mut().zip(sums) {
        if centre.count > 0 {
            let count = centre.count as f64;
            centre.x = sx / count;
            centre.y = sy / count;
        }
    }
}

/// Within-cluster sum of squared distances for the current labelling.
pub fn inertia(points: &[LabeledPoint], centroids: &[ClusterCenter]) -> f64 {
    points
        .iter()
        .map(|p| squared_distance(p.position(), centroids[p.cluster_id].position()))
        .sum()
}

/// How the per-iteration assignment workers are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Executor {
    /// One freshly spawned OS thread per range, every iteration.
    #[default]
    Threads,
    /// A rayon pool of `workers` threads kept for the whole run.
    Rayon,
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Executor::Threads => write!(f, "threads"),
            Executor::Rayon => write!(f, "rayon"),
        }
    }
}

impl std::str::FromStr for Executor {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "threads" | "thread" => Ok(Self::Threads),
            "rayon" | "pool" => Ok(Self::Rayon),
            other => Err(ClusterError::InvalidConfig(format!(
                "unsupported executor '{other}'"
            ))),
        }
    }
}

/// Configurable knobs for a clustering run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Number of centroids.
    pub k: usize,
    /// Number of assignment workers per iteration.
    pub workers: usize,
    /// Iteration cap; the run reports [`Outcome::Exhausted`] when it is hit.
    pub max_iterations: usize,
    pub executor: Executor,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 2,
            workers: 1,
            max_iterations: MAX_ITERATIONS,
            executor: Executor::default(),
        }
    }
}

impl ClusterConfig {
    /// Build a configuration from raw signed inputs, clamping non-positive
    /// `k` and worker counts up to one.
    pub fn from_signed(k: i64, workers: i64) -> Self {
        if k <= 0 {
            tracing::warn!(requested = k, "cluster count clamped to 1");
        }
        if workers <= 0 {
            tracing::warn!(requested = workers, "worker count clamped to 1");
        }
        Self {
            k: clamp_positive(k),
            workers: clamp_positive(workers),
            ..Self::default()
        }
    }

    /// Validate configuration parameters for a dataset of `point_count` points.
    pub fn validate(&self, point_count: usize) -> Result<()> {
        if self.k == 0 {
            return Err(ClusterError::InvalidConfig(
                "k must be greater than zero".into(),
            ));
        }
        if self.workers == 0 {
            return Err(ClusterError::InvalidConfig(
                "worker count must be greater than zero".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ClusterError::InvalidConfig(
                "max_iterations must be greater than zero".into(),
            ));
        }
        if point_count < self.k {
            return Err(ClusterError::InvalidConfig(format!(
                "dataset has {point_count} points but k = {}; centroids are seeded from the first k points",
                self.k
            )));
        }
        Ok(())
    }
}

fn clamp_positive(value: i64) -> usize {
    usize::try_from(value.max(1)).unwrap_or(usize::MAX)
}

/// Snapshot handed to the [`ProgressReporter`] after every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    /// One-based iteration index.
    pub iteration: usize,
    /// Whether any point changed cluster during this iteration.
    pub changed: bool,
    /// Potential function after recomputation.
    pub inertia: f64,
}

/// Receives progress after each completed iteration.
pub trait ProgressReporter {
    fn on_iteration(&mut self, report: &IterationReport);
}

impl ProgressReporter for () {
    fn on_iteration(&mut self, _report: &IterationReport) {}
}

impl<F> ProgressReporter for F
where
    F: FnMut(&IterationReport),
{
    fn on_iteration(&mut self, report: &IterationReport) {
        self(report)
    }
}

/// Reporter that emits one `tracing` debug event per iteration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn on_iteration(&mut self, report: &IterationReport) {
        tracing::debug!(
            iteration = report.iteration,
            changed = report.changed,
            inertia = report.inertia,
            "lloyd iteration complete"
        );
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// The last iteration left every assignment unchanged.
    Converged,
    /// The iteration cap was reached while assignments were still moving.
    Exhausted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Converged => write!(f, "converged"),
            Outcome::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Final labelling, centroids and diagnostics of a clustering run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRun {
    /// Points in input order with their final cluster ids.
    pub points: Vec<LabeledPoint>,
    pub centroids: Vec<ClusterCenter>,
    /// Number of completed iterations.
    pub iterations: usize,
    pub outcome: Outcome,
    /// Sum of squared distances to the assigned centroids.
    pub inertia: f64,
    /// Number of points assigned to each centroid.
    pub cluster_sizes: Vec<usize>,
}

impl ClusterRun {
    pub fn converged(&self) -> bool {
        self.outcome == Outcome::Converged
    }

    /// Centroids as a `k × 2` matrix.
    pub fn centroid_matrix(&self) -> DataMatrix {
        Array2::from_shape_fn((self.centroids.len(), 2), |(row, col)| {
            let centre = &self.centroids[row];
            if col == 0 {
                centre.x
            } else {
                centre.y
            }
        })
    }

    /// Persist the run as pretty-printed JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Executes one assignment pass over a set of disjoint ranges and returns
/// only once every range has been processed.
enum WorkerRunner {
    Threads,
    Rayon(ThreadPool),
}

impl WorkerRunner {
    fn new(executor: Executor, workers: usize) -> Result<Self> {
        match executor {
            Executor::Threads => Ok(Self::Threads),
            Executor::Rayon => ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|idx| format!("lloyd-worker-{idx}"))
                .build()
                .map(Self::Rayon)
                .map_err(|err| ClusterError::ThreadPool(err.to_string())),
        }
    }

    fn assign(
        &self,
        chunks: Vec<&mut [LabeledPoint]>,
        centroids: &[ClusterCenter],
        changed: &AtomicBool,
    ) -> Result<()> {
        self.run_ranges(chunks, |worker, chunk| {
            tracing::trace!(worker, len = chunk.len(), "assigning range");
            assign_range(chunk, centroids, changed);
        })
    }

    /// Run `task` once per chunk, in parallel, and return after all of them.
    ///
    /// A panicking task becomes [`ClusterError::WorkerPanicked`] carrying the
    /// lowest panicking worker index, whichever executor is in use.
    fn run_ranges<T, F>(&self, chunks: Vec<&mut [T]>, task: F) -> Result<()>
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        match self {
            WorkerRunner::Threads => run_on_threads(chunks, &task),
            WorkerRunner::Rayon(pool) => {
                let panicked = AtomicUsize::new(usize::MAX);
                let task = &task;
                let panicked_ref = &panicked;
                pool.scope(|scope| {
                    for (worker, chunk) in chunks.into_iter().enumerate() {
                        scope.spawn(move |_| {
                            if panic::catch_unwind(AssertUnwindSafe(|| task(worker, chunk))).is_err()
                            {
                                panicked_ref.fetch_min(worker, Ordering::Relaxed);
                            }
                        });
                    }
                });
                match panicked.into_inner() {
                    usize::MAX => Ok(()),
                    worker => Err(ClusterError::WorkerPanicked { worker }),
                }
            }
        }
    }
}

fn run_on_threads<T, F>(chunks: Vec<&mut [T]>, task: &F) -> Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(chunks.len());
        for (worker, chunk) in chunks.into_iter().enumerate() {
            let handle = thread::Builder::new()
                .name(format!("lloyd-worker-{worker}"))
                .spawn_scoped(scope, move || task(worker, chunk))
                .map_err(|source| ClusterError::ThreadSpawn { worker, source })?;
            handles.push(handle);
        }

        // Join everything before reporting so no panic is left unobserved.
        let mut first_failure = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() && first_failure.is_none() {
                first_failure = Some(ClusterError::WorkerPanicked { worker });
            }
        }
        first_failure.map_or(Ok(()), Err)
    })
}

/// Owns the Lloyd iteration loop for one configuration.
#[derive(Debug, Clone)]
pub struct LloydDriver {
    config: ClusterConfig,
}

impl LloydDriver {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Cluster `points`, starting from their existing labels.
    ///
    /// Centroid `i` is seeded from point `i`. Every label must already be
    /// below `k`.
    pub fn run<R: ProgressReporter + ?Sized>(
        &self,
        mut points: Vec<LabeledPoint>,
        reporter: &mut R,
    ) -> Result<ClusterRun> {
        let config = &self.config;
        let n = points.len();
        config.validate(n)?;
        if let Some((idx, point)) = points
            .iter()
            .enumerate()
            .find(|(_, p)| p.cluster_id >= config.k)
        {
            return Err(ClusterError::InvalidData(format!(
                "point {idx} is labelled with cluster {} but k = {}",
                point.cluster_id, config.k
            )));
        }

        let mut centroids: Vec<ClusterCenter> = Vec::new();
        centroids
            .try_reserve_exact(config.k)
            .map_err(|source| ClusterError::Allocation {
                what: "centroid",
                source,
            })?;
        centroids.extend(points[..config.k].iter().map(|p| ClusterCenter::at(p.position())));

        let runner = WorkerRunner::new(config.executor, config.workers)?;
        tracing::info!(
            k = config.k,
            workers = config.workers,
            points = n,
            executor = %config.executor,
            max_iterations = config.max_iterations,
            "starting lloyd iterations"
        );

        let changed = AtomicBool::new(true);
        let mut iterations = 0usize;
        let mut last_inertia = inertia(&points, &centroids);

        while changed.load(Ordering::Relaxed) && iterations < config.max_iterations {
            changed.store(false, Ordering::Relaxed);
            iterations += 1;

            let ranges = partition_ranges(n, config.workers);
            let chunks = split_into_ranges(&mut points, &ranges);
            runner.assign(chunks, &centroids, &changed)?;

            recompute_centroids(&points, &mut centroids);
            last_inertia = inertia(&points, &centroids);

            reporter.on_iteration(&IterationReport {
                iteration: iterations,
                changed: changed.load(Ordering::Relaxed),
                inertia: last_inertia,
            });
        }

        let outcome = if changed.load(Ordering::Relaxed) {
            Outcome::Exhausted
        } else {
            Outcome::Converged
        };
        tracing::info!(
            iterations,
            %outcome,
            inertia = last_inertia,
            "lloyd iterations finished"
        );

        let cluster_sizes = centroids.iter().map(|c| c.count).collect();
        Ok(ClusterRun {
            points,
            centroids,
            iterations,
            outcome,
            inertia: last_inertia,
            cluster_sizes,
        })
    }
}

/// Label `points` with cluster 0 into freshly reserved storage.
pub fn label_points(points: &[Point]) -> Result<Vec<LabeledPoint>> {
    let mut labeled = Vec::new();
    labeled
        .try_reserve_exact(points.len())
        .map_err(|source| ClusterError::Allocation {
            what: "point",
            source,
        })?;
    labeled.extend(points.iter().copied().map(LabeledPoint::new));
    Ok(labeled)
}

/// Cluster `points` with `config`, logging progress through `tracing`.
pub fn cluster(points: &[Point], config: &ClusterConfig) -> Result<ClusterRun> {
    cluster_with_reporter(points, config, &mut TracingReporter)
}

/// Cluster `points` with `config`, forwarding per-iteration progress to `reporter`.
pub fn cluster_with_reporter<R: ProgressReporter + ?Sized>(
    points: &[Point],
    config: &ClusterConfig,
    reporter: &mut R,
) -> Result<ClusterRun> {
    let labeled = label_points(points)?;
    LloydDriver::new(config.clone()).run(labeled, reporter)
}

/// Anything that can supply the initial set of points.
pub trait PointSource {
    fn points(&mut self) -> Result<Vec<Point>>;
}

impl PointSource for Vec<Point> {
    fn points(&mut self) -> Result<Vec<Point>> {
        Ok(self.clone())
    }
}

/// Reproducible uniform generator on a 0.1 grid over `[0, 99.9]²`.
#[derive(Debug, Clone, Copy)]
pub struct UniformGrid {
    pub count: usize,
    pub seed: u64,
}

impl UniformGrid {
    pub fn new(count: usize, seed: u64) -> Self {
        Self { count, seed }
    }
}

impl PointSource for UniformGrid {
    fn points(&mut self) -> Result<Vec<Point>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        Ok(generate_grid_points(self.count, &mut rng))
    }
}

/// Generate `n` points whose coordinates are integers in `[0, 1000)` scaled by 1/10.
pub fn generate_grid_points(n: usize, rng: &mut ChaCha8Rng) -> Vec<Point> {
    let ticks = Array2::random_using((n, 2), Uniform::new(0u32, 1000), rng);
    ticks
        .rows()
        .into_iter()
        .map(|row| Point::new(f64::from(row[0]) / 10.0, f64::from(row[1]) / 10.0))
        .collect()
}

/// Generate Gaussian blobs of `per_cluster` points around each of `centres`.
pub fn generate_clustered_points(
    per_cluster: usize,
    centres: &[Point],
    spread: f64,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Point>> {
    let normal = Normal::new(0.0, spread)
        .map_err(|err| ClusterError::InvalidConfig(format!("invalid spread {spread}: {err}")))?;
    let mut points = Vec::with_capacity(per_cluster * centres.len());
    for centre in centres {
        for _ in 0..per_cluster {
            points.push(Point::new(
                centre.x + normal.sample(rng),
                centre.y + normal.sample(rng),
            ));
        }
    }
    Ok(points)
}

/// Convert an `n × 2` matrix into points.
pub fn points_from_matrix(matrix: &DataMatrix) -> Result<Vec<Point>> {
    if matrix.nrows() > 0 && matrix.ncols() != 2 {
        return Err(ClusterError::InvalidData(format!(
            "expected 2 columns (x, y), found {}",
            matrix.ncols()
        )));
    }
    Ok(matrix
        .rows()
        .into_iter()
        .map(|row| Point::new(row[0], row[1]))
        .collect())
}

/// Loads two-column numeric files into [`DataMatrix`] form.
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file with a header row and numeric columns.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<DataMatrix> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
        let mut values: Vec<f64> = Vec::new();
        let mut width = None;
        let mut rows = 0usize;
        for record in rdr.records() {
            let record = record?;
            if let Some(expected) = width {
                if expected != record.len() {
                    return Err(ClusterError::InvalidData(format!(
                        "found inconsistent row width: expected {expected}, got {}",
                        record.len()
                    )));
                }
            } else {
                width = Some(record.len());
            }
            for field in record.iter() {
                values.push(field.trim().parse()?);
            }
            rows += 1;
        }
        let Some(dim) = width else {
            return Ok(Array2::zeros((0, 2)));
        };
        Array2::from_shape_vec((rows, dim), values)
            .map_err(|err| ClusterError::InvalidData(err.to_string()))
    }

    /// Load a Parquet file whose columns are all integer or floating point.
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<DataMatrix> {
        let reader = SerializedFileReader::new(File::open(path)?)?;
        let width = reader.metadata().file_metadata().schema_descr().num_columns();
        let mut values: Vec<f64> = Vec::new();
        let mut rows = 0usize;
        for row in reader.get_row_iter(None)? {
            let row: Row = row?;
            for (column, (_, field)) in row.get_column_iter().enumerate() {
                values.push(numeric_field(field, column)?);
            }
            rows += 1;
        }
        if rows == 0 {
            return Ok(Array2::zeros((0, 2)));
        }
        Array2::from_shape_vec((rows, width), values)
            .map_err(|err| ClusterError::InvalidData(err.to_string()))
    }

    /// Load points from `path`, picking the format from its extension.
    pub fn load_points<P: AsRef<Path>>(path: P) -> Result<Vec<Point>> {
        let path = path.as_ref();
        let matrix = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if matches!(ext.to_ascii_lowercase().as_str(), "parquet" | "pq") => {
                Self::load_parquet(path)?
            }
            _ => Self::load_csv(path)?,
        };
        points_from_matrix(&matrix)
    }
}

fn numeric_field(field: &Field, column: usize) -> Result<f64> {
    let value = match field {
        Field::Double(v) => *v,
        Field::Float(v) => f64::from(*v),
        Field::Int(v) => f64::from(*v),
        Field::Long(v) => *v as f64,
        Field::Short(v) => f64::from(*v),
        Field::Byte(v) => f64::from(*v),
        Field::UInt(v) => f64::from(*v),
        Field::ULong(v) => *v as f64,
        Field::UShort(v) => f64::from(*v),
        Field::UByte(v) => f64::from(*v),
        Field::Null => {
            return Err(ClusterError::InvalidData(format!(
                "column {column} contained a NULL value which cannot be converted to f64"
            )))
        }
        other => {
            return Err(ClusterError::InvalidData(format!(
                "unsupported parquet field at column {column}: {other:?}"
            )))
        }
    };
    Ok(value)
}
