//! Where the raw measurements come from: one text file per metric and
//! run (instance, solver, seed), either with the final metric values
//! or with the metric's trajectory over time.

use std::{
    collections::BTreeMap,
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{anyhow, bail, Context, Result};
use kstring::KString;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    debug,
    experiment::ExperimentConfig,
    info,
    metric::MetricDescriptor,
    sample::{parse_finite, MalformedRecordError, MetricRecord},
    snapshot::{RawSnapshotPoint, SnapshotRecord, SnapshotStore},
    store::{IngestReport, MetricStore},
};

/// One run of a solver, as named in input file names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunKey {
    pub instance: KString,
    /// The solver's code, not label
    pub solver: KString,
    pub seed: u64,
}

impl Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            instance,
            solver,
            seed,
        } = self;
        write!(f, "{instance}_{solver}_{seed}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// One final metric value per line
    Scalar,
    /// `index, time, value` per line
    Snapshots,
}

impl FileKind {
    /// `<metric_code>/<run>.txt` or `<metric_code>_snapshots/<run>.txt`
    pub fn relative_path(self, metric_code: &str, run: &RunKey) -> PathBuf {
        let dir = match self {
            FileKind::Scalar => metric_code.to_string(),
            FileKind::Snapshots => format!("{metric_code}_snapshots"),
        };
        PathBuf::from(dir).join(format!("{run}.txt"))
    }
}

/// Access to the input files by relative path.
pub trait RecordSource: Sync {
    /// `Ok(None)` if there is no file at `relative_path`, which is not
    /// an error: there are simply no samples for that key.
    fn read(&self, relative_path: &Path) -> Result<Option<String>>;

    /// For messages.
    fn describe(&self, relative_path: &Path) -> String;
}

/// Input files below a base directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    pub base_dir: PathBuf,
}

impl DirectorySource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl RecordSource for DirectorySource {
    fn read(&self, relative_path: &Path) -> Result<Option<String>> {
        let path = self.base_dir.join(relative_path);
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) => match e.kind() {
                std::io::ErrorKind::NotFound => Ok(None),
                _ => Err(e).with_context(|| anyhow!("reading file {path:?}")),
            },
        }
    }

    fn describe(&self, relative_path: &Path) -> String {
        self.base_dir.join(relative_path).to_string_lossy().into_owned()
    }
}

/// Input files held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub files: BTreeMap<PathBuf, String>,
}

impl MemorySource {
    pub fn insert(&mut self, kind: FileKind, metric_code: &str, run: &RunKey, contents: &str) {
        self.files
            .insert(kind.relative_path(metric_code, run), contents.into());
    }
}

impl RecordSource for MemorySource {
    fn read(&self, relative_path: &Path) -> Result<Option<String>> {
        Ok(self.files.get(relative_path).cloned())
    }

    fn describe(&self, relative_path: &Path) -> String {
        format!("<memory>/{}", relative_path.to_string_lossy())
    }
}

/// The value of each non-blank line (the first comma-separated field),
/// with the 1-based line number.
pub fn parse_scalar_lines(text: &str) -> Vec<(usize, Result<f64, MalformedRecordError>)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let field = line.split(',').next().unwrap_or(line);
            (i + 1, parse_finite("metric value", field).map(|v| v.raw()))
        })
        .collect()
}

/// Parse `index, time, value` lines (comma or whitespace delimited,
/// blank lines ignored). Index order is checked when the points are
/// ingested.
pub fn parse_snapshot_lines(text: &str) -> Result<Vec<RawSnapshotPoint>, MalformedRecordError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let fields: Vec<&str> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .collect();
            let [index, time, value] = fields[..] else {
                return Err(MalformedRecordError::Row(format!(
                    "line {}: expected 3 fields, got {}",
                    i + 1,
                    fields.len()
                )));
            };
            let index = u64::from_str(index).map_err(|e| MalformedRecordError::Unparseable {
                field: "snapshot index",
                text: index.into(),
                reason: e.to_string(),
            })?;
            let parse = |field: &'static str, text: &str| {
                f64::from_str(text).map_err(|e| MalformedRecordError::Unparseable {
                    field,
                    text: text.into(),
                    reason: e.to_string(),
                })
            };
            Ok(RawSnapshotPoint {
                index: Some(index),
                time: parse("snapshot time", time)?,
                value: parse("metric value", value)?,
            })
        })
        .collect()
}

/// The solution sets kept per (instance, solver): the best and the
/// median run.
pub const FRONT_VERSIONS: [&str; 2] = ["best", "median"];

/// `pareto/<instance>_<solver_code>_<version>.txt`
pub fn front_path(instance: &str, solver_code: &str, version: &str) -> PathBuf {
    PathBuf::from("pareto").join(format!("{instance}_{solver_code}_{version}.txt"))
}

/// Parse objective vectors, one per line, space separated, with an
/// optional header line (a first line that does not parse as
/// numbers).
pub fn parse_objective_points(text: &str, origin: &str) -> Result<Vec<Vec<f64>>> {
    let mut points = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let point: Result<Vec<f64>, _> = line.split_whitespace().map(f64::from_str).collect();
        match point {
            Ok(point) => {
                if let Some(x) = point.iter().find(|x| !x.is_finite()) {
                    bail!("{origin} line {}: non-finite value {x}", i + 1)
                }
                points.push(point)
            }
            Err(_) if i == 0 => debug!("{origin}: skipping header line {line:?}"),
            Err(e) => bail!("{origin} line {}: {e}", i + 1),
        }
    }
    Ok(points)
}

/// The objective vectors in the file at `relative_path`, `None` if
/// there is no such file.
pub fn read_objective_points(
    source: &dyn RecordSource,
    relative_path: &Path,
) -> Result<Option<Vec<Vec<f64>>>> {
    let Some(text) = source.read(relative_path)? else {
        return Ok(None);
    };
    parse_objective_points(&text, &source.describe(relative_path)).map(Some)
}

/// The points of the `version` fronts of all solvers of `config` for
/// `instance`; `None` if no solver has such a front.
pub fn collect_front_points(
    source: &dyn RecordSource,
    config: &ExperimentConfig,
    instance: &str,
    version: &str,
) -> Result<Option<Vec<Vec<f64>>>> {
    let mut all: Option<Vec<Vec<f64>>> = None;
    for solver in &config.solvers {
        let path = front_path(instance, &solver.code, version);
        match read_objective_points(source, &path)? {
            Some(points) => all.get_or_insert_with(Vec::new).extend(points),
            None => debug!("no front {}", source.describe(&path)),
        }
    }
    Ok(all)
}

/// The contents of all stores collected from a source.
#[derive(Debug, Default)]
pub struct Collected {
    pub metrics: MetricStore,
    pub metrics_report: IngestReport,
    pub snapshots: SnapshotStore,
    pub snapshots_report: IngestReport,
}

/// A file's origin and contents, `None` if there is no file.
type FileContents = Result<Option<(String, String)>, (String, MalformedRecordError)>;

struct RunFiles {
    scalar: FileContents,
    snapshots: FileContents,
}

/// The contents of a readable file; a read error is reported as a
/// rejection of the whole file.
fn readable(contents: FileContents, report: &mut IngestReport) -> Option<(String, String)> {
    match contents {
        Ok(contents) => contents,
        Err((origin, error)) => {
            report.add(origin, Err::<(), _>(error));
            None
        }
    }
}

/// Read the scalar and snapshot files of every (instance, solver,
/// seed, metric) of `config` from `source`; files are read in
/// parallel, but ingested in key order. Missing files are skipped,
/// malformed records and unreadable files are reported.
pub fn collect_samples(source: &dyn RecordSource, config: &ExperimentConfig) -> Result<Collected> {
    let mut keys: Vec<(RunKey, &MetricDescriptor, &KString)> = Vec::new();
    for instance in config.instances.keys() {
        for solver in &config.solvers {
            for seed in &config.seeds {
                for metric in &config.metrics {
                    let run = RunKey {
                        instance: instance.clone(),
                        solver: solver.code.clone(),
                        seed: *seed,
                    };
                    keys.push((run, metric, &solver.label));
                }
            }
        }
    }

    let read = |kind: FileKind, metric: &MetricDescriptor, run: &RunKey| -> FileContents {
        let path = kind.relative_path(&metric.code, run);
        let origin = source.describe(&path);
        match source.read(&path) {
            Ok(Some(contents)) => Ok(Some((origin, contents))),
            Ok(None) => {
                debug!("no file {origin}");
                Ok(None)
            }
            Err(e) => Err((origin, MalformedRecordError::Unreadable(format!("{e:#}")))),
        }
    };
    let files: Vec<RunFiles> = keys
        .par_iter()
        .map(|(run, metric, _)| RunFiles {
            scalar: read(FileKind::Scalar, *metric, run),
            snapshots: read(FileKind::Snapshots, *metric, run),
        })
        .collect();

    let mut collected = Collected::default();
    for ((run, metric, solver_label), files) in keys.iter().zip(files) {
        let attributes = config
            .instance_attributes(&run.instance)
            .expect("instance is taken from the config");
        let RunFiles { scalar, snapshots } = files;
        if let Some((origin, text)) = readable(scalar, &mut collected.metrics_report) {
            let records = parse_scalar_lines(&text).into_iter().map(|(line, value)| {
                let record = value.map(|value| MetricRecord {
                    problem: Some(config.problem.clone()),
                    instance: Some(run.instance.clone()),
                    solver: Some((*solver_label).clone()),
                    seed: Some(run.seed),
                    metric_name: Some(metric.label.clone()),
                    value: Some(value),
                    attributes: attributes.clone(),
                });
                (format!("{origin}:{line}"), record)
            });
            let report = collected.metrics.ingest_all(records);
            collected.metrics_report.merge(report);
        }
        if let Some((origin, text)) = readable(snapshots, &mut collected.snapshots_report) {
            let record = parse_snapshot_lines(&text).map(|points| SnapshotRecord {
                problem: Some(config.problem.clone()),
                instance: Some(run.instance.clone()),
                solver: Some((*solver_label).clone()),
                seed: Some(run.seed),
                metric_name: Some(metric.label.clone()),
                attributes: attributes.clone(),
                points,
            });
            let report = collected.snapshots.ingest_all([(origin, record)]);
            collected.snapshots_report.merge(report);
        }
    }
    info!(
        "collected {} samples and {} snapshot series ({} and {} records rejected)",
        collected.metrics.len(),
        collected.snapshots.series().len(),
        collected.metrics_report.rejected.len(),
        collected.snapshots_report.rejected.len()
    );
    Ok(collected)
}
