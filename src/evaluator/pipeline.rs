//! From the stores to the result tables on disk. Every output is
//! computed independently: a failing table is logged and recorded in
//! the `EvaluationReport`, the others are still written.

use std::{
    collections::BTreeSet,
    fs::create_dir_all,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use kstring::KString;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use strum::IntoEnumIterator;

use crate::{
    aggregate::{aggregate, summarize_distribution, EmptyPartitionError, GroupingDimension},
    bounds::{objective_bounds, DisplayRange, InsufficientDataError},
    debug,
    experiment::ExperimentConfig,
    info,
    metric::{DirectionLookupError, DirectionRegistry, MetricDescriptor},
    rank::rank,
    record_source::{collect_front_points, RecordSource, FRONT_VERSIONS},
    sample::MetricSample,
    snapshot::{aligned_curves, SnapshotStore},
    store::{IngestReport, MetricStore, SampleFilter},
    tables::{
        csv_table::write_csv_file,
        long_table::{write_metrics_file, write_snapshots_file},
        result_tables::{BandsTable, DistributionTable, ObjectiveBoundsTable, RankedTable},
        table_view::TableView,
    },
    utillib::tempfile_utils::write_atomically,
    warn,
};

/// File name of the long metrics table in an output directory.
pub const METRICS_TABLE: &str = "metrics.csv";
/// File name of the long snapshot table in an output directory.
pub const SNAPSHOTS_TABLE: &str = "metrics_snapshots.csv";
pub const REPORT_FILE: &str = "evaluation_report.json";

/// Why one output table could not be computed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum OutputError {
    #[error("{0}")]
    EmptyPartition(#[from] EmptyPartitionError),
    #[error("{0}")]
    InsufficientData(#[from] InsufficientDataError),
    #[error("{0}")]
    DirectionLookup(#[from] DirectionLookupError),
    #[error("{0}")]
    Input(String),
}

/// Each entry is the name of the table, and the table or why it
/// couldn't be computed.
pub type Outputs<T> = Vec<(String, Result<T, OutputError>)>;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OutputFailure {
    pub output: String,
    pub error: String,
}

/// The extent of one solver's aligned snapshot curve.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CurveSummary {
    pub metric: KString,
    pub solver: KString,
    pub num_bands: usize,
    pub max_time: f64,
    pub value_range: DisplayRange,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct EvaluationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_ingest: Option<IngestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots_ingest: Option<IngestReport>,
    pub written: Vec<PathBuf>,
    pub failures: Vec<OutputFailure>,
    pub curves: Vec<CurveSummary>,
}

impl EvaluationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Write the tables in `outputs` to `dir`, recording the failed
    /// ones. Only IO errors are returned.
    pub fn write_tables<T: TableView>(&mut self, dir: &Path, outputs: Outputs<T>) -> Result<()> {
        for (name, output) in outputs {
            match output {
                Ok(table) => {
                    let path = write_csv_file(dir, &table)?;
                    self.written.push(path);
                }
                Err(e) => {
                    warn!("not writing {name}: {e}");
                    self.failures.push(OutputFailure {
                        output: name,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Write as JSON to `<dir>/evaluation_report.json`.
    pub fn write_file(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(REPORT_FILE);
        write_atomically(&path, |out| {
            serde_json::to_writer_pretty(&mut *out, self)?;
            writeln!(out)?;
            Ok(())
        })
        .with_context(|| anyhow!("writing evaluation report {path:?}"))?;
        info!("wrote {path:?}");
        Ok(path)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    create_dir_all(dir).with_context(|| anyhow!("creating output directory {dir:?}"))
}

pub struct Evaluator {
    config: ExperimentConfig,
    registry: DirectionRegistry,
}

impl Evaluator {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        let registry = config.direction_registry()?;
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn registry(&self) -> &DirectionRegistry {
        &self.registry
    }

    /// The metric names present in `names`, resolved to their
    /// descriptors, or the lookup error for unknown names.
    fn resolve<'n>(
        &self,
        names: impl IntoIterator<Item = &'n KString>,
    ) -> Vec<(&'n KString, Result<&MetricDescriptor, DirectionLookupError>)> {
        names
            .into_iter()
            .map(|name| (name, self.registry.descriptor(name)))
            .collect()
    }

    /// `f` for every metric and each of `dimensions`, in parallel.
    fn per_metric_and_dimension<T: Send>(
        &self,
        store: &MetricStore,
        dimensions: &[GroupingDimension],
        name_for: impl Fn(&str, GroupingDimension) -> String + Sync,
        f: impl Fn(&[&MetricSample], &MetricDescriptor, GroupingDimension) -> Result<T, OutputError>
            + Sync,
    ) -> Outputs<T> {
        let names = store.metric_names();
        let mut jobs = Vec::new();
        let mut outputs = Vec::new();
        for (name, descriptor) in self.resolve(&names) {
            match descriptor {
                Ok(descriptor) => {
                    let filter = SampleFilter::metric(name);
                    let samples: Vec<&MetricSample> = store.query(&filter).collect();
                    for dimension in dimensions {
                        jobs.push((samples.clone(), descriptor, *dimension));
                    }
                }
                Err(e) => outputs.push((name.to_string(), Err(e.into()))),
            }
        }
        outputs.extend(
            jobs.par_iter()
                .map(|(samples, descriptor, dimension)| {
                    (
                        name_for(&descriptor.code, *dimension),
                        f(samples.as_slice(), *descriptor, *dimension),
                    )
                })
                .collect::<Vec<_>>(),
        );
        outputs
    }

    /// The ranked table of every metric in `store`, ungrouped and by
    /// every grouping dimension.
    pub fn ranked_tables(&self, store: &MetricStore) -> Outputs<RankedTable> {
        let dimensions: Vec<GroupingDimension> = GroupingDimension::iter().collect();
        self.ranked_tables_by(store, &dimensions)
    }

    pub fn ranked_tables_by(
        &self,
        store: &MetricStore,
        dimensions: &[GroupingDimension],
    ) -> Outputs<RankedTable> {
        self.per_metric_and_dimension(
            store,
            dimensions,
            RankedTable::name_for,
            |samples, metric, dimension| {
                let cells = aggregate(samples.iter().copied(), &dimension.group_by())?;
                let rows = rank(cells, &self.registry)?;
                Ok(RankedTable {
                    metric: metric.clone(),
                    dimension,
                    rows,
                })
            },
        )
    }

    pub fn distribution_tables(&self, store: &MetricStore) -> Outputs<DistributionTable> {
        let dimensions: Vec<GroupingDimension> = GroupingDimension::iter().collect();
        self.per_metric_and_dimension(
            store,
            &dimensions,
            DistributionTable::name_for,
            |samples, metric, dimension| {
                let rows =
                    summarize_distribution(samples.iter().copied(), &dimension.group_by())?;
                Ok(DistributionTable {
                    metric: metric.clone(),
                    dimension,
                    rows,
                })
            },
        )
    }

    /// The aligned bands of every metric in `snapshots`.
    pub fn curve_tables(&self, snapshots: &SnapshotStore) -> Outputs<BandsTable> {
        let names: BTreeSet<KString> = snapshots
            .series()
            .iter()
            .map(|s| s.metric_name.clone())
            .collect();
        let resolved = self.resolve(&names);
        resolved
            .par_iter()
            .map(|(name, descriptor)| match descriptor {
                Ok(descriptor) => (
                    BandsTable::name_for(&descriptor.code),
                    aligned_curves(snapshots, name, descriptor.domain)
                        .map(|curves| BandsTable {
                            metric: (*descriptor).clone(),
                            curves,
                        })
                        .map_err(OutputError::from),
                ),
                Err(e) => (name.to_string(), Err(e.clone().into())),
            })
            .collect()
    }

    /// The objective-space ranges over all solvers' fronts, per
    /// instance and front version. Instances without any front of a
    /// version are left out.
    pub fn objective_bounds_tables(
        &self,
        source: &dyn RecordSource,
    ) -> Outputs<ObjectiveBoundsTable> {
        let keys: Vec<(&KString, &str)> = self
            .config
            .instances
            .keys()
            .flat_map(|instance| FRONT_VERSIONS.iter().map(move |version| (instance, *version)))
            .collect();
        let num_objectives = self.config.num_objectives;
        keys.par_iter()
            .filter_map(|(instance, version)| {
                let name = ObjectiveBoundsTable::name_for(instance, version);
                let points = match collect_front_points(source, &self.config, instance, version) {
                    Ok(Some(points)) => points,
                    Ok(None) => {
                        debug!("no {version} fronts for {instance}");
                        return None;
                    }
                    Err(e) => return Some((name, Err(OutputError::Input(format!("{e:#}"))))),
                };
                let table = objective_bounds(&points, num_objectives as usize)
                    .map(|ranges| ObjectiveBoundsTable {
                        instance: (*instance).clone(),
                        version: KString::from_ref(version),
                        num_points: points.len(),
                        ranges,
                    })
                    .map_err(OutputError::from);
                Some((name, table))
            })
            .collect()
    }

    /// Write the long metrics and snapshot tables to `dir`, returning
    /// their paths.
    pub fn write_long_tables(
        &self,
        store: &MetricStore,
        snapshots: &SnapshotStore,
        dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        ensure_dir(dir)?;
        let metrics_path = dir.join(METRICS_TABLE);
        write_metrics_file(&metrics_path, store.samples())?;
        let snapshots_path = dir.join(SNAPSHOTS_TABLE);
        write_snapshots_file(&snapshots_path, snapshots.series())?;
        Ok(vec![metrics_path, snapshots_path])
    }

    /// Write the ranked and distribution tables for `store` to `dir`.
    pub fn write_stats_tables(
        &self,
        store: &MetricStore,
        dir: &Path,
        report: &mut EvaluationReport,
    ) -> Result<()> {
        ensure_dir(dir)?;
        report.write_tables(dir, self.ranked_tables(store))?;
        report.write_tables(dir, self.distribution_tables(store))?;
        Ok(())
    }

    /// Write the snapshot band tables to `dir`, and add the curve
    /// summaries to `report`.
    pub fn write_curve_tables(
        &self,
        snapshots: &SnapshotStore,
        dir: &Path,
        report: &mut EvaluationReport,
    ) -> Result<()> {
        ensure_dir(dir)?;
        let outputs = self.curve_tables(snapshots);
        for table in outputs.iter().filter_map(|(_, t)| t.as_ref().ok()) {
            report
                .curves
                .extend(table.curves.iter().map(|curve| CurveSummary {
                    metric: table.metric.label.clone(),
                    solver: curve.solver.clone(),
                    num_bands: curve.bands.len(),
                    max_time: curve.max_time,
                    value_range: curve.value_range,
                }));
        }
        report.write_tables(dir, outputs)
    }

    /// Write the objective-space range tables for the fronts in
    /// `source` to `dir`.
    pub fn write_objective_bounds_tables(
        &self,
        source: &dyn RecordSource,
        dir: &Path,
        report: &mut EvaluationReport,
    ) -> Result<()> {
        ensure_dir(dir)?;
        report.write_tables(dir, self.objective_bounds_tables(source))
    }

    /// Write all outputs for the given stores to `output_dir`. The
    /// report is not written; the caller may add the ingest reports
    /// first.
    pub fn run(
        &self,
        store: &MetricStore,
        snapshots: &SnapshotStore,
        output_dir: &Path,
    ) -> Result<EvaluationReport> {
        let mut report = EvaluationReport::default();
        report.written = self.write_long_tables(store, snapshots, output_dir)?;
        self.write_stats_tables(store, output_dir, &mut report)?;
        if snapshots.is_empty() {
            info!("no snapshot series, not computing curves");
        } else {
            self.write_curve_tables(snapshots, output_dir, &mut report)?;
        }
        info!(
            "wrote {} files, {} outputs failed",
            report.written.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record_source::{front_path, MemorySource},
        sample::{attribute, AttributeValue, MetricRecord},
        snapshot::{RawSnapshotPoint, SnapshotRecord},
    };

    fn record(
        instance: &str,
        jobs: i64,
        solver: &str,
        seed: u64,
        metric: &str,
        value: f64,
    ) -> MetricRecord {
        MetricRecord {
            problem: Some("MOFJSSP".into()),
            instance: Some(KString::from_ref(instance)),
            solver: Some(KString::from_ref(solver)),
            seed: Some(seed),
            metric_name: Some(KString::from_ref(metric)),
            value: Some(value),
            attributes: [(
                KString::from_static(attribute::NUM_JOBS),
                AttributeValue::Int(jobs),
            )]
            .into_iter()
            .collect(),
        }
    }

    fn store() -> Result<MetricStore> {
        let mut store = MetricStore::new();
        for r in [
            record("mk01", 10, "IHS", 1, "Hypervolume Ratio", 0.5),
            record("mk01", 10, "IHS", 2, "Hypervolume Ratio", 0.7),
            record("mk01", 10, "NSGA-II", 1, "Hypervolume Ratio", 0.8),
            record("mk04", 15, "IHS", 1, "Hypervolume Ratio", 0.9),
            record("mk04", 15, "NSGA-II", 1, "Hypervolume Ratio", 0.4),
            record("mk01", 10, "IHS", 1, "mystery", 1.0),
        ] {
            store.ingest(r)?;
        }
        Ok(store)
    }

    #[test]
    fn t_ranked_tables() -> Result<()> {
        let evaluator = Evaluator::new(ExperimentConfig::builtin())?;
        let outputs = evaluator.ranked_tables(&store()?);
        let names: Vec<&str> = outputs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "mystery",
                "hypervolume_stats",
                "hypervolume_by_jobs_stats",
                "hypervolume_by_machines_stats",
                "hypervolume_by_operations_stats",
                "hypervolume_by_objectives_stats",
            ]
        );
        assert_eq!(
            outputs[0].1.as_ref().err(),
            Some(&OutputError::DirectionLookup(DirectionLookupError(
                "mystery".into()
            )))
        );

        let ungrouped = outputs[1].1.as_ref().map_err(|e| anyhow!("{e}"))?;
        let ranks: Vec<(&str, usize)> = ungrouped
            .rows
            .iter()
            .map(|r| (r.cell.key.solver.as_str(), r.rank))
            .collect();
        // IHS: (0.5 + 0.7 + 0.9) / 3 = 0.7, NSGA-II: 0.6
        assert_eq!(ranks, [("IHS", 1), ("NSGA-II", 2)]);

        let by_jobs = outputs[2].1.as_ref().map_err(|e| anyhow!("{e}"))?;
        assert_eq!(by_jobs.rows.len(), 4);
        assert_eq!(by_jobs.rows[0].cell.key.solver.as_str(), "NSGA-II");
        assert_eq!(by_jobs.rows[2].cell.key.solver.as_str(), "IHS");

        // no sample has the machines attribute
        assert!(matches!(outputs[3].1, Err(OutputError::EmptyPartition(_))));
        Ok(())
    }

    #[test]
    fn t_curve_tables() -> Result<()> {
        let evaluator = Evaluator::new(ExperimentConfig::builtin())?;
        let mut snapshots = SnapshotStore::new();
        for (solver, seed) in [("IHS", 1), ("IHS", 2), ("NSGA-II", 1)] {
            snapshots.ingest(SnapshotRecord {
                problem: Some("MOFJSSP".into()),
                instance: Some("mk01".into()),
                solver: Some(KString::from_static(solver)),
                seed: Some(seed),
                metric_name: Some("Hypervolume Ratio".into()),
                attributes: Default::default(),
                points: vec![RawSnapshotPoint {
                    index: Some(0),
                    time: 1.0,
                    value: 0.25 * seed as f64,
                }],
            })?;
        }
        let outputs = evaluator.curve_tables(&snapshots);
        assert_eq!(outputs.len(), 1);
        let (name, table) = &outputs[0];
        assert_eq!(name, "hypervolume_snapshot_bands");
        let table = table.as_ref().map_err(|e| anyhow!("{e}"))?;
        assert_eq!(table.curves.len(), 2);
        assert_eq!(table.curves[0].bands[0].contributing, 2);
        Ok(())
    }

    #[test]
    fn t_objective_bounds_tables() -> Result<()> {
        let mut config = ExperimentConfig::builtin();
        config.num_objectives = 2;
        let evaluator = Evaluator::new(config)?;
        let mut source = MemorySource::default();
        source
            .files
            .insert(front_path("mk01", "nsga2", "best"), "10 200\n30 100\n".into());
        source
            .files
            .insert(front_path("mk01", "moead", "best"), "50 0\n".into());
        source
            .files
            .insert(front_path("mk02", "ihs", "median"), "1\n".into());
        source
            .files
            .insert(front_path("mk03", "ihs", "best"), "1 2\n1 x\n".into());

        let outputs = evaluator.objective_bounds_tables(&source);
        let names: Vec<&str> = outputs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "mk01_best_objective_bounds",
                "mk02_median_objective_bounds",
                "mk03_best_objective_bounds",
            ]
        );
        let mk01 = outputs[0].1.as_ref().map_err(|e| anyhow!("{e}"))?;
        assert_eq!(mk01.num_points, 3);
        // 0.025 * 40 = 1, 0.025 * 200 = 5
        assert_eq!(
            mk01.ranges,
            [
                DisplayRange { low: 9., high: 51. },
                DisplayRange {
                    low: -5.,
                    high: 205.
                }
            ]
        );
        // too few objectives in every vector
        assert!(matches!(
            outputs[1].1,
            Err(OutputError::InsufficientData(_))
        ));
        assert!(matches!(
            &outputs[2].1,
            Err(OutputError::Input(msg)) if msg.contains("line 2")
        ));
        Ok(())
    }
}
