//! The flat long-format tables, one row per sample (or per snapshot
//! point): the exchange format between collection and evaluation.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{Read, Write},
    path::Path,
    str::FromStr,
};

use anyhow::{anyhow, Context, Result};
use kstring::KString;

use crate::{
    info,
    sample::{
        attribute, AttributeValue, Attributes, MalformedRecordError, MetricRecord, MetricSample,
    },
    snapshot::{RawSnapshotPoint, SnapshotRecord, SnapshotSeries, SnapshotStore},
    store::{IngestReport, MetricStore},
    utillib::tempfile_utils::write_atomically,
};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct MetricRow {
    problem: KString,
    instance: KString,
    #[serde(rename = "number of objectives")]
    num_objectives: Option<String>,
    #[serde(rename = "chromosome size")]
    chromosome_size: Option<String>,
    #[serde(rename = "number of jobs")]
    num_jobs: Option<String>,
    #[serde(rename = "number of machines")]
    num_machines: Option<String>,
    #[serde(rename = "total number of operations")]
    total_num_operations: Option<String>,
    solver: KString,
    seed: u64,
    #[serde(rename = "metric name")]
    metric_name: KString,
    #[serde(rename = "metric value")]
    metric_value: f64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotRow {
    problem: KString,
    instance: KString,
    #[serde(rename = "number of objectives")]
    num_objectives: Option<String>,
    #[serde(rename = "chromosome size")]
    chromosome_size: Option<String>,
    solver: KString,
    seed: u64,
    #[serde(rename = "metric name")]
    metric_name: KString,
    #[serde(rename = "snapshot time")]
    snapshot_time: f64,
    #[serde(rename = "metric value")]
    metric_value: f64,
}

fn attribute_column(attributes: &Attributes, name: &str) -> Option<String> {
    attributes.get(name).map(|v| v.to_string())
}

/// Attributes from the non-empty attribute columns.
fn attributes_from_columns<'c>(
    columns: impl IntoIterator<Item = (&'static str, &'c Option<String>)>,
) -> Attributes {
    columns
        .into_iter()
        .filter_map(|(name, value)| {
            let value = value.as_deref()?.trim();
            if value.is_empty() {
                return None;
            }
            let value = match AttributeValue::from_str(value) {
                Ok(value) => value,
                Err(never) => match never {},
            };
            Some((KString::from_static(name), value))
        })
        .collect()
}

fn row_error(e: csv::Error) -> MalformedRecordError {
    MalformedRecordError::Row(e.to_string())
}

/// The line number of a data row (the header is line 1).
fn row_origin(origin: &str, row_index: usize) -> String {
    format!("{origin}:{}", row_index + 2)
}

pub fn write_metrics<'s>(
    samples: impl IntoIterator<Item = &'s MetricSample>,
    out: impl Write,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for sample in samples {
        let MetricSample {
            problem,
            instance,
            solver,
            seed,
            metric_name,
            value,
            attributes,
        } = sample;
        writer.serialize(MetricRow {
            problem: problem.clone(),
            instance: instance.clone(),
            num_objectives: attribute_column(attributes, attribute::NUM_OBJECTIVES),
            chromosome_size: attribute_column(attributes, attribute::CHROMOSOME_SIZE),
            num_jobs: attribute_column(attributes, attribute::NUM_JOBS),
            num_machines: attribute_column(attributes, attribute::NUM_MACHINES),
            total_num_operations: attribute_column(attributes, attribute::TOTAL_NUM_OPERATIONS),
            solver: solver.clone(),
            seed: *seed,
            metric_name: metric_name.clone(),
            metric_value: value.raw(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Ingest the rows of a long metrics table into `store`. Rows that
/// can't be read or are invalid are skipped and reported.
pub fn read_metrics(input: impl Read, origin: &str, store: &mut MetricStore) -> IngestReport {
    let mut reader = csv::Reader::from_reader(input);
    let records = reader
        .deserialize::<MetricRow>()
        .enumerate()
        .map(|(i, row)| {
            let record = row.map_err(row_error).map(|row| {
                let attributes = attributes_from_columns([
                    (attribute::NUM_OBJECTIVES, &row.num_objectives),
                    (attribute::CHROMOSOME_SIZE, &row.chromosome_size),
                    (attribute::NUM_JOBS, &row.num_jobs),
                    (attribute::NUM_MACHINES, &row.num_machines),
                    (attribute::TOTAL_NUM_OPERATIONS, &row.total_num_operations),
                ]);
                MetricRecord {
                    problem: Some(row.problem),
                    instance: Some(row.instance),
                    solver: Some(row.solver),
                    seed: Some(row.seed),
                    metric_name: Some(row.metric_name),
                    value: Some(row.metric_value),
                    attributes,
                }
            });
            (row_origin(origin, i), record)
        });
    store.ingest_all(records)
}

pub fn write_snapshots<'s>(
    series: impl IntoIterator<Item = &'s SnapshotSeries>,
    out: impl Write,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for series in series {
        for point in &series.points {
            writer.serialize(SnapshotRow {
                problem: series.problem.clone(),
                instance: series.instance.clone(),
                num_objectives: attribute_column(&series.attributes, attribute::NUM_OBJECTIVES),
                chromosome_size: attribute_column(&series.attributes, attribute::CHROMOSOME_SIZE),
                solver: series.solver.clone(),
                seed: series.seed,
                metric_name: series.metric_name.clone(),
                snapshot_time: point.time,
                metric_value: point.value,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

type SeriesKey = (KString, KString, KString, u64, KString);

/// Ingest a long snapshot table into `store`. Rows are grouped into
/// series by (problem, instance, solver, seed, metric); the snapshot
/// index of a point is its position among the rows of its series.
pub fn read_snapshots(input: impl Read, origin: &str, store: &mut SnapshotStore) -> IngestReport {
    let mut reader = csv::Reader::from_reader(input);
    let mut report = IngestReport::default();
    // Series in order of first appearance, with the row of first
    // appearance as origin
    let mut positions: BTreeMap<SeriesKey, usize> = BTreeMap::new();
    let mut records: Vec<(String, SnapshotRecord)> = Vec::new();
    for (i, row) in reader.deserialize::<SnapshotRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                report.add::<()>(row_origin(origin, i), Err(row_error(e)));
                continue;
            }
        };
        let key = (
            row.problem.clone(),
            row.instance.clone(),
            row.solver.clone(),
            row.seed,
            row.metric_name.clone(),
        );
        let position = *positions.entry(key).or_insert_with(|| {
            let attributes = attributes_from_columns([
                (attribute::NUM_OBJECTIVES, &row.num_objectives),
                (attribute::CHROMOSOME_SIZE, &row.chromosome_size),
            ]);
            records.push((
                row_origin(origin, i),
                SnapshotRecord {
                    problem: Some(row.problem.clone()),
                    instance: Some(row.instance.clone()),
                    solver: Some(row.solver.clone()),
                    seed: Some(row.seed),
                    metric_name: Some(row.metric_name.clone()),
                    attributes,
                    points: Vec::new(),
                },
            ));
            records.len() - 1
        });
        records[position].1.points.push(RawSnapshotPoint {
            index: None,
            time: row.snapshot_time,
            value: row.metric_value,
        });
    }
    report.merge(store.ingest_all(records.into_iter().map(|(o, r)| (o, Ok(r)))));
    report
}

pub fn write_metrics_file<'s>(
    path: &Path,
    samples: impl IntoIterator<Item = &'s MetricSample>,
) -> Result<()> {
    write_atomically(path, |out| write_metrics(samples, out))
        .with_context(|| anyhow!("writing metrics table {path:?}"))?;
    info!("wrote {path:?}");
    Ok(())
}

pub fn write_snapshots_file<'s>(
    path: &Path,
    series: impl IntoIterator<Item = &'s SnapshotSeries>,
) -> Result<()> {
    write_atomically(path, |out| write_snapshots(series, out))
        .with_context(|| anyhow!("writing snapshots table {path:?}"))?;
    info!("wrote {path:?}");
    Ok(())
}

pub fn read_metrics_file(path: &Path) -> Result<(MetricStore, IngestReport)> {
    let file = File::open(path).with_context(|| anyhow!("opening metrics table {path:?}"))?;
    let mut store = MetricStore::new();
    let report = read_metrics(file, &path.to_string_lossy(), &mut store);
    info!("read {} samples from {path:?}", store.len());
    Ok((store, report))
}

pub fn read_snapshots_file(path: &Path) -> Result<(SnapshotStore, IngestReport)> {
    let file = File::open(path).with_context(|| anyhow!("opening snapshots table {path:?}"))?;
    let mut store = SnapshotStore::new();
    let report = read_snapshots(file, &path.to_string_lossy(), &mut store);
    info!("read {} snapshot series from {path:?}", store.series().len());
    Ok((store, report))
}
