//! Per-seed metric trajectories over time, and their alignment across
//! seeds by snapshot index.

use std::{collections::BTreeMap, fmt::Display};

use kstring::KString;

use crate::{
    bounds::{bounds, DisplayRange, DomainClamp, InsufficientDataError},
    debug,
    sample::{finite, required_str, Attributes, MalformedRecordError},
    stats::{self, Quartiles, SampleStats},
    store::{IngestReport, SampleFilter},
};

/// One validated point of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotPoint {
    /// Position in the series, starting at 0
    pub index: usize,
    /// Elapsed time in seconds
    pub time: f64,
    pub value: f64,
}

/// A trajectory point as read; `index` is absent for sources that
/// give the points in order without numbering them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSnapshotPoint {
    pub index: Option<u64>,
    pub time: f64,
    pub value: f64,
}

/// An unvalidated trajectory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotRecord {
    pub problem: Option<KString>,
    pub instance: Option<KString>,
    pub solver: Option<KString>,
    pub seed: Option<u64>,
    pub metric_name: Option<KString>,
    pub attributes: Attributes,
    pub points: Vec<RawSnapshotPoint>,
}

/// One seed's trajectory for one (instance, solver, metric). The
/// point at position `i` has index `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSeries {
    pub problem: KString,
    pub instance: KString,
    pub solver: KString,
    pub seed: u64,
    pub metric_name: KString,
    pub attributes: Attributes,
    pub points: Vec<SnapshotPoint>,
}

impl SnapshotSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TryFrom<SnapshotRecord> for SnapshotSeries {
    type Error = MalformedRecordError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let SnapshotRecord {
            problem,
            instance,
            solver,
            seed,
            metric_name,
            attributes,
            points,
        } = record;
        let points = points
            .into_iter()
            .enumerate()
            .map(|(expected, RawSnapshotPoint { index, time, value })| {
                if let Some(found) = index {
                    if found != expected as u64 {
                        return Err(MalformedRecordError::SnapshotIndex { expected, found });
                    }
                }
                Ok(SnapshotPoint {
                    index: expected,
                    time: finite("snapshot time", time)?.raw(),
                    value: finite("metric value", value)?.raw(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SnapshotSeries {
            problem: required_str("problem", problem)?,
            instance: required_str("instance", instance)?,
            solver: required_str("solver", solver)?,
            seed: seed.ok_or(MalformedRecordError::MissingField("seed"))?,
            metric_name: required_str("metric name", metric_name)?,
            attributes,
            points,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    series: Vec<SnapshotSeries>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(
        &mut self,
        record: SnapshotRecord,
    ) -> Result<&SnapshotSeries, MalformedRecordError> {
        self.series.push(record.try_into()?);
        Ok(self.series.last().expect("just pushed"))
    }

    /// Ingest all records; a record with any bad point is skipped as
    /// a whole and reported.
    pub fn ingest_all<O: Display>(
        &mut self,
        records: impl IntoIterator<Item = (O, Result<SnapshotRecord, MalformedRecordError>)>,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        for (origin, record) in records {
            let result = record.and_then(|record| self.ingest(record).map(|_| ()));
            report.add(origin, result);
        }
        report
    }

    /// In ingestion order.
    pub fn query<'s, 'f>(
        &'s self,
        filter: &'f SampleFilter,
    ) -> impl Iterator<Item = &'s SnapshotSeries> + 'f
    where
        's: 'f,
    {
        self.series.iter().filter(|s| {
            filter.matches_run(&s.problem, &s.instance, &s.solver, s.seed, &s.metric_name)
        })
    }

    pub fn series(&self) -> &[SnapshotSeries] {
        &self.series
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// The summary of all seeds' values at one snapshot index.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBand {
    pub index: usize,
    pub mean_time: f64,
    pub mean_value: f64,
    pub quartiles: Quartiles,
    /// The number of series reaching this index
    pub contributing: usize,
}

/// Align `series` by snapshot index (no interpolation over time). The
/// band at index `k` is computed from all series with more than `k`
/// points, so there is one band per index up to the longest series.
pub fn align(series: &[&SnapshotSeries]) -> Vec<AlignedBand> {
    let max_len = series.iter().map(|s| s.len()).max().unwrap_or(0);
    (0..max_len)
        .map(|index| {
            let (times, values): (Vec<f64>, Vec<f64>) = series
                .iter()
                .filter_map(|s| s.points.get(index))
                .map(|p| (p.time, p.value))
                .unzip();
            let contributing = values.len();
            // At least the longest series contributes, and points are
            // finite.
            let mean_time = stats::mean(times).expect("non-empty");
            let value_stats = SampleStats::from_values(values).expect("non-empty finite values");
            AlignedBand {
                index,
                mean_time,
                mean_value: value_stats.mean,
                quartiles: value_stats.quartiles,
                contributing,
            }
        })
        .collect()
}

/// The aligned bands of one solver for one metric, with the data
/// needed to scale a plot of them.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedCurve {
    pub solver: KString,
    pub metric_name: KString,
    pub bands: Vec<AlignedBand>,
    /// The largest elapsed time of any point
    pub max_time: f64,
    /// Over all point values, clamped to the metric's domain
    pub value_range: DisplayRange,
}

impl AlignedCurve {
    pub fn from_series(
        solver: KString,
        metric_name: KString,
        series: &[&SnapshotSeries],
        domain: Option<DomainClamp>,
    ) -> Result<Self, InsufficientDataError> {
        let points = || series.iter().flat_map(|s| s.points.iter());
        let value_range = bounds(points().map(|p| p.value), domain)?;
        let max_time = points().map(|p| p.time).fold(f64::NEG_INFINITY, f64::max);
        Ok(AlignedCurve {
            solver,
            metric_name,
            bands: align(series),
            max_time,
            value_range,
        })
    }
}

/// One curve per solver (sorted by solver) over all instances and
/// seeds stored for `metric_name`. Series without points are left
/// out, so a solver with only empty series gets no curve.
pub fn aligned_curves(
    store: &SnapshotStore,
    metric_name: &str,
    domain: Option<DomainClamp>,
) -> Result<Vec<AlignedCurve>, InsufficientDataError> {
    let filter = SampleFilter::metric(metric_name);
    let mut by_solver: BTreeMap<&KString, Vec<&SnapshotSeries>> = BTreeMap::new();
    for series in store.query(&filter) {
        if series.is_empty() {
            debug!(
                "{metric_name}: empty series for {} {} seed {}, left out",
                series.instance, series.solver, series.seed
            );
            continue;
        }
        by_solver.entry(&series.solver).or_default().push(series);
    }
    if by_solver.is_empty() {
        return Err(InsufficientDataError);
    }
    by_solver
        .into_iter()
        .map(|(solver, series)| {
            AlignedCurve::from_series(
                solver.clone(),
                KString::from_ref(metric_name),
                &series,
                domain,
            )
        })
        .collect()
}
