//! The in-memory table of all metric samples of one analysis run.
//! Filled completely before anything is computed from it.

use std::{collections::BTreeSet, fmt::Display};

use kstring::KString;
use serde::Serializer;

use crate::{
    sample::{MalformedRecordError, MetricRecord, MetricSample},
    warn,
};

fn serialize_display<T: Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// A record that was not ingested, and where it came from (file path
/// and line, or table row).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RejectedRecord {
    pub origin: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: MalformedRecordError,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedRecord>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Record the outcome of ingesting the record from `origin`,
    /// logging rejections.
    pub fn add<T>(&mut self, origin: impl Display, result: Result<T, MalformedRecordError>) {
        match result {
            Ok(_) => self.accepted += 1,
            Err(error) => {
                let origin = origin.to_string();
                warn!("skipping record from {origin}: {error}");
                self.rejected.push(RejectedRecord { origin, error });
            }
        }
    }

    pub fn merge(&mut self, other: IngestReport) {
        let IngestReport { accepted, rejected } = other;
        self.accepted += accepted;
        self.rejected.extend(rejected);
    }
}

/// Selects samples; `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    pub problem: Option<KString>,
    pub instance: Option<KString>,
    pub solver: Option<KString>,
    pub seed: Option<u64>,
    pub metric_name: Option<KString>,
}

impl SampleFilter {
    pub fn metric(metric_name: &str) -> Self {
        Self {
            metric_name: Some(KString::from_ref(metric_name)),
            ..Default::default()
        }
    }

    pub fn matches(&self, sample: &MetricSample) -> bool {
        self.matches_run(
            &sample.problem,
            &sample.instance,
            &sample.solver,
            sample.seed,
            &sample.metric_name,
        )
    }

    /// Match against the fields identifying one run and metric.
    pub fn matches_run(
        &self,
        problem: &str,
        instance: &str,
        solver: &str,
        seed: u64,
        metric_name: &str,
    ) -> bool {
        fn eq(want: &Option<KString>, have: &str) -> bool {
            want.as_ref().map_or(true, |want| want.as_str() == have)
        }
        eq(&self.problem, problem)
            && eq(&self.instance, instance)
            && eq(&self.solver, solver)
            && self.seed.map_or(true, |want| want == seed)
            && eq(&self.metric_name, metric_name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricStore {
    samples: Vec<MetricSample>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `record` and append it.
    pub fn ingest(&mut self, record: MetricRecord) -> Result<&MetricSample, MalformedRecordError> {
        let sample = MetricSample::try_from(record)?;
        self.samples.push(sample);
        Ok(self.samples.last().expect("just pushed"))
    }

    /// Ingest all records, skipping (and reporting) the invalid ones.
    pub fn ingest_all<O: Display>(
        &mut self,
        records: impl IntoIterator<Item = (O, Result<MetricRecord, MalformedRecordError>)>,
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
    ) -> impl Iterator<Item = &'s MetricSample> + 'f
    where
        's: 'f,
    {
        self.samples.iter().filter(|s| filter.matches(s))
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sorted, without duplicates.
    pub fn metric_names(&self) -> BTreeSet<KString> {
        self.samples.iter().map(|s| s.metric_name.clone()).collect()
    }
}

impl Extend<MetricSample> for MetricStore {
    fn extend<T: IntoIterator<Item = MetricSample>>(&mut self, iter: T) {
        self.samples.extend(iter)
    }
}
