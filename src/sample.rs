//! A single measurement of a quality metric for one solver run, and
//! the unvalidated record it is created from.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use kstring::KString;
use noisy_float::types::R64;

/// The attribute names used for the covariates of samples, equal to
/// the column titles of the long-format tables.
pub mod attribute {
    pub const NUM_OBJECTIVES: &str = "number of objectives";
    pub const CHROMOSOME_SIZE: &str = "chromosome size";
    pub const NUM_JOBS: &str = "number of jobs";
    pub const NUM_MACHINES: &str = "number of machines";
    pub const TOTAL_NUM_OPERATIONS: &str = "total number of operations";
}

/// A scalar covariate of a sample, usable as grouping key.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Text(KString),
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Int(value.into())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(KString::from_ref(value))
    }
}

impl FromStr for AttributeValue {
    type Err = std::convert::Infallible;

    /// Integers become `Int`, everything else `Text`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match i64::from_str(s) {
            Ok(i) => AttributeValue::Int(i),
            Err(_) => AttributeValue::Text(KString::from_ref(s)),
        })
    }
}

pub type Attributes = BTreeMap<KString, AttributeValue>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MalformedRecordError {
    #[error("missing required field {0:?}")]
    MissingField(&'static str),
    #[error("field {field:?}: {value} is not a finite number")]
    NonFinite { field: &'static str, value: f64 },
    #[error("field {field:?}: can't parse {text:?}: {reason}")]
    Unparseable {
        field: &'static str,
        text: String,
        reason: String,
    },
    #[error("snapshot index {found} found where {expected} was expected")]
    SnapshotIndex { expected: usize, found: u64 },
    #[error("invalid table row: {0}")]
    Row(String),
    #[error("can't read input: {0}")]
    Unreadable(String),
}

/// Parse a floating point number, which must be finite.
pub fn parse_finite(field: &'static str, text: &str) -> Result<R64, MalformedRecordError> {
    let text = text.trim();
    let value = f64::from_str(text).map_err(|e| MalformedRecordError::Unparseable {
        field,
        text: text.into(),
        reason: e.to_string(),
    })?;
    finite(field, value)
}

pub fn finite(field: &'static str, value: f64) -> Result<R64, MalformedRecordError> {
    R64::try_new(value).ok_or(MalformedRecordError::NonFinite { field, value })
}

/// One measurement. Created by `MetricStore::ingest` only, immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricSample {
    pub problem: KString,
    pub instance: KString,
    pub solver: KString,
    pub seed: u64,
    pub metric_name: KString,
    pub value: R64,
    pub attributes: Attributes,
}

impl MetricSample {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// An unvalidated measurement as read from some source; all fields
/// but `attributes` are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRecord {
    pub problem: Option<KString>,
    pub instance: Option<KString>,
    pub solver: Option<KString>,
    pub seed: Option<u64>,
    pub metric_name: Option<KString>,
    pub value: Option<f64>,
    pub attributes: Attributes,
}

/// Empty strings count as missing.
pub(crate) fn required_str(
    field: &'static str,
    value: Option<KString>,
) -> Result<KString, MalformedRecordError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(MalformedRecordError::MissingField(field)),
    }
}

impl TryFrom<MetricRecord> for MetricSample {
    type Error = MalformedRecordError;

    fn try_from(record: MetricRecord) -> Result<Self, Self::Error> {
        let MetricRecord {
            problem,
            instance,
            solver,
            seed,
            metric_name,
            value,
            attributes,
        } = record;
        Ok(MetricSample {
            problem: required_str("problem", problem)?,
            instance: required_str("instance", instance)?,
            solver: required_str("solver", solver)?,
            seed: seed.ok_or(MalformedRecordError::MissingField("seed"))?,
            metric_name: required_str("metric name", metric_name)?,
            value: finite(
                "metric value",
                value.ok_or(MalformedRecordError::MissingField("metric value"))?,
            )?,
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MetricRecord {
        MetricRecord {
            problem: Some("MOFJSSP".into()),
            instance: Some("mk01".into()),
            solver: Some("NSGA-II".into()),
            seed: Some(305089489),
            metric_name: Some("Hypervolume Ratio".into()),
            value: Some(0.93),
            attributes: [(
                KString::from_static(attribute::NUM_JOBS),
                AttributeValue::Int(10),
            )]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn t_valid() -> Result<(), MalformedRecordError> {
        let sample = MetricSample::try_from(record())?;
        assert_eq!(sample.value.raw(), 0.93);
        assert_eq!(
            sample.attribute(attribute::NUM_JOBS),
            Some(&AttributeValue::Int(10))
        );
        Ok(())
    }

    #[test]
    fn t_missing_fields() {
        let mut r = record();
        r.solver = None;
        assert_eq!(
            MetricSample::try_from(r),
            Err(MalformedRecordError::MissingField("solver"))
        );
        let mut r = record();
        r.instance = Some("  ".into());
        assert_eq!(
            MetricSample::try_from(r),
            Err(MalformedRecordError::MissingField("instance"))
        );
        let mut r = record();
        r.value = None;
        assert_eq!(
            MetricSample::try_from(r),
            Err(MalformedRecordError::MissingField("metric value"))
        );
    }

    #[test]
    fn t_non_finite() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut r = record();
            r.value = Some(value);
            assert!(matches!(
                MetricSample::try_from(r),
                Err(MalformedRecordError::NonFinite { .. })
            ));
        }
        assert!(matches!(
            parse_finite("metric value", "inf"),
            Err(MalformedRecordError::NonFinite { .. })
        ));
        assert!(matches!(
            parse_finite("metric value", "0.9x"),
            Err(MalformedRecordError::Unparseable { .. })
        ));
        assert_eq!(parse_finite("metric value", " 0.5 ").map(|v| v.raw()), Ok(0.5));
    }

    #[test]
    fn t_attribute_value_parsing() {
        assert_eq!("15".parse(), Ok(AttributeValue::Int(15)));
        assert_eq!("mk01".parse(), Ok(AttributeValue::from("mk01")));
        assert_eq!(AttributeValue::Int(-3).to_string(), "-3");
        // integers sort before text, numerically among themselves
        assert!(AttributeValue::Int(9) < AttributeValue::Int(10));
        assert!(AttributeValue::Int(100) < AttributeValue::from("a"));
    }
}
