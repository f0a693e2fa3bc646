//! The registry of quality metrics: for each metric name, which
//! direction of its value is "better", and the natural domain of its
//! values if it has one.

use std::{cmp::Ordering, collections::BTreeMap, fmt::Display};

use anyhow::{anyhow, bail, Context, Result};
use kstring::KString;
use noisy_float::types::R64;

use crate::bounds::DomainClamp;

/// Sort direction of a metric, named after the order in which its
/// values are sorted to get the best value first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Lower is better (distances, errors)
    Ascending,
    /// Higher is better (ratios)
    Descending,
}

impl Direction {
    /// Whether `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Ascending => a < b,
            Direction::Descending => a > b,
        }
    }

    /// Ordering with better values first, i.e. `Less` if `a` is
    /// better than `b`.
    pub fn cmp_better(self, a: R64, b: R64) -> Ordering {
        match self {
            Direction::Ascending => a.cmp(&b),
            Direction::Descending => b.cmp(&a),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Direction::Ascending => "lower is better",
            Direction::Descending => "higher is better",
        })
    }
}

/// Description of one metric. `code` is used in file names, `label`
/// in tables and as the metric name of samples; both can be used for
/// lookups.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricDescriptor {
    pub code: KString,
    pub label: KString,
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainClamp>,
}

impl MetricDescriptor {
    pub fn new(
        code: &'static str,
        label: &'static str,
        direction: Direction,
        domain: Option<DomainClamp>,
    ) -> Self {
        Self {
            code: KString::from_static(code),
            label: KString::from_static(label),
            direction,
            domain,
        }
    }

    /// The three metrics the solvers are evaluated with.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::new(
                "hypervolume",
                "Hypervolume Ratio",
                Direction::Descending,
                Some(DomainClamp::UNIT),
            ),
            Self::new(
                "igd_plus",
                "Modified Inverted Generational Distance",
                Direction::Ascending,
                Some(DomainClamp::UNIT),
            ),
            Self::new(
                "multiplicative_epsilon",
                "Multiplicative Epsilon Indicator",
                Direction::Ascending,
                Some(DomainClamp::UNIT),
            ),
        ]
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("no sort direction is registered for metric {0:?}")]
pub struct DirectionLookupError(pub String);

/// Resolved once from the experiment configuration, then passed
/// explicitly to whatever needs to know about metric directions.
#[derive(Debug, Clone)]
pub struct DirectionRegistry {
    descriptors: Vec<MetricDescriptor>,
    /// Codes and labels to index in `descriptors`
    by_name: BTreeMap<KString, usize>,
}

impl DirectionRegistry {
    /// Fails if any code or label is used twice (a label may equal
    /// the code of the same metric), or if a domain is invalid.
    pub fn new(descriptors: impl IntoIterator<Item = MetricDescriptor>) -> Result<Self> {
        let descriptors: Vec<MetricDescriptor> = descriptors.into_iter().collect();
        let mut by_name = BTreeMap::new();
        for (i, descriptor) in descriptors.iter().enumerate() {
            if let Some(domain) = &descriptor.domain {
                domain
                    .check()
                    .with_context(|| anyhow!("metric {:?}", descriptor.code))?;
            }
            for name in [&descriptor.code, &descriptor.label] {
                if let Some(j) = by_name.insert(name.clone(), i) {
                    if j != i {
                        bail!("metric name {name:?} is registered more than once")
                    }
                }
            }
        }
        Ok(Self {
            descriptors,
            by_name,
        })
    }

    pub fn builtin() -> Self {
        Self::new(MetricDescriptor::builtin()).expect("builtin metric names are unique")
    }

    /// In registration order.
    pub fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, name: &str) -> Result<&MetricDescriptor, DirectionLookupError> {
        self.by_name
            .get(name)
            .map(|i| &self.descriptors[*i])
            .ok_or_else(|| DirectionLookupError(name.to_string()))
    }

    pub fn direction(&self, name: &str) -> Result<Direction, DirectionLookupError> {
        Ok(self.descriptor(name)?.direction)
    }

    /// The natural domain, `None` both for unknown metrics and those
    /// without a bounded domain.
    pub fn domain(&self, name: &str) -> Option<DomainClamp> {
        self.descriptor(name).ok()?.domain
    }
}
