//! Grouping of samples by attribute values, solver and metric, and
//! the statistics per group.

use std::collections::BTreeMap;

use kstring::KString;
use smallvec::SmallVec;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

use crate::{
    debug,
    sample::{attribute, AttributeValue, MetricSample},
    stats::{Quartiles, SampleStats},
};

/// The independent dimensions the result tables are grouped by; each
/// is a separate aggregation, never a cross product.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum GroupingDimension {
    None,
    Jobs,
    Machines,
    Operations,
    Objectives,
}

impl GroupingDimension {
    /// The sample attribute grouped by, which is also the title of
    /// the value column in result tables.
    pub fn attribute(self) -> Option<&'static str> {
        match self {
            GroupingDimension::None => None,
            GroupingDimension::Jobs => Some(attribute::NUM_JOBS),
            GroupingDimension::Machines => Some(attribute::NUM_MACHINES),
            GroupingDimension::Operations => Some(attribute::TOTAL_NUM_OPERATIONS),
            GroupingDimension::Objectives => Some(attribute::NUM_OBJECTIVES),
        }
    }

    pub fn group_by(self) -> Vec<&'static str> {
        self.attribute().into_iter().collect()
    }

    /// The name used in file names, e.g. `jobs`; `None` for the
    /// ungrouped dimension.
    pub fn file_tag(self) -> Option<&'static str> {
        match self {
            GroupingDimension::None => None,
            _ => Some(self.into()),
        }
    }
}

/// Identifies one aggregation cell. Sorts by group values first, then
/// metric, so that the cells of one ranking partition are adjacent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    /// One value per grouped-by attribute, in the order given
    pub group_values: SmallVec<[AttributeValue; 2]>,
    pub metric_name: KString,
    pub solver: KString,
}

impl GroupKey {
    /// The key of the ranking partition this cell belongs to.
    pub fn partition(&self) -> (&[AttributeValue], &str) {
        (&self.group_values, &self.metric_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCell {
    pub key: GroupKey,
    pub mean: f64,
    /// Sample standard deviation, 0 for a single sample
    pub stddev: f64,
    /// Always at least 1
    pub sample_count: usize,
}

/// Mean, quartiles and extremes of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionCell {
    pub key: GroupKey,
    pub mean: f64,
    pub quartiles: Quartiles,
    pub min: f64,
    pub max: f64,
    pub sample_count: usize,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("no samples to aggregate (grouping by {group_by:?})")]
pub struct EmptyPartitionError {
    pub group_by: Vec<String>,
}

/// Values per cell, only non-empty cells are present. Samples lacking
/// one of the `group_by` attributes are left out.
fn partition<'s>(
    samples: impl IntoIterator<Item = &'s MetricSample>,
    group_by: &[&str],
) -> Result<BTreeMap<GroupKey, Vec<f64>>, EmptyPartitionError> {
    let mut cells: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    let mut num_skipped = 0;
    for sample in samples {
        let group_values: Option<SmallVec<_>> = group_by
            .iter()
            .map(|name| sample.attribute(name).cloned())
            .collect();
        let Some(group_values) = group_values else {
            num_skipped += 1;
            continue;
        };
        let key = GroupKey {
            group_values,
            metric_name: sample.metric_name.clone(),
            solver: sample.solver.clone(),
        };
        cells.entry(key).or_default().push(sample.value.raw());
    }
    if num_skipped > 0 {
        debug!("{num_skipped} samples lack an attribute of {group_by:?}, left out");
    }
    if cells.is_empty() {
        return Err(EmptyPartitionError {
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
        });
    }
    Ok(cells)
}

fn stats_of(values: Vec<f64>) -> SampleStats {
    // Partitions are never empty and sample values are finite.
    SampleStats::from_values(values).expect("non-empty finite values")
}

/// Mean and standard deviation per `(group_by values, solver,
/// metric)`, sorted by `GroupKey`. The result does not depend on the
/// order of `samples`. Fails only if there is nothing to aggregate at
/// all.
pub fn aggregate<'s>(
    samples: impl IntoIterator<Item = &'s MetricSample>,
    group_by: &[&str],
) -> Result<Vec<AggregateCell>, EmptyPartitionError> {
    Ok(partition(samples, group_by)?
        .into_iter()
        .map(|(key, values)| {
            let stats = stats_of(values);
            AggregateCell {
                key,
                mean: stats.mean,
                stddev: stats.stddev,
                sample_count: stats.num_values,
            }
        })
        .collect())
}

/// Like `aggregate`, but reporting the distribution of each cell.
pub fn summarize_distribution<'s>(
    samples: impl IntoIterator<Item = &'s MetricSample>,
    group_by: &[&str],
) -> Result<Vec<DistributionCell>, EmptyPartitionError> {
    Ok(partition(samples, group_by)?
        .into_iter()
        .map(|(key, values)| {
            let SampleStats {
                num_values,
                mean,
                stddev: _,
                min,
                max,
                quartiles,
            } = stats_of(values);
            DistributionCell {
                key,
                mean,
                quartiles,
                min,
                max,
                sample_count: num_values,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use approx::assert_relative_eq;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{
        experiment::ExperimentConfig,
        sample::{MetricRecord, MetricSample},
    };

    fn sample(
        instance: &str,
        jobs: Option<i64>,
        solver: &str,
        seed: u64,
        value: f64,
    ) -> MetricSample {
        let mut record = MetricRecord {
            problem: Some("MOFJSSP".into()),
            instance: Some(KString::from_ref(instance)),
            solver: Some(KString::from_ref(solver)),
            seed: Some(seed),
            metric_name: Some("hypervolume".into()),
            value: Some(value),
            attributes: Default::default(),
        };
        if let Some(jobs) = jobs {
            record
                .attributes
                .insert(KString::from_static(attribute::NUM_JOBS), jobs.into());
        }
        MetricSample::try_from(record).expect("valid")
    }

    fn samples() -> Vec<MetricSample> {
        vec![
            sample("mk01", Some(10), "NSGA-II", 1, 0.5),
            sample("mk01", Some(10), "NSGA-II", 2, 0.7),
            sample("mk03", Some(15), "NSGA-II", 1, 0.2),
            sample("mk01", Some(10), "IHS", 1, 0.4),
            sample("mk03", Some(15), "IHS", 1, 0.3),
            sample("mk03", Some(15), "IHS", 2, 0.5),
        ]
    }

    #[test]
    fn t_ungrouped() -> Result<()> {
        let samples = samples();
        let cells = aggregate(&samples, &[])?;
        assert_eq!(cells.len(), 2);
        // sorted by solver within the partition
        assert_eq!(cells[0].key.solver.as_str(), "IHS");
        assert_relative_eq!(cells[0].mean, 0.4, epsilon = 1e-12);
        assert_relative_eq!(cells[0].stddev, 0.1, epsilon = 1e-12);
        assert_eq!(cells[0].sample_count, 3);
        assert_eq!(cells[1].key.solver.as_str(), "NSGA-II");
        assert!(cells.iter().all(|c| c.key.group_values.is_empty()));
        Ok(())
    }

    #[test]
    fn t_grouped_omits_empty_cells() -> Result<()> {
        let mut samples = samples();
        // no IHS run with 20 jobs, and one sample without the attribute
        samples.push(sample("mk07", Some(20), "NSGA-II", 1, 0.9));
        samples.push(sample("mk99", None, "IHS", 1, 0.0));
        let cells = aggregate(&samples, &[attribute::NUM_JOBS])?;
        let keys: Vec<(String, &str, usize)> = cells
            .iter()
            .map(|c| {
                (
                    c.key.group_values[0].to_string(),
                    c.key.solver.as_str(),
                    c.sample_count,
                )
            })
            .collect();
        assert_eq!(
            keys,
            [
                ("10".into(), "IHS", 1),
                ("10".into(), "NSGA-II", 2),
                ("15".into(), "IHS", 2),
                ("15".into(), "NSGA-II", 1),
                ("20".into(), "NSGA-II", 1),
            ]
        );
        // single sample
        assert_eq!(cells[4].stddev, 0.);
        assert_eq!(cells[4].mean, 0.9);
        Ok(())
    }

    #[test]
    fn t_order_independent() -> Result<()> {
        let config = ExperimentConfig::builtin();
        let mut samples = samples();
        for s in &mut samples {
            s.attributes = config
                .instance_attributes(&s.instance)
                .expect("builtin instance");
        }
        let mut shuffled = samples.clone();
        shuffled.reverse();
        shuffled.swap(1, 4);
        for dimension in GroupingDimension::iter() {
            let group_by = dimension.group_by();
            let cells = aggregate(&samples, &group_by)?;
            assert!(!cells.is_empty());
            assert_eq!(cells, aggregate(&shuffled, &group_by)?);
            assert_eq!(
                summarize_distribution(&samples, &group_by)?,
                summarize_distribution(&shuffled, &group_by)?
            );
        }
        Ok(())
    }

    #[test]
    fn t_empty() {
        let empty: Vec<MetricSample> = Vec::new();
        assert!(aggregate(&empty, &[]).is_err());
        let unattributed = vec![sample("mk01", None, "IHS", 1, 0.1)];
        assert_eq!(
            aggregate(&unattributed, &[attribute::NUM_JOBS]),
            Err(EmptyPartitionError {
                group_by: vec![attribute::NUM_JOBS.into()]
            })
        );
    }

    #[test]
    fn t_distribution() -> Result<()> {
        let samples = samples();
        let cells = summarize_distribution(&samples, &[attribute::NUM_JOBS])?;
        let ihs15 = &cells[2];
        assert_eq!(ihs15.key.solver.as_str(), "IHS");
        assert_eq!(ihs15.min, 0.3);
        assert_eq!(ihs15.max, 0.5);
        assert_relative_eq!(ihs15.quartiles.q1, 0.4, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn t_dimension_names() {
        assert_eq!(GroupingDimension::Operations.file_tag(), Some("operations"));
        assert_eq!(GroupingDimension::None.file_tag(), None);
        assert_eq!(
            "machines".parse::<GroupingDimension>().ok(),
            Some(GroupingDimension::Machines)
        );
        assert_eq!(
            GroupingDimension::Objectives.attribute(),
            Some("number of objectives")
        );
    }
}
