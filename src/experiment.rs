//! The description of an experiment: which problem instances, solvers,
//! seeds and metrics there are. Resolved once at startup and passed
//! to whatever needs it.

use std::{collections::BTreeMap, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use kstring::KString;

use crate::{
    config_file::load_config_file,
    info,
    metric::{DirectionRegistry, MetricDescriptor},
    sample::{attribute, Attributes},
};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceDescriptor {
    pub num_jobs: u32,
    pub num_machines: u32,
    pub total_num_operations: u32,
    /// Defaults to twice `total_num_operations`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromosome_size: Option<u32>,
}

impl InstanceDescriptor {
    fn new(num_jobs: u32, num_machines: u32, total_num_operations: u32) -> Self {
        Self {
            num_jobs,
            num_machines,
            total_num_operations,
            chromosome_size: None,
        }
    }

    pub fn chromosome_size(&self) -> u32 {
        self.chromosome_size
            .unwrap_or(2 * self.total_num_operations)
    }
}

/// `code` is used in input file names, `label` in tables.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverDescriptor {
    pub code: KString,
    pub label: KString,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    pub problem: KString,
    pub num_objectives: u32,
    pub instances: BTreeMap<KString, InstanceDescriptor>,
    pub solvers: Vec<SolverDescriptor>,
    pub seeds: Vec<u64>,
    pub metrics: Vec<MetricDescriptor>,
}

const BUILTIN_SEEDS: [u64; 10] = [
    305089489, 511812191, 608055156, 467424509, 944441939, 414977408, 819312498, 562386085,
    287613914, 755772793,
];

impl ExperimentConfig {
    /// Six solvers on the 15 Brandimarte instances of the flexible job
    /// shop problem, with 4 objectives and 10 seeds.
    pub fn builtin() -> Self {
        let instances = [
            ("mk01", 10, 6, 55),
            ("mk02", 10, 6, 58),
            ("mk03", 15, 8, 150),
            ("mk04", 15, 8, 90),
            ("mk05", 15, 4, 106),
            ("mk06", 10, 15, 150),
            ("mk07", 20, 5, 100),
            ("mk08", 20, 10, 225),
            ("mk09", 20, 10, 240),
            ("mk10", 20, 15, 240),
            ("mk11", 30, 5, 179),
            ("mk12", 30, 10, 193),
            ("mk13", 30, 10, 231),
            ("mk14", 30, 15, 277),
            ("mk15", 30, 15, 284),
        ]
        .into_iter()
        .map(|(name, jobs, machines, operations)| {
            (
                KString::from_static(name),
                InstanceDescriptor::new(jobs, machines, operations),
            )
        })
        .collect();
        let solvers = [
            ("nsga2", "NSGA-II"),
            ("nspso", "NSPSO"),
            ("moead", "MOEA/D-DE"),
            ("mhaco", "MHACO"),
            ("ihs", "IHS"),
            ("nsbrkga", "NS-BRKGA"),
        ]
        .into_iter()
        .map(|(code, label)| SolverDescriptor {
            code: KString::from_static(code),
            label: KString::from_static(label),
        })
        .collect();
        Self {
            problem: KString::from_static("MOFJSSP"),
            num_objectives: 4,
            instances,
            solvers,
            seeds: BUILTIN_SEEDS.to_vec(),
            metrics: MetricDescriptor::builtin(),
        }
    }

    /// Load from `path` if given (it must exist), otherwise use the
    /// built-in experiment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = if let Some(path) = path {
            info!("loading experiment config from {path:?}");
            let config: Self = load_config_file(path)?;
            config
                .check()
                .with_context(|| anyhow!("checking config file {path:?}"))?;
            config
        } else {
            info!("no config file given, using the built-in experiment");
            Self::builtin()
        };
        Ok(config)
    }

    pub fn check(&self) -> Result<()> {
        if self.num_objectives == 0 {
            bail!("`num_objectives` must be at least 1")
        }
        let mut solver_names = BTreeMap::new();
        for (i, SolverDescriptor { code, label }) in self.solvers.iter().enumerate() {
            for name in [code, label] {
                if let Some(j) = solver_names.insert(name, i) {
                    if j != i {
                        bail!("solver name {name:?} is used more than once")
                    }
                }
            }
        }
        let mut seeds = self.seeds.clone();
        seeds.sort();
        if let Some(w) = seeds.windows(2).find(|w| w[0] == w[1]) {
            bail!("seed {} is listed more than once", w[0])
        }
        self.direction_registry()?;
        Ok(())
    }

    pub fn direction_registry(&self) -> Result<DirectionRegistry> {
        DirectionRegistry::new(self.metrics.iter().cloned())
    }

    pub fn solver_by_code(&self, code: &str) -> Option<&SolverDescriptor> {
        self.solvers.iter().find(|s| s.code.as_str() == code)
    }

    /// The covariates of all samples measured on `instance`.
    pub fn instance_attributes(&self, instance: &str) -> Option<Attributes> {
        let descriptor = self.instances.get(instance)?;
        let InstanceDescriptor {
            num_jobs,
            num_machines,
            total_num_operations,
            chromosome_size: _,
        } = descriptor;
        Some(
            [
                (attribute::NUM_OBJECTIVES, self.num_objectives),
                (attribute::CHROMOSOME_SIZE, descriptor.chromosome_size()),
                (attribute::NUM_JOBS, *num_jobs),
                (attribute::NUM_MACHINES, *num_machines),
                (attribute::TOTAL_NUM_OPERATIONS, *total_num_operations),
            ]
            .into_iter()
            .map(|(name, value)| (KString::from_static(name), value.into()))
            .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{config_file::ConfigBackend, sample::AttributeValue};

    use super::*;

    #[test]
    fn t_builtin() -> Result<()> {
        let config = ExperimentConfig::builtin();
        config.check()?;
        assert_eq!(config.instances.len(), 15);
        assert_eq!(config.seeds.len(), 10);
        assert_eq!(
            config.solver_by_code("moead").map(|s| s.label.as_str()),
            Some("MOEA/D-DE")
        );
        let attributes = config
            .instance_attributes("mk08")
            .ok_or_else(|| anyhow!("mk08 exists"))?;
        assert_eq!(attributes[attribute::NUM_JOBS], AttributeValue::Int(20));
        assert_eq!(attributes[attribute::NUM_MACHINES], AttributeValue::Int(10));
        assert_eq!(
            attributes[attribute::TOTAL_NUM_OPERATIONS],
            AttributeValue::Int(225)
        );
        assert_eq!(attributes[attribute::CHROMOSOME_SIZE], AttributeValue::Int(450));
        assert_eq!(attributes[attribute::NUM_OBJECTIVES], AttributeValue::Int(4));
        assert_eq!(config.instance_attributes("mk16"), None);
        Ok(())
    }

    #[test]
    fn t_parse_json5() -> Result<()> {
        let config: ExperimentConfig = ConfigBackend::Json5.decode(
            r#"{
                // a small experiment
                problem: "MOFJSSP",
                num_objectives: 2,
                instances: {
                    mk01: { num_jobs: 10, num_machines: 6, total_num_operations: 55,
                            chromosome_size: 100 },
                },
                solvers: [ { code: "nsga2", label: "NSGA-II" } ],
                seeds: [1, 2],
                metrics: [
                    { code: "hypervolume", label: "Hypervolume Ratio",
                      direction: "descending", domain: { low: 0.0, high: 1.0 } },
                    { code: "spread", label: "Spread", direction: "ascending" },
                ],
            }"#,
        )?;
        config.check()?;
        assert_eq!(config.instances["mk01"].chromosome_size(), 100);
        let registry = config.direction_registry()?;
        assert!(registry.direction("Spread").is_ok());
        Ok(())
    }

    #[test]
    fn t_check() {
        let mut config = ExperimentConfig::builtin();
        config.seeds.push(305089489);
        assert!(config.check().is_err());

        let mut config = ExperimentConfig::builtin();
        config.solvers.push(SolverDescriptor {
            code: "ihs2".into(),
            label: "IHS".into(),
        });
        assert!(config.check().is_err());

        let mut config = ExperimentConfig::builtin();
        config.num_objectives = 0;
        assert!(config.check().is_err());
    }

    #[test]
    fn t_check_rejects_inverted_domain() -> Result<()> {
        let config: ExperimentConfig = ConfigBackend::Json5.decode(
            r#"{
                problem: "MOFJSSP",
                num_objectives: 2,
                instances: {
                    mk01: { num_jobs: 10, num_machines: 6, total_num_operations: 55,
                            chromosome_size: 100 },
                },
                solvers: [ { code: "nsga2", label: "NSGA-II" } ],
                seeds: [1],
                metrics: [
                    { code: "hypervolume", label: "Hypervolume Ratio",
                      direction: "descending", domain: { low: 1, high: 0 } },
                ],
            }"#,
        )?;
        let err = config.check().expect_err("inverted domain");
        assert!(format!("{err:#}").contains("invalid domain [1, 0]"));
        Ok(())
    }
}
