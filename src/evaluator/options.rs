//! Options parameterizing the evaluation (excludes subcommands or
//! similar, those remain in src/bin/*.rs).

use std::path::PathBuf;

use anyhow::Result;

use crate::{aggregate::GroupingDimension, experiment::ExperimentConfig};

#[derive(clap::Args, Debug)]
pub struct ConfigOpts {
    /// Path to the experiment description (.json5, .json, .yml,
    /// .yaml or .ron). Without it, the built-in experiment (15
    /// Brandimarte instances, 6 solvers, 10 seeds, 3 metrics) is
    /// used.
    #[clap(short, long)]
    pub config: Option<PathBuf>,
}

impl ConfigOpts {
    pub fn load(&self) -> Result<ExperimentConfig> {
        ExperimentConfig::load(self.config.as_deref())
    }
}

#[derive(clap::Args, Debug)]
pub struct ShowOpts {
    /// Print tab-separated values, without padding and colors
    #[clap(long)]
    pub tsv: bool,

    /// The grouping dimension to show: none, jobs, machines,
    /// operations or objectives
    #[clap(long, default_value = "none")]
    pub by: GroupingDimension,
}
