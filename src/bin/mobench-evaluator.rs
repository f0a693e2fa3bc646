use std::{
    io::{stdout, Write},
    path::PathBuf,
};

use anyhow::{bail, Result};
use clap::Parser;

use mobench_evaluator::{
    config_file::save_config_file,
    evaluator::{
        options::{ConfigOpts, ShowOpts},
        pipeline::{EvaluationReport, Evaluator},
    },
    experiment::ExperimentConfig,
    info,
    record_source::{collect_samples, DirectorySource},
    store::IngestReport,
    tables::{
        long_table::{read_metrics_file, read_snapshots_file},
        terminal_table::print_table,
    },
    utillib::{
        get_terminal_width::get_terminal_width,
        logging::{set_log_level, LogLevelOpt},
    },
    warn,
};

const PROGRAM_NAME: &str = "mobench-evaluator";

#[derive(clap::Parser, Debug)]
#[clap(next_line_help = true)]
#[clap(set_term_width = get_terminal_width(4))]
/// Evaluate the quality metrics of multi-objective solver runs:
/// collect the per-run metric files into long tables, and compute
/// ranked statistics and aligned snapshot curves from them.
struct Opts {
    #[clap(flatten)]
    log_level: LogLevelOpt,

    /// The subcommand to run. Use `--help` after the sub-command to
    /// get a list of the allowed options there.
    #[clap(subcommand)]
    subcommand: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Print version
    Version,

    /// Write the built-in experiment description to a file, for
    /// editing. The format is chosen by the file extension.
    DefaultConfig {
        /// Path to write to
        path: PathBuf,
    },

    /// Read the per-run metric and snapshot files and write them as
    /// the long tables `metrics.csv` and `metrics_snapshots.csv`.
    Collect {
        #[clap(flatten)]
        config_opts: ConfigOpts,

        /// Directory with a `<metric>/` and `<metric>_snapshots/`
        /// subdirectory per metric, holding
        /// `<instance>_<solver>_<seed>.txt` files
        input_dir: PathBuf,

        /// Directory to write the tables to (created if missing)
        output_dir: PathBuf,
    },

    /// Compute the ranked and distribution tables from a long metrics
    /// table.
    Stats {
        #[clap(flatten)]
        config_opts: ConfigOpts,

        /// A long metrics table as written by `collect`
        metrics_table: PathBuf,

        /// Directory to write the tables to (created if missing)
        output_dir: PathBuf,
    },

    /// Compute the aligned snapshot bands from a long snapshot table.
    Curves {
        #[clap(flatten)]
        config_opts: ConfigOpts,

        /// A long snapshot table as written by `collect`
        snapshots_table: PathBuf,

        /// Directory to write the tables to (created if missing)
        output_dir: PathBuf,
    },

    /// Compute the display range of every objective over the best and
    /// median fronts of all solvers, per instance.
    ObjectiveBounds {
        #[clap(flatten)]
        config_opts: ConfigOpts,

        /// Directory with a `pareto/` subdirectory holding
        /// `<instance>_<solver>_<best|median>.txt` files
        input_dir: PathBuf,

        /// Directory to write the tables to (created if missing)
        output_dir: PathBuf,
    },

    /// Print the ranked tables computed from a long metrics table.
    Show {
        #[clap(flatten)]
        config_opts: ConfigOpts,
        #[clap(flatten)]
        show_opts: ShowOpts,

        /// A long metrics table as written by `collect`
        metrics_table: PathBuf,
    },

    /// `collect`, `stats`, `curves` and `objective-bounds` in one go,
    /// also writing `evaluation_report.json`.
    Run {
        #[clap(flatten)]
        config_opts: ConfigOpts,

        /// See `collect`
        input_dir: PathBuf,

        /// Directory to write all tables to (created if missing)
        output_dir: PathBuf,
    },
}

fn warn_rejected(what: &str, report: &IngestReport) {
    if !report.is_clean() {
        warn!(
            "{what}: {} records rejected, {} accepted",
            report.rejected.len(),
            report.accepted
        );
    }
}

fn finish(report: &EvaluationReport) -> Result<()> {
    if !report.is_complete() {
        bail!(
            "{} outputs could not be computed: {}",
            report.failures.len(),
            report
                .failures
                .iter()
                .map(|f| f.output.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
    Ok(())
}

fn main() -> Result<()> {
    let Opts {
        log_level,
        subcommand,
    } = Opts::parse();

    set_log_level(log_level.try_into()?);

    match subcommand {
        SubCommand::Version => println!("{PROGRAM_NAME} version {}", env!("CARGO_PKG_VERSION")),

        SubCommand::DefaultConfig { path } => {
            save_config_file(&path, &ExperimentConfig::builtin())?;
            info!("wrote {path:?}");
        }

        SubCommand::Collect {
            config_opts,
            input_dir,
            output_dir,
        } => {
            let evaluator = Evaluator::new(config_opts.load()?)?;
            let collected = collect_samples(&DirectorySource::new(input_dir), evaluator.config())?;
            warn_rejected("metric files", &collected.metrics_report);
            warn_rejected("snapshot files", &collected.snapshots_report);
            evaluator.write_long_tables(&collected.metrics, &collected.snapshots, &output_dir)?;
        }

        SubCommand::Stats {
            config_opts,
            metrics_table,
            output_dir,
        } => {
            let evaluator = Evaluator::new(config_opts.load()?)?;
            let (store, ingest) = read_metrics_file(&metrics_table)?;
            warn_rejected("metrics table", &ingest);
            let mut report = EvaluationReport::default();
            evaluator.write_stats_tables(&store, &output_dir, &mut report)?;
            finish(&report)?;
        }

        SubCommand::Curves {
            config_opts,
            snapshots_table,
            output_dir,
        } => {
            let evaluator = Evaluator::new(config_opts.load()?)?;
            let (snapshots, ingest) = read_snapshots_file(&snapshots_table)?;
            warn_rejected("snapshots table", &ingest);
            let mut report = EvaluationReport::default();
            evaluator.write_curve_tables(&snapshots, &output_dir, &mut report)?;
            finish(&report)?;
        }

        SubCommand::ObjectiveBounds {
            config_opts,
            input_dir,
            output_dir,
        } => {
            let evaluator = Evaluator::new(config_opts.load()?)?;
            let mut report = EvaluationReport::default();
            evaluator.write_objective_bounds_tables(
                &DirectorySource::new(input_dir),
                &output_dir,
                &mut report,
            )?;
            finish(&report)?;
        }

        SubCommand::Show {
            config_opts,
            show_opts: ShowOpts { tsv, by },
            metrics_table,
        } => {
            let evaluator = Evaluator::new(config_opts.load()?)?;
            let (store, ingest) = read_metrics_file(&metrics_table)?;
            warn_rejected("metrics table", &ingest);
            let mut out = stdout().lock();
            let mut first = true;
            for (name, table) in evaluator.ranked_tables_by(&store, &[by]) {
                match table {
                    Ok(table) => {
                        if !first && !tsv {
                            writeln!(out)?;
                        }
                        first = false;
                        print_table(&table, tsv, &mut out)?;
                    }
                    Err(e) => warn!("can't show {name}: {e}"),
                }
            }
        }

        SubCommand::Run {
            config_opts,
            input_dir,
            output_dir,
        } => {
            let evaluator = Evaluator::new(config_opts.load()?)?;
            let source = DirectorySource::new(input_dir);
            let collected = collect_samples(&source, evaluator.config())?;
            let mut report = evaluator.run(&collected.metrics, &collected.snapshots, &output_dir)?;
            evaluator.write_objective_bounds_tables(&source, &output_dir, &mut report)?;
            warn_rejected("metric files", &collected.metrics_report);
            warn_rejected("snapshot files", &collected.snapshots_report);
            report.metrics_ingest = Some(collected.metrics_report);
            report.snapshots_ingest = Some(collected.snapshots_report);
            report.write_file(&output_dir)?;
            finish(&report)?;
        }
    }

    Ok(())
}
