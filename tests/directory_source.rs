use std::{
    fs::{create_dir_all, remove_dir_all, write},
    path::{Path, PathBuf},
};

use anyhow::Result;
use kstring::KString;

use mobench_evaluator::{
    experiment::{ExperimentConfig, SolverDescriptor},
    record_source::{collect_samples, DirectorySource, FileKind, RunKey},
    sample::{attribute, AttributeValue},
};

fn scratch_dir(name: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("mobench-{name}-{}", std::process::id()));
    if dir.exists() {
        remove_dir_all(&dir)?;
    }
    create_dir_all(&dir)?;
    Ok(dir)
}

fn put(base: &Path, kind: FileKind, metric: &str, run: &RunKey, contents: &str) -> Result<()> {
    let path = base.join(kind.relative_path(metric, run));
    create_dir_all(path.parent().expect("has a parent"))?;
    write(path, contents)?;
    Ok(())
}

fn run(instance: &'static str, solver: &'static str, seed: u64) -> RunKey {
    RunKey {
        instance: KString::from_static(instance),
        solver: KString::from_static(solver),
        seed,
    }
}

fn config() -> ExperimentConfig {
    let mut config = ExperimentConfig::builtin();
    config
        .instances
        .retain(|name, _| ["mk01", "mk04"].contains(&name.as_str()));
    config.solvers = vec![
        SolverDescriptor {
            code: "nsga2".into(),
            label: "NSGA-II".into(),
        },
        SolverDescriptor {
            code: "ihs".into(),
            label: "IHS".into(),
        },
    ];
    config.seeds = vec![11, 12];
    config
}

#[test]
fn t_missing_files_are_skipped() -> Result<()> {
    let dir = scratch_dir("collect")?;
    put(&dir, FileKind::Scalar, "hypervolume", &run("mk01", "nsga2", 11), "0.75\n")?;
    put(&dir, FileKind::Scalar, "hypervolume", &run("mk04", "ihs", 12), "0.5,3\n")?;
    put(&dir, FileKind::Scalar, "igd_plus", &run("mk04", "ihs", 12), "12.5\n\n")?;
    put(
        &dir,
        FileKind::Snapshots,
        "hypervolume",
        &run("mk01", "ihs", 11),
        "0 0.5 0.25\n1 1.0 0.5\n2 1.5 0.6\n",
    )?;

    let collected = collect_samples(&DirectorySource::new(&dir), &config())?;
    assert!(collected.metrics_report.is_clean());
    assert!(collected.snapshots_report.is_clean());
    assert_eq!(collected.metrics.len(), 3);
    assert_eq!(collected.metrics_report.accepted, 3);

    let first = &collected.metrics.samples()[0];
    assert_eq!(first.instance.as_str(), "mk01");
    assert_eq!(first.solver.as_str(), "NSGA-II");
    assert_eq!(first.seed, 11);
    assert_eq!(first.value.raw(), 0.75);
    assert_eq!(
        first.attribute(attribute::TOTAL_NUM_OPERATIONS),
        Some(&AttributeValue::Int(55))
    );
    assert_eq!(
        first.attribute(attribute::CHROMOSOME_SIZE),
        Some(&AttributeValue::Int(110))
    );

    let names: Vec<&str> = collected
        .metrics
        .samples()
        .iter()
        .map(|s| s.metric_name.as_str())
        .collect();
    assert_eq!(
        names,
        [
            "Hypervolume Ratio",
            "Hypervolume Ratio",
            "Modified Inverted Generational Distance"
        ]
    );

    let series = collected.snapshots.series();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].solver.as_str(), "IHS");
    assert_eq!(series[0].points.len(), 3);

    remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn t_bad_lines_are_reported() -> Result<()> {
    let dir = scratch_dir("collect-bad")?;
    put(
        &dir,
        FileKind::Scalar,
        "hypervolume",
        &run("mk01", "nsga2", 11),
        "0.75\ninf\n0.5\n",
    )?;
    put(
        &dir,
        FileKind::Snapshots,
        "hypervolume",
        &run("mk01", "nsga2", 11),
        "1,0.5,0.25\n2,1.0,0.5\n",
    )?;

    let collected = collect_samples(&DirectorySource::new(&dir), &config())?;
    assert_eq!(collected.metrics.len(), 2);
    assert_eq!(collected.metrics_report.rejected.len(), 1);
    assert!(collected.metrics_report.rejected[0]
        .origin
        .ends_with("mk01_nsga2_11.txt:2"));
    // the series does not start at index 0
    assert!(collected.snapshots.is_empty());
    assert_eq!(collected.snapshots_report.rejected.len(), 1);

    remove_dir_all(&dir)?;
    Ok(())
}
