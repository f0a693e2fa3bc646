use std::str::FromStr;

use anyhow::Result;
use kstring::KString;

use mobench_evaluator::{
    experiment::ExperimentConfig,
    sample::{AttributeValue, MetricRecord, MetricSample},
    store::MetricStore,
    tables::long_table::{read_metrics, write_metrics},
};

/// A store with the full attribute set for most samples, and a few
/// awkward values.
fn store() -> Result<MetricStore> {
    let config = ExperimentConfig::builtin();
    let mut store = MetricStore::new();
    let values = [0.1 + 0.2, 1e-300, 0.0, 123456.789, -2.5, 1.0 / 3.0];
    let solvers = &config.solvers;
    for (i, (instance, solver)) in ["mk01", "mk07", "mk15"]
        .into_iter()
        .flat_map(|instance| solvers.iter().map(move |s| (instance, s)))
        .enumerate()
    {
        for (j, seed) in config.seeds.iter().take(2).enumerate() {
            for metric in &config.metrics {
                let attributes = if i % 5 == 4 {
                    // samples without covariates survive, too
                    Default::default()
                } else {
                    config
                        .instance_attributes(instance)
                        .expect("builtin instance")
                };
                store.ingest(MetricRecord {
                    problem: Some(config.problem.clone()),
                    instance: Some(KString::from_ref(instance)),
                    solver: Some(solver.label.clone()),
                    seed: Some(*seed),
                    metric_name: Some(metric.label.clone()),
                    value: Some(values[(i + j) % values.len()]),
                    attributes,
                })?;
            }
        }
    }
    Ok(store)
}

fn sorted(samples: &[MetricSample]) -> Vec<MetricSample> {
    let mut samples = samples.to_vec();
    samples.sort();
    samples
}

#[test]
fn t_round_trip() -> Result<()> {
    let original = store()?;
    let mut out = Vec::new();
    write_metrics(original.samples(), &mut out)?;

    let mut reread = MetricStore::new();
    let report = read_metrics(out.as_slice(), "memory", &mut reread);
    assert!(report.is_clean());
    assert_eq!(report.accepted, original.len());
    assert_eq!(sorted(reread.samples()), sorted(original.samples()));

    // Writing again gives the same bytes
    let mut again = Vec::new();
    write_metrics(reread.samples(), &mut again)?;
    assert_eq!(again, out);
    Ok(())
}

#[test]
fn t_text_attributes() -> Result<()> {
    let mut store = MetricStore::new();
    store.ingest(MetricRecord {
        problem: Some("MOFJSSP".into()),
        instance: Some("custom".into()),
        solver: Some("IHS".into()),
        seed: Some(1),
        metric_name: Some("Hypervolume Ratio".into()),
        value: Some(0.5),
        attributes: [(
            KString::from_static("number of jobs"),
            AttributeValue::from_str("many")?,
        )]
        .into_iter()
        .collect(),
    })?;
    let mut out = Vec::new();
    write_metrics(store.samples(), &mut out)?;
    let mut reread = MetricStore::new();
    read_metrics(out.as_slice(), "memory", &mut reread);
    assert_eq!(reread.samples(), store.samples());
    Ok(())
}
