use std::{fs::File, io, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use molecular_complexity::{loader, Metric, MetricRegistry, Scorer};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Molfiles or SD files to score.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Metric to compute; may be repeated. Defaults to every metric.
    #[arg(short, long = "metric", value_enum)]
    metrics: Vec<Metric>,

    /// CSV file of coefficient overrides with header `metric,feature,weight`.
    #[arg(long)]
    coefficients: Option<PathBuf>,

    /// Also print the contribution of every feature to every metric.
    #[arg(long)]
    breakdown: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut registry = MetricRegistry::default();
    if let Some(path) = &cli.coefficients {
        let file = File::open(path)
            .with_context(|| format!("could not open coefficient file {}", path.display()))?;
        registry.apply_overrides(file)?;
    }

    let metrics = if cli.metrics.is_empty() {
        Metric::ALL.to_vec()
    } else {
        cli.metrics.clone()
    };
    let names: Vec<&str> = metrics.iter().map(Metric::name).collect();

    // Breakdown columns are fixed by the registry, not by the molecules.
    let mut header = vec!["path".to_string(), "record".to_string()];
    header.extend(names.iter().map(|n| n.to_string()));
    if cli.breakdown {
        for name in &names {
            for (feature, _) in registry.get(name)?.coefficients().iter() {
                header.push(format!("{name}:{feature}"));
            }
        }
    }

    let scorer = Scorer::new(registry).with_breakdown(cli.breakdown);

    let files: Vec<_> = cli
        .paths
        .par_iter()
        .map(|path| {
            let graphs = loader::parse(path)
                .with_context(|| format!("could not parse {}", path.display()))?;
            Ok::<_, anyhow::Error>(scorer.score_batch(&graphs, names.as_slice()))
        })
        .collect();

    let mut out = csv::Writer::from_writer(io::stdout());
    out.write_record(&header)?;

    let mut failures = 0;
    for (path, file) in cli.paths.iter().zip(files) {
        let results = match file {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("{e:#}");
                failures += 1;
                continue;
            }
        };
        for (record, result) in results.into_iter().enumerate() {
            let scores = match result {
                Ok(scores) => scores,
                Err(e) => {
                    tracing::error!(path = %path.display(), record, "{e}");
                    failures += 1;
                    continue;
                }
            };

            let mut row = vec![path.display().to_string(), record.to_string()];
            row.extend(scores.iter().map(|s| s.value().to_string()));
            for score in &scores {
                if let Some(contributions) = score.contributions() {
                    row.extend(contributions.values().map(|c| c.to_string()));
                }
            }
            out.write_record(&row)?;
        }
    }
    out.flush()?;

    if failures > 0 {
        bail!("{failures} input(s) could not be scored");
    }
    Ok(())
}
