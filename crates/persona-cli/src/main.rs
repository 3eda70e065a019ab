use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use persona_core::{Analyzer, MeasurementTable, ScoringConfig, Smoother};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "persona", about = "Persona measurement-table tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score an extractor CSV and print the report
    Score {
        /// Path to the measurement table
        table: PathBuf,
        /// Seed for the smoothing draws (reproducible output)
        #[arg(long)]
        seed: Option<u64>,
        /// Disable smoothing jitter entirely
        #[arg(long)]
        no_jitter: bool,
        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Show which measurement columns a table provides
    Inspect {
        /// Path to the measurement table
        table: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            table,
            seed,
            no_jitter,
            compact,
        } => {
            let measurements = load(&table)?;
            let mut config = ScoringConfig {
                seed,
                ..ScoringConfig::default()
            };
            if no_jitter {
                config.relationship_smoothing = Smoother::deterministic();
                config.work_dna_smoothing = Smoother::deterministic();
            }
            let report = Analyzer::new(config).analyze(&measurements);
            let out = if compact {
                serde_json::to_string(&report)?
            } else {
                serde_json::to_string_pretty(&report)?
            };
            println!("{out}");
        }
        Commands::Inspect { table } => {
            let measurements = load(&table)?;
            let cols = measurements.columns();
            println!("rows:        {}", measurements.len());
            let aus: Vec<String> = cols
                .action_units
                .iter()
                .map(|(au, _)| au.to_string())
                .collect();
            let aus = if aus.is_empty() {
                "none".to_string()
            } else {
                aus.join(" ")
            };
            println!("action units: {aus}");
            println!("gaze:        {}", present(cols.gaze.is_some()));
            println!("pose pitch:  {}", present(cols.pose_rx.is_some()));
            println!("pose yaw:    {}", present(cols.pose_ry.is_some()));
            println!("landmarks:   {}", cols.landmarks.len());
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<MeasurementTable> {
    let table = MeasurementTable::from_path(path)
        .with_context(|| format!("cannot load measurement table {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        rows = table.len(),
        action_units = table.columns().action_units.len(),
        "measurement table loaded"
    );
    Ok(table)
}

fn present(yes: bool) -> &'static str {
    if yes {
        "present"
    } else {
        "absent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_flags() {
        let args = ["persona", "score", "frames.csv", "--seed", "7", "--compact"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Score {
                table,
                seed,
                no_jitter,
                compact,
            } => {
                assert_eq!(table, PathBuf::from("frames.csv"));
                assert_eq!(seed, Some(7));
                assert!(!no_jitter);
                assert!(compact);
            }
            Commands::Inspect { .. } => panic!("expected score"),
        }
    }

    #[test]
    fn test_inspect_requires_table() {
        assert!(Cli::try_parse_from(["persona", "inspect"]).is_err());
    }

    #[test]
    fn test_load_reads_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.csv");
        std::fs::write(&path, "frame, AU06_r, AU12_r\n1, 2.5, 2.5\n2, 1.0, 0.5\n").unwrap();
        let table = load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns().action_units.len(), 2);
    }

    #[test]
    fn test_load_reports_path() {
        let err = load(Path::new("/nonexistent/frames.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/frames.csv"));
    }
}
