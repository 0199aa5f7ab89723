//! kv_ingest CLI
//!
//! Creates study files from JSON definitions and validates data file names against them.

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use kv_core::{GrammarConfig, GroupRequest};
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::sync::atomic::AtomicBool;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "kv_ingest")]
#[command(about = "Manage KineViz study files and validate data file names", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Create a study file from a JSON definition
    Init {
        /// Study definition JSON
        #[arg(long)]
        definition: PathBuf,

        /// Output study file path
        #[arg(long)]
        out: PathBuf,
    },

    /// Validate and add data files to a study
    Add {
        /// Study file path
        #[arg(long)]
        study: PathBuf,

        /// File names to add
        names: Vec<String>,

        /// Also add every data file found in this directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Report outcomes without writing the study file
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Remove data files from a study
    Remove {
        /// Study file path
        #[arg(long)]
        study: PathBuf,

        /// File names to remove
        names: Vec<String>,
    },

    /// Show participants, used sub-values and missing mandatory coverage
    Coverage {
        /// Study file path
        #[arg(long)]
        study: PathBuf,
    },

    /// Show comparison groups for one variable, optionally holding a second one
    Groups {
        /// Study file path
        #[arg(long)]
        study: PathBuf,

        /// Variable to group by
        #[arg(long)]
        axis: String,

        /// Variable held at a fixed value
        #[arg(long, requires = "held_value")]
        held_axis: Option<String>,

        /// Value of the held variable
        #[arg(long, requires = "held_axis")]
        held_value: Option<String>,

        /// Comma-separated subset of sub-values to group
        #[arg(long, value_delimiter = ',')]
        values: Vec<String>,
    },

    /// Print the JSON Schema of exported study records
    Schema,

    /// Export a study file as JSON
    Export {
        /// Study file path
        #[arg(long)]
        study: PathBuf,

        /// Output JSON path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Rebuild a study file from a JSON export
    Import {
        /// Exported JSON path
        #[arg(long)]
        json: PathBuf,

        /// Output study file path
        #[arg(long)]
        out: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    tracing::debug!(version = kv_core::VERSION, "kv_ingest starting");

    match cli.command {
        Commands::Init { definition, out } => {
            let grammar = GrammarConfig::load_from_env()?;
            let study = kv_ingest::StudyDefinition::load(&definition)?.into_study(grammar)?;
            kv_ingest::write_study(&out, &study)?;

            println!("✅ Study '{}' created", study.name());
            println!("   Pattern: {}", kv_core::expected_pattern(study.schema()));
            println!("   Output:  {}", out.display());
        }

        Commands::Add { study: path, mut names, dir, dry_run } => {
            let mut study = kv_ingest::open_study(&path)?;
            if let Some(dir) = dir {
                names.extend(kv_ingest::collect_candidate_names(&dir, study.schema().grammar())?);
            }
            if names.is_empty() {
                anyhow::bail!("No file names given");
            }

            let cancel = AtomicBool::new(false);
            let report = kv_core::ingest_batch(&mut study, names, &cancel);
            println!("{}", kv_ingest::format_report(&report, &study));

            if !dry_run && !report.accepted.is_empty() {
                kv_ingest::write_study(&path, &study)?;
                println!("\n📄 Study saved to: {}", path.display());
            }
        }

        Commands::Remove { study: path, names } => {
            let mut study = kv_ingest::open_study(&path)?;
            for name in &names {
                study.remove_file(name).with_context(|| format!("Cannot remove '{}'", name))?;
                println!("🗑  {}", name);
            }
            kv_ingest::write_study(&path, &study)?;
        }

        Commands::Coverage { study: path } => {
            let study = kv_ingest::open_study(&path)?;
            println!("{}", kv_ingest::format_coverage(&study));
        }

        Commands::Groups { study: path, axis, held_axis, held_value, values } => {
            let study = kv_ingest::open_study(&path)?;
            let mut request = match (held_axis, held_value) {
                (Some(held_axis), Some(held_value)) => {
                    GroupRequest::two_axes(axis, held_axis, held_value)
                }
                _ => GroupRequest::one_axis(axis),
            };
            if !values.is_empty() {
                request = request.with_values(values);
            }

            let resolution = study.resolve_groups(&request)?;
            println!("{}", kv_ingest::format_groups(&resolution, study.aliases()));
        }

        Commands::Schema => {
            println!("{}", kv_core::save::record_json_schema()?);
        }

        Commands::Export { study: path, out } => {
            let study = kv_ingest::open_study(&path)?;
            let json = kv_ingest::export_json(&study)?;
            match out {
                Some(out) => {
                    std::fs::write(&out, json)?;
                    println!("📄 Exported to: {}", out.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Import { json, out } => {
            let study = kv_ingest::import_json(&json)?;
            kv_ingest::write_study(&out, &study)?;
            println!("✅ Study '{}' imported ({} files)", study.name(), study.ledger().len());
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("kv_ingest CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
