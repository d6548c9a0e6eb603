//! Administrative command line.
//!
//! Usage:
//!   weldmate train                                  # Train from the configured database
//!   weldmate predict --case case.json --validate    # Recommend settings for a case
//!   weldmate fallback --process GMAW --thickness 6  # Rule-based estimate only
//!   weldmate validate --params params.json          # Check a parameter set
//!   weldmate inspect                                # Show loaded models

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::advisor::Advisor;
use crate::artifacts::ArtifactStore;
use crate::config::EngineConfig;
use crate::dataset::{CaseDescriptor, SqliteTrainingSource, Target};
use crate::fallback;
use crate::predictor::Predictor;
use crate::trainer::ModelTrainer;
use crate::validation::{default_rules, load_rules, MaterialInfo, Validator, WeldParameters};

/// weldmate - weld parameter prediction and validation
#[derive(Debug, Parser)]
#[command(name = "weldmate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Engine configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the artifact directory
    #[arg(long, global = true, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Train every target from the weld database and save the artifacts
    Train {
        /// Override the weld database path
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
    },

    /// Recommend settings for a case (models where trained, fallback elsewhere)
    Predict {
        /// Case descriptor (JSON)
        #[arg(long, value_name = "FILE")]
        case: PathBuf,

        /// Validate the recommended settings and print suggestions
        #[arg(long)]
        validate: bool,

        /// Base/filler material names for the compatibility check (JSON)
        #[arg(long, value_name = "FILE")]
        material: Option<PathBuf>,
    },

    /// Rule-based settings for a process and thickness
    Fallback {
        /// Process code (GMAW, GTAW, SMAW, FCAW, MIG, TIG, ...)
        #[arg(long)]
        process: String,

        /// Material thickness in mm
        #[arg(long)]
        thickness: f64,
    },

    /// Validate a parameter set and print suggestions
    Validate {
        /// Weld parameters (JSON)
        #[arg(long, value_name = "FILE")]
        params: PathBuf,

        /// Base/filler material names (JSON)
        #[arg(long, value_name = "FILE")]
        material: Option<PathBuf>,
    },

    /// List the trained targets and their selection scores
    Inspect,
}

/// Run a parsed command. Results go to stdout as JSON.
pub fn execute(cli: Cli) -> Result<()> {
    let mut config = EngineConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = cli.model_dir {
        config.paths.model_dir = dir;
    }
    let store = ArtifactStore::new(&config.paths.model_dir);

    match cli.command {
        Commands::Train { db } => {
            let db = db.unwrap_or_else(|| config.paths.database.clone());
            let source = SqliteTrainingSource::open(&db)?;
            let trainer = ModelTrainer::new(config.training.clone());
            let report = trainer.train_and_save(&source, &store)?;
            info!("Artifacts written to {:?}", store.dir());
            print_json(&report)
        }
        Commands::Predict {
            case,
            validate,
            material,
        } => {
            let case: CaseDescriptor = read_json(&case)?;
            let advisor = Advisor::new(Predictor::load(&store)?, validator(&config)?);
            let recommendation = if validate {
                let material: Option<MaterialInfo> =
                    material.as_deref().map(read_json).transpose()?;
                advisor.recommend_validated(&case, material.as_ref())
            } else {
                advisor.recommend(&case)
            };
            print_json(&recommendation)
        }
        Commands::Fallback { process, thickness } => {
            print_json(&fallback::estimate_for_code(&process, thickness))
        }
        Commands::Validate { params, material } => {
            let params: WeldParameters = read_json(&params)?;
            let material: Option<MaterialInfo> = material.as_deref().map(read_json).transpose()?;
            let validator = validator(&config)?;
            let result = validator.validate(&params, material.as_ref());
            let suggestions = validator.suggest(&params, &result);
            print_json(&serde_json::json!({
                "result": result,
                "suggestions": suggestions,
            }))
        }
        Commands::Inspect => {
            let predictor = Predictor::load(&store)?;
            let targets: serde_json::Map<String, serde_json::Value> = Target::ALL
                .iter()
                .map(|&target| {
                    let entry = match predictor.model(target) {
                        Some(model) => serde_json::json!({
                            "family": model.family,
                            "confidence": model.confidence,
                            "diagnostics": model.diagnostics,
                        }),
                        None => serde_json::json!("fallback"),
                    };
                    (target.as_str().to_string(), entry)
                })
                .collect();
            print_json(&serde_json::json!({
                "model_dir": store.dir(),
                "targets": targets,
            }))
        }
    }
}

fn validator(config: &EngineConfig) -> Result<Validator> {
    let rules = match config.paths.rules_override() {
        Some(path) => load_rules(path)?,
        None => default_rules(),
    };
    Ok(Validator::new(rules))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
