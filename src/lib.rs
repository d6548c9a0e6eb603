//! Weld parameter prediction and validation engine.
//!
//! Learns machine settings (voltage, amperage, wire-feed speed, travel speed)
//! from historical welds, falls back to closed-form estimates where no model
//! is trained, and checks any parameter set against engineering limits.

pub mod advisor;
pub mod artifacts;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fallback;
pub mod features;
pub mod model;
pub mod predictor;
pub mod trainer;
pub mod validation;

use clap::Parser;
use std::process::ExitCode;

pub use advisor::{Advisor, Recommendation};
pub use artifacts::ArtifactStore;
pub use config::EngineConfig;
pub use dataset::{CaseDescriptor, Process, Target, TrainingRow};
pub use error::{Result, WeldError};
pub use predictor::{Prediction, Predictor};
pub use trainer::{ModelTrainer, TrainedTargetModel, TrainingReport};
pub use validation::{ValidationResult, Validator};

pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli::execute(cli::Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
