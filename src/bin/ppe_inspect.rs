//! ppe_inspect - PPE compliance checks for image files.
//!
//! Subcommands:
//! - `inspect`: run the full pipeline on each file, one JSON line per file
//! - `diagnose`: frame-quality statistics only, no backend involved
//! - `validate`: normalize and grade a saved backend response
//! - `health`: probe both detection backends

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};

use ppe_inspector::{
    BackendResponse, BackendRole, ComplianceCategory, ComplianceEngine, CompliancePolicy,
    DetectionNormalizer, FrameQualityAnalyzer, HttpBackendClient, InspectorConfig, PpeInspector,
    SessionSummary, Taxonomy,
};

#[derive(Parser, Debug)]
#[command(
    name = "ppe_inspect",
    version,
    about = "Check camera frames for personal protective equipment"
)]
struct Args {
    /// TOML config file (backend endpoints, policy, quality thresholds).
    #[arg(long, global = true, env = "PPE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect image files and print one JSON result per line
    Inspect {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Print a session summary after the last file
        #[arg(long)]
        summary: bool,
    },

    /// Print frame-quality diagnostics for an image file
    Diagnose {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Validate a saved backend response and print its verdict
    Validate {
        #[arg(value_name = "JSON_FILE")]
        file: PathBuf,

        /// Confidence gate applied before aggregation
        #[arg(long, default_value_t = 0.4)]
        threshold: f64,

        /// Required protection categories
        #[arg(long, value_delimiter = ',', default_value = "head,hand,body")]
        require: Vec<String>,
    },

    /// Probe the primary and cloud backends
    Health,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Inspect { files, summary } => inspect(args.config.as_deref(), &files, summary),
        Command::Diagnose { file } => diagnose(args.config.as_deref(), &file),
        Command::Validate {
            file,
            threshold,
            require,
        } => validate(&file, threshold, &require),
        Command::Health => health(args.config.as_deref()),
    }
}

fn inspect(config_path: Option<&Path>, files: &[PathBuf], print_summary: bool) -> Result<()> {
    let config = InspectorConfig::load_from(config_path)?;
    let inspector = PpeInspector::http();
    let mut summary = SessionSummary::default();

    for file in files {
        let bytes = match std::fs::read(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("failed to read {}: {}", file.display(), e);
                println!("{}", json!({"file": file, "error": e.to_string()}));
                continue;
            }
        };
        let outcome = inspector.inspect_bytes(&bytes, &config);
        match &outcome {
            Ok(result) => println!("{}", json!({"file": file, "result": result})),
            Err(e) => {
                log::error!("{}: {}", file.display(), e);
                println!("{}", json!({"file": file, "error": e.to_string()}));
            }
        }
        summary.record(&outcome);
    }

    log::info!(
        "session: {} frames, {} failed, {} with a person, {} compliant ({:.1}%)",
        summary.frames,
        summary.failed,
        summary.frames_with_person,
        summary.compliant_frames,
        summary.compliance_rate()
    );
    if print_summary {
        println!("{}", json!({ "summary": summary }));
    }
    Ok(())
}

fn diagnose(config_path: Option<&Path>, file: &Path) -> Result<()> {
    // Diagnosis never talks to a backend; only the quality section matters.
    let thresholds = match InspectorConfig::load_from(config_path) {
        Ok(config) => config.quality,
        Err(e) => {
            log::warn!("using default quality thresholds: {}", e);
            Default::default()
        }
    };
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let report = FrameQualityAnalyzer::new(thresholds).analyze_bytes(&bytes);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn validate(file: &Path, threshold: f64, require: &[String]) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(anyhow!("--threshold must be within [0, 1], got {}", threshold));
    }
    let required = require
        .iter()
        .map(|name| {
            ComplianceCategory::parse(name.trim())
                .ok_or_else(|| anyhow!("unknown category in --require: {}", name))
        })
        .collect::<Result<Vec<_>>>()?;
    let policy = CompliancePolicy::requiring(required);
    policy.validate()?;

    let text =
        std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let response = BackendResponse::parse(&text)
        .with_context(|| format!("{} is not a detection response", file.display()))?;

    let normalized = DetectionNormalizer::default().normalize(&response.predictions);
    let verdict = ComplianceEngine::new(Taxonomy::default(), policy)
        .aggregate(&normalized.detections, threshold);

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "image": response.image,
            "verdict": verdict,
            "validation_errors": normalized.errors,
            "warnings": normalized.warnings,
        }))?
    );

    if !normalized.errors.is_empty() {
        log::warn!("{} validation errors", normalized.errors.len());
        std::process::exit(1);
    }
    Ok(())
}

fn health(config_path: Option<&Path>) -> Result<()> {
    let config = InspectorConfig::load_from(config_path)?;
    let mut healthy = false;
    for role in [BackendRole::Primary, BackendRole::Secondary] {
        let endpoint = config.backend.endpoint(role);
        match HttpBackendClient::new(role).probe(&config.backend) {
            Ok(status) => {
                healthy = true;
                println!("{:<9} {} OK (HTTP {})", role.as_str(), endpoint, status);
            }
            Err(e) => println!("{:<9} {} FAILED: {}", role.as_str(), endpoint, e),
        }
    }
    if !healthy {
        return Err(anyhow!("no detection backend is reachable"));
    }
    Ok(())
}
