// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Madori CLI - floor-plan conversion, synthesis and checking.
//!
//! # Commands
//!
//! - `madori convert <detections.json>` - detector boxes to site, rooms and graph
//! - `madori synthesize <request.json>` - requirements to a layout document
//! - `madori plan <detections.json>` - detector boxes to a fresh layout document
//! - `madori check <layout.json>` - audit a layout document (exit code 1 on errors)
//! - `madori variants <request.json> --bedrooms 2,3,4` - one layout per bedroom count
//! - `madori preset --floors 2` - the default 3LDK house on an open site

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use madori_core::RoomType;
use madori_layout::{
    audit_document, plan_from_detections, plan_from_requirements, BuildingConstraints, LayoutDocument,
    LayoutRequest, PlannerConfig, RoomRequest, Severity, Violation, DEFAULT_TIME_LIMIT_SECS,
};
use madori_vision::{Converter, DetectionInput};
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "madori", version)]
#[command(about = "Convert floor-plan detections and synthesize code-compliant room layouts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert detector output into a site, rooms and an adjacency graph
    Convert {
        input: PathBuf,
        /// Emit meters with y up instead of image pixels
        #[arg(long)]
        metric: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Synthesize a layout from a requirement document
    Synthesize {
        input: PathBuf,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Synthesize a layout for the site and rooms found in detector output
    Plan {
        input: PathBuf,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Audit a layout document against the building code
    Check {
        input: PathBuf,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Synthesize one layout per bedroom count, in parallel
    Variants {
        input: PathBuf,
        /// Bedroom counts, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        bedrooms: Vec<usize>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Synthesize the default 3LDK house on an open rectangular site
    Preset {
        /// Site width in meters
        #[arg(long, default_value_t = 15.0)]
        site_width: f64,
        /// Site depth in meters
        #[arg(long, default_value_t = 12.0)]
        site_height: f64,
        #[arg(long, default_value_t = 1)]
        floors: u32,
        /// Print the requirement document instead of solving it
        #[arg(long)]
        request_only: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Building constants (JSON)
    #[arg(long)]
    constraints: Option<PathBuf>,

    /// Solver time limit in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Relax soft rules when the layout is infeasible
    #[arg(long)]
    relax: bool,

    /// Output file (stdout when omitted)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct AuditReport {
    errors: usize,
    warnings: usize,
    violations: Vec<Violation>,
}

#[derive(Serialize)]
struct Variant {
    bedrooms: usize,
    document: LayoutDocument,
}

fn main() -> ExitCode {
    let config = Config::from_env();
    init_tracing(config.log_format);

    match run(Cli::parse(), &config) {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            tracing::error!(error = %message, "Command failed");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,madori=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

fn run(cli: Cli, config: &Config) -> Result<ExitCode> {
    match cli.command {
        Command::Convert { input, metric, common } => {
            let detections = read_detections(&input)?;
            let planner = planner_config(&common, config)?;
            let conversion = Converter::new(planner.converter).convert(&detections)?;
            for warning in &conversion.warnings {
                tracing::warn!(%warning, "Conversion warning");
            }
            let conversion = if metric { conversion.to_metric()? } else { conversion };
            write_output(common.output.as_deref(), &conversion.to_json()?)?;
        }
        Command::Synthesize { input, common } => {
            let request = read_request(&input, &common, config)?;
            let doc = plan_from_requirements(&request, &planner_config(&common, config)?)?;
            report_status(&doc);
            write_output(common.output.as_deref(), &doc.to_json_pretty()?)?;
        }
        Command::Plan { input, common } => {
            let detections = read_detections(&input)?;
            let doc = plan_from_detections(&detections, &planner_config(&common, config)?)?;
            report_status(&doc);
            write_output(common.output.as_deref(), &doc.to_json_pretty()?)?;
        }
        Command::Check { input, common } => {
            let json = read(&input)?;
            let doc = LayoutDocument::from_json(&json)
                .with_context(|| format!("Failed to parse layout document {}", input.display()))?;
            let planner = planner_config(&common, config)?;
            let violations = audit_document(&doc, &planner.constraints, planner.rules)?;
            let errors = violations.iter().filter(|v| v.severity == Severity::Error).count();
            let report = AuditReport {
                errors,
                warnings: violations.len() - errors,
                violations,
            };
            tracing::info!(errors = report.errors, warnings = report.warnings, "Audit finished");
            write_output(common.output.as_deref(), &serde_json::to_string_pretty(&report)?)?;
            if errors > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Variants {
            input,
            bedrooms,
            common,
        } => {
            let request = read_request(&input, &common, config)?;
            let planner = planner_config(&common, config)?;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .build()
                .context("Failed to initialize rayon thread pool")?;
            tracing::info!(
                variants = bedrooms.len(),
                worker_threads = config.worker_threads,
                "Generating variants"
            );
            let variants = pool.install(|| {
                bedrooms
                    .par_iter()
                    .map(|&count| -> Result<Variant> {
                        let variant = with_bedrooms(&request, count);
                        let document = plan_from_requirements(&variant, &planner)
                            .with_context(|| format!("Variant with {count} bedroom(s) failed"))?;
                        Ok(Variant {
                            bedrooms: count,
                            document,
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })?;
            for v in &variants {
                tracing::info!(bedrooms = v.bedrooms, status = %v.document.status, "Variant finished");
            }
            write_output(common.output.as_deref(), &serde_json::to_string_pretty(&variants)?)?;
        }
        Command::Preset {
            site_width,
            site_height,
            floors,
            request_only,
            common,
        } => {
            let mut request = LayoutRequest::preset_3ldk(site_width, site_height, floors);
            if let Some(limit) = time_limit(&common, config) {
                request.time_limit_seconds = limit;
            }
            request.validate()?;
            if request_only {
                write_output(common.output.as_deref(), &serde_json::to_string_pretty(&request)?)?;
                return Ok(ExitCode::SUCCESS);
            }
            let doc = plan_from_requirements(&request, &planner_config(&common, config)?)?;
            report_status(&doc);
            write_output(common.output.as_deref(), &doc.to_json_pretty()?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn planner_config(common: &CommonArgs, config: &Config) -> Result<PlannerConfig> {
    let constraints = match &common.constraints {
        Some(path) => BuildingConstraints::from_json(&read(path)?)
            .with_context(|| format!("Invalid constraints file {}", path.display()))?,
        None => {
            let mut constraints = BuildingConstraints::default();
            if let Some(module) = config.grid_module_m {
                constraints.grid_module_m = module;
            }
            constraints.validate()?;
            constraints
        }
    };
    Ok(PlannerConfig {
        constraints,
        relax: common.relax,
        detector_time_limit_seconds: time_limit(common, config).unwrap_or(DEFAULT_TIME_LIMIT_SECS),
        ..Default::default()
    })
}

/// `--time-limit`, then `MADORI_TIME_LIMIT_SECS`.
fn time_limit(common: &CommonArgs, config: &Config) -> Option<f64> {
    common.time_limit.or(config.time_limit_secs)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_detections(path: &Path) -> Result<DetectionInput> {
    DetectionInput::from_json(&read(path)?)
        .with_context(|| format!("Failed to parse detector output {}", path.display()))
}

fn read_request(path: &Path, common: &CommonArgs, config: &Config) -> Result<LayoutRequest> {
    let mut request = LayoutRequest::from_json(&read(path)?)
        .with_context(|| format!("Failed to parse requirements {}", path.display()))?;
    if let Some(limit) = time_limit(common, config) {
        request.time_limit_seconds = limit;
    }
    Ok(request)
}

fn write_output(path: Option<&Path>, json: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, json).with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn report_status(doc: &LayoutDocument) {
    tracing::info!(
        status = %doc.status,
        rooms = doc.rooms.len(),
        coverage_ratio = doc.coverage_ratio,
        floor_area_ratio = doc.floor_area_ratio,
        warnings = doc.metadata.warnings.len(),
        "Layout finished"
    );
}

/// The request with exactly `count` bedrooms, modeled on its first bedroom.
fn with_bedrooms(request: &LayoutRequest, count: usize) -> LayoutRequest {
    let template = request
        .rooms
        .iter()
        .find(|r| r.room_type == RoomType::Bedroom)
        .cloned()
        .unwrap_or_else(|| RoomRequest::new(RoomType::Bedroom));
    let mut variant = request.clone();
    variant.rooms.retain(|r| r.room_type != RoomType::Bedroom);
    variant.rooms.extend(std::iter::repeat(template).take(count));
    variant
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bedroom_variants_keep_other_rooms() {
        let request = LayoutRequest::new(
            12.0,
            10.0,
            vec![
                RoomRequest::new(RoomType::Living),
                RoomRequest::new(RoomType::Bedroom).with_min_area(8.0),
                RoomRequest::new(RoomType::Bath),
            ],
        );
        let variant = with_bedrooms(&request, 3);
        let bedrooms: Vec<_> = variant
            .rooms
            .iter()
            .filter(|r| r.room_type == RoomType::Bedroom)
            .collect();
        assert_eq!(bedrooms.len(), 3);
        assert!(bedrooms.iter().all(|r| r.min_area == Some(8.0)));
        assert_eq!(variant.rooms.len(), 5);
        assert_eq!(with_bedrooms(&request, 0).rooms.len(), 2);
    }

    #[test]
    fn parses_variant_counts() {
        let cli = Cli::try_parse_from(["madori", "variants", "req.json", "--bedrooms", "2,3", "--relax"]).unwrap();
        match cli.command {
            Command::Variants { bedrooms, common, .. } => {
                assert_eq!(bedrooms, vec![2, 3]);
                assert!(common.relax);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn preset_defaults_to_fifteen_by_twelve() {
        let cli = Cli::try_parse_from(["madori", "preset", "--request-only"]).unwrap();
        match cli.command {
            Command::Preset {
                site_width,
                site_height,
                floors,
                request_only,
                ..
            } => {
                assert_eq!((site_width, site_height, floors), (15.0, 12.0, 1));
                assert!(request_only);
            }
            other => panic!("unexpected command {other:?}"),
        }
        let cli = Cli::try_parse_from(["madori", "preset", "--floors", "2", "--time-limit", "5"]).unwrap();
        assert!(matches!(cli.command, Command::Preset { floors: 2, .. }));
    }
}
