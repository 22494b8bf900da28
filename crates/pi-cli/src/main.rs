//! `public-inspection` command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pi_consensus::ApprovalState;
use pi_core::{
    init_logging, CalculateBoundaries, CaptureSignatures, Configuration, InspectionSettings,
    LogFormat, SetupDataSources, SetupOutcome,
};
use pi_signature::IntakeOutcome;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "public-inspection", version, about = "Cadastral public inspection tools")]
struct Cli {
    /// Configuration file (TOML, JSON, or YAML)
    #[arg(long, short)]
    config: PathBuf,

    /// Project folder; defaults to the configuration file's folder
    #[arg(long)]
    project: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    log_format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a load dataset against the LADM reference schema
    Validate { load: PathBuf },
    /// Validate a load dataset and rebuild the survey and inspection data
    Setup { load: PathBuf },
    /// Capture a party's signature and record the party's decisions
    CaptureSignature {
        #[arg(long)]
        legal_id: String,
        #[arg(long)]
        party: String,
        /// Neighbor decision as `<label>=<Yes|No>`, repeatable
        #[arg(long = "decision", value_parser = parse_decision)]
        decisions: Vec<(String, ApprovalState)>,
    },
    /// Recalculate every boundary state
    CalculateBoundaries,
}

fn parse_decision(text: &str) -> Result<(String, ApprovalState), String> {
    let (label, state) = text
        .rsplit_once('=')
        .ok_or_else(|| format!("expected <label>=<decision>, got '{text}'"))?;
    let state: ApprovalState = state.parse().map_err(|e| format!("{e}"))?;
    Ok((label.trim().to_string(), state))
}

fn settings(cli: &Cli) -> Result<InspectionSettings> {
    let config = Configuration::from_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let folder = cli.project.clone().unwrap_or_else(|| {
        cli.config
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    });
    Ok(InspectionSettings::resolve(&config, folder)?)
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = settings(cli)?;
    match &cli.command {
        Command::Validate { load } => {
            let report = SetupDataSources::new(settings).validate(load)?;
            for message in report.messages() {
                println!("{message}");
            }
            Ok(if report.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Setup { load } => match SetupDataSources::new(settings).execute(load)? {
            SetupOutcome::Completed(report) => {
                println!(
                    "survey rows: {}, merged rows: {}, orphans removed: {}, records: {}, layers: {}",
                    report.survey_rows,
                    report.merge.rows_appended(),
                    report.merge.cleanup.orphans_removed,
                    report.records_created,
                    report.map.layers
                );
                Ok(ExitCode::SUCCESS)
            }
            SetupOutcome::Invalid(report) => {
                for message in report.messages() {
                    eprintln!("{message}");
                }
                Ok(ExitCode::FAILURE)
            }
        },
        Command::CaptureSignature {
            legal_id,
            party,
            decisions,
        } => {
            let outcome = CaptureSignatures::new(settings).execute(legal_id, party, decisions)?;
            match outcome {
                IntakeOutcome::Attached {
                    approvals,
                    images,
                    boundaries,
                } => {
                    println!(
                        "approvals: {}, images: {}, boundaries: {}",
                        approvals.updated.len(),
                        images,
                        boundaries.updated.len()
                    );
                    for outcome in &boundaries.updated {
                        println!("  {} {}", outcome.boundary_id, outcome.state);
                    }
                }
                IntakeOutcome::Declined => println!("signature declined"),
                IntakeOutcome::Skipped(reason) => println!("skipped: {reason}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::CalculateBoundaries => {
            let report = CalculateBoundaries::new(settings).execute()?;
            println!(
                "boundaries updated: {}, failed: {}",
                report.updated.len(),
                report.failed.len()
            );
            Ok(if report.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = match cli.log_format {
        Format::Text => LogFormat::Text,
        Format::Json => LogFormat::Json,
    };
    if let Err(e) = init_logging(cli.log_level.as_deref(), format) {
        eprintln!("cannot initialize logging: {e}");
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn decisions_parse_from_label_and_state() {
        assert_eq!(
            parse_decision("North - Luis Gomez=No").unwrap(),
            ("North - Luis Gomez".to_string(), ApprovalState::No)
        );
        assert!(parse_decision("North").is_err());
        assert!(parse_decision("North=Maybe").is_err());
    }

    #[test]
    fn capture_signature_collects_decisions() {
        let cli = Cli::try_parse_from([
            "public-inspection",
            "--config",
            "project/config.toml",
            "capture-signature",
            "--legal-id",
            "LEGAL-001",
            "--party",
            "Ana Perez",
            "--decision",
            "North=No",
            "--decision",
            "East=Yes",
        ])
        .unwrap();
        let Command::CaptureSignature { decisions, .. } = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].1, ApprovalState::No);
    }
}
