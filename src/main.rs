//! Watchlist screening — command-line runner.
//!
//! Runs one workflow per invocation and prints a JSON result record on
//! stdout. Logs go to stderr.
//!
//! ## Commands
//!
//! - `case --name <NAME> [--country <ISO3>]`          — Screen an organisation
//! - `report --case-id <ID> --creation-date <DATE>`   — Request a dossier and wait for it

use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watchlist_screening::{
    models::{ReportOptions, ReportRequest},
    request_and_await_report, submit_case, ApiConfig, ReportError, SignedClient,
};

#[derive(Debug, Parser)]
#[command(name = "watchlist-screening", version, about = "Screen entities and fetch case dossiers")]
struct Cli {
    /// Caller record identifier, echoed back in the output
    #[arg(long, global = true)]
    record_id: Option<String>,

    /// Group to screen in; defaults to SCREENING_GROUP_ID
    #[arg(long, global = true)]
    group_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a screening case for an organisation
    Case {
        #[arg(long)]
        name: String,
        /// ISO 3166 alpha-3 country code (default USA)
        #[arg(long)]
        country: Option<String>,
    },
    /// Request a case dossier report and poll until it settles
    Report {
        #[arg(long)]
        case_id: String,
        /// Case creation date, YYYY-MM-DD
        #[arg(long)]
        creation_date: NaiveDate,
        /// Entity name used in the report name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        max_attempts: Option<u32>,
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialise structured logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "watchlist_screening=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ApiConfig::from_env()?;
    let client = SignedClient::from_config(&config)?;
    let group_id = cli.group_id.clone().unwrap_or_else(|| config.group_id.clone());
    let record_id = cli.record_id.clone().unwrap_or_else(|| "unknown".into());

    let (success, mut output) = match cli.command {
        Command::Case { name, country } => {
            match submit_case(&client, &name, country.as_deref(), &group_id).await {
                Ok(result) => (true, serde_json::to_value(result.summary())?),
                Err(e) => {
                    tracing::error!("Case submission failed: {e}");
                    (false, json!({ "error": e.to_string(), "retryable": e.is_retryable() }))
                }
            }
        }
        Command::Report {
            case_id,
            creation_date,
            name,
            max_attempts,
            poll_interval_ms,
        } => {
            let mut policy = config.poll;
            if let Some(n) = max_attempts {
                policy.max_attempts = n;
            }
            if let Some(ms) = poll_interval_ms {
                policy.interval = std::time::Duration::from_millis(ms);
            }
            let request = ReportRequest {
                case_id,
                group_id,
                creation_date,
                options: ReportOptions {
                    report_name: name.map(|n| format!("Dossier_{n}")),
                    ..ReportOptions::default()
                },
            };
            match request_and_await_report(&client, &request, &policy).await {
                Ok(outcome) => (true, serde_json::to_value(outcome)?),
                Err(e) => {
                    tracing::error!("Report workflow failed: {e}");
                    (false, report_failure(&e))
                }
            }
        }
    };

    if let Value::Object(fields) = &mut output {
        fields.insert("success".into(), json!(success));
        fields.entry("error").or_insert_with(|| json!(""));
        fields.insert("recordId".into(), json!(record_id));
    }
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn report_failure(e: &ReportError) -> Value {
    let mut out = json!({ "error": e.to_string(), "retryable": e.is_retryable() });
    match e {
        ReportError::Failed { report_id, diagnostic } => {
            out["status"] = json!("FAILED");
            out["reportId"] = json!(report_id);
            out["detail"] = json!(diagnostic);
        }
        ReportError::TimedOut { report_id, attempts } => {
            out["status"] = json!("TIMED_OUT");
            out["reportId"] = json!(report_id);
            out["attempts"] = json!(attempts);
        }
        ReportError::Remote { status, .. } => {
            out["status"] = json!("FAILED");
            out["statusCode"] = json!(status);
        }
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn report_command_parses_date() {
        let cli = Cli::parse_from([
            "watchlist-screening",
            "report",
            "--case-id",
            "c-1",
            "--creation-date",
            "2026-02-05",
            "--record-id",
            "rec1",
        ]);
        assert_eq!(cli.record_id.as_deref(), Some("rec1"));
        match cli.command {
            Command::Report { case_id, creation_date, .. } => {
                assert_eq!(case_id, "c-1");
                assert_eq!(creation_date, NaiveDate::from_ymd_opt(2026, 2, 5).unwrap());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn failed_report_output_carries_detail() {
        let out = report_failure(&ReportError::Failed {
            report_id: "r-1".into(),
            diagnostic: "{\"errors\":[]}".into(),
        });
        assert_eq!(out["status"], "FAILED");
        assert_eq!(out["detail"], "{\"errors\":[]}");
        assert_eq!(out["retryable"], false);

        let out = report_failure(&ReportError::TimedOut { report_id: "r-1".into(), attempts: 10 });
        assert_eq!(out["status"], "TIMED_OUT");
        assert_eq!(out["retryable"], true);
    }
}
