//! anaokulu admin CLI.
//!
//! Drives the back-office engines from the command line: consistency
//! reports and repair, application approval/rejection, confirmation
//! resends, and a `watch` mode that keeps the audit job running.
//!
//! # Usage
//!
//! ```bash
//! # One-off consistency report
//! anaokulu-admin --url https://project.supabase.co --service-key $KEY report
//!
//! # Repair everything fixable
//! anaokulu-admin report   # inspect first
//! anaokulu-admin fix
//!
//! # Run the audit every 5 minutes with auto-repair
//! ANAOKULU__URL=... ANAOKULU__SERVICE_KEY=... anaokulu-admin watch --auto-fix
//! ```

mod cli;

use std::{io::IsTerminal, process::ExitCode, sync::Arc, time::Duration};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use anaokulu_engine::{
    ApprovalEngine, AuditJob, ConsistencyAuditor, RedirectConfig, VerificationAuditor,
};
use anaokulu_store::{DirectoryStore, RestStore, StoreConfig};
use anaokulu_types::{AdminError, ApplicationId, Result, error::NotFoundSnafu};

use cli::{Cli, Command, LogFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("  code: {}", e.code());
            eprintln!("  action: {}", e.suggested_action());
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = StoreConfig::builder()
        .with_base_url(&cli.url)
        .with_service_key(&cli.service_key)
        .build()?;
    let store = Arc::new(RestStore::new(config)?);
    let redirects = RedirectConfig {
        password_setup_url: cli.password_setup_url.clone(),
        login_url: cli.login_url.clone(),
    };

    match cli.command {
        Command::Report => {
            let report = ConsistencyAuditor::new(store, redirects).report().await?;
            print_json(&report)?;
        },

        Command::Fix => {
            let report = ConsistencyAuditor::new(store, redirects).fix_all().await?;
            print_json(&report)?;
        },

        Command::Approve { id } => {
            let id = ApplicationId::new(id);
            let application = load_application(store.as_ref(), id).await?;
            let outcome =
                ApprovalEngine::new(store.clone(), redirects).approve(&application).await?;
            if outcome.email_sent {
                println!("approved {id}: account {} created, email sent", outcome.identity_id);
            } else {
                println!(
                    "approved {id}: account {} created, credential email FAILED — resend it",
                    outcome.identity_id
                );
            }
        },

        Command::Reject { id } => {
            let id = ApplicationId::new(id);
            let application = load_application(store.as_ref(), id).await?;
            ApprovalEngine::new(store.clone(), redirects).reject(&application).await?;
            println!("rejected {id}");
        },

        Command::VerifyReport => {
            let report = VerificationAuditor::new(store, redirects).report().await?;
            print_json(&report)?;
        },

        Command::Resend { email } => {
            VerificationAuditor::new(store, redirects).resend(&email).await?;
            println!("confirmation email resent to {email}");
        },

        Command::ResendAll => {
            let report = VerificationAuditor::new(store, redirects).resend_all().await?;
            print_json(&report)?;
        },

        Command::VerifyManually { email } => {
            VerificationAuditor::new(store, redirects).verify_manually(&email).await?;
            println!("{email} marked as verified");
        },

        Command::Watch { interval_secs, auto_fix } => {
            let handle = AuditJob::builder()
                .store(store)
                .redirects(redirects)
                .interval(Duration::from_secs(interval_secs))
                .auto_fix(auto_fix)
                .build()
                .start();

            tracing::info!("Watching; press Ctrl+C to stop");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            }
            handle.abort();
            tracing::info!("Audit job stopped");
        },
    }

    Ok(())
}

/// Loads an application or fails with a not-found error.
async fn load_application(store: &RestStore, id: ApplicationId) -> Result<anaokulu_types::Application> {
    store
        .get_application(id)
        .await
        .map_err(AdminError::from)?
        .ok_or_else(|| NotFoundSnafu { entity: format!("application {id}") }.build())
}

/// Pretty-prints a report for the operator.
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| AdminError::Internal {
        message: format!("failed to render report: {e}"),
        location: snafu::Location::default(),
    })?;
    println!("{rendered}");
    Ok(())
}

/// Initializes the logging system.
///
/// Supports three formats:
/// - `Text`: Human-readable format (development)
/// - `Json`: JSON structured logging (production)
/// - `Auto`: JSON for non-TTY stdout, text otherwise
fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        // JSON format for production / log aggregation
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init();
    } else {
        // Human-readable text format for development
        tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
    }
}
