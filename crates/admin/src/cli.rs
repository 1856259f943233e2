//! Command-line interface definition.
//!
//! Flags fall back to `ANAOKULU__*` environment variables so the binary can
//! run unattended (cron, container) without leaking the service key into
//! shell history.

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

/// Admin CLI for the anaokulu back office.
#[derive(Debug, Parser)]
#[command(name = "anaokulu-admin", version, about)]
pub struct Cli {
    /// Backend base URL (e.g., https://project.supabase.co).
    #[arg(long, env = "ANAOKULU__URL")]
    pub url: String,

    /// Service-role key used for every backend call.
    #[arg(long, env = "ANAOKULU__SERVICE_KEY", hide_env_values = true)]
    pub service_key: String,

    /// Redirect target for credential-setup email links.
    #[arg(long, env = "ANAOKULU__PASSWORD_SETUP_URL", default_value = "/auth/set-veli-password")]
    pub password_setup_url: String,

    /// Redirect target for resent confirmation email links.
    #[arg(long, env = "ANAOKULU__LOGIN_URL", default_value = "/auth/login")]
    pub login_url: String,

    /// Log output format.
    #[arg(long, env = "ANAOKULU__LOG_FORMAT", value_enum, default_value = "auto")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// JSON for non-TTY stdout, text otherwise.
    Auto,
    /// Human-readable text.
    Text,
    /// JSON structured logging.
    Json,
}

/// Admin operations.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the consistency report as JSON.
    Report,

    /// Repair every auto-fixable inconsistency and print the outcome.
    Fix,

    /// Approve a pending application by id.
    Approve {
        /// Application id.
        #[arg(long)]
        id: Uuid,
    },

    /// Reject a pending application by id.
    Reject {
        /// Application id.
        #[arg(long)]
        id: Uuid,
    },

    /// Print the email verification report as JSON.
    VerifyReport,

    /// Resend the confirmation email to one address.
    Resend {
        /// Recipient email.
        #[arg(long)]
        email: String,
    },

    /// Resend the confirmation email to every unverified address.
    ResendAll,

    /// Stamp an email confirmed without the user clicking the link.
    VerifyManually {
        /// Subject email.
        #[arg(long)]
        email: String,
    },

    /// Run the periodic audit job until interrupted.
    Watch {
        /// Seconds between audit cycles.
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,

        /// Repair fixable inconsistencies in each cycle.
        #[arg(long)]
        auto_fix: bool,
    },
}
