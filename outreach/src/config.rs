//! Command line and environment configuration
//!
//! File locations and policy knobs come from the command line. SMTP
//! credentials and the webhook URL come from the environment, with a `.env`
//! file in the working directory (or a parent) loaded first if present.
//! Variables already set in the environment take precedence over `.env`.
//!
//! ## Environment
//! - `SMTP_HOST` (required), `SMTP_PORT` (default 587)
//! - `SMTP_USER`, `SMTP_PASS`: login, both or neither
//! - `SMTP_FROM`: sender address, defaults to `SMTP_USER`
//! - `FROM_NAME`: display name of the sender
//! - `SMTP_TLS`: `starttls` (default), `tls` or `none`
//! - `SMTP_TIMEOUT`: connection timeout in seconds
//! - `DISCORD_WEBHOOK_URL`: post send outcomes to Discord
//! - `SUBJECT_TEMPLATE`: subject used when `--subject` is not given

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::core::{FollowupFailurePolicy, SelectionPolicy, SelectionRules};
use crate::error::{OutreachError, OutreachResult};
use crate::orchestrator::{RunSettings, DEFAULT_SUBJECT};
use crate::services::{SmtpConfig, TlsMode};

/// Sends at most one outreach email per invocation
#[derive(Parser, Debug, Clone)]
#[command(name = "outreach")]
#[command(about = "Stateful cold-outreach mailer: one fresh email or follow-up per run")]
pub struct Args {
    /// Lead table (CSV with an Email column)
    #[arg(long, default_value = "leads.csv")]
    pub leads: PathBuf,

    /// Template directory holding fresh/ and followup/ subdirectories
    #[arg(long, default_value = "email-templates")]
    pub templates: PathBuf,

    /// Run state file remembering which stage goes first next time
    #[arg(long, default_value = "run_state.json")]
    pub state_file: PathBuf,

    /// Selection policy (alternating, followup-first)
    #[arg(long, default_value = "alternating")]
    pub policy: SelectionPolicy,

    /// Days to wait after the fresh email before following up; 0 follows up at once
    #[arg(long, default_value = "3")]
    pub follow_up_after_days: u32,

    /// What a failed follow-up does to the lead (mark-failed, retain)
    #[arg(long, default_value = "mark-failed")]
    pub on_followup_failure: FollowupFailurePolicy,

    /// Send attempts per lead before a retained follow-up is marked FAILED
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Flip the alternation pointer even when the send failed
    #[arg(long)]
    pub advance_on_failure: bool,

    /// Subject template with {Field} placeholders
    #[arg(long)]
    pub subject: Option<String>,

    /// Fresh template file name instead of a random one
    #[arg(long)]
    pub fresh_template: Option<String>,

    /// Follow-up template file name instead of a random one
    #[arg(long)]
    pub followup_template: Option<String>,

    /// Print lead counts per status and exit without sending
    #[arg(long)]
    pub summary: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn selection_rules(&self) -> SelectionRules {
        SelectionRules {
            policy: self.policy,
            follow_up_after: chrono::Duration::days(i64::from(self.follow_up_after_days)),
        }
    }

    /// Run settings, falling back to `subject_fallback` and then the built-in subject
    pub fn run_settings(&self, subject_fallback: Option<String>) -> RunSettings {
        let subject_template = self
            .subject
            .clone()
            .or(subject_fallback)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

        RunSettings {
            rules: self.selection_rules(),
            followup_failure: self.on_followup_failure,
            max_attempts: self.max_attempts,
            advance_on_failure: self.advance_on_failure,
            subject_template,
            fresh_template: self.fresh_template.clone(),
            followup_template: self.followup_template.clone(),
        }
    }
}

/// Settings read from the environment
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub smtp: SmtpConfig,
    pub discord_webhook_url: Option<String>,
    pub subject_template: Option<String>,
}

impl EnvConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> OutreachResult<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> OutreachResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("SMTP_HOST").ok_or_else(|| OutreachError::config("SMTP_HOST", "not set"))?;
        let username = get("SMTP_USER");
        let password = get("SMTP_PASS");
        if username.is_some() != password.is_some() {
            return Err(OutreachError::config(
                "SMTP_USER/SMTP_PASS",
                "set both or neither",
            ));
        }

        let from = get("SMTP_FROM")
            .or_else(|| username.clone())
            .ok_or_else(|| OutreachError::config("SMTP_FROM", "not set and no SMTP_USER to fall back to"))?;

        let port = match get("SMTP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| OutreachError::config("SMTP_PORT", format!("'{raw}' is not a port")))?,
            None => SmtpConfig::DEFAULT_PORT,
        };

        let tls = match get("SMTP_TLS") {
            Some(raw) => raw.parse::<TlsMode>()?,
            None => TlsMode::default(),
        };

        let timeout = match get("SMTP_TIMEOUT") {
            Some(raw) => Some(Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                OutreachError::config("SMTP_TIMEOUT", format!("'{raw}' is not a number of seconds"))
            })?)),
            None => None,
        };

        Ok(Self {
            smtp: SmtpConfig {
                host,
                port,
                username,
                password,
                from,
                from_name: get("FROM_NAME"),
                tls,
                timeout,
            },
            discord_webhook_url: get("DISCORD_WEBHOOK_URL"),
            subject_template: lookup("SUBJECT_TEMPLATE").filter(|v| !v.trim().is_empty()),
        })
    }
}
