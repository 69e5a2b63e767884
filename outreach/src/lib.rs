//! Stateful cold-outreach mailer
//!
//! Each invocation reads the lead table, picks at most one lead that is due
//! either a fresh email or its single follow-up, sends it and records the
//! outcome back into the table so later runs never resend inappropriately.

pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use crate::core::{FollowupFailurePolicy, Lead, LeadTable, RunOutcome, RunState, SelectionPolicy};
pub use config::{Args, EnvConfig};
pub use error::{OutreachError, OutreachResult};
pub use orchestrator::{Orchestrator, RunSettings};
pub use traits::{Clock, LeadStore, MailSender, Notifier, RunStateStore, TemplateRenderer};
