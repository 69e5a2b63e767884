//! Service implementations
//!
//! This module contains the production implementations of the service traits.
//! These handle the actual I/O: the CSV lead table, the run state file,
//! template files, SMTP and the webhook.

pub mod atomic;
pub mod clock;
pub mod lead_store;
pub mod notifier;
pub mod run_state_store;
pub mod smtp;
pub mod templates;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use clock::SystemClock;
pub use lead_store::CsvLeadStore;
pub use notifier::DiscordNotifier;
pub use run_state_store::JsonRunStateStore;
pub use smtp::{SmtpConfig, SmtpMailSender, TlsMode};
pub use templates::FileTemplateRenderer;
