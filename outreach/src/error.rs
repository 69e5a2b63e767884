//! Outreach-specific error types

use thiserror::Error;
use shared::{SharedError, Stage};

#[derive(Error, Debug)]
pub enum OutreachError {
    #[error("Failed to load lead table {path}: {reason}")]
    LeadTableLoad { path: String, reason: String },

    #[error("Invalid lead table: {reason}")]
    InvalidLeadTable { reason: String },

    #[error("Lead not found: {email}")]
    LeadNotFound { email: String },

    #[error("No {stage} template available in {location}")]
    TemplateNotFound { stage: Stage, location: String },

    /// `permanent` marks rejections that retrying cannot fix (SMTP 5xx)
    #[error("Send to {recipient} failed: {message}")]
    SendFailed {
        recipient: String,
        message: String,
        permanent: bool,
    },

    #[error("Invalid email address: {address}")]
    InvalidAddress { address: String },

    #[error("Failed to persist {path}: {reason}")]
    Persist { path: String, reason: String },

    #[error("Notification failed: {message}")]
    Notification { message: String },

    #[error("Configuration error: {field}: {message}")]
    Configuration { field: String, message: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl OutreachError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        OutreachError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn send_failed(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        OutreachError::SendFailed {
            recipient: recipient.into(),
            message: message.into(),
            permanent: false,
        }
    }

    pub fn send_rejected(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        OutreachError::SendFailed {
            recipient: recipient.into(),
            message: message.into(),
            permanent: true,
        }
    }

    /// Whether sending to the same recipient again is pointless
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            OutreachError::SendFailed { permanent: true, .. } | OutreachError::InvalidAddress { .. }
        )
    }
}

pub type OutreachResult<T> = Result<T, OutreachError>;
