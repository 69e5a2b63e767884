//! Trait definitions with mockall annotations for testing
//!
//! Every collaborator of the run orchestrator sits behind one of these
//! traits so the lead state machine can be exercised without touching the
//! network or the real lead table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shared::Stage;

use crate::core::{LeadTable, RunState};
use crate::error::OutreachResult;

/// A single email ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    /// HTML body as rendered from the template
    pub body: String,
    /// Thread anchor this message replies to
    pub in_reply_to: Option<String>,
    /// Message-ID to use instead of a generated one
    pub message_id: Option<String>,
}

impl OutgoingMail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            in_reply_to: None,
            message_id: None,
        }
    }

    pub fn in_reply_to(mut self, anchor: impl Into<String>) -> Self {
        self.in_reply_to = Some(anchor.into());
        self
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }
}

/// Durable lead table
///
/// `save` must replace the backing table atomically: a crash mid-write
/// leaves either the old or the new table, never a torn one.
#[mockall::automock]
#[async_trait::async_trait]
pub trait LeadStore: Send + Sync {
    /// Read every lead from the backing table
    async fn load(&self) -> OutreachResult<LeadTable>;

    /// Replace the backing table with `table`
    async fn save(&self, table: &LeadTable) -> OutreachResult<()>;

    /// Human readable location of the table, for logs
    fn location(&self) -> String;
}

/// Persistence of the alternation pointer
#[mockall::automock]
#[async_trait::async_trait]
pub trait RunStateStore: Send + Sync {
    /// Load the pointer; a missing record yields the default state
    async fn load(&self) -> OutreachResult<RunState>;

    /// Persist the pointer for the next invocation
    async fn save(&self, state: &RunState) -> OutreachResult<()>;
}

/// Email body rendering
#[mockall::automock]
#[async_trait::async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Render a body for `stage` using a named template or a random one
    ///
    /// # Errors
    /// `TemplateNotFound` when the stage has no template or the named one
    /// does not exist.
    async fn render(
        &self,
        fields: &BTreeMap<String, String>,
        stage: Stage,
        template: Option<String>,
    ) -> OutreachResult<String>;
}

/// Mail transport
#[mockall::automock]
#[async_trait::async_trait]
pub trait MailSender: Send + Sync {
    /// Submit a message and return its Message-ID
    async fn send(&self, mail: &OutgoingMail) -> OutreachResult<String>;
}

/// Out-of-band notification of send outcomes
#[mockall::automock]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> OutreachResult<()>;
}

/// Source of the current time
#[mockall::automock]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
