//! Result of one invocation and how a failed send folds into lead state

use std::fmt;
use std::str::FromStr;

use shared::{SharedError, Stage};

use super::lead::LeadUpdate;

/// What happens to a lead whose follow-up could not be sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FollowupFailurePolicy {
    /// Take the lead out of rotation: status `FAILED`, thread anchor kept
    #[default]
    MarkFailed,
    /// Leave the lead `SENT` so a later run retries the follow-up, until the
    /// attempt cap is reached or the server rejects it permanently
    Retain,
}

/// A send that did not go through, as seen by the lead it was meant for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub error: String,
    pub permanent: bool,
    /// Attempts on this lead including the failed one
    pub attempts: u32,
}

impl FollowupFailurePolicy {
    /// State change recorded after a failed send at `stage`
    ///
    /// Fresh failures, permanent rejections and retained follow-ups that hit
    /// `max_attempts` all end in `FAILED`.
    pub fn failure_update(self, stage: Stage, failure: &SendFailure, max_attempts: u32) -> LeadUpdate {
        let retry = stage == Stage::Followup
            && self == FollowupFailurePolicy::Retain
            && !failure.permanent
            && failure.attempts < max_attempts;

        let update = if retry {
            LeadUpdate::error_only(&failure.error)
        } else {
            LeadUpdate::failed(&failure.error)
        };
        update.with_attempts(failure.attempts)
    }
}

impl fmt::Display for FollowupFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowupFailurePolicy::MarkFailed => f.write_str("mark-failed"),
            FollowupFailurePolicy::Retain => f.write_str("retain"),
        }
    }
}

impl FromStr for FollowupFailurePolicy {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mark-failed" | "mark_failed" | "failed" => Ok(FollowupFailurePolicy::MarkFailed),
            "retain" | "keep" => Ok(FollowupFailurePolicy::Retain),
            _ => Err(SharedError::InvalidConfig {
                field: "on-followup-failure".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Outcome of a single invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No lead qualified at either stage
    NothingEligible,
    Sent {
        email: String,
        stage: Stage,
        message_id: String,
    },
    SendFailed {
        email: String,
        stage: Stage,
        error: String,
    },
    /// Lead was selected but could not be acted on; nothing changed
    Skipped { email: String, reason: String },
    /// An error ended the run before the outcome could be recorded
    Aborted { email: Option<String>, error: String },
}

impl RunOutcome {
    /// Email address the run acted on, if any
    pub fn email(&self) -> Option<&str> {
        match self {
            RunOutcome::NothingEligible => None,
            RunOutcome::Sent { email, .. }
            | RunOutcome::SendFailed { email, .. }
            | RunOutcome::Skipped { email, .. } => Some(email),
            RunOutcome::Aborted { email, .. } => email.as_deref(),
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, RunOutcome::Sent { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NothingEligible => write!(f, "nothing eligible"),
            RunOutcome::Sent { email, stage, message_id } => {
                write!(f, "sent {stage} email to {email} ({message_id})")
            }
            RunOutcome::SendFailed { email, stage, error } => {
                write!(f, "{stage} email to {email} failed: {error}")
            }
            RunOutcome::Skipped { email, reason } => write!(f, "skipped {email}: {reason}"),
            RunOutcome::Aborted { email: Some(email), error } => write!(f, "aborted on {email}: {error}"),
            RunOutcome::Aborted { email: None, error } => write!(f, "aborted: {error}"),
        }
    }
}
