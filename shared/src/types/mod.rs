//! Core types used throughout the outreach system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::errors::{SharedError, SharedResult};

pub mod time;

pub use time::{format_timestamp_utc, parse_timestamp};

/// Global run ID singleton - set once per invocation
static RUN_ID: OnceLock<RunId> = OnceLock::new();

/// Identifier for a single invocation of the mailer
///
/// Every log line emitted through the `run_*` macros carries this ID so that
/// the output of one scheduled run can be told apart from the next.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh short identifier
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self(id[..8].to_string())
    }

    /// Initialize the global run ID for this process
    pub fn init() -> &'static RunId {
        RUN_ID.get_or_init(RunId::generate)
    }

    /// Get the global run ID, initializing it on first use
    pub fn current() -> &'static RunId {
        RUN_ID.get_or_init(RunId::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run_{}", self.0)
    }
}

/// Campaign stage of an outreach email
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// First contact with a lead
    #[default]
    Fresh,
    /// Single threaded reply after a fresh send
    Followup,
}

impl Stage {
    /// The complementary stage
    pub fn opposite(self) -> Self {
        match self {
            Stage::Fresh => Stage::Followup,
            Stage::Followup => Stage::Fresh,
        }
    }

    /// Directory / wire name of the stage
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fresh => "fresh",
            Stage::Followup => "followup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = SharedError;

    fn from_str(s: &str) -> SharedResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "fresh" => Ok(Stage::Fresh),
            "followup" | "follow-up" | "follow_up" => Ok(Stage::Followup),
            _ => Err(SharedError::InvalidStage { input: s.to_string() }),
        }
    }
}

/// Outreach status recorded in a lead's `Status` column
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum LeadStatus {
    /// Never contacted
    #[default]
    Pending,
    /// Fresh email delivered to the transport
    Sent,
    /// Last send attempt raised an error
    Failed,
    /// First (and only) follow-up done
    FollowedUp,
    /// Any other non-empty value found in the table, kept verbatim
    Other(String),
}

impl LeadStatus {
    pub const SENT: &'static str = "SENT";
    pub const FAILED: &'static str = "FAILED";
    pub const FOLLOWED_UP: &'static str = "f1";

    /// Parse a raw column value; blank cells mean "never contacted"
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => LeadStatus::Pending,
            Self::SENT => LeadStatus::Sent,
            Self::FAILED => LeadStatus::Failed,
            Self::FOLLOWED_UP => LeadStatus::FollowedUp,
            other => LeadStatus::Other(other.to_string()),
        }
    }

    /// Column value written back to the table
    pub fn as_str(&self) -> &str {
        match self {
            LeadStatus::Pending => "",
            LeadStatus::Sent => Self::SENT,
            LeadStatus::Failed => Self::FAILED,
            LeadStatus::FollowedUp => Self::FOLLOWED_UP,
            LeadStatus::Other(value) => value,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LeadStatus::Pending)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadStatus::Pending => f.write_str("(empty)"),
            other => f.write_str(other.as_str()),
        }
    }
}
