//! Test fixtures and data for outreach tests
//!
//! Consistent lead tables, templates and timestamps used across suites.

use chrono::{DateTime, Duration, TimeZone, Utc};
use shared::format_timestamp_utc;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const HEADER: &'static str = "Email,Name,Company,Status,MessageId,LastSentAt";

    pub const FRESH_TEMPLATE: &'static str = "<p>Hi {Name},<br>how is {Company} doing?</p>";
    pub const FOLLOWUP_TEMPLATE: &'static str = "<p>Just bumping this, {Name}.</p>";

    pub const SUBJECT: &'static str = "Idea for {Company}";
    pub const ANCHOR: &'static str = "<123@y>";

    /// Fixed "now" of every test run
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
    }

    pub fn days_ago(days: i64) -> String {
        format_timestamp_utc(Self::now() - Duration::days(days))
    }

    /// Table with a single never-contacted lead (Scenario A)
    pub fn single_fresh_lead() -> String {
        format!("{}\na@x.com,Ann,Acme,,,\n", Self::HEADER)
    }

    /// Table with a single lead whose fresh email went out `days` ago
    pub fn single_sent_lead(days: i64) -> String {
        format!(
            "{}\nb@x.com,Bob,Globex,SENT,{},{}\n",
            Self::HEADER,
            Self::ANCHOR,
            Self::days_ago(days)
        )
    }

    /// One fresh lead and one follow-up that is long overdue
    pub fn mixed_leads() -> String {
        format!(
            "{}\na@x.com,Ann,Acme,,,\nb@x.com,Bob,Globex,SENT,{},{}\n",
            Self::HEADER,
            Self::ANCHOR,
            Self::days_ago(10)
        )
    }

    pub fn empty_table() -> String {
        format!("{}\n", Self::HEADER)
    }
}
