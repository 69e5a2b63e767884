//! Lead records and the in-memory lead table
//!
//! The table is the pure half of the lead store: it answers the candidate
//! queries and merges updates into rows. Reading and writing the backing file
//! lives in `services::lead_store`.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use shared::{format_timestamp_utc, parse_timestamp, LeadStatus};

use crate::error::{OutreachError, OutreachResult};

/// Well-known column names of the lead table
pub mod columns {
    pub const EMAIL: &str = "Email";
    pub const STATUS: &str = "Status";
    pub const MESSAGE_ID: &str = "MessageId";
    pub const LAST_SENT_AT: &str = "LastSentAt";
    pub const LAST_ERROR: &str = "LastError";
    pub const ATTEMPTS: &str = "Attempts";

    /// State columns created empty when a table is loaded without them
    pub const BACKFILLED: &[&str] = &[STATUS, MESSAGE_ID, LAST_SENT_AT, LAST_ERROR, ATTEMPTS];
}

/// One outreach target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    email: String,
    status: LeadStatus,
    message_id: Option<String>,
    last_sent_at: Option<String>,
    last_error: Option<String>,
    attempts: Option<String>,
    /// Free-form template columns (Name, Company, ...)
    fields: BTreeMap<String, String>,
}

/// Keep a cell verbatim unless it is blank
fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl Lead {
    /// Create a never-contacted lead
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            status: LeadStatus::Pending,
            message_id: None,
            last_sent_at: None,
            last_error: None,
            attempts: None,
            fields: BTreeMap::new(),
        }
    }

    /// Attach a template field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Build a lead from a column → value mapping
    pub fn from_columns(mut values: BTreeMap<String, String>) -> Self {
        let mut take = |name: &str| values.remove(name).unwrap_or_default();

        let email = take(columns::EMAIL).trim().to_string();
        let status = LeadStatus::parse(&take(columns::STATUS));
        let message_id = non_blank(take(columns::MESSAGE_ID));
        let last_sent_at = non_blank(take(columns::LAST_SENT_AT));
        let last_error = non_blank(take(columns::LAST_ERROR));
        let attempts = non_blank(take(columns::ATTEMPTS));

        Self {
            email,
            status,
            message_id,
            last_sent_at,
            last_error,
            attempts,
            fields: values,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn status(&self) -> &LeadStatus {
        &self.status
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref().map(str::trim)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Send attempts recorded so far; unreadable counts read as zero
    pub fn attempts(&self) -> u32 {
        self.attempts
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Raw `LastSentAt` value as stored
    pub fn last_sent_at_raw(&self) -> Option<&str> {
        self.last_sent_at.as_deref()
    }

    /// Parsed `LastSentAt`; unparseable values read as absent
    pub fn last_sent_at(&self) -> Option<DateTime<Utc>> {
        self.last_sent_at.as_deref().and_then(parse_timestamp)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Value of any column, state columns included
    pub fn column(&self, name: &str) -> String {
        match name {
            columns::EMAIL => self.email.clone(),
            columns::STATUS => self.status.as_str().to_string(),
            columns::MESSAGE_ID => self.message_id.clone().unwrap_or_default(),
            columns::LAST_SENT_AT => self.last_sent_at.clone().unwrap_or_default(),
            columns::LAST_ERROR => self.last_error.clone().unwrap_or_default(),
            columns::ATTEMPTS => self.attempts.clone().unwrap_or_default(),
            other => self.fields.get(other).cloned().unwrap_or_default(),
        }
    }

    /// Every column of the row, keyed by column name, for placeholder substitution
    pub fn template_fields(&self) -> BTreeMap<String, String> {
        let mut all = self.fields.clone();
        for name in [
            columns::EMAIL,
            columns::STATUS,
            columns::MESSAGE_ID,
            columns::LAST_SENT_AT,
            columns::LAST_ERROR,
            columns::ATTEMPTS,
        ] {
            all.insert(name.to_string(), self.column(name));
        }
        all
    }

    /// Never contacted and addressable
    pub fn is_fresh_eligible(&self) -> bool {
        !self.email.is_empty() && self.status.is_pending()
    }

    /// Fresh email sent, thread anchor known and, when gated, old enough
    pub fn is_followup_due(&self, due_after: Duration, now: DateTime<Utc>) -> bool {
        if self.email.is_empty() || self.status != LeadStatus::Sent || self.message_id.is_none() {
            return false;
        }

        if due_after <= Duration::zero() {
            return true;
        }

        // A delay reaching past the representable range is never due
        match (self.last_sent_at(), now.checked_sub_signed(due_after)) {
            (Some(sent_at), Some(cutoff)) => sent_at <= cutoff,
            _ => false,
        }
    }

    fn apply(&mut self, update: &LeadUpdate) {
        if let Some(status) = &update.status {
            self.status = status.clone();
        }
        if let Some(message_id) = &update.message_id {
            self.message_id = non_blank(message_id.trim().to_string());
        }
        if let Some(at) = update.last_sent_at {
            self.last_sent_at = Some(format_timestamp_utc(at));
        }
        if let Some(error) = &update.last_error {
            self.last_error = non_blank(error.clone());
        }
        if let Some(attempts) = update.attempts {
            self.attempts = Some(attempts.to_string());
        }
    }
}

/// Partial set of state fields merged into a lead
///
/// `None` leaves a field untouched. An empty `last_error` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadUpdate {
    pub status: Option<LeadStatus>,
    pub message_id: Option<String>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub attempts: Option<u32>,
}

impl LeadUpdate {
    /// Successful fresh send
    pub fn fresh_sent(message_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(LeadStatus::Sent),
            message_id: Some(message_id.into()),
            last_sent_at: Some(at),
            last_error: Some(String::new()),
            attempts: None,
        }
    }

    /// Successful follow-up; the thread anchor is left as is
    pub fn followup_sent(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(LeadStatus::FollowedUp),
            message_id: None,
            last_sent_at: Some(at),
            last_error: Some(String::new()),
            attempts: None,
        }
    }

    /// Failed send that takes the lead out of rotation
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(LeadStatus::Failed),
            last_error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Failed send that only records the error
    pub fn error_only(error: impl Into<String>) -> Self {
        Self {
            last_error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Also record the lead's attempt counter
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }
}

/// All leads of the backing table, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadTable {
    headers: Vec<String>,
    leads: Vec<Lead>,
}

impl LeadTable {
    /// Build a table from a header row and data rows
    ///
    /// Missing state columns are appended to the header and read as empty.
    /// Short rows are padded; rows longer than the header are rejected.
    pub fn from_records(headers: Vec<String>, rows: Vec<Vec<String>>) -> OutreachResult<Self> {
        let mut headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();

        if !headers.iter().any(|h| h == columns::EMAIL) {
            return Err(OutreachError::InvalidLeadTable {
                reason: format!("missing required column '{}'", columns::EMAIL),
            });
        }

        let mut seen_headers = HashSet::new();
        for header in &headers {
            if !seen_headers.insert(header.as_str()) {
                return Err(OutreachError::InvalidLeadTable {
                    reason: format!("duplicate column '{header}'"),
                });
            }
        }

        for column in columns::BACKFILLED {
            if !headers.iter().any(|h| h == column) {
                headers.push(column.to_string());
            }
        }

        let mut seen_emails = HashSet::new();
        let mut leads = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() > headers.len() {
                return Err(OutreachError::InvalidLeadTable {
                    reason: format!(
                        "row {} has {} fields but the header has {}",
                        index + 2,
                        row.len(),
                        headers.len()
                    ),
                });
            }

            let values: BTreeMap<String, String> = headers
                .iter()
                .cloned()
                .zip(row.into_iter().chain(std::iter::repeat(String::new())))
                .collect();

            let lead = Lead::from_columns(values);
            if !lead.email.is_empty() && !seen_emails.insert(lead.email.clone()) {
                return Err(OutreachError::InvalidLeadTable {
                    reason: format!("duplicate email '{}' on row {}", lead.email, index + 2),
                });
            }
            leads.push(lead);
        }

        Ok(Self { headers, leads })
    }

    /// Build a table directly from leads, deriving the header from their fields
    pub fn from_leads(leads: Vec<Lead>) -> OutreachResult<Self> {
        let mut headers = vec![columns::EMAIL.to_string()];
        for lead in &leads {
            for name in lead.fields.keys() {
                if !headers.contains(name) {
                    headers.push(name.clone());
                }
            }
        }

        let rows = leads
            .iter()
            .map(|lead| headers.iter().map(|h| lead.column(h)).collect())
            .collect();
        Self::from_records(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn get(&self, email: &str) -> Option<&Lead> {
        let email = email.trim();
        self.leads.iter().find(|lead| lead.email == email)
    }

    /// Rows in header order, ready to be written back
    pub fn to_records(&self) -> Vec<Vec<String>> {
        self.leads
            .iter()
            .map(|lead| self.headers.iter().map(|h| lead.column(h)).collect())
            .collect()
    }

    /// Leads that have never been contacted
    pub fn fresh_candidates(&self) -> Vec<&Lead> {
        self.leads.iter().filter(|lead| lead.is_fresh_eligible()).collect()
    }

    /// Leads whose follow-up is due at `now`
    ///
    /// A zero `due_after` disables the time gate: every `SENT` lead with a
    /// thread anchor qualifies.
    pub fn followup_candidates(&self, due_after: Duration, now: DateTime<Utc>) -> Vec<&Lead> {
        self.leads
            .iter()
            .filter(|lead| lead.is_followup_due(due_after, now))
            .collect()
    }

    /// Merge state fields into the row keyed by `email`
    pub fn apply(&mut self, email: &str, update: &LeadUpdate) -> OutreachResult<()> {
        let email = email.trim();
        let lead = self
            .leads
            .iter_mut()
            .find(|lead| !lead.email.is_empty() && lead.email == email)
            .ok_or_else(|| OutreachError::LeadNotFound {
                email: email.to_string(),
            })?;

        lead.apply(update);
        Ok(())
    }

    /// Number of leads per status value
    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for lead in &self.leads {
            *counts.entry(lead.status.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn table(rows: &[&[&str]]) -> LeadTable {
        let headers = row(&["Email", "Name", "Status", "MessageId", "LastSentAt"]);
        LeadTable::from_records(headers, rows.iter().map(|r| row(r)).collect()).unwrap()
    }

    #[test]
    fn test_missing_state_columns_are_backfilled() {
        let table = LeadTable::from_records(row(&["Name", "Email"]), vec![row(&["Ann", "ann@x.com"])]).unwrap();

        assert_eq!(
            table.headers(),
            &["Name", "Email", "Status", "MessageId", "LastSentAt", "LastError", "Attempts"]
        );
        let lead = table.get("ann@x.com").unwrap();
        assert!(lead.status().is_pending());
        assert_eq!(lead.message_id(), None);
        assert_eq!(lead.field("Name"), Some("Ann"));
    }

    #[test]
    fn test_missing_email_column_is_rejected() {
        let result = LeadTable::from_records(row(&["Name"]), vec![row(&["Ann"])]);
        assert!(matches!(result, Err(OutreachError::InvalidLeadTable { .. })));
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let result = LeadTable::from_records(
            row(&["Email"]),
            vec![row(&["a@x.com"]), row(&[" a@x.com "])],
        );
        assert!(matches!(result, Err(OutreachError::InvalidLeadTable { .. })));
    }

    #[test]
    fn test_long_row_is_rejected_and_short_row_padded() {
        let long = LeadTable::from_records(row(&["Email"]), vec![row(&["a@x.com", "extra"])]);
        assert!(long.is_err());

        let short = LeadTable::from_records(row(&["Email", "Name"]), vec![row(&["a@x.com"])]).unwrap();
        assert_eq!(short.get("a@x.com").unwrap().field("Name"), Some(""));
    }

    #[test]
    fn test_fresh_candidates_are_exactly_the_uncontacted() {
        let table = table(&[
            &["a@x.com", "A", "", "", ""],
            &["b@x.com", "B", "SENT", "<1@y>", ""],
            &["c@x.com", "C", "FAILED", "", ""],
            &["d@x.com", "D", "whatever", "", ""],
            &["", "NoMail", "", "", ""],
        ]);

        let fresh: Vec<&str> = table.fresh_candidates().iter().map(|l| l.email()).collect();
        assert_eq!(fresh, vec!["a@x.com"]);
    }

    #[test]
    fn test_followup_candidates_without_gate() {
        let table = table(&[
            &["a@x.com", "A", "SENT", "<1@y>", ""],
            &["b@x.com", "B", "SENT", "", "2024-06-01T00:00:00Z"],
            &["c@x.com", "C", "f1", "<3@y>", "2024-06-01T00:00:00Z"],
        ]);

        let due: Vec<&str> = table
            .followup_candidates(Duration::zero(), now())
            .iter()
            .map(|l| l.email())
            .collect();
        assert_eq!(due, vec!["a@x.com"]);
    }

    #[test]
    fn test_followup_candidates_with_gate() {
        let table = table(&[
            &["old@x.com", "A", "SENT", "<1@y>", "2024-06-05T09:00:00Z"],
            &["edge@x.com", "B", "SENT", "<2@y>", "2024-06-06T09:00:00Z"],
            &["new@x.com", "C", "SENT", "<3@y>", "2024-06-09T09:00:00Z"],
            &["bad@x.com", "D", "SENT", "<4@y>", "yesterday"],
            &["none@x.com", "E", "SENT", "<5@y>", ""],
        ]);

        let due: Vec<&str> = table
            .followup_candidates(Duration::days(4), now())
            .iter()
            .map(|l| l.email())
            .collect();
        assert_eq!(due, vec!["old@x.com", "edge@x.com"]);
    }

    #[test]
    fn test_huge_delay_is_never_due() {
        let table = table(&[&["a@x.com", "A", "SENT", "<1@y>", "2024-06-01T00:00:00Z"]]);

        assert!(table.followup_candidates(Duration::days(100_000_000), now()).is_empty());
        assert!(table
            .followup_candidates(Duration::days(i64::from(u32::MAX)), now())
            .is_empty());
    }

    #[test]
    fn test_untouched_cells_are_written_back_verbatim() {
        let mut table = LeadTable::from_records(
            row(&["Email", "Status", "MessageId", "LastSentAt", "LastError", "Attempts"]),
            vec![
                row(&["a@x.com", "", "", "", "", ""]),
                row(&["b@x.com", "SENT", " <1@y> ", "2024-06-01 00:00", " bounced once ", " 1"]),
            ],
        )
        .unwrap();

        table.apply("a@x.com", &LeadUpdate::failed("boom")).unwrap();

        assert_eq!(
            table.to_records()[1],
            row(&["b@x.com", "SENT", " <1@y> ", "2024-06-01 00:00", " bounced once ", " 1"])
        );
        let lead = table.get("b@x.com").unwrap();
        assert_eq!(lead.message_id(), Some("<1@y>"));
        assert_eq!(lead.attempts(), 1);
        assert!(lead.is_followup_due(Duration::zero(), now()));
    }

    #[test]
    fn test_attempts_are_recorded() {
        let mut table = table(&[&["a@x.com", "A", "", "", ""]]);
        assert_eq!(table.get("a@x.com").unwrap().attempts(), 0);

        table
            .apply("a@x.com", &LeadUpdate::fresh_sent("<1@y>", now()).with_attempts(1))
            .unwrap();
        table
            .apply("a@x.com", &LeadUpdate::error_only("timeout").with_attempts(2))
            .unwrap();

        let lead = table.get("a@x.com").unwrap();
        assert_eq!(lead.attempts(), 2);
        assert_eq!(lead.column("Attempts"), "2");
        assert_eq!(lead.status(), &LeadStatus::Sent);
    }

    #[test]
    fn test_apply_fresh_then_followup_keeps_anchor() {
        let mut table = table(&[&["a@x.com", "A", "", "", ""]]);

        table.apply("a@x.com", &LeadUpdate::fresh_sent("<abc@y>", now())).unwrap();
        let lead = table.get("a@x.com").unwrap();
        assert_eq!(lead.status(), &LeadStatus::Sent);
        assert_eq!(lead.message_id(), Some("<abc@y>"));
        assert_eq!(lead.last_sent_at(), Some(now()));

        let later = now() + Duration::days(5);
        table.apply("a@x.com", &LeadUpdate::followup_sent(later)).unwrap();
        let lead = table.get("a@x.com").unwrap();
        assert_eq!(lead.status(), &LeadStatus::FollowedUp);
        assert_eq!(lead.message_id(), Some("<abc@y>"));
        assert_eq!(lead.last_sent_at(), Some(later));
    }

    #[test]
    fn test_apply_failure_does_not_touch_anchor_or_timestamp() {
        let mut table = table(&[&["a@x.com", "A", "SENT", "<1@y>", "2024-06-01T00:00:00Z"]]);

        table.apply("a@x.com", &LeadUpdate::failed("connection refused")).unwrap();
        let lead = table.get("a@x.com").unwrap();
        assert_eq!(lead.status(), &LeadStatus::Failed);
        assert_eq!(lead.message_id(), Some("<1@y>"));
        assert_eq!(lead.last_sent_at_raw(), Some("2024-06-01T00:00:00Z"));
        assert_eq!(lead.last_error(), Some("connection refused"));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut once = table(&[&["a@x.com", "A", "", "", ""]]);
        let update = LeadUpdate::fresh_sent("<abc@y>", now());
        once.apply("a@x.com", &update).unwrap();

        let mut twice = once.clone();
        twice.apply("a@x.com", &update).unwrap();

        assert_eq!(once, twice);
        assert_eq!(once.to_records(), twice.to_records());
    }

    #[test]
    fn test_apply_unknown_email_is_not_found() {
        let mut table = table(&[&["a@x.com", "A", "", "", ""]]);
        let result = table.apply("missing@x.com", &LeadUpdate::failed("x"));
        assert!(matches!(result, Err(OutreachError::LeadNotFound { email }) if email == "missing@x.com"));
    }

    #[test]
    fn test_to_records_keeps_column_order_and_extras() {
        let mut table = LeadTable::from_records(
            row(&["Name", "Email", "Status", "Company"]),
            vec![row(&["Ann", "ann@x.com", "", "Acme"])],
        )
        .unwrap();
        table.apply("ann@x.com", &LeadUpdate::fresh_sent("<1@y>", now())).unwrap();

        assert_eq!(
            table.to_records(),
            vec![row(&["Ann", "ann@x.com", "SENT", "Acme", "<1@y>", "2024-06-10T09:00:00Z", "", ""])]
        );
    }

    #[test]
    fn test_template_fields_include_every_column() {
        let lead = Lead::new("ann@x.com").with_field("Name", "Ann");
        let fields = lead.template_fields();
        assert_eq!(fields.get("Name").map(String::as_str), Some("Ann"));
        assert_eq!(fields.get("Email").map(String::as_str), Some("ann@x.com"));
        assert_eq!(fields.get("Status").map(String::as_str), Some(""));
    }

    #[test]
    fn test_from_leads_builds_header() {
        let table = LeadTable::from_leads(vec![
            Lead::new("a@x.com").with_field("Name", "A"),
            Lead::new("b@x.com").with_field("Company", "B Corp"),
        ])
        .unwrap();

        assert_eq!(
            table.headers(),
            &["Email", "Name", "Company", "Status", "MessageId", "LastSentAt", "LastError", "Attempts"]
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_status_counts() {
        let table = table(&[
            &["a@x.com", "A", "", "", ""],
            &["b@x.com", "B", "SENT", "<1@y>", ""],
            &["c@x.com", "C", "SENT", "<2@y>", ""],
        ]);
        let counts = table.status_counts();
        assert_eq!(counts.get("SENT"), Some(&2));
        assert_eq!(counts.get("(empty)"), Some(&1));
    }
}
