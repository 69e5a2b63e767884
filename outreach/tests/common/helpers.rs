//! Test helpers for building orchestrators over a temporary workspace
//!
//! The lead table, run state and templates are real files in a temp
//! directory; only the mail transport and the clock are mocked.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use outreach::services::{CsvLeadStore, FileTemplateRenderer, JsonRunStateStore};
use outreach::traits::{MockClock, MockMailSender, OutgoingMail};
use outreach::{LeadStore, LeadTable, Orchestrator, OutreachError, RunSettings};

use super::fixtures::TestFixtures;

pub type FileOrchestrator =
    Orchestrator<CsvLeadStore, JsonRunStateStore, FileTemplateRenderer, MockMailSender, MockClock>;

/// Every message handed to the mocked transport
pub type MailLog = Arc<Mutex<Vec<OutgoingMail>>>;

/// Temporary directory holding a lead table, templates and run state
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Workspace with the given lead table and the standard templates
    pub fn new(leads_csv: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("leads.csv"), leads_csv).unwrap();

        for (stage, file, content) in [
            ("fresh", "intro.html", TestFixtures::FRESH_TEMPLATE),
            ("followup", "bump.html", TestFixtures::FOLLOWUP_TEMPLATE),
        ] {
            let stage_dir = dir.path().join("templates").join(stage);
            std::fs::create_dir_all(&stage_dir).unwrap();
            std::fs::write(stage_dir.join(file), content).unwrap();
        }

        Self { dir }
    }

    pub fn leads_path(&self) -> PathBuf {
        self.dir.path().join("leads.csv")
    }

    pub fn templates_path(&self) -> PathBuf {
        self.dir.path().join("templates")
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("run_state.json")
    }

    pub fn remove_templates(&self, stage: &str) {
        std::fs::remove_dir_all(self.templates_path().join(stage)).unwrap();
    }

    pub fn write_state(&self, json: &str) {
        std::fs::write(self.state_path(), json).unwrap();
    }

    /// Raw run state file, if one was written
    pub fn state(&self) -> Option<String> {
        std::fs::read_to_string(self.state_path()).ok()
    }

    /// Stage the persisted pointer names, if any
    pub fn next_kind(&self) -> Option<String> {
        let raw = self.state()?;
        let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
        value["next_kind"].as_str().map(str::to_string)
    }

    pub fn leads_csv(&self) -> String {
        std::fs::read_to_string(self.leads_path()).unwrap()
    }

    pub async fn table(&self) -> LeadTable {
        CsvLeadStore::new(self.leads_path()).load().await.unwrap()
    }

    /// Orchestrator over this workspace with a seeded random source
    pub fn orchestrator(&self, mailer: MockMailSender, settings: RunSettings) -> FileOrchestrator {
        self.orchestrator_at(mailer, settings, TestFixtures::now())
    }

    /// Same as [`TestWorkspace::orchestrator`] with the clock stopped at `now`
    pub fn orchestrator_at(&self, mailer: MockMailSender, settings: RunSettings, now: DateTime<Utc>) -> FileOrchestrator {
        Orchestrator::new(
            CsvLeadStore::new(self.leads_path()),
            JsonRunStateStore::new(self.state_path()),
            FileTemplateRenderer::with_rng(self.templates_path(), StdRng::seed_from_u64(11)),
            mailer,
            TestHelpers::clock_at(now),
            settings,
        )
        .with_rng(StdRng::seed_from_u64(42))
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Settings with the fixture subject and the given follow-up delay
    pub fn settings(follow_up_after_days: i64) -> RunSettings {
        let mut settings = RunSettings {
            subject_template: TestFixtures::SUBJECT.to_string(),
            ..RunSettings::default()
        };
        settings.rules.follow_up_after = chrono::Duration::days(follow_up_after_days);
        settings
    }

    pub fn fixed_clock() -> MockClock {
        Self::clock_at(TestFixtures::now())
    }

    pub fn clock_at(now: DateTime<Utc>) -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || now).times(0..);
        clock
    }

    /// Transport that accepts every message and numbers the Message-IDs
    pub fn accepting_mailer(log: &MailLog) -> MockMailSender {
        let log = Arc::clone(log);
        let mut mailer = MockMailSender::new();
        mailer.expect_send().returning(move |mail| {
            let mut sent = log.lock().unwrap();
            sent.push(mail.clone());
            Ok(format!("<msg-{}@example.com>", sent.len()))
        });
        mailer
    }

    /// Transport that rejects every message
    pub fn failing_mailer(log: &MailLog) -> MockMailSender {
        let log = Arc::clone(log);
        let mut mailer = MockMailSender::new();
        mailer.expect_send().returning(move |mail| {
            log.lock().unwrap().push(mail.clone());
            Err(OutreachError::send_failed(&mail.to, "535 authentication failed"))
        });
        mailer
    }

    /// Transport whose server refuses the recipient for good
    pub fn rejecting_mailer(log: &MailLog) -> MockMailSender {
        let log = Arc::clone(log);
        let mut mailer = MockMailSender::new();
        mailer.expect_send().returning(move |mail| {
            log.lock().unwrap().push(mail.clone());
            Err(OutreachError::send_rejected(&mail.to, "550 mailbox unavailable"))
        });
        mailer
    }

    /// Transport that must never be called
    pub fn silent_mailer() -> MockMailSender {
        let mut mailer = MockMailSender::new();
        mailer.expect_send().never();
        mailer
    }

    pub fn mail_log() -> MailLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn sent(log: &MailLog) -> Vec<OutgoingMail> {
        log.lock().unwrap().clone()
    }
}
