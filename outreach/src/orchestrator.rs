//! Run orchestrator
//!
//! One invocation picks at most one lead, sends one email and folds the
//! outcome back into the lead table. Every error is caught here, logged with
//! the lead's address and turned into a [`RunOutcome`]; the process exit code
//! does not depend on what happened inside a run.

use rand::rngs::StdRng;
use rand::SeedableRng;

use shared::{logging, run_debug, run_error, run_info, run_warn, RunId, Stage};

use crate::core::compose::build_subject;
use crate::core::{
    select, FollowupFailurePolicy, LeadTable, LeadUpdate, RunOutcome, RunState, Selection, SelectionRules,
    SendFailure,
};
use crate::error::OutreachResult;
use crate::traits::{Clock, LeadStore, MailSender, Notifier, OutgoingMail, RunStateStore, TemplateRenderer};

/// Subject used when none is configured
pub const DEFAULT_SUBJECT: &str = "Quick question for {Name}";

/// Send attempts per lead before a retained follow-up gives up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Knobs that shape a single run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub rules: SelectionRules,
    pub followup_failure: FollowupFailurePolicy,
    pub max_attempts: u32,
    /// Flip the alternation pointer even when the send failed
    pub advance_on_failure: bool,
    /// Subject with `{Field}` placeholders; follow-ups get a `Re: ` prefix
    pub subject_template: String,
    pub fresh_template: Option<String>,
    pub followup_template: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            rules: SelectionRules::default(),
            followup_failure: FollowupFailurePolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            advance_on_failure: false,
            subject_template: DEFAULT_SUBJECT.to_string(),
            fresh_template: None,
            followup_template: None,
        }
    }
}

impl RunSettings {
    fn template_for(&self, stage: Stage) -> Option<String> {
        match stage {
            Stage::Fresh => self.fresh_template.clone(),
            Stage::Followup => self.followup_template.clone(),
        }
    }
}

/// Coordinates one send attempt using injected services
pub struct Orchestrator<L, S, T, M, C>
where
    L: LeadStore,
    S: RunStateStore,
    T: TemplateRenderer,
    M: MailSender,
    C: Clock,
{
    /// Injected services
    leads: L,
    run_state: S,
    templates: T,
    mailer: M,
    clock: C,
    notifier: Option<Box<dyn Notifier>>,

    settings: RunSettings,
    rng: StdRng,
}

impl<L, S, T, M, C> Orchestrator<L, S, T, M, C>
where
    L: LeadStore,
    S: RunStateStore,
    T: TemplateRenderer,
    M: MailSender,
    C: Clock,
{
    /// Create new orchestrator with injected dependencies
    pub fn new(leads: L, run_state: S, templates: T, mailer: M, clock: C, settings: RunSettings) -> Self {
        Self {
            leads,
            run_state,
            templates,
            mailer,
            clock,
            notifier: None,
            settings,
            rng: StdRng::from_entropy(),
        }
    }

    /// Report send outcomes through `notifier`
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Replace the random source used for lead selection
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Execute one invocation
    pub async fn run_once(&mut self) -> RunOutcome {
        let run_id = RunId::current();
        let now = self.clock.now();

        let mut table = match self.leads.load().await {
            Ok(table) => table,
            Err(e) => {
                logging::log_error(run_id, &format!("Loading leads from {}", self.leads.location()), &e);
                return RunOutcome::Aborted {
                    email: None,
                    error: e.to_string(),
                };
            }
        };

        let run_state = match self.load_run_state().await {
            Ok(state) => state,
            Err(e) => {
                logging::log_error(run_id, "Loading run state", &e);
                return RunOutcome::Aborted {
                    email: None,
                    error: e.to_string(),
                };
            }
        };

        let Some(selection) = select(&table, &run_state, &self.settings.rules, now, &mut self.rng) else {
            run_info!(
                run_id,
                "💤 Nothing eligible among {} leads ({} policy)",
                table.len(),
                self.settings.rules.policy
            );
            return RunOutcome::NothingEligible;
        };

        let email = selection.lead.email().to_string();
        logging::log_progress(run_id, "Selected", &format!("{email} for a {} email", selection.stage));

        match self.process(&mut table, selection).await {
            Ok(outcome) => outcome,
            Err(e) => {
                logging::log_error(run_id, &format!("Processing {email}"), &e);
                RunOutcome::Aborted {
                    email: Some(email),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn load_run_state(&self) -> OutreachResult<RunState> {
        if self.settings.rules.policy.uses_run_state() {
            self.run_state.load().await
        } else {
            Ok(RunState::default())
        }
    }

    async fn process(&self, table: &mut LeadTable, selection: Selection) -> OutreachResult<RunOutcome> {
        let run_id = RunId::current();
        let Selection {
            lead,
            stage,
            next_run_state,
        } = selection;
        let email = lead.email().to_string();
        let attempts = lead.attempts().saturating_add(1);

        let anchor = match stage {
            Stage::Fresh => None,
            Stage::Followup => match lead.message_id() {
                Some(id) => Some(id.to_string()),
                None => {
                    let reason = "follow-up selected without a message id".to_string();
                    run_warn!(run_id, "⚠️ Skipping {}: {}", email, reason);
                    return Ok(RunOutcome::Skipped { email, reason });
                }
            },
        };

        let fields = lead.template_fields();
        let subject = build_subject(&self.settings.subject_template, &fields, stage);
        let body = self
            .templates
            .render(&fields, stage, self.settings.template_for(stage))
            .await?;

        let mut mail = OutgoingMail::new(email.clone(), subject, body);
        if let Some(anchor) = anchor {
            mail = mail.in_reply_to(anchor);
        }

        match self.mailer.send(&mail).await {
            Ok(message_id) => {
                let sent_at = self.clock.now();
                let update = match stage {
                    Stage::Fresh => LeadUpdate::fresh_sent(message_id.clone(), sent_at),
                    Stage::Followup => LeadUpdate::followup_sent(sent_at),
                }
                .with_attempts(attempts);
                self.record(table, &email, &update).await?;

                if let Some(next) = next_run_state {
                    self.save_run_state(&next).await?;
                }

                logging::log_success(run_id, &format!("Sent {stage} email to {email} ({message_id})"));
                self.notify(&format!("✅ Sent {stage} email to {email}")).await;

                Ok(RunOutcome::Sent {
                    email,
                    stage,
                    message_id,
                })
            }
            Err(e) => {
                let failure = SendFailure {
                    error: e.to_string(),
                    permanent: e.is_permanent(),
                    attempts,
                };
                run_error!(
                    run_id,
                    "❌ Sending {} email to {} failed (attempt {}{}): {}",
                    stage,
                    email,
                    attempts,
                    if failure.permanent { ", permanent" } else { "" },
                    failure.error
                );

                let update = self
                    .settings
                    .followup_failure
                    .failure_update(stage, &failure, self.settings.max_attempts);
                self.record(table, &email, &update).await?;
                let error = failure.error;

                if self.settings.advance_on_failure {
                    if let Some(next) = next_run_state {
                        self.save_run_state(&next).await?;
                    }
                }

                self.notify(&format!("❌ Failed {stage} email to {email}: {error}")).await;

                Ok(RunOutcome::SendFailed { email, stage, error })
            }
        }
    }

    /// Merge `update` into the table and persist it before returning
    async fn record(&self, table: &mut LeadTable, email: &str, update: &LeadUpdate) -> OutreachResult<()> {
        table.apply(email, update)?;
        self.leads.save(table).await
    }

    async fn save_run_state(&self, next: &RunState) -> OutreachResult<()> {
        self.run_state.save(next).await?;
        run_debug!(RunId::current(), "🔁 Next run starts with {}", next.next_kind);
        Ok(())
    }

    async fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(message).await {
                run_warn!(RunId::current(), "⚠️ Notification not delivered: {}", e);
            }
        }
    }
}
