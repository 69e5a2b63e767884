//! Eligibility selection
//!
//! Given a snapshot of the lead table, the persisted alternation pointer and
//! the current time, decide which lead (if any) is acted on and at which
//! stage. Everything here is deterministic for a given random source.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{SharedError, Stage};

use super::lead::{Lead, LeadTable};
use super::run_state::RunState;

/// Order in which stages are tried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Start with the persisted stage, flip it after every send
    #[default]
    Alternating,
    /// Always drain due follow-ups before contacting new leads
    FollowupFirst,
}

impl SelectionPolicy {
    /// Whether this policy reads and writes the alternation pointer
    pub fn uses_run_state(self) -> bool {
        matches!(self, SelectionPolicy::Alternating)
    }

    fn stage_order(self, run_state: &RunState) -> [Stage; 2] {
        match self {
            SelectionPolicy::Alternating => [run_state.next_kind, run_state.next_kind.opposite()],
            SelectionPolicy::FollowupFirst => [Stage::Followup, Stage::Fresh],
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::Alternating => f.write_str("alternating"),
            SelectionPolicy::FollowupFirst => f.write_str("followup-first"),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alternating" | "alternate" => Ok(SelectionPolicy::Alternating),
            "followup-first" | "followup_first" | "followup" => Ok(SelectionPolicy::FollowupFirst),
            _ => Err(SharedError::InvalidConfig {
                field: "policy".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Inputs of a selection that stay fixed for a run
#[derive(Debug, Clone, Copy)]
pub struct SelectionRules {
    pub policy: SelectionPolicy,
    /// Minimum age of the fresh send before a follow-up; zero disables gating
    pub follow_up_after: Duration,
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            follow_up_after: Duration::zero(),
        }
    }
}

/// The lead to contact on this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub lead: Lead,
    pub stage: Stage,
    /// Pointer to persist once the send went through (alternating policy only)
    pub next_run_state: Option<RunState>,
}

/// Candidates of one stage
pub fn candidates_for<'a>(
    table: &'a LeadTable,
    stage: Stage,
    follow_up_after: Duration,
    now: DateTime<Utc>,
) -> Vec<&'a Lead> {
    match stage {
        Stage::Fresh => table.fresh_candidates(),
        Stage::Followup => table.followup_candidates(follow_up_after, now),
    }
}

/// Pick zero or one lead to act on
///
/// Within the winning stage the lead is drawn uniformly from all eligible
/// leads so no address is systematically emailed first.
pub fn select<R: Rng + ?Sized>(
    table: &LeadTable,
    run_state: &RunState,
    rules: &SelectionRules,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<Selection> {
    for stage in rules.policy.stage_order(run_state) {
        let candidates = candidates_for(table, stage, rules.follow_up_after, now);
        if let Some(lead) = candidates.choose(rng) {
            let next_run_state = rules
                .policy
                .uses_run_state()
                .then(|| RunState::after(stage));

            return Some(Selection {
                lead: (*lead).clone(),
                stage,
                next_run_state,
            });
        }
    }

    None
}
