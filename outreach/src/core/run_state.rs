//! Cross-run memory of the mailer

use serde::{Deserialize, Serialize};
use shared::Stage;

/// Alternation pointer persisted between invocations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Stage to try first on the next invocation
    #[serde(default)]
    pub next_kind: Stage,
}

impl RunState {
    pub fn new(next_kind: Stage) -> Self {
        Self { next_kind }
    }

    /// State after a send on `stage`: the other stage goes first next time
    pub fn after(stage: Stage) -> Self {
        Self {
            next_kind: stage.opposite(),
        }
    }
}
