//! JSON side file holding the alternation pointer

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::core::RunState;
use crate::error::OutreachResult;
use crate::services::atomic::write_atomically;
use crate::traits::RunStateStore;
use shared::{run_debug, run_warn, RunId};

/// Run state stored as `{"next_kind": "fresh" | "followup"}`
pub struct JsonRunStateStore {
    path: PathBuf,
}

impl JsonRunStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RunStateStore for JsonRunStateStore {
    async fn load(&self) -> OutreachResult<RunState> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                run_debug!(RunId::current(), "No run state at {}, starting with fresh", self.path.display());
                return Ok(RunState::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<RunState>(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                run_warn!(
                    RunId::current(),
                    "⚠️ Ignoring unreadable run state {}: {}",
                    self.path.display(),
                    e
                );
                Ok(RunState::default())
            }
        }
    }

    async fn save(&self, state: &RunState) -> OutreachResult<()> {
        let contents = serde_json::to_vec_pretty(state)?;
        write_atomically(&self.path, &contents).await?;

        run_debug!(RunId::current(), "💾 Next run starts with {}", state.next_kind);
        Ok(())
    }
}
