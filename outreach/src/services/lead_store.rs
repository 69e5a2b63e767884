//! CSV-backed lead store
//!
//! The whole table is read into memory on load and rewritten in full on
//! every save. Concurrent invocations against the same file are not
//! coordinated: the last writer wins, so callers must serialize runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::LeadTable;
use crate::error::{OutreachError, OutreachResult};
use crate::services::atomic::write_atomically;
use crate::traits::LeadStore;
use shared::{run_debug, RunId};

/// Lead table stored as a CSV file with a header row
pub struct CsvLeadStore {
    path: PathBuf,
}

impl CsvLeadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_error(&self, reason: impl Into<String>) -> OutreachError {
        OutreachError::LeadTableLoad {
            path: self.path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Parse CSV bytes into a lead table
    pub fn parse(&self, bytes: &[u8]) -> OutreachResult<LeadTable> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| self.load_error(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.load_error(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        LeadTable::from_records(headers, rows).map_err(|e| self.load_error(e.to_string()))
    }

    /// Serialize a lead table to CSV bytes
    pub fn render(table: &LeadTable) -> OutreachResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(table.headers())?;
        for record in table.to_records() {
            writer.write_record(&record)?;
        }

        writer.into_inner().map_err(|e| OutreachError::Persist {
            path: "<memory>".to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl LeadStore for CsvLeadStore {
    async fn load(&self) -> OutreachResult<LeadTable> {
        let bytes = fs::read(&self.path)
            .await
            .map_err(|e| self.load_error(e.to_string()))?;

        let table = self.parse(&bytes)?;
        run_debug!(RunId::current(), "📂 Loaded {} leads from {}", table.len(), self.path.display());
        Ok(table)
    }

    async fn save(&self, table: &LeadTable) -> OutreachResult<()> {
        let contents = Self::render(table)?;
        write_atomically(&self.path, &contents).await?;

        run_debug!(RunId::current(), "💾 Wrote {} leads to {}", table.len(), self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
