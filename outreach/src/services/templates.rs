//! Directory-based template renderer
//!
//! Templates live in one directory per stage:
//!
//! ```text
//! email-templates/
//!   fresh/     intro.html, short.html, ...
//!   followup/  bump.html, ...
//! ```
//!
//! When no template is named, one file of the stage directory is picked at
//! random so consecutive leads do not all receive the same wording.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::fs;

use crate::core::compose::substitute_fields;
use crate::error::{OutreachError, OutreachResult};
use crate::traits::TemplateRenderer;
use shared::{run_debug, RunId, Stage};

/// Renders `{Field}` templates read from disk
pub struct FileTemplateRenderer {
    base_dir: PathBuf,
    rng: Mutex<StdRng>,
}

impl FileTemplateRenderer {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_rng(base_dir, StdRng::from_entropy())
    }

    /// Use a specific random source, e.g. a seeded one in tests
    pub fn with_rng(base_dir: impl Into<PathBuf>, rng: StdRng) -> Self {
        Self {
            base_dir: base_dir.into(),
            rng: Mutex::new(rng),
        }
    }

    fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.base_dir.join(stage.as_str())
    }

    fn not_found(stage: Stage, location: &Path) -> OutreachError {
        OutreachError::TemplateNotFound {
            stage,
            location: location.display().to_string(),
        }
    }

    /// Sorted template files of a stage directory
    async fn list_templates(&self, stage: Stage) -> OutreachResult<Vec<PathBuf>> {
        let dir = self.stage_dir(stage);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Self::not_found(stage, &dir)),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    async fn choose_template(&self, stage: Stage, template: Option<String>) -> OutreachResult<PathBuf> {
        let dir = self.stage_dir(stage);

        if let Some(name) = template {
            let path = Path::new(&name)
                .file_name()
                .map(|file_name| dir.join(file_name))
                .ok_or_else(|| Self::not_found(stage, &dir.join(&name)))?;

            return match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => Ok(path),
                _ => Err(Self::not_found(stage, &path)),
            };
        }

        let files = self.list_templates(stage).await?;
        let chosen = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            files.choose(&mut *rng).cloned()
        };
        chosen.ok_or_else(|| Self::not_found(stage, &dir))
    }
}

#[async_trait]
impl TemplateRenderer for FileTemplateRenderer {
    async fn render(
        &self,
        fields: &BTreeMap<String, String>,
        stage: Stage,
        template: Option<String>,
    ) -> OutreachResult<String> {
        let path = self.choose_template(stage, template).await?;
        let content = fs::read_to_string(&path).await?;

        run_debug!(RunId::current(), "📝 Rendering {} template {}", stage, path.display());
        Ok(substitute_fields(&content, fields))
    }
}
