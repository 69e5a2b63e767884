//! Whole-file replacement helper shared by the file-backed stores

use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{OutreachError, OutreachResult};

/// Write `contents` to `path` through a sibling temp file and a rename
///
/// Readers see either the previous file or the complete new one.
pub async fn write_atomically(path: &Path, contents: &[u8]) -> OutreachResult<()> {
    let persist_error = |reason: String| OutreachError::Persist {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| persist_error(format!("failed to prepare directory: {e}")))?;
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| persist_error("path has no file name".to_string()))?;
    let temp_path = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    let write_result = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        Ok::<(), std::io::Error>(())
    }
    .await;

    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path).await;
        return Err(persist_error(format!("failed to write temp file: {e}")));
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(persist_error(format!("failed to replace file: {e}")));
    }

    Ok(())
}
