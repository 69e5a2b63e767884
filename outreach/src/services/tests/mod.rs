//! Service-specific tests
//!
//! File-backed services are exercised against temporary directories so the
//! tests never touch a real lead table.


// Common test utilities for services
#[cfg(test)]
pub mod common {
    use std::path::{Path, PathBuf};

    /// Write a file below `dir`, creating parent directories
    pub fn write_file(dir: &Path, relative: &str, contents: &str) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create test directory");
        }
        std::fs::write(&path, contents).expect("write test file");
        path
    }
}
