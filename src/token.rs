use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::SyncError;

const TOKEN_FILE_NAME: &str = ".earthdata-app-key";

/// Supplies the Earthdata bearer token attached to download requests. The
/// token lives in a single-line file in the user's home directory; lines
/// starting with `#` are comments.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    path: PathBuf,
}

impl TokenProvider {
    pub fn new() -> Result<Self, SyncError> {
        let base = BaseDirs::new()
            .ok_or_else(|| SyncError::Filesystem("unable to resolve home directory".to_string()))?;
        Ok(Self {
            path: base.home_dir().join(TOKEN_FILE_NAME),
        })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the token. A missing file means anonymous downloads, not an
    /// error; a file with nothing but comments and blank lines is an error.
    pub fn read(&self) -> Result<Option<String>, SyncError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|err| {
            SyncError::Filesystem(format!("read token file {}: {err}", self.path.display()))
        })?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Ok(Some(line.to_string()));
        }
        Err(SyncError::EmptyToken(self.path.clone()))
    }
}
