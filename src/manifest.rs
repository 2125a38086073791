//! The local project manifest (`sfdx-project.json`) and its recorded API version.

use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::ManifestError;
use crate::types::ApiVersion;

pub const VERSION_KEY: &str = "sourceApiVersion";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    AlreadyCurrent,
}

#[derive(Debug, Clone)]
pub struct ProjectManifest {
    path: PathBuf,
    // serde_json's default map is ordered, so keys serialize sorted at every level.
    contents: Map<String, Value>,
    current: String,
}

impl ProjectManifest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let path = std::path::absolute(path.as_ref()).map_err(|source| ManifestError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let text = fs::read_to_string(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;
        let Value::Object(contents) = value else {
            return Err(ManifestError::NotAnObject(path));
        };

        let current = match contents.get(VERSION_KEY) {
            Some(Value::String(version)) => version.clone(),
            Some(Value::Null) | None => {
                info!("{} not found in {}.", VERSION_KEY, path.display());
                return Err(ManifestError::MissingKey(path));
            }
            Some(other) => other.to_string(),
        };
        debug!("{} records {} = {}", path.display(), VERSION_KEY, current);

        Ok(Self { path, contents, current })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_version(&self) -> &str {
        &self.current
    }

    /// Compares textually, so `"58"` in the manifest is not current for `58.0`.
    pub fn is_current(&self, latest: ApiVersion) -> bool {
        latest.to_string() == self.current
    }

    /// Records `latest` and rewrites the file, unless it already holds that version.
    pub fn update(&mut self, latest: ApiVersion) -> Result<SaveOutcome, ManifestError> {
        if self.is_current(latest) {
            info!("The JSON file already has the latest API version.");
            return Ok(SaveOutcome::AlreadyCurrent);
        }
        info!("The JSON file has an older API version ({}).", self.current);

        let latest = latest.to_string();
        self.contents
            .insert(VERSION_KEY.to_string(), Value::String(latest.clone()));
        self.write()?;
        self.current = latest;
        Ok(SaveOutcome::Written)
    }

    /// Two-space indented JSON with sorted keys, exactly as written to disk.
    pub fn to_pretty_string(&self) -> Result<String, ManifestError> {
        serde_json::to_string_pretty(&self.contents).map_err(|source| ManifestError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes through a temporary file in the same directory and renames it
    /// over the manifest, so a failed write never truncates the original.
    fn write(&self) -> Result<(), ManifestError> {
        let text = self.to_pretty_string()?;
        let io_err = |source: std::io::Error| ManifestError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        if let Ok(metadata) = fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(metadata.permissions())
                .map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}
