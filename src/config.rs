use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use crate::error::ConfigError;

pub const DEFAULT_MANIFEST: &str = "./sfdx-project.json";

/// Settings as they appear in a YAML config file or on the command line.
/// Every field is optional so the two sources can be layered.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub url: Option<String>,
    pub file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub gitlab: GitLabSettings,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GitLabSettings {
    pub server: Option<String>,
    pub project: Option<u64>,
    pub token: Option<String>,
    pub branch: Option<String>,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: String,
    pub file: PathBuf,
    pub timeout: Option<Duration>,
    pub gitlab: Option<GitLabConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GitLabConfig {
    pub server: String,
    pub project: u64,
    pub token: String,
    pub branch: String,
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let settings = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(settings)
    }

    /// Layers `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: Settings) -> Settings {
        Settings {
            url: overrides.url.or(self.url),
            file: overrides.file.or(self.file),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            gitlab: GitLabSettings {
                server: overrides.gitlab.server.or(self.gitlab.server),
                project: overrides.gitlab.project.or(self.gitlab.project),
                token: overrides.gitlab.token.or(self.gitlab.token),
                branch: overrides.gitlab.branch.or(self.gitlab.branch),
            },
        }
    }

    pub fn resolve(self) -> Result<Config, ConfigError> {
        let url = self.url.ok_or(ConfigError::MissingUrl)?;
        Ok(Config {
            url,
            file: self.file.unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST)),
            timeout: self.timeout_secs.map(Duration::from_secs),
            gitlab: self.gitlab.resolve()?,
        })
    }
}

impl GitLabSettings {
    /// All four settings enable the merge request stage, none disables it.
    fn resolve(self) -> Result<Option<GitLabConfig>, ConfigError> {
        match (self.server, self.project, self.token, self.branch) {
            (None, None, None, None) => Ok(None),
            (Some(server), Some(project), Some(token), Some(branch)) => Ok(Some(GitLabConfig {
                server,
                project,
                token,
                branch,
            })),
            (server, project, token, branch) => {
                let missing: Vec<&str> = [
                    ("server", server.is_none()),
                    ("project", project.is_none()),
                    ("token", token.is_none()),
                    ("branch", branch.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(ConfigError::IncompleteGitLab(missing.join(", ")))
            }
        }
    }
}
