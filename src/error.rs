use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid version: {0:?}")]
    InvalidVersion(String),

    #[error("Version list is empty")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} is not a JSON object")]
    NotAnObject(PathBuf),

    #[error("sourceApiVersion not found in {0}")]
    MissingKey(PathBuf),
}

#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Hosting API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to create commit on {branch}: {source}")]
    CommitFailed {
        branch: String,
        #[source]
        source: Box<ProposalError>,
    },

    /// The branch and commit exist remotely, only the merge request is missing.
    #[error("Branch {branch} was created but the merge request failed: {source}")]
    MergeRequestFailed {
        branch: String,
        #[source]
        source: Box<ProposalError>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("No version list URL given (use --url or `url` in the config file)")]
    MissingUrl,

    #[error("Incomplete GitLab settings, missing: {0}")]
    IncompleteGitLab(String),
}
