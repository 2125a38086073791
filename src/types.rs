use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;

/// One entry of the remote version list, e.g.
/// `{"label": "Spring '23", "url": "/services/data/v57.0", "version": "57.0"}`.
#[derive(Debug, Deserialize, Clone)]
pub struct VersionDescriptor {
    pub version: RawVersion,
}

/// Endpoints disagree on whether `version` is quoted.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawVersion {
    Text(String),
    Number(f64),
}

impl TryFrom<&RawVersion> for ApiVersion {
    type Error = FetchError;

    fn try_from(raw: &RawVersion) -> Result<Self, Self::Error> {
        match raw {
            RawVersion::Text(text) => text.parse(),
            RawVersion::Number(n) => ApiVersion::new(*n)
                .ok_or_else(|| FetchError::InvalidVersion(n.to_string())),
        }
    }
}

/// A decimal API version such as `58.0`.
///
/// Always finite, so it has a total order. The textual form keeps one
/// decimal place for integral values, which is the form stored in the
/// manifest and used in branch names.
#[derive(Debug, Clone, Copy)]
pub struct ApiVersion(f64);

impl ApiVersion {
    pub fn new(value: f64) -> Option<Self> {
        value.is_finite().then_some(Self(value))
    }
}

impl FromStr for ApiVersion {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f64>()
            .ok()
            .and_then(ApiVersion::new)
            .ok_or_else(|| FetchError::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 1e16 {
            write!(f, "{:.1}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ApiVersion {}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Everything needed to push an updated manifest to the hosting service.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRequest {
    pub server: String,
    pub project: u64,
    pub token: String,
    pub source_branch: String,
    pub branch: String,
    pub version: ApiVersion,
    /// Path of the manifest inside the repository.
    pub file_path: String,
    pub content: String,
}

/// Remote state created by a successful proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub branch: String,
    pub commit_response: String,
    pub merge_request_response: String,
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Updated {
        previous: String,
        latest: ApiVersion,
        proposal: Option<Proposal>,
    },
    UpToDate {
        version: ApiVersion,
    },
}

impl Outcome {
    pub fn latest(&self) -> ApiVersion {
        match self {
            Outcome::Updated { latest, .. } => *latest,
            Outcome::UpToDate { version } => *version,
        }
    }
}
