//! Fetching the newest supported API version from a version-list endpoint.

use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;
use crate::types::{ApiVersion, VersionDescriptor};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub struct VersionFetcher {
    client: reqwest::Client,
}

impl VersionFetcher {
    /// Without a timeout a hung endpoint blocks the run indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self { client: builder.build()? })
    }

    /// GETs `url`, expecting a JSON array of objects with a `version` field,
    /// and returns the highest version.
    pub async fn fetch_latest(&self, url: &str) -> Result<ApiVersion, FetchError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        let descriptors: Vec<VersionDescriptor> = serde_json::from_slice(&body)?;
        latest_version(&descriptors)
    }
}

pub fn latest_version(descriptors: &[VersionDescriptor]) -> Result<ApiVersion, FetchError> {
    let versions = descriptors
        .iter()
        .map(|d| ApiVersion::try_from(&d.version))
        .collect::<Result<Vec<_>, _>>()?;
    versions.into_iter().max().ok_or(FetchError::Empty)
}
