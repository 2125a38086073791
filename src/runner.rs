use crate::config::Config;
use crate::fetcher::VersionFetcher;
use crate::manifest::{ProjectManifest, SaveOutcome};
use crate::proposer::{repository_path, ChangeProposer, GitLabClient, HostingApi};
use crate::types::{ChangeRequest, Outcome};
use anyhow::{Context, Result};
use tracing::info;

/// Fetch, compare, rewrite and (when GitLab is configured) propose, in that order.
pub struct ApiVersionUpdater {
    config: Config,
    fetcher: VersionFetcher,
    proposer: Option<ChangeProposer>,
}

impl ApiVersionUpdater {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = VersionFetcher::new(config.timeout)?;
        let proposer = match config.gitlab {
            Some(_) => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = config.timeout {
                    builder = builder.timeout(timeout);
                }
                let client = builder.build().context("Failed to create HTTP client")?;
                Some(ChangeProposer::new(Box::new(GitLabClient::new(client))))
            }
            None => None,
        };
        Ok(Self { config, fetcher, proposer })
    }

    /// Replaces the hosting client, ignored unless GitLab settings are configured.
    pub fn with_hosting(mut self, api: Box<dyn HostingApi>) -> Self {
        if self.config.gitlab.is_some() {
            self.proposer = Some(ChangeProposer::new(api));
        }
        self
    }

    pub async fn run(&self) -> Result<Outcome> {
        let latest = self
            .fetcher
            .fetch_latest(&self.config.url)
            .await
            .with_context(|| format!("Failed to fetch API versions from {}", self.config.url))?;
        info!("Latest API version: {}", latest);

        let mut manifest = ProjectManifest::load(&self.config.file)?;
        let previous = manifest.current_version().to_string();
        if manifest.update(latest)? == SaveOutcome::AlreadyCurrent {
            return Ok(Outcome::UpToDate { version: latest });
        }

        let proposal = match (&self.proposer, &self.config.gitlab) {
            (Some(proposer), Some(gitlab)) => {
                let change = ChangeRequest::new(
                    gitlab,
                    latest,
                    repository_path(&self.config.file),
                    manifest.to_pretty_string()?,
                );
                let proposal = proposer
                    .propose(&change)
                    .await
                    .context("Failed to propose the manifest update")?;
                Some(proposal)
            }
            _ => None,
        };

        Ok(Outcome::Updated { previous, latest, proposal })
    }
}
