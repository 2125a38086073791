//! Proposing a manifest update as a GitLab merge request.
//!
//! A proposal is two independent API calls: a commit that creates the new
//! branch, then a merge request from that branch back to the source branch.
//! Nothing is rolled back when the second call fails; the error says which
//! branch was left behind.

#[cfg(test)]
use mockall::automock;

use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::GitLabConfig;
use crate::error::ProposalError;
use crate::types::{ApiVersion, ChangeRequest, Proposal};

/// Branch carrying the update, e.g. `update_main_to_api_version_58.0`.
pub fn branch_name(source_branch: &str, version: ApiVersion) -> String {
    format!("update_{}_to_api_version_{}", source_branch, version)
}

pub fn commit_message(version: ApiVersion) -> String {
    format!("Update sourceApiVersion to {}", version)
}

pub fn merge_request_title(version: ApiVersion) -> String {
    format!("Update API version to {}", version)
}

/// Repository path for a manifest given on the command line (`./x.json` -> `x.json`).
pub fn repository_path(file: &Path) -> String {
    let path = file.to_string_lossy().replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

impl ChangeRequest {
    pub fn new(gitlab: &GitLabConfig, version: ApiVersion, file_path: String, content: String) -> Self {
        Self {
            server: gitlab.server.clone(),
            project: gitlab.project,
            token: gitlab.token.clone(),
            source_branch: gitlab.branch.clone(),
            branch: branch_name(&gitlab.branch, version),
            version,
            file_path,
            content,
        }
    }
}

/// The two hosting operations a proposal needs. Both return the raw response body.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait HostingApi: Send + Sync {
    /// Commits `change.content` to `change.file_path` on a new branch cut from
    /// `change.source_branch`.
    async fn create_commit(&self, change: &ChangeRequest, message: &str) -> Result<String, ProposalError>;

    async fn create_merge_request(&self, change: &ChangeRequest, title: &str) -> Result<String, ProposalError>;
}

pub struct GitLabClient {
    client: reqwest::Client,
}

impl GitLabClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// `gitlab.example.com` -> `https://gitlab.example.com/api/v4`; a server
    /// that already carries a scheme is used as is.
    pub fn api_base(server: &str) -> String {
        let server = server.trim_end_matches('/');
        if server.starts_with("http://") || server.starts_with("https://") {
            format!("{}/api/v4", server)
        } else {
            format!("https://{}/api/v4", server)
        }
    }

    async fn send_request(
        &self,
        change: &ChangeRequest,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<String, ProposalError> {
        let url = format!(
            "{}/projects/{}/{}",
            Self::api_base(&change.server),
            change.project,
            endpoint
        );
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("PRIVATE-TOKEN", &change.token)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProposalError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl HostingApi for GitLabClient {
    async fn create_commit(&self, change: &ChangeRequest, message: &str) -> Result<String, ProposalError> {
        let form = [
            ("branch", change.branch.as_str()),
            ("start_branch", change.source_branch.as_str()),
            ("commit_message", message),
            ("actions[][action]", "update"),
            ("actions[][file_path]", change.file_path.as_str()),
            ("actions[][content]", change.content.as_str()),
        ];
        self.send_request(change, "repository/commits", &form).await
    }

    async fn create_merge_request(&self, change: &ChangeRequest, title: &str) -> Result<String, ProposalError> {
        let form = [
            ("source_branch", change.branch.as_str()),
            ("target_branch", change.source_branch.as_str()),
            ("title", title),
            ("remove_source_branch", "true"),
        ];
        self.send_request(change, "merge_requests", &form).await
    }
}

pub struct ChangeProposer {
    api: Box<dyn HostingApi>,
}

impl ChangeProposer {
    pub fn new(api: Box<dyn HostingApi>) -> Self {
        Self { api }
    }

    pub async fn propose(&self, change: &ChangeRequest) -> Result<Proposal, ProposalError> {
        info!(
            "Creating branch {} from {} with the updated {}",
            change.branch, change.source_branch, change.file_path
        );
        let commit_response = self
            .api
            .create_commit(change, &commit_message(change.version))
            .await
            .map_err(|e| ProposalError::CommitFailed {
                branch: change.branch.clone(),
                source: Box::new(e),
            })?;
        info!("{}", commit_response);

        info!("Opening merge request {} -> {}", change.branch, change.source_branch);
        let merge_request_response = match self
            .api
            .create_merge_request(change, &merge_request_title(change.version))
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    "Branch {} exists remotely without a merge request",
                    change.branch
                );
                return Err(ProposalError::MergeRequestFailed {
                    branch: change.branch.clone(),
                    source: Box::new(e),
                });
            }
        };
        info!("{}", merge_request_response);

        Ok(Proposal {
            branch: change.branch.clone(),
            commit_response,
            merge_request_response,
        })
    }
}
