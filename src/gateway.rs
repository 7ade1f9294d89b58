use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::AppError;
use crate::model::{
    BranchListing, BulkTagRequest, BulkTagResponse, Commit, CommitListing, DashboardConfig,
    Repository, Tag,
};

pub type SharedGateway = Arc<dyn RemoteGateway>;

/// One network round trip per call, no retries.
pub trait RemoteGateway: Send + Sync {
    fn fetch_config(&self) -> Result<DashboardConfig, AppError>;

    /// Never fails: any error degrades to an empty list.
    fn fetch_repo_tags(&self, repo: &Repository, config: &DashboardConfig) -> Vec<Tag>;

    fn fetch_repo_commits(
        &self,
        repo: &Repository,
        config: &DashboardConfig,
        limit: u32,
        branch: &str,
    ) -> Result<CommitListing, AppError>;

    /// A readable payload carrying `error` is returned as `Ok`; only transport failures
    /// and unreadable bodies are errors.
    fn fetch_repo_branches(
        &self,
        repo: &Repository,
        config: &DashboardConfig,
    ) -> Result<BranchListing, AppError>;

    fn execute_bulk_tag(&self, request: &BulkTagRequest) -> Result<BulkTagResponse, AppError>;
}

/// Request parameters of a repository-scoped call. Per-repository overrides always
/// take precedence over the global configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoQuery {
    pub repo: String,
    pub project: String,
    pub base_url: String,
}

impl RepoQuery {
    pub fn resolve(repo: &Repository, config: &DashboardConfig) -> Self {
        Self {
            repo: repo.repo.clone(),
            project: repo.project().to_string(),
            base_url: repo.resolved_base_url(config).to_string(),
        }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("repo", self.repo.clone()),
            ("project", self.project.clone()),
            ("baseUrl", self.base_url.clone()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct TagsPayload {
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitsPayload {
    #[serde(default)]
    commits: Vec<Commit>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
}

/// Gateway talking to the tag server over HTTP.
pub struct HttpGateway {
    client: Client,
    server: Url,
}

impl HttpGateway {
    pub fn new(server_url: &str) -> Result<Self, AppError> {
        // Endpoints are joined relative to the server URL, which keeps any path prefix.
        let base = if server_url.ends_with('/') {
            server_url.to_string()
        } else {
            format!("{server_url}/")
        };
        let server = Url::parse(&base)
            .map_err(|err| AppError::Config(format!("invalid server URL {server_url}: {err}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("tagfleet"));
        // TODO: wrap calls in a bounded timeout; a hung server currently blocks the
        // triggering action forever.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None)
            .build()
            .map_err(AppError::from)?;

        Ok(Self { client, server })
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, AppError> {
        let mut url = self
            .server
            .join(path)
            .map_err(|err| AppError::Config(format!("invalid endpoint {path}: {err}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn get(&self, url: Url) -> Result<Response, AppError> {
        debug!(target: "tagfleet::gateway", %url, "GET");
        self.client.get(url).send().map_err(AppError::from)
    }
}

impl RemoteGateway for HttpGateway {
    fn fetch_config(&self) -> Result<DashboardConfig, AppError> {
        let url = self.endpoint("api/config", &[])?;
        let response = self
            .get(url)
            .map_err(|err| AppError::Config(err.detail().to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Config(format!("HTTP {}", status.as_u16())));
        }
        response
            .json::<DashboardConfig>()
            .map_err(|err| AppError::Config(format!("unreadable configuration: {err}")))
    }

    fn fetch_repo_tags(&self, repo: &Repository, config: &DashboardConfig) -> Vec<Tag> {
        let query = RepoQuery::resolve(repo, config);
        let mut params = vec![("org", config.organization().to_string())];
        params.extend(query.pairs());

        let result = self
            .endpoint("api/tags", &params)
            .and_then(|url| self.get(url))
            .and_then(|response| read_json::<TagsPayload>(response, AppError::TagFetch));

        match result {
            Ok(payload) => {
                if let Some(error) = payload.error.filter(|error| !error.trim().is_empty()) {
                    warn!(target: "tagfleet::gateway", repo = %repo.repo, error = %error.trim(), "server reported a tag listing error");
                }
                payload.tags
            }
            Err(err) => {
                warn!(target: "tagfleet::gateway", repo = %repo.repo, error = %err.detail(), "tag fetch failed; treating as no tags");
                Vec::new()
            }
        }
    }

    fn fetch_repo_commits(
        &self,
        repo: &Repository,
        config: &DashboardConfig,
        limit: u32,
        branch: &str,
    ) -> Result<CommitListing, AppError> {
        let query = RepoQuery::resolve(repo, config);
        let mut params = query.pairs();
        params.push(("branch", branch.to_string()));
        params.push(("limit", limit.to_string()));

        let url = self.endpoint("api/commits", &params)?;
        let response = self
            .get(url)
            .map_err(|err| AppError::CommitFetch(err.detail().to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| AppError::CommitFetch(err.to_string()))?;

        if !status.is_success() {
            return Err(AppError::CommitFetch(server_error_text(&body, status)));
        }

        let payload: CommitsPayload = serde_json::from_str(&body)
            .map_err(|err| AppError::CommitFetch(format!("unreadable commit list: {err}")))?;
        if let Some(error) = payload.error.filter(|error| !error.trim().is_empty()) {
            return Err(AppError::CommitFetch(error.trim().to_string()));
        }

        Ok(CommitListing {
            commits: payload.commits,
            branch: payload.branch.unwrap_or_else(|| branch.to_string()),
        })
    }

    fn fetch_repo_branches(
        &self,
        repo: &Repository,
        config: &DashboardConfig,
    ) -> Result<BranchListing, AppError> {
        let query = RepoQuery::resolve(repo, config);
        let url = self.endpoint("api/branches", &query.pairs())?;
        let response = self
            .get(url)
            .map_err(|err| AppError::BranchFetch(err.detail().to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| AppError::BranchFetch(err.to_string()))?;

        match serde_json::from_str::<BranchListing>(&body) {
            Ok(mut listing) => {
                let reported = listing
                    .error
                    .as_deref()
                    .is_some_and(|error| !error.trim().is_empty());
                if !status.is_success() && !reported {
                    listing.error = Some(server_error_text(&body, status));
                }
                Ok(listing)
            }
            Err(_) if !status.is_success() => {
                Err(AppError::BranchFetch(server_error_text(&body, status)))
            }
            Err(err) => Err(AppError::BranchFetch(format!(
                "unreadable branch list: {err}"
            ))),
        }
    }

    fn execute_bulk_tag(&self, request: &BulkTagRequest) -> Result<BulkTagResponse, AppError> {
        let url = self.endpoint("api/bulk-tag", &[])?;
        debug!(target: "tagfleet::gateway", %url, repos = request.repos.len(), "POST");
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .map_err(|err| AppError::BulkExecute(AppError::from(err).detail().to_string()))?;
        read_json::<BulkTagResponse>(response, AppError::BulkExecute)
    }
}

fn read_json<T: DeserializeOwned>(
    response: Response,
    wrap: fn(String) -> AppError,
) -> Result<T, AppError> {
    let status = response.status();
    let body = response.text().map_err(|err| wrap(err.to_string()))?;
    if !status.is_success() {
        return Err(wrap(server_error_text(&body, status)));
    }
    serde_json::from_str(&body).map_err(|err| wrap(format!("unreadable response: {err}")))
}

/// Server-provided `error` text, else `HTTP <status>`.
fn server_error_text(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .map(|error| error.trim().to_string())
        .filter(|error| !error.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
