use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Stable identity of a repository: `(repo, project)` where the project falls back
/// to the repo slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoKey {
    pub repo: String,
    pub project: String,
}

impl RepoKey {
    pub fn new<R: Into<String>, P: Into<String>>(repo: R, project: P) -> Self {
        Self {
            repo: repo.into(),
            project: project.into(),
        }
    }

    /// Key used in the persisted branch-selection mapping.
    pub fn storage_key(&self) -> String {
        format!("{}/{}", self.project, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub repo: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Repository {
    pub fn new<S: Into<String>>(repo: S) -> Self {
        Self {
            repo: repo.into(),
            project: None,
            name: None,
            base_url: None,
        }
    }

    pub fn project(&self) -> &str {
        non_empty(self.project.as_deref()).unwrap_or(self.repo.as_str())
    }

    pub fn display_name(&self) -> &str {
        non_empty(self.name.as_deref()).unwrap_or(self.repo.as_str())
    }

    pub fn key(&self) -> RepoKey {
        RepoKey::new(self.repo.clone(), self.project())
    }

    /// Per-repository base URL override, else the global one.
    pub fn resolved_base_url<'a>(&'a self, config: &'a DashboardConfig) -> &'a str {
        non_empty(self.base_url.as_deref()).unwrap_or(config.base_url.as_str())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Payload of `/api/config`. Server-only fields (credentials and the like) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub repositories: Option<Value>,
}

impl DashboardConfig {
    pub fn organization(&self) -> &str {
        self.organization.as_deref().unwrap_or_default()
    }

    pub fn repository_list(&self) -> Result<Vec<Repository>, AppError> {
        let Some(value) = &self.repositories else {
            return Err(AppError::Config(
                "configuration has no `repositories` entry".to_string(),
            ));
        };
        let Value::Array(entries) = value else {
            return Err(AppError::Config(
                "`repositories` must be a list".to_string(),
            ));
        };

        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                serde_json::from_value::<Repository>(entry.clone()).map_err(|err| {
                    AppError::Config(format!("repository entry {index} is invalid: {err}"))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub short_commit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: String,
    #[serde(default)]
    pub short_hash: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRef {
    pub name: String,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub short_commit: Option<String>,
}

/// Branch listing as served; `error` set on a readable payload is a soft failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BranchListing {
    #[serde(default)]
    pub branches: Vec<BranchRef>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BranchListing {
    /// Branch names in served order, duplicates removed.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            if !names.iter().any(|known| known == &branch.name) {
                names.push(branch.name.clone());
            }
        }
        names
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.branches.iter().any(|entry| entry.name == branch)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitListing {
    pub commits: Vec<Commit>,
    /// Branch the server actually read, which may differ from the one requested.
    pub branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchState {
    pub loading: bool,
    pub branches: Vec<String>,
    pub error: Option<String>,
}

impl BranchState {
    pub fn pending(previous: Option<&BranchState>) -> Self {
        Self {
            loading: true,
            branches: previous
                .map(|state| state.branches.clone())
                .unwrap_or_default(),
            error: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.loading && self.error.is_none()
    }

    pub fn is_failed(&self) -> bool {
        !self.loading && self.error.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitsState {
    pub loaded: bool,
    pub commits: Vec<Commit>,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCheckResult {
    pub name: String,
    pub repo: String,
    pub project: String,
    pub has_branch: bool,
    pub base_url: String,
    pub error: Option<String>,
}

impl BranchCheckResult {
    pub fn key(&self) -> RepoKey {
        RepoKey::new(self.repo.clone(), self.project.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTagTarget {
    pub repo: String,
    pub project: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkTagRequest {
    pub branch: String,
    pub tag: String,
    pub repos: Vec<BulkTagTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BulkTagResult {
    pub repo: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BulkTagResponse {
    #[serde(default)]
    pub results: Vec<BulkTagResult>,
}
