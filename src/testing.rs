use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use crate::error::AppError;
use crate::gateway::RemoteGateway;
use crate::model::{
    BranchListing, BranchRef, BulkTagRequest, BulkTagResponse, Commit, CommitListing,
    DashboardConfig, Repository, Tag,
};

pub fn repositories(slugs: &[&str]) -> Value {
    Value::Array(slugs.iter().map(|slug| json!({ "repo": slug })).collect())
}

pub fn tag(name: &str, commit: &str) -> Tag {
    Tag {
        name: name.to_string(),
        commit: commit.to_string(),
        short_commit: commit.chars().take(7).collect(),
    }
}

pub fn commit(hash: &str, subject: &str) -> Commit {
    Commit {
        hash: hash.to_string(),
        short_hash: hash.chars().take(7).collect(),
        date: "2026-10-01 09:00:00".to_string(),
        subject: subject.to_string(),
        author: "Tester".to_string(),
        email: "tester@example.com".to_string(),
        body: None,
        timestamp: Some(1_790_000_000),
    }
}

pub fn branches(names: &[&str]) -> BranchListing {
    BranchListing {
        branches: names
            .iter()
            .map(|name| BranchRef {
                name: name.to_string(),
                ..BranchRef::default()
            })
            .collect(),
        error: None,
    }
}

/// In-memory gateway with scripted answers and call counters.
#[derive(Default)]
pub struct MockGateway {
    pub config: Mutex<Option<Result<DashboardConfig, AppError>>>,
    pub tags: Mutex<HashMap<String, Vec<Tag>>>,
    pub branches: Mutex<HashMap<String, Result<BranchListing, AppError>>>,
    pub commits: Mutex<HashMap<String, Result<CommitListing, AppError>>>,
    pub bulk: Mutex<Option<Result<BulkTagResponse, AppError>>>,
    pub bulk_requests: Mutex<Vec<BulkTagRequest>>,
    pub commit_requests: Mutex<Vec<(String, String, u32)>>,
    pub config_calls: AtomicUsize,
    pub tag_calls: AtomicUsize,
    pub branch_calls: AtomicUsize,
}

impl MockGateway {
    pub fn with_repositories(slugs: &[&str]) -> Self {
        let gateway = Self::default();
        gateway.set_config(Ok(DashboardConfig {
            base_url: "https://dev.azure.com".to_string(),
            organization: Some("acme".to_string()),
            repositories: Some(repositories(slugs)),
        }));
        gateway
    }

    pub fn set_config(&self, config: Result<DashboardConfig, AppError>) {
        *self.config.lock().unwrap() = Some(config);
    }

    pub fn set_tags(&self, repo: &str, tags: Vec<Tag>) {
        self.tags.lock().unwrap().insert(repo.to_string(), tags);
    }

    pub fn set_branches(&self, repo: &str, result: Result<BranchListing, AppError>) {
        self.branches
            .lock()
            .unwrap()
            .insert(repo.to_string(), result);
    }

    pub fn set_commits(&self, repo: &str, result: Result<CommitListing, AppError>) {
        self.commits.lock().unwrap().insert(repo.to_string(), result);
    }

    pub fn set_bulk(&self, result: Result<BulkTagResponse, AppError>) {
        *self.bulk.lock().unwrap() = Some(result);
    }

    pub fn branch_calls(&self) -> usize {
        self.branch_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.config_calls.load(Ordering::SeqCst)
            + self.tag_calls.load(Ordering::SeqCst)
            + self.branch_calls.load(Ordering::SeqCst)
            + self.commit_requests.lock().unwrap().len()
            + self.bulk_requests.lock().unwrap().len()
    }
}

impl RemoteGateway for MockGateway {
    fn fetch_config(&self) -> Result<DashboardConfig, AppError> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        self.config
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(AppError::Config("HTTP 404".to_string())))
    }

    fn fetch_repo_tags(&self, repo: &Repository, _config: &DashboardConfig) -> Vec<Tag> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        self.tags
            .lock()
            .unwrap()
            .get(&repo.repo)
            .cloned()
            .unwrap_or_default()
    }

    fn fetch_repo_commits(
        &self,
        repo: &Repository,
        _config: &DashboardConfig,
        limit: u32,
        branch: &str,
    ) -> Result<CommitListing, AppError> {
        self.commit_requests
            .lock()
            .unwrap()
            .push((repo.repo.clone(), branch.to_string(), limit));
        self.commits
            .lock()
            .unwrap()
            .get(&repo.repo)
            .cloned()
            .unwrap_or_else(|| Err(AppError::CommitFetch("HTTP 404".to_string())))
    }

    fn fetch_repo_branches(
        &self,
        repo: &Repository,
        _config: &DashboardConfig,
    ) -> Result<BranchListing, AppError> {
        self.branch_calls.fetch_add(1, Ordering::SeqCst);
        self.branches
            .lock()
            .unwrap()
            .get(&repo.repo)
            .cloned()
            .unwrap_or_else(|| Ok(BranchListing::default()))
    }

    fn execute_bulk_tag(&self, request: &BulkTagRequest) -> Result<BulkTagResponse, AppError> {
        self.bulk_requests.lock().unwrap().push(request.clone());
        self.bulk
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(AppError::BulkExecute("HTTP 500".to_string())))
    }
}
