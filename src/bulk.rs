use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::cache::RepositoryStateCache;
use crate::error::AppError;
use crate::fanout::fan_out;
use crate::gateway::SharedGateway;
use crate::model::{BranchCheckResult, BulkTagRequest, BulkTagResult, BulkTagTarget, Repository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkPhase {
    Idle,
    Checking,
    Checked,
    Executing,
    Completed,
}

impl BulkPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking branches",
            Self::Checked => "ready to tag",
            Self::Executing => "tagging",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSummary {
    pub branch: String,
    pub tag: String,
    pub success_count: usize,
    pub fail_count: usize,
    pub results: Vec<BulkTagResult>,
    pub completed_at: DateTime<Utc>,
}

impl BulkSummary {
    fn from_results(branch: &str, tag: &str, results: Vec<BulkTagResult>) -> Self {
        let success_count = results.iter().filter(|result| result.success).count();
        Self {
            branch: branch.to_string(),
            tag: tag.to_string(),
            success_count,
            fail_count: results.len() - success_count,
            results,
            completed_at: Utc::now(),
        }
    }

    /// Tagged repositories changed server-side, so the dashboard should reload.
    pub fn needs_refresh(&self) -> bool {
        self.success_count > 0
    }
}

/// Drives branch check, confirmation and tag creation across all repositories.
///
/// `Idle -> Checking -> Checked -> Executing -> Completed`. Invalid input sends
/// `Checking` back to `Idle`; a failed batch call sends `Executing` back to `Checked`
/// with the eligibility list intact.
#[derive(Debug)]
pub struct BulkTagOrchestrator {
    phase: BulkPhase,
    branch: String,
    tag: String,
    checks: Vec<BranchCheckResult>,
    eligible: Vec<BulkTagTarget>,
    summary: Option<BulkSummary>,
    error: Option<String>,
}

impl Default for BulkTagOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkTagOrchestrator {
    pub fn new() -> Self {
        Self {
            phase: BulkPhase::Idle,
            branch: String::new(),
            tag: String::new(),
            checks: Vec::new(),
            eligible: Vec::new(),
            summary: None,
            error: None,
        }
    }

    pub fn phase(&self) -> BulkPhase {
        self.phase
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn checks(&self) -> &[BranchCheckResult] {
        &self.checks
    }

    pub fn eligible(&self) -> &[BulkTagTarget] {
        &self.eligible
    }

    pub fn summary(&self) -> Option<&BulkSummary> {
        self.summary.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Verifies which repositories carry `branch`. Every known repository is asked in
    /// parallel; a failed lookup counts as "branch missing". Returns the eligible count.
    pub fn check(
        &mut self,
        gateway: &SharedGateway,
        cache: &RepositoryStateCache,
        branch: &str,
        tag: &str,
        notify: &mut dyn FnMut(&Self),
    ) -> Result<usize, AppError> {
        let branch = branch.trim();
        let tag = tag.trim();

        self.checks.clear();
        self.eligible.clear();
        self.summary = None;
        self.error = None;

        if let Err(err) = validate_inputs(branch, tag) {
            self.phase = BulkPhase::Idle;
            self.error = Some(err.user_message());
            return Err(err);
        }
        let Some(config) = cache.config().cloned() else {
            let err = AppError::Validation("Load the repositories before tagging.".to_string());
            self.phase = BulkPhase::Idle;
            self.error = Some(err.user_message());
            return Err(err);
        };

        self.branch = branch.to_string();
        self.tag = tag.to_string();
        self.phase = BulkPhase::Checking;
        notify(self);

        let repositories: Vec<Repository> = cache
            .repos()
            .iter()
            .map(|entry| entry.repository.clone())
            .collect();
        let listings = {
            let gateway = Arc::clone(gateway);
            let config = Arc::clone(&config);
            fan_out("check_branch", repositories.clone(), move |repo| {
                gateway.fetch_repo_branches(&repo, &config)
            })
        };

        self.checks = repositories
            .iter()
            .zip(listings)
            .map(|(repo, listing)| {
                let (has_branch, error) = match listing {
                    Ok(listing) => (listing.contains(branch), listing.error),
                    Err(err) => {
                        warn!(target: "tagfleet::bulk", repo = %repo.repo, error = %err.detail(), "branch check failed");
                        (false, Some(err.detail().to_string()))
                    }
                };
                BranchCheckResult {
                    name: repo.display_name().to_string(),
                    repo: repo.repo.clone(),
                    project: repo.project().to_string(),
                    has_branch,
                    base_url: repo.resolved_base_url(&config).to_string(),
                    error,
                }
            })
            .collect();

        self.eligible = self
            .checks
            .iter()
            .filter(|check| check.has_branch)
            .map(|check| BulkTagTarget {
                repo: check.repo.clone(),
                project: check.project.clone(),
                base_url: check.base_url.clone(),
            })
            .collect();
        self.phase = BulkPhase::Checked;

        info!(
            target: "tagfleet::bulk",
            %branch,
            %tag,
            checked = self.checks.len(),
            eligible = self.eligible.len(),
            "branch check finished"
        );
        notify(self);
        Ok(self.eligible.len())
    }

    /// Tags every eligible repository in one batch call. The per-repository results are
    /// taken as reported; nothing is re-verified. The eligibility list of the last check
    /// is reused as is.
    pub fn execute(
        &mut self,
        gateway: &SharedGateway,
        notify: &mut dyn FnMut(&Self),
    ) -> Result<BulkSummary, AppError> {
        if !matches!(self.phase, BulkPhase::Checked | BulkPhase::Completed) {
            let err = AppError::Validation("Check the branch before creating tags.".to_string());
            self.error = Some(err.user_message());
            return Err(err);
        }
        if self.eligible.is_empty() {
            let err = AppError::Validation(format!(
                "No repository has branch {}; nothing to tag.",
                self.branch
            ));
            self.phase = BulkPhase::Checked;
            self.error = Some(err.user_message());
            return Err(err);
        }

        self.summary = None;
        self.error = None;
        self.phase = BulkPhase::Executing;
        notify(self);

        let request = BulkTagRequest {
            branch: self.branch.clone(),
            tag: self.tag.clone(),
            repos: self.eligible.clone(),
        };
        match gateway.execute_bulk_tag(&request) {
            Ok(response) => {
                let summary = BulkSummary::from_results(&self.branch, &self.tag, response.results);
                info!(
                    target: "tagfleet::bulk",
                    tag = %self.tag,
                    success = summary.success_count,
                    failed = summary.fail_count,
                    "bulk tag finished"
                );
                self.summary = Some(summary.clone());
                self.phase = BulkPhase::Completed;
                notify(self);
                Ok(summary)
            }
            Err(err) => {
                error!(target: "tagfleet::bulk", error = %err.detail(), "bulk tag request failed");
                let err = match err {
                    AppError::BulkExecute(_) => err,
                    other => AppError::BulkExecute(other.detail().to_string()),
                };
                self.phase = BulkPhase::Checked;
                self.error = Some(err.to_string());
                notify(self);
                Err(err)
            }
        }
    }
}

fn validate_inputs(branch: &str, tag: &str) -> Result<(), AppError> {
    if branch.is_empty() {
        return Err(AppError::Validation("Enter a branch name.".to_string()));
    }
    if tag.is_empty() {
        return Err(AppError::Validation("Enter a tag name.".to_string()));
    }
    Ok(())
}
