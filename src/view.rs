use chrono::{DateTime, Utc};

use crate::bulk::{BulkPhase, BulkTagOrchestrator};
use crate::cache::RepositoryStateCache;
use crate::model::{BranchCheckResult, BranchState, Commit, RepoKey, Tag};
use crate::prefs::{AdvancedSettings, PreferenceStore};
use crate::version::{latest_tag, sort_newest_first};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchPill {
    Loading,
    Ready(usize),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitPanel {
    Hidden,
    Loading { branch: String },
    Loaded { branch: String, commits: Vec<Commit> },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCard {
    pub key: RepoKey,
    pub name: String,
    pub tags: Vec<Tag>,
    pub latest_tag: Option<String>,
    pub branch_pill: BranchPill,
    pub branch_options: Vec<String>,
    pub selected_branch: String,
    pub commits: CommitPanel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub repo: String,
    pub success: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSummaryView {
    pub branch: String,
    pub tag: String,
    pub success_count: usize,
    pub fail_count: usize,
    pub lines: Vec<SummaryLine>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPanelView {
    pub phase: BulkPhase,
    pub branch: String,
    pub tag: String,
    pub checks: Vec<BranchCheckResult>,
    pub eligible_count: usize,
    pub error: Option<String>,
    pub summary: Option<BulkSummaryView>,
}

impl Default for BulkPanelView {
    fn default() -> Self {
        Self {
            phase: BulkPhase::Idle,
            branch: String::new(),
            tag: String::new(),
            checks: Vec::new(),
            eligible_count: 0,
            error: None,
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// One-shot user message. `id` grows monotonically so the UI shows each one once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

/// Controller-side state that is not owned by the cache or the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub loading: bool,
    pub load_error: Option<String>,
    pub notice: Option<Notice>,
    pub refresh_scheduled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardView {
    pub loading: bool,
    pub load_error: Option<String>,
    pub repos: Vec<RepoCard>,
    pub bulk: BulkPanelView,
    pub bulk_branch_default: String,
    pub settings: AdvancedSettings,
    pub notice: Option<Notice>,
    pub refresh_scheduled: bool,
}

/// Builds the read-only projection the UI renders. Pure: no I/O, no mutation.
pub fn project(
    cache: &RepositoryStateCache,
    bulk: &BulkTagOrchestrator,
    prefs: &PreferenceStore,
    session: &Session,
) -> DashboardView {
    let repos = cache
        .repos()
        .iter()
        .map(|entry| {
            let key = entry.repository.key();
            let mut tags = entry.tags.clone();
            sort_newest_first(&mut tags);
            let branch_state = cache.branch_state(&key);
            RepoCard {
                name: entry.repository.display_name().to_string(),
                latest_tag: latest_tag(&entry.tags).map(|tag| tag.name.clone()),
                tags,
                branch_pill: branch_pill(branch_state),
                branch_options: branch_state
                    .map(|state| state.branches.clone())
                    .unwrap_or_default(),
                selected_branch: prefs.selected_branch(&key),
                commits: commit_panel(cache, &key),
                key,
            }
        })
        .collect();

    DashboardView {
        loading: session.loading,
        load_error: session.load_error.clone(),
        repos,
        bulk: bulk_panel(bulk),
        bulk_branch_default: prefs.bulk_tag_branch(),
        settings: prefs.advanced_settings(),
        notice: session.notice.clone(),
        refresh_scheduled: session.refresh_scheduled,
    }
}

fn branch_pill(state: Option<&BranchState>) -> BranchPill {
    match state {
        Some(state) if state.is_ready() => BranchPill::Ready(state.branches.len()),
        Some(state) if state.is_failed() => {
            BranchPill::Unavailable(state.error.clone().unwrap_or_default())
        }
        _ => BranchPill::Loading,
    }
}

fn commit_panel(cache: &RepositoryStateCache, key: &RepoKey) -> CommitPanel {
    if let Some(error) = cache.commit_error(key) {
        return CommitPanel::Failed(error.to_string());
    }
    match cache.commits_state(key) {
        None => CommitPanel::Hidden,
        Some(state) if !state.loaded => CommitPanel::Loading {
            branch: state.branch.clone(),
        },
        Some(state) => CommitPanel::Loaded {
            branch: state.branch.clone(),
            commits: state.commits.clone(),
        },
    }
}

fn bulk_panel(bulk: &BulkTagOrchestrator) -> BulkPanelView {
    BulkPanelView {
        phase: bulk.phase(),
        branch: bulk.branch().to_string(),
        tag: bulk.tag().to_string(),
        checks: bulk.checks().to_vec(),
        eligible_count: bulk.eligible().len(),
        error: bulk.error().map(str::to_string),
        summary: bulk.summary().map(|summary| BulkSummaryView {
            branch: summary.branch.clone(),
            tag: summary.tag.clone(),
            success_count: summary.success_count,
            fail_count: summary.fail_count,
            lines: summary
                .results
                .iter()
                .map(|result| SummaryLine {
                    repo: result.repo.clone(),
                    success: result.success,
                    text: if result.success {
                        result.message.clone().unwrap_or_else(|| "tagged".to_string())
                    } else {
                        result
                            .error
                            .clone()
                            .unwrap_or_else(|| "unknown error".to_string())
                    },
                })
                .collect(),
            completed_at: summary.completed_at,
        }),
    }
}
