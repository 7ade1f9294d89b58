use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::fanout::fan_out;
use crate::gateway::SharedGateway;
use crate::model::{
    BranchListing, BranchState, CommitsState, DashboardConfig, RepoKey, Repository, Tag,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    pub repository: Repository,
    pub tags: Vec<Tag>,
}

/// Authoritative in-memory snapshot of every repository the dashboard knows about.
///
/// Every slot is derived from the last completed fetch for that repository. Nothing is
/// patched incrementally, with one exception: a failed branch refresh keeps the branch
/// names of the previous successful one.
#[derive(Debug, Default)]
pub struct RepositoryStateCache {
    config: Option<Arc<DashboardConfig>>,
    repos: Vec<RepoEntry>,
    branches: HashMap<RepoKey, BranchState>,
    commits: HashMap<RepoKey, CommitsState>,
    commit_errors: HashMap<RepoKey, String>,
}

impl RepositoryStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&Arc<DashboardConfig>> {
        self.config.as_ref()
    }

    pub fn repos(&self) -> &[RepoEntry] {
        &self.repos
    }

    pub fn repository(&self, key: &RepoKey) -> Option<&Repository> {
        self.repos
            .iter()
            .map(|entry| &entry.repository)
            .find(|repo| &repo.key() == key)
    }

    pub fn branch_state(&self, key: &RepoKey) -> Option<&BranchState> {
        self.branches.get(key)
    }

    pub fn commits_state(&self, key: &RepoKey) -> Option<&CommitsState> {
        self.commits.get(key)
    }

    pub fn commit_error(&self, key: &RepoKey) -> Option<&str> {
        self.commit_errors.get(key).map(String::as_str)
    }

    /// Full reload: config, tags and branches for every repository.
    pub fn refresh_all(
        &mut self,
        gateway: &SharedGateway,
        notify: &mut dyn FnMut(&Self),
    ) -> Result<(), AppError> {
        self.load_repositories(gateway)?;
        notify(self);
        self.load_all_branches(gateway);
        notify(self);
        Ok(())
    }

    /// Fetches the config, then every repository's tags in parallel, and replaces the
    /// repository set wholesale. All cached branch and commit state is dropped.
    pub fn load_repositories(&mut self, gateway: &SharedGateway) -> Result<(), AppError> {
        let config = Arc::new(gateway.fetch_config()?);
        let repositories = config.repository_list()?;
        info!(target: "tagfleet::cache", repos = repositories.len(), "configuration loaded");

        let tags = {
            let gateway = Arc::clone(gateway);
            let config = Arc::clone(&config);
            fan_out("fetch_tags", repositories.clone(), move |repo| {
                gateway.fetch_repo_tags(&repo, &config)
            })
        };

        self.repos = repositories
            .into_iter()
            .zip(tags)
            .map(|(repository, tags)| RepoEntry { repository, tags })
            .collect();
        self.config = Some(config);
        self.branches.clear();
        self.commits.clear();
        self.commit_errors.clear();
        Ok(())
    }

    /// Marks every branch slot pending, then fetches all of them in parallel. Each slot
    /// settles independently of the others.
    pub fn load_all_branches(&mut self, gateway: &SharedGateway) {
        let Some(config) = self.config.clone() else {
            return;
        };
        let repositories: Vec<Repository> = self
            .repos
            .iter()
            .map(|entry| entry.repository.clone())
            .collect();
        for repo in &repositories {
            let key = repo.key();
            let pending = BranchState::pending(self.branches.get(&key));
            self.branches.insert(key, pending);
        }

        let gateway = Arc::clone(gateway);
        let results = fan_out("fetch_branches", repositories.clone(), move |repo| {
            gateway.fetch_repo_branches(&repo, &config)
        });

        for (repo, result) in repositories.iter().zip(results) {
            self.apply_branch_result(&repo.key(), result);
        }
    }

    /// Branch names for one repository. Unless forced, a non-empty cached list is
    /// returned without a network call.
    pub fn refresh_branches(
        &mut self,
        gateway: &SharedGateway,
        key: &RepoKey,
        force: bool,
        notify: &mut dyn FnMut(&Self),
    ) -> Result<Vec<String>, AppError> {
        if !force {
            if let Some(state) = self.branches.get(key) {
                if !state.branches.is_empty() {
                    return Ok(state.branches.clone());
                }
            }
        }

        let (repo, config) = self.lookup(key)?;
        let pending = BranchState::pending(self.branches.get(key));
        self.branches.insert(key.clone(), pending);
        notify(self);

        let result = gateway.fetch_repo_branches(&repo, &config);
        self.apply_branch_result(key, result);
        notify(self);

        Ok(self
            .branches
            .get(key)
            .map(|state| state.branches.clone())
            .unwrap_or_default())
    }

    fn apply_branch_result(&mut self, key: &RepoKey, result: Result<BranchListing, AppError>) {
        let previous = self
            .branches
            .get(key)
            .map(|state| state.branches.clone())
            .unwrap_or_default();

        let state = match result {
            Ok(listing) => match listing.error.clone() {
                None => BranchState {
                    loading: false,
                    branches: listing.names(),
                    error: None,
                },
                Some(error) => {
                    warn!(target: "tagfleet::cache", repo = %key.repo, %error, "branch listing reported an error");
                    let names = listing.names();
                    BranchState {
                        loading: false,
                        branches: if names.is_empty() { previous } else { names },
                        error: Some(error.trim().to_string()),
                    }
                }
            },
            Err(err) => {
                warn!(target: "tagfleet::cache", repo = %key.repo, error = %err.detail(), "branch fetch failed; keeping previous branches");
                BranchState {
                    loading: false,
                    branches: previous,
                    error: Some(err.detail().to_string()),
                }
            }
        };
        self.branches.insert(key.clone(), state);
    }

    /// Loads commits for one repository. Success replaces the slot; failure removes it
    /// entirely so stale commits are never shown under an error.
    pub fn load_commits(
        &mut self,
        gateway: &SharedGateway,
        key: &RepoKey,
        branch: &str,
        limit: u32,
        notify: &mut dyn FnMut(&Self),
    ) -> Result<(), AppError> {
        let (repo, config) = self.lookup(key)?;
        self.commit_errors.remove(key);
        self.commits.insert(
            key.clone(),
            CommitsState {
                loaded: false,
                commits: Vec::new(),
                branch: branch.to_string(),
            },
        );
        notify(self);

        let result = gateway.fetch_repo_commits(&repo, &config, limit, branch);
        let outcome = match result {
            Ok(listing) => {
                debug!(target: "tagfleet::cache", repo = %key.repo, branch = %listing.branch, commits = listing.commits.len(), "commits loaded");
                self.commits.insert(
                    key.clone(),
                    CommitsState {
                        loaded: true,
                        commits: listing.commits,
                        branch: listing.branch,
                    },
                );
                Ok(())
            }
            Err(err) => {
                warn!(target: "tagfleet::cache", repo = %key.repo, %branch, error = %err.detail(), "commit fetch failed");
                self.commits.remove(key);
                self.commit_errors
                    .insert(key.clone(), err.detail().to_string());
                Err(err)
            }
        };
        notify(self);
        outcome
    }

    /// Forgets the commit slot of one repository.
    pub fn clear_commits(&mut self, key: &RepoKey) {
        self.commits.remove(key);
        self.commit_errors.remove(key);
    }

    /// Loads commits for every repository one after another, never in parallel, to
    /// bound the load on the server. Failures only affect their own slot.
    pub fn auto_fetch_commits(
        &mut self,
        gateway: &SharedGateway,
        limit: u32,
        branch_for: &dyn Fn(&RepoKey) -> String,
        notify: &mut dyn FnMut(&Self),
    ) -> usize {
        let keys: Vec<RepoKey> = self
            .repos
            .iter()
            .map(|entry| entry.repository.key())
            .collect();
        let mut loaded = 0;
        for key in keys {
            let branch = branch_for(&key);
            if self.load_commits(gateway, &key, &branch, limit, notify).is_ok() {
                loaded += 1;
            }
        }
        info!(target: "tagfleet::cache", loaded, "auto-fetch of commits finished");
        loaded
    }

    fn lookup(&self, key: &RepoKey) -> Result<(Repository, Arc<DashboardConfig>), AppError> {
        let config = self
            .config
            .clone()
            .ok_or_else(|| AppError::Validation("Repositories are not loaded yet.".to_string()))?;
        let repo = self.repository(key).cloned().ok_or_else(|| {
            AppError::Validation(format!("Unknown repository {}", key.storage_key()))
        })?;
        Ok((repo, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CommitListing;
    use crate::testing::{MockGateway, branches, commit, tag};

    fn shared(gateway: MockGateway) -> (Arc<MockGateway>, SharedGateway) {
        let mock = Arc::new(gateway);
        let shared: SharedGateway = mock.clone();
        (mock, shared)
    }

    fn key(repo: &str) -> RepoKey {
        RepoKey::new(repo, repo)
    }

    fn loaded_cache(shared: &SharedGateway) -> RepositoryStateCache {
        let mut cache = RepositoryStateCache::new();
        cache.refresh_all(shared, &mut |_| {}).unwrap();
        cache
    }

    #[test]
    fn tag_failures_degrade_to_empty_lists() {
        let mock = MockGateway::with_repositories(&["svc-a", "svc-b"]);
        mock.set_tags("svc-a", vec![tag("v1", "abcdef0123")]);
        let (_, shared) = shared(mock);

        let cache = loaded_cache(&shared);

        assert_eq!(cache.repos().len(), 2);
        assert_eq!(cache.repos()[0].tags.len(), 1);
        assert_eq!(cache.repos()[0].tags[0].short_commit, "abcdef0");
        assert!(cache.repos()[1].tags.is_empty());
    }

    #[test]
    fn refresh_all_is_idempotent() {
        let mock = MockGateway::with_repositories(&["svc-a", "svc-b"]);
        mock.set_tags("svc-b", vec![tag("v2.0.0", "1234567890")]);
        mock.set_branches("svc-a", Ok(branches(&["main", "dev"])));
        let (_, shared) = shared(mock);

        let mut cache = loaded_cache(&shared);
        let first = cache.repos().to_vec();
        let first_branches = cache.branch_state(&key("svc-a")).cloned();
        cache.refresh_all(&shared, &mut |_| {}).unwrap();

        assert_eq!(cache.repos(), first.as_slice());
        assert_eq!(cache.branch_state(&key("svc-a")).cloned(), first_branches);
    }

    #[test]
    fn missing_repositories_fail_fast() {
        let mock = MockGateway::default();
        mock.set_config(Ok(DashboardConfig::default()));
        let (mock, shared) = shared(mock);

        let mut cache = RepositoryStateCache::new();
        let result = cache.refresh_all(&shared, &mut |_| {});

        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(mock.tag_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(cache.repos().is_empty());
    }

    #[test]
    fn config_errors_propagate() {
        let (_, shared) = shared(MockGateway::default());
        let mut cache = RepositoryStateCache::new();
        assert!(matches!(
            cache.refresh_all(&shared, &mut |_| {}),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn branch_slots_settle_independently() {
        let mock = MockGateway::with_repositories(&["svc-a", "svc-b", "svc-c"]);
        mock.set_branches("svc-a", Ok(branches(&["main", "dev", "main"])));
        mock.set_branches(
            "svc-b",
            Err(AppError::BranchFetch("connection reset".to_string())),
        );
        mock.set_branches(
            "svc-c",
            Ok(BranchListing {
                branches: Vec::new(),
                error: Some("fatal: repository not found".to_string()),
            }),
        );
        let (_, shared) = shared(mock);

        let cache = loaded_cache(&shared);

        let a = cache.branch_state(&key("svc-a")).unwrap();
        assert!(a.is_ready());
        assert_eq!(a.branches, vec!["main".to_string(), "dev".to_string()]);

        let b = cache.branch_state(&key("svc-b")).unwrap();
        assert!(b.is_failed());
        assert_eq!(b.error.as_deref(), Some("connection reset"));

        let c = cache.branch_state(&key("svc-c")).unwrap();
        assert!(c.is_failed());
        assert!(c.branches.is_empty());
    }

    #[test]
    fn failed_branch_refresh_keeps_previous_branches() {
        let mock = MockGateway::with_repositories(&["svc-a"]);
        mock.set_branches("svc-a", Ok(branches(&["main", "dev"])));
        let (mock, shared) = shared(mock);
        let mut cache = loaded_cache(&shared);

        mock.set_branches("svc-a", Err(AppError::BranchFetch("HTTP 504".to_string())));
        let names = cache
            .refresh_branches(&shared, &key("svc-a"), true, &mut |_| {})
            .unwrap();

        assert_eq!(names, vec!["main".to_string(), "dev".to_string()]);
        let state = cache.branch_state(&key("svc-a")).unwrap();
        assert_eq!(state.branches, vec!["main".to_string(), "dev".to_string()]);
        assert!(state.error.is_some());
        assert!(!state.loading);
    }

    #[test]
    fn cached_branches_short_circuit_unless_forced() {
        let mock = MockGateway::with_repositories(&["svc-a"]);
        mock.set_branches("svc-a", Ok(branches(&["main"])));
        let (mock, shared) = shared(mock);
        let mut cache = loaded_cache(&shared);
        let calls = mock.branch_calls();

        cache
            .refresh_branches(&shared, &key("svc-a"), false, &mut |_| {})
            .unwrap();
        assert_eq!(mock.branch_calls(), calls);

        mock.set_branches("svc-a", Ok(branches(&["main", "release"])));
        let names = cache
            .refresh_branches(&shared, &key("svc-a"), true, &mut |_| {})
            .unwrap();
        assert_eq!(mock.branch_calls(), calls + 1);
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn branch_refresh_reports_loading_before_settling() {
        let mock = MockGateway::with_repositories(&["svc-a"]);
        mock.set_branches("svc-a", Ok(branches(&["main"])));
        let (_, shared) = shared(mock);
        let mut cache = loaded_cache(&shared);

        let mut seen = Vec::new();
        cache
            .refresh_branches(&shared, &key("svc-a"), true, &mut |cache| {
                seen.push(cache.branch_state(&key("svc-a")).unwrap().loading);
            })
            .unwrap();
        assert_eq!(seen, vec![true, false]);
    }

    #[test]
    fn failed_commit_load_removes_the_slot() {
        let mock = MockGateway::with_repositories(&["svc-a"]);
        mock.set_commits(
            "svc-a",
            Ok(CommitListing {
                commits: vec![commit("1111111aaaa", "old")],
                branch: "dev".to_string(),
            }),
        );
        let (mock, shared) = shared(mock);
        let mut cache = loaded_cache(&shared);
        cache
            .load_commits(&shared, &key("svc-a"), "dev", 5, &mut |_| {})
            .unwrap();
        assert!(cache.commits_state(&key("svc-a")).is_some());

        mock.set_commits("svc-a", Err(AppError::CommitFetch("HTTP 500".to_string())));
        let result = cache.load_commits(&shared, &key("svc-a"), "dev", 5, &mut |_| {});

        assert!(matches!(result, Err(AppError::CommitFetch(ref msg)) if msg == "HTTP 500"));
        assert!(cache.commits_state(&key("svc-a")).is_none());
        assert_eq!(cache.commit_error(&key("svc-a")), Some("HTTP 500"));

        mock.set_commits(
            "svc-a",
            Ok(CommitListing {
                commits: vec![commit("2222222bbbb", "new"), commit("3333333cccc", "newer")],
                branch: "dev".to_string(),
            }),
        );
        cache
            .load_commits(&shared, &key("svc-a"), "dev", 5, &mut |_| {})
            .unwrap();
        let state = cache.commits_state(&key("svc-a")).unwrap();
        assert!(state.loaded);
        assert_eq!(state.commits.len(), 2);
        assert_eq!(cache.commit_error(&key("svc-a")), None);
    }

    #[test]
    fn commit_slot_records_the_branch_actually_served() {
        let mock = MockGateway::with_repositories(&["svc-a"]);
        mock.set_commits(
            "svc-a",
            Ok(CommitListing {
                commits: vec![commit("1111111aaaa", "init")],
                branch: "main".to_string(),
            }),
        );
        let (mock, shared) = shared(mock);
        let mut cache = loaded_cache(&shared);

        cache
            .load_commits(&shared, &key("svc-a"), "dev", 3, &mut |_| {})
            .unwrap();

        assert_eq!(cache.commits_state(&key("svc-a")).unwrap().branch, "main");
        assert_eq!(
            mock.commit_requests.lock().unwrap()[0],
            ("svc-a".to_string(), "dev".to_string(), 3)
        );
    }

    #[test]
    fn auto_fetch_walks_every_repository_in_order() {
        let mock = MockGateway::with_repositories(&["svc-a", "svc-b", "svc-c"]);
        for repo in ["svc-a", "svc-c"] {
            mock.set_commits(
                repo,
                Ok(CommitListing {
                    commits: vec![commit("1111111aaaa", "init")],
                    branch: "dev".to_string(),
                }),
            );
        }
        let (mock, shared) = shared(mock);
        let mut cache = loaded_cache(&shared);

        let loaded = cache.auto_fetch_commits(
            &shared,
            7,
            &|key| if key.repo == "svc-b" { "main".to_string() } else { "dev".to_string() },
            &mut |_| {},
        );

        assert_eq!(loaded, 2);
        let requests = mock.commit_requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                ("svc-a".to_string(), "dev".to_string(), 7),
                ("svc-b".to_string(), "main".to_string(), 7),
                ("svc-c".to_string(), "dev".to_string(), 7),
            ]
        );
        assert!(cache.commits_state(&key("svc-b")).is_none());
    }

    #[test]
    fn refresh_all_discards_commit_state() {
        let mock = MockGateway::with_repositories(&["svc-a"]);
        mock.set_commits(
            "svc-a",
            Ok(CommitListing {
                commits: vec![commit("1111111aaaa", "init")],
                branch: "dev".to_string(),
            }),
        );
        let (_, shared) = shared(mock);
        let mut cache = loaded_cache(&shared);
        cache
            .load_commits(&shared, &key("svc-a"), "dev", 5, &mut |_| {})
            .unwrap();

        cache.refresh_all(&shared, &mut |_| {}).unwrap();
        assert!(cache.commits_state(&key("svc-a")).is_none());
    }

    #[test]
    fn unknown_repository_is_rejected() {
        let (_, shared) = shared(MockGateway::with_repositories(&["svc-a"]));
        let mut cache = loaded_cache(&shared);
        let result = cache.load_commits(&shared, &key("ghost"), "dev", 5, &mut |_| {});
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
