use std::ops::ControlFlow;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::bulk::BulkTagOrchestrator;
use crate::cache::RepositoryStateCache;
use crate::error::AppError;
use crate::gateway::SharedGateway;
use crate::model::RepoKey;
use crate::prefs::{AdvancedSettings, PreferenceStore};
use crate::view::{self, DashboardView, Notice, NoticeKind, Session};

/// Everything the user can ask for. Repository-scoped intents carry the stable key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    RefreshAll,
    RefreshBranches { repo: RepoKey, force: bool },
    SelectBranch { repo: RepoKey, branch: String },
    ViewCommits { repo: RepoKey, branch: String, limit: u32 },
    HideCommits { repo: RepoKey },
    CheckBranches { branch: String, tag: String },
    ExecuteBulkTag,
    ResetBulkTag,
    UpdateSettings(AdvancedSettings),
    ResetPreferences,
    Shutdown,
}

/// Sends projections to whoever renders them.
pub trait ViewSink {
    fn publish(&self, view: DashboardView);
}

impl ViewSink for Sender<DashboardView> {
    fn publish(&self, view: DashboardView) {
        let _ = self.send(view);
    }
}

/// Single owner of the application state. Intents are handled one at a time; the
/// fan-outs inside a handler are joined before the handler returns.
pub struct Controller<S: ViewSink> {
    gateway: SharedGateway,
    cache: RepositoryStateCache,
    bulk: BulkTagOrchestrator,
    prefs: PreferenceStore,
    session: Session,
    sink: S,
    refresh_delay: Duration,
    refresh_due: Option<Instant>,
    next_notice: u64,
}

impl<S: ViewSink> Controller<S> {
    pub fn new(
        gateway: SharedGateway,
        prefs: PreferenceStore,
        sink: S,
        refresh_delay: Duration,
    ) -> Self {
        Self {
            gateway,
            cache: RepositoryStateCache::new(),
            bulk: BulkTagOrchestrator::new(),
            prefs,
            session: Session::default(),
            sink,
            refresh_delay,
            refresh_due: None,
            next_notice: 0,
        }
    }

    pub fn view(&self) -> DashboardView {
        view::project(&self.cache, &self.bulk, &self.prefs, &self.session)
    }

    /// Intent loop. Returns when `Shutdown` arrives or every sender is gone. A pending
    /// post-tag refresh fires when its deadline passes with no intent in between.
    pub fn run(mut self, intents: Receiver<Intent>) {
        self.publish();
        loop {
            let intent = match self.refresh_due {
                Some(due) => {
                    let wait = due.saturating_duration_since(Instant::now());
                    match intents.recv_timeout(wait) {
                        Ok(intent) => intent,
                        Err(RecvTimeoutError::Timeout) => {
                            self.fire_scheduled_refresh();
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match intents.recv() {
                    Ok(intent) => intent,
                    Err(_) => break,
                },
            };
            if self.dispatch(intent).is_break() {
                break;
            }
        }
        info!(target: "tagfleet::controller", "controller stopped");
    }

    pub fn fire_scheduled_refresh(&mut self) {
        self.refresh_due = None;
        self.session.refresh_scheduled = false;
        debug!(target: "tagfleet::controller", "running scheduled refresh");
        self.refresh_all();
    }

    pub fn dispatch(&mut self, intent: Intent) -> ControlFlow<()> {
        debug!(target: "tagfleet::controller", ?intent, "dispatch");
        match intent {
            Intent::RefreshAll => self.refresh_all(),
            Intent::RefreshBranches { repo, force } => self.refresh_branches(&repo, force),
            Intent::SelectBranch { repo, branch } => self.select_branch(&repo, &branch),
            Intent::ViewCommits {
                repo,
                branch,
                limit,
            } => self.view_commits(&repo, &branch, limit),
            Intent::HideCommits { repo } => {
                self.cache.clear_commits(&repo);
                self.publish();
            }
            Intent::CheckBranches { branch, tag } => self.check_branches(&branch, &tag),
            Intent::ExecuteBulkTag => self.execute_bulk_tag(),
            Intent::ResetBulkTag => {
                self.bulk.reset();
                self.publish();
            }
            Intent::UpdateSettings(settings) => {
                self.prefs.set_advanced_settings(settings);
                self.publish();
            }
            Intent::ResetPreferences => {
                self.prefs.clear();
                self.notify(NoticeKind::Success, "Preferences reset", "Defaults restored.");
            }
            Intent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn publish(&self) {
        self.sink.publish(self.view());
    }

    fn notify(&mut self, kind: NoticeKind, title: &str, message: &str) {
        self.next_notice += 1;
        self.session.notice = Some(Notice {
            id: self.next_notice,
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
        self.publish();
    }

    fn refresh_all(&mut self) {
        self.session.loading = true;
        self.session.load_error = None;
        self.publish();

        let Self {
            gateway,
            cache,
            bulk,
            prefs,
            session,
            sink,
            ..
        } = self;

        let loaded = cache.refresh_all(gateway, &mut |cache| {
            session.loading = false;
            sink.publish(view::project(cache, bulk, prefs, session));
        });
        if let Err(err) = loaded {
            error!(target: "tagfleet::controller", error = %err, "initial load failed");
            session.loading = false;
            session.load_error = Some(err.to_string());
            sink.publish(view::project(cache, bulk, prefs, session));
            return;
        }

        let settings = prefs.advanced_settings();
        if settings.auto_fetch_commits {
            let selections = &*prefs;
            cache.auto_fetch_commits(
                gateway,
                settings.default_commit_limit,
                &|key| selections.selected_branch(key),
                &mut |cache| sink.publish(view::project(cache, bulk, selections, session)),
            );
        }
    }

    fn refresh_branches(&mut self, repo: &RepoKey, force: bool) {
        let Self {
            gateway,
            cache,
            bulk,
            prefs,
            session,
            sink,
            ..
        } = self;
        let result = cache.refresh_branches(gateway, repo, force, &mut |cache| {
            sink.publish(view::project(cache, bulk, prefs, session))
        });
        if let Err(err) = result {
            warn!(target: "tagfleet::controller", repo = %repo.repo, error = %err, "branch refresh rejected");
            self.notify(NoticeKind::Error, "Branches unavailable", &err.to_string());
        }
    }

    fn select_branch(&mut self, repo: &RepoKey, branch: &str) {
        let branch = branch.trim();
        if branch.is_empty() {
            return;
        }
        self.prefs.set_selected_branch(repo, branch);
        let showing_commits =
            self.cache.commits_state(repo).is_some() || self.cache.commit_error(repo).is_some();
        if showing_commits {
            let limit = self.prefs.advanced_settings().default_commit_limit;
            self.view_commits(repo, branch, limit);
        } else {
            self.publish();
        }
    }

    fn view_commits(&mut self, repo: &RepoKey, branch: &str, limit: u32) {
        let limit = if limit == 0 {
            self.prefs.advanced_settings().default_commit_limit
        } else {
            limit
        };
        let Self {
            gateway,
            cache,
            bulk,
            prefs,
            session,
            sink,
            ..
        } = self;
        let result = cache.load_commits(gateway, repo, branch, limit, &mut |cache| {
            sink.publish(view::project(cache, bulk, prefs, session))
        });
        if let Err(err @ AppError::Validation(_)) = result {
            self.notify(NoticeKind::Error, "Commits unavailable", &err.to_string());
        }
    }

    fn check_branches(&mut self, branch: &str, tag: &str) {
        if !branch.trim().is_empty() {
            self.prefs.set_bulk_tag_branch(branch.trim());
        }
        let Self {
            gateway,
            cache,
            bulk,
            prefs,
            session,
            sink,
            ..
        } = self;
        let result = bulk.check(gateway, cache, branch, tag, &mut |bulk| {
            sink.publish(view::project(cache, bulk, prefs, session))
        });
        match result {
            Ok(0) => self.notify(
                NoticeKind::Error,
                "Nothing to tag",
                &format!("No repository has branch {}.", branch.trim()),
            ),
            Ok(_) => self.publish(),
            Err(err) => self.notify(NoticeKind::Error, "Cannot check branches", &err.to_string()),
        }
    }

    fn execute_bulk_tag(&mut self) {
        let Self {
            gateway,
            cache,
            bulk,
            prefs,
            session,
            sink,
            ..
        } = self;
        let result = bulk.execute(gateway, &mut |bulk| {
            sink.publish(view::project(cache, bulk, prefs, session))
        });
        match result {
            Ok(summary) => {
                if summary.needs_refresh() {
                    self.refresh_due = Some(Instant::now() + self.refresh_delay);
                    self.session.refresh_scheduled = true;
                }
                let kind = if summary.fail_count == 0 {
                    NoticeKind::Success
                } else {
                    NoticeKind::Error
                };
                self.notify(
                    kind,
                    "Bulk tag finished",
                    &format!(
                        "{} tagged with {}: {} succeeded, {} failed.",
                        summary.branch, summary.tag, summary.success_count, summary.fail_count
                    ),
                );
            }
            Err(err) => self.notify(NoticeKind::Error, "Bulk tag failed", &err.to_string()),
        }
    }
}

/// UI-side end of the controller thread.
pub struct ControllerHandle {
    intents: Sender<Intent>,
    views: Receiver<DashboardView>,
}

impl ControllerHandle {
    pub fn spawn(gateway: SharedGateway, prefs: PreferenceStore, refresh_delay: Duration) -> Self {
        let (intent_tx, intent_rx) = mpsc::channel::<Intent>();
        let (view_tx, view_rx) = mpsc::channel::<DashboardView>();
        let spawned = thread::Builder::new()
            .name("tagfleet-controller".to_string())
            .spawn(move || {
                Controller::new(gateway, prefs, view_tx, refresh_delay).run(intent_rx);
            });
        if let Err(err) = spawned {
            error!(target: "tagfleet::controller", error = %err, "failed to start controller thread");
        }
        Self {
            intents: intent_tx,
            views: view_rx,
        }
    }

    pub fn send(&self, intent: Intent) {
        if self.intents.send(intent).is_err() {
            warn!(target: "tagfleet::controller", "controller is gone; intent dropped");
        }
    }

    /// Most recent projection published since the last call, if any.
    pub fn latest_view(&self) -> Option<DashboardView> {
        self.views.try_iter().last()
    }
}

/// In-flight requests are not awaited; the worker exits after its current intent.
impl Drop for ControllerHandle {
    fn drop(&mut self) {
        let _ = self.intents.send(Intent::Shutdown);
    }
}
