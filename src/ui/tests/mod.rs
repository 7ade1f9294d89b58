use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use eframe::egui;

use crate::bulk::BulkPhase;
use crate::controller::{ControllerHandle, Intent};
use crate::gateway::SharedGateway;
use crate::model::{BranchCheckResult, RepoKey};
use crate::prefs::{AdvancedSettings, PreferenceStore};
use crate::testing::{MockGateway, commit, tag};
use crate::ui::app::TagFleetApp;
use crate::ui::theme::Theme;
use crate::ui::{
    bulk_tag::BulkTagPanel, notifications::NotificationCenter, repo_cards::RepoCardsPanel,
    settings::SettingsPanel,
};
use crate::view::{
    BranchPill, BulkPanelView, BulkSummaryView, CommitPanel, DashboardView, Notice, NoticeKind,
    RepoCard, SummaryLine,
};

fn sample_view() -> DashboardView {
    let card = |repo: &str, pill: BranchPill, commits: CommitPanel| RepoCard {
        key: RepoKey::new(repo, "platform"),
        name: repo.to_string(),
        tags: vec![tag("v1.1.0", "abcdef0123"), tag("v1.0.0", "0123abcdef")],
        latest_tag: Some("v1.1.0".to_string()),
        branch_pill: pill,
        branch_options: vec!["dev".to_string(), "main".to_string()],
        selected_branch: "dev".to_string(),
        commits,
    };

    DashboardView {
        loading: false,
        load_error: None,
        repos: vec![
            card(
                "svc-a",
                BranchPill::Ready(2),
                CommitPanel::Loaded {
                    branch: "dev".to_string(),
                    commits: vec![commit("1111111aaaa", "init")],
                },
            ),
            card("svc-b", BranchPill::Loading, CommitPanel::Loading {
                branch: "dev".to_string(),
            }),
            card(
                "svc-c",
                BranchPill::Unavailable("auth failed".to_string()),
                CommitPanel::Failed("HTTP 500".to_string()),
            ),
        ],
        bulk: BulkPanelView {
            phase: BulkPhase::Completed,
            branch: "release".to_string(),
            tag: "v2.0.0".to_string(),
            checks: vec![BranchCheckResult {
                name: "svc-a".to_string(),
                repo: "svc-a".to_string(),
                project: "platform".to_string(),
                has_branch: true,
                base_url: "https://dev.azure.com".to_string(),
                error: None,
            }],
            eligible_count: 1,
            error: None,
            summary: Some(BulkSummaryView {
                branch: "release".to_string(),
                tag: "v2.0.0".to_string(),
                success_count: 1,
                fail_count: 0,
                lines: vec![SummaryLine {
                    repo: "svc-a".to_string(),
                    success: true,
                    text: "tagged".to_string(),
                }],
                completed_at: Utc::now(),
            }),
        },
        bulk_branch_default: "release".to_string(),
        settings: AdvancedSettings::default(),
        notice: Some(Notice {
            id: 1,
            kind: NoticeKind::Success,
            title: "Bulk tag finished".to_string(),
            message: "1 succeeded".to_string(),
        }),
        refresh_scheduled: true,
    }
}

#[test]
fn panels_render_without_panic() {
    let theme = Theme::dark();
    let view = sample_view();
    let mut cards = RepoCardsPanel::new(theme.clone());
    let mut bulk = BulkTagPanel::new(theme.clone());
    let mut settings = SettingsPanel::new(theme.clone());
    let mut notifications = NotificationCenter::default();
    notifications.observe(view.notice.as_ref());
    let mut intents: Vec<Intent> = Vec::new();

    let output = egui::Context::default().run(Default::default(), |ctx| {
        theme.apply(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            cards.ui(ui, &view.repos, 10, &mut intents);
            bulk.ui(ui, &view.bulk, &view.bulk_branch_default, &mut intents);
            settings.ui(ui, view.settings, "http://localhost:8000", &mut intents);
        });
        notifications.show(ctx, &theme);
    });

    assert!(!output.shapes.is_empty());
    assert!(intents.is_empty());
}

#[test]
fn app_renders_controller_views() {
    let gateway: SharedGateway = Arc::new(MockGateway::with_repositories(&["svc-a", "svc-b"]));
    let controller =
        ControllerHandle::spawn(gateway, PreferenceStore::in_memory(), Duration::from_millis(10));
    controller.send(Intent::RefreshAll);
    let mut app = TagFleetApp::new(controller, "http://localhost:8000".to_string());

    let ctx = egui::Context::default();
    for _ in 0..3 {
        let output = ctx.run(Default::default(), |ctx| {
            let intents = app.render(ctx);
            assert!(intents.is_empty());
        });
        assert!(output.textures_delta.free.is_empty());
    }
}
