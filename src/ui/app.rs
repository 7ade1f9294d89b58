use std::time::Duration;

use eframe::egui::{self, RichText};

use crate::controller::{ControllerHandle, Intent};
use crate::ui::{
    bulk_tag::BulkTagPanel, notifications::NotificationCenter, repo_cards::RepoCardsPanel,
    settings::SettingsPanel, theme::Theme,
};
use crate::view::{BranchPill, CommitPanel, DashboardView};

const BUSY_REPAINT: Duration = Duration::from_millis(100);
const IDLE_REPAINT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainTab {
    Repositories,
    BulkTag,
    Settings,
}

impl MainTab {
    pub const ALL: [MainTab; 3] = [MainTab::Repositories, MainTab::BulkTag, MainTab::Settings];

    fn label(self) -> &'static str {
        match self {
            MainTab::Repositories => "Repositories",
            MainTab::BulkTag => "Bulk tag",
            MainTab::Settings => "Settings",
        }
    }
}

pub struct TagFleetApp {
    theme: Theme,
    initialized: bool,
    active_tab: MainTab,
    controller: ControllerHandle,
    server_url: String,
    view: DashboardView,
    repo_cards: RepoCardsPanel,
    bulk_panel: BulkTagPanel,
    settings_panel: SettingsPanel,
    notifications: NotificationCenter,
}

impl TagFleetApp {
    pub fn new(controller: ControllerHandle, server_url: String) -> Self {
        let theme = Theme::dark();
        Self {
            repo_cards: RepoCardsPanel::new(theme.clone()),
            bulk_panel: BulkTagPanel::new(theme.clone()),
            settings_panel: SettingsPanel::new(theme.clone()),
            notifications: NotificationCenter::default(),
            view: DashboardView::default(),
            active_tab: MainTab::Repositories,
            initialized: false,
            controller,
            server_url,
            theme,
        }
    }

    fn initialize_if_needed(&mut self, ctx: &egui::Context) {
        if !self.initialized {
            self.theme.apply(ctx);
            self.initialized = true;
        }
    }

    fn pull_view(&mut self) {
        if let Some(view) = self.controller.latest_view() {
            self.notifications.observe(view.notice.as_ref());
            self.view = view;
        }
    }

    /// Renders one frame and returns what the user asked for.
    pub fn render(&mut self, ctx: &egui::Context) -> Vec<Intent> {
        let mut intents = Vec::new();
        let palette = self.theme.palette.clone();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(RichText::new("TagFleet").color(palette.accent));
                ui.add_space(self.theme.spacing.md);
                for tab in MainTab::ALL {
                    ui.selectable_value(&mut self.active_tab, tab, tab.label());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add_enabled(!self.view.loading, egui::Button::new("Refresh"))
                        .clicked()
                    {
                        intents.push(Intent::RefreshAll);
                    }
                    if self.view.loading {
                        ui.spinner();
                    } else if self.view.refresh_scheduled {
                        ui.label(
                            RichText::new("refresh pending")
                                .small()
                                .color(palette.text_secondary),
                        );
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(error) = &self.view.load_error {
                ui.vertical_centered(|ui| {
                    ui.add_space(self.theme.spacing.md * 4.0);
                    ui.heading(RichText::new("Could not load the dashboard").color(palette.danger));
                    ui.label(RichText::new(error).color(palette.text_secondary));
                    ui.add_space(self.theme.spacing.md);
                    if ui.button("Retry").clicked() {
                        intents.push(Intent::RefreshAll);
                    }
                });
                return;
            }
            match self.active_tab {
                MainTab::Repositories => {
                    if self.view.repos.is_empty() && self.view.loading {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Loading repositories");
                        });
                    } else {
                        self.repo_cards.ui(
                            ui,
                            &self.view.repos,
                            self.view.settings.default_commit_limit,
                            &mut intents,
                        );
                    }
                }
                MainTab::BulkTag => self.bulk_panel.ui(
                    ui,
                    &self.view.bulk,
                    &self.view.bulk_branch_default,
                    &mut intents,
                ),
                MainTab::Settings => self.settings_panel.ui(
                    ui,
                    self.view.settings,
                    &self.server_url,
                    &mut intents,
                ),
            }
        });

        self.notifications.show(ctx, &self.theme);
        intents
    }

    fn busy(&self) -> bool {
        self.view.loading
            || self.view.refresh_scheduled
            || !self.notifications.is_empty()
            || self.view.repos.iter().any(|card| {
                card.branch_pill == BranchPill::Loading
                    || matches!(card.commits, CommitPanel::Loading { .. })
            })
    }
}

impl eframe::App for TagFleetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.initialize_if_needed(ctx);
        self.pull_view();

        for intent in self.render(ctx) {
            self.controller.send(intent);
        }

        ctx.request_repaint_after(if self.busy() { BUSY_REPAINT } else { IDLE_REPAINT });
    }
}
