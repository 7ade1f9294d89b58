use eframe::egui::{self, RichText, Ui};

use crate::controller::Intent;
use crate::ui::theme::Theme;
use crate::view::{BranchPill, CommitPanel, RepoCard};

const VISIBLE_TAGS: usize = 8;

pub struct RepoCardsPanel {
    theme: Theme,
    filter: String,
}

impl RepoCardsPanel {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            filter: String::new(),
        }
    }

    pub fn ui(&mut self, ui: &mut Ui, cards: &[RepoCard], commit_limit: u32, intents: &mut Vec<Intent>) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Filter").color(self.theme.palette.text_secondary));
            ui.add(egui::TextEdit::singleline(&mut self.filter).hint_text("repository name"));
            ui.label(
                RichText::new(format!("{} repositories", cards.len()))
                    .color(self.theme.palette.text_secondary)
                    .small(),
            );
        });
        ui.add_space(self.theme.spacing.sm);

        let needle = self.filter.trim().to_lowercase();
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for card in cards
                    .iter()
                    .filter(|card| needle.is_empty() || card.name.to_lowercase().contains(&needle))
                {
                    self.card(ui, card, commit_limit, intents);
                    ui.add_space(self.theme.spacing.sm);
                }
            });
    }

    fn card(&self, ui: &mut Ui, card: &RepoCard, commit_limit: u32, intents: &mut Vec<Intent>) {
        let palette = &self.theme.palette;
        self.theme.card_frame().show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(&card.name)
                        .text_style(egui::TextStyle::Name("Title".into()))
                        .color(palette.text_primary),
                );
                if card.key.project != card.key.repo {
                    ui.label(
                        RichText::new(&card.key.project)
                            .color(palette.text_secondary)
                            .small(),
                    );
                }
                if let Some(latest) = &card.latest_tag {
                    ui.label(RichText::new(format!("latest {latest}")).color(palette.accent));
                }
            });

            self.tags_row(ui, card);
            ui.add_space(self.theme.spacing.xs);
            self.branch_row(ui, card, commit_limit, intents);
            self.commits(ui, card);
        });
    }

    fn tags_row(&self, ui: &mut Ui, card: &RepoCard) {
        let palette = &self.theme.palette;
        if card.tags.is_empty() {
            ui.label(RichText::new("No tags").color(palette.text_secondary).small());
            return;
        }
        ui.horizontal_wrapped(|ui| {
            for tag in card.tags.iter().take(VISIBLE_TAGS) {
                ui.label(RichText::new(&tag.name).monospace().color(palette.accent_weak))
                    .on_hover_text(&tag.commit);
            }
            if card.tags.len() > VISIBLE_TAGS {
                ui.label(
                    RichText::new(format!("+{} more", card.tags.len() - VISIBLE_TAGS))
                        .color(palette.text_secondary)
                        .small(),
                );
            }
        });
    }

    fn branch_row(&self, ui: &mut Ui, card: &RepoCard, commit_limit: u32, intents: &mut Vec<Intent>) {
        let palette = &self.theme.palette;
        ui.horizontal(|ui| {
            match &card.branch_pill {
                BranchPill::Loading => {
                    ui.spinner();
                    ui.label(RichText::new("loading branches").color(palette.text_secondary).small());
                }
                BranchPill::Ready(count) => {
                    ui.label(
                        RichText::new(format!("{count} branches"))
                            .color(palette.success)
                            .small(),
                    );
                }
                BranchPill::Unavailable(error) => {
                    ui.label(RichText::new("branches unavailable").color(palette.danger).small())
                        .on_hover_text(error);
                }
            }

            let mut selected = card.selected_branch.clone();
            egui::ComboBox::from_id_source(("branch", &card.key))
                .selected_text(&selected)
                .show_ui(ui, |ui| {
                    for branch in &card.branch_options {
                        ui.selectable_value(&mut selected, branch.clone(), branch);
                    }
                });
            if selected != card.selected_branch {
                intents.push(Intent::SelectBranch {
                    repo: card.key.clone(),
                    branch: selected,
                });
            }

            if ui.small_button("⟳").on_hover_text("Reload branches").clicked() {
                intents.push(Intent::RefreshBranches {
                    repo: card.key.clone(),
                    force: true,
                });
            }

            let open = !matches!(card.commits, CommitPanel::Hidden);
            let label = if open { "Hide commits" } else { "View commits" };
            if ui.button(label).clicked() {
                intents.push(if open {
                    Intent::HideCommits {
                        repo: card.key.clone(),
                    }
                } else {
                    Intent::ViewCommits {
                        repo: card.key.clone(),
                        branch: card.selected_branch.clone(),
                        limit: commit_limit,
                    }
                });
            }
        });
    }

    fn commits(&self, ui: &mut Ui, card: &RepoCard) {
        let palette = &self.theme.palette;
        match &card.commits {
            CommitPanel::Hidden => {}
            CommitPanel::Loading { branch } => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new(format!("Loading commits on {branch}")).color(palette.text_secondary));
                });
            }
            CommitPanel::Failed(error) => {
                ui.colored_label(palette.danger, format!("Could not load commits: {error}"));
            }
            CommitPanel::Loaded { branch, commits } => {
                ui.add_space(self.theme.spacing.xs);
                ui.label(
                    RichText::new(format!("{} commits on {branch}", commits.len()))
                        .color(palette.text_secondary)
                        .small(),
                );
                egui::Grid::new(("commits", &card.key))
                    .striped(true)
                    .num_columns(4)
                    .show(ui, |ui| {
                        for commit in commits {
                            ui.label(RichText::new(&commit.short_hash).monospace().color(palette.accent));
                            let subject = ui.label(&commit.subject);
                            if let Some(body) = commit.body.as_deref().filter(|body| !body.trim().is_empty()) {
                                subject.on_hover_text(body);
                            }
                            ui.label(RichText::new(&commit.author).color(palette.text_secondary))
                                .on_hover_text(&commit.email);
                            ui.label(RichText::new(&commit.date).color(palette.text_secondary).small());
                            ui.end_row();
                        }
                    });
            }
        }
    }
}
