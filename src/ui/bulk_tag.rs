use chrono::Local;
use eframe::egui::{self, RichText, Ui};

use crate::bulk::BulkPhase;
use crate::controller::Intent;
use crate::ui::theme::Theme;
use crate::view::{BulkPanelView, BulkSummaryView};

/// Branch check, confirmation and result summary for tagging many repositories at once.
pub struct BulkTagPanel {
    theme: Theme,
    branch_input: String,
    tag_input: String,
    branch_seeded: bool,
    confirm_open: bool,
}

impl BulkTagPanel {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            branch_input: String::new(),
            tag_input: String::new(),
            branch_seeded: false,
            confirm_open: false,
        }
    }

    pub fn ui(
        &mut self,
        ui: &mut Ui,
        bulk: &BulkPanelView,
        remembered_branch: &str,
        intents: &mut Vec<Intent>,
    ) {
        if !self.branch_seeded && !remembered_branch.is_empty() {
            self.branch_input = remembered_branch.to_string();
            self.branch_seeded = true;
        }

        ui.heading(RichText::new("Bulk tag").color(self.theme.palette.text_primary));
        ui.label(
            RichText::new("Create the same tag on every repository that has the given branch.")
                .color(self.theme.palette.text_secondary),
        );
        ui.add_space(self.theme.spacing.md);

        self.inputs(ui, bulk, intents);
        if let Some(error) = &bulk.error {
            ui.add_space(self.theme.spacing.xs);
            ui.colored_label(self.theme.palette.danger, error);
        }

        ui.add_space(self.theme.spacing.md);
        match bulk.phase {
            BulkPhase::Idle => {}
            BulkPhase::Checking | BulkPhase::Executing => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(bulk.phase.label());
                });
            }
            BulkPhase::Checked | BulkPhase::Completed => self.checks(ui, bulk),
        }

        if let Some(summary) = &bulk.summary {
            ui.add_space(self.theme.spacing.md);
            self.summary(ui, summary);
        }

        self.confirm_window(ui.ctx(), bulk, intents);
    }

    fn inputs(&mut self, ui: &mut Ui, bulk: &BulkPanelView, intents: &mut Vec<Intent>) {
        let busy = matches!(bulk.phase, BulkPhase::Checking | BulkPhase::Executing);
        self.theme.card_frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Branch").color(self.theme.palette.text_secondary));
                ui.add(egui::TextEdit::singleline(&mut self.branch_input).hint_text("release"));
                ui.label(RichText::new("Tag").color(self.theme.palette.text_secondary));
                ui.add(egui::TextEdit::singleline(&mut self.tag_input).hint_text("v1.4.0"));

                if ui
                    .add_enabled(!busy, egui::Button::new("Check branches"))
                    .clicked()
                {
                    self.confirm_open = false;
                    intents.push(Intent::CheckBranches {
                        branch: self.branch_input.clone(),
                        tag: self.tag_input.clone(),
                    });
                }

                let can_execute = !busy
                    && matches!(bulk.phase, BulkPhase::Checked | BulkPhase::Completed)
                    && bulk.eligible_count > 0;
                if ui
                    .add_enabled(
                        can_execute,
                        egui::Button::new(format!("Tag {} repositories", bulk.eligible_count)),
                    )
                    .clicked()
                {
                    self.confirm_open = true;
                }

                if ui
                    .add_enabled(!busy && bulk.phase != BulkPhase::Idle, egui::Button::new("Reset"))
                    .clicked()
                {
                    self.confirm_open = false;
                    intents.push(Intent::ResetBulkTag);
                }
            });
        });
    }

    fn checks(&self, ui: &mut Ui, bulk: &BulkPanelView) {
        let palette = &self.theme.palette;
        ui.label(
            RichText::new(format!(
                "{} of {} repositories have branch {}",
                bulk.eligible_count,
                bulk.checks.len(),
                bulk.branch
            ))
            .color(palette.text_secondary),
        );
        ui.add_space(self.theme.spacing.xs);
        egui::ScrollArea::vertical()
            .id_source("bulk-checks")
            .max_height(240.0)
            .show(ui, |ui| {
                egui::Grid::new("bulk-check-grid")
                    .striped(true)
                    .num_columns(3)
                    .show(ui, |ui| {
                        for check in &bulk.checks {
                            if check.has_branch {
                                ui.colored_label(palette.success, "✔");
                            } else {
                                ui.colored_label(palette.danger, "✘");
                            }
                            ui.label(&check.name).on_hover_text(check.key().storage_key());
                            match &check.error {
                                Some(error) => {
                                    ui.colored_label(palette.danger, error);
                                }
                                None => {
                                    ui.label(RichText::new(&check.base_url).small().color(palette.text_secondary));
                                }
                            }
                            ui.end_row();
                        }
                    });
            });
    }

    fn summary(&self, ui: &mut Ui, summary: &BulkSummaryView) {
        let palette = &self.theme.palette;
        self.theme.card_frame().show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(
                RichText::new(format!("Tag {} on {}", summary.tag, summary.branch))
                    .text_style(egui::TextStyle::Name("Title".into())),
            );
            ui.horizontal(|ui| {
                ui.colored_label(palette.success, format!("{} succeeded", summary.success_count));
                ui.colored_label(palette.danger, format!("{} failed", summary.fail_count));
                ui.label(
                    RichText::new(
                        summary
                            .completed_at
                            .with_timezone(&Local)
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string(),
                    )
                    .small()
                    .color(palette.text_secondary),
                );
            });
            for line in &summary.lines {
                ui.horizontal(|ui| {
                    let color = if line.success { palette.success } else { palette.danger };
                    ui.colored_label(color, &line.repo);
                    ui.label(RichText::new(&line.text).color(palette.text_secondary));
                });
            }
        });
    }

    fn confirm_window(&mut self, ctx: &egui::Context, bulk: &BulkPanelView, intents: &mut Vec<Intent>) {
        if !self.confirm_open {
            return;
        }
        let mut open = true;
        egui::Window::new("Confirm bulk tag")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .open(&mut open)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Create tag {} from branch {} on {} repositories?",
                    bulk.tag, bulk.branch, bulk.eligible_count
                ));
                ui.add_space(self.theme.spacing.sm);
                ui.horizontal(|ui| {
                    if ui.button("Create tags").clicked() {
                        intents.push(Intent::ExecuteBulkTag);
                        self.confirm_open = false;
                    }
                    if ui.button("Cancel").clicked() {
                        self.confirm_open = false;
                    }
                });
            });
        if !open {
            self.confirm_open = false;
        }
    }
}
