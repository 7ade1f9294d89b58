use eframe::egui::{self, RichText, Ui};

use crate::controller::Intent;
use crate::prefs::AdvancedSettings;
use crate::ui::theme::Theme;

const MAX_COMMIT_LIMIT: u32 = 100;

pub struct SettingsPanel {
    theme: Theme,
    confirm_reset: bool,
}

impl SettingsPanel {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            confirm_reset: false,
        }
    }

    pub fn ui(&mut self, ui: &mut Ui, current: AdvancedSettings, server_url: &str, intents: &mut Vec<Intent>) {
        ui.heading(RichText::new("Settings").color(self.theme.palette.text_primary));
        ui.label(
            RichText::new(format!("Connected to {server_url}"))
                .color(self.theme.palette.text_secondary)
                .small(),
        );
        ui.add_space(self.theme.spacing.md);

        let mut edited = current;
        self.theme.card_frame().show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new("Commits").color(self.theme.palette.text_primary));
            ui.checkbox(
                &mut edited.auto_fetch_commits,
                "Load commits for every repository after a refresh",
            );
            ui.horizontal(|ui| {
                ui.label(RichText::new("Commits per repository").color(self.theme.palette.text_secondary));
                ui.add(
                    egui::DragValue::new(&mut edited.default_commit_limit)
                        .clamp_range(1..=MAX_COMMIT_LIMIT)
                        .speed(1),
                );
            });
        });
        if edited != current {
            intents.push(Intent::UpdateSettings(edited.sanitized()));
        }

        ui.add_space(self.theme.spacing.md);
        ui.horizontal(|ui| {
            if self.confirm_reset {
                ui.label("Forget branch selections and settings?");
                if ui.button("Reset").clicked() {
                    intents.push(Intent::ResetPreferences);
                    self.confirm_reset = false;
                }
                if ui.button("Cancel").clicked() {
                    self.confirm_reset = false;
                }
            } else if ui.button("Reset preferences").clicked() {
                self.confirm_reset = true;
            }
        });
    }
}
