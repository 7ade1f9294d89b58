use std::time::{Duration, Instant};

use eframe::egui::{self, Color32};

use crate::ui::theme::Theme;
use crate::view::{Notice, NoticeKind};

#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NoticeKind,
    created_at: Instant,
    duration: Duration,
}

impl Notification {
    pub fn from_notice(notice: &Notice) -> Self {
        let duration = match notice.kind {
            NoticeKind::Success => Duration::from_secs(6),
            NoticeKind::Error => Duration::from_secs(12),
        };
        Self {
            title: notice.title.clone(),
            message: notice.message.clone(),
            kind: notice.kind,
            created_at: Instant::now(),
            duration,
        }
    }
}

/// Toast stack. Each controller notice is shown once, keyed by its id.
#[derive(Default)]
pub struct NotificationCenter {
    queue: Vec<Notification>,
    last_seen: u64,
}

impl NotificationCenter {
    pub fn observe(&mut self, notice: Option<&Notice>) {
        if let Some(notice) = notice {
            if notice.id > self.last_seen {
                self.last_seen = notice.id;
                self.queue.push(Notification::from_notice(notice));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn show(&mut self, ctx: &egui::Context, theme: &Theme) {
        let now = Instant::now();
        self.queue
            .retain(|n| now.duration_since(n.created_at) < n.duration);

        for (idx, notification) in self.queue.iter_mut().enumerate() {
            let offset = egui::vec2(-12.0, 12.0 + idx as f32 * 96.0);
            egui::Area::new(format!("toast-{}", idx).into())
                .anchor(egui::Align2::RIGHT_TOP, offset)
                .show(ctx, |ui| {
                    ui.set_max_width(340.0);
                    let text_color = Color32::WHITE;
                    egui::Frame::default()
                        .fill(theme.palette.toast_fill(notification.kind))
                        .rounding(egui::Rounding::same(8.0))
                        .outer_margin(egui::Margin::same(4.0))
                        .inner_margin(egui::Margin::symmetric(12.0, 10.0))
                        .show(ui, |ui| {
                            ui.horizontal(|ui| {
                                ui.strong(
                                    egui::RichText::new(&notification.title).color(text_color),
                                );
                                ui.with_layout(
                                    egui::Layout::right_to_left(egui::Align::Center),
                                    |ui| {
                                        if ui.small_button("Dismiss").clicked() {
                                            notification.duration = Duration::from_secs(0);
                                        }
                                    },
                                );
                            });
                            ui.label(
                                egui::RichText::new(&notification.message)
                                    .color(text_color)
                                    .small(),
                            );
                        });
                });
        }
    }
}
