use egui::{Color32, TextStyle};

use crate::view::NoticeKind;

#[derive(Debug, Clone)]
pub struct Palette {
    pub background: Color32,
    pub surface: Color32,
    pub surface_highlight: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
    pub accent: Color32,
    pub accent_weak: Color32,
    pub success: Color32,
    pub danger: Color32,
}

impl Palette {
    pub fn mocha() -> Self {
        Self {
            background: Color32::from_rgb(0x11, 0x11, 0x1b),
            surface: Color32::from_rgb(0x18, 0x18, 0x25),
            surface_highlight: Color32::from_rgb(0x31, 0x32, 0x44),
            text_primary: Color32::from_rgb(0xcd, 0xd6, 0xf4),
            text_secondary: Color32::from_rgb(0xba, 0xc2, 0xde),
            accent: Color32::from_rgb(0x89, 0xb4, 0xfa),
            accent_weak: Color32::from_rgb(0x74, 0xc7, 0xec),
            success: Color32::from_rgb(0xa6, 0xe3, 0xa1),
            danger: Color32::from_rgb(0xf3, 0x8b, 0xa8),
        }
    }

    pub fn toast_fill(&self, kind: NoticeKind) -> Color32 {
        match kind {
            NoticeKind::Success => Color32::from_rgb(26, 102, 64),
            NoticeKind::Error => Color32::from_rgb(125, 32, 32),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Typography {
    pub heading: f32,
    pub title: f32,
    pub body: f32,
    pub label: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            heading: 24.0,
            title: 18.0,
            body: 15.0,
            label: 13.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Spacing {
    pub xs: f32,
    pub sm: f32,
    pub md: f32,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            xs: 4.0,
            sm: 8.0,
            md: 12.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub palette: Palette,
    pub typography: Typography,
    pub spacing: Spacing,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            palette: Palette::mocha(),
            typography: Typography::default(),
            spacing: Spacing::default(),
        }
    }

    pub fn card_frame(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.palette.surface)
            .stroke(egui::Stroke::new(1.0, self.palette.surface_highlight))
            .rounding(6.0)
            .inner_margin(egui::Margin::same(self.spacing.sm))
    }

    pub fn apply(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();
        visuals.override_text_color = Some(self.palette.text_primary);
        visuals.widgets.noninteractive.bg_fill = self.palette.background;
        visuals.widgets.noninteractive.fg_stroke.color = self.palette.text_secondary;
        visuals.widgets.inactive.bg_fill = self.palette.surface;
        visuals.widgets.inactive.fg_stroke.color = self.palette.text_primary;
        visuals.widgets.hovered.bg_fill = self.palette.surface_highlight;
        visuals.widgets.hovered.fg_stroke.color = self.palette.text_primary;
        visuals.faint_bg_color = self.palette.surface_highlight;
        visuals.extreme_bg_color = self.palette.surface;
        visuals.code_bg_color = self.palette.surface_highlight;
        visuals.window_fill = self.palette.background;
        visuals.panel_fill = self.palette.background;
        visuals.selection.bg_fill = self.palette.accent;
        visuals.selection.stroke.color = self.palette.accent_weak;
        visuals.hyperlink_color = self.palette.accent;

        ctx.set_visuals(visuals);

        let mut style = (*ctx.style()).clone();
        style.text_styles = [
            (
                TextStyle::Heading,
                egui::FontId::proportional(self.typography.heading),
            ),
            (
                TextStyle::Name("Title".into()),
                egui::FontId::proportional(self.typography.title),
            ),
            (
                TextStyle::Body,
                egui::FontId::proportional(self.typography.body),
            ),
            (
                TextStyle::Button,
                egui::FontId::proportional(self.typography.body),
            ),
            (
                TextStyle::Small,
                egui::FontId::proportional(self.typography.label),
            ),
            (
                TextStyle::Monospace,
                egui::FontId::monospace(self.typography.label),
            ),
        ]
        .into();

        ctx.set_style(style);
    }
}
