use egui::{Color32, FontId, Rounding, Stroke, Visuals};

use week_planner::model::{SourceKind, Task};

// ── Palette ──────────────────────────────────────────────────────────────────

pub const BG_DARK: Color32 = Color32::from_rgb(24, 24, 32);
pub const BG_PANEL: Color32 = Color32::from_rgb(30, 30, 40);
pub const BG_HEADER: Color32 = Color32::from_rgb(34, 37, 48);
pub const BG_TODAY: Color32 = Color32::from_rgba_premultiplied(80, 140, 220, 22);
pub const BG_DROP_TARGET: Color32 = Color32::from_rgba_premultiplied(80, 140, 220, 45);
pub const BG_SELECTED: Color32 = Color32::from_rgba_premultiplied(80, 140, 220, 45);
pub const BG_STATUS: Color32 = Color32::from_rgb(22, 22, 30);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(50, 52, 64);
pub const BORDER_ACCENT: Color32 = Color32::from_rgb(90, 140, 220);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(230, 232, 240);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(155, 160, 178);
pub const TEXT_DIM: Color32 = Color32::from_rgb(100, 105, 120);
pub const TEXT_ON_BAR: Color32 = Color32::from_rgb(255, 255, 255);
pub const TEXT_ERROR: Color32 = Color32::from_rgb(240, 110, 100);

pub const ACCENT: Color32 = Color32::from_rgb(80, 140, 220);
pub const TODAY_LINE: Color32 = Color32::from_rgb(240, 75, 75);
pub const GRID_LINE: Color32 = Color32::from_rgb(44, 46, 58);

pub const CONTENT_ITEM_COLOR: Color32 = Color32::from_rgb(66, 133, 244);
pub const GENERIC_TASK_COLOR: Color32 = Color32::from_rgb(52, 168, 83);
pub const TEAM_POOL_COLOR: Color32 = Color32::from_rgb(120, 124, 140);

// ── Sizes ────────────────────────────────────────────────────────────────────

pub const ROW_HEIGHT: f32 = 26.0;
pub const ROW_GAP: f32 = 2.0;
pub const HEADER_HEIGHT: f32 = 44.0;
pub const LANE_LABEL_WIDTH: f32 = 120.0;
pub const LANE_PADDING: f32 = 6.0;
pub const MIN_DAY_WIDTH: f32 = 90.0;
pub const BAR_ROUNDING: f32 = 5.0;
pub const BAR_INSET: f32 = 3.0;
pub const STATUS_BAR_HEIGHT: f32 = 24.0;
pub const SIDE_PANEL_WIDTH: f32 = 260.0;

// ── Fonts ────────────────────────────────────────────────────────────────────

pub fn font_header() -> FontId {
    FontId::proportional(12.0)
}

pub fn font_sub() -> FontId {
    FontId::proportional(10.5)
}

pub fn font_bar() -> FontId {
    FontId::proportional(11.5)
}

pub fn font_status() -> FontId {
    FontId::proportional(11.0)
}

// ── Task colors ──────────────────────────────────────────────────────────────

pub fn task_color(task: &Task) -> Color32 {
    if task.is_team_pool {
        return TEAM_POOL_COLOR;
    }
    match task.kind {
        SourceKind::ContentItem => CONTENT_ITEM_COLOR,
        SourceKind::GenericTask => GENERIC_TASK_COLOR,
    }
}

pub fn task_icon(task: &Task) -> &'static str {
    if task.is_team_pool {
        return egui_phosphor::regular::USERS_THREE;
    }
    match task.kind {
        SourceKind::ContentItem => egui_phosphor::regular::FILE_TEXT,
        SourceKind::GenericTask => egui_phosphor::regular::CHECK_SQUARE,
    }
}

/// Corner radii for a bar: only the ends that are actually inside the week
/// get rounded.
pub fn bar_rounding(start_cap: bool, end_cap: bool) -> Rounding {
    let start = if start_cap { BAR_ROUNDING } else { 0.0 };
    let end = if end_cap { BAR_ROUNDING } else { 0.0 };
    Rounding {
        nw: start,
        sw: start,
        ne: end,
        se: end,
    }
}

// ── Apply custom visuals ─────────────────────────────────────────────────────

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();

    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;
    visuals.extreme_bg_color = Color32::from_rgb(20, 20, 28);

    visuals.widgets.noninteractive.bg_fill = BG_PANEL;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, TEXT_SECONDARY);
    visuals.widgets.noninteractive.rounding = Rounding::same(4.0);

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(42, 44, 56);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
    visuals.widgets.inactive.rounding = Rounding::same(4.0);

    visuals.widgets.hovered.bg_fill = Color32::from_rgb(52, 54, 68);
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT);
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
    visuals.widgets.hovered.rounding = Rounding::same(4.0);

    visuals.widgets.active.bg_fill = Color32::from_rgb(60, 62, 76);
    visuals.widgets.active.bg_stroke = Stroke::new(1.0, ACCENT);
    visuals.widgets.active.fg_stroke = Stroke::new(2.0, Color32::WHITE);
    visuals.widgets.active.rounding = Rounding::same(4.0);

    visuals.selection.bg_fill = BG_SELECTED;
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);

    visuals.window_rounding = Rounding::same(8.0);
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.striped = false;
    visuals.faint_bg_color = BG_PANEL;

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 4.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);
    ctx.set_style(style);
}
