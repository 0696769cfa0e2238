use week_planner::layout::{OwnerLane, Placement};
use week_planner::model::{OwnerId, TaskKey, WeekWindow, DAYS_PER_WEEK};
use crate::ui::theme;
use chrono::{Datelike, NaiveDate};
use egui::{Color32, Id, Pos2, Rect, Sense, Stroke, Ui, Vec2};

const ROW_HEIGHT: f32 = theme::ROW_HEIGHT;
const ROW_GAP: f32 = theme::ROW_GAP;
const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;
const LABEL_WIDTH: f32 = theme::LANE_LABEL_WIDTH;
const LANE_PADDING: f32 = theme::LANE_PADDING;

/// Held in egui temp storage while a bar is being dragged.
#[derive(Debug, Clone)]
struct DragSnapshot {
    key: TaskKey,
    title: String,
    /// Days between the task's start and the column it was grabbed by.
    grab_offset: i64,
}

/// A bar dropped onto a (day, owner) cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRequest {
    pub key: TaskKey,
    pub owner: OwnerId,
    /// New start date, keeping the grab offset.
    pub start: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct GridInteraction {
    pub dropped: Option<DropRequest>,
    /// A bar that cannot be dragged was grabbed.
    pub refused: Option<TaskKey>,
}

/// Geometry shared by everything drawn in one frame.
struct GridGeometry {
    origin: Pos2,
    day_width: f32,
    width: f32,
    lanes: Vec<(Rect, OwnerId)>,
}

impl GridGeometry {
    fn new(origin: Pos2, available_width: f32, lanes: &[OwnerLane<'_>]) -> Self {
        let day_width = ((available_width - LABEL_WIDTH) / DAYS_PER_WEEK as f32).max(theme::MIN_DAY_WIDTH);
        let width = LABEL_WIDTH + day_width * DAYS_PER_WEEK as f32;
        let mut y = origin.y + HEADER_HEIGHT;
        let lanes = lanes
            .iter()
            .map(|lane| {
                let height = lane_height(lane.packed.row_count);
                let rect = Rect::from_min_size(Pos2::new(origin.x, y), Vec2::new(width, height));
                y += height;
                (rect, lane.owner.clone())
            })
            .collect();
        Self {
            origin,
            day_width,
            width,
            lanes,
        }
    }

    fn height(&self) -> f32 {
        self.lanes
            .last()
            .map(|(rect, _)| rect.bottom() - self.origin.y)
            .unwrap_or(HEADER_HEIGHT)
    }

    fn day_x(&self, day: usize) -> f32 {
        self.origin.x + LABEL_WIDTH + day as f32 * self.day_width
    }

    fn cell_at(&self, pos: Pos2) -> Option<(usize, &OwnerId)> {
        let x = pos.x - self.origin.x - LABEL_WIDTH;
        if x < 0.0 {
            return None;
        }
        let day = (x / self.day_width) as usize;
        if day >= DAYS_PER_WEEK {
            return None;
        }
        self.lanes
            .iter()
            .find(|(rect, _)| rect.contains(pos))
            .map(|(_, owner)| (day, owner))
    }

    fn cell_rect(&self, day: usize, lane: &Rect) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.day_x(day), lane.top()),
            Vec2::new(self.day_width, lane.height()),
        )
    }
}

fn lane_height(row_count: usize) -> f32 {
    row_count.max(1) as f32 * (ROW_HEIGHT + ROW_GAP) + LANE_PADDING * 2.0
}

/// Render the packed week: one lane per owner, bars spanning their days.
pub fn show_week_grid(
    lanes: &[OwnerLane<'_>],
    week: &WeekWindow,
    today: NaiveDate,
    selected: &mut Option<TaskKey>,
    ui: &mut Ui,
) -> GridInteraction {
    let mut interaction = GridInteraction::default();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let available = ui.available_size();
            let origin = ui.cursor().min;
            let geometry = GridGeometry::new(origin, available.x, lanes);
            let (response, painter) = ui.allocate_painter(
                Vec2::new(geometry.width, geometry.height().max(available.y)),
                Sense::click(),
            );
            let mut consumed_click = false;

            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);
            draw_day_columns(&painter, &geometry, week, today, response.rect.bottom());
            draw_header(&painter, &geometry, week, today);

            let dragging = ui.ctx().data_mut(|data| data.get_temp::<DragSnapshot>(drag_id()));
            let pointer = ui.ctx().pointer_interact_pos();

            for (lane, (lane_rect, owner)) in lanes.iter().zip(geometry.lanes.iter()) {
                draw_lane_background(&painter, &geometry, lane_rect, owner);

                if let (Some(_), Some(pos)) = (&dragging, pointer) {
                    if let Some((day, hovered_owner)) = geometry.cell_at(pos) {
                        if hovered_owner == owner {
                            painter.rect_filled(
                                geometry.cell_rect(day, lane_rect),
                                0.0,
                                theme::BG_DROP_TARGET,
                            );
                        }
                    }
                }

                for placement in &lane.packed.placements {
                    let bar_rect = bar_rect(&geometry, lane_rect, placement);
                    let is_selected = selected.as_ref().is_some_and(|key| placement.task.has_key(key));
                    let is_dragged = dragging
                        .as_ref()
                        .is_some_and(|d| placement.task.has_key(&d.key));
                    draw_bar(&painter, placement, bar_rect, is_selected, is_dragged);

                    let bar_response = ui.interact(
                        bar_rect,
                        ui.make_persistent_id((
                            "week-bar",
                            owner.as_str(),
                            placement.task.kind.table(),
                            placement.task.id.as_str(),
                        )),
                        Sense::click_and_drag(),
                    );

                    if bar_response.clicked() {
                        *selected = Some(placement.task.key());
                        consumed_click = true;
                    }

                    if bar_response.drag_started() {
                        consumed_click = true;
                        *selected = Some(placement.task.key());
                        if placement.task.is_individually_draggable() {
                            let grabbed_day = bar_response
                                .interact_pointer_pos()
                                .and_then(|p| geometry.cell_at(p))
                                .map(|(day, _)| day)
                                .unwrap_or(placement.first_day);
                            let grab_offset = placement
                                .task
                                .span
                                .map(|span| (week.day(grabbed_day) - span.start).num_days())
                                .unwrap_or(0);
                            ui.ctx().data_mut(|data| {
                                data.insert_temp(
                                    drag_id(),
                                    DragSnapshot {
                                        key: placement.task.key(),
                                        title: placement.task.title.clone(),
                                        grab_offset,
                                    },
                                );
                            });
                        } else {
                            interaction.refused = Some(placement.task.key());
                        }
                    }

                    if bar_response.dragged() && dragging.is_some() {
                        ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
                    }

                    if bar_response.drag_stopped() {
                        let snapshot = ui.ctx().data_mut(|data| {
                            let snapshot = data.get_temp::<DragSnapshot>(drag_id());
                            data.remove::<DragSnapshot>(drag_id());
                            snapshot
                        });
                        let target = bar_response
                            .interact_pointer_pos()
                            .or(pointer)
                            .and_then(|p| geometry.cell_at(p));
                        if let (Some(snapshot), Some((day, target_owner))) = (snapshot, target) {
                            interaction.dropped = Some(DropRequest {
                                key: snapshot.key,
                                owner: target_owner.clone(),
                                start: week.day(day) - chrono::Duration::days(snapshot.grab_offset),
                            });
                        }
                    }

                    if bar_response.hovered() && dragging.is_none() {
                        if placement.task.is_individually_draggable() {
                            ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
                        }
                        show_bar_tooltip(ui, placement);
                    }
                }
            }

            if let (Some(snapshot), Some(pos)) = (&dragging, pointer) {
                draw_drag_ghost(&painter, &geometry, snapshot, pos);
            }

            if response.clicked() && !consumed_click {
                *selected = None;
            }
        });

    interaction
}

fn drag_id() -> Id {
    Id::new("week-grid-drag")
}

fn bar_rect(geometry: &GridGeometry, lane_rect: &Rect, placement: &Placement<'_>) -> Rect {
    let inset = theme::BAR_INSET;
    let y = lane_rect.top() + LANE_PADDING + placement.row as f32 * (ROW_HEIGHT + ROW_GAP);
    let start_x = geometry.day_x(placement.first_day)
        + if placement.has_start_cap() { inset } else { 0.0 };
    let end_x = geometry.day_x(placement.last_day + 1)
        - if placement.has_end_cap() { inset } else { 0.0 };
    Rect::from_min_max(Pos2::new(start_x, y + inset), Pos2::new(end_x, y + ROW_HEIGHT - inset))
}

fn draw_header(painter: &egui::Painter, geometry: &GridGeometry, week: &WeekWindow, today: NaiveDate) {
    let origin = geometry.origin;
    painter.rect_filled(
        Rect::from_min_size(origin, Vec2::new(geometry.width, HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );
    painter.line_segment(
        [
            Pos2::new(origin.x, origin.y + HEADER_HEIGHT),
            Pos2::new(origin.x + geometry.width, origin.y + HEADER_HEIGHT),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    painter.text(
        Pos2::new(origin.x + 10.0, origin.y + HEADER_HEIGHT / 2.0),
        egui::Align2::LEFT_CENTER,
        week.start.format("W%V %Y").to_string(),
        theme::font_header(),
        theme::TEXT_PRIMARY,
    );

    for (i, date) in week.days().into_iter().enumerate() {
        let x = geometry.day_x(i);
        let is_today = date == today;
        let is_weekend = date.weekday().num_days_from_monday() >= 5;
        let color = if is_today {
            theme::TODAY_LINE
        } else if is_weekend {
            theme::TEXT_DIM
        } else {
            theme::TEXT_SECONDARY
        };
        painter.text(
            Pos2::new(x + 6.0, origin.y + 14.0),
            egui::Align2::LEFT_CENTER,
            date.format("%a").to_string(),
            theme::font_sub(),
            color,
        );
        painter.text(
            Pos2::new(x + 6.0, origin.y + 30.0),
            egui::Align2::LEFT_CENTER,
            date.format("%d %b").to_string(),
            theme::font_header(),
            if is_today { theme::TODAY_LINE } else { theme::TEXT_PRIMARY },
        );
    }
}

fn draw_day_columns(
    painter: &egui::Painter,
    geometry: &GridGeometry,
    week: &WeekWindow,
    today: NaiveDate,
    bottom: f32,
) {
    let top = geometry.origin.y + HEADER_HEIGHT;
    if week.contains(today) {
        let day = week.day_index(today) as usize;
        painter.rect_filled(
            Rect::from_min_max(
                Pos2::new(geometry.day_x(day), top),
                Pos2::new(geometry.day_x(day + 1), bottom),
            ),
            0.0,
            theme::BG_TODAY,
        );
    }
    for day in 0..=DAYS_PER_WEEK {
        let x = geometry.day_x(day);
        painter.line_segment(
            [Pos2::new(x, geometry.origin.y), Pos2::new(x, bottom)],
            Stroke::new(0.5, theme::GRID_LINE),
        );
    }
}

fn draw_lane_background(painter: &egui::Painter, geometry: &GridGeometry, lane_rect: &Rect, owner: &OwnerId) {
    painter.line_segment(
        [
            Pos2::new(lane_rect.left(), lane_rect.bottom()),
            Pos2::new(lane_rect.left() + geometry.width, lane_rect.bottom()),
        ],
        Stroke::new(0.5, theme::BORDER_SUBTLE),
    );
    let label_rect = Rect::from_min_size(lane_rect.min, Vec2::new(LABEL_WIDTH, lane_rect.height()));
    painter.rect_filled(label_rect, 0.0, theme::BG_PANEL);
    painter.with_clip_rect(label_rect.shrink(4.0)).text(
        Pos2::new(label_rect.left() + 10.0, label_rect.top() + LANE_PADDING + ROW_HEIGHT / 2.0),
        egui::Align2::LEFT_CENTER,
        owner.as_str(),
        theme::font_bar(),
        theme::TEXT_PRIMARY,
    );
}

fn draw_bar(
    painter: &egui::Painter,
    placement: &Placement<'_>,
    bar_rect: Rect,
    is_selected: bool,
    is_dragged: bool,
) {
    let task = placement.task;
    let rounding = theme::bar_rounding(placement.has_start_cap(), placement.has_end_cap());
    let mut color = theme::task_color(task);
    if is_dragged {
        color = color.gamma_multiply(0.45);
    }

    painter.rect_filled(bar_rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(35));
    painter.rect_filled(bar_rect, rounding, color);

    if is_selected {
        painter.rect_stroke(bar_rect.expand(1.5), rounding, Stroke::new(2.0, theme::BORDER_ACCENT));
    }

    // Title and icon sit on the label day only; continuation days stay bare.
    let label_x = bar_rect.left() + 6.0;
    let label = format!("{} {}", theme::task_icon(task), task.title);
    let galley = painter.layout_no_wrap(label, theme::font_bar(), theme::TEXT_ON_BAR);
    let clip = Rect::from_min_max(
        bar_rect.min,
        Pos2::new(bar_rect.right().min(label_clip_right(bar_rect, placement)), bar_rect.bottom()),
    );
    let text_y = bar_rect.top() + (bar_rect.height() - galley.size().y) / 2.0;
    painter
        .with_clip_rect(clip)
        .galley(Pos2::new(label_x, text_y), galley, Color32::TRANSPARENT);
}

/// Right edge of the label day's column within `bar_rect`.
fn label_clip_right(bar_rect: Rect, placement: &Placement<'_>) -> f32 {
    let day_width = bar_rect.width() / placement.span_days() as f32;
    let label_column = placement.label_day() - placement.first_day + 1;
    bar_rect.left() + day_width * label_column as f32
}

fn draw_drag_ghost(painter: &egui::Painter, geometry: &GridGeometry, snapshot: &DragSnapshot, pos: Pos2) {
    let rect = Rect::from_min_size(
        pos + Vec2::new(8.0, -ROW_HEIGHT / 2.0),
        Vec2::new(geometry.day_width.min(180.0), ROW_HEIGHT - 2.0 * theme::BAR_INSET),
    );
    painter.rect_filled(rect, theme::bar_rounding(true, true), theme::ACCENT.gamma_multiply(0.85));
    painter.with_clip_rect(rect).text(
        Pos2::new(rect.left() + 6.0, rect.center().y),
        egui::Align2::LEFT_CENTER,
        &snapshot.title,
        theme::font_bar(),
        theme::TEXT_ON_BAR,
    );
}

fn show_bar_tooltip(ui: &Ui, placement: &Placement<'_>) {
    let task = placement.task;
    egui::show_tooltip_at_pointer(
        ui.ctx(),
        ui.layer_id(),
        Id::new(("week-bar-tip", task.id.as_str())),
        |ui| {
            ui.strong(&task.title);
            if let Some(span) = task.span {
                ui.label(format!(
                    "{} {} {}",
                    span.start.format("%d/%m/%Y"),
                    egui_phosphor::regular::ARROW_RIGHT,
                    span.end.format("%d/%m/%Y"),
                ));
            }
            let owners = task.owners.flatten();
            let names: Vec<&str> = owners.iter().map(OwnerId::as_str).collect();
            ui.label(names.join(", "));
            if let Some(status) = &task.status {
                ui.label(status);
            }
            if !task.platforms.is_empty() {
                ui.label(task.platforms.join(" · "));
            }
            if !task.is_individually_draggable() {
                ui.label(egui::RichText::new("Shared or team-pool task").weak());
            }
        },
    );
}
