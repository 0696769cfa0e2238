use week_planner::model::{Task, TaskKey};
use crate::ui::theme;
use egui::{Color32, RichText, Ui};

/// Render the unscheduled-task side panel. Returns a task the user clicked.
pub fn show_backlog(tasks: &[Task], selected: Option<&TaskKey>, ui: &mut Ui) -> Option<TaskKey> {
    let mut clicked = None;

    ui.add_space(2.0);
    ui.horizontal(|ui| {
        ui.label(
            RichText::new(format!("{} Backlog", egui_phosphor::regular::TRAY))
                .strong()
                .size(15.0)
                .color(theme::TEXT_PRIMARY),
        );
        ui.add_space(4.0);
        ui.label(
            RichText::new(format!("({})", tasks.len()))
                .size(11.0)
                .color(theme::TEXT_DIM),
        );
    });
    ui.add_space(4.0);
    ui.separator();

    if tasks.is_empty() {
        ui.add_space(8.0);
        ui.label(RichText::new("Nothing unscheduled").color(theme::TEXT_DIM));
        return None;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for (i, task) in tasks.iter().enumerate() {
                let is_selected = selected.is_some_and(|key| task.has_key(key));
                let row_bg = if is_selected {
                    theme::BG_SELECTED
                } else if i % 2 == 0 {
                    theme::BG_PANEL
                } else {
                    theme::BG_DARK
                };

                let frame = egui::Frame {
                    fill: row_bg,
                    rounding: egui::Rounding::same(4.0),
                    inner_margin: egui::Margin::symmetric(6.0, 4.0),
                    outer_margin: egui::Margin::ZERO,
                    stroke: egui::Stroke::NONE,
                    shadow: egui::epaint::Shadow::NONE,
                };

                let frame_resp = frame.show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.spacing_mut().item_spacing.x = 6.0;
                        ui.label(RichText::new(theme::task_icon(task)).color(theme::task_color(task)));
                        let title = RichText::new(&task.title).size(12.0).color(if is_selected {
                            Color32::WHITE
                        } else {
                            theme::TEXT_PRIMARY
                        });
                        ui.add(egui::Label::new(title).truncate());

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            let owners = task.owners.flatten();
                            if let Some(first) = owners.first() {
                                let more = if owners.len() > 1 {
                                    format!(" +{}", owners.len() - 1)
                                } else {
                                    String::new()
                                };
                                ui.label(
                                    RichText::new(format!("{first}{more}"))
                                        .size(10.0)
                                        .color(theme::TEXT_SECONDARY),
                                );
                            }
                        });
                    });
                });

                let row_click = ui.interact(
                    frame_resp.response.rect,
                    egui::Id::new(("backlog-row", task.kind.table(), task.id.as_str())),
                    egui::Sense::click(),
                );
                if row_click.clicked() {
                    clicked = Some(task.key());
                }
                ui.add_space(1.0);
            }
        });

    clicked
}
