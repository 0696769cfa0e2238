use crate::app::PlannerApp;
use crate::ui::theme;
use egui::{menu, RichText, Ui};
use egui_phosphor::regular as icons;

/// Render the menu bar and week navigation.
pub fn show_toolbar(app: &mut PlannerApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  File  ").font(theme::font_header()), |ui| {
            if ui.button(format!("{}  Open Dataset...", icons::FOLDER_OPEN)).clicked() {
                app.open_dataset();
                ui.close_menu();
            }
            if ui.button(format!("{}  Import CSV...", icons::FILE_CSV)).clicked() {
                app.import_csv();
                ui.close_menu();
            }
            ui.separator();
            if ui.button(format!("{}  Open Settings Folder", icons::GEAR)).clicked() {
                app.open_config_folder();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_header()), |ui| {
            if ui.button(format!("{}  About", icons::INFO)).clicked() {
                app.show_about = true;
                ui.close_menu();
            }
        });

        ui.separator();

        if ui
            .button(icons::CARET_LEFT)
            .on_hover_text("Previous week")
            .clicked()
        {
            app.go_to_week(app.week.previous());
        }
        if ui.button("Today").clicked() {
            app.go_to_today();
        }
        if ui
            .button(icons::CARET_RIGHT)
            .on_hover_text("Next week")
            .clicked()
        {
            app.go_to_week(app.week.next());
        }

        let mut jump = app.week.start;
        let picker = ui.add(egui_extras::DatePickerButton::new(&mut jump).id_salt("week_jump"));
        if picker.changed() && jump != app.week.start {
            app.go_to_date(jump);
        }

        ui.separator();

        let all_loaded = app.store.window().is_all_loaded();
        let load_all = ui.add_enabled(
            !all_loaded,
            egui::Button::new(format!("{}  Load all", icons::DATABASE)),
        );
        if load_all.on_hover_text("Stop limiting fetches to a date range").clicked() {
            app.load_all();
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let name = app.dataset_name();
            ui.label(RichText::new(name).size(11.0).weak());
        });
    });
}
