#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod ui;

use week_planner::config::PlannerConfig;
use week_planner::logging;

fn main() -> eframe::Result<()> {
    let config = PlannerConfig::load();
    logging::init_tracing(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting week planner");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Week Planner"),
        ..Default::default()
    };

    eframe::run_native(
        "Week Planner",
        options,
        Box::new(|cc| Ok(Box::new(app::PlannerApp::new(cc, config)))),
    )
}
