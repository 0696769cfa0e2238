use chrono::NaiveDate;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use uuid::Uuid;

use week_planner::backend::MemoryBackend;
use week_planner::config::PlannerConfig;
use week_planner::io::csv_import::import_csv;
use week_planner::io::load_dataset;
use week_planner::model::{Dataset, SourceKind, TaskKey, WeekWindow};
use week_planner::sync::{
    ChangeFeedListener, DateWindow, MutationOutcome, PlannerStore, StoreEvent,
};

use crate::ui;

/// Main application state.
pub struct PlannerApp {
    pub config: PlannerConfig,
    pub backend: MemoryBackend,
    pub store: PlannerStore,
    pub feed: Option<ChangeFeedListener>,
    pub week: WeekWindow,
    pub selected: Option<TaskKey>,
    pub show_about: bool,
    pub status_message: String,
    dataset_name: String,
    events: Rc<RefCell<Vec<StoreEvent>>>,
}

impl PlannerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: PlannerConfig) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        let today = chrono::Local::now().date_naive();
        let (backend, status_message) = Self::initial_backend(&config, today);
        let dataset_name = backend.snapshot().name;

        let window = DateWindow::around(today, config.window_slack_months);
        let mut store = PlannerStore::new(window);
        if config.load_all_on_start {
            store.load_all();
        }

        let events: Rc<RefCell<Vec<StoreEvent>>> = Rc::default();
        let sink = Rc::clone(&events);
        store.subscribe(Box::new(move |event| sink.borrow_mut().push(event.clone())));

        let mut app = Self {
            config,
            backend,
            store,
            feed: None,
            week: WeekWindow::containing(today),
            selected: None,
            show_about: false,
            status_message,
            dataset_name,
            events,
        };
        app.attach_feed();
        app
    }

    fn initial_backend(config: &PlannerConfig, today: NaiveDate) -> (MemoryBackend, String) {
        match &config.data_file {
            Some(path) if path.exists() => match load_dataset(path) {
                Ok(dataset) => {
                    let message = format!("Opened {}", path.display());
                    (MemoryBackend::new(dataset).persisting_to(path.clone()), message)
                }
                Err(e) => {
                    tracing::warn!("{e}; starting with sample data");
                    (MemoryBackend::new(sample_dataset(today)), format!("Error loading: {e}"))
                }
            },
            Some(path) => {
                let backend = MemoryBackend::new(sample_dataset(today)).persisting_to(path.clone());
                (backend, format!("New dataset at {}", path.display()))
            }
            None => (MemoryBackend::new(sample_dataset(today)), "Ready".to_string()),
        }
    }

    fn attach_feed(&mut self) {
        match ChangeFeedListener::attach(&self.backend, &SourceKind::ALL) {
            Ok(feed) => self.feed = Some(feed),
            Err(e) => {
                tracing::warn!("change feed unavailable: {e}");
                self.status_message = format!("Live updates unavailable: {e}");
            }
        }
    }

    /// Swap the backend, moving the change feed over with it.
    fn install_backend(&mut self, backend: MemoryBackend) {
        if let Some(mut feed) = self.feed.take() {
            feed.detach(&self.backend);
        }
        self.dataset_name = backend.snapshot().name;
        self.backend = backend;
        self.selected = None;
        self.attach_feed();
        self.store.request_refetch("dataset replaced");
    }

    pub fn dataset_name(&self) -> String {
        match self.backend.persist_path() {
            Some(_) => self.dataset_name.clone(),
            None => format!("{} (not saved)", self.dataset_name),
        }
    }

    // --- Navigation ---

    pub fn go_to_week(&mut self, week: WeekWindow) {
        self.week = week;
        self.store.show_week(&week);
    }

    pub fn go_to_date(&mut self, date: NaiveDate) {
        self.go_to_week(WeekWindow::containing(date));
    }

    pub fn go_to_today(&mut self) {
        self.go_to_week(WeekWindow::current());
    }

    pub fn load_all(&mut self) {
        if self.store.load_all() {
            self.status_message = "Loading all tasks".to_string();
        }
    }

    // --- File operations ---

    pub fn open_dataset(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Planner Dataset", &["json"])
            .pick_file()
        {
            match load_dataset(&path) {
                Ok(dataset) => {
                    self.install_backend(MemoryBackend::new(dataset).persisting_to(path.clone()));
                    self.remember_data_file(path);
                    self.status_message = "Dataset loaded".to_string();
                }
                Err(e) => {
                    self.status_message = format!("Error loading: {e}");
                }
            }
        }
    }

    pub fn import_csv(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv", "txt"])
            .pick_file()
        {
            match import_csv(&path) {
                Ok((records, skipped)) => {
                    let name = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("Imported")
                        .to_string();
                    let count = records.len();
                    let mut dataset = Dataset::new(name);
                    for record in records {
                        dataset.table_mut(record.kind).push(record.fields);
                    }
                    self.install_backend(MemoryBackend::new(dataset));

                    self.status_message = if skipped > 0 {
                        format!("Imported {count} rows ({skipped} rows skipped)")
                    } else {
                        format!("Imported {count} rows")
                    };
                }
                Err(e) => {
                    self.status_message = format!("CSV import failed: {e}");
                }
            }
        }
    }

    pub fn open_config_folder(&mut self) {
        let dir = match PlannerConfig::config_dir() {
            Ok(dir) => dir,
            Err(e) => {
                self.status_message = e.to_string();
                return;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&dir).and_then(|_| open::that(&dir)) {
            self.status_message = format!("Could not open {}: {e}", dir.display());
        }
    }

    fn remember_data_file(&mut self, path: PathBuf) {
        self.config.data_file = Some(path);
        if let Err(e) = self.config.save() {
            tracing::warn!("could not save settings: {e}");
        }
    }

    // --- Store plumbing ---

    /// Feed, fetch and status updates. Runs once per frame before drawing.
    fn sync(&mut self) {
        if let Some(feed) = self.feed.as_mut() {
            feed.poll(&mut self.store);
        }
        self.store.pump(&self.backend);

        let events: Vec<StoreEvent> = self.events.borrow_mut().drain(..).collect();
        for event in events {
            match event {
                StoreEvent::FetchFailed { message, .. } => {
                    self.status_message = format!("Fetch failed: {message}");
                }
                StoreEvent::RescheduleRolledBack { message, .. } => {
                    self.status_message = format!("Reschedule failed, reverted: {message}");
                }
                StoreEvent::TasksReplaced { .. }
                | StoreEvent::WindowChanged { .. }
                | StoreEvent::TaskRescheduled { .. } => {}
            }
        }
    }

    fn handle_drop(&mut self, drop: ui::week_grid::DropRequest) {
        match self
            .store
            .reschedule(&self.backend, &drop.key, &drop.owner, drop.start)
        {
            Ok(MutationOutcome::Committed(command)) => {
                let title = self
                    .store
                    .task(&command.key)
                    .map(|t| t.title.clone())
                    .unwrap_or_else(|| command.key.to_string());
                self.status_message = format!(
                    "Moved '{}' ({} → {})",
                    title,
                    command.after.span.start.format("%Y-%m-%d"),
                    command.after.span.end.format("%Y-%m-%d")
                );
            }
            Ok(MutationOutcome::RolledBack { .. }) => {}
            Err(e) => {
                self.status_message = e.to_string();
            }
        }
    }
}

impl eframe::App for PlannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::theme::apply_theme(ctx);
        self.sync();

        let prev_week = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::ArrowLeft));
        let next_week = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::ArrowRight));
        if prev_week {
            self.go_to_week(self.week.previous());
        }
        if next_week {
            self.go_to_week(self.week.next());
        }

        // Top panel: toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_STATUS)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_status())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    if let Some(error) = self.store.last_error() {
                        ui.label(
                            egui::RichText::new(format!("{} {error}", egui_phosphor::regular::WARNING))
                                .font(ui::theme::font_status())
                                .color(ui::theme::TEXT_ERROR),
                        );
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(format!(
                                "Tasks: {} · Backlog: {}",
                                self.store.tasks().len(),
                                self.store.backlog().len()
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                        let window = self.store.window();
                        let loaded = if window.is_all_loaded() {
                            "All loaded".to_string()
                        } else {
                            let range = window.range();
                            format!(
                                "Loaded {} – {}",
                                range.start.format("%Y-%m-%d"),
                                range.end.format("%Y-%m-%d")
                            )
                        };
                        ui.label(
                            egui::RichText::new(loaded)
                                .size(10.5)
                                .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });

        // Right panel: backlog
        let mut backlog_click = None;
        egui::SidePanel::right("backlog_panel")
            .default_width(ui::theme::SIDE_PANEL_WIDTH)
            .resizable(true)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_PANEL)
                    .inner_margin(egui::Margin::same(8.0))
                    .stroke(egui::Stroke::new(1.0, ui::theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                backlog_click = ui::backlog::show_backlog(self.store.backlog(), self.selected.as_ref(), ui);
            });
        if let Some(key) = backlog_click {
            self.selected = Some(key);
        }

        // Central panel: week grid
        let today = chrono::Local::now().date_naive();
        let grid_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        let interaction = egui::CentralPanel::default()
            .frame(grid_frame)
            .show(ctx, |ui| {
                let lanes = self.store.week_layout(&self.week);
                ui::week_grid::show_week_grid(&lanes, &self.week, today, &mut self.selected, ui)
            })
            .inner;

        if let Some(key) = interaction.refused {
            let title = self
                .store
                .task(&key)
                .map(|t| t.title.clone())
                .unwrap_or_else(|| key.to_string());
            self.status_message = format!("'{title}' is shared or in a team pool and cannot be dragged");
        }
        if let Some(drop) = interaction.dropped {
            self.handle_drop(drop);
        }

        if self.show_about {
            ui::dialogs::show_about_dialog(self, ctx);
        }

        if self.store.is_refetch_pending() {
            ctx.request_repaint();
        }
    }
}

/// A small week of work around `today` so a fresh install has something to show.
fn sample_dataset(today: NaiveDate) -> Dataset {
    let monday = WeekWindow::containing(today).start;
    let day = |offset: i64| (monday + chrono::Duration::days(offset)).format("%Y-%m-%d").to_string();
    let id = || Uuid::new_v4().to_string();

    let mut dataset = Dataset::new("Sample Week");
    let content = [
        ("Launch blog post", -2, 1, "ana", "editor_ids"),
        ("Podcast episode 12", 0, 2, "bo", "assignee_ids"),
        ("Newsletter", 3, 3, "ana", "assignee_ids"),
        ("Case study draft", 2, 8, "cy", "idea_owner_ids"),
    ];
    for (title, start, end, owner, role) in content {
        let row = serde_json::json!({
            "id": id(),
            "title": title,
            "start_date": day(start),
            "end_date": day(end),
            role: [owner],
            "platforms": ["web"],
        });
        if let Some(fields) = row.as_object() {
            dataset.content_items.push(fields.clone());
        }
    }

    let tasks = [
        ("Sprint review", 4, 4, vec!["ana", "bo"], false),
        ("Fix onboarding bug", 1, 2, vec!["cy"], false),
        ("Support rotation", 0, 4, vec!["bo"], true),
    ];
    for (title, start, end, owners, pool) in tasks {
        let row = serde_json::json!({
            "id": id(),
            "title": title,
            "startDate": day(start),
            "endDate": day(end),
            "assigneeIds": owners,
            "isTeamTask": pool,
        });
        if let Some(fields) = row.as_object() {
            dataset.tasks.push(fields.clone());
        }
    }

    let backlog = serde_json::json!({
        "id": id(),
        "title": "Refresh brand guidelines",
        "isUnscheduled": true,
        "assigneeIds": ["cy"],
    });
    if let Some(fields) = backlog.as_object() {
        dataset.tasks.push(fields.clone());
    }
    dataset
}
