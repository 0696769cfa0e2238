use std::env;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::PlannerConfig;

pub const LOG_ENV: &str = "PLANNER_LOG";
pub const LOG_FORMAT_ENV: &str = "PLANNER_LOG_FORMAT";
pub const DEFAULT_FILTER: &str = "week_planner=info,warn";

/// Filter directives: `PLANNER_LOG`, then the config file, then the default.
pub fn filter_directives(config: &PlannerConfig) -> String {
    env::var(LOG_ENV)
        .ok()
        .or_else(|| config.log_filter.clone())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing(config: &PlannerConfig) {
    let directives = filter_directives(config);
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring log filter '{directives}': {e}");
        EnvFilter::new(DEFAULT_FILTER)
    });

    let format = env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_ansi(false))
            .try_init(),
        _ => registry.with(fmt::layer().compact()).try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
