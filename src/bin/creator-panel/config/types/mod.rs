mod app;
mod diff;
mod generate;
mod jobs;
mod logging;
mod ui;

const DEFAULT_MAX_PARALLEL: usize = 2;
const DEFAULT_TICK_MS: u64 = 250;
const DEFAULT_LOG_ROTATE_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_LOG_ROTATE_KEEP: usize = 5;

pub use app::AppConfig;
pub use diff::DiffConfig;
pub use generate::GenerateConfig;
pub use jobs::JobsConfig;
pub use logging::LoggingConfig;
pub use ui::UiConfig;
