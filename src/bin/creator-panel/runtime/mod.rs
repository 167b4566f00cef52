pub mod controller;
mod events;
mod runner;
mod state;
mod terminal;

pub use events::{AppEvent, InputEvent};
pub use runner::run_app;
pub use state::{AppState, DiffBody, DiffOverlay, Focus, NoticeLevel};
pub use terminal::{init_terminal, restore_terminal, AppTerminal};
