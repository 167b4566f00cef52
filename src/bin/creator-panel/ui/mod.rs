mod app;
mod diff_viewer;
mod panels;
mod status;
mod theme;

pub use app::render_app;
