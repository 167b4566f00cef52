#[path = "creator-panel/app/mod.rs"]
mod app;
#[path = "creator-panel/args.rs"]
mod args;
#[path = "creator-panel/config/mod.rs"]
mod config;
#[path = "creator-panel/logging.rs"]
mod logging;
#[path = "creator-panel/runtime/mod.rs"]
mod runtime;
#[path = "creator-panel/ui/mod.rs"]
mod ui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
