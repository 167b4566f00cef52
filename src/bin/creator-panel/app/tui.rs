use tokio::sync::mpsc;

use crate::runtime::controller::AppController;
use crate::runtime::{init_terminal, restore_terminal, run_app, AppTerminal};

use super::Session;

const EVENT_BUFFER: usize = 256;

pub(super) async fn run_tui(session: Session) -> anyhow::Result<()> {
    let mut terminal = init_terminal()?;
    let result = run_inner(session, &mut terminal).await;
    restore_terminal()?;
    result
}

async fn run_inner(session: Session, terminal: &mut AppTerminal) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let (manager, job_rx) = session.job_manager();
    let tick_ms = session.config.ui.tick_ms;
    let mut controller = AppController::new(session, manager, tx.clone());
    controller.refresh_changes();
    run_app(controller, terminal, rx, job_rx, tx, tick_ms).await
}
