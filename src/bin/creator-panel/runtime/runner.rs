use std::time::Duration;

use crossterm::event::Event;
use tokio::sync::mpsc;

use creator_panel::jobs::JobEvent;

use crate::runtime::{AppEvent, InputEvent};
use crate::ui::render_app;

use super::controller::AppController;
use super::terminal::AppTerminal;

const MIN_TICK_MS: u64 = 50;

pub async fn run_app(
    controller: AppController,
    terminal: &mut AppTerminal,
    rx: mpsc::Receiver<AppEvent>,
    job_rx: mpsc::UnboundedReceiver<JobEvent>,
    event_tx: mpsc::Sender<AppEvent>,
    tick_ms: u64,
) -> anyhow::Result<()> {
    let mut runner = AppRunner::new(controller, terminal, rx, job_rx, tick_ms);
    spawn_event_reader(event_tx);
    runner.run().await
}

struct AppRunner<'a> {
    controller: AppController,
    terminal: &'a mut AppTerminal,
    rx: mpsc::Receiver<AppEvent>,
    job_rx: mpsc::UnboundedReceiver<JobEvent>,
    tick: tokio::time::Interval,
    dirty: bool,
}

impl<'a> AppRunner<'a> {
    fn new(
        mut controller: AppController,
        terminal: &'a mut AppTerminal,
        rx: mpsc::Receiver<AppEvent>,
        job_rx: mpsc::UnboundedReceiver<JobEvent>,
        tick_ms: u64,
    ) -> Self {
        controller.state.terminal_size = terminal
            .size()
            .map(|r| (r.width, r.height))
            .unwrap_or((0, 0));
        Self {
            controller,
            terminal,
            rx,
            job_rx,
            tick: tokio::time::interval(Duration::from_millis(tick_ms.max(MIN_TICK_MS))),
            dirty: true,
        }
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        while !self.controller.state.should_quit {
            if self.dirty {
                self.draw()?;
                self.dirty = false;
            }
            self.wait_for_event().await;
        }
        Ok(())
    }

    async fn wait_for_event(&mut self) {
        let event = tokio::select! {
            Some(event) = self.rx.recv() => event,
            Some(event) = self.job_rx.recv() => AppEvent::Job(event),
            _ = self.tick.tick() => AppEvent::Tick,
        };
        if self.controller.handle_event(event) {
            self.dirty = true;
        }
    }

    fn draw(&mut self) -> anyhow::Result<()> {
        self.terminal
            .draw(|frame| render_app(frame, &self.controller.state))?;
        Ok(())
    }
}

fn spawn_event_reader(sender: mpsc::Sender<AppEvent>) {
    std::thread::spawn(move || loop {
        let event = match crossterm::event::read() {
            Ok(ev) => ev,
            Err(_) => continue,
        };
        let mapped = match event {
            Event::Key(key) => Some(InputEvent::Key(key)),
            Event::Resize(w, h) => Some(InputEvent::Resize(w, h)),
            _ => None,
        };
        if let Some(input) = mapped {
            if sender.blocking_send(AppEvent::Input(input)).is_err() {
                break;
            }
        }
    });
}
