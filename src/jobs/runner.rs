//! Runs one job on a pseudo-terminal and reports it as events.

use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::sync::{Arc, OnceLock};

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, ExitStatus, PtySize};
use regex::Regex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::cancel::{CancelHandle, Interrupt};
use super::types::{JobError, JobEvent, JobId, JobRequest};

/// Everything a worker needs, moved onto its thread.
pub(crate) struct RunContext {
    pub id: JobId,
    pub request: JobRequest,
    pub events: UnboundedSender<JobEvent>,
    pub cancel: Arc<CancelHandle>,
    pub size: PtySize,
}

impl RunContext {
    fn send(&self, event: JobEvent) {
        // The controller went away; nothing is left to report to.
        let _ = self.events.send(event);
    }

    fn log(&self, line: String) {
        self.send(JobEvent::Log {
            id: self.id,
            title: self.request.title.clone(),
            line,
        });
    }
}

/// Starts the job on the blocking pool. The worker sends `Started`, any
/// number of `Log`s and exactly one `Finished`.
pub(crate) fn spawn(ctx: RunContext) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || run(ctx))
}

fn run(ctx: RunContext) {
    ctx.send(JobEvent::Started {
        id: ctx.id,
        title: ctx.request.title.clone(),
    });

    let error = execute(&ctx).err();
    match &error {
        Some(err) => log::debug!("job {} ({}) ended: {err}", ctx.id, ctx.request.title),
        None => log::debug!("job {} ({}) succeeded", ctx.id, ctx.request.title),
    }

    ctx.send(JobEvent::Finished {
        id: ctx.id,
        title: ctx.request.title.clone(),
        error,
    });
}

fn execute(ctx: &RunContext) -> Result<(), JobError> {
    let request = &ctx.request;
    let pair = native_pty_system()
        .openpty(ctx.size)
        .map_err(|e| JobError::Pty(e.to_string()))?;
    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| JobError::Pty(e.to_string()))?;

    let mut command = CommandBuilder::new(&request.program);
    command.args(&request.args);
    if let Some(dir) = &request.dir {
        command.cwd(dir);
    }
    for (key, value) in &request.env {
        command.env(key, value);
    }

    let mut child = match pair.slave.spawn_command(command) {
        Ok(child) => child,
        Err(err) => {
            let error = JobError::Spawn {
                program: request.program.clone(),
                message: err.to_string(),
            };
            ctx.log(error.to_string());
            return Err(error);
        }
    };
    log::debug!(
        "job {} started: {} (pid {:?})",
        ctx.id,
        request.command_line(),
        child.process_id()
    );

    // The reader only sees EOF once no slave handle is left open here.
    let slave = if cfg!(windows) {
        Some(pair.slave)
    } else {
        drop(pair.slave);
        None
    };

    ctx.cancel.attach(Box::new(ProcessTarget::new(child.as_ref())));

    let forwarder = {
        let events = ctx.events.clone();
        let id = ctx.id;
        let title = request.title.clone();
        std::thread::Builder::new()
            .name(format!("job-{}-output", id.0))
            .spawn(move || {
                forward_lines(reader, |line| {
                    let _ = events.send(JobEvent::Log {
                        id,
                        title: title.clone(),
                        line,
                    });
                })
            })
            .map_err(|e| JobError::Pty(e.to_string()))
    };

    let status = child.wait();
    ctx.cancel.detach();
    drop(slave);
    drop(pair.master);

    match forwarder {
        Ok(handle) => {
            if handle.join().is_err() {
                log::warn!("output reader for job {} panicked", ctx.id);
            }
        }
        Err(err) => log::warn!("job {} output not captured: {err}", ctx.id),
    }

    let status = status.map_err(|e| JobError::Wait(e.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(exit_error(&status))
    }
}

fn exit_error(status: &ExitStatus) -> JobError {
    // portable-pty only exposes the signal name through `Display`.
    let text = status.to_string();
    JobError::Exit {
        code: status.exit_code(),
        signal: text.strip_prefix("Terminated by ").map(str::to_string),
    }
}

/// Interrupts a spawned child: SIGINT on unix, a kill elsewhere.
struct ProcessTarget {
    #[cfg_attr(not(unix), allow(dead_code))]
    pid: Option<u32>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

impl ProcessTarget {
    fn new(child: &(dyn Child + Send + Sync)) -> Self {
        Self {
            pid: child.process_id(),
            killer: child.clone_killer(),
        }
    }
}

impl Interrupt for ProcessTarget {
    #[cfg(unix)]
    fn interrupt(&mut self) -> io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match self.pid.and_then(|pid| i32::try_from(pid).ok()) {
            Some(pid) => kill(Pid::from_raw(pid), Signal::SIGINT).map_err(io::Error::from),
            None => self.killer.kill(),
        }
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) -> io::Result<()> {
        self.killer.kill()
    }
}

/// Splits raw terminal output into display lines and hands each to `emit`.
fn forward_lines(reader: impl Read, mut emit: impl FnMut(String)) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => emit(clean_line(&buf)),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            // A closed pty master reports EIO instead of EOF on Linux.
            Err(_) => {
                if !buf.is_empty() {
                    emit(clean_line(&buf));
                }
                break;
            }
        }
    }
}

fn ansi_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]").ok()
        })
        .as_ref()
}

/// Drops the line ending, keeps what a terminal would show after carriage
/// returns, and strips escape sequences.
fn clean_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches(['\n', '\r']);
    let visible = text.rsplit('\r').next().unwrap_or(text);
    match ansi_pattern() {
        Some(pattern) => pattern.replace_all(visible, "").into_owned(),
        None => visible.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"plain\n", "plain")]
    #[case(b"crlf\r\n", "crlf")]
    #[case(b"10%\r50%\r100%\r\n", "100%")]
    #[case(b"\x1b[32mgreen\x1b[0m done\n", "green done")]
    #[case(b"\x1b]0;title\x07body\n", "body")]
    #[case(b"no newline", "no newline")]
    fn cleans_terminal_lines(#[case] raw: &[u8], #[case] expected: &str) {
        assert_eq!(clean_line(raw), expected);
    }

    #[test]
    fn forwards_each_line_in_order() {
        let input: &[u8] = b"one\r\ntwo\n\x1b[1mthree\x1b[0m";
        let mut lines = Vec::new();
        forward_lines(input, |line| lines.push(line));
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn stops_on_read_error_after_flushing_partial_line() {
        struct Failing(Option<&'static [u8]>);
        impl Read for Failing {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                match self.0.take() {
                    Some(data) => {
                        buf[..data.len()].copy_from_slice(data);
                        Ok(data.len())
                    }
                    None => Err(io::Error::from_raw_os_error(5)),
                }
            }
        }

        let mut lines = Vec::new();
        forward_lines(Failing(Some(b"done\npartial")), |line| lines.push(line));
        assert_eq!(lines, vec!["done", "partial"]);
    }

    #[test]
    fn exit_error_reports_signal_name() {
        let err = exit_error(&ExitStatus::with_signal("Interrupt"));
        assert!(matches!(&err, JobError::Exit { signal: Some(name), .. } if name == "Interrupt"));
        assert!(err.looks_interrupted());

        let err = exit_error(&ExitStatus::with_exit_code(4));
        assert_eq!(err.to_string(), "exit status 4");
    }
}
