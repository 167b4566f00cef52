use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Something that can be asked to stop, normally a child process.
pub trait Interrupt: Send {
    fn interrupt(&mut self) -> io::Result<()>;
}

#[derive(Default)]
struct CancelInner {
    requested: bool,
    target: Option<Box<dyn Interrupt>>,
}

/// Cancellation flag shared between the controller and a job worker.
///
/// The controller calls [`request`](Self::request); the worker
/// [`attach`](Self::attach)es the process once it exists. Whichever happens
/// second delivers the interrupt, and the interrupt is delivered at most once.
#[derive(Default)]
pub struct CancelHandle {
    inner: Mutex<CancelInner>,
    fired: AtomicBool,
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("requested", &self.is_requested())
            .field("fired", &self.has_fired())
            .finish()
    }
}

impl CancelHandle {
    fn lock(&self) -> MutexGuard<'_, CancelInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks the job as cancelled. Returns true only for the first request.
    pub fn request(&self) -> bool {
        let mut inner = self.lock();
        let first = !inner.requested;
        inner.requested = true;
        if let Some(target) = inner.target.as_mut() {
            self.fire(target.as_mut());
        }
        first
    }

    pub fn is_requested(&self) -> bool {
        self.lock().requested
    }

    /// Whether the interrupt has been delivered.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Registers the process to interrupt, interrupting it right away when
    /// cancellation was requested before it started.
    pub fn attach(&self, mut target: Box<dyn Interrupt>) {
        let mut inner = self.lock();
        if inner.requested {
            self.fire(target.as_mut());
        }
        inner.target = Some(target);
    }

    /// Drops the process target once it has been reaped.
    pub fn detach(&self) {
        self.lock().target = None;
    }

    fn fire(&self, target: &mut dyn Interrupt) {
        if self
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        if let Err(err) = target.interrupt() {
            log::warn!("failed to interrupt job process: {err}");
        }
    }
}
