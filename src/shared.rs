//! Thread-safe engine handle with timer-driven windows
//!
//! Hosts that deliver samples from a background thread share the engine
//! through a single mutex. Timed windows are finalized by a detached timer
//! thread that only holds a weak reference, so dropping every handle tears the
//! session down and the pending finalization becomes a no-op.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Instant;

use log::debug;

use crate::engine::{LevelingEngine, WindowOutcome};
use crate::error::LevelError;
use crate::types::{Reading, Sample};
use crate::window::{WindowPurpose, WindowTicket};

#[derive(Debug)]
struct Session {
    engine: LevelingEngine,
    /// Dropping this wakes the timer thread of the pending window
    timer: Option<Sender<()>>,
}

/// Cloneable handle to a [`LevelingEngine`] behind a mutex
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Session>>,
}

impl SharedEngine {
    pub fn new(engine: LevelingEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Session { engine, timer: None })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process one sample under the engine lock
    pub fn ingest(&self, sample: Sample) -> Option<Reading> {
        self.lock().engine.ingest(sample)
    }

    /// Run `f` with exclusive access to the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut LevelingEngine) -> R) -> R {
        f(&mut self.lock().engine)
    }

    /// Open a window and schedule its finalization
    ///
    /// After the configured window duration a timer thread finalizes the
    /// window and hands the outcome to `on_complete`. If by then the engine
    /// was dropped or reset, or the window was cancelled or replaced,
    /// nothing is applied and `on_complete` is never called. Cancelling,
    /// resetting or dropping through this handle ends the timer thread
    /// right away.
    pub fn start_window<F>(&self, purpose: WindowPurpose, on_complete: F) -> Result<WindowTicket, LevelError>
    where
        F: FnOnce(Result<WindowOutcome, LevelError>) + Send + 'static,
    {
        let (ticket, duration, wake) = {
            let mut session = self.lock();
            let ticket = session.engine.start_window(purpose, Instant::now())?;
            let (timer, wake) = mpsc::channel();
            session.timer = Some(timer);
            (ticket, session.engine.settings().window, wake)
        };

        let engine = Arc::downgrade(&self.inner);
        thread::spawn(move || {
            match wake.recv_timeout(duration) {
                Err(RecvTimeoutError::Timeout) => finish(engine, ticket, on_complete),
                _ => debug!(target: "vehicle_level::shared", "timer for window {:?} stopped early", ticket),
            }
        });

        Ok(ticket)
    }

    pub fn cancel_window(&self) -> bool {
        let mut session = self.lock();
        session.timer = None;
        session.engine.cancel_window()
    }

    pub fn reset(&self) {
        let mut session = self.lock();
        session.timer = None;
        session.engine.reset();
    }
}

fn finish<F>(session: Weak<Mutex<Session>>, ticket: WindowTicket, on_complete: F)
where
    F: FnOnce(Result<WindowOutcome, LevelError>),
{
    let Some(session) = session.upgrade() else {
        debug!(target: "vehicle_level::shared", "engine dropped before window {:?} elapsed", ticket);
        return;
    };

    let outcome = session
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .engine
        .finish_window(ticket);
    drop(session);

    match outcome {
        Some(outcome) => on_complete(outcome),
        None => debug!(target: "vehicle_level::shared", "window {:?} no longer pending", ticket),
    }
}
