//! Timed word-by-word reveal.
//!
//! A [`RevealEngine`] owns one session at a time. Stepping happens on a worker
//! thread; the caller observes it through a [`RevealObserver`] and controls it
//! with `cancel`, `request_reset` and `set_speed` from its own thread.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::offsets::{HighlightSpan, OffsetIndex};
use crate::text::WordSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// One revealed word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub session: u64,
    pub index: usize,
    pub word: String,
    pub span: HighlightSpan,
}

/// Receives reveal progress on the worker thread.
///
/// Callbacks run without the session lock, so queries and `set_speed` stay
/// responsive while one is in progress. `cancel` waits for a callback already
/// in flight to return, so a callback must not cancel or reset the engine.
pub trait RevealObserver: Send + 'static {
    fn on_step(&mut self, step: Step);
    fn on_complete(&mut self, session: u64);
}

#[derive(Debug, Error, PartialEq)]
pub enum RevealError {
    #[error("nothing to reveal")]
    EmptyInput,
    #[error("speed must be a positive number of words per second, got {0}")]
    InvalidSpeed(f64),
}

/// What a stop request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Stepping paused, position kept.
    Paused,
    /// Second request in a row: position discarded.
    Cleared,
}

fn validate_speed(speed: f64) -> Result<f64, RevealError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(RevealError::InvalidSpeed(speed))
    }
}

/// Inter-step delay for a rate in words per second.
pub fn step_delay(speed: f64) -> Duration {
    Duration::from_secs_f64(1.0 / speed)
}

#[derive(Debug)]
struct Session {
    id: u64,
    state: EngineState,
    current_index: usize,
    speed: f64,
    cancelled: bool,
}

#[derive(Debug)]
struct Shared {
    session: Mutex<Session>,
    wake: Condvar,
    /// Held by the worker from its cancel check until the callback returns.
    delivery: Mutex<()>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle on a started session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True while this session is still stepping.
    pub fn is_active(&self) -> bool {
        let session = self.shared.lock();
        session.id == self.id && session.state == EngineState::Running
    }

    /// Block until the session stops running or `timeout` elapses.
    /// Returns true if the session is no longer running.
    pub fn wait(&self, timeout: Duration) -> bool {
        let session = self.shared.lock();
        let (session, _) = self
            .shared
            .wake
            .wait_timeout_while(session, timeout, |s| {
                s.id == self.id && s.state == EngineState::Running
            })
            .unwrap_or_else(PoisonError::into_inner);
        !(session.id == self.id && session.state == EngineState::Running)
    }
}

/// Drives at most one reveal session at a time.
#[derive(Debug)]
pub struct RevealEngine {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    reset_requests: u32,
}

impl Default for RevealEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RevealEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    id: 0,
                    state: EngineState::Idle,
                    current_index: 0,
                    speed: crate::settings::DEFAULT_SPEED,
                    cancelled: false,
                }),
                wake: Condvar::new(),
                delivery: Mutex::new(()),
            }),
            worker: None,
            reset_requests: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.shared.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    pub fn current_index(&self) -> usize {
        self.shared.lock().current_index
    }

    pub fn speed(&self) -> f64 {
        self.shared.lock().speed
    }

    /// Start revealing `words` at `speed` words per second.
    ///
    /// While a session is running this does nothing and hands back the
    /// running session's handle. A session paused by a single
    /// [`request_reset`](Self::request_reset) resumes from its position when
    /// that position lies inside `words`.
    pub fn start<O: RevealObserver>(
        &mut self,
        words: WordSequence,
        speed: f64,
        observer: O,
    ) -> Result<SessionHandle, RevealError> {
        if words.is_empty() {
            return Err(RevealError::EmptyInput);
        }
        let speed = validate_speed(speed)?;

        {
            let session = self.shared.lock();
            if session.state == EngineState::Running {
                debug!(session = session.id, "reveal already running, ignoring start");
                return Ok(self.handle(session.id));
            }
        }
        self.reap();

        let id = {
            let mut session = self.shared.lock();
            session.id += 1;
            if session.current_index >= words.len() {
                session.current_index = 0;
            }
            session.speed = speed;
            session.cancelled = false;
            session.state = EngineState::Running;
            debug!(
                session = session.id,
                words = words.len(),
                from = session.current_index,
                speed,
                "starting reveal"
            );
            session.id
        };

        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || run_session(shared, words, observer)));
        self.reset_requests = 0;
        Ok(self.handle(id))
    }

    /// Ask the running session to stop. No step is emitted once this returns.
    ///
    /// Only blocks while an observer callback already in flight finishes.
    pub fn cancel(&self) {
        {
            let mut session = self.shared.lock();
            if !session.cancelled {
                trace!(session = session.id, "cancel requested");
            }
            session.cancelled = true;
        }
        self.shared.wake.notify_all();
        drop(self.shared.deliver());
    }

    /// Stop button semantics: the first request pauses, a second one in a row
    /// also rewinds to the first word and calls `on_reset`.
    pub fn request_reset<F: FnOnce()>(&mut self, on_reset: F) -> ResetOutcome {
        self.cancel();
        self.reset_requests += 1;
        if self.reset_requests < 2 {
            return ResetOutcome::Paused;
        }

        self.reset_requests = 0;
        self.reap();
        {
            let mut session = self.shared.lock();
            session.current_index = 0;
            session.state = EngineState::Idle;
            debug!(session = session.id, "reveal reset");
        }
        on_reset();
        ResetOutcome::Cleared
    }

    /// Change the rate. Takes effect from the next inter-word delay.
    pub fn set_speed(&self, speed: f64) -> Result<(), RevealError> {
        let speed = validate_speed(speed)?;
        self.shared.lock().speed = speed;
        Ok(())
    }

    fn handle(&self, id: u64) -> SessionHandle {
        SessionHandle {
            id,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Join a worker that has been cancelled or has finished.
    fn reap(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("reaped a reveal worker that panicked");
            }
        }
    }
}

impl Drop for RevealEngine {
    fn drop(&mut self) {
        self.cancel();
        self.reap();
    }
}

/// Moves a session that is still running to `Cancelled` if the worker unwinds.
struct UnwindGuard(Arc<Shared>);

impl Drop for UnwindGuard {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        {
            let mut session = self.0.lock();
            warn!(session = session.id, "reveal worker panicked");
            if session.state == EngineState::Running {
                session.state = EngineState::Cancelled;
            }
        }
        self.0.wake.notify_all();
    }
}

fn run_session<O: RevealObserver>(shared: Arc<Shared>, words: WordSequence, mut observer: O) {
    let _unwind = UnwindGuard(Arc::clone(&shared));
    let offsets = OffsetIndex::new(&words);

    loop {
        let delivery = shared.deliver();
        let mut session = shared.lock();

        if session.cancelled {
            session.state = EngineState::Cancelled;
            debug!(session = session.id, at = session.current_index, "reveal cancelled");
            drop(session);
            shared.wake.notify_all();
            return;
        }

        let index = session.current_index;
        if index >= words.len() {
            session.current_index = 0;
            let id = session.id;
            drop(session);
            observer.on_complete(id);
            drop(delivery);

            shared.lock().state = EngineState::Completed;
            debug!(session = id, "reveal complete");
            shared.wake.notify_all();
            return;
        }

        let step = Step {
            session: session.id,
            index,
            word: words[index].to_owned(),
            span: offsets.span(index),
        };
        session.current_index += 1;
        let delay = step_delay(session.speed);
        drop(session);
        observer.on_step(step);
        drop(delivery);

        let session = shared.lock();
        let _session = shared
            .wake
            .wait_timeout_while(session, delay, |s| !s.cancelled)
            .unwrap_or_else(PoisonError::into_inner);
    }
}
