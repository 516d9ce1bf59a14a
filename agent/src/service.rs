//! Background-thread entry point for embedding scenarios.
//!
//! Runs the same tasking loop as the foreground path on a dedicated thread,
//! guarded by an atomic running flag. The loop observes the flag at the top
//! of each iteration; stopping blocks until the thread exits, so an
//! in-flight DNS retry or acknowledgement wait runs to completion first.
//! The session moves into the loop at start, which is what prevents the two
//! entry points from ever sharing sequence counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::channel::TxtQuery;
use crate::runloop::TaskingLoop;
use crate::CommandExecutor;

/// Handle to a tasking loop running on a background thread.
pub struct BackgroundService {
    running: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<crate::error::Result<()>>>,
}

impl BackgroundService {
    /// Spawns the loop on a dedicated thread and returns its handle.
    pub fn start<C, E>(tasking_loop: TaskingLoop<C, E>) -> Self
    where
        C: TxtQuery + Send + 'static,
        E: CommandExecutor + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::spawn(move || {
            tasking_loop.run_while(move || flag.load(Ordering::SeqCst))
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Whether the loop thread has been asked to keep running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Requests a cooperative stop and blocks until the thread exits,
    /// returning the loop's outcome.
    pub fn stop(mut self) -> crate::error::Result<()> {
        self.running.store(false, Ordering::SeqCst);

        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                crate::error::AgentError::validation_error("Tasking loop thread panicked")
            })?,
            None => Ok(()),
        }
    }
}
