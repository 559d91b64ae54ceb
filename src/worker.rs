//! Background thread with an owned run flag
//!
//! The thread body polls the flag; [`Worker::stop`] clears it and joins, and
//! dropping a `Worker` does the same.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

/// Shared "keep running" flag handed to the thread body
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Worker {
    run: RunFlag,
    handle: Option<JoinHandle<()>>,
    name: String,
}

impl Worker {
    /// Spawn a named thread running `body` until the flag is cleared
    pub fn spawn<F>(name: impl Into<String>, body: F) -> std::io::Result<Self>
    where
        F: FnOnce(RunFlag) + Send + 'static,
    {
        let name = name.into();
        let run = RunFlag::new();
        let thread_run = run.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || body(thread_run))?;
        debug!("{} thread started", name);
        Ok(Self {
            run,
            handle: Some(handle),
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Clear the run flag and wait for the thread to exit. Idempotent.
    pub fn stop(&mut self) {
        self.run.clear();
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            error!("{} thread panicked", self.name);
        } else {
            debug!("{} thread stopped", self.name);
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
