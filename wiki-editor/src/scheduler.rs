//! Single-slot cancellable deferred work

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A timer slot holding at most one pending piece of work.
///
/// Arming the slot cancels whatever was pending before. Cancellation only
/// reaches the waiting phase: once the delay has elapsed the work is
/// detached and runs to completion even if the slot is re-armed.
pub struct ScheduledTask {
    name: &'static str,
    slot: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledTask {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(None),
        }
    }

    /// Run `work` after `delay`, replacing any pending work
    pub fn arm<F>(&self, delay: Duration, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            tokio::spawn(work);
        });

        let previous = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);

        if let Some(previous) = previous {
            if !previous.is_finished() {
                previous.abort();
                tracing::trace!("{}: re-armed, pending work cancelled", self.name);
            }
        }
        tracing::trace!("{}: armed for {:?}", self.name, delay);
    }

    /// Cancel pending work; returns whether anything was still waiting
    pub fn cancel(&self) -> bool {
        let pending = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match pending {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                tracing::trace!("{}: cancelled", self.name);
                true
            }
            _ => false,
        }
    }

    /// Whether work is armed and its delay has not elapsed yet
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self
            .slot
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
