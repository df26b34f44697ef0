//! Single-use completion channel carrying a `StepStatus` from the machine
//! worker that executed a command back to the thread waiting on it.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};

use crate::types::StepStatus;

/// Sending half, owned by the command. Consumed on fulfilment.
///
/// Dropping it unfulfilled (abandoned command, unwinding handler) sends
/// `StepStatus::Error`, so the waiting side never hangs on a lost command.
#[derive(Debug)]
pub struct Completion {
    tx: Option<Sender<StepStatus>>,
}

/// Receiving half, held by whoever issued the command.
#[derive(Debug)]
pub struct CompletionHandle {
    rx: Receiver<StepStatus>,
}

/// Create a linked completion pair.
pub fn completion() -> (Completion, CompletionHandle) {
    let (tx, rx) = bounded(1);
    (Completion { tx: Some(tx) }, CompletionHandle { rx })
}

impl Completion {
    /// Deliver the outcome. Can only happen once since it consumes `self`.
    pub fn fulfill(mut self, status: StepStatus) {
        self.send(status);
    }

    fn send(&mut self, status: StepStatus) {
        if let Some(tx) = self.tx.take() {
            // Receiver may already be gone; nobody is left to tell.
            let _ = tx.send(status);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.send(StepStatus::Error);
    }
}

impl CompletionHandle {
    /// Block until the executing machine reports an outcome.
    pub fn wait(self) -> StepStatus {
        self.rx.recv().unwrap_or(StepStatus::Error)
    }

    /// Bounded wait, `None` if nothing arrived in time.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<StepStatus> {
        match self.rx.recv_timeout(timeout) {
            Ok(status) => Some(status),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(StepStatus::Error),
        }
    }
}
