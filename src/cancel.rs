use crate::{Result, ScrobbleIndexError};
use std::time::Duration;
use tokio::sync::watch;

/// What the running sync has been asked to do at its next page boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    Run,
    Pause,
    Abort,
}

/// Cooperative control token for one sync run.
///
/// The orchestrator creates a fresh token per run, keeps a clone to signal
/// pause/abort, and passes the token into the run. The run only looks at it
/// between suspension points; an in-flight fetch always completes first.
/// Pacing sleeps wake early when a signal arrives.
#[derive(Clone, Debug)]
pub struct SyncToken {
    tx: watch::Sender<ControlSignal>,
}

impl Default for SyncToken {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ControlSignal::Run);
        Self { tx }
    }

    pub fn pause(&self) {
        self.signal(ControlSignal::Pause);
    }

    pub fn abort(&self) {
        self.signal(ControlSignal::Abort);
    }

    /// Abort takes precedence: a later pause does not downgrade it.
    fn signal(&self, signal: ControlSignal) {
        self.tx.send_if_modified(|current| {
            if *current == ControlSignal::Abort || *current == signal {
                return false;
            }
            *current = signal;
            true
        });
    }

    pub fn current(&self) -> ControlSignal {
        *self.tx.borrow()
    }

    pub fn is_aborted(&self) -> bool {
        self.current() == ControlSignal::Abort
    }

    /// `Some(signal)` when the run should stop at this boundary.
    pub fn stop_requested(&self) -> Option<ControlSignal> {
        match self.current() {
            ControlSignal::Run => None,
            signal => Some(signal),
        }
    }

    /// Sleep for `duration` unless pause/abort is signalled first.
    ///
    /// Returns [`ScrobbleIndexError::Cancelled`] when interrupted.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        let mut rx = self.tx.subscribe();
        if *rx.borrow_and_update() != ControlSignal::Run {
            return Err(ScrobbleIndexError::Cancelled);
        }

        let sleeper = tokio::time::sleep(duration);
        tokio::pin!(sleeper);
        tokio::select! {
            _ = &mut sleeper => Ok(()),
            _ = async {
                loop {
                    if rx.changed().await.is_err() {
                        // every sender dropped: nothing can signal anymore
                        std::future::pending::<()>().await;
                    }
                    if *rx.borrow_and_update() != ControlSignal::Run {
                        break;
                    }
                }
            } => Err(ScrobbleIndexError::Cancelled),
        }
    }
}
