use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::session::SessionError;

/// Events emitted by a running countdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second elapsed; carries the seconds still remaining
    Tick { remaining_secs: u32 },
    /// Remaining time reached zero
    Expired,
}

/// Monotonic one-second-tick countdown
///
/// `start` spawns the countdown task and hands back its event stream;
/// `cancel` aborts the task and drops the sender so no late ticks arrive.
/// There is no pause/resume: a replay reset is cancel-then-start at the
/// full duration.
pub struct TimerEngine {
    task: Option<JoinHandle<()>>,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self { task: None }
    }

    /// Start a countdown of `duration_secs` seconds
    ///
    /// A second start without an intervening `cancel` is a caller error.
    pub fn start(&mut self, duration_secs: u32) -> Result<mpsc::Receiver<TimerEvent>, SessionError> {
        if self.task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(SessionError::ProtocolMisuse(
                "timer started while already running".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // First tick of a tokio interval fires immediately; consume it so
            // the first Tick event arrives after one full second.
            interval.tick().await;

            let mut remaining = duration_secs;
            while remaining > 0 {
                interval.tick().await;
                remaining -= 1;

                if tx.send(TimerEvent::Tick { remaining_secs: remaining }).await.is_err() {
                    return; // Receiver dropped, countdown abandoned
                }
            }

            let _ = tx.send(TimerEvent::Expired).await;
        });

        info!("Timer started: {}s", duration_secs);
        self.task = Some(task);

        Ok(rx)
    }

    /// Stop the countdown; safe to call when no countdown is running
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Timer cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}
