//! Countdown timer background task

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use super::{CountdownTask, TickOutcome};
use crate::state::CountdownState;

/// Cadence of countdown recomputation
pub const TICK_INTERVAL: Duration = Duration::from_millis(1_000);

/// Owner's handle on a running countdown.
///
/// Dropping the handle stops the timer, like unmounting the surface that
/// owns it.
#[derive(Debug)]
pub struct CountdownHandle {
    state_rx: watch::Receiver<CountdownState>,
    stopped: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl CountdownHandle {
    /// Most recently emitted state
    pub fn state(&self) -> CountdownState {
        self.state_rx.borrow().clone()
    }

    /// A receiver that sees every emitted state
    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.state_rx.clone()
    }

    /// Wait until the countdown reports expiry.
    ///
    /// If the timer is stopped first this returns the last emitted state.
    pub async fn wait_expired(&self) -> CountdownState {
        let mut rx = self.state_rx.clone();
        let expired = rx
            .wait_for(|state| state.is_expired)
            .await
            .map(|state| state.clone())
            .ok();
        expired.unwrap_or_else(|| rx.borrow().clone())
    }

    /// Cancel the timer. No tick runs after this returns.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Countdown timer stopped by owner");
        }
        self.join.abort();
    }

    /// Whether the timer task has ended, by expiry or by stop
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start ticking `task` every [`TICK_INTERVAL`] on the current tokio runtime.
///
/// The first tick runs immediately. The timer ends itself after the tick that
/// expires the countdown.
pub fn spawn_countdown(task: CountdownTask) -> CountdownHandle {
    let (state_tx, state_rx) = watch::channel(task.state().clone());
    let stopped = Arc::new(AtomicBool::new(false));
    let join = tokio::spawn(countdown_timer_task(task, state_tx, Arc::clone(&stopped)));

    CountdownHandle {
        state_rx,
        stopped,
        join,
    }
}

async fn countdown_timer_task(
    mut task: CountdownTask,
    state_tx: watch::Sender<CountdownState>,
    stopped: Arc<AtomicBool>,
) {
    debug!("Starting countdown timer task");
    let mut interval = tokio::time::interval(TICK_INTERVAL);

    loop {
        interval.tick().await;
        if stopped.load(Ordering::SeqCst) {
            break;
        }

        let outcome = task.tick();
        if let Err(e) = state_tx.send(task.state().clone()) {
            warn!("Failed to send countdown update: {}", e);
        }

        match outcome {
            TickOutcome::Running => {}
            TickOutcome::Expired | TickOutcome::Finished => {
                info!("Countdown reached zero, releasing timer");
                break;
            }
        }
    }
}
