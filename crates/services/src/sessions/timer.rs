//! Per-question countdown.
//!
//! The timer owns at most one tick task. Every restart aborts the previous
//! task first, and dropping the timer aborts it too, so ticks never overlap.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One second elapsed. `generation` identifies the run that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub generation: u64,
}

pub struct CountdownTimer {
    period: Duration,
    tx: mpsc::Sender<TimerTick>,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl CountdownTimer {
    /// A one-second timer and the receiver its ticks arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<TimerTick>) {
        Self::with_period(Duration::from_secs(1))
    }

    #[must_use]
    pub fn with_period(period: Duration) -> (Self, mpsc::Receiver<TimerTick>) {
        let (tx, rx) = mpsc::channel(8);
        (
            Self {
                period,
                tx,
                task: None,
                generation: 0,
            },
            rx,
        )
    }

    /// Abort any running task and start ticking again.
    ///
    /// Must be called inside a tokio runtime.
    pub fn restart(&mut self) {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let period = self.period;
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if tx.send(TimerTick { generation }).await.is_err() {
                    break;
                }
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Ticks from a cancelled or superseded run are stale.
    #[must_use]
    pub fn is_current(&self, tick: TimerTick) -> bool {
        tick.generation == self.generation && self.task.is_some()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
