use std::sync::Arc;
use std::time::Duration;

use dropsave_core::PollCommand;
use engine_logging::{engine_debug, engine_error, engine_info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::tracker::{RefreshReport, Tracker};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Outcome of the latest refresh cycle, published after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleSummary {
    pub cycle: u64,
    pub report: RefreshReport,
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Recurring `refresh_all` trigger with an explicit start/stop lifecycle.
///
/// Cycles run one after another inside a single task, so they never overlap;
/// ticks missed while a cycle is slow are dropped.
pub struct Poller {
    tracker: Arc<Tracker>,
    interval: Duration,
    task: Option<PollTask>,
    cycles: Arc<watch::Sender<CycleSummary>>,
}

impl Poller {
    pub fn new(tracker: Arc<Tracker>, interval: Duration) -> Self {
        let (cycles, _) = watch::channel(CycleSummary::default());
        Self {
            tracker,
            // tokio panics on a zero period.
            interval: interval.max(Duration::from_millis(1)),
            task: None,
            cycles: Arc::new(cycles),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<CycleSummary> {
        self.cycles.subscribe()
    }

    /// Starts polling. Returns `false` if it was already running.
    pub fn start(&mut self) -> bool {
        if self.task.is_some() {
            return false;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            self.tracker.clone(),
            self.interval,
            cancel.clone(),
            self.cycles.clone(),
        ));
        engine_info!("Polling started every {:?}", self.interval);
        self.task = Some(PollTask { cancel, handle });
        true
    }

    /// Cancels polling and waits for the task to finish. Returns `false` if
    /// it was not running.
    pub async fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.cancel.cancel();
        if let Err(err) = task.handle.await {
            engine_error!("Polling task ended abnormally: {}", err);
        }
        engine_info!("Polling stopped");
        true
    }

    pub async fn apply(&mut self, command: PollCommand) {
        match command {
            PollCommand::Start => {
                self.start();
            }
            PollCommand::Stop => {
                self.stop().await;
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
        }
    }
}

async fn poll_loop(
    tracker: Arc<Tracker>,
    period: Duration,
    cancel: CancellationToken,
    cycles: Arc<watch::Sender<CycleSummary>>,
) {
    // First refresh fires one full period after start.
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycle = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = tracker.refresh_all() => result,
        };

        cycle += 1;
        match result {
            Ok(report) => {
                engine_debug!("Refresh cycle {} finished: {:?}", cycle, report);
                cycles.send_replace(CycleSummary { cycle, report });
            }
            Err(err) => engine_error!("Refresh cycle {} failed: {}", cycle, err),
        }
    }
}
