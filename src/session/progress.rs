use crate::config::TimingConfig;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Highest fraction reported before a job has actually finished.
pub const PROGRESS_CAP: f64 = 0.999;

/// Receives completion fractions in `[0.0, 1.0]`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Expected wall time of a job rendering `glyphs` drawable glyphs.
pub fn estimate_duration(timing: &TimingConfig, glyphs: usize) -> Duration {
    let body = if glyphs == 0 {
        timing.empty_timeline()
    } else {
        (timing.pre_glyph() + timing.glyph_budget() + timing.post_glyph()) * glyphs as u32
    };
    timing.head() + body + timing.tail()
}

/// Time-based completion estimate. Optimistic, monotonic, and never 1.0 until finished.
#[derive(Clone, Debug)]
pub struct ProgressEstimator {
    start: Instant,
    estimated: Duration,
    last_reported: f64,
    finalized: bool,
}

impl ProgressEstimator {
    pub fn new(estimated: Duration) -> Self {
        Self {
            start: Instant::now(),
            estimated,
            last_reported: 0.0,
            finalized: false,
        }
    }

    pub fn estimated(&self) -> Duration {
        self.estimated
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Current fraction; never lower than the previous one.
    pub fn fraction(&mut self) -> f64 {
        if self.finalized {
            return 1.0;
        }
        let raw = if self.estimated.is_zero() {
            PROGRESS_CAP
        } else {
            self.start.elapsed().as_secs_f64() / self.estimated.as_secs_f64()
        };
        self.last_reported = raw.min(PROGRESS_CAP).max(self.last_reported);
        self.last_reported
    }

    /// Force the fraction to 1.0.
    pub fn finish(&mut self) -> f64 {
        self.finalized = true;
        self.last_reported = 1.0;
        1.0
    }
}

/// Periodically samples a [`ProgressEstimator`] into a callback from a timer task.
pub struct ProgressReporter {
    estimator: Arc<Mutex<ProgressEstimator>>,
    callback: ProgressCallback,
    task: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn start(estimated: Duration, interval: Duration, callback: ProgressCallback) -> Self {
        let estimator = Arc::new(Mutex::new(ProgressEstimator::new(estimated)));
        let sampled = estimator.clone();
        let cb = callback.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let f = sampled
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .fraction();
                cb(f);
            }
        });
        Self {
            estimator,
            callback,
            task: Some(task),
        }
    }

    /// Stop sampling without completing. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    /// Stop sampling and report exactly 1.0.
    pub async fn finish(&mut self) {
        self.stop().await;
        let f = self
            .estimator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish();
        (self.callback)(f);
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/progress.rs"]
mod tests;
