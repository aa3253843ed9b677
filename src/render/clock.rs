use crate::foundation::core::Fps;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Paint loop driven by a dedicated timer task.
///
/// Ticks keep firing at the target interval whether or not anything is watching the output,
/// which is what the capture session relies on during long batches. Late ticks are skipped
/// rather than bunched up.
pub struct FrameClock {
    handle: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl FrameClock {
    /// Spawn the loop. `on_tick` runs once per tick on the runtime.
    pub fn start<F>(fps: Fps, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(fps.frame_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                on_tick();
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });
        Self {
            handle: Some(handle),
            ticks,
        }
    }

    /// Number of completed ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop the loop and wait until the task is gone. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for FrameClock {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/clock.rs"]
mod tests;
