use crate::audio::graph::{AudioGraph, frame_to_sample};
use crate::encode::sink::{AudioLayout, FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::render::surface::{FrameRGBA, SharedSurface, lock_surface};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Lifecycle of a [`CaptureSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Stopped,
}

/// Work handed from the sampler to the sink thread.
enum SinkCommand {
    Frame(FrameIndex, Arc<FrameRGBA>),
    Audio(Vec<f32>),
}

struct Recorder {
    output: SharedSurface,
    graph: Option<AudioGraph>,
    fps: Fps,
    commands: Option<mpsc::UnboundedSender<SinkCommand>>,
    emitted: u64,
}

impl Recorder {
    /// Queue every frame up to (not including) `target`. All frames queued by one call share a
    /// single snapshot, which is how skipped sampler ticks are filled.
    ///
    /// Returns `false` once the sink thread has gone away.
    fn emit_until(&mut self, target: u64) -> bool {
        let Some(commands) = self.commands.as_ref() else {
            return false;
        };
        if target <= self.emitted {
            return true;
        }
        let frame = Arc::new(lock_surface(&self.output).snapshot());
        while self.emitted < target {
            let idx = self.emitted;
            if commands
                .send(SinkCommand::Frame(FrameIndex(idx), frame.clone()))
                .is_err()
            {
                self.commands = None;
                return false;
            }
            if let Some(graph) = &self.graph {
                let rate = graph.sample_rate();
                let from = frame_to_sample(idx, self.fps, rate);
                let to = frame_to_sample(idx + 1, self.fps, rate);
                let samples = graph.render((to - from) as usize);
                if commands.send(SinkCommand::Audio(samples)).is_err() {
                    self.commands = None;
                    return false;
                }
            }
            self.emitted += 1;
        }
        true
    }
}

/// The sink thread: owns the [`FrameSink`] so encoder pipes, process waits and muxing never
/// run on a runtime worker.
struct SinkThread {
    result: oneshot::Receiver<StrokeResult<Vec<u8>>>,
    abandoned: Arc<AtomicBool>,
}

impl SinkThread {
    /// Spawn the thread and run `begin` on it. Resolves once the sink is ready for frames.
    async fn spawn(
        mut sink: Box<dyn FrameSink>,
        cfg: SinkConfig,
        commands: mpsc::UnboundedReceiver<SinkCommand>,
    ) -> StrokeResult<Self> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        let abandoned = Arc::new(AtomicBool::new(false));
        let flag = abandoned.clone();

        std::thread::Builder::new()
            .name("strokecast-sink".to_string())
            .spawn(move || {
                let mut out = Vec::new();
                let begun = sink.begin(cfg).map_err(as_capture_error);
                let failed = begun.is_err();
                let _ = ready_tx.send(begun);
                if failed {
                    return;
                }
                if let Some(chunk) = sink.take_chunk() {
                    out.extend(chunk);
                }
                let _ = result_tx.send(drain_sink(sink.as_mut(), commands, &flag, out));
            })
            .map_err(|e| StrokeError::capture(format!("spawn sink thread: {e}")))?;

        ready_rx
            .await
            .map_err(|_| StrokeError::capture("sink thread exited during begin"))??;
        Ok(Self {
            result: result_rx,
            abandoned,
        })
    }

    /// Wait for the thread to drain its queue and finish the sink.
    async fn finish(self) -> StrokeResult<Vec<u8>> {
        self.result
            .await
            .map_err(|_| StrokeError::capture("sink thread exited without a result"))?
    }
}

fn drain_sink(
    sink: &mut dyn FrameSink,
    mut commands: mpsc::UnboundedReceiver<SinkCommand>,
    abandoned: &AtomicBool,
    mut out: Vec<u8>,
) -> StrokeResult<Vec<u8>> {
    while let Some(command) = commands.blocking_recv() {
        let pushed = match command {
            SinkCommand::Frame(idx, frame) => sink.push_frame(idx, &frame),
            SinkCommand::Audio(samples) => sink.push_audio(&samples),
        };
        if let Err(e) = pushed {
            tracing::warn!(error = %e, "capture sink failed");
            return Err(as_capture_error(e));
        }
        if let Some(chunk) = sink.take_chunk() {
            out.extend(chunk);
        }
    }
    if abandoned.load(Ordering::SeqCst) {
        return Err(StrokeError::capture("capture abandoned"));
    }
    if let Some(tail) = sink.end().map_err(as_capture_error)? {
        out.extend(tail);
    }
    Ok(out)
}

/// Real-time capture of the output surface (and audio graph) into a [`FrameSink`].
///
/// A sampler task ticks at the capture frame rate. Each tick works out how many frames are due
/// from the elapsed time, so the capture timeline follows wall time even when ticks are late.
/// Frames and audio are queued to a dedicated sink thread.
pub struct CaptureSession {
    recorder: Arc<Mutex<Recorder>>,
    sink: Option<Box<dyn FrameSink>>,
    writer: Option<SinkThread>,
    sampler: Option<JoinHandle<()>>,
    started_at: Option<Instant>,
    state: CaptureState,
}

impl CaptureSession {
    /// Bind the session to its output surface, optional audio graph and sink. Nothing runs
    /// until [`Self::start`].
    pub fn open(
        output: SharedSurface,
        graph: Option<AudioGraph>,
        sink: Box<dyn FrameSink>,
        fps: Fps,
    ) -> Self {
        Self {
            recorder: Arc::new(Mutex::new(Recorder {
                output,
                graph,
                fps,
                commands: None,
                emitted: 0,
            })),
            sink: Some(sink),
            writer: None,
            sampler: None,
            started_at: None,
            state: CaptureState::Idle,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Frames queued to the sink so far.
    pub fn frames_emitted(&self) -> u64 {
        self.lock().emitted
    }

    /// Begin the sink on its thread and spawn the sampler.
    pub async fn start(&mut self) -> StrokeResult<()> {
        if self.state != CaptureState::Idle {
            return Err(StrokeError::capture("capture session already started"));
        }
        let sink = self
            .sink
            .take()
            .ok_or_else(|| StrokeError::capture("capture sink already consumed"))?;
        let (cfg, fps) = {
            let rec = self.lock();
            let canvas = lock_surface(&rec.output).canvas();
            let audio = rec.graph.as_ref().map(|g| AudioLayout {
                sample_rate: g.sample_rate(),
                channels: g.channels(),
            });
            let cfg = SinkConfig {
                width: canvas.width,
                height: canvas.height,
                fps: rec.fps,
                audio,
            };
            (cfg, rec.fps)
        };

        let (tx, rx) = mpsc::unbounded_channel();
        self.writer = Some(SinkThread::spawn(sink, cfg, rx).await?);
        self.lock().commands = Some(tx);

        let started_at = Instant::now();
        let recorder = self.recorder.clone();
        self.sampler = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(fps.frame_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let due = frames_due(started_at.elapsed(), fps) + 1;
                let mut rec = recorder.lock().unwrap_or_else(PoisonError::into_inner);
                if !rec.emit_until(due) {
                    return;
                }
            }
        }));
        self.started_at = Some(started_at);
        self.state = CaptureState::Recording;
        tracing::debug!(fps = fps.as_f64(), "capture started");
        Ok(())
    }

    /// Stop sampling, flush the sink and return every encoded byte in order.
    ///
    /// A session that never started, or whose sink never produced output, yields an empty
    /// buffer.
    pub async fn stop(&mut self) -> StrokeResult<Vec<u8>> {
        match self.state {
            CaptureState::Idle | CaptureState::Stopped => {
                self.state = CaptureState::Stopped;
                return Ok(Vec::new());
            }
            CaptureState::Recording => {}
        }
        self.state = CaptureState::Stopped;
        if let Some(handle) = self.sampler.take() {
            handle.abort();
            let _ = handle.await;
        }

        let frames = {
            let mut rec = self.lock();
            if let Some(started_at) = self.started_at {
                let due = frames_due(started_at.elapsed(), rec.fps) + 1;
                rec.emit_until(due);
            }
            // Closing the queue lets the sink thread finish.
            rec.commands = None;
            rec.emitted
        };
        let writer = self
            .writer
            .take()
            .ok_or_else(|| StrokeError::capture("capture sink thread missing"))?;
        let bytes = writer.finish().await?;
        tracing::debug!(frames, bytes = bytes.len(), "capture stopped");
        Ok(bytes)
    }

    fn lock(&self) -> MutexGuard<'_, Recorder> {
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(handle) = self.sampler.take() {
            handle.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abandoned.store(true, Ordering::SeqCst);
        }
        self.lock().commands = None;
    }
}

/// Frames whose start time has passed after `elapsed`, rounded to the nearest frame.
pub fn frames_due(elapsed: Duration, fps: Fps) -> u64 {
    let num = elapsed.as_nanos() * u128::from(fps.num);
    let den = u128::from(fps.den) * 1_000_000_000;
    ((num + den / 2) / den) as u64
}

fn as_capture_error(err: StrokeError) -> StrokeError {
    match err {
        StrokeError::Capture { .. } => err,
        other => StrokeError::capture_from(other),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/session.rs"]
mod tests;
