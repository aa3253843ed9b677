//! One compositor run, from spec to encoded media buffer.
//!
//! State machine: `Idle -> Preparing -> Recording -> Finalizing -> {Completed | Failed}`.
//! Every resource the job acquires lives in [`JobResources`], whose teardown runs exactly once
//! on success, on error, and when the job future is dropped mid-flight.

use crate::animation::animator::StrokeAnimator;
use crate::audio::decode::AudioPcm;
use crate::audio::fetch::AudioFetcher;
use crate::audio::graph::{AudioGraph, PlaybackHandle};
use crate::capture::session::CaptureSession;
use crate::config::{ThemeConfig, TimingConfig};
use crate::encode::sink::SinkFactory;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::render::clock::FrameClock;
use crate::render::compositor::{FrameChrome, paint_frame};
use crate::render::surface::{SharedSurface, Surface, lock_surface};
use crate::render::svg::FontBook;
use crate::scene::spec::RenderSpec;
use crate::scene::timeline::AnimationTimeline;
use crate::session::progress::{ProgressCallback, ProgressReporter, estimate_duration};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Job lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Preparing,
    Recording,
    Finalizing,
    Completed,
    Failed,
}

/// Hooks into a job's lifecycle. All methods default to no-ops.
pub trait JobObserver: Send + Sync {
    fn on_transition(&self, _spec: &RenderSpec, _from: JobState, _to: JobState) {}
    /// The animator and output surfaces exist and are wired to the frame clock.
    fn on_surfaces_attached(&self, _spec: &RenderSpec) {}
    /// Every job resource has been released. Fires once per job.
    fn on_teardown(&self, _spec: &RenderSpec) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {}

/// Everything a job borrows from its session.
#[derive(Clone)]
pub struct JobEnv {
    pub animator: Arc<dyn StrokeAnimator>,
    pub fetcher: Option<Arc<AudioFetcher>>,
    pub sinks: Arc<dyn SinkFactory>,
    pub observer: Arc<dyn JobObserver>,
    pub fonts: FontBook,
    pub theme: ThemeConfig,
    pub timing: TimingConfig,
    pub paint_fps: Fps,
    pub capture_fps: Fps,
    /// Side of the square animator surface.
    pub animator_size: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Resources held by one job.
pub struct JobResources {
    spec: RenderSpec,
    observer: Arc<dyn JobObserver>,
    audio_fetch: Option<JoinHandle<Option<AudioPcm>>>,
    graph: Option<AudioGraph>,
    playback: Option<PlaybackHandle>,
    animator_surface: Option<SharedSurface>,
    output_surface: Option<SharedSurface>,
    clock: Option<FrameClock>,
    capture: Option<CaptureSession>,
    progress: Option<ProgressReporter>,
    torn_down: bool,
}

impl JobResources {
    fn new(spec: RenderSpec, observer: Arc<dyn JobObserver>) -> Self {
        Self {
            spec,
            observer,
            audio_fetch: None,
            graph: None,
            playback: None,
            animator_surface: None,
            output_surface: None,
            clock: None,
            capture: None,
            progress: None,
            torn_down: false,
        }
    }

    /// Stop the timer tasks and wait for them to exit, then tear down.
    async fn shutdown(&mut self) {
        if let Some(clock) = self.clock.as_mut() {
            clock.stop().await;
        }
        if let Some(progress) = self.progress.as_mut() {
            progress.stop().await;
        }
        if let Some(fetch) = self.audio_fetch.take() {
            fetch.abort();
            let _ = fetch.await;
        }
        self.teardown();
    }

    /// Release everything. Runs at most once; later calls are no-ops.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        drop(self.playback.take());
        if let Some(graph) = self.graph.take() {
            graph.close();
        }
        if let Some(fetch) = self.audio_fetch.take() {
            fetch.abort();
        }
        drop(self.clock.take());
        drop(self.capture.take());
        drop(self.progress.take());
        self.animator_surface = None;
        self.output_surface = None;

        tracing::debug!(word = %self.spec.word, "job resources released");
        self.observer.on_teardown(&self.spec);
    }
}

impl Drop for JobResources {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Runs one [`RenderSpec`] through the state machine.
pub struct JobRunner {
    env: JobEnv,
    spec: RenderSpec,
    state: JobState,
}

impl JobRunner {
    pub fn new(env: JobEnv, spec: RenderSpec) -> Self {
        Self {
            env,
            spec,
            state: JobState::Idle,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Record the job's [`RenderSpec`] and return the encoded media buffer.
    #[tracing::instrument(skip_all, fields(word = %self.spec.word))]
    pub async fn run(mut self, progress: Option<ProgressCallback>) -> StrokeResult<Vec<u8>> {
        let mut res = JobResources::new(self.spec.clone(), self.env.observer.clone());
        match self.record(&mut res, progress).await {
            Ok(bytes) => {
                if let Some(reporter) = res.progress.as_mut() {
                    reporter.finish().await;
                }
                res.shutdown().await;
                self.transition(JobState::Completed);
                tracing::info!(bytes = bytes.len(), "job completed");
                Ok(bytes)
            }
            Err(err) => {
                if let Some(clock) = res.clock.as_mut() {
                    clock.stop().await;
                }
                if let Some(mut capture) = res.capture.take()
                    && let Err(stop_err) = capture.stop().await
                {
                    tracing::debug!(error = %stop_err, "capture stop after failure");
                }
                res.shutdown().await;
                self.transition(JobState::Failed);
                tracing::warn!(error = %err, "job failed");
                Err(err)
            }
        }
    }

    async fn record(
        &mut self,
        res: &mut JobResources,
        progress: Option<ProgressCallback>,
    ) -> StrokeResult<Vec<u8>> {
        self.transition(JobState::Preparing);
        let canvas = self.spec.canvas()?;
        let timeline = AnimationTimeline::from_word(&self.spec.word);

        if let Some(fetcher) = &self.env.fetcher {
            res.audio_fetch = Some(fetcher.spawn_fetch(self.spec.word.clone()));
            res.graph = Some(AudioGraph::new(self.env.sample_rate, self.env.channels)?);
        }

        let animator_canvas = Canvas::new(self.env.animator_size, self.env.animator_size)?;
        let animator_surface = Surface::new(animator_canvas).into_shared();
        let output = Surface::new(canvas).into_shared();
        let chrome = Arc::new(
            FrameChrome::build(&self.spec, &self.env.theme, &self.env.fonts)
                .map_err(as_setup_error)?,
        );
        paint_frame(
            &mut lock_surface(&output),
            &lock_surface(&animator_surface),
            &chrome,
        )?;
        res.animator_surface = Some(animator_surface.clone());
        res.output_surface = Some(output.clone());
        self.env.observer.on_surfaces_attached(&self.spec);

        self.transition(JobState::Recording);
        let sink = self.env.sinks.create().map_err(as_setup_error)?;
        let mut capture =
            CaptureSession::open(output.clone(), res.graph.clone(), sink, self.env.capture_fps);
        capture.start().await?;
        res.capture = Some(capture);
        let record_start = Instant::now();

        res.clock = Some(FrameClock::start(self.env.paint_fps, {
            let output = output.clone();
            let animator_surface = animator_surface.clone();
            let chrome = chrome.clone();
            move || {
                let mut out = lock_surface(&output);
                let anim = lock_surface(&animator_surface);
                if let Err(e) = paint_frame(&mut out, &anim, &chrome) {
                    tracing::warn!(error = %e, "frame paint failed");
                }
            }
        }));
        if let Some(cb) = progress {
            let estimated = estimate_duration(&self.env.timing, timeline.len());
            res.progress = Some(ProgressReporter::start(
                estimated,
                self.env.timing.progress_interval(),
                cb,
            ));
        }

        if let Some(fetch) = res.audio_fetch.take() {
            match fetch.await {
                Ok(Some(pcm)) => {
                    tokio::time::sleep_until(record_start + self.env.timing.audio_delay()).await;
                    if let Some(graph) = &res.graph {
                        match graph.play(Arc::new(pcm)) {
                            Ok(handle) => res.playback = Some(handle),
                            Err(e) => tracing::warn!(error = %e, "speech playback failed"),
                        }
                    }
                }
                Ok(None) => tracing::info!("recording without speech audio"),
                Err(e) => tracing::warn!(error = %e, "speech fetch task failed"),
            }
        }
        tokio::time::sleep_until(record_start + self.env.timing.head()).await;

        if timeline.is_empty() {
            tracing::debug!("no drawable glyphs, holding the empty timeline");
            tokio::time::sleep(self.env.timing.empty_timeline()).await;
        }
        for &glyph in timeline.glyphs() {
            tokio::time::sleep(self.env.timing.pre_glyph()).await;
            lock_surface(&animator_surface).clear();
            self.env
                .animator
                .animate(glyph, &animator_surface)
                .await
                .map_err(as_animation_error)?;
            tokio::time::sleep(self.env.timing.post_glyph()).await;
        }

        self.transition(JobState::Finalizing);
        tokio::time::sleep(self.env.timing.tail()).await;
        if let Some(clock) = res.clock.as_mut() {
            clock.stop().await;
        }
        drop(res.playback.take());
        let mut capture = res
            .capture
            .take()
            .ok_or_else(|| StrokeError::capture("capture session missing"))?;
        capture.stop().await
    }

    fn transition(&mut self, to: JobState) {
        let from = self.state;
        self.state = to;
        tracing::debug!(?from, ?to, "job transition");
        self.env.observer.on_transition(&self.spec, from, to);
    }
}

fn as_setup_error(err: StrokeError) -> StrokeError {
    match err {
        StrokeError::Setup { .. } | StrokeError::Validation(_) => err,
        other => StrokeError::setup_from(other),
    }
}

fn as_animation_error(err: StrokeError) -> StrokeError {
    match err {
        StrokeError::Animation { .. } => err,
        other => StrokeError::animation_from(other),
    }
}
