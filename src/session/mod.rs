//! Session facade: one configured set of collaborators that renders single words or batches.

pub mod batch;
pub mod job;
pub mod progress;

use crate::animation::animator::StrokeAnimator;
use crate::animation::median::MedianAnimator;
use crate::animation::strokes::{DirStrokeSource, HttpStrokeSource, StrokeCache, StrokeSource};
use crate::audio::fetch::{AudioFetcher, HttpSpeechSource, SpeechSource};
use crate::config::StudioConfig;
use crate::encode::ffmpeg::{FfmpegSinkFactory, FfmpegSinkOpts};
use crate::encode::sink::SinkFactory;
use crate::foundation::core::{Canvas, parse_hex_rgba};
use crate::foundation::error::StrokeResult;
use crate::render::compositor::{FrameChrome, paint_frame};
use crate::render::surface::{FrameRGBA, Surface, lock_surface};
use crate::render::svg::FontBook;
use crate::scene::spec::RenderSpec;
use crate::scene::timeline::AnimationTimeline;
use batch::{BatchArchive, BatchCancel, run_batch};
use job::{JobEnv, JobObserver, JobRunner, NoopObserver};
use progress::ProgressCallback;
use std::sync::Arc;

/// Renders words into encoded stroke-order videos. Jobs run one at a time per call.
pub struct RenderSession {
    config: StudioConfig,
    env: JobEnv,
}

impl RenderSession {
    /// Session with the default collaborators for `config`.
    pub fn new(config: StudioConfig) -> StrokeResult<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: StudioConfig) -> RenderSessionBuilder {
        RenderSessionBuilder {
            config,
            animator: None,
            stroke_source: None,
            speech: None,
            sinks: None,
            fonts: None,
            observer: None,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// File extension of the media this session produces.
    pub fn extension(&self) -> &str {
        self.env.sinks.extension()
    }

    /// Render one word to an encoded media buffer.
    pub async fn render_one(&self, spec: &RenderSpec) -> StrokeResult<Vec<u8>> {
        self.run_job(spec.clone(), None).await
    }

    /// Like [`render_one`](Self::render_one), reporting the job fraction as it records.
    pub async fn render_one_with_progress(
        &self,
        spec: &RenderSpec,
        on_progress: ProgressCallback,
    ) -> StrokeResult<Vec<u8>> {
        self.run_job(spec.clone(), Some(on_progress)).await
    }

    /// Render every spec in order and pack the results into one zip archive.
    pub async fn render_batch(
        &self,
        specs: &[RenderSpec],
        on_progress: ProgressCallback,
    ) -> StrokeResult<BatchArchive> {
        self.render_batch_with_cancel(specs, on_progress, &BatchCancel::new())
            .await
    }

    pub async fn render_batch_with_cancel(
        &self,
        specs: &[RenderSpec],
        on_progress: ProgressCallback,
        cancel: &BatchCancel,
    ) -> StrokeResult<BatchArchive> {
        run_batch(
            specs,
            self.extension(),
            self.config.batch.failure_policy,
            cancel,
            on_progress,
            |spec, progress| self.run_job(spec, Some(progress)),
        )
        .await
    }

    /// The last frame a job for `spec` would record, without animating or encoding.
    #[tracing::instrument(skip_all, fields(word = %spec.word))]
    pub async fn preview_frame(&self, spec: &RenderSpec) -> StrokeResult<FrameRGBA> {
        let canvas = spec.canvas()?;
        let chrome = FrameChrome::build(spec, &self.env.theme, &self.env.fonts)?;
        let size = self.env.animator_size;
        let animator_surface = Surface::new(Canvas::new(size, size)?).into_shared();

        let timeline = AnimationTimeline::from_word(&spec.word);
        if let Some(&glyph) = timeline.glyphs().last() {
            self.env
                .animator
                .draw_complete(glyph, &animator_surface)
                .await?;
        }

        let mut output = Surface::new(canvas);
        paint_frame(&mut output, &lock_surface(&animator_surface), &chrome)?;
        Ok(output.snapshot())
    }

    async fn run_job(
        &self,
        spec: RenderSpec,
        progress: Option<ProgressCallback>,
    ) -> StrokeResult<Vec<u8>> {
        spec.validate()?;
        JobRunner::new(self.env.clone(), spec).run(progress).await
    }
}

/// Overrides for the collaborators a [`RenderSession`] would otherwise build from config.
pub struct RenderSessionBuilder {
    config: StudioConfig,
    animator: Option<Arc<dyn StrokeAnimator>>,
    stroke_source: Option<Arc<dyn StrokeSource>>,
    speech: Option<Arc<dyn SpeechSource>>,
    sinks: Option<Arc<dyn SinkFactory>>,
    fonts: Option<FontBook>,
    observer: Option<Arc<dyn JobObserver>>,
}

impl RenderSessionBuilder {
    /// Replace the stroke animator entirely.
    pub fn animator(mut self, animator: Arc<dyn StrokeAnimator>) -> Self {
        self.animator = Some(animator);
        self
    }

    /// Keep the median animator but load stroke data from `source`.
    pub fn stroke_source(mut self, source: Arc<dyn StrokeSource>) -> Self {
        self.stroke_source = Some(source);
        self
    }

    /// Speech source used when audio is enabled.
    pub fn speech_source(mut self, source: Arc<dyn SpeechSource>) -> Self {
        self.speech = Some(source);
        self
    }

    pub fn sink_factory(mut self, sinks: Arc<dyn SinkFactory>) -> Self {
        self.sinks = Some(sinks);
        self
    }

    pub fn fonts(mut self, fonts: FontBook) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> StrokeResult<RenderSession> {
        let config = self.config;
        config.validate()?;

        let fonts = self
            .fonts
            .unwrap_or_else(|| FontBook::system(config.theme.fonts_dir.as_deref()));

        let animator: Arc<dyn StrokeAnimator> = match self.animator {
            Some(animator) => animator,
            None => {
                let source: Arc<dyn StrokeSource> = match self.stroke_source {
                    Some(source) => source,
                    None => match &config.strokes.data_dir {
                        Some(dir) => Arc::new(DirStrokeSource::new(dir.clone())),
                        None => Arc::new(HttpStrokeSource::new(config.strokes.cdn_url.clone())),
                    },
                };
                Arc::new(MedianAnimator::new(
                    Arc::new(StrokeCache::new(source)),
                    &config.strokes,
                    &config.theme,
                    fonts.clone(),
                )?)
            }
        };

        let fetcher = if config.audio.enabled {
            let source: Arc<dyn SpeechSource> = match self.speech {
                Some(source) => source,
                None => Arc::new(HttpSpeechSource::new(
                    config.audio.tts_url.clone(),
                    config.audio.lang.clone(),
                )),
            };
            Some(Arc::new(AudioFetcher::new(
                source,
                config.audio.sample_rate,
                config.audio.channels,
            )))
        } else {
            None
        };

        let sinks: Arc<dyn SinkFactory> = match self.sinks {
            Some(sinks) => sinks,
            None => Arc::new(FfmpegSinkFactory::new(FfmpegSinkOpts {
                format: config.encode.format,
                bg_rgba: parse_hex_rgba(&config.theme.background)?,
            })),
        };

        let env = JobEnv {
            animator,
            fetcher,
            sinks,
            observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
            fonts,
            theme: config.theme.clone(),
            timing: config.timing.clone(),
            paint_fps: config.paint_fps()?,
            capture_fps: config.capture_fps()?,
            animator_size: config.strokes.surface_size,
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
        };
        tracing::debug!(
            extension = env.sinks.extension(),
            audio = env.fetcher.is_some(),
            "render session ready"
        );
        Ok(RenderSession { config, env })
    }
}
