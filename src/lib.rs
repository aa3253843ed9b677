#![forbid(unsafe_code)]
//! Stroke-order video compositor.
//!
//! A [`RenderSession`] turns a [`RenderSpec`] (glyphs, transliteration, meaning) into an encoded
//! video: the animator draws each glyph stroke by stroke while a frame clock composites it into
//! a vocabulary card, a capture session records the card together with synthesized speech, and
//! batches of words are packed into one zip archive.

pub mod animation;
pub mod audio;
pub mod capture;
pub mod config;
pub mod encode;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod session;

pub use animation::animator::StrokeAnimator;
pub use animation::median::MedianAnimator;
pub use animation::strokes::{
    DirStrokeSource, GlyphStrokes, HttpStrokeSource, StrokeCache, StrokeSource,
};
pub use audio::decode::AudioPcm;
pub use audio::fetch::{AudioFetcher, HttpSpeechSource, SpeechSource};
pub use audio::graph::AudioGraph;
pub use capture::session::{CaptureSession, CaptureState};
pub use config::{BatchFailurePolicy, StudioConfig, VideoFormat};
pub use encode::ffmpeg::{FfmpegSink, FfmpegSinkFactory, FfmpegSinkOpts};
pub use encode::sink::{FrameLog, FrameSink, InMemorySink, InMemorySinkFactory, SinkFactory};
pub use foundation::core::{Canvas, Fps, FrameIndex};
pub use foundation::error::{StrokeError, StrokeResult};
pub use render::surface::{FrameRGBA, SharedSurface, Surface};
pub use render::svg::FontBook;
pub use scene::spec::{RenderSpec, WordEntry};
pub use scene::timeline::AnimationTimeline;
pub use session::RenderSession;
pub use session::batch::{BatchArchive, BatchCancel};
pub use session::job::{JobObserver, JobState};
pub use session::progress::ProgressCallback;
