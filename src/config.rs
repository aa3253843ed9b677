//! Studio configuration.
//!
//! Every section uses `#[serde(default)]`, so a TOML file only has to name the values it
//! changes. Environment overrides (`STROKECAST_*`) are applied on top of the file.

use crate::animation::strokes::DEFAULT_STROKE_CDN;
use crate::foundation::core::{Canvas, Fps, parse_hex_rgba};
use crate::foundation::error::{StrokeError, StrokeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StudioConfig {
    pub output: OutputConfig,
    pub timing: TimingConfig,
    pub audio: AudioConfig,
    pub strokes: StrokeConfig,
    pub theme: ThemeConfig,
    pub encode: EncodeConfig,
    pub batch: BatchConfig,
}

/// Output surface and clock rates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    /// Frame clock rate for the paint loop.
    pub paint_fps: u32,
    /// Sampling rate of the capture session.
    pub capture_fps: u32,
}

/// Fixed pauses of the job state machine plus the per-glyph budget used for progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub head_ms: u64,
    pub pre_glyph_ms: u64,
    pub post_glyph_ms: u64,
    /// Expected animation time of one glyph. Only feeds the progress estimate.
    pub glyph_budget_ms: u64,
    pub empty_timeline_ms: u64,
    pub tail_ms: u64,
    /// Delay between recording start and audio playback start.
    pub audio_delay_ms: u64,
    pub progress_interval_ms: u64,
}

/// Speech synthesis and audio graph settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub tts_url: String,
    pub lang: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Stroke data location and animation pacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrokeConfig {
    /// Local directory of `<glyph>.json` files. Takes precedence over `cdn_url`.
    pub data_dir: Option<PathBuf>,
    pub cdn_url: String,
    /// Edge length of the square animator surface.
    pub surface_size: u32,
    pub speed: f64,
    pub delay_between_strokes_ms: u64,
    pub frame_rate: u32,
}

/// Colors and fonts of the composited frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub background: String,
    pub container: String,
    pub container_border: String,
    pub stroke: String,
    pub radical: String,
    pub outline: String,
    pub text: String,
    pub subtext: String,
    pub font_family: String,
    /// Extra font files (`.ttf`, `.otf`, `.ttc`) loaded next to the system fonts.
    pub fonts_dir: Option<PathBuf>,
}

/// Container format produced by the ffmpeg sink.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    /// VP9 video with Opus audio.
    #[default]
    Webm,
    /// H.264 video with AAC audio.
    Mp4,
}

impl VideoFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EncodeConfig {
    pub format: VideoFormat,
}

/// What a batch does when one entry fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatchFailurePolicy {
    /// Log the failure and continue with the next entry.
    #[default]
    Skip,
    /// Stop the batch and return the error.
    Abort,
}

/// Batch settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BatchConfig {
    pub failure_policy: BatchFailurePolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 720,
            height: 1280,
            paint_fps: 60,
            capture_fps: 30,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            head_ms: 300,
            pre_glyph_ms: 300,
            post_glyph_ms: 300,
            glyph_budget_ms: 2_400,
            empty_timeline_ms: 2_000,
            tail_ms: 500,
            audio_delay_ms: 200,
            progress_interval_ms: 50,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tts_url: "http://127.0.0.1:3000/api/tts".to_string(),
            lang: "zh-CN".to_string(),
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            cdn_url: DEFAULT_STROKE_CDN.to_string(),
            surface_size: 500,
            speed: 1.0,
            delay_between_strokes_ms: 50,
            frame_rate: 60,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            background: "#f1f5f9".to_string(),
            container: "#ffffff".to_string(),
            container_border: "#cbd5e1".to_string(),
            stroke: "#000000".to_string(),
            radical: "#168F16".to_string(),
            outline: "#dddddd".to_string(),
            text: "#1e293b".to_string(),
            subtext: "#475569".to_string(),
            font_family: "sans-serif".to_string(),
            fonts_dir: None,
        }
    }
}

impl TimingConfig {
    pub fn head(&self) -> Duration {
        Duration::from_millis(self.head_ms)
    }

    pub fn pre_glyph(&self) -> Duration {
        Duration::from_millis(self.pre_glyph_ms)
    }

    pub fn post_glyph(&self) -> Duration {
        Duration::from_millis(self.post_glyph_ms)
    }

    pub fn glyph_budget(&self) -> Duration {
        Duration::from_millis(self.glyph_budget_ms)
    }

    pub fn empty_timeline(&self) -> Duration {
        Duration::from_millis(self.empty_timeline_ms)
    }

    pub fn tail(&self) -> Duration {
        Duration::from_millis(self.tail_ms)
    }

    pub fn audio_delay(&self) -> Duration {
        Duration::from_millis(self.audio_delay_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl StudioConfig {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context as _;
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let config: StudioConfig = toml::from_str(&contents)
            .with_context(|| format!("parse config '{}'", path.display()))?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file does not exist.
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply environment variable overrides.
    ///
    /// - `STROKECAST_TTS_URL` -> `audio.tts_url`
    /// - `STROKECAST_LANG` -> `audio.lang`
    /// - `STROKECAST_STROKE_DIR` -> `strokes.data_dir`
    /// - `STROKECAST_FONTS_DIR` -> `theme.fonts_dir`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("STROKECAST_TTS_URL")
            && !url.is_empty()
        {
            self.audio.tts_url = url;
        }
        if let Ok(lang) = std::env::var("STROKECAST_LANG")
            && !lang.is_empty()
        {
            self.audio.lang = lang;
        }
        if let Ok(dir) = std::env::var("STROKECAST_STROKE_DIR")
            && !dir.is_empty()
        {
            self.strokes.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("STROKECAST_FONTS_DIR")
            && !dir.is_empty()
        {
            self.theme.fonts_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Default output canvas.
    pub fn canvas(&self) -> StrokeResult<Canvas> {
        Canvas::new(self.output.width, self.output.height)
    }

    pub fn paint_fps(&self) -> StrokeResult<Fps> {
        Fps::whole(self.output.paint_fps)
    }

    pub fn capture_fps(&self) -> StrokeResult<Fps> {
        Fps::whole(self.output.capture_fps)
    }

    /// Check values that would otherwise fail deep inside a job.
    pub fn validate(&self) -> StrokeResult<()> {
        self.canvas()?;
        self.paint_fps()?;
        self.capture_fps()?;
        Fps::whole(self.strokes.frame_rate)?;
        if self.strokes.surface_size == 0 {
            return Err(StrokeError::validation("strokes.surface_size must be non-zero"));
        }
        if !(self.strokes.speed.is_finite() && self.strokes.speed > 0.0) {
            return Err(StrokeError::validation("strokes.speed must be positive"));
        }
        if self.audio.sample_rate == 0 || self.audio.channels == 0 {
            return Err(StrokeError::validation(
                "audio sample_rate/channels must be non-zero",
            ));
        }
        if self.timing.progress_interval_ms == 0 {
            return Err(StrokeError::validation(
                "timing.progress_interval_ms must be non-zero",
            ));
        }
        for color in [
            &self.theme.background,
            &self.theme.container,
            &self.theme.container_border,
            &self.theme.stroke,
            &self.theme.radical,
            &self.theme.outline,
            &self.theme.text,
            &self.theme.subtext,
        ] {
            parse_hex_rgba(color)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
