use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::foundation::math::Fnv1a64;
use crate::render::surface::FrameRGBA;
use std::fmt::Write as _;

/// Configuration provided to a [`FrameSink`] when capture starts.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Capture frames-per-second.
    pub fps: Fps,
    /// Layout of the PCM passed to `push_audio`, when audio is captured.
    pub audio: Option<AudioLayout>,
}

/// Interleaved `f32` PCM layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioLayout {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Encoder contract for the capture session.
///
/// Ordering contract: `push_frame` is called with strictly increasing `FrameIndex`, and
/// `push_audio` after each frame with exactly that frame's share of samples. Encoded output is
/// handed back in chunks, either as it becomes available through `take_chunk` or as a final
/// chunk from `end`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> StrokeResult<()>;
    /// Push one frame in strictly increasing order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StrokeResult<()>;
    /// Push interleaved audio for the most recent frame.
    fn push_audio(&mut self, samples: &[f32]) -> StrokeResult<()>;
    /// Encoded bytes produced since the last call, if any.
    fn take_chunk(&mut self) -> Option<Vec<u8>>;
    /// Flush and finish. May block until the encoder exits.
    fn end(&mut self) -> StrokeResult<Option<Vec<u8>>>;
}

/// Creates one fresh sink per job.
pub trait SinkFactory: Send + Sync {
    fn create(&self) -> StrokeResult<Box<dyn FrameSink>>;
    /// File extension of the media this factory's sinks produce.
    fn extension(&self) -> &str;
}

const LOG_MAGIC: &str = "STROKECAST-FRAMELOG 1";

/// In-memory sink for tests and debugging.
///
/// Instead of encoding it emits a line-oriented frame log: a header, one `F` record per frame
/// carrying an FNV-1a fingerprint of the pixels, one `A` record per audio push, and an `END`
/// trailer. [`FrameLog::parse`] reads it back.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    pending: String,
    last_idx: Option<FrameIndex>,
    frames: u64,
    audio_samples: u64,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> StrokeResult<()> {
        let audio = match cfg.audio {
            Some(a) => format!("{}x{}", a.sample_rate, a.channels),
            None => "none".to_string(),
        };
        self.pending.clear();
        let _ = writeln!(
            self.pending,
            "{LOG_MAGIC} {}x{} {}/{} {audio}",
            cfg.width, cfg.height, cfg.fps.num, cfg.fps.den
        );
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames = 0;
        self.audio_samples = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StrokeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| StrokeError::capture("in-memory sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(StrokeError::capture(
                "in-memory sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(StrokeError::capture(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        self.last_idx = Some(idx);
        self.frames += 1;

        let mut h = Fnv1a64::new_default();
        h.write_bytes(&frame.data);
        let _ = writeln!(self.pending, "F {} {:016x}", idx.0, h.finish());
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> StrokeResult<()> {
        if self.cfg.is_none() {
            return Err(StrokeError::capture("in-memory sink not started"));
        }
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        self.audio_samples += samples.len() as u64;
        let _ = writeln!(self.pending, "A {} {peak:.6}", samples.len());
        Ok(())
    }

    fn take_chunk(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.pending).into_bytes())
    }

    fn end(&mut self) -> StrokeResult<Option<Vec<u8>>> {
        if self.cfg.take().is_none() {
            return Err(StrokeError::capture("in-memory sink not started"));
        }
        let _ = writeln!(self.pending, "END {} {}", self.frames, self.audio_samples);
        Ok(self.take_chunk())
    }
}

/// Factory for [`InMemorySink`]s.
#[derive(Clone, Debug, Default)]
pub struct InMemorySinkFactory;

impl SinkFactory for InMemorySinkFactory {
    fn create(&self) -> StrokeResult<Box<dyn FrameSink>> {
        Ok(Box::new(InMemorySink::new()))
    }

    fn extension(&self) -> &str {
        "framelog"
    }
}

/// Parsed [`InMemorySink`] output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameLog {
    pub width: u32,
    pub height: u32,
    pub fps: Option<Fps>,
    pub audio: Option<AudioLayout>,
    /// `(frame index, pixel fingerprint)` in push order.
    pub frames: Vec<(u64, u64)>,
    /// Sample count and peak magnitude of each audio push.
    pub audio_pushes: Vec<(usize, f32)>,
    /// Whether the `END` trailer was present.
    pub complete: bool,
}

impl FrameLog {
    pub fn parse(bytes: &[u8]) -> StrokeResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| StrokeError::serde(format!("frame log is not utf-8: {e}")))?;
        let bad = |line: &str| StrokeError::serde(format!("malformed frame log line '{line}'"));

        let mut lines = text.lines();
        let header = lines.next().ok_or_else(|| bad(""))?;
        let rest = header.strip_prefix(LOG_MAGIC).ok_or_else(|| bad(header))?;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        let [size, fps, audio] = fields[..] else {
            return Err(bad(header));
        };

        let mut log = FrameLog::default();
        let (w, h) = size.split_once('x').ok_or_else(|| bad(header))?;
        log.width = w.parse().map_err(|_| bad(header))?;
        log.height = h.parse().map_err(|_| bad(header))?;
        let (num, den) = fps.split_once('/').ok_or_else(|| bad(header))?;
        log.fps = Some(Fps::new(
            num.parse().map_err(|_| bad(header))?,
            den.parse().map_err(|_| bad(header))?,
        )?);
        if audio != "none" {
            let (rate, ch) = audio.split_once('x').ok_or_else(|| bad(header))?;
            log.audio = Some(AudioLayout {
                sample_rate: rate.parse().map_err(|_| bad(header))?,
                channels: ch.parse().map_err(|_| bad(header))?,
            });
        }

        for line in lines {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[..] {
                ["F", idx, fp] => log.frames.push((
                    idx.parse().map_err(|_| bad(line))?,
                    u64::from_str_radix(fp, 16).map_err(|_| bad(line))?,
                )),
                ["A", n, peak] => log.audio_pushes.push((
                    n.parse().map_err(|_| bad(line))?,
                    peak.parse().map_err(|_| bad(line))?,
                )),
                ["END", _, _] => log.complete = true,
                _ => return Err(bad(line)),
            }
        }
        Ok(log)
    }

    /// `true` when no audio push carried a non-zero sample.
    pub fn is_silent(&self) -> bool {
        self.audio_pushes.iter().all(|&(_, peak)| peak == 0.0)
    }

    pub fn total_audio_samples(&self) -> usize {
        self.audio_pushes.iter().map(|&(n, _)| n).sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
