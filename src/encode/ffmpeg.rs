use crate::audio::decode::write_f32le;
use crate::config::VideoFormat;
use crate::encode::sink::{AudioLayout, FrameSink, SinkConfig, SinkFactory};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::surface::FrameRGBA;
use std::fs::File;
use std::io::{BufWriter, Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output container and codecs.
    pub format: VideoFormat,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    pub fn new(format: VideoFormat) -> Self {
        Self {
            format,
            bg_rgba: [255, 255, 255, 255],
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to stdin as they are captured.
///
/// Audio pushed during capture is spooled to a raw `f32le` file in a private temp dir and muxed
/// with the encoded video in a second `ffmpeg` pass when the sink ends. The finished file is
/// returned as a single chunk from [`FrameSink::end`].
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    workdir: Option<tempfile::TempDir>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    audio_spool: Option<BufWriter<File>>,
    audio_samples: u64,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            workdir: None,
            child: None,
            stdin: None,
            stderr_drain: None,
            audio_spool: None,
            audio_samples: 0,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    fn video_path(dir: &Path, format: VideoFormat) -> PathBuf {
        dir.join(format!("video.{}", format.extension()))
    }

    fn audio_path(dir: &Path) -> PathBuf {
        dir.join("audio.f32le")
    }

    fn muxed_path(dir: &Path, format: VideoFormat) -> PathBuf {
        dir.join(format!("muxed.{}", format.extension()))
    }

    fn wait_for_encoder(&mut self) -> StrokeResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| StrokeError::capture("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            StrokeError::capture(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StrokeError::capture("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| StrokeError::capture(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(StrokeError::capture(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Bytes of one raw RGBA8 frame piped to the encoder.
fn raw_frame_len(cfg: &SinkConfig) -> StrokeResult<usize> {
    Ok(Canvas::new(cfg.width, cfg.height)?.rgba_len())
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> StrokeResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(StrokeError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(StrokeError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(StrokeError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        let frame_len = raw_frame_len(&cfg)?;
        if let Some(audio) = cfg.audio
            && (audio.sample_rate == 0 || audio.channels == 0)
        {
            return Err(StrokeError::validation(
                "audio sample_rate/channels must be non-zero when audio is enabled",
            ));
        }
        if !is_ffmpeg_on_path() {
            return Err(StrokeError::capture(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let workdir = tempfile::Builder::new()
            .prefix("strokecast-")
            .tempdir()
            .map_err(|e| StrokeError::capture(format!("failed to create temp dir: {e}")))?;

        let audio_spool = match cfg.audio {
            Some(_) => {
                let file = File::create(Self::audio_path(workdir.path())).map_err(|e| {
                    StrokeError::capture(format!("failed to create audio spool: {e}"))
                })?;
                Some(BufWriter::new(file))
            }
            None => None,
        };

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Input: raw premultiplied RGBA8 frames. `ffmpeg` does not understand premul, so we
        // flatten alpha before writing to stdin (push_frame).
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an"]);
        cmd.args(video_codec_args(self.opts.format));
        cmd.arg(Self::video_path(workdir.path(), self.opts.format));

        let mut child = cmd.spawn().map_err(|e| {
            StrokeError::capture(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StrokeError::capture("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| StrokeError::capture("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.audio_spool = audio_spool;
        self.audio_samples = 0;
        self.scratch = vec![0u8; frame_len];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.workdir = Some(workdir);
        self.cfg = Some(cfg);
        self.last_idx = None;
        tracing::debug!(format = ?self.opts.format, "ffmpeg encoder started");
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StrokeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| StrokeError::capture("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(StrokeError::capture(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(StrokeError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(StrokeError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        // Flatten premultiplied RGBA8 over the configured background.
        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(StrokeError::capture("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            StrokeError::capture(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> StrokeResult<()> {
        let Some(spool) = self.audio_spool.as_mut() else {
            return Ok(());
        };
        write_f32le(spool, samples)
            .map_err(|e| StrokeError::capture(format!("failed to spool audio: {e}")))?;
        self.audio_samples += samples.len() as u64;
        Ok(())
    }

    fn take_chunk(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn end(&mut self) -> StrokeResult<Option<Vec<u8>>> {
        self.wait_for_encoder()?;
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| StrokeError::capture("ffmpeg sink not started"))?;
        let workdir = self
            .workdir
            .take()
            .ok_or_else(|| StrokeError::capture("ffmpeg sink lost its work dir"))?;
        if let Some(mut spool) = self.audio_spool.take() {
            spool
                .flush()
                .map_err(|e| StrokeError::capture(format!("failed to flush audio spool: {e}")))?;
        }

        let video = Self::video_path(workdir.path(), self.opts.format);
        let out_path = match cfg.audio {
            Some(layout) if self.audio_samples > 0 => {
                let muxed = Self::muxed_path(workdir.path(), self.opts.format);
                let audio = Self::audio_path(workdir.path());
                mux_audio(&video, &audio, layout, self.opts.format, &muxed)?;
                muxed
            }
            _ => video,
        };

        let bytes = std::fs::read(&out_path).map_err(|e| {
            StrokeError::capture(format!(
                "failed to read encoded file '{}': {e}",
                out_path.display()
            ))
        })?;
        tracing::debug!(bytes = bytes.len(), "ffmpeg encoding finished");
        Ok(Some(bytes))
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn video_codec_args(format: VideoFormat) -> &'static [&'static str] {
    match format {
        VideoFormat::Webm => &[
            "-c:v",
            "libvpx-vp9",
            "-pix_fmt",
            "yuv420p",
            "-deadline",
            "realtime",
            "-cpu-used",
            "8",
            "-row-mt",
            "1",
            "-b:v",
            "0",
            "-crf",
            "32",
        ],
        VideoFormat::Mp4 => &[
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-preset",
            "veryfast",
            "-movflags",
            "+faststart",
        ],
    }
}

fn audio_codec_args(format: VideoFormat) -> &'static [&'static str] {
    match format {
        VideoFormat::Webm => &["-c:a", "libopus", "-b:a", "96k"],
        VideoFormat::Mp4 => &["-c:a", "aac", "-b:a", "128k", "-movflags", "+faststart"],
    }
}

fn mux_audio(
    video: &Path,
    audio: &Path,
    layout: AudioLayout,
    format: VideoFormat,
    out: &Path,
) -> StrokeResult<()> {
    let output = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-i"])
        .arg(video)
        .args([
            "-f",
            "f32le",
            "-ar",
            &layout.sample_rate.to_string(),
            "-ac",
            &layout.channels.to_string(),
            "-i",
        ])
        .arg(audio)
        .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy"])
        .args(audio_codec_args(format))
        .arg("-shortest")
        .arg(out)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| StrokeError::capture(format!("failed to run ffmpeg mux pass: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StrokeError::capture(format!(
            "ffmpeg mux exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, use `-r` before `-i` to specify the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> StrokeResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(StrokeError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (s[0] as u16 + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (s[1] as u16 + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (s[2] as u16 + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Creates an [`FfmpegSink`] per job.
#[derive(Clone, Debug)]
pub struct FfmpegSinkFactory {
    opts: FfmpegSinkOpts,
}

impl FfmpegSinkFactory {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self { opts }
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn create(&self) -> StrokeResult<Box<dyn FrameSink>> {
        Ok(Box::new(FfmpegSink::new(self.opts.clone())))
    }

    fn extension(&self) -> &str {
        self.opts.format.extension()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
