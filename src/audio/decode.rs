use crate::foundation::error::{StrokeError, StrokeResult};
use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt as _;

/// Decoded interleaved `f32` PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Interleaved samples in `[-1.0, 1.0]`.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// `true` for a RIFF/WAVE header.
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Decode a WAV payload at its native rate and channel count.
pub fn decode_wav(bytes: &[u8]) -> StrokeResult<AudioPcm> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| StrokeError::audio(format!("failed to parse wav: {e}")))?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(StrokeError::audio("wav has zero channels or sample rate"));
    }

    let interleaved_f32 = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StrokeError::audio(format!("failed to read wav samples: {e}")))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StrokeError::audio(format!("failed to read wav samples: {e}")))?
        }
    };

    Ok(AudioPcm {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        interleaved_f32,
    })
}

/// Decode any container `ffmpeg` understands into `f32le` at the requested layout.
pub async fn decode_with_ffmpeg(
    bytes: Vec<u8>,
    sample_rate: u32,
    channels: u16,
) -> StrokeResult<AudioPcm> {
    let mut child = tokio::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i", "pipe:0", "-vn", "-f", "f32le"])
        .args(["-acodec", "pcm_f32le", "-ac", &channels.to_string()])
        .args(["-ar", &sample_rate.to_string(), "pipe:1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| StrokeError::audio(format!("failed to run ffmpeg for audio decode: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| StrokeError::audio("failed to open ffmpeg stdin (unexpected)"))?;
    // ffmpeg may stop reading early; a broken pipe here shows up as a failed exit below.
    let feeder = tokio::spawn(async move {
        let _ = stdin.write_all(&bytes).await;
    });

    let out = child
        .wait_with_output()
        .await
        .map_err(|e| StrokeError::audio(format!("failed to wait for ffmpeg: {e}")))?;
    let _ = feeder.await;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        return Err(StrokeError::audio(format!(
            "ffmpeg audio decode failed: {}",
            msg.trim()
        )));
    }
    if !out.stdout.len().is_multiple_of(4) {
        return Err(StrokeError::audio(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }

    let interleaved_f32 = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(AudioPcm {
        sample_rate,
        channels,
        interleaved_f32,
    })
}

/// WAV through `hound`, everything else through `ffmpeg`.
pub async fn decode_audio(
    bytes: Vec<u8>,
    sample_rate: u32,
    channels: u16,
) -> StrokeResult<AudioPcm> {
    if bytes.is_empty() {
        return Err(StrokeError::audio("empty audio payload"));
    }
    if is_wav(&bytes) {
        return decode_wav(&bytes);
    }
    decode_with_ffmpeg(bytes, sample_rate, channels).await
}

/// Append interleaved `f32` PCM samples as raw little-endian bytes.
pub fn write_f32le<W: std::io::Write>(
    out: &mut W,
    samples_interleaved: &[f32],
) -> std::io::Result<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    out.write_all(&bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/decode.rs"]
mod tests;
