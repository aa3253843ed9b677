//! Pull-based audio graph shared by a job and its capture sampler.
//!
//! The job starts voices with [`AudioGraph::play`]; the capture sampler pulls mixed PCM with
//! [`AudioGraph::render`] in lockstep with emitted video frames, so the graph's clock is the
//! capture timeline rather than wall time.

use crate::audio::decode::AudioPcm;
use crate::foundation::core::Fps;
use crate::foundation::error::{StrokeError, StrokeResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[derive(Debug)]
struct Voice {
    id: u64,
    pcm: Arc<AudioPcm>,
    /// Graph frame at which the voice started.
    start_frame: u64,
}

#[derive(Debug)]
struct GraphState {
    sample_rate: u32,
    channels: u16,
    /// Output frames rendered so far.
    cursor: u64,
    voices: Vec<Voice>,
    next_id: u64,
    closed: bool,
}

/// Mixer with an explicit sample rate and channel layout.
#[derive(Clone, Debug)]
pub struct AudioGraph {
    state: Arc<Mutex<GraphState>>,
}

impl AudioGraph {
    pub fn new(sample_rate: u32, channels: u16) -> StrokeResult<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(StrokeError::validation(
                "audio graph sample_rate/channels must be non-zero",
            ));
        }
        Ok(Self {
            state: Arc::new(Mutex::new(GraphState {
                sample_rate,
                channels,
                cursor: 0,
                voices: Vec::new(),
                next_id: 0,
                closed: false,
            })),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.lock().channels
    }

    /// Output frames rendered so far.
    pub fn position(&self) -> u64 {
        self.lock().cursor
    }

    pub fn active_voices(&self) -> usize {
        self.lock().voices.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Start `pcm` at the next rendered frame. The voice plays until it runs out or the
    /// returned handle is stopped or dropped.
    pub fn play(&self, pcm: Arc<AudioPcm>) -> StrokeResult<PlaybackHandle> {
        let mut st = self.lock();
        if st.closed {
            return Err(StrokeError::audio("audio graph is closed"));
        }
        if pcm.channels == 0 || pcm.sample_rate == 0 {
            return Err(StrokeError::audio("pcm has zero channels or sample rate"));
        }
        let id = st.next_id;
        st.next_id += 1;
        let start_frame = st.cursor;
        st.voices.push(Voice {
            id,
            pcm,
            start_frame,
        });
        tracing::debug!(voice = id, start_frame, "audio voice started");
        Ok(PlaybackHandle {
            id,
            graph: Arc::downgrade(&self.state),
        })
    }

    /// Mix the next `frames` output frames and advance the graph clock.
    ///
    /// Returns `frames * channels` interleaved samples; silence when nothing plays or the graph
    /// is closed.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut st = self.lock();
        let channels = usize::from(st.channels);
        let mut out = vec![0.0f32; frames * channels];
        if st.closed {
            return out;
        }

        let first = st.cursor;
        for voice in &st.voices {
            mix_voice(&mut out, voice, first, st.sample_rate, st.channels);
        }
        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }

        st.cursor += frames as u64;
        let cursor = st.cursor;
        let rate = st.sample_rate;
        st.voices.retain(|v| !voice_finished(v, cursor, rate));
        out
    }

    /// Stop every voice and refuse new ones. Idempotent.
    pub fn close(&self) {
        let mut st = self.lock();
        if !st.closed {
            st.closed = true;
            st.voices.clear();
            tracing::debug!("audio graph closed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ownership of one playing voice.
#[derive(Debug)]
pub struct PlaybackHandle {
    id: u64,
    graph: Weak<Mutex<GraphState>>,
}

impl PlaybackHandle {
    /// `true` while the voice still has samples left to play.
    pub fn is_playing(&self) -> bool {
        self.graph.upgrade().is_some_and(|state| {
            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .voices
                .iter()
                .any(|v| v.id == self.id)
        })
    }

    /// Release the voice now. Dropping the handle does the same.
    pub fn stop(self) {}
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        if let Some(state) = self.graph.upgrade() {
            let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
            st.voices.retain(|v| v.id != self.id);
        }
    }
}

fn source_pos(voice: &Voice, dst_frame: u64, rate: u32) -> f64 {
    let rel = dst_frame.saturating_sub(voice.start_frame) as f64 / f64::from(rate);
    rel * f64::from(voice.pcm.sample_rate)
}

fn voice_finished(voice: &Voice, cursor: u64, rate: u32) -> bool {
    source_pos(voice, cursor, rate) >= voice.pcm.frames() as f64
}

fn mix_voice(out: &mut [f32], voice: &Voice, first: u64, rate: u32, channels: u16) {
    let src = voice.pcm.interleaved_f32.as_slice();
    let src_channels = usize::from(voice.pcm.channels);
    let src_frames = voice.pcm.frames();
    if src_frames == 0 {
        return;
    }
    let channels = usize::from(channels);

    for (i, frame) in out.chunks_exact_mut(channels).enumerate() {
        let dst_frame = first + i as u64;
        if dst_frame < voice.start_frame {
            continue;
        }
        let src_pos = source_pos(voice, dst_frame, rate);
        let src_frame0 = src_pos.floor() as usize;
        if src_frame0 >= src_frames {
            break;
        }
        let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
        let frac = (src_pos - src_frame0 as f64) as f32;

        let (l, r) = if src_channels == 1 {
            let v0 = src[src_frame0];
            let v1 = src[src_frame1];
            let v = v0 + ((v1 - v0) * frac);
            (v, v)
        } else {
            let i0 = src_frame0 * src_channels;
            let i1 = src_frame1 * src_channels;
            let (l0, l1) = (src[i0], src[i1]);
            let (r0, r1) = (src[i0 + 1], src[i1 + 1]);
            (l0 + ((l1 - l0) * frac), r0 + ((r1 - r0) * frac))
        };

        frame[0] += l;
        if channels > 1 {
            frame[1] += r;
        }
    }
}

/// Convert a frame delta to the nearest sample index at `sample_rate`.
pub fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/graph.rs"]
mod tests;
