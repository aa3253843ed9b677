#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use strokecast::audio::fetch::SpeechSource;
use strokecast::encode::sink::{FrameSink, SinkFactory};
use strokecast::render::surface::lock_surface;
use strokecast::{
    FontBook, InMemorySinkFactory, JobObserver, JobState, RenderSession, RenderSpec,
    SharedSurface, StrokeAnimator, StrokeError, StrokeResult, StudioConfig,
};

pub fn spec(word: &str, pinyin: &str) -> RenderSpec {
    RenderSpec {
        word: word.to_string(),
        pinyin: pinyin.to_string(),
        thai: String::new(),
        meaning: "test".to_string(),
        output_width: 64,
        output_height: 96,
    }
}

/// Takes `duration` per glyph and fills the surface halfway through.
pub struct FakeAnimator {
    pub duration: Duration,
    pub fail_on: Option<char>,
    pub calls: Mutex<Vec<char>>,
}

impl FakeAnimator {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(glyph: char) -> Self {
        Self {
            fail_on: Some(glyph),
            ..Self::new(Duration::from_millis(400))
        }
    }

    pub fn calls(&self) -> Vec<char> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StrokeAnimator for FakeAnimator {
    async fn animate(&self, glyph: char, surface: &SharedSurface) -> StrokeResult<()> {
        self.calls.lock().unwrap().push(glyph);
        if self.fail_on == Some(glyph) {
            return Err(StrokeError::animation(format!("no stroke data for '{glyph}'")));
        }
        tokio::time::sleep(self.duration / 2).await;
        lock_surface(surface).fill([0, 0, 0, 255]);
        tokio::time::sleep(self.duration / 2).await;
        Ok(())
    }
}

/// Returns a fixed WAV payload, or fails when there is none.
pub struct FakeSpeech {
    pub wav: Option<Vec<u8>>,
}

#[async_trait::async_trait]
impl SpeechSource for FakeSpeech {
    async fn synthesize(&self, _text: &str) -> StrokeResult<Vec<u8>> {
        self.wav
            .clone()
            .ok_or_else(|| StrokeError::audio("speech service unreachable"))
    }
}

/// Half-amplitude 440 Hz tone, mono 16-bit at 24 kHz.
pub fn tone_wav(secs: f32) -> Vec<u8> {
    let rate = 24_000u32;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let n = (secs * rate as f32) as u32;
        for i in 0..n {
            let t = i as f32 / rate as f32;
            let v = (t * 440.0 * std::f32::consts::TAU).sin() * 0.5;
            writer.write_sample((v * f32::from(i16::MAX)) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Records lifecycle events as `"{word} {event}"` strings.
#[derive(Default)]
pub struct EventLog {
    pub events: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    fn push(&self, spec: &RenderSpec, event: String) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{} {event}", spec.word));
    }
}

impl JobObserver for EventLog {
    fn on_transition(&self, spec: &RenderSpec, _from: JobState, to: JobState) {
        self.push(spec, format!("{to:?}"));
    }

    fn on_surfaces_attached(&self, spec: &RenderSpec) {
        self.push(spec, "attached".to_string());
    }

    fn on_teardown(&self, spec: &RenderSpec) {
        self.push(spec, "teardown".to_string());
    }
}

pub struct Harness {
    pub session: RenderSession,
    pub animator: Arc<FakeAnimator>,
    pub events: Arc<EventLog>,
}

pub fn harness(config: StudioConfig, animator: FakeAnimator, speech: FakeSpeech) -> Harness {
    harness_with_sinks(config, animator, speech, Arc::new(InMemorySinkFactory))
}

pub fn harness_with_sinks(
    config: StudioConfig,
    animator: FakeAnimator,
    speech: FakeSpeech,
    sinks: Arc<dyn SinkFactory>,
) -> Harness {
    let animator = Arc::new(animator);
    let events = Arc::new(EventLog::default());
    let session = RenderSession::builder(config)
        .animator(animator.clone())
        .speech_source(Arc::new(speech))
        .sink_factory(sinks)
        .fonts(FontBook::empty())
        .observer(events.clone())
        .build()
        .unwrap();
    Harness {
        session,
        animator,
        events,
    }
}

/// A factory whose encoder can never be created.
pub struct UnavailableSinks;

impl SinkFactory for UnavailableSinks {
    fn create(&self) -> StrokeResult<Box<dyn FrameSink>> {
        Err(StrokeError::capture("encoder unavailable"))
    }

    fn extension(&self) -> &str {
        "framelog"
    }
}

pub fn progress_recorder() -> (strokecast::ProgressCallback, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (Arc::new(move |f: f64| sink.lock().unwrap().push(f)), seen)
}
