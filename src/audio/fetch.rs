use crate::audio::decode::{AudioPcm, decode_audio};
use crate::foundation::error::{StrokeError, StrokeResult};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Produces encoded speech audio for a piece of text.
#[async_trait::async_trait]
pub trait SpeechSource: Send + Sync {
    async fn synthesize(&self, text: &str) -> StrokeResult<Vec<u8>>;
}

/// Text-to-speech proxy reached with `GET <url>?text=<text>&lang=<lang>`.
#[derive(Clone, Debug)]
pub struct HttpSpeechSource {
    client: reqwest::Client,
    url: String,
    lang: String,
}

impl HttpSpeechSource {
    pub fn new(url: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            lang: lang.into(),
        }
    }

    pub fn request_url(&self, text: &str) -> StrokeResult<reqwest::Url> {
        let params = [("text", text), ("lang", self.lang.as_str())];
        reqwest::Url::parse_with_params(&self.url, params)
            .map_err(|e| StrokeError::audio(format!("invalid tts url '{}': {e}", self.url)))
    }
}

#[async_trait::async_trait]
impl SpeechSource for HttpSpeechSource {
    async fn synthesize(&self, text: &str) -> StrokeResult<Vec<u8>> {
        let url = self.request_url(text)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StrokeError::audio(format!("tts request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(StrokeError::audio(format!(
                "tts proxy returned status {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StrokeError::audio(format!("failed to read tts response: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Fetches and decodes speech for a job. Never fails: a job without audio is still a job.
pub struct AudioFetcher {
    source: Arc<dyn SpeechSource>,
    sample_rate: u32,
    channels: u16,
}

impl AudioFetcher {
    /// `sample_rate`/`channels` describe the graph the audio will play through.
    pub fn new(source: Arc<dyn SpeechSource>, sample_rate: u32, channels: u16) -> Self {
        Self {
            source,
            sample_rate,
            channels,
        }
    }

    /// Speech for `text`, or `None` when it could not be produced.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_audio(&self, text: &str) -> Option<AudioPcm> {
        if text.trim().is_empty() {
            return None;
        }
        match self.try_fetch(text).await {
            Ok(pcm) if pcm.is_empty() => {
                tracing::warn!("speech audio decoded to zero samples");
                None
            }
            Ok(pcm) => {
                tracing::debug!(
                    sample_rate = pcm.sample_rate,
                    channels = pcm.channels,
                    secs = pcm.duration().as_secs_f64(),
                    "speech audio ready"
                );
                Some(pcm)
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech audio unavailable, continuing without audio");
                None
            }
        }
    }

    /// Start [`Self::fetch_audio`] in the background.
    pub fn spawn_fetch(self: &Arc<Self>, text: String) -> JoinHandle<Option<AudioPcm>> {
        let fetcher = Arc::clone(self);
        tokio::spawn(async move { fetcher.fetch_audio(&text).await })
    }

    async fn try_fetch(&self, text: &str) -> StrokeResult<AudioPcm> {
        let bytes = self.source.synthesize(text).await?;
        decode_audio(bytes, self.sample_rate, self.channels).await
    }
}

impl std::fmt::Debug for AudioFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFetcher")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/fetch.rs"]
mod tests;
