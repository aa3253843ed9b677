//! hanzi-writer stroke data and where to get it from.

use crate::foundation::error::{StrokeError, StrokeResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Default public mirror of the hanzi-writer-data package.
pub const DEFAULT_STROKE_CDN: &str = "https://cdn.jsdelivr.net/npm/hanzi-writer-data@2.0";

/// Stroke data for one glyph in hanzi-writer's 1024-unit box (y up, baseline at 900).
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct GlyphStrokes {
    /// Outline of each stroke as SVG path data.
    pub strokes: Vec<String>,
    /// Center line of each stroke, in drawing direction.
    pub medians: Vec<Vec<[f64; 2]>>,
    /// Indices of strokes that belong to the radical.
    #[serde(rename = "radStrokes", default)]
    pub rad_strokes: Vec<usize>,
}

impl GlyphStrokes {
    pub fn from_json(glyph: char, bytes: &[u8]) -> StrokeResult<Self> {
        let data: Self = serde_json::from_slice(bytes)
            .map_err(|e| StrokeError::serde(format!("stroke data for '{glyph}': {e}")))?;
        if data.strokes.len() != data.medians.len() {
            return Err(StrokeError::serde(format!(
                "stroke data for '{glyph}' has {} outlines but {} medians",
                data.strokes.len(),
                data.medians.len()
            )));
        }
        if data.strokes.is_empty() {
            return Err(StrokeError::serde(format!(
                "stroke data for '{glyph}' has no strokes"
            )));
        }
        Ok(data)
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_radical(&self, stroke: usize) -> bool {
        self.rad_strokes.contains(&stroke)
    }

    /// Polyline length of a stroke's median.
    pub fn median_length(&self, stroke: usize) -> f64 {
        self.medians
            .get(stroke)
            .map(|pts| {
                pts.windows(2)
                    .map(|w| (w[1][0] - w[0][0]).hypot(w[1][1] - w[0][1]))
                    .sum()
            })
            .unwrap_or(0.0)
    }
}

/// Somewhere stroke data can be loaded from.
#[async_trait::async_trait]
pub trait StrokeSource: Send + Sync {
    async fn load(&self, glyph: char) -> StrokeResult<GlyphStrokes>;
}

/// Reads `<glyph>.json` files from a local directory.
#[derive(Clone, Debug)]
pub struct DirStrokeSource {
    root: PathBuf,
}

impl DirStrokeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl StrokeSource for DirStrokeSource {
    async fn load(&self, glyph: char) -> StrokeResult<GlyphStrokes> {
        let path = self.root.join(format!("{glyph}.json"));
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            StrokeError::animation(format!(
                "no stroke data for '{glyph}' at '{}': {e}",
                path.display()
            ))
        })?;
        GlyphStrokes::from_json(glyph, &bytes)
    }
}

/// Fetches `<base>/<glyph>.json` over HTTP.
#[derive(Clone, Debug)]
pub struct HttpStrokeSource {
    client: reqwest::Client,
    base: String,
}

impl HttpStrokeSource {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, glyph: char) -> String {
        format!("{}/{glyph}.json", self.base)
    }
}

impl Default for HttpStrokeSource {
    fn default() -> Self {
        Self::new(DEFAULT_STROKE_CDN)
    }
}

#[async_trait::async_trait]
impl StrokeSource for HttpStrokeSource {
    async fn load(&self, glyph: char) -> StrokeResult<GlyphStrokes> {
        let url = self.url_for(glyph);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StrokeError::animation(format!("fetch stroke data '{url}': {e}")))?;
        if !response.status().is_success() {
            return Err(StrokeError::animation(format!(
                "stroke data '{url}' returned status {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StrokeError::animation(format!("read stroke data '{url}': {e}")))?;
        GlyphStrokes::from_json(glyph, &bytes)
    }
}

/// Memoizing front for a [`StrokeSource`], shared by every job of a session.
pub struct StrokeCache {
    source: Arc<dyn StrokeSource>,
    entries: Mutex<HashMap<char, Arc<GlyphStrokes>>>,
}

impl StrokeCache {
    pub fn new(source: Arc<dyn StrokeSource>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached data for `glyph`, loading it on first use. Failures are not cached.
    pub async fn get(&self, glyph: char) -> StrokeResult<Arc<GlyphStrokes>> {
        if let Some(hit) = self.lookup(glyph) {
            return Ok(hit);
        }
        let loaded = Arc::new(self.source.load(glyph).await?);
        tracing::debug!(%glyph, strokes = loaded.stroke_count(), "stroke data loaded");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(glyph, loaded.clone());
        Ok(loaded)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, glyph: char) -> Option<Arc<GlyphStrokes>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&glyph)
            .cloned()
    }
}

impl std::fmt::Debug for StrokeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrokeCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/strokes.rs"]
mod tests;
