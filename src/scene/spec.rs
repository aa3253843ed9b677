use crate::foundation::core::Canvas;
use crate::foundation::error::{StrokeError, StrokeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One vocabulary entry as it appears in word lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    /// The word itself: one or more script glyphs, possibly with punctuation.
    #[serde(rename = "char")]
    pub word: String,
    #[serde(default)]
    pub pinyin: String,
    #[serde(default)]
    pub thai: String,
    #[serde(default)]
    pub meaning: String,
}

impl WordEntry {
    /// Load a JSON array of entries.
    pub fn load_list(path: &Path) -> StrokeResult<Vec<Self>> {
        use anyhow::Context as _;
        let bytes = std::fs::read(path)
            .with_context(|| format!("read word list '{}'", path.display()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            StrokeError::serde(format!("word list '{}': {e}", path.display()))
        })
    }
}

/// Everything one compositor job needs to know about its output.
///
/// Immutable for the lifetime of the job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSpec {
    #[serde(rename = "char")]
    pub word: String,
    #[serde(default)]
    pub pinyin: String,
    #[serde(default)]
    pub thai: String,
    #[serde(default)]
    pub meaning: String,
    pub output_width: u32,
    pub output_height: u32,
}

impl RenderSpec {
    pub fn from_entry(entry: WordEntry, canvas: Canvas) -> Self {
        Self {
            word: entry.word,
            pinyin: entry.pinyin,
            thai: entry.thai,
            meaning: entry.meaning,
            output_width: canvas.width,
            output_height: canvas.height,
        }
    }

    /// Output dimensions, validated for the yuv420p encoders (non-zero and even).
    pub fn canvas(&self) -> StrokeResult<Canvas> {
        let canvas = Canvas::new(self.output_width, self.output_height)?;
        if !canvas.width.is_multiple_of(2) || !canvas.height.is_multiple_of(2) {
            return Err(StrokeError::validation(
                "output width/height must be even (required for yuv420p output)",
            ));
        }
        Ok(canvas)
    }

    pub fn validate(&self) -> StrokeResult<()> {
        self.canvas().map(|_| ())
    }

    /// Second text line under the glyphs: `"{pinyin} - {thai}"`.
    pub fn transliteration_line(&self) -> String {
        match (self.pinyin.is_empty(), self.thai.is_empty()) {
            (false, false) => format!("{} - {}", self.pinyin, self.thai),
            (false, true) => self.pinyin.clone(),
            (true, false) => self.thai.clone(),
            (true, true) => String::new(),
        }
    }

    /// Archive entry name `{glyph}_{transliteration}.{ext}`.
    ///
    /// Path separators, whitespace and control characters become `_`.
    pub fn file_stem(&self) -> String {
        let glyph = sanitize_name_part(&self.word);
        let translit = sanitize_name_part(&self.pinyin);
        match (glyph.is_empty(), translit.is_empty()) {
            (false, false) => format!("{glyph}_{translit}"),
            (false, true) => glyph,
            (true, false) => translit,
            (true, true) => "untitled".to_string(),
        }
    }
}

fn sanitize_name_part(s: &str) -> String {
    let mapped: String = s
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    mapped.trim_matches('.').to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/scene/spec.rs"]
mod tests;
