use crate::animation::animator::StrokeAnimator;
use crate::animation::strokes::{GlyphStrokes, StrokeCache};
use crate::config::{StrokeConfig, ThemeConfig};
use crate::foundation::core::{Canvas, Fps, parse_hex_rgba};
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::render::surface::{SharedSurface, lock_surface};
use crate::render::svg::{FontBook, escape_xml, rasterize_svg};
use std::sync::Arc;
use std::time::Duration;

/// Side of the stroke-data box.
const GLYPH_BOX: f64 = 1024.0;
/// Stroke data is y-up with the baseline at this height.
const GLYPH_BASELINE: f64 = 900.0;
/// Width of the brush that reveals the active stroke, in glyph units.
const BRUSH_WIDTH: f64 = 200.0;

/// Colors used for one glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrokePalette {
    pub stroke: String,
    pub radical: String,
    pub outline: String,
}

impl StrokePalette {
    pub fn from_theme(theme: &ThemeConfig) -> StrokeResult<Self> {
        for color in [&theme.stroke, &theme.radical, &theme.outline] {
            parse_hex_rgba(color)?;
        }
        Ok(Self {
            stroke: theme.stroke.clone(),
            radical: theme.radical.clone(),
            outline: theme.outline.clone(),
        })
    }
}

/// Where the active stroke is in its reveal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveStroke {
    pub index: usize,
    /// Revealed share of the median, `0.0..=1.0`.
    pub progress: f64,
}

/// Replays hanzi-writer stroke data: outlines first, then each stroke revealed along its
/// median by a thick round brush clipped to the stroke outline.
pub struct MedianAnimator {
    strokes: Arc<StrokeCache>,
    palette: StrokePalette,
    fonts: FontBook,
    speed: f64,
    stroke_delay: Duration,
    padding: f64,
    frame_interval: Duration,
}

impl MedianAnimator {
    pub fn new(
        strokes: Arc<StrokeCache>,
        cfg: &StrokeConfig,
        theme: &ThemeConfig,
        fonts: FontBook,
    ) -> StrokeResult<Self> {
        if !(cfg.speed.is_finite() && cfg.speed > 0.0) {
            return Err(StrokeError::validation("stroke speed must be > 0"));
        }
        Ok(Self {
            strokes,
            palette: StrokePalette::from_theme(theme)?,
            fonts,
            speed: cfg.speed,
            stroke_delay: Duration::from_millis(cfg.delay_between_strokes_ms),
            padding: f64::from(cfg.surface_size) / 30.0,
            frame_interval: Fps::whole(cfg.frame_rate)?.frame_interval(),
        })
    }

    /// Time taken to reveal one stroke.
    pub fn stroke_duration(&self, median_length: f64) -> Duration {
        let ms = (median_length + 600.0) / (3.0 * self.speed);
        Duration::from_secs_f64(ms.max(0.0) / 1000.0)
    }

    /// Total time to animate `data`, including the gaps between strokes.
    pub fn glyph_duration(&self, data: &GlyphStrokes) -> Duration {
        let strokes: Duration = (0..data.stroke_count())
            .map(|i| self.stroke_duration(data.median_length(i)))
            .sum();
        let gaps = self.stroke_delay * data.stroke_count().saturating_sub(1) as u32;
        strokes + gaps
    }

    async fn reveal_stroke(
        &self,
        data: &GlyphStrokes,
        index: usize,
        surface: &SharedSurface,
        canvas: Canvas,
    ) -> StrokeResult<()> {
        let duration = self.stroke_duration(data.median_length(index));
        let start = tokio::time::Instant::now();
        loop {
            let elapsed = start.elapsed();
            let progress = if duration.is_zero() {
                1.0
            } else {
                (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
            };
            self.paint(data, Some(ActiveStroke { index, progress }), surface, canvas)
                .await?;
            if progress >= 1.0 {
                return Ok(());
            }
            let wait = self
                .frame_interval
                .min(duration.saturating_sub(elapsed))
                .max(Duration::from_millis(1));
            tokio::time::sleep(wait).await;
        }
    }

    /// Rasterize one frame on the blocking pool, then copy it onto `surface`.
    async fn paint(
        &self,
        data: &GlyphStrokes,
        active: Option<ActiveStroke>,
        surface: &SharedSurface,
        canvas: Canvas,
    ) -> StrokeResult<()> {
        let svg = glyph_frame_svg(data, active, &self.palette, canvas, self.padding);
        let fonts = self.fonts.clone();
        let frame = tokio::task::spawn_blocking(move || rasterize_svg(&svg, canvas, &fonts))
            .await
            .map_err(|e| StrokeError::animation(format!("stroke frame task panicked: {e}")))?
            .map_err(|e| StrokeError::animation(format!("draw stroke frame: {e}")))?;
        let mut guard = lock_surface(surface);
        guard.copy_from(&frame)
    }
}

#[async_trait::async_trait]
impl StrokeAnimator for MedianAnimator {
    #[tracing::instrument(skip(self, surface))]
    async fn animate(&self, glyph: char, surface: &SharedSurface) -> StrokeResult<()> {
        let data = self.strokes.get(glyph).await?;
        let canvas = lock_surface(surface).canvas();

        for index in 0..data.stroke_count() {
            if index > 0 && !self.stroke_delay.is_zero() {
                tokio::time::sleep(self.stroke_delay).await;
            }
            self.reveal_stroke(&data, index, surface, canvas).await?;
        }
        self.paint(&data, None, surface, canvas).await?;
        tracing::debug!(strokes = data.stroke_count(), "glyph animated");
        Ok(())
    }

    async fn draw_complete(&self, glyph: char, surface: &SharedSurface) -> StrokeResult<()> {
        let data = self.strokes.get(glyph).await?;
        let canvas = lock_surface(surface).canvas();
        self.paint(&data, None, surface, canvas).await
    }
}

/// One animation frame as an SVG document of `canvas` size.
///
/// Strokes before `active.index` are filled. With no active stroke every stroke is filled.
pub fn glyph_frame_svg(
    data: &GlyphStrokes,
    active: Option<ActiveStroke>,
    palette: &StrokePalette,
    canvas: Canvas,
    padding: f64,
) -> String {
    let w = canvas.width;
    let h = canvas.height;
    let side = f64::from(w.min(h));
    let scale = ((side - 2.0 * padding) / GLYPH_BOX).max(0.0);
    let ox = (f64::from(w) - side) / 2.0 + padding;
    let oy = (f64::from(h) - side) / 2.0 + padding;
    let filled = active.map_or(data.stroke_count(), |a| a.index);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let outlines: Vec<String> = data.strokes.iter().map(|d| escape_xml(d)).collect();
    if let Some(a) = active
        && let Some(outline) = outlines.get(a.index)
    {
        svg.push_str(&format!(
            r#"<defs><clipPath id="active"><path d="{outline}"/></clipPath></defs>"#
        ));
    }
    svg.push_str(&format!(
        r#"<g transform="translate({ox:.3} {oy:.3}) scale({scale:.6}) translate(0 {GLYPH_BASELINE}) scale(1 -1)">"#
    ));

    for outline in &outlines {
        svg.push_str(&format!(r#"<path d="{outline}" fill="{}"/>"#, palette.outline));
    }
    for (i, outline) in outlines.iter().enumerate().take(filled) {
        svg.push_str(&format!(
            r#"<path d="{outline}" fill="{}"/>"#,
            stroke_color(data, i, palette)
        ));
    }

    if let Some(a) = active
        && let Some(median) = data.medians.get(a.index)
        && let Some(d) = median_path(median)
    {
        let dash = data.median_length(a.index) + BRUSH_WIDTH;
        let offset = dash * (1.0 - a.progress.clamp(0.0, 1.0));
        svg.push_str(&format!(
            r#"<path d="{d}" fill="none" stroke="{}" stroke-width="{BRUSH_WIDTH}" stroke-linecap="round" stroke-linejoin="round" stroke-dasharray="{dash:.2} {dash:.2}" stroke-dashoffset="{offset:.2}" clip-path="url(#active)"/>"#,
            stroke_color(data, a.index, palette)
        ));
    }

    svg.push_str("</g></svg>");
    svg
}

fn stroke_color<'a>(data: &GlyphStrokes, index: usize, palette: &'a StrokePalette) -> &'a str {
    if data.is_radical(index) {
        &palette.radical
    } else {
        &palette.stroke
    }
}

fn median_path(points: &[[f64; 2]]) -> Option<String> {
    let (first, rest) = points.split_first()?;
    let mut d = format!("M {} {}", first[0], first[1]);
    if rest.is_empty() {
        // Zero-length stroke; a tiny segment keeps the round cap visible.
        d.push_str(&format!(" L {} {}", first[0] + 0.01, first[1]));
    }
    for p in rest {
        d.push_str(&format!(" L {} {}", p[0], p[1]));
    }
    Some(d)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/median.rs"]
mod tests;
