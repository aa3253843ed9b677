//! Output frame composition.
//!
//! Background, container and text never change during a job, so they are rasterized once into
//! a [`FrameChrome`]. Each frame-clock tick then only copies the chrome and scales the animator
//! surface into the container.

use crate::config::ThemeConfig;
use crate::foundation::core::{Canvas, Rect, parse_hex_rgba};
use crate::foundation::error::StrokeResult;
use crate::render::surface::Surface;
use crate::render::svg::{FontBook, escape_xml, rasterize_svg};
use crate::scene::spec::RenderSpec;

/// Geometry of one output frame. All offsets derive from a layout unit that equals the output
/// width for 9:16 portrait output and shrinks for wider canvases.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameLayout {
    pub canvas: Canvas,
    pub container: Rect,
    pub corner_radius: f64,
    /// Where the animator surface lands inside the container.
    pub art: Rect,
    pub center_x: f64,
    pub glyph_size: f64,
    pub glyph_baseline: f64,
    pub translit_size: f64,
    pub translit_baseline: f64,
    pub meaning_size: f64,
    pub meaning_baseline: f64,
}

impl FrameLayout {
    pub fn new(canvas: Canvas) -> Self {
        let w = f64::from(canvas.width);
        let h = f64::from(canvas.height);
        let unit = w.min(h * 9.0 / 16.0);

        let side = 0.72 * unit;
        let glyph_size = 0.16 * unit;
        let translit_size = 0.065 * unit;
        let meaning_size = 0.05 * unit;
        let gap = 0.06 * unit;

        let text_block = glyph_size * 1.2 + translit_size * 1.5 + meaning_size * 1.5;
        let block = side + gap + text_block;
        let top = ((h - block) / 2.0).max(0.0);
        let left = (w - side) / 2.0;

        let container = Rect::new(left, top, left + side, top + side);
        let pad = 0.04 * unit;
        let art = container.inset(-pad);

        let glyph_baseline = container.y1 + gap + glyph_size;
        let translit_baseline = glyph_baseline + translit_size * 1.5;
        let meaning_baseline = translit_baseline + meaning_size * 1.5;

        Self {
            canvas,
            container,
            corner_radius: 0.05 * unit,
            art,
            center_x: w / 2.0,
            glyph_size,
            glyph_baseline,
            translit_size,
            translit_baseline,
            meaning_size,
            meaning_baseline,
        }
    }
}

/// The static part of every frame of one job.
#[derive(Clone, Debug)]
pub struct FrameChrome {
    pub layout: FrameLayout,
    pub surface: Surface,
}

impl FrameChrome {
    /// Rasterize background, container and text for `spec`.
    pub fn build(spec: &RenderSpec, theme: &ThemeConfig, fonts: &FontBook) -> StrokeResult<Self> {
        let canvas = spec.canvas()?;
        let layout = FrameLayout::new(canvas);
        let svg = chrome_svg(spec, theme, &layout)?;
        let surface = rasterize_svg(&svg, canvas, fonts)?;
        Ok(Self { layout, surface })
    }
}

fn chrome_svg(spec: &RenderSpec, theme: &ThemeConfig, l: &FrameLayout) -> StrokeResult<String> {
    // Colors are pasted into attributes verbatim.
    for color in [
        &theme.background,
        &theme.container,
        &theme.container_border,
        &theme.text,
        &theme.subtext,
    ] {
        parse_hex_rgba(color)?;
    }

    let w = l.canvas.width;
    let h = l.canvas.height;
    let c = l.container;
    let border = (l.corner_radius * 0.08).max(1.0);
    let dash = border * 4.0;
    let family = escape_xml(&theme.font_family);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{}"/>"#,
        theme.background
    ));
    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{r:.2}" ry="{r:.2}" fill="{}" stroke="{}" stroke-width="{border:.2}" stroke-dasharray="{dash:.2} {dash:.2}"/>"#,
        c.x0,
        c.y0,
        c.width(),
        c.height(),
        theme.container,
        theme.container_border,
        r = l.corner_radius,
    ));

    let translit = spec.transliteration_line();
    let lines: [(&str, f64, f64, &str, &str); 3] = [
        (&spec.word, l.glyph_size, l.glyph_baseline, &theme.text, "700"),
        (&translit, l.translit_size, l.translit_baseline, &theme.subtext, "500"),
        (&spec.meaning, l.meaning_size, l.meaning_baseline, &theme.subtext, "400"),
    ];
    for (text, size, baseline, fill, weight) in lines {
        if text.trim().is_empty() {
            continue;
        }
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{baseline:.2}" font-family="{family}" font-size="{size:.2}" font-weight="{weight}" text-anchor="middle" fill="{fill}">{}</text>"#,
            l.center_x,
            escape_xml(text),
        ));
    }
    svg.push_str("</svg>");
    Ok(svg)
}

/// Paint one output frame: chrome first, then the animator's current bitmap scaled into the
/// container. A blank animator surface leaves the container empty.
pub fn paint_frame(
    output: &mut Surface,
    animator: &Surface,
    chrome: &FrameChrome,
) -> StrokeResult<()> {
    output.copy_from(&chrome.surface)?;
    if animator.is_blank() {
        return Ok(());
    }
    output.draw_scaled(animator, fit_square(chrome.layout.art, animator.canvas()));
    Ok(())
}

/// Largest rect with the source aspect ratio centered in `target`.
fn fit_square(target: Rect, src: Canvas) -> Rect {
    let sw = f64::from(src.width);
    let sh = f64::from(src.height);
    let scale = (target.width() / sw).min(target.height() / sh);
    let w = sw * scale;
    let h = sh * scale;
    let center = target.center();
    Rect::new(
        center.x - w / 2.0,
        center.y - h / 2.0,
        center.x + w / 2.0,
        center.y + h / 2.0,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
