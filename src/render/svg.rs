use crate::foundation::core::Canvas;
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::render::surface::Surface;
use std::path::Path;
use std::sync::Arc;

/// Font database shared by every SVG rasterization of a session.
#[derive(Clone)]
pub struct FontBook {
    db: Arc<usvg::fontdb::Database>,
}

impl FontBook {
    /// System fonts plus every font file in `extra_dir`.
    pub fn system(extra_dir: Option<&Path>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = extra_dir {
            load_fonts_from_dir(&mut db, dir);
        }
        tracing::debug!(faces = db.faces().count(), "font database loaded");
        Self { db: Arc::new(db) }
    }

    /// No fonts at all. Text nodes are dropped; shapes still render.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(usvg::fontdb::Database::new()),
        }
    }

    pub fn face_count(&self) -> usize {
        self.db.faces().count()
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.face_count())
            .finish()
    }
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "fonts directory is not readable");
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(e) = db.load_font_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to load font");
        }
    }
}

/// Parse an SVG document and rasterize it into a premultiplied surface of `canvas` size.
///
/// The document is scaled from its own size to the canvas.
pub fn rasterize_svg(svg: &str, canvas: Canvas, fonts: &FontBook) -> StrokeResult<Surface> {
    let opts = usvg::Options {
        fontdb: fonts.db.clone(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| StrokeError::setup(format!("parse svg: {e}")))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(canvas.width, canvas.height)
        .ok_or_else(|| StrokeError::setup("failed to allocate svg pixmap"))?;

    let sx = (canvas.width as f32) / tree.size().width();
    let sy = (canvas.height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(&tree, xform, &mut pixmap.as_mut());
    Surface::from_premul(canvas, pixmap.take())
}

/// Escape text for use inside SVG element content and attribute values.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/svg.rs"]
mod tests;
