use crate::foundation::error::StrokeResult;
use crate::render::surface::SharedSurface;

/// Draws one glyph's stroke sequence onto a surface.
///
/// `animate` paints incrementally while it runs and resolves once the last stroke is complete.
/// It is invoked once per drawable glyph, in order, on the same surface; the caller clears the
/// surface between glyphs. Errors are reported as [`StrokeError::Animation`].
///
/// [`StrokeError::Animation`]: crate::foundation::error::StrokeError::Animation
#[async_trait::async_trait]
pub trait StrokeAnimator: Send + Sync {
    async fn animate(&self, glyph: char, surface: &SharedSurface) -> StrokeResult<()>;

    /// Draw the finished glyph without animating. Used for still previews.
    async fn draw_complete(&self, glyph: char, surface: &SharedSurface) -> StrokeResult<()> {
        self.animate(glyph, surface).await
    }
}
