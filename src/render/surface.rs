use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::foundation::math::{mul_div255_u8, unpremultiply_rgba8_in_place};
use crate::render::composite::draw_scaled_over;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A captured frame as RGBA8 pixels.
///
/// Frames handed to sinks are **premultiplied alpha**. The `premultiplied` flag is included to
/// make this explicit at API boundaries.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Straight-alpha copy of the pixels, e.g. for PNG export.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut out);
        }
        out
    }
}

/// An addressable 2-D premultiplied RGBA8 bitmap that can be painted to and read back from.
#[derive(Clone, Debug)]
pub struct Surface {
    canvas: Canvas,
    data: Vec<u8>,
}

/// A surface shared between the job body, the frame clock and the capture sampler.
pub type SharedSurface = Arc<Mutex<Surface>>;

impl Surface {
    /// Allocate a fully transparent surface.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            data: vec![0u8; canvas.rgba_len()],
        }
    }

    /// Wrap premultiplied RGBA8 bytes.
    pub fn from_premul(canvas: Canvas, data: Vec<u8>) -> StrokeResult<Self> {
        if data.len() != canvas.rgba_len() {
            return Err(StrokeError::validation(format!(
                "surface data has {} bytes, expected {} for {}x{}",
                data.len(),
                canvas.rgba_len(),
                canvas.width,
                canvas.height
            )));
        }
        Ok(Self { canvas, data })
    }

    pub fn into_shared(self) -> SharedSurface {
        Arc::new(Mutex::new(self))
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    pub fn height(&self) -> u32 {
        self.canvas.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Fill with a straight-alpha RGBA8 color.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        let a = u16::from(rgba[3]);
        let px = [
            mul_div255_u8(u16::from(rgba[0]), a),
            mul_div255_u8(u16::from(rgba[1]), a),
            mul_div255_u8(u16::from(rgba[2]), a),
            rgba[3],
        ];
        for d in self.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    /// Copy all pixels from a surface of the same size.
    pub fn copy_from(&mut self, other: &Surface) -> StrokeResult<()> {
        if other.canvas != self.canvas {
            return Err(StrokeError::validation(format!(
                "surface size mismatch: got {}x{}, expected {}x{}",
                other.width(),
                other.height(),
                self.width(),
                self.height()
            )));
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Draw `src` scaled into `rect` with source-over.
    pub fn draw_scaled(&mut self, src: &Surface, rect: Rect) {
        draw_scaled_over(
            &mut self.data,
            self.canvas.width,
            self.canvas.height,
            &src.data,
            src.canvas.width,
            src.canvas.height,
            rect,
        );
    }

    /// `true` when no pixel has any coverage.
    pub fn is_blank(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Premultiplied pixel at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.canvas.width || y >= self.canvas.height {
            return None;
        }
        let i = (y as usize * self.canvas.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Read back the current contents as a frame.
    pub fn snapshot(&self) -> FrameRGBA {
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.data.clone(),
            premultiplied: true,
        }
    }
}

/// Lock a shared surface, recovering the guard if a painter panicked while holding it.
pub fn lock_surface(surface: &SharedSurface) -> MutexGuard<'_, Surface> {
    surface.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
