use crate::foundation::error::{StrokeError, StrokeResult};

pub use kurbo::{Point, Rect};

/// Absolute 0-based frame index in capture timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> StrokeResult<Self> {
        if den == 0 {
            return Err(StrokeError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(StrokeError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number FPS (`num/1`).
    pub fn whole(num: u32) -> StrokeResult<Self> {
        Self::new(num, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Duration of one frame as a [`std::time::Duration`].
    pub fn frame_interval(self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.frame_duration_secs())
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }
}

/// Surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a canvas, rejecting zero-sized dimensions.
    pub fn new(width: u32, height: u32) -> StrokeResult<Self> {
        if width == 0 || height == 0 {
            return Err(StrokeError::validation("canvas width/height must be non-zero"));
        }
        Ok(Self { width, height })
    }

    /// Byte length of a tightly packed RGBA8 buffer of this size.
    pub fn rgba_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Parse a `#rrggbb` or `#rrggbbaa` color into straight RGBA8.
pub fn parse_hex_rgba(s: &str) -> StrokeResult<[u8; 4]> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(StrokeError::validation(format!(
            "color '{s}' must be #rrggbb or #rrggbbaa"
        )));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| StrokeError::validation(format!("color '{s}' has invalid hex digits")))
    };
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok([channel(0)?, channel(2)?, channel(4)?, a])
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
