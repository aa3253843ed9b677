//! Premultiplied RGBA8 blending primitives used by the frame compositor.

use crate::foundation::core::Rect;
use crate::foundation::math::mul_div255_u8;

pub type PremulRgba8 = [u8; 4];

/// Source-over for one premultiplied pixel.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Bilinear sample of a premultiplied RGBA8 buffer at continuous pixel coordinates.
///
/// Coordinates outside the image clamp to the edge.
pub fn sample_bilinear(src: &[u8], width: u32, height: u32, x: f64, y: f64) -> PremulRgba8 {
    if width == 0 || height == 0 {
        return [0; 4];
    }
    let max_x = f64::from(width - 1);
    let max_y = f64::from(height - 1);
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let px = |px: u32, py: u32| {
        let i = (py as usize * width as usize + px as usize) * 4;
        [src[i], src[i + 1], src[i + 2], src[i + 3]]
    };
    let p00 = px(x0, y0);
    let p10 = px(x1, y0);
    let p01 = px(x0, y1);
    let p11 = px(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Draw `src` scaled into `dst_rect` of `dst` with source-over.
///
/// Pixels of `dst_rect` outside `dst` are clipped.
pub fn draw_scaled_over(
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst_rect: Rect,
) {
    if src_width == 0 || src_height == 0 || dst_rect.width() <= 0.0 || dst_rect.height() <= 0.0
    {
        return;
    }

    let x_start = dst_rect.x0.floor().max(0.0) as u32;
    let y_start = dst_rect.y0.floor().max(0.0) as u32;
    let x_end = (dst_rect.x1.ceil().max(0.0) as u32).min(dst_width);
    let y_end = (dst_rect.y1.ceil().max(0.0) as u32).min(dst_height);

    let sx = f64::from(src_width) / dst_rect.width();
    let sy = f64::from(src_height) / dst_rect.height();

    for y in y_start..y_end {
        let cy = f64::from(y) + 0.5;
        if cy < dst_rect.y0 || cy > dst_rect.y1 {
            continue;
        }
        let src_y = (cy - dst_rect.y0) * sy - 0.5;
        for x in x_start..x_end {
            let cx = f64::from(x) + 0.5;
            if cx < dst_rect.x0 || cx > dst_rect.x1 {
                continue;
            }
            let src_x = (cx - dst_rect.x0) * sx - 0.5;
            let s = sample_bilinear(src, src_width, src_height, src_x, src_y);
            if s[3] == 0 {
                continue;
            }
            let i = (y as usize * dst_width as usize + x as usize) * 4;
            let d = [dst[i], dst[i + 1], dst[i + 2], dst[i + 3]];
            dst[i..i + 4].copy_from_slice(&over(d, s, 1.0));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
