//! Stroke-order animation onto the animator surface.

pub mod animator;
pub mod median;
pub mod strokes;
