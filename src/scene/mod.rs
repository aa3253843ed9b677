//! Job inputs: the entry to render and the glyphs that get animated.

pub mod spec;
pub mod timeline;
