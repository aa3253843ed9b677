//! Drawing surfaces, SVG rasterization and frame composition.

pub mod clock;
pub mod composite;
pub mod compositor;
pub mod surface;
pub mod svg;
