//! Encoding sinks fed by the capture session.

/// `ffmpeg`-based sinks (webm/mp4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
