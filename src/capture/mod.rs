//! Real-time capture of the composited output.

pub mod session;
