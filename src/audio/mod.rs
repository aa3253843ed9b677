//! Speech audio: fetching, decoding and the per-job mixing graph.

pub mod decode;
pub mod fetch;
pub mod graph;
