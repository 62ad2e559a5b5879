//! Core building blocks: the tile tensor and band model, the statistics
//! pipeline and the renderer. The high-level `api` module composes these.
pub mod bands;
pub mod params;
pub mod processing;
pub mod tensor;
pub mod tile;
