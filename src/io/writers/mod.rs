//! Output writers for rendered tiles.
pub mod png;
pub use png::write_rgba_png;
