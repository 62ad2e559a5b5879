//! Crate-level error type and `Result` alias.
//! Wraps decoder and compiler failures, I/O, image encoding and config parsing,
//! and provides semantic variants for argument validation.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NPY format error: {0}")]
    Format(#[from] crate::io::FormatError),

    #[error("Style compile error: {0}")]
    Compile(#[from] crate::style::CompileError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Band order has {expected} bands but the tile has {actual}")]
    BandCountMismatch { expected: usize, actual: usize },

    #[error("No stretch range for band '{band}'")]
    RangeUnavailable { band: char },

    #[error("Unknown style preset: {name}")]
    UnknownPreset { name: String },

    #[error("Processing error: {0}")]
    Processing(String),
}
