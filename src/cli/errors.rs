use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Stretch percentages must be finite and non-negative, got: {values}")]
    InvalidStretch { values: String },

    #[error("Pixel depth must be at least 2, got: {depth}")]
    InvalidPixelDepth { depth: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Library(#[from] numpytile::Error),
}
