//! Command Line Interface (CLI) layer for numpytile.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for single-file and batch
//! rendering. It wires user-provided options to `numpytile::api`.
//!
//! If you are embedding numpytile into another application, prefer the
//! high-level `numpytile::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
