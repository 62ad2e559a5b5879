//! I/O layer: the NPY tile decoder/encoder and image writers for rendered
//! RGBA output.
pub mod npy;
pub use npy::{FormatError, decode_npy, encode_npy, is_npy};

pub mod writers;
