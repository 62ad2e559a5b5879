use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::{Error, Result};

/// Write an interleaved RGBA8 buffer as a PNG.
pub fn write_rgba_png(output: &Path, width: usize, height: usize, rgba: &[u8]) -> Result<()> {
    if rgba.len() != width * height * 4 {
        return Err(Error::Processing(format!(
            "RGBA buffer has {} bytes, expected {} for {}x{}",
            rgba.len(),
            width * height * 4,
            width,
            height
        )));
    }
    let (w, h) = (to_u32("width", width)?, to_u32("height", height)?);

    let file = File::create(output)?;
    let writer = BufWriter::new(file);
    PngEncoder::new(writer).write_image(rgba, w, h, ExtendedColorType::Rgba8)?;
    Ok(())
}

fn to_u32(arg: &'static str, v: usize) -> Result<u32> {
    u32::try_from(v).map_err(|_| Error::InvalidArgument {
        arg,
        value: v.to_string(),
    })
}
