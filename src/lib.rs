#![doc = r#"
numpytile: style and auto-stretch multi-band NumPy raster tiles into RGBA pixels.

Satellite imagery tiles often arrive as `.npy` buffers holding a
`[bands, height, width]` array (for example blue, green, red, near-infrared
and a validity band). This crate decodes those buffers, computes per-band
histograms and stretch ranges across one or many tiles, and renders tiles
through either a built-in preset or a small per-pixel style language into
RGBA8 buffers or PNG files. It powers the `numpytile` CLI and can be embedded
in your own Rust applications.

Add dependency
--------------
```toml
[dependencies]
numpytile = "0.1"
```

Quick start: render an NPY tile to PNG
--------------------------------------
```rust,no_run
use std::path::Path;
use numpytile::{
    render_npy_to_path, RenderParams, StretchParams, StyleOptions, StyleSource, StylePreset,
};

fn main() -> numpytile::Result<()> {
    let params = RenderParams {
        bands: "bgrna".parse()?,
        style: StyleSource::preset(
            StylePreset::Rgb,
            StyleOptions { pixel_depth: 10000, ..Default::default() },
        ),
        stretch: Some(StretchParams { low_pct: 0.25, high_pct: 0.25, pixel_depth: None }),
    };
    render_npy_to_path(Path::new("/data/tile.npy"), Path::new("/out/tile.png"), &params)
}
```

Compile a style program and render in memory
--------------------------------------------
```rust
use numpytile::{
    decode_tile, encode_npy, render_tile, BandRange, StyleSource, TensorData, TileTensor,
};

fn main() -> numpytile::Result<()> {
    // two pixels of a 4-band (b, g, r, n) tile
    let tensor = TileTensor::new([4, 1, 2], TensorData::U16(vec![300, 0, 400, 0, 500, 0, 600, 0]))?;
    let tile = decode_tile(&encode_npy(&tensor), &"bgrn".parse()?)?;

    let cir = StyleSource::program(
        "red := (bands[bandmap.n] - vmin[bandmap.n]) * 255 / (vmax[bandmap.n] - vmin[bandmap.n])
         green := (bands[bandmap.r] - vmin[bandmap.r]) * 255 / (vmax[bandmap.r] - vmin[bandmap.r])
         blue := (bands[bandmap.g] - vmin[bandmap.g]) * 255 / (vmax[bandmap.g] - vmin[bandmap.g])
         alpha := bands[bandmap.a]",
        vec![BandRange::new(100, 1000); 4],
    );
    let rendered = render_tile(&tile, &cir)?;
    assert_eq!(&rendered.rgba[..4], &[141, 113, 85, 255]);
    Ok(())
}
```

Viewport statistics
-------------------
```rust,no_run
use numpytile::{auto_stretch_curves, load_tile, viewport_histogram, BandOrder, StretchParams};
use std::path::Path;

fn main() -> numpytile::Result<()> {
    let bands: BandOrder = "bgrna".parse()?;
    let tiles = ["/data/a.npy", "/data/b.npy"]
        .iter()
        .map(|p| load_tile(Path::new(p), &bands))
        .collect::<numpytile::Result<Vec<_>>>()?;
    if let Some(hist) = viewport_histogram(&tiles, 10000)? {
        let curves = auto_stretch_curves(&hist, 10000, &StretchParams::default());
        println!("valid pixels: {}, stretched: {}", hist.count(), curves.is_some());
    }
    Ok(())
}
```

Error handling
--------------
All public functions return `numpytile::Result<T>`; match on `numpytile::Error` to
handle specific cases such as malformed buffers or style programs that fail to compile.

```rust
use numpytile::{decode_tile, BandOrder, Error};

let err = decode_tile(b"not an npy buffer", &BandOrder::rgba()).unwrap_err();
assert!(matches!(err, Error::Format(_)));
```

Useful modules
--------------
- [`api`]: high-level entry points.
- [`core`]: tile tensor and band model, statistics pipeline, renderer.
- [`style`]: presets, style options and the style-language compiler.
- [`io`]: NPY decoder/encoder and PNG writer.
- [`types`]: shared enums (`ElementType`, `StylePreset`).
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod style;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::bands::{Band, BandMap, BandOrder};
pub use crate::core::params::{RenderParams, StretchParams};
pub use crate::core::tensor::{TensorData, TileTensor};
pub use crate::core::tile::Tile;
pub use error::{Error, Result};
pub use types::{ElementType, StylePreset};

// Statistics and rendering
pub use crate::core::processing::{
    BandRange, BrightnessContrastSaturation, ColorMatrix, Curve, CurveSet, Histogram, Surface,
    apply_brightness_contrast_saturation, apply_curves, compute_histogram, compute_ranges,
    contrast_stretch_average, draw, draw_array, levels_to_curve,
};

// Styles
pub use style::{
    CompileError, ConfiguredStyle, LookupTable, LookupTableStyle, PixelStyle, StyleOptions,
    StyleProgram, StyleSource, compile_program, create_style_func,
};

// Codec
pub use io::{FormatError, decode_npy, encode_npy, is_npy};

// High-level API re-exports
pub use api::{
    BatchReport, RenderedTile, auto_stretch_curves, decode_tile, load_tile,
    render_directory_to_path, render_npy_to_path, render_tile, resolve_style, viewport_histogram,
};
