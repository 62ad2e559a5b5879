use clap::Parser;
use std::path::PathBuf;

use numpytile::BandOrder;
use numpytile::types::StylePreset;

#[derive(Parser, Debug)]
#[command(name = "numpytile", version, about = "Render multi-band NumPy raster tiles to PNG")]
pub struct CliArgs {
    /// Input .npy tile (single file mode)
    #[arg(short, long, conflicts_with = "input_dir")]
    pub input: Option<PathBuf>,

    /// Input directory containing .npy tiles (batch mode)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Output PNG filename (single file mode)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing (batch mode)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Band order of the stored tiles, e.g. "bgrna" or "r,g,b,a"
    #[arg(long)]
    pub bands: Option<BandOrder>,

    /// Built-in style (rgb, gray, pending, onlyRed, value)
    #[arg(long, value_enum, conflicts_with_all = ["program", "style_json"])]
    pub preset: Option<StylePreset>,

    /// File holding a style program (`name := expression` per line)
    #[arg(long, conflicts_with = "style_json")]
    pub program: Option<PathBuf>,

    /// Style definition as JSON: {"name", "options"}, {"source", "ranges"}
    /// or {"lookupTable", "ranges"}
    #[arg(long)]
    pub style_json: Option<String>,

    /// Number of distinct raw values per band
    #[arg(long)]
    pub pixel_depth: Option<usize>,

    /// JSON render configuration; command-line flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Auto-stretch from the histogram, clipping LO (and HI, default LO)
    /// percent of valid pixels at each end
    #[arg(long, num_args = 1..=2, value_names = ["LO", "HI"], allow_negative_numbers = true)]
    pub stretch: Option<Vec<f64>>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,

    /// Batch mode: keep going when a tile fails to decode or render
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,
}
