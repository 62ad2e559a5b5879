use std::fs;

use tracing::info;
use tracing_subscriber::EnvFilter;

use numpytile::style::{StyleOptions, StyleSource};
use numpytile::{RenderParams, StretchParams, render_directory_to_path, render_npy_to_path};

use super::args::CliArgs;
use super::errors::AppError;

fn stretch_params(values: &[f64], pixel_depth: Option<usize>) -> Result<StretchParams, AppError> {
    let invalid = || AppError::InvalidStretch {
        values: format!("{:?}", values),
    };
    let (low_pct, high_pct) = match values {
        [lo] => (*lo, *lo),
        [lo, hi] => (*lo, *hi),
        _ => return Err(invalid()),
    };
    if !(low_pct.is_finite() && high_pct.is_finite() && low_pct >= 0.0 && high_pct >= 0.0) {
        return Err(invalid());
    }
    Ok(StretchParams {
        low_pct,
        high_pct,
        pixel_depth,
    })
}

/// Merge the optional config file with command-line overrides.
fn build_params(args: &CliArgs) -> Result<RenderParams, AppError> {
    let mut params = match &args.config {
        Some(path) => RenderParams::from_json_file(path)?,
        None => RenderParams::default(),
    };

    if let Some(bands) = &args.bands {
        params.bands = bands.clone();
    }

    if let Some(json) = &args.style_json {
        params.style = serde_json::from_str(json).map_err(numpytile::Error::from)?;
    } else if let Some(path) = &args.program {
        let source = fs::read_to_string(path)?;
        params.style = StyleSource::program(source, Vec::new());
    } else if let Some(preset) = args.preset {
        params.style = StyleSource::preset(preset, StyleOptions::default());
    }

    if let Some(depth) = args.pixel_depth {
        if depth < 2 {
            return Err(AppError::InvalidPixelDepth { depth });
        }
        if let StyleSource::Preset { options, .. } = &mut params.style {
            options.pixel_depth = depth;
        }
    }

    if let Some(values) = &args.stretch {
        params.stretch = Some(stretch_params(values, args.pixel_depth)?);
    } else if let (Some(stretch), Some(depth)) = (&mut params.stretch, args.pixel_depth) {
        stretch.pixel_depth = Some(depth);
    }

    Ok(params)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let params = build_params(&args)?;

    if let Some(input_dir) = &args.input_dir {
        let output_dir = args.output_dir.as_ref().ok_or(AppError::MissingArgument {
            arg: "--output-dir".to_string(),
        })?;
        info!("Starting batch rendering from directory: {:?}", input_dir);
        info!("Output directory: {:?}", output_dir);
        let report =
            render_directory_to_path(input_dir, output_dir, &params, args.continue_on_error)?;
        println!(
            "processed={} skipped={} errors={}",
            report.processed, report.skipped, report.errors
        );
        return Ok(());
    }

    let input = args.input.as_ref().ok_or(AppError::MissingArgument {
        arg: "--input or --input-dir".to_string(),
    })?;
    let output = args.output.as_ref().ok_or(AppError::MissingArgument {
        arg: "--output".to_string(),
    })?;
    info!("Rendering {:?} -> {:?}", input, output);
    render_npy_to_path(input, output, &params)?;
    Ok(())
}
