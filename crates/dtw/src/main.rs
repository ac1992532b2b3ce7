//! dtw: console front end for the seam-carving engine.
//!
//! Reads an image file, runs one engine operation on it, and writes the
//! result. Useful for:
//!
//! - Producing printable coloring pages from photographs
//! - Content-aware shrinking with per-phase diagnostics
//! - Inspecting the energy map, seams, threshold mask and contours
//!
//! # Usage
//!
//! ```text
//! dtw color <SOURCE> <DEST> [--detail-ratio R] [--size WxH]
//! dtw resize <SOURCE> <DEST> --width W --height H [--json]
//! dtw dump <energy|image|seams|mask|contour> <SOURCE> <DEST>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use dtw_engine::{Clock, Dimensions, Engine, EngineConfig, RgbaImage};
use image::{DynamicImage, ImageFormat};

/// Coloring pages and content-aware resizing from raster photographs.
#[derive(Parser)]
#[command(name = "dtw", version)]
struct Cli {
    /// Full engine config as a JSON string.
    ///
    /// Fields that are missing take their default values. Flags given
    /// alongside it override the matching fields.
    #[arg(long, global = true)]
    config_json: Option<String>,

    /// Check every adjacency invariant after each seam removal.
    #[arg(long, global = true)]
    validate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a black-on-white coloring page.
    Color {
        /// Input image (PNG, JPEG, BMP, WebP).
        source: PathBuf,
        /// Output image; the format follows the extension.
        dest: PathBuf,
        /// Keep the top 1/R of pixels by energy as outline.
        #[arg(long)]
        detail_ratio: Option<f64>,
        /// Scale the page to WIDTHxHEIGHT.
        #[arg(long, value_parser = parse_size)]
        size: Option<Dimensions>,
    },
    /// Shrink an image by removing low-energy seams.
    Resize {
        /// Input image (PNG, JPEG, BMP, WebP).
        source: PathBuf,
        /// Output image; the format follows the extension.
        dest: PathBuf,
        /// Target width in pixels.
        #[arg(long)]
        width: u32,
        /// Target height in pixels.
        #[arg(long)]
        height: u32,
        /// Print diagnostics as JSON instead of a human-readable report.
        #[arg(long)]
        json: bool,
    },
    /// Write one of the engine's debug renderings.
    Dump {
        /// Which rendering to write.
        #[arg(value_enum)]
        kind: DumpKind,
        /// Input image (PNG, JPEG, BMP, WebP).
        source: PathBuf,
        /// Output image; the format follows the extension.
        dest: PathBuf,
    },
}

/// Debug rendering selection.
#[derive(Clone, Copy, ValueEnum)]
enum DumpKind {
    /// Energy map as grayscale.
    Energy,
    /// The grid rebuilt as a bitmap.
    Image,
    /// Minimum vertical (red) and horizontal (green) seams.
    Seams,
    /// Cells above the coloring-page threshold.
    Mask,
    /// Contour from the highest-energy interior cell.
    Contour,
}

/// Parse `WIDTHxHEIGHT`.
fn parse_size(s: &str) -> Result<Dimensions, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width = w
        .trim()
        .parse()
        .map_err(|e| format!("invalid width {w:?}: {e}"))?;
    let height = h
        .trim()
        .parse()
        .map_err(|e| format!("invalid height {h:?}: {e}"))?;
    Ok(Dimensions::new(width, height))
}

/// Build an [`EngineConfig`] from CLI arguments.
///
/// `--config-json` supplies the base; `--validate` and a subcommand's
/// `--detail-ratio` override it.
fn config_from_cli(cli: &Cli) -> Result<EngineConfig, String> {
    let mut config = match cli.config_json {
        Some(ref json) => serde_json::from_str(json)
            .map_err(|e| format!("Error parsing --config-json: {e}"))?,
        None => EngineConfig::default(),
    };
    if cli.validate {
        config.validate_topology = true;
    }
    if let Command::Color {
        detail_ratio: Some(ratio),
        ..
    } = cli.command
    {
        config.detail_ratio = ratio;
    }
    Ok(config)
}

fn load(path: &Path, config: EngineConfig) -> Result<Engine, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    log::info!("loaded {} ({} bytes)", path.display(), bytes.len());
    Engine::from_bytes(&bytes, config).map_err(|e| format!("Error loading {}: {e}", path.display()))
}

fn save<P, C>(image: &image::ImageBuffer<P, C>, path: &Path) -> Result<(), String>
where
    P: image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
    C: std::ops::Deref<Target = [P::Subpixel]>,
{
    image
        .save(path)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    log::info!("wrote {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(())
}

/// [`save`] for colour results. Formats without an alpha channel get the
/// image flattened to RGB first.
fn save_color(image: &RgbaImage, path: &Path) -> Result<(), String> {
    if matches!(ImageFormat::from_path(path), Ok(ImageFormat::Jpeg)) {
        let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        return save(&rgb, path);
    }
    save(image, path)
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    log::debug!("config: {config:?}");

    match &cli.command {
        Command::Color {
            source, dest, size, ..
        } => {
            let engine = load(source, config)?;
            let ratio = engine.config().detail_ratio;
            let page = match size {
                Some(size) => engine.render_coloring_page_scaled(ratio, *size),
                None => engine.render_coloring_page(ratio),
            }
            .map_err(|e| format!("Error rendering coloring page: {e}"))?;
            save(&page, dest)
        }
        Command::Resize {
            source,
            dest,
            width,
            height,
            json,
        } => {
            let engine = load(source, config)?;
            let (resized, diagnostics) = engine
                .resize_with_clock(Dimensions::new(*width, *height), &StdClock)
                .map_err(|e| format!("Error resizing: {e}"))?;
            if *json {
                let out = serde_json::to_string_pretty(&diagnostics)
                    .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
                println!("{out}");
            } else {
                println!("{}", diagnostics.report());
            }
            save_color(&resized, dest)
        }
        Command::Dump { kind, source, dest } => {
            let engine = load(source, config)?;
            let failed = |e: dtw_engine::EngineError| format!("Error rendering dump: {e}");
            match kind {
                DumpKind::Energy => save(&engine.dump_energy().map_err(failed)?, dest),
                DumpKind::Image => save_color(&engine.dump_image().map_err(failed)?, dest),
                DumpKind::Seams => save_color(&engine.dump_seams().map_err(failed)?, dest),
                DumpKind::Mask => save(&engine.dump_threshold_mask().map_err(failed)?, dest),
                DumpKind::Contour => save_color(&engine.dump_top_contour().map_err(failed)?, dest),
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn size_parses_both_separators() {
        assert_eq!(parse_size("640x480").unwrap(), Dimensions::new(640, 480));
        assert_eq!(parse_size("12X7").unwrap(), Dimensions::new(12, 7));
    }

    #[test]
    fn size_rejects_garbage() {
        assert!(parse_size("640").is_err());
        assert!(parse_size("ax5").is_err());
        assert!(parse_size("5x-1").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn color_flags_override_config_json() {
        let cli = Cli::parse_from([
            "dtw",
            "--config-json",
            r#"{ "detail_ratio": 5.0, "enlargement": "Ignore" }"#,
            "--validate",
            "color",
            "in.png",
            "out.png",
            "--detail-ratio",
            "12",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.detail_ratio - 12.0).abs() < f64::EPSILON);
        assert_eq!(config.enlargement, dtw_engine::EnlargementPolicy::Ignore);
        assert!(config.validate_topology);
    }

    #[test]
    fn resize_arguments_parse() {
        let cli = Cli::parse_from([
            "dtw", "resize", "in.png", "out.png", "--width", "30", "--height", "20", "--json",
        ]);
        assert!(matches!(
            cli.command,
            Command::Resize {
                width: 30,
                height: 20,
                json: true,
                ..
            }
        ));
    }

    #[test]
    fn resized_result_saves_as_jpeg() {
        let source = RgbaImage::from_fn(12, 10, |x, y| {
            image::Rgba([u8::try_from(x * 20).unwrap(), u8::try_from(y * 25).unwrap(), 90, 255])
        });
        let resized = Engine::new(&source)
            .unwrap()
            .resize(Dimensions::new(8, 8))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("resized.jpg");
        save_color(&resized, &dest).unwrap();
        let decoded = image::open(&dest).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));

        let png = dir.path().join("resized.png");
        save_color(&resized, &png).unwrap();
        assert_eq!(image::open(&png).unwrap().to_rgba8(), resized);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let cli = Cli::parse_from(["dtw", "--config-json", "{", "dump", "energy", "a", "b"]);
        assert!(config_from_cli(&cli).is_err());
    }
}
