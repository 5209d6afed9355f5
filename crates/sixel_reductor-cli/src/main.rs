//! sixelv - show images as SIXEL graphics
//!
//! Loads each input, reduces it to a palette and writes the SIXEL stream to
//! stdout or a file.

use clap::{ArgAction, Parser};
use env_logger::Env;
use sixel_reductor::{
    default_loaders, load_image, sixel_encode, ColorMode, DiffuseMethod, EncodeOptions,
    FinderMode, Image, ImageLoader, OutputMode, Palette, PeekableStream, ReduceMethod,
    ResampleMode, ResizeAxisMode, SixelError,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

/// `--color` accepts every fixed mode plus a palette built from the image.
#[derive(Clone, Debug)]
enum ColorArg {
    Mode(ColorMode),
    Adaptive,
}

// Short names accepted on the command line besides the library's own.
const COLOR_ALIASES: &[(&str, ColorMode)] = &[
    ("2", ColorMode::Mono),
    ("8", ColorMode::Fixed8),
    ("16", ColorMode::FixedAnsi16),
    ("ansi16", ColorMode::FixedAnsi16),
    ("x68k", ColorMode::FixedX68k),
    ("256", ColorMode::Fixed256),
    ("256rgbi", ColorMode::Fixed256Rgbi),
];

const AXIS_ALIASES: &[(&str, ResizeAxisMode)] = &[
    ("w", ResizeAxisMode::Width),
    ("h", ResizeAxisMode::Height),
    ("sdboth", ResizeAxisMode::ScaleDownBoth),
    ("sdw", ResizeAxisMode::ScaleDownWidth),
    ("sdwidth", ResizeAxisMode::ScaleDownWidth),
    ("sdh", ResizeAxisMode::ScaleDownHeight),
    ("sdheight", ResizeAxisMode::ScaleDownHeight),
    ("sdlong", ResizeAxisMode::ScaleDownLong),
    ("sdshort", ResizeAxisMode::ScaleDownShort),
];

fn alias<T: Clone>(table: &[(&str, T)], s: &str) -> Option<T> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(s))
        .map(|(_, v)| v.clone())
}

impl FromStr for ColorArg {
    type Err = SixelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("adaptive") {
            return Ok(ColorArg::Adaptive);
        }
        match alias(COLOR_ALIASES, s) {
            Some(mode) => Ok(ColorArg::Mode(mode)),
            None => s.parse().map(ColorArg::Mode),
        }
    }
}

/// Resize axis by library name, `scaledown-long` style, or short alias.
fn parse_axis(s: &str) -> Result<ResizeAxisMode, SixelError> {
    if let Some(axis) = alias(AXIS_ALIASES, s) {
        return Ok(axis);
    }
    s.replace('-', "").parse()
}

#[derive(Parser)]
#[command(name = "sixelv")]
#[command(author = "Mike Krüger <mkrueger@posteo.de>")]
#[command(version)]
#[command(about = "Show images as SIXEL graphics", long_about = None)]
#[command(disable_help_flag = true)]
struct Cli {
    /// Input images (PNG, JPEG, GIF, WebP, BMP), - for stdin
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Requested output width in pixels
    #[arg(short, long, default_value_t = 0)]
    width: usize,

    /// Requested output height in pixels
    #[arg(short, long, default_value_t = 0)]
    height: usize,

    /// Which requested dimension drives the output size
    #[arg(long, visible_alias = "axis", value_parser = parse_axis, default_value = "sdlong")]
    resize_axis: ResizeAxisMode,

    /// Palette: mono, gray[N], graymean[N], 8, 16, x68k, 256, 256rgbi or adaptive
    #[arg(short, long, default_value = "256")]
    color: ColorArg,

    /// Gray levels for the gray palettes (2-256)
    #[arg(long, value_name = "N")]
    gray: Option<u16>,

    /// Size of the adaptive palette (2-256)
    #[arg(long, value_name = "N", default_value_t = 256)]
    colors: usize,

    #[arg(long, default_value_t = FinderMode::default())]
    finder: FinderMode,

    #[arg(long, default_value_t = ReduceMethod::default())]
    reduce: ReduceMethod,

    /// Error diffusion kernel for the high quality reducer
    #[arg(long, default_value_t = DiffuseMethod::default())]
    diffuse: DiffuseMethod,

    #[arg(long, default_value_t = ResampleMode::default())]
    resample: ResampleMode,

    /// Input gain, 256 = 1.0
    #[arg(long, default_value_t = 256)]
    gain: u32,

    /// Palette brightness in percent
    #[arg(long, visible_alias = "color-factor", default_value_t = 100)]
    palette_scale: u32,

    /// Emit OR-mode bitplanes instead of per-color passes
    #[arg(long)]
    ormode: bool,

    /// Leave the color definitions out
    #[arg(long)]
    suppress_palette: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// More diagnostics, repeat for trace output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    fn color_mode(&self) -> ColorMode {
        match (&self.color, self.gray) {
            (ColorArg::Mode(ColorMode::Gray(_)), Some(n)) => ColorMode::Gray(n),
            (ColorArg::Mode(ColorMode::GrayMean(_)), Some(n)) => ColorMode::GrayMean(n),
            // --gray on its own picks the gray palette
            (ColorArg::Mode(ColorMode::Fixed256), Some(n)) => ColorMode::Gray(n),
            (ColorArg::Mode(mode), _) => mode.clone(),
            (ColorArg::Adaptive, _) => ColorMode::default(),
        }
    }

    fn options(&self) -> EncodeOptions {
        EncodeOptions {
            color_mode: self.color_mode(),
            finder: self.finder,
            reduce: self.reduce,
            diffuse: self.diffuse,
            resample: self.resample,
            resize_axis: self.resize_axis,
            width: self.width,
            height: self.height,
            gain: self.gain,
            palette_scale: self.palette_scale,
            output_mode: if self.ormode {
                OutputMode::Or
            } else {
                OutputMode::Normal
            },
            output_palette: !self.suppress_palette,
            verbosity: self.verbose,
        }
    }
}

type BoxError = Box<dyn std::error::Error>;

fn load(path: &Path, loaders: &[Box<dyn ImageLoader>]) -> Result<Image, BoxError> {
    let image = if path.as_os_str() == "-" {
        load_image(&mut PeekableStream::new(io::stdin().lock()), loaders)?
    } else {
        let file = File::open(path)
            .map_err(|e| format!("failed to open '{}': {}", path.display(), e))?;
        load_image(&mut PeekableStream::new(file), loaders)?
    };
    Ok(image)
}

fn show(
    cli: &Cli,
    path: &Path,
    loaders: &[Box<dyn ImageLoader>],
    out: &mut dyn Write,
) -> Result<(), BoxError> {
    let image = load(path, loaders)?;
    log::info!(
        "{}: {}x{}, {} channels",
        path.display(),
        image.width(),
        image.height(),
        image.channels()
    );

    let mut opts = cli.options();
    if matches!(cli.color, ColorArg::Adaptive) {
        let palette = Palette::adaptive(&image, cli.colors)?;
        log::debug!("adaptive palette with {} colors", palette.len());
        opts.color_mode = ColorMode::Custom(palette);
    }

    let sixel = sixel_encode(&image, &opts)?;
    out.write_all(sixel.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(e) => {
                log::error!("failed to create '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let loaders = default_loaders();
    let mut failed = false;
    for path in &cli.files {
        if let Err(e) = show(&cli, path, &loaders, &mut out) {
            log::error!("{}: {}", path.display(), e);
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
