//! # sixel_reductor
//!
//! Image reduction and SIXEL encoding for terminals, built on integer-only
//! arithmetic so it behaves the same on every target.
//!
//! ## Pipeline
//!
//! - **Resize**: fixed-point resampler driven by [`FractionalStep`]
//! - **Reduce**: palette quantization with optional error diffusion
//! - **Encode**: SIXEL output, either per color or as OR-mode bitplanes
//!
//! ## Quick Start
//!
//! ```ignore
//! use sixel_reductor::{sixel_encode, EncodeOptions, Image};
//!
//! // 2x1 RGB image: red, green
//! let image = Image::from_rgb(vec![255, 0, 0, 0, 255, 0], 2, 1)?;
//! let sixel = sixel_encode(&image, &EncodeOptions::default())?;
//! print!("{}", sixel);
//! ```
//!
//! ### Loading from a file
//!
//! ```ignore
//! use sixel_reductor::{default_loaders, load_image, PeekableStream};
//!
//! let file = std::fs::File::open("photo.jpg")?;
//! let mut stream = PeekableStream::new(file);
//! let image = load_image(&mut stream, &default_loaders())?;
//! ```

use std::collections::TryReserveError;

use thiserror::Error;

#[macro_use]
mod macros;

pub mod dither;
pub mod encoder;
pub mod options;
pub mod palette;
pub mod quant;
pub mod raster;
pub mod resize;
pub mod source;
pub mod stepper;

pub use dither::{DiffuseMethod, DitherEngine, ReduceMethod};
pub use encoder::{
    reduce_image, sixel_encode, sixel_encode_default, BandEncoder, OutputMode, SixelWriter,
};
pub use options::{Diag, EncodeOptions};
pub use palette::{ColorMode, Palette};
pub use quant::{ColorFinder, FinderMode};
pub use raster::{Image, IndexedImage, Rgb};
pub use resize::{preferred_size, ResampleMode, ResizeAxisMode, Resizer};
pub use source::{
    default_loaders, load_image, ByteStream, GenericLoader, ImageLoader, PeekableStream,
    PngLoader,
};
pub use stepper::FractionalStep;

/// Errors that can occur while reducing or encoding an image.
#[derive(Debug, Error)]
pub enum SixelError {
    /// Invalid image dimensions (width or height is zero or too large)
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Buffer size doesn't match expected size for dimensions
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Row stride is shorter than one row of pixels
    #[error("stride {stride} is shorter than a row of {row} bytes")]
    InvalidStride { stride: usize, row: usize },

    /// Only 3 (RGB) and 4 (RGBA) channels are supported
    #[error("unsupported channel count: {0}")]
    InvalidChannels(usize),

    /// Band width outside of what the band encoder accepts
    #[error("invalid band width: {0} (expected 1..=768)")]
    InvalidBandWidth(usize),

    /// Band height outside of 1..=6
    #[error("invalid band: {width}x{height} (height 1..=6)")]
    InvalidBand { width: usize, height: usize },

    /// Bitplane count outside of 1..=8
    #[error("invalid plane count: {0}")]
    InvalidPlanes(usize),

    /// Palette is empty, too large or otherwise unusable
    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    /// The decoder recognised the input but cannot deliver the pixel layout
    #[error("unsupported pixel layout: {0}")]
    UnsupportedPixelLayout(String),

    /// None of the loaders recognised the input
    #[error("unsupported image format")]
    UnsupportedFormat,

    /// Malformed or truncated image data
    #[error("decode error: {0}")]
    Decode(String),

    /// I/O error while reading the source stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Color quantization failed
    #[error("quantization error: {0}")]
    Quantization(String),

    /// Scratch buffer allocation failed
    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// A mode name that doesn't match any variant
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Result type for SIXEL operations.
pub type Result<T> = core::result::Result<T, SixelError>;

/// Height of one SIXEL band in pixels.
pub const SIXEL_BAND_HEIGHT: usize = 6;

/// Widest band the OR-mode band encoder accepts.
pub const SIXEL_BAND_WIDTH_MAX: usize = 768;

/// Largest palette a SIXEL stream can address here.
pub const SIXEL_PALETTE_MAX: usize = 256;

/// Allocate a zeroed scratch buffer, reporting failure instead of aborting.
pub(crate) fn try_alloc<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, T::default());
    Ok(buf)
}
