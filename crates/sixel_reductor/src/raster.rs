//! Pixel buffers passed between the pipeline stages.

use crate::{palette::Palette, Result, SixelError};

/// Color type for palette entries and samples (RGB).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// An 8-bit RGB or RGBA image with an explicit row stride.
///
/// The buffer is always exactly `stride * height` bytes. Alpha, if present,
/// is carried along but never interpreted by the reduction stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
    pixels: Vec<u8>,
}

impl Image {
    /// Wrap a pixel buffer after validating its geometry.
    pub fn new(
        pixels: Vec<u8>,
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SixelError::InvalidDimensions { width, height });
        }
        if channels != 3 && channels != 4 {
            return Err(SixelError::InvalidChannels(channels));
        }
        let row = width
            .checked_mul(channels)
            .ok_or(SixelError::InvalidDimensions { width, height })?;
        if stride < row {
            return Err(SixelError::InvalidStride { stride, row });
        }
        let expected = stride
            .checked_mul(height)
            .ok_or(SixelError::InvalidDimensions { width, height })?;
        if pixels.len() != expected {
            return Err(SixelError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            stride,
            pixels,
        })
    }

    /// Tightly packed RGB (3 bytes per pixel).
    #[inline]
    pub fn from_rgb(pixels: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        Self::new(pixels, width, height, 3, width.saturating_mul(3))
    }

    /// Tightly packed RGBA (4 bytes per pixel).
    #[inline]
    pub fn from_rgba(pixels: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        Self::new(pixels, width, height, 4, width.saturating_mul(4))
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Row `y` including any stride padding.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.pixels[y * self.stride..(y + 1) * self.stride]
    }

    /// Color at `(x, y)`; alpha is dropped.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        let i = y * self.stride + x * self.channels;
        Rgb::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2])
    }
}

/// Quantized image: one palette code per pixel plus the palette it indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: usize,
    pub height: usize,
    pub indices: Vec<u8>,
    pub palette: Palette,
}

impl IndexedImage {
    /// Codes of row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.indices[y * self.width..(y + 1) * self.width]
    }
}
