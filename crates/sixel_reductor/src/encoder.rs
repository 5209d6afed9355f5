//! SIXEL output: band encoders, the stream writer and the full pipeline.
//!
//! Two body layouts are supported:
//!
//! - **Normal**: one pass per palette color (several colors share a pass
//!   when their column ranges don't overlap).
//! - **OR mode**: one pass per bit of the palette code. The terminal ORs
//!   the bitplanes together, so an 8-color image needs 3 passes per band
//!   no matter how many colors it uses.

use core::fmt::Write as _;

use crate::{
    dither::DitherEngine,
    options::{Diag, EncodeOptions},
    quant::ColorFinder,
    raster::{Image, IndexedImage},
    resize::{preferred_size, Resizer},
    try_alloc, Result, SixelError, SIXEL_BAND_HEIGHT, SIXEL_BAND_WIDTH_MAX,
};

/// Offset that turns a 6-bit sixel pattern into its printable character.
const SIXEL_CHAR_BASE: u8 = 0x3f;

/// Append `n` in decimal.
///
/// Repeat counts are almost always below 1000, so those take a short path
/// without going through `fmt`.
#[inline]
pub(crate) fn write_number(out: &mut String, n: usize) {
    let digit = |d: usize| (b'0' + d as u8) as char;
    if n < 10 {
        out.push(digit(n));
    } else if n < 100 {
        out.push(digit(n / 10));
        out.push(digit(n % 10));
    } else if n < 1000 {
        out.push(digit(n / 100));
        out.push(digit(n / 10 % 10));
        out.push(digit(n % 10));
    } else {
        // writing to a String cannot fail
        let _ = write!(out, "{n}");
    }
}

/// Append `count` repetitions of `pattern`.
#[inline]
fn push_run(out: &mut String, count: usize, pattern: u8) {
    let ch = (pattern + SIXEL_CHAR_BASE) as char;
    if count > 3 {
        out.push('!');
        write_number(out, count);
        out.push(ch);
    } else {
        for _ in 0..count {
            out.push(ch);
        }
    }
}

/// Encodes one band of up to six rows as OR-mode bitplanes.
///
/// Each plane section looks like `#<2^p><runs>$`. The caller decides
/// whether the final `$` should become a `-`.
#[derive(Debug, Clone)]
pub struct BandEncoder {
    width: usize,
    planes: usize,
    // one byte per (column, plane), bit y set when row y has that plane bit
    work: Vec<u8>,
}

impl BandEncoder {
    /// Enough planes for a 16-color palette.
    pub const DEFAULT_PLANES: usize = 4;

    pub fn new(width: usize) -> Result<Self> {
        Self::with_planes(width, Self::DEFAULT_PLANES)
    }

    pub fn with_planes(width: usize, planes: usize) -> Result<Self> {
        if width > SIXEL_BAND_WIDTH_MAX {
            return Err(SixelError::InvalidBandWidth(width));
        }
        Self::any_width(width, planes)
    }

    /// Same as [`with_planes`](Self::with_planes) without the upper width
    /// limit; the stream writer bands whole images of any width.
    pub(crate) fn any_width(width: usize, planes: usize) -> Result<Self> {
        if width == 0 {
            return Err(SixelError::InvalidBandWidth(width));
        }
        if !(1..=8).contains(&planes) {
            return Err(SixelError::InvalidPlanes(planes));
        }
        Ok(Self {
            width,
            planes,
            work: try_alloc(width * planes)?,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn planes(&self) -> usize {
        self.planes
    }

    /// Append the band held in `rows` (`height` rows of `width` codes).
    ///
    /// Only the low `planes` bits of each code are read.
    pub fn encode(&mut self, rows: &[u8], height: usize, out: &mut String) -> Result<()> {
        let (width, planes) = (self.width, self.planes);
        if height == 0 || height > SIXEL_BAND_HEIGHT {
            return Err(SixelError::InvalidBand { width, height });
        }
        let expected = width * height;
        if rows.len() < expected {
            return Err(SixelError::BufferSizeMismatch {
                expected,
                actual: rows.len(),
            });
        }

        // row 0 also clears whatever the previous band left behind
        for (cell, &code) in self.work.chunks_exact_mut(planes).zip(&rows[..width]) {
            for (p, bit) in cell.iter_mut().enumerate() {
                *bit = (code >> p) & 1;
            }
        }
        for (y, row) in rows[width..expected].chunks_exact(width).enumerate() {
            let shift = y + 1;
            for (cell, &code) in self.work.chunks_exact_mut(planes).zip(row) {
                for (p, bit) in cell.iter_mut().enumerate() {
                    *bit |= ((code >> p) & 1) << shift;
                }
            }
        }

        for p in 0..planes {
            out.push('#');
            write_number(out, 1 << p);

            let mut column = self.work.iter().skip(p).step_by(planes).copied();
            let mut pattern = column.next().unwrap_or(0);
            let mut count = 1;
            for next in column {
                if next == pattern {
                    count += 1;
                } else {
                    push_run(out, count, pattern);
                    pattern = next;
                    count = 1;
                }
            }
            // nothing to draw past the last set column
            if pattern != 0 {
                push_run(out, count, pattern);
            }
            out.push('$');
        }
        Ok(())
    }
}

/// Body layout of a SIXEL stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One pass per color (`P2 = 1`).
    #[default]
    Normal,
    /// One pass per code bit, colors ORed by the terminal (`P2 = 5`).
    Or,
}

impl_enum_names!(OutputMode, "output mode", {
    Normal => "Normal",
    Or => "OR",
});

impl OutputMode {
    /// Second DCS parameter announcing this mode.
    #[inline]
    pub fn dcs_param(self) -> u8 {
        match self {
            OutputMode::Normal => 1,
            OutputMode::Or => 5,
        }
    }
}

/// Writes a complete DCS-wrapped SIXEL stream for an [`IndexedImage`].
#[derive(Debug, Clone, Copy)]
pub struct SixelWriter {
    mode: OutputMode,
    output_palette: bool,
    diag: Diag,
}

impl Default for SixelWriter {
    fn default() -> Self {
        Self::new(OutputMode::default())
    }
}

impl SixelWriter {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            output_palette: true,
            diag: Diag::default(),
        }
    }

    /// Whether to emit the `#i;2;r;g;b` color definitions.
    pub fn with_palette(mut self, output_palette: bool) -> Self {
        self.output_palette = output_palette;
        self
    }

    /// Per-band trace output, gated by `diag`.
    pub fn with_diag(mut self, diag: Diag) -> Self {
        self.diag = diag;
        self
    }

    #[must_use = "this returns the encoded SIXEL string"]
    pub fn write(&self, image: &IndexedImage) -> Result<String> {
        let (width, height) = (image.width, image.height);
        if width == 0 || height == 0 {
            return Err(SixelError::InvalidDimensions { width, height });
        }
        if image.indices.len() != width * height {
            return Err(SixelError::BufferSizeMismatch {
                expected: width * height,
                actual: image.indices.len(),
            });
        }
        if let Some(&code) = image.indices.iter().find(|&&c| c as usize >= image.palette.len()) {
            return Err(SixelError::InvalidPalette(format!(
                "code {code} outside a palette of {} colors",
                image.palette.len()
            )));
        }

        let mut out = String::new();
        // rough guess: a few bytes per column per band
        out.try_reserve(64 + image.palette.len() * 20 + width * height.div_ceil(6) * 4)?;

        self.write_preamble(image, &mut out);
        match self.mode {
            OutputMode::Normal => write_body_normal(image, self.diag, &mut out)?,
            OutputMode::Or => write_body_or(image, self.diag, &mut out)?,
        }
        // ST
        out.push_str("\x1b\\");
        Ok(out)
    }

    fn write_preamble(&self, image: &IndexedImage, out: &mut String) {
        // DCS P1=7 (pixel aspect from the raster attributes), P2, q
        out.push_str("\x1bP7;");
        write_number(out, self.mode.dcs_param() as usize);
        // raster attributes: 1:1 aspect, full size
        out.push_str(";q\"1;1;");
        write_number(out, image.width);
        out.push(';');
        write_number(out, image.height);

        if self.output_palette {
            for (i, c) in image.palette.colors().iter().enumerate() {
                out.push('#');
                write_number(out, i);
                out.push_str(";2;");
                write_number(out, c.r as usize * 100 / 255);
                out.push(';');
                write_number(out, c.g as usize * 100 / 255);
                out.push(';');
                write_number(out, c.b as usize * 100 / 255);
            }
        }
    }
}

/// Turn the carriage return that ends a band into a line feed.
#[inline]
fn end_band(out: &mut String) {
    if out.ends_with('$') {
        out.pop();
    }
    out.push('-');
}

fn write_body_or(image: &IndexedImage, diag: Diag, out: &mut String) -> Result<()> {
    let mut band = BandEncoder::any_width(image.width, image.palette.planes())?;
    for (n, rows) in image.indices.chunks(image.width * SIXEL_BAND_HEIGHT).enumerate() {
        band.encode(rows, rows.len() / image.width, out)?;
        end_band(out);
        diag.trace(format_args!("band {n}: {} bytes so far", out.len()));
    }
    Ok(())
}

fn write_body_normal(image: &IndexedImage, diag: Diag, out: &mut String) -> Result<()> {
    let width = image.width;
    // first and last column of every color inside the current band
    let mut min_x: Vec<Option<usize>> = try_alloc(image.palette.len())?;
    let mut max_x: Vec<usize> = try_alloc(image.palette.len())?;

    for (band, rows) in image.indices.chunks(width * SIXEL_BAND_HEIGHT).enumerate() {
        let band_height = rows.len() / width;
        min_x.fill(None);
        max_x.fill(0);
        for row in rows.chunks_exact(width) {
            for (x, &code) in row.iter().enumerate() {
                let c = code as usize;
                min_x[c] = Some(min_x[c].map_or(x, |m| m.min(x)));
                max_x[c] = max_x[c].max(x);
            }
        }

        // Each pass walks left to right, taking the color that starts
        // nearest to where the previous one ended.
        loop {
            let mut next_x = 0;
            let mut emitted = false;
            while let Some((start, color)) = leftmost_color_from(&min_x, next_x) {
                out.push('#');
                write_number(out, color);
                if start > next_x {
                    push_run(out, start - next_x, 0);
                }

                let mut pattern = 0u8;
                let mut count = 0;
                for x in start..=max_x[color] {
                    let mut t = 0u8;
                    for dy in 0..band_height {
                        if rows[dy * width + x] as usize == color {
                            t |= 1 << dy;
                        }
                    }
                    if t == pattern {
                        count += 1;
                    } else {
                        if count > 0 {
                            push_run(out, count, pattern);
                        }
                        pattern = t;
                        count = 1;
                    }
                }
                push_run(out, count, pattern);

                next_x = max_x[color] + 1;
                min_x[color] = None;
                emitted = true;
            }
            if !emitted {
                break;
            }
            out.push('$');
        }
        diag.trace(format_args!("band {band}: {} bytes so far", out.len()));
        end_band(out);
    }
    Ok(())
}

/// Color whose range starts first at or after `from`, lowest index on ties.
fn leftmost_color_from(min_x: &[Option<usize>], from: usize) -> Option<(usize, usize)> {
    min_x
        .iter()
        .enumerate()
        .filter_map(|(c, m)| m.filter(|&m| m >= from).map(|m| (m, c)))
        .min()
}

/// Resize and quantize `image` as configured, stopping before encoding.
pub fn reduce_image(image: &Image, opts: &EncodeOptions) -> Result<IndexedImage> {
    let diag = opts.diag();
    let (width, height) = preferred_size(
        image.width(),
        image.height(),
        opts.resize_axis,
        opts.width,
        opts.height,
    )?;
    diag.debug(format_args!(
        "source {}x{} ({} channels), output {width}x{height} ({}, {})",
        image.width(),
        image.height(),
        image.channels(),
        opts.resize_axis,
        opts.resample,
    ));

    let resized;
    let source = if (width, height) == (image.width(), image.height()) {
        image
    } else {
        resized = Resizer::new(opts.resample).resize(image, width, height)?;
        &resized
    };

    let finder =
        ColorFinder::new(&opts.color_mode, opts.finder)?.with_palette_scale(opts.palette_scale);
    diag.debug(format_args!(
        "color {} ({} colors), finder {}, reduce {}, diffuse {}, gain {}",
        opts.color_mode,
        finder.palette().len(),
        opts.finder,
        opts.reduce,
        opts.diffuse,
        opts.gain,
    ));

    DitherEngine::new(&finder, opts.reduce, opts.diffuse, opts.gain).reduce(source)
}

/// Encode `image` into a complete SIXEL string.
///
/// # Example
/// ```ignore
/// use sixel_reductor::{sixel_encode, EncodeOptions, Image};
///
/// let image = Image::from_rgb(vec![255, 0, 0, 0, 255, 0], 2, 1)?; // red, green
/// let sixel = sixel_encode(&image, &EncodeOptions::default())?;
/// println!("{}", sixel);
/// ```
#[must_use = "this returns the encoded SIXEL string"]
pub fn sixel_encode(image: &Image, opts: &EncodeOptions) -> Result<String> {
    let indexed = reduce_image(image, opts)?;
    let sixel = SixelWriter::new(opts.output_mode)
        .with_palette(opts.output_palette)
        .with_diag(opts.diag())
        .write(&indexed)?;
    opts.diag().debug(format_args!(
        "{} bytes of {} SIXEL",
        sixel.len(),
        opts.output_mode
    ));
    Ok(sixel)
}

/// Encode with default options.
#[inline]
#[must_use = "this returns the encoded SIXEL string"]
pub fn sixel_encode_default(image: &Image) -> Result<String> {
    sixel_encode(image, &EncodeOptions::default())
}
