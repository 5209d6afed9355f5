//! Palettes and the color modes that select them.

use core::{fmt, str::FromStr};

use quantette::{
    deps::palette::Srgb, dither::FloydSteinberg, ImageRef, PaletteSize, Pipeline, QuantizeMethod,
};

use crate::{raster::Image, Result, Rgb, SixelError, SIXEL_PALETTE_MAX};

/// An ordered table of 1 to 256 colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        if colors.is_empty() || colors.len() > SIXEL_PALETTE_MAX {
            return Err(SixelError::InvalidPalette(format!(
                "{} colors (expected 1..={SIXEL_PALETTE_MAX})",
                colors.len()
            )));
        }
        Ok(Self { colors })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn get(&self, index: u8) -> Rgb {
        self.colors[index as usize]
    }

    #[inline]
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Number of bits needed to address every entry (at least 1).
    pub fn planes(&self) -> usize {
        let max_code = self.colors.len().saturating_sub(1);
        ((usize::BITS - max_code.leading_zeros()) as usize).max(1)
    }

    /// Every entry multiplied by `percent / 100`, saturating at 255.
    pub fn scaled(&self, percent: u32) -> Self {
        let mul = |c: u8| (c as u64 * percent as u64 / 100).min(255) as u8;
        Self {
            colors: self
                .colors
                .iter()
                .map(|c| Rgb::new(mul(c.r), mul(c.g), mul(c.b)))
                .collect(),
        }
    }

    /// Black and white.
    pub fn mono() -> Self {
        Self::from_table(&PALETTE_MONO)
    }

    /// Evenly spaced ramp of `levels` grays from black to white.
    pub fn gray(levels: u16) -> Result<Self> {
        let n = levels as usize;
        if !(2..=SIXEL_PALETTE_MAX).contains(&n) {
            return Err(SixelError::InvalidPalette(format!(
                "gray levels must be 2..={SIXEL_PALETTE_MAX}, got {levels}"
            )));
        }
        let colors = (0..n)
            .map(|i| {
                let c = (i * 255 / (n - 1)) as u8;
                Rgb::new(c, c, c)
            })
            .collect();
        Ok(Self { colors })
    }

    /// One bit per channel: `R + 2G + 4B`.
    pub fn fixed8() -> Self {
        Self::from_table(&PALETTE_FIXED8)
    }

    /// The NetBSD/x68k text palette.
    pub fn fixed_x68k() -> Self {
        Self::from_table(&PALETTE_X68K)
    }

    /// VGA colors with entry 3 as yellow instead of brown.
    pub fn fixed_ansi16() -> Self {
        Self::from_table(&PALETTE_ANSI16)
    }

    /// R3G3B2.
    pub fn fixed256() -> Self {
        let colors = (0..256usize)
            .map(|i| {
                Rgb::new(
                    (((i >> 5) & 0x07) * 255 / 7) as u8,
                    (((i >> 2) & 0x07) * 255 / 7) as u8,
                    ((i & 0x03) * 255 / 3) as u8,
                )
            })
            .collect();
        Self { colors }
    }

    /// R2G2B2 plus a 2-bit intensity added to every channel.
    pub fn fixed256_rgbi() -> Self {
        let colors = (0..256usize)
            .map(|i| {
                let level = (i & 3) * 63 / 3;
                let ch = |bits: usize| ((bits << 6) + level) as u8;
                Rgb::new(ch((i >> 6) & 3), ch((i >> 4) & 3), ch((i >> 2) & 3))
            })
            .collect();
        Self { colors }
    }

    /// Build a palette of at most `max_colors` entries tailored to `image`.
    ///
    /// Uses Wu's color quantizer; the result is meant for
    /// [`ColorMode::Custom`].
    pub fn adaptive(image: &Image, max_colors: usize) -> Result<Self> {
        if !(2..=SIXEL_PALETTE_MAX).contains(&max_colors) {
            return Err(SixelError::InvalidPalette(format!(
                "adaptive palette size must be 2..={SIXEL_PALETTE_MAX}, got {max_colors}"
            )));
        }

        let mut pixels: Vec<Srgb<u8>> = Vec::new();
        pixels.try_reserve_exact(image.width() * image.height())?;
        for y in 0..image.height() {
            for px in image.row(y)[..image.width() * image.channels()].chunks_exact(image.channels())
            {
                pixels.push(Srgb::new(px[0], px[1], px[2]));
            }
        }

        // 256 does not fit a u8 and maps to the maximum size
        let palette_size = u8::try_from(max_colors)
            .ok()
            .and_then(|n| PaletteSize::try_from(n).ok())
            .unwrap_or(PaletteSize::MAX);

        let input = ImageRef::new(image.width() as u32, image.height() as u32, &pixels)
            .map_err(|e| SixelError::Quantization(e.to_string()))?;

        let indexed = Pipeline::new()
            .palette_size(palette_size)
            .quantize_method(QuantizeMethod::Wu)
            .ditherer(FloydSteinberg::new())
            .input_image(input)
            .output_srgb8_indexed_image();

        let colors: Vec<Rgb> = indexed
            .palette()
            .iter()
            .map(|c| Rgb::new(c.red, c.green, c.blue))
            .collect();
        Self::new(colors)
    }

    fn from_table(table: &[Rgb]) -> Self {
        Self {
            colors: table.to_vec(),
        }
    }
}

const PALETTE_MONO: [Rgb; 2] = [Rgb::new(0, 0, 0), Rgb::new(255, 255, 255)];

const PALETTE_FIXED8: [Rgb; 8] = [
    Rgb::new(0, 0, 0),
    Rgb::new(255, 0, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(0, 0, 255),
    Rgb::new(255, 0, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(255, 255, 255),
];

// entry 0 is transparent on the real hardware, entry 8 is black
const PALETTE_X68K: [Rgb; 16] = [
    Rgb::new(0, 0, 0),
    Rgb::new(252, 4, 4),
    Rgb::new(4, 252, 4),
    Rgb::new(252, 252, 4),
    Rgb::new(4, 4, 252),
    Rgb::new(252, 4, 252),
    Rgb::new(4, 252, 252),
    Rgb::new(252, 252, 252),
    Rgb::new(4, 4, 4),
    Rgb::new(124, 4, 4),
    Rgb::new(4, 124, 4),
    Rgb::new(124, 124, 4),
    Rgb::new(4, 4, 124),
    Rgb::new(124, 4, 124),
    Rgb::new(4, 124, 124),
    Rgb::new(124, 124, 124),
];

const PALETTE_ANSI16: [Rgb; 16] = [
    Rgb::new(0, 0, 0),
    Rgb::new(170, 0, 0),
    Rgb::new(0, 170, 0),
    Rgb::new(170, 170, 0),
    Rgb::new(0, 0, 170),
    Rgb::new(170, 0, 170),
    Rgb::new(0, 170, 170),
    Rgb::new(170, 170, 170),
    Rgb::new(85, 85, 85),
    Rgb::new(255, 85, 85),
    Rgb::new(85, 255, 85),
    Rgb::new(255, 255, 85),
    Rgb::new(85, 85, 255),
    Rgb::new(255, 85, 255),
    Rgb::new(85, 255, 255),
    Rgb::new(255, 255, 255),
];

/// Palette selection for a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Black and white.
    Mono,
    /// Gray ramp with this many levels, matched by NTSC luma.
    Gray(u16),
    /// Gray ramp with this many levels, matched by the RGB mean.
    GrayMean(u16),
    Fixed8,
    FixedX68k,
    FixedAnsi16,
    /// R3G3B2.
    #[default]
    Fixed256,
    /// R2G2B2I2.
    Fixed256Rgbi,
    /// Caller supplied palette, matched by nearest color.
    Custom(Palette),
}

impl ColorMode {
    /// Gray level count used when a gray mode is parsed from its bare name.
    pub const DEFAULT_GRAY_LEVELS: u16 = 256;

    /// The palette this mode quantizes to.
    pub fn palette(&self) -> Result<Palette> {
        Ok(match self {
            ColorMode::Mono => Palette::mono(),
            ColorMode::Gray(n) | ColorMode::GrayMean(n) => Palette::gray(*n)?,
            ColorMode::Fixed8 => Palette::fixed8(),
            ColorMode::FixedX68k => Palette::fixed_x68k(),
            ColorMode::FixedAnsi16 => Palette::fixed_ansi16(),
            ColorMode::Fixed256 => Palette::fixed256(),
            ColorMode::Fixed256Rgbi => Palette::fixed256_rgbi(),
            ColorMode::Custom(palette) => palette.clone(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColorMode::Mono => "Mono",
            ColorMode::Gray(_) => "Gray",
            ColorMode::GrayMean(_) => "GrayMean",
            ColorMode::Fixed8 => "Fixed8",
            ColorMode::FixedX68k => "FixedX68k",
            ColorMode::FixedAnsi16 => "FixedANSI16",
            ColorMode::Fixed256 => "Fixed256",
            ColorMode::Fixed256Rgbi => "Fixed256RGBI",
            ColorMode::Custom(_) => "Custom",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Gray(n) | ColorMode::GrayMean(n) => write!(f, "{}{}", self.name(), n),
            _ => f.write_str(self.name()),
        }
    }
}

/// Parses mode names, optionally with a gray level count (`Gray16`).
///
/// `Custom` carries a palette and cannot be parsed.
impl FromStr for ColorMode {
    type Err = SixelError;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || SixelError::UnknownVariant {
            kind: "color mode",
            value: s.to_string(),
        };
        let lower = s.to_ascii_lowercase();

        // GrayMean before Gray, it shares the prefix
        for (prefix, make) in [
            ("graymean", ColorMode::GrayMean as fn(u16) -> ColorMode),
            ("gray", ColorMode::Gray as fn(u16) -> ColorMode),
        ] {
            if let Some(rest) = lower.strip_prefix(prefix) {
                if rest.is_empty() {
                    return Ok(make(Self::DEFAULT_GRAY_LEVELS));
                }
                let levels: u16 = rest.parse().map_err(|_| unknown())?;
                return Ok(make(levels));
            }
        }

        Ok(match lower.as_str() {
            "mono" => ColorMode::Mono,
            "fixed8" => ColorMode::Fixed8,
            "fixedx68k" => ColorMode::FixedX68k,
            "fixedansi16" => ColorMode::FixedAnsi16,
            "fixed256" => ColorMode::Fixed256,
            "fixed256rgbi" => ColorMode::Fixed256Rgbi,
            _ => return Err(unknown()),
        })
    }
}
