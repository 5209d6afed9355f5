//! Mapping colors to palette codes.

use crate::{
    palette::{ColorMode, Palette},
    Result, Rgb,
};

/// Strategy used to look up the palette code of a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinderMode {
    /// The color mode's own finder (closed-form for the fixed palettes,
    /// nearest RGB for custom ones).
    #[default]
    Default,
    /// Nearest entry in a cone HSV space, for any color mode.
    Hsv,
}

impl_enum_names!(FinderMode, "finder mode", {
    Default => "Default",
    Hsv => "HSV",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finder {
    Mono,
    Gray(u32),
    GrayMean(u32),
    Fixed8,
    FixedX68k,
    FixedAnsi16,
    Fixed256,
    Fixed256Rgbi,
    Nearest,
    Hsv,
}

/// Cone HSV with 8-bit components.
///
/// `h` is in `0..240`, or `255` for grays. `s` is `max - min`, `v` is `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const GRAY_HUE: u8 = 255;

    pub fn from_rgb(c: Rgb) -> Self {
        let (r, g, b) = (c.r as i32, c.g as i32, c.b as i32);
        let min = r.min(g).min(b);
        let max = r.max(g).max(b);
        let s = max - min;
        let h = if s == 0 {
            Self::GRAY_HUE as i32
        } else if min == b {
            40 * (g - r) / s + 40
        } else if min == r {
            40 * (b - g) / s + 120
        } else {
            40 * (r - b) / s + 200
        };
        Self {
            h: h as u8,
            s: s as u8,
            v: max as u8,
        }
    }

    /// Weighted distance from sample `self` to palette entry `entry`.
    fn distance(self, entry: Hsv) -> i32 {
        let dv = entry.v as i32 - self.v as i32;
        let (mut dh, ds) = if self.s != 0 && entry.s == 0 {
            // chromatic sample against a gray entry
            (120, 120)
        } else {
            (
                entry.h as i32 - self.h as i32,
                entry.s as i32 - self.s as i32,
            )
        };
        if dh > 120 {
            dh -= 240;
        } else if dh < -120 {
            dh += 240;
        }
        dh.abs() * (self.s as i32 + 1) / 32 + ds.abs() * 3 + dv.abs() * 5
    }
}

/// Palette lookup for one conversion.
///
/// Holds the palette the codes refer to; the dither engine reads entries
/// back from it to compute residuals.
#[derive(Debug, Clone)]
pub struct ColorFinder {
    finder: Finder,
    palette: Palette,
    hsv: Vec<Hsv>,
}

impl ColorFinder {
    pub fn new(mode: &ColorMode, finder_mode: FinderMode) -> Result<Self> {
        let palette = mode.palette()?;
        let finder = match finder_mode {
            FinderMode::Hsv => Finder::Hsv,
            FinderMode::Default => match mode {
                ColorMode::Mono => Finder::Mono,
                ColorMode::Gray(_) => Finder::Gray(palette.len() as u32),
                ColorMode::GrayMean(_) => Finder::GrayMean(palette.len() as u32),
                ColorMode::Fixed8 => Finder::Fixed8,
                ColorMode::FixedX68k => Finder::FixedX68k,
                ColorMode::FixedAnsi16 => Finder::FixedAnsi16,
                ColorMode::Fixed256 => Finder::Fixed256,
                ColorMode::Fixed256Rgbi => Finder::Fixed256Rgbi,
                ColorMode::Custom(_) => Finder::Nearest,
            },
        };
        let mut finder = Self {
            finder,
            palette,
            hsv: Vec::new(),
        };
        finder.rebuild_hsv();
        Ok(finder)
    }

    /// Scale every palette entry by `percent / 100`.
    ///
    /// Lookups keep their thresholds; only the colors written out (and the
    /// residuals computed against them) change.
    pub fn with_palette_scale(mut self, percent: u32) -> Self {
        if percent != 100 {
            self.palette = self.palette.scaled(percent);
            self.rebuild_hsv();
        }
        self
    }

    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Palette code for `c`.
    pub fn find(&self, c: Rgb) -> u8 {
        match self.finder {
            Finder::Mono => find_mono(c),
            Finder::Gray(n) => find_gray(c, n),
            Finder::GrayMean(n) => find_gray_mean(c, n),
            Finder::Fixed8 => find_fixed8(c),
            Finder::FixedX68k => find_x68k(c),
            Finder::FixedAnsi16 => find_ansi16(c),
            Finder::Fixed256 => find_fixed256(c),
            Finder::Fixed256Rgbi => find_fixed256_rgbi(c),
            Finder::Nearest => self.find_nearest(c),
            Finder::Hsv => self.find_hsv(c),
        }
    }

    fn rebuild_hsv(&mut self) {
        self.hsv = if self.finder == Finder::Hsv {
            self.palette.colors().iter().map(|&c| Hsv::from_rgb(c)).collect()
        } else {
            Vec::new()
        };
    }

    fn find_nearest(&self, c: Rgb) -> u8 {
        let mut best = 0;
        let mut best_d = u32::MAX;
        for (i, p) in self.palette.colors().iter().enumerate() {
            let dr = c.r as i32 - p.r as i32;
            let dg = c.g as i32 - p.g as i32;
            let db = c.b as i32 - p.b as i32;
            let d = (dr * dr + dg * dg + db * db) as u32;
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        best as u8
    }

    fn find_hsv(&self, c: Rgb) -> u8 {
        let sample = Hsv::from_rgb(c);
        let mut best = 0;
        let mut best_d = i32::MAX;
        for (i, &entry) in self.hsv.iter().enumerate() {
            let d = sample.distance(entry);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        best as u8
    }
}

#[inline]
fn find_mono(c: Rgb) -> u8 {
    (c.r as u32 + c.g as u32 + c.b as u32 > 128 * 3) as u8
}

// NTSC luma
#[inline]
fn find_gray(c: Rgb, n: u32) -> u8 {
    let y = (c.r as u32 * 76 + c.g as u32 * 153 + c.b as u32 * 26) / 255;
    let i = (y * (n - 1) + 255 / n) / 255;
    i.min(n - 1) as u8
}

#[inline]
fn find_gray_mean(c: Rgb, n: u32) -> u8 {
    let sum = c.r as u32 + c.g as u32 + c.b as u32;
    let i = (sum + (255 / n) * 3) * (n - 1) / 3 / 255;
    i.min(n - 1) as u8
}

#[inline]
fn find_fixed8(c: Rgb) -> u8 {
    let r = (c.r >= 128) as u8;
    let g = (c.g >= 128) as u8;
    let b = (c.b >= 128) as u8;
    r | (g << 1) | (b << 2)
}

fn find_x68k(c: Rgb) -> u8 {
    let sum = c.r as u32 + c.g as u32 + c.b as u32;
    let bits = |t: u8| {
        (
            (c.r >= t) as u8,
            (c.g >= t) as u8,
            (c.b >= t) as u8,
        )
    };
    if c.r >= 192 || c.g >= 192 || c.b >= 192 {
        let (r, g, b) = bits(192);
        if r == g && g == b {
            return 7;
        }
        r | (g << 1) | (b << 2)
    } else {
        let (r, g, b) = bits(64);
        if r == g && g == b {
            return if sum >= 64 * 3 { 15 } else { 8 };
        }
        r | (g << 1) | (b << 2) | 8
    }
}

fn find_ansi16(c: Rgb) -> u8 {
    let sum = c.r as u32 + c.g as u32 + c.b as u32;
    let bits = |t: u8| {
        (
            (c.r >= t) as u8,
            (c.g >= t) as u8,
            (c.b >= t) as u8,
        )
    };
    if c.r >= 213 || c.g >= 213 || c.b >= 213 {
        let (r, g, b) = bits(213);
        if r == g && g == b {
            return if sum >= 224 * 3 { 15 } else { 7 };
        }
        r | (g << 1) | (b << 2) | 8
    } else {
        let (r, g, b) = bits(85);
        if r == g && g == b {
            return if sum >= 128 * 3 {
                7
            } else if sum >= 42 * 3 {
                8
            } else {
                0
            };
        }
        r | (g << 1) | (b << 2)
    }
}

#[inline]
fn find_fixed256(c: Rgb) -> u8 {
    ((c.r >> 5) << 5) | ((c.g >> 5) << 2) | (c.b >> 6)
}

fn find_fixed256_rgbi(c: Rgb) -> u8 {
    let (r, g, b) = (c.r >> 6, c.g >> 6, c.b >> 6);
    let low = |v: u8| (v & 0x3f) as u32;
    // intensity follows the dominant channel, or the mean for grays
    let i = if r > g && r > b {
        (low(c.r) + 10) / 21
    } else if g > r && g > b {
        (low(c.g) + 10) / 21
    } else if b > r && b > g {
        (low(c.b) + 10) / 21
    } else {
        (low(c.r) + low(c.g) + low(c.b) + 31) / 63
    };
    (r << 6) | (g << 4) | (b << 2) | i as u8
}
