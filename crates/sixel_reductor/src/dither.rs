//! Palette reduction with optional error diffusion.

use crate::{
    quant::ColorFinder,
    raster::{Image, IndexedImage},
    try_alloc, Result, Rgb,
};

/// How quantization error is carried between pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReduceMethod {
    /// Carry the whole residual to the next pixel in the row.
    Fast,
    /// Quantize each pixel on its own.
    Simple,
    /// Two-dimensional error diffusion with a [`DiffuseMethod`] kernel.
    #[default]
    HighQuality,
}

impl_enum_names!(ReduceMethod, "reduce method", {
    Fast => "Fast",
    Simple => "Simple",
    HighQuality => "HighQuality",
});

/// Error diffusion kernel used by [`ReduceMethod::HighQuality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffuseMethod {
    #[default]
    FloydSteinberg,
    /// Spreads 6/8 of the error; the rest is dropped on purpose.
    Atkinson,
    JarvisJudiceNinke,
    Stucki,
    Burkes,
    /// Half right, half down.
    Two,
    /// Right, down and down-right.
    Three,
    /// Each channel goes to its own neighbor: red right, blue down,
    /// green down-right.
    RgbSeparated,
}

impl_enum_names!(DiffuseMethod, "diffuse method", {
    FloydSteinberg => "FS",
    Atkinson => "Atkinson",
    JarvisJudiceNinke => "Jajuni",
    Stucki => "Stucki",
    Burkes => "Burkes",
    Two => "2",
    Three => "3",
    RgbSeparated => "RGB",
});

/// One kernel entry: `weight / 256` of the error goes to `(x + dx, y + dy)`.
#[derive(Debug, Clone, Copy)]
struct Tap {
    dx: i32,
    dy: usize,
    weight: i32,
}

const fn tap(dx: i32, dy: usize, weight: i32) -> Tap {
    Tap { dx, dy, weight }
}

#[rustfmt::skip]
const FLOYD_STEINBERG: &[Tap] = &[
    tap(1, 0, 112),
    tap(-1, 1, 48), tap(0, 1, 80), tap(1, 1, 16),
];

#[rustfmt::skip]
const ATKINSON: &[Tap] = &[
    tap(1, 0, 32), tap(2, 0, 32),
    tap(-1, 1, 32), tap(0, 1, 32), tap(1, 1, 32),
    tap(0, 2, 32),
];

#[rustfmt::skip]
const JARVIS_JUDICE_NINKE: &[Tap] = &[
    tap(1, 0, 37), tap(2, 0, 27),
    tap(-2, 1, 16), tap(-1, 1, 27), tap(0, 1, 37), tap(1, 1, 27), tap(2, 1, 16),
    tap(-2, 2, 5), tap(-1, 2, 16), tap(0, 2, 27), tap(1, 2, 16), tap(2, 2, 5),
];

#[rustfmt::skip]
const STUCKI: &[Tap] = &[
    tap(1, 0, 43), tap(2, 0, 21),
    tap(-2, 1, 11), tap(-1, 1, 21), tap(0, 1, 43), tap(1, 1, 21), tap(2, 1, 11),
    tap(-2, 2, 5), tap(-1, 2, 11), tap(0, 2, 21), tap(1, 2, 11), tap(2, 2, 5),
];

#[rustfmt::skip]
const BURKES: &[Tap] = &[
    tap(1, 0, 64), tap(2, 0, 32),
    tap(-2, 1, 16), tap(-1, 1, 32), tap(0, 1, 64), tap(1, 1, 32), tap(2, 1, 16),
];

const TWO: &[Tap] = &[tap(1, 0, 128), tap(0, 1, 128)];

const THREE: &[Tap] = &[tap(1, 0, 102), tap(0, 1, 102), tap(1, 1, 51)];

impl DiffuseMethod {
    fn taps(self) -> &'static [Tap] {
        match self {
            DiffuseMethod::FloydSteinberg => FLOYD_STEINBERG,
            DiffuseMethod::Atkinson => ATKINSON,
            DiffuseMethod::JarvisJudiceNinke => JARVIS_JUDICE_NINKE,
            DiffuseMethod::Stucki => STUCKI,
            DiffuseMethod::Burkes => BURKES,
            DiffuseMethod::Two => TWO,
            DiffuseMethod::Three => THREE,
            DiffuseMethod::RgbSeparated => &[],
        }
    }
}

// Error rows kept alive at once (current row plus two below) and the
// margin on each side so taps at dx = -2..=2 never leave the row.
const ERROR_ROWS: usize = 3;
const ERROR_MARGIN: usize = 2;

const ERROR_MIN: i32 = -512;
const ERROR_MAX: i32 = 511;

type Error3 = [i16; 3];

#[inline]
fn add_error(acc: &mut Error3, err: [i32; 3], weight: i32) {
    for (a, e) in acc.iter_mut().zip(err) {
        *a = (*a as i32 + e * weight / 256).clamp(ERROR_MIN, ERROR_MAX) as i16;
    }
}

#[inline]
fn saturate(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Maps an RGB image to palette codes.
///
/// `gain` scales every sample before error is added, 256 meaning 1.0.
#[derive(Debug, Clone, Copy)]
pub struct DitherEngine<'a> {
    finder: &'a ColorFinder,
    reduce: ReduceMethod,
    diffuse: DiffuseMethod,
    gain: u32,
}

impl<'a> DitherEngine<'a> {
    pub const UNITY_GAIN: u32 = 256;

    pub fn new(
        finder: &'a ColorFinder,
        reduce: ReduceMethod,
        diffuse: DiffuseMethod,
        gain: u32,
    ) -> Self {
        Self {
            finder,
            reduce,
            diffuse,
            gain,
        }
    }

    /// Quantize `image` pixel by pixel, row-major.
    pub fn reduce(&self, image: &Image) -> Result<IndexedImage> {
        let mut indices = try_alloc::<u8>(image.width() * image.height())?;
        match self.reduce {
            ReduceMethod::Simple => self.reduce_simple(image, &mut indices),
            ReduceMethod::Fast => self.reduce_fast(image, &mut indices),
            ReduceMethod::HighQuality => self.reduce_high_quality(image, &mut indices)?,
        }
        Ok(IndexedImage {
            width: image.width(),
            height: image.height(),
            indices,
            palette: self.finder.palette().clone(),
        })
    }

    #[inline]
    fn sample(&self, image: &Image, x: usize, y: usize) -> [i32; 3] {
        let Rgb { r, g, b } = image.pixel(x, y);
        let gain = |c: u8| {
            if self.gain == Self::UNITY_GAIN {
                c as i32
            } else {
                // keeps later error arithmetic well inside i32
                (c as u64 * self.gain as u64 / 256).min(i16::MAX as u64) as i32
            }
        };
        [gain(r), gain(g), gain(b)]
    }

    /// Saturate, look up and return the code with the residual.
    #[inline]
    fn quantize(&self, col: [i32; 3]) -> (u8, [i32; 3]) {
        let code = self
            .finder
            .find(Rgb::new(saturate(col[0]), saturate(col[1]), saturate(col[2])));
        let p = self.finder.palette().get(code);
        (
            code,
            [col[0] - p.r as i32, col[1] - p.g as i32, col[2] - p.b as i32],
        )
    }

    fn reduce_simple(&self, image: &Image, out: &mut [u8]) {
        let width = image.width();
        for (y, row) in out.chunks_exact_mut(width).enumerate() {
            for (x, code) in row.iter_mut().enumerate() {
                *code = self.quantize(self.sample(image, x, y)).0;
            }
        }
    }

    fn reduce_fast(&self, image: &Image, out: &mut [u8]) {
        let width = image.width();
        for (y, row) in out.chunks_exact_mut(width).enumerate() {
            let mut carry = [0i32; 3];
            for (x, code) in row.iter_mut().enumerate() {
                let s = self.sample(image, x, y);
                let col = [s[0] + carry[0], s[1] + carry[1], s[2] + carry[2]];
                let (c, residual) = self.quantize(col);
                *code = c;
                carry = residual.map(|e| e.clamp(ERROR_MIN, ERROR_MAX));
            }
        }
    }

    fn reduce_high_quality(&self, image: &Image, out: &mut [u8]) -> Result<()> {
        let width = image.width();
        let row_len = width + ERROR_MARGIN * 2;
        let mut rows: Vec<Vec<Error3>> = Vec::with_capacity(ERROR_ROWS);
        for _ in 0..ERROR_ROWS {
            rows.push(try_alloc(row_len)?);
        }
        let taps = self.diffuse.taps();

        for (y, out_row) in out.chunks_exact_mut(width).enumerate() {
            for (x, code) in out_row.iter_mut().enumerate() {
                let cell = x + ERROR_MARGIN;
                let s = self.sample(image, x, y);
                let e = rows[0][cell];
                let col = [
                    s[0] + e[0] as i32,
                    s[1] + e[1] as i32,
                    s[2] + e[2] as i32,
                ];
                let (c, err) = self.quantize(col);
                *code = c;

                if self.diffuse == DiffuseMethod::RgbSeparated {
                    add_error(&mut rows[0][cell + 1], [err[0], 0, 0], 256);
                    add_error(&mut rows[1][cell], [0, 0, err[2]], 256);
                    add_error(&mut rows[1][cell + 1], [0, err[1], 0], 256);
                } else {
                    for t in taps {
                        let i = (cell as i32 + t.dx) as usize;
                        add_error(&mut rows[t.dy][i], err, t.weight);
                    }
                }
            }

            rows.rotate_left(1);
            if let Some(last) = rows.last_mut() {
                last.fill([0; 3]);
            }
        }
        Ok(())
    }
}
