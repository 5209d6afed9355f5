//! Output size policy and fixed-point resampling.

use crate::{raster::Image, stepper::FractionalStep, try_alloc, Result, SixelError};

/// Which dimension(s) drive the output size.
///
/// A requested width or height of `0` means "not specified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeAxisMode {
    /// Width becomes the requested width and height the requested height.
    /// A zero width acts like [`Height`](Self::Height), a zero height like
    /// [`Width`](Self::Width); both zero keeps the original size.
    Both,
    /// Scale to the requested width, keeping the aspect ratio.
    Width,
    /// Scale to the requested height, keeping the aspect ratio.
    Height,
    /// [`Width`](Self::Width) for landscape (or square) sources, otherwise
    /// [`Height`](Self::Height).
    Long,
    /// [`Width`](Self::Width) for portrait (or square) sources, otherwise
    /// [`Height`](Self::Height).
    Short,
    /// [`Both`](Self::Both), but never enlarges.
    ScaleDownBoth,
    /// [`Width`](Self::Width), but never enlarges.
    ScaleDownWidth,
    /// [`Height`](Self::Height), but never enlarges.
    ScaleDownHeight,
    /// [`Long`](Self::Long), but never enlarges.
    #[default]
    ScaleDownLong,
    /// [`Short`](Self::Short), but never enlarges.
    ScaleDownShort,
}

impl_enum_names!(ResizeAxisMode, "resize axis", {
    Both => "Both",
    Width => "Width",
    Height => "Height",
    Long => "Long",
    Short => "Short",
    ScaleDownBoth => "ScaleDownBoth",
    ScaleDownWidth => "ScaleDownWidth",
    ScaleDownHeight => "ScaleDownHeight",
    ScaleDownLong => "ScaleDownLong",
    ScaleDownShort => "ScaleDownShort",
});

impl ResizeAxisMode {
    #[inline]
    pub fn is_scale_down(self) -> bool {
        matches!(
            self,
            ResizeAxisMode::ScaleDownBoth
                | ResizeAxisMode::ScaleDownWidth
                | ResizeAxisMode::ScaleDownHeight
                | ResizeAxisMode::ScaleDownLong
                | ResizeAxisMode::ScaleDownShort
        )
    }
}

// Axis after the policy has been resolved against the source geometry.
enum ResolvedAxis {
    Both,
    Width,
    Height,
}

/// Compute the output size for a `src_width x src_height` source.
///
/// Fails if the source is empty or the policy collapses a dimension to zero.
pub fn preferred_size(
    src_width: usize,
    src_height: usize,
    axis: ResizeAxisMode,
    request_width: usize,
    request_height: usize,
) -> Result<(usize, usize)> {
    if src_width == 0 || src_height == 0 {
        return Err(SixelError::InvalidDimensions {
            width: src_width,
            height: src_height,
        });
    }

    let resolved = match axis {
        ResizeAxisMode::Both | ResizeAxisMode::ScaleDownBoth => {
            if request_width == 0 {
                ResolvedAxis::Height
            } else if request_height == 0 {
                ResolvedAxis::Width
            } else {
                ResolvedAxis::Both
            }
        }
        ResizeAxisMode::Width | ResizeAxisMode::ScaleDownWidth => ResolvedAxis::Width,
        ResizeAxisMode::Height | ResizeAxisMode::ScaleDownHeight => ResolvedAxis::Height,
        ResizeAxisMode::Long | ResizeAxisMode::ScaleDownLong => {
            if src_width >= src_height {
                ResolvedAxis::Width
            } else {
                ResolvedAxis::Height
            }
        }
        ResizeAxisMode::Short | ResizeAxisMode::ScaleDownShort => {
            if src_width <= src_height {
                ResolvedAxis::Width
            } else {
                ResolvedAxis::Height
            }
        }
    };

    let mut rw = if request_width == 0 {
        src_width
    } else {
        request_width
    };
    let mut rh = if request_height == 0 {
        src_height
    } else {
        request_height
    };
    if axis.is_scale_down() {
        rw = rw.min(src_width);
        rh = rh.min(src_height);
    }

    let (width, height) = match resolved {
        ResolvedAxis::Both => (rw, rh),
        ResolvedAxis::Width => (rw, scale(src_height, rw, src_width)),
        ResolvedAxis::Height => (scale(src_width, rh, src_height), rh),
    };
    if width == 0 || height == 0 {
        return Err(SixelError::InvalidDimensions { width, height });
    }
    Ok((width, height))
}

// a * b / c without intermediate overflow
#[inline]
fn scale(a: usize, b: usize, c: usize) -> usize {
    (a as u128 * b as u128 / c as u128) as usize
}

/// How source pixels are gathered for each output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleMode {
    /// Average a power-of-two run horizontally (a shift instead of a
    /// division) and skip-sample vertically. When the ratio is not a power
    /// of two the run is shorter than the true footprint, which biases the
    /// average slightly towards the left of each cell.
    #[default]
    Pow2,
    /// Exact box average over the whole source footprint of each pixel.
    Average,
    /// Skip-sample both axes.
    Nearest,
}

impl_enum_names!(ResampleMode, "resample mode", {
    Pow2 => "Pow2",
    Average => "Average",
    Nearest => "Nearest",
});

/// Integer-only resampler producing tightly packed RGB images.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resizer {
    mode: ResampleMode,
}

impl Resizer {
    pub fn new(mode: ResampleMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ResampleMode {
        self.mode
    }

    /// Resample `src` to `dst_width x dst_height` RGB.
    pub fn resize(&self, src: &Image, dst_width: usize, dst_height: usize) -> Result<Image> {
        let invalid = SixelError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        };
        if dst_width == 0 || dst_height == 0 {
            return Err(invalid);
        }
        let (Ok(dw), Ok(dh), Ok(sw), Ok(sh)) = (
            i32::try_from(dst_width),
            i32::try_from(dst_height),
            i32::try_from(src.width()),
            i32::try_from(src.height()),
        ) else {
            return Err(invalid);
        };
        let len = dst_width
            .checked_mul(dst_height)
            .and_then(|n| n.checked_mul(3))
            .ok_or(invalid)?;
        let mut dst: Vec<u8> = try_alloc(len)?;

        let steps = Steps {
            x: FractionalStep::ratio(sw, dw),
            y: FractionalStep::ratio(sh, dh),
        };
        match self.mode {
            ResampleMode::Pow2 => resize_pow2(src, &mut dst, dst_width, dst_height, steps),
            ResampleMode::Average => resize_average(src, &mut dst, dst_width, dst_height, steps),
            ResampleMode::Nearest => resize_nearest(src, &mut dst, dst_width, dst_height, steps),
        }

        Image::from_rgb(dst, dst_width, dst_height)
    }
}

#[derive(Clone, Copy)]
struct Steps {
    x: FractionalStep,
    y: FractionalStep,
}

/// Largest power of two that is `<= n` (`n >= 1`).
#[inline]
fn round_down_pow2(n: usize) -> usize {
    1 << (usize::BITS - 1 - n.leading_zeros())
}

fn resize_pow2(src: &Image, dst: &mut [u8], dst_width: usize, dst_height: usize, steps: Steps) {
    let nch = src.channels();
    let src_width = src.width();

    // round(src / dst), clamped to what one row can provide
    let ratio = (src_width + dst_width / 2) / dst_width;
    let run = round_down_pow2(ratio.clamp(1, src_width));
    let shift = run.trailing_zeros();
    let last_start = src_width - run;

    let mut sy = FractionalStep::ratio(0, steps.y.denom);
    let mut sx = FractionalStep::ratio(0, steps.x.denom);

    for out_row in dst.chunks_exact_mut(dst_width * 3).take(dst_height) {
        let raster = src.row(sy.whole as usize);
        sy.add(&steps.y);
        sx.reset();

        for out in out_row.chunks_exact_mut(3) {
            let sx0 = (sx.whole as usize).min(last_start);
            sx.add(&steps.x);

            let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
            for px in raster[sx0 * nch..(sx0 + run) * nch].chunks_exact(nch) {
                r += px[0] as u32;
                g += px[1] as u32;
                b += px[2] as u32;
            }
            out[0] = (r >> shift) as u8;
            out[1] = (g >> shift) as u8;
            out[2] = (b >> shift) as u8;
        }
    }
}

fn resize_average(src: &Image, dst: &mut [u8], dst_width: usize, dst_height: usize, steps: Steps) {
    let nch = src.channels();

    let mut sy = FractionalStep::ratio(0, steps.y.denom);
    let mut sx = FractionalStep::ratio(0, steps.x.denom);

    for out_row in dst.chunks_exact_mut(dst_width * 3).take(dst_height) {
        let sy0 = sy.whole as usize;
        sy.add(&steps.y);
        let sy1 = (sy.whole as usize).max(sy0 + 1);
        sx.reset();

        for out in out_row.chunks_exact_mut(3) {
            let sx0 = sx.whole as usize;
            sx.add(&steps.x);
            let sx1 = (sx.whole as usize).max(sx0 + 1);

            let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
            for y in sy0..sy1 {
                for px in src.row(y)[sx0 * nch..sx1 * nch].chunks_exact(nch) {
                    r += px[0] as u32;
                    g += px[1] as u32;
                    b += px[2] as u32;
                }
            }
            let area = ((sy1 - sy0) * (sx1 - sx0)) as u32;
            out[0] = (r / area) as u8;
            out[1] = (g / area) as u8;
            out[2] = (b / area) as u8;
        }
    }
}

fn resize_nearest(src: &Image, dst: &mut [u8], dst_width: usize, dst_height: usize, steps: Steps) {
    let nch = src.channels();

    let mut sy = FractionalStep::ratio(0, steps.y.denom);
    let mut sx = FractionalStep::ratio(0, steps.x.denom);

    for out_row in dst.chunks_exact_mut(dst_width * 3).take(dst_height) {
        let raster = src.row(sy.whole as usize);
        sy.add(&steps.y);
        sx.reset();

        for out in out_row.chunks_exact_mut(3) {
            let i = sx.whole as usize * nch;
            sx.add(&steps.x);
            out.copy_from_slice(&raster[i..i + 3]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Image {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                pixels.push((x * 255 / width.max(1)) as u8);
                pixels.push((y * 255 / height.max(1)) as u8);
                pixels.push(((x + y) % 256) as u8);
            }
        }
        Image::from_rgb(pixels, width, height).unwrap()
    }

    #[test]
    fn test_preferred_size_width_locked() {
        assert_eq!(
            preferred_size(50, 50, ResizeAxisMode::Width, 100, 0).unwrap(),
            (100, 100)
        );
        assert_eq!(
            preferred_size(640, 480, ResizeAxisMode::Width, 320, 999).unwrap(),
            (320, 240)
        );
    }

    #[test]
    fn test_preferred_size_both() {
        let both = ResizeAxisMode::Both;
        assert_eq!(preferred_size(640, 480, both, 100, 50).unwrap(), (100, 50));
        // zero width acts like Height
        assert_eq!(preferred_size(640, 480, both, 0, 240).unwrap(), (320, 240));
        // zero height acts like Width
        assert_eq!(preferred_size(640, 480, both, 160, 0).unwrap(), (160, 120));
        // nothing requested keeps the original size
        assert_eq!(preferred_size(640, 480, both, 0, 0).unwrap(), (640, 480));
    }

    #[test]
    fn test_preferred_size_height_and_original() {
        assert_eq!(
            preferred_size(640, 480, ResizeAxisMode::Height, 0, 120).unwrap(),
            (160, 120)
        );
        assert_eq!(
            preferred_size(640, 480, ResizeAxisMode::Height, 0, 0).unwrap(),
            (640, 480)
        );
        assert_eq!(
            preferred_size(640, 480, ResizeAxisMode::Width, 0, 0).unwrap(),
            (640, 480)
        );
    }

    #[test]
    fn test_preferred_size_long_short() {
        // landscape: long edge is the width
        assert_eq!(
            preferred_size(800, 400, ResizeAxisMode::Long, 200, 200).unwrap(),
            (200, 100)
        );
        assert_eq!(
            preferred_size(800, 400, ResizeAxisMode::Short, 200, 200).unwrap(),
            (400, 200)
        );
        // portrait
        assert_eq!(
            preferred_size(400, 800, ResizeAxisMode::Long, 200, 200).unwrap(),
            (100, 200)
        );
        assert_eq!(
            preferred_size(400, 800, ResizeAxisMode::Short, 200, 200).unwrap(),
            (200, 400)
        );
    }

    #[test]
    fn test_preferred_size_scale_down() {
        // already fits: unchanged
        assert_eq!(
            preferred_size(100, 50, ResizeAxisMode::ScaleDownLong, 640, 640).unwrap(),
            (100, 50)
        );
        assert_eq!(
            preferred_size(100, 50, ResizeAxisMode::ScaleDownWidth, 640, 0).unwrap(),
            (100, 50)
        );
        assert_eq!(
            preferred_size(100, 50, ResizeAxisMode::ScaleDownBoth, 640, 480).unwrap(),
            (100, 50)
        );
        // too big: shrinks
        assert_eq!(
            preferred_size(1000, 500, ResizeAxisMode::ScaleDownLong, 400, 400).unwrap(),
            (400, 200)
        );
        assert_eq!(
            preferred_size(1000, 500, ResizeAxisMode::ScaleDownHeight, 0, 100).unwrap(),
            (200, 100)
        );
        assert_eq!(
            preferred_size(1000, 500, ResizeAxisMode::ScaleDownShort, 250, 250).unwrap(),
            (500, 250)
        );
    }

    #[test]
    fn test_preferred_size_zero_result_fails() {
        assert!(matches!(
            preferred_size(1000, 1, ResizeAxisMode::Width, 10, 0),
            Err(SixelError::InvalidDimensions {
                width: 10,
                height: 0
            })
        ));
        assert!(preferred_size(0, 10, ResizeAxisMode::Both, 10, 10).is_err());
    }

    #[test]
    fn test_round_down_pow2() {
        assert_eq!(round_down_pow2(1), 1);
        assert_eq!(round_down_pow2(2), 2);
        assert_eq!(round_down_pow2(3), 2);
        assert_eq!(round_down_pow2(7), 4);
        assert_eq!(round_down_pow2(8), 8);
        assert_eq!(round_down_pow2(1000), 512);
    }

    #[test]
    fn test_identity_resize_all_modes() {
        let src = gradient(13, 7);
        for mode in ResampleMode::ALL {
            let out = Resizer::new(*mode).resize(&src, 13, 7).unwrap();
            assert_eq!(out.pixels(), src.pixels(), "{mode}");
        }
    }

    #[test]
    fn test_resize_is_deterministic() {
        let src = gradient(97, 61);
        for mode in ResampleMode::ALL {
            let resizer = Resizer::new(*mode);
            let a = resizer.resize(&src, 40, 23).unwrap();
            let b = resizer.resize(&src, 40, 23).unwrap();
            assert_eq!(a, b);
            assert_eq!((a.width(), a.height(), a.channels()), (40, 23, 3));
        }
    }

    #[test]
    fn test_pow2_averages_and_skips_rows() {
        // 4x2 -> 2x1: run of 2 horizontally, row 0 only
        let src = Image::from_rgb(
            vec![
                0, 0, 0, 100, 100, 100, 200, 200, 200, 255, 255, 255, //
                9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9,
            ],
            4,
            2,
        )
        .unwrap();
        let out = Resizer::new(ResampleMode::Pow2).resize(&src, 2, 1).unwrap();
        assert_eq!(out.pixels(), &[50, 50, 50, 227, 227, 227]);
    }

    #[test]
    fn test_pow2_run_stays_inside_row() {
        // ratio 3.5 rounds to 4: the last run must be pulled back
        let src = gradient(7, 1);
        let out = Resizer::new(ResampleMode::Pow2).resize(&src, 2, 1).unwrap();
        assert_eq!(out.width(), 2);
    }

    #[test]
    fn test_average_uses_full_footprint() {
        let src = Image::from_rgb(
            vec![
                0, 0, 0, 40, 40, 40, //
                80, 80, 80, 120, 120, 120,
            ],
            2,
            2,
        )
        .unwrap();
        let out = Resizer::new(ResampleMode::Average).resize(&src, 1, 1).unwrap();
        assert_eq!(out.pixels(), &[60, 60, 60]);
    }

    #[test]
    fn test_upscale_and_rgba_source() {
        let src = Image::from_rgba(vec![10, 20, 30, 0, 40, 50, 60, 255], 2, 1).unwrap();
        let out = Resizer::new(ResampleMode::Pow2).resize(&src, 4, 2).unwrap();
        assert_eq!(
            out.pixels(),
            &[
                10, 20, 30, 10, 20, 30, 40, 50, 60, 40, 50, 60, //
                10, 20, 30, 10, 20, 30, 40, 50, 60, 40, 50, 60,
            ]
        );
    }

    #[test]
    fn test_enum_names() {
        assert_eq!(ResizeAxisMode::ScaleDownLong.to_string(), "ScaleDownLong");
        assert_eq!(
            "scaledownshort".parse::<ResizeAxisMode>().unwrap(),
            ResizeAxisMode::ScaleDownShort
        );
        assert!("Diagonal".parse::<ResizeAxisMode>().is_err());
        assert_eq!("pow2".parse::<ResampleMode>().unwrap(), ResampleMode::Pow2);
    }
}
