//! Per-call configuration.

use crate::{
    dither::{DiffuseMethod, DitherEngine, ReduceMethod},
    encoder::OutputMode,
    palette::ColorMode,
    quant::FinderMode,
    resize::{ResampleMode, ResizeAxisMode},
};

/// Options for [`sixel_encode`](crate::sixel_encode) and
/// [`reduce_image`](crate::reduce_image).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Palette to reduce to.
    pub color_mode: ColorMode,

    /// How colors are matched against the palette.
    pub finder: FinderMode,

    pub reduce: ReduceMethod,

    /// Kernel for [`ReduceMethod::HighQuality`], ignored otherwise.
    pub diffuse: DiffuseMethod,

    pub resample: ResampleMode,

    /// Which requested dimension drives the output size.
    pub resize_axis: ResizeAxisMode,

    /// Requested output width, 0 for unspecified.
    pub width: usize,

    /// Requested output height, 0 for unspecified.
    pub height: usize,

    /// Input gain applied before quantization, 256 = 1.0.
    pub gain: u32,

    /// Palette brightness in percent, 100 = unchanged.
    pub palette_scale: u32,

    pub output_mode: OutputMode,

    /// Emit the `#i;2;r;g;b` color definitions. Terminals with a matching
    /// fixed palette can do without them.
    pub output_palette: bool,

    /// 0 = quiet, 1 = debug, 2 = trace.
    pub verbosity: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Fixed256,
            finder: FinderMode::Default,
            reduce: ReduceMethod::HighQuality,
            diffuse: DiffuseMethod::FloydSteinberg,
            resample: ResampleMode::Pow2,
            resize_axis: ResizeAxisMode::ScaleDownLong,
            width: 0,
            height: 0,
            gain: DitherEngine::UNITY_GAIN,
            palette_scale: 100,
            output_mode: OutputMode::Normal,
            output_palette: true,
            verbosity: 0,
        }
    }
}

impl EncodeOptions {
    #[inline]
    pub fn diag(&self) -> Diag {
        Diag::new(self.verbosity)
    }
}

/// Verbosity-gated diagnostics for one conversion.
///
/// Messages go through the `log` facade, so they still need a logger that
/// lets `debug`/`trace` records through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diag {
    level: u8,
}

impl Diag {
    pub const fn new(level: u8) -> Self {
        Self { level }
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.level
    }

    #[inline]
    pub fn is_debug(&self) -> bool {
        self.level >= 1
    }

    #[inline]
    pub fn is_trace(&self) -> bool {
        self.level >= 2
    }

    pub fn debug(&self, args: core::fmt::Arguments<'_>) {
        if self.is_debug() {
            log::debug!("{args}");
        }
    }

    pub fn trace(&self, args: core::fmt::Arguments<'_>) {
        if self.is_trace() {
            log::trace!("{args}");
        }
    }
}
