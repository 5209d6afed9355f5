#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sixel_reductor::{
    sixel_encode, ColorMode, DiffuseMethod, EncodeOptions, FinderMode, Image, OutputMode,
    ReduceMethod, ResampleMode, ResizeAxisMode,
};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    width: u8,
    height: u8,
    alpha: bool,
    pixels: Vec<u8>,
    color: u8,
    finder: u8,
    reduce: u8,
    diffuse: u8,
    resample: u8,
    axis: u8,
    out_width: u8,
    out_height: u8,
    gain: u16,
    palette_scale: u8,
    or_mode: bool,
}

fn pick<T: Copy>(all: &[T], i: u8) -> T {
    all[i as usize % all.len()]
}

fn color_mode(i: u8) -> ColorMode {
    match i % 9 {
        0 => ColorMode::Mono,
        1 => ColorMode::Gray(u16::from(i).max(2)),
        2 => ColorMode::GrayMean(u16::from(i).max(2)),
        3 => ColorMode::Fixed8,
        4 => ColorMode::FixedX68k,
        5 => ColorMode::FixedAnsi16,
        6 => ColorMode::Fixed256Rgbi,
        _ => ColorMode::Fixed256,
    }
}

fuzz_target!(|input: FuzzInput| {
    let width = (input.width as usize).clamp(1, 128);
    let height = (input.height as usize).clamp(1, 128);
    let channels = if input.alpha { 4 } else { 3 };

    let expected_size = width * height * channels;
    if input.pixels.len() < expected_size {
        return;
    }
    let pixels = input.pixels[..expected_size].to_vec();
    let image = if input.alpha {
        Image::from_rgba(pixels, width, height)
    } else {
        Image::from_rgb(pixels, width, height)
    };
    let Ok(image) = image else {
        return;
    };

    let opts = EncodeOptions {
        color_mode: color_mode(input.color),
        finder: pick(FinderMode::ALL, input.finder),
        reduce: pick(ReduceMethod::ALL, input.reduce),
        diffuse: pick(DiffuseMethod::ALL, input.diffuse),
        resample: pick(ResampleMode::ALL, input.resample),
        resize_axis: pick(ResizeAxisMode::ALL, input.axis),
        width: input.out_width as usize,
        height: input.out_height as usize,
        gain: u32::from(input.gain % 1024),
        palette_scale: u32::from(input.palette_scale),
        output_mode: if input.or_mode {
            OutputMode::Or
        } else {
            OutputMode::Normal
        },
        ..Default::default()
    };

    // Errors are fine, panics are not
    let _ = sixel_encode(&image, &opts);
});
