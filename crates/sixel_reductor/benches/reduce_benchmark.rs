use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sixel_reductor::{
    ColorFinder, ColorMode, DiffuseMethod, DitherEngine, FinderMode, Image, ReduceMethod,
    ResampleMode, Resizer,
};
use std::hint::black_box;

fn noise_rgb(width: usize, height: usize) -> Image {
    // xorshift, so every run sees the same picture
    let mut state = 0x2545_f491u32;
    let pixels = (0..width * height * 3)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    Image::from_rgb(pixels, width, height).expect("valid noise image")
}

fn bench_resize(c: &mut Criterion) {
    let image = noise_rgb(640, 480);
    let mut group = c.benchmark_group("resize_640x480_to_320x240");
    for mode in ResampleMode::ALL {
        let resizer = Resizer::new(*mode);
        group.bench_with_input(BenchmarkId::from_parameter(mode), &image, |b, img| {
            b.iter(|| resizer.resize(black_box(img), 320, 240).unwrap())
        });
    }
    group.finish();
}

fn bench_diffuse(c: &mut Criterion) {
    let image = noise_rgb(320, 240);
    let finder = ColorFinder::new(&ColorMode::Fixed256, FinderMode::Default).unwrap();
    let mut group = c.benchmark_group("reduce_320x240_fixed256");
    for method in DiffuseMethod::ALL {
        let engine = DitherEngine::new(
            &finder,
            ReduceMethod::HighQuality,
            *method,
            DitherEngine::UNITY_GAIN,
        );
        group.bench_with_input(BenchmarkId::from_parameter(method), &image, |b, img| {
            b.iter(|| engine.reduce(black_box(img)).unwrap())
        });
    }
    for method in [ReduceMethod::Fast, ReduceMethod::Simple] {
        let engine = DitherEngine::new(
            &finder,
            method,
            DiffuseMethod::default(),
            DitherEngine::UNITY_GAIN,
        );
        group.bench_with_input(BenchmarkId::from_parameter(method), &image, |b, img| {
            b.iter(|| engine.reduce(black_box(img)).unwrap())
        });
    }
    group.finish();
}

fn bench_finders(c: &mut Criterion) {
    let image = noise_rgb(320, 240);
    let mut group = c.benchmark_group("simple_320x240");
    for (mode, finder) in [
        (ColorMode::Fixed8, FinderMode::Default),
        (ColorMode::FixedAnsi16, FinderMode::Default),
        (ColorMode::FixedAnsi16, FinderMode::Hsv),
        (ColorMode::Gray(16), FinderMode::Default),
    ] {
        let cf = ColorFinder::new(&mode, finder).unwrap();
        let engine = DitherEngine::new(
            &cf,
            ReduceMethod::Simple,
            DiffuseMethod::default(),
            DitherEngine::UNITY_GAIN,
        );
        group.bench_with_input(
            BenchmarkId::new(mode.to_string(), finder),
            &image,
            |b, img| b.iter(|| engine.reduce(black_box(img)).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_resize, bench_diffuse, bench_finders);
criterion_main!(benches);
