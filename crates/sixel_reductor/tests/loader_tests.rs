use std::io::{Cursor, Read};

use image::{GrayImage, ImageFormat, Luma, Rgb as PxRgb, RgbImage, Rgba, RgbaImage};
use sixel_reductor::*;

fn encode(write: impl FnOnce(&mut Cursor<&mut Vec<u8>>)) -> Vec<u8> {
    let mut buf = Vec::new();
    write(&mut Cursor::new(&mut buf));
    buf
}

fn rgb_png() -> Vec<u8> {
    let img = RgbImage::from_fn(3, 2, |x, y| PxRgb([x as u8 * 100, y as u8 * 200, 7]));
    encode(|w| img.write_to(w, ImageFormat::Png).unwrap())
}

fn gray_png() -> Vec<u8> {
    let img = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 60 + y) as u8]));
    encode(|w| img.write_to(w, ImageFormat::Png).unwrap())
}

fn stream(bytes: Vec<u8>) -> PeekableStream<Cursor<Vec<u8>>> {
    PeekableStream::new(Cursor::new(bytes))
}

#[test]
fn test_png_rgb8() {
    let mut s = stream(rgb_png());
    assert!(PngLoader.check(&mut s).unwrap(), "RGB8 PNG should be claimed");

    let image = PngLoader.load(&mut s).unwrap();
    assert_eq!((image.width(), image.height(), image.channels()), (3, 2, 3));
    assert_eq!(image.pixel(2, 1), Rgb::new(200, 200, 7));
    assert_eq!(image.pixel(0, 0), Rgb::new(0, 0, 7));
}

#[test]
fn test_png_rgba8_keeps_alpha_channel() {
    let img = RgbaImage::from_fn(2, 2, |x, _| Rgba([255, x as u8 * 255, 0, 128]));
    let bytes = encode(|w| img.write_to(w, ImageFormat::Png).unwrap());

    let image = load_image(&mut stream(bytes), &default_loaders()).unwrap();
    assert_eq!(image.channels(), 4);
    assert_eq!(image.pixel(1, 0), Rgb::new(255, 255, 0));
}

#[test]
fn test_gray_png_goes_to_generic_loader() {
    let bytes = gray_png();

    let mut s = stream(bytes.clone());
    assert!(!PngLoader.check(&mut s).unwrap(), "gray PNG is not direct");
    assert!(GenericLoader.check(&mut s).unwrap());

    let err = PngLoader.load(&mut stream(bytes.clone())).unwrap_err();
    assert!(
        matches!(err, SixelError::UnsupportedPixelLayout(_)),
        "unexpected error: {err}"
    );

    let image = load_image(&mut stream(bytes), &default_loaders()).unwrap();
    assert_eq!((image.width(), image.height(), image.channels()), (4, 3, 3));
    assert_eq!(image.pixel(2, 1), Rgb::new(121, 121, 121));
}

#[test]
fn test_check_does_not_consume() {
    let bytes = rgb_png();
    let mut s = stream(bytes.clone());
    for loader in default_loaders() {
        loader.check(&mut s).unwrap();
    }
    let mut all = Vec::new();
    s.read_to_end(&mut all).unwrap();
    assert_eq!(all, bytes);
}

#[test]
fn test_bmp_is_generic_only() {
    let img = RgbImage::from_pixel(5, 4, PxRgb([10, 20, 30]));
    let bytes = encode(|w| img.write_to(w, ImageFormat::Bmp).unwrap());

    let mut s = stream(bytes);
    assert!(!PngLoader.check(&mut s).unwrap());
    let image = load_image(&mut s, &default_loaders()).unwrap();
    assert_eq!((image.width(), image.height()), (5, 4));
    assert_eq!(image.pixel(4, 3), Rgb::new(10, 20, 30));
}

#[test]
fn test_truncated_png_fails() {
    let mut bytes = rgb_png();
    bytes.truncate(bytes.len() / 2);
    assert!(load_image(&mut stream(bytes), &default_loaders()).is_err());
}

#[test]
fn test_loader_order_matters() {
    let only_generic: Vec<Box<dyn ImageLoader>> = vec![Box::new(GenericLoader)];
    let image = load_image(&mut stream(rgb_png()), &only_generic).unwrap();
    assert_eq!(image.channels(), 3);

    let only_png: Vec<Box<dyn ImageLoader>> = vec![Box::new(PngLoader)];
    assert!(matches!(
        load_image(&mut stream(gray_png()), &only_png),
        Err(SixelError::UnsupportedFormat)
    ));
}

#[test]
fn test_loaded_image_encodes() {
    let image = load_image(&mut stream(rgb_png()), &default_loaders()).unwrap();
    let sixel = sixel_encode_default(&image).unwrap();
    assert!(sixel.starts_with("\x1bP7;1;q\"1;1;3;2"));
}
