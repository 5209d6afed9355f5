#![no_main]

use libfuzzer_sys::fuzz_target;
use sixel_reductor::{default_loaders, load_image, PeekableStream};

fuzz_target!(|data: &[u8]| {
    let mut stream = PeekableStream::new(data);
    if let Ok(image) = load_image(&mut stream, &default_loaders()) {
        assert!(image.pixels().len() >= image.width() * image.height() * 3);
    }
});
