#![no_main]

use libfuzzer_sys::fuzz_target;
use sixel_reductor::BandEncoder;

fuzz_target!(|data: &[u8]| {
    let [w, h, planes, codes @ ..] = data else {
        return;
    };
    let Ok(mut encoder) = BandEncoder::with_planes(*w as usize + 1, *planes as usize % 9) else {
        return;
    };
    let mut out = String::new();
    if encoder.encode(codes, *h as usize % 8, &mut out).is_ok() {
        assert!(out.ends_with('$'));
        assert!(out.bytes().all(|b| b.is_ascii_graphic()));
    }
});
