//! Minimal SIXEL reader used to check what the encoder writes.
//!
//! It understands exactly the subset the encoder emits: an optional DCS
//! envelope with raster attributes, `#n;2;r;g;b` definitions (skipped),
//! register selection, `!` repeats, `$` and `-`.

#![allow(dead_code)]

/// How overlapping passes combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compose {
    /// Later passes replace the code (`P2 = 1`).
    Replace,
    /// Registers are bitplane weights ORed together (`P2 = 5`).
    Or,
}

/// Decode a SIXEL body (or a full stream) into a `width x height` code grid.
pub fn decode_codes(sixel: &str, width: usize, height: usize, compose: Compose) -> Vec<u8> {
    let body = strip_envelope(sixel);
    let bytes = body.as_bytes();
    let mut grid = vec![0u8; width * height];
    let (mut x, mut band_y, mut register) = (0usize, 0usize, 0usize);
    let mut i = 0;

    let put = |grid: &mut Vec<u8>, x: usize, band_y: usize, register: usize, pattern: u8| {
        for bit in 0..6 {
            let y = band_y + bit;
            if pattern & (1 << bit) != 0 {
                assert!(x < width && y < height, "pixel ({x}, {y}) outside the image");
                let cell = &mut grid[y * width + x];
                match compose {
                    Compose::Replace => *cell = register as u8,
                    Compose::Or => *cell |= register as u8,
                }
            }
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                let (n, next) = number(bytes, i + 1);
                i = next;
                if bytes.get(i) == Some(&b';') {
                    // color definition
                    while i < bytes.len() && (bytes[i] == b';' || bytes[i].is_ascii_digit()) {
                        i += 1;
                    }
                } else {
                    register = n;
                }
            }
            b'!' => {
                let (count, next) = number(bytes, i + 1);
                let pattern = bytes[next] - 0x3f;
                for _ in 0..count {
                    put(&mut grid, x, band_y, register, pattern);
                    x += 1;
                }
                i = next + 1;
            }
            b'$' => {
                x = 0;
                i += 1;
            }
            b'-' => {
                x = 0;
                band_y += 6;
                i += 1;
            }
            c @ 0x3f..=0x7e => {
                put(&mut grid, x, band_y, register, c - 0x3f);
                x += 1;
                i += 1;
            }
            other => panic!("unexpected byte {other:#x} at {i}"),
        }
    }
    grid
}

/// Raster attributes `(width, height)` from a full stream.
pub fn raster_size(sixel: &str) -> (usize, usize) {
    let start = sixel.find('"').expect("no raster attributes") + 1;
    let fields: Vec<usize> = sixel[start..]
        .split(|c: char| !c.is_ascii_digit() && c != ';')
        .next()
        .unwrap()
        .split(';')
        .map(|f| f.parse().unwrap())
        .collect();
    (fields[2], fields[3])
}

fn strip_envelope(sixel: &str) -> &str {
    let mut body = sixel;
    if body.starts_with("\x1bP") {
        let q = body.find('q').expect("DCS without q");
        body = &body[q + 1..];
        if let Some(rest) = body.strip_prefix('"') {
            let end = rest
                .find(|c: char| !c.is_ascii_digit() && c != ';')
                .unwrap_or(rest.len());
            body = &rest[end..];
        }
    }
    body.strip_suffix("\x1b\\").unwrap_or(body)
}

fn number(bytes: &[u8], mut i: usize) -> (usize, usize) {
    let start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let n = std::str::from_utf8(&bytes[start..i]).unwrap().parse().unwrap();
    (n, i)
}

/// Deterministic code pattern with `colors` distinct values.
pub fn code_grid(width: usize, height: usize, colors: usize) -> Vec<u8> {
    (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            ((x * 3 + y * 5 + x * y) % colors) as u8
        })
        .collect()
}
