//! Turning encoded image files into [`Image`]s.
//!
//! Loaders sniff the stream with [`ByteStream::peek`] and only consume it
//! once they have claimed it, so several loaders can be tried in turn on a
//! pipe that cannot be rewound.

use std::io::{self, Read};

use crate::{raster::Image, try_alloc, Result, SixelError};

/// A readable stream that can look ahead without consuming.
pub trait ByteStream: Read {
    /// Up to `n` upcoming bytes, fewer only at end of stream.
    fn peek(&mut self, n: usize) -> io::Result<&[u8]>;

    fn is_eof(&mut self) -> io::Result<bool> {
        Ok(self.peek(1)?.is_empty())
    }
}

/// [`ByteStream`] over any reader, buffering only what has been peeked.
#[derive(Debug)]
pub struct PeekableStream<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
}

impl<R: Read> PeekableStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pos: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    #[inline]
    fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }
}

impl<R: Read> Read for PeekableStream<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.buffered() == 0 {
            return self.inner.read(out);
        }
        let n = self.buffered().min(out.len());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
        Ok(n)
    }
}

impl<R: Read> ByteStream for PeekableStream<R> {
    fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        if self.buffered() < n {
            // drop the consumed prefix before growing
            self.buf.drain(..self.pos);
            self.pos = 0;

            let mut chunk = [0u8; 512];
            while self.buf.len() < n {
                let want = (n - self.buf.len()).min(chunk.len());
                match self.inner.read(&mut chunk[..want]) {
                    Ok(0) => break,
                    Ok(got) => self.buf.extend_from_slice(&chunk[..got]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        let end = (self.pos + n).min(self.buf.len());
        Ok(&self.buf[self.pos..end])
    }
}

/// A decoder for one family of image formats.
pub trait ImageLoader {
    fn name(&self) -> &'static str;

    /// Whether this loader can decode the stream. Only peeks.
    fn check(&self, stream: &mut dyn ByteStream) -> Result<bool>;

    /// Decode the whole stream.
    ///
    /// Either a complete image comes back or an error; a failed load never
    /// hands out partially decoded pixels.
    fn load(&self, stream: &mut dyn ByteStream) -> Result<Image>;
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

// signature, IHDR length and tag, width, height, then depth and color type
const PNG_IHDR_BIT_DEPTH: usize = 24;
const PNG_IHDR_COLOR_TYPE: usize = 25;
const PNG_COLOR_RGB: u8 = 2;
const PNG_COLOR_RGBA: u8 = 6;

/// Direct PNG decoding for 8-bit RGB and RGBA files.
///
/// Other PNG layouts (gray, palette, 16-bit) are left to
/// [`GenericLoader`], which converts them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngLoader;

impl ImageLoader for PngLoader {
    fn name(&self) -> &'static str {
        "png"
    }

    fn check(&self, stream: &mut dyn ByteStream) -> Result<bool> {
        let head = stream.peek(PNG_IHDR_COLOR_TYPE + 1)?;
        if head.len() <= PNG_IHDR_COLOR_TYPE || head[..8] != PNG_SIGNATURE {
            return Ok(false);
        }
        let depth = head[PNG_IHDR_BIT_DEPTH];
        let color = head[PNG_IHDR_COLOR_TYPE];
        let ok = depth == 8 && (color == PNG_COLOR_RGB || color == PNG_COLOR_RGBA);
        log::trace!("png: depth {depth}, color type {color}, supported: {ok}");
        Ok(ok)
    }

    fn load(&self, stream: &mut dyn ByteStream) -> Result<Image> {
        let mut decoder = png::Decoder::new(stream);
        decoder.set_transformations(png::Transformations::IDENTITY);
        let mut reader = decoder.read_info().map_err(png_error)?;

        let channels = match reader.output_color_type() {
            (png::ColorType::Rgb, png::BitDepth::Eight) => 3,
            (png::ColorType::Rgba, png::BitDepth::Eight) => 4,
            (color, depth) => {
                return Err(SixelError::UnsupportedPixelLayout(format!(
                    "png {color:?} at {depth:?} bits"
                )))
            }
        };

        let mut pixels: Vec<u8> = try_alloc(reader.output_buffer_size())?;
        let frame = reader.next_frame(&mut pixels).map_err(png_error)?;
        pixels.truncate(frame.buffer_size());
        log::debug!(
            "png: {}x{}, {channels} channels, stride {}",
            frame.width,
            frame.height,
            frame.line_size
        );

        Image::new(
            pixels,
            frame.width as usize,
            frame.height as usize,
            channels,
            frame.line_size,
        )
    }
}

fn png_error(e: png::DecodingError) -> SixelError {
    match e {
        png::DecodingError::IoError(e) => SixelError::Io(e),
        e => SixelError::Decode(e.to_string()),
    }
}

/// Everything the `image` crate recognizes, converted to RGB.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericLoader;

impl GenericLoader {
    // enough for every signature image::guess_format knows
    const SNIFF_LEN: usize = 32;
}

impl ImageLoader for GenericLoader {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn check(&self, stream: &mut dyn ByteStream) -> Result<bool> {
        let head = stream.peek(Self::SNIFF_LEN)?;
        match image::guess_format(head) {
            Ok(format) => {
                log::trace!("generic: looks like {format:?}");
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn load(&self, stream: &mut dyn ByteStream) -> Result<Image> {
        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;
        let decoded = image::load_from_memory(&data).map_err(|e| match e {
            image::ImageError::IoError(e) => SixelError::Io(e),
            e => SixelError::Decode(e.to_string()),
        })?;
        let rgb = decoded.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        log::debug!("generic: {width}x{height} from {:?}", decoded.color());
        Image::from_rgb(rgb.into_raw(), width, height)
    }
}

/// The loaders tried by the viewer, most specific first.
pub fn default_loaders() -> Vec<Box<dyn ImageLoader>> {
    vec![Box::new(PngLoader), Box::new(GenericLoader)]
}

/// Decode `stream` with the first loader that claims it.
pub fn load_image(stream: &mut dyn ByteStream, loaders: &[Box<dyn ImageLoader>]) -> Result<Image> {
    if stream.is_eof()? {
        return Err(SixelError::UnsupportedFormat);
    }
    for loader in loaders {
        if loader.check(stream)? {
            log::debug!("loading with the {} loader", loader.name());
            return loader.load(stream);
        }
    }
    Err(SixelError::UnsupportedFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `chunk` bytes per read, like a pipe.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(out.len()).min(self.data.len());
            out[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut s = PeekableStream::new(Cursor::new(b"hello world".to_vec()));
        assert_eq!(s.peek(5).unwrap(), b"hello");
        assert_eq!(s.peek(2).unwrap(), b"he");
        let mut all = String::new();
        s.read_to_string(&mut all).unwrap();
        assert_eq!(all, "hello world");
        assert!(s.is_eof().unwrap());
    }

    #[test]
    fn test_peek_short_at_eof() {
        let mut s = PeekableStream::new(Cursor::new(vec![1u8, 2, 3]));
        assert_eq!(s.peek(10).unwrap(), &[1, 2, 3]);
        assert!(!s.is_eof().unwrap());
    }

    #[test]
    fn test_peek_after_partial_read() {
        let data: Vec<u8> = (0..100).collect();
        let mut s = PeekableStream::new(Trickle {
            data: &data,
            chunk: 7,
        });
        assert_eq!(s.peek(20).unwrap(), &data[..20]);
        let mut first = [0u8; 12];
        s.read_exact(&mut first).unwrap();
        assert_eq!(&first[..], &data[..12]);
        assert_eq!(s.peek(30).unwrap(), &data[12..42]);
        let mut rest = Vec::new();
        s.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, &data[12..]);
    }

    #[test]
    fn test_empty_stream_is_unsupported() {
        let mut s = PeekableStream::new(Cursor::new(Vec::new()));
        assert!(matches!(
            load_image(&mut s, &default_loaders()),
            Err(SixelError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_unknown_bytes_are_unsupported() {
        let mut s = PeekableStream::new(Cursor::new(b"certainly not an image".to_vec()));
        assert!(!PngLoader.check(&mut s).unwrap());
        assert!(!GenericLoader.check(&mut s).unwrap());
        assert!(matches!(
            load_image(&mut s, &default_loaders()),
            Err(SixelError::UnsupportedFormat)
        ));
    }
}
