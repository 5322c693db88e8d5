use crate::{
    errors::PakError,
    format::{LzToken, RleToken, StreamFormat, StreamInfo},
};
use std::io::Write;

mod sink;

pub use self::sink::{ByteSink, DirectSink, ShadowSink, ShadowWindow};
use self::sink::Measure;

type LogWtr<'a> = &'a mut dyn Write;

/// Specify the decoding settings, such as the stream format and logging.
///
/// A `Decoder` holds a cursor into its input, so several streams that were
/// compressed separately and then stored back-to-back can be expanded one after
/// another. Each call to [`decode()`], [`decode_into()`], or [`decode_to_port()`]
/// consumes exactly one stream, through its terminator.
/// ```
/// # use pak8::{compress, Decoder};
/// let mut blob = compress(b"first asset");
/// blob.extend(compress(b"second asset"));
///
/// let mut decoder = Decoder::for_bytes(&blob);
/// assert_eq!(decoder.decode().unwrap(), b"first asset");
/// assert_eq!(decoder.decode().unwrap(), b"second asset");
/// assert!(decoder.is_finished());
/// ```
/// Use [`info()`] to find out how large a destination buffer must be:
/// ```
/// # use pak8::{compress, Decoder};
/// let compressed = compress(b"ABBACABBACABBACD");
/// let mut decoder = Decoder::for_bytes(&compressed);
/// let mut dst = vec![0; decoder.info().unwrap().expanded_size];
/// decoder.decode_into(&mut dst).unwrap();
/// assert_eq!(&dst[..], b"ABBACABBACABBACD");
/// ```
/// [`decode()`]: Decoder::decode
/// [`decode_into()`]: Decoder::decode_into
/// [`decode_to_port()`]: Decoder::decode_to_port
/// [`info()`]: Decoder::info
pub struct Decoder<'a> {
    src: &'a [u8],
    pos: usize,
    format: StreamFormat,
    log: Option<LogWtr<'a>>,
}

impl<'a> Decoder<'a> {
    /// Create a new LZ `Decoder` over the data in `src`.
    #[inline]
    pub fn for_bytes(src: &'a [u8]) -> Self {
        Self {
            src,
            pos: 0,
            format: StreamFormat::Lz,
            log: None,
        }
    }

    #[inline]
    pub fn format(&mut self, format: StreamFormat) -> &mut Self {
        self.format = format;
        self
    }

    /// Convenience method to decode LZ streams without importing [`StreamFormat`].
    #[inline]
    pub fn lz(&mut self) -> &mut Self {
        self.format(StreamFormat::Lz)
    }

    /// Convenience method to decode RLE streams without importing [`StreamFormat`].
    #[inline]
    pub fn rle(&mut self) -> &mut Self {
        self.format(StreamFormat::Rle)
    }

    /// Write every decoded token to `wtr`.
    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    /// Offset in the input of the next stream to decode
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Describe the next stream without consuming it.
    pub fn info(&mut self) -> Result<StreamInfo, PakError> {
        let mut measure = Measure::default();
        let used = self.expand(&mut measure)?;

        Ok(StreamInfo {
            format: self.format,
            compressed_size: used,
            expanded_size: measure.written,
            literal_bytes: measure.literal_bytes,
            repeated_bytes: measure.repeated_bytes,
        })
    }

    /// Decode the next stream into a new `Vec<u8>`.
    #[inline]
    pub fn decode(&mut self) -> Result<Vec<u8>, PakError> {
        let mut output = Vec::new();
        self.consume(&mut output)?;
        Ok(output)
    }

    /// Decode the next stream into `dst`, and return the number of bytes written.
    ///
    /// `dst` is read back while decoding, so it must be ordinary memory.
    pub fn decode_into(&mut self, dst: &mut [u8]) -> Result<usize, PakError> {
        let mut sink = DirectSink::new(dst);
        self.consume(&mut sink)?;
        Ok(sink.written())
    }

    /// Decode the next stream into the write-only `port`, and return the number
    /// of bytes written. Every output byte is written to `port` exactly once, in order.
    pub fn decode_to_port<W: Write>(&mut self, port: W) -> Result<usize, PakError> {
        let mut sink = ShadowSink::new(port);
        self.consume(&mut sink)?;
        Ok(sink.written())
    }

    fn consume<S: ByteSink>(&mut self, sink: &mut S) -> Result<(), PakError> {
        let used = self.expand(sink)?;
        self.pos += used;
        Ok(())
    }

    fn expand<S: ByteSink>(&mut self, sink: &mut S) -> Result<usize, PakError> {
        let src = &self.src[self.pos..];

        if let Some(wtr) = self.log.as_mut() {
            writeln!(wtr, "# {} stream at {:04x}", self.format, self.pos)?;
        }

        match self.format {
            StreamFormat::Lz => expand_lz(sink, src, &mut self.log),
            StreamFormat::Rle => expand_rle_tokens(sink, src, &mut self.log),
        }
    }
}

/// Decompress an LZ stream into a `Vec<u8>`
///
/// This is a convenience function for when the expanded size is not known
/// ahead of time. It doesn't need a [`Decoder`].
pub fn decode(src: &[u8]) -> Result<Vec<u8>, PakError> {
    Decoder::for_bytes(src).decode()
}

/// Expand the LZ stream at the start of `src` into `dst`, copying back-references
/// out of `dst` itself.
///
/// Returns the number of bytes of `src` that were consumed, which is the position
/// just past the terminator.
///
/// This is a checked decoder: it fails with [`PakError::Malformed`] if the stream
/// is truncated, copies from before the start of `dst`, or does not fit in `dst`.
/// A stream made by [`compress`](crate::compress) into a `dst` of at least its
/// expanded size never fails.
pub fn expand_direct(dst: &mut [u8], src: &[u8]) -> Result<usize, PakError> {
    expand_lz(&mut DirectSink::new(dst), src, &mut None)
}

/// Expand the LZ stream at the start of `src` into a destination that can't be read
/// back, such as a video or audio data port.
///
/// A 256 byte [`ShadowWindow`] local to this call stands in for the destination when
/// copying back-references. The bytes written to `port` are exactly the bytes
/// [`expand_direct`] would write. Returns the number of bytes of `src` that were consumed.
///
/// Like [`expand_direct`], malformed streams are an error instead of undefined output;
/// encoder output only fails if writing to `port` does.
pub fn expand_shadow<W: Write>(port: W, src: &[u8]) -> Result<usize, PakError> {
    expand_lz(&mut ShadowSink::new(port), src, &mut None)
}

/// Expand the RLE stream at the start of `src` into `dst`.
///
/// Returns the number of bytes of `src` that were consumed. Truncated streams and
/// streams that overflow `dst` are rejected with [`PakError::Malformed`], which
/// never happens for [`compress_rle`](crate::compress_rle) output and a large enough `dst`.
pub fn expand_rle(dst: &mut [u8], src: &[u8]) -> Result<usize, PakError> {
    expand_rle_tokens(&mut DirectSink::new(dst), src, &mut None)
}

/// Measure the `format` stream at the start of `src`
///
/// This is a convenience function to inspect a stream without setting up a [`Decoder`].
pub fn stream_info(src: &[u8], format: StreamFormat) -> Result<StreamInfo, PakError> {
    Decoder::for_bytes(src).format(format).info()
}

fn expand_lz<S: ByteSink>(
    sink: &mut S,
    src: &[u8],
    log: &mut Option<LogWtr<'_>>,
) -> Result<usize, PakError> {
    let mut csr = 0;

    loop {
        let (token, next) = LzToken::parse(src, csr)?;

        if let Some(wtr) = log.as_mut() {
            writeln!(wtr, "{:04x} -> {:04x} - {}", csr, sink.written(), token)?;
        }

        match token {
            LzToken::Literal(bytes) => sink.literal(bytes)?,
            LzToken::Match { length, distance } => sink.copy_back(distance, length as usize)?,
            LzToken::End => return Ok(next),
        }

        csr = next;
    }
}

fn expand_rle_tokens<S: ByteSink>(
    sink: &mut S,
    src: &[u8],
    log: &mut Option<LogWtr<'_>>,
) -> Result<usize, PakError> {
    let mut csr = 0;

    loop {
        let (token, next) = RleToken::parse(src, csr)?;

        if let Some(wtr) = log.as_mut() {
            writeln!(wtr, "{:04x} -> {:04x} - {}", csr, sink.written(), token)?;
        }

        match token {
            RleToken::Run { byte, count } => sink.fill(byte, count as usize)?,
            RleToken::Literal(bytes) => sink.literal(bytes)?,
            RleToken::Combined { byte, run, literal } => {
                sink.fill(byte, run as usize)?;
                sink.literal(literal)?;
            }
            RleToken::End => return Ok(next),
        }

        csr = next;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::MalformedStream;

    #[test]
    fn rle_terminator_writes_nothing() {
        let mut dst = [0xEEu8; 4];
        assert_eq!(expand_rle(&mut dst, &[0x00, 0x05, 0x06]).unwrap(), 1);
        assert_eq!(dst, [0xEE; 4]);
    }

    #[test]
    fn rle_shortest_pure_run() {
        let mut dst = [0u8; 4];
        let used = expand_rle(&mut dst, &[0x01, 0x7A, 0x00]).unwrap();
        assert_eq!(used, 3);
        assert_eq!(dst, [0x7A, 0x7A, 0, 0]);
    }

    #[test]
    fn rle_every_token_kind() {
        let src = [
            0x42, b'a', b'b', b'c', // literal of 3
            0x03, b'-', // run of 4
            0x91, b'x', b'1', b'2', // run of 2, then literal of 2
            0x00,
        ];
        let mut dst = [0u8; 11];
        assert_eq!(expand_rle(&mut dst, &src).unwrap(), src.len());
        assert_eq!(&dst, b"abc----xx12");
    }

    #[test]
    fn lz_shadow_matches_direct() {
        let src = [0x03, 1, 2, 3, 0x88, 0x03, 0x02, 9, 8, 0x84, 0x01, 0x00];
        let mut dst = [0u8; 17];
        let used = expand_direct(&mut dst, &src).unwrap();
        assert_eq!(used, src.len());
        assert_eq!(dst, [1, 2, 3, 1, 2, 3, 1, 2, 3, 1, 2, 9, 8, 8, 8, 8, 8]);

        let mut port = Vec::new();
        assert_eq!(expand_shadow(&mut port, &src).unwrap(), used);
        assert_eq!(port, dst);
    }

    #[test]
    fn lz_lookback_before_start() {
        let src = [0x02, 1, 2, 0x84, 0x03, 0x00];
        let mut dst = [0u8; 8];
        match expand_direct(&mut dst, &src) {
            Err(PakError::Malformed(MalformedStream::BadLookBack {
                distance: 3,
                written: 2,
            })) => (),
            other => panic!("expected bad look back, got {:?}", other),
        }
        match expand_shadow(Vec::new(), &src) {
            Err(PakError::Malformed(MalformedStream::BadLookBack { .. })) => (),
            other => panic!("expected bad look back, got {:?}", other),
        }
    }

    #[test]
    fn missing_terminator() {
        let src = [0x02, 1, 2];
        match decode(&src) {
            Err(PakError::Malformed(MalformedStream::UnexpectedEnd { position: 3 })) => (),
            other => panic!("expected early end, got {:?}", other),
        }
    }

    #[test]
    fn info_does_not_advance() {
        let src = [0x01, 7, 0x85, 0x01, 0x00, 0x3F];
        let mut decoder = Decoder::for_bytes(&src);
        let info = decoder.info().unwrap();

        assert_eq!(
            info,
            StreamInfo {
                format: StreamFormat::Lz,
                compressed_size: 5,
                expanded_size: 6,
                literal_bytes: 1,
                repeated_bytes: 5,
            }
        );
        assert_eq!(decoder.position(), 0);
        assert_eq!(decoder.decode().unwrap(), [7; 6]);
        assert_eq!(decoder.position(), 5);
        assert!(!decoder.is_finished());
    }

    #[test]
    fn logs_each_token() {
        let src = [0x01, 7, 0x85, 0x01, 0x00];
        let mut log = Vec::new();
        Decoder::for_bytes(&src)
            .with_logging(&mut log)
            .decode()
            .unwrap();

        let log = String::from_utf8(log).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 4, "{}", log);
        assert!(lines[2].starts_with("0002 -> 0001 - Match"), "{}", log);
        assert!(lines[3].ends_with("End"), "{}", log);
    }
}
