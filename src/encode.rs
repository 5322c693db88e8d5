use crate::{
    errors::PakError,
    format::{LzToken, RleToken, StreamFormat},
};
use bitstream_io::{BigEndian, BitWriter};
use std::{
    fs::File,
    io::Write,
    io::{BufReader, BufWriter, Cursor, Read},
    path::Path,
};

mod lzss;
mod rle;

pub use self::lzss::LzSettings;
use self::lzss::LzPass;

type LogWtr<'a> = &'a mut dyn Write;

/// Specify the encoding settings, such as format, search parameters, logging, input, and output
///
/// To create a new `EncoderBuilder`, use [`for_reader()`], [`for_file()`], or [`for_bytes()`].
/// Then, change any of the encoding settings with `EncoderBuilder`'s helper methods.
/// Finally, encode the input data with [`encode_to_writer()`], [`encode_to_file()`], or [`encode_to_vec()`].
/// ```
/// # use pak8::{EncoderBuilder, LzSettings};
/// let input = b"ABBACABBCADFEGABA";
/// let compressed = EncoderBuilder::for_bytes(input)
///     .with_lz_settings(LzSettings { min_match: 5, ..LzSettings::default() })
///     .with_logging(&mut ::std::io::stdout())
///     .encode_to_vec();
/// ```
///
/// The default encoding settings are as follows:
/// * LZ format
/// * No logging
/// * LZ settings:
///   * 255 byte dictionary
///   * 127 byte maximum match
///   * Minimum match of 4 bytes
///   * 127 byte maximum literal run
///
/// [`for_reader()`]: EncoderBuilder::for_reader
/// [`for_file()`]: EncoderBuilder::for_file
/// [`for_bytes()`]: EncoderBuilder::for_bytes
/// [`encode_to_writer()`]: EncoderBuilder::encode_to_writer
/// [`encode_to_file()`]: EncoderBuilder::encode_to_file
/// [`encode_to_vec()`]: EncoderBuilder::encode_to_vec
pub struct EncoderBuilder<'a, R> {
    rdr: R,
    format: StreamFormat,
    settings: LzSettings,
    log: Option<LogWtr<'a>>,
}

impl<'a, R: Read> EncoderBuilder<'a, R> {
    /// Create a new `EncoderBuilder` for the data in `rdr`.
    #[inline]
    pub fn for_reader(rdr: R) -> Self {
        Self {
            rdr,
            format: StreamFormat::Lz,
            settings: LzSettings::default(),
            log: None,
        }
    }

    /// Set the output stream format. There is no header in the output,
    /// so the consumer has to be told which format was used.
    #[inline]
    pub fn format(&mut self, format: StreamFormat) -> &mut Self {
        self.format = format;
        self
    }

    /// Convenience method to set LZ encoding without importing [`StreamFormat`].
    #[inline]
    pub fn lz(&mut self) -> &mut Self {
        self.format(StreamFormat::Lz)
    }

    /// Convenience method to set RLE encoding without importing [`StreamFormat`].
    #[inline]
    pub fn rle(&mut self) -> &mut Self {
        self.format(StreamFormat::Rle)
    }

    /// Set the settings used for the LZ match search. See [`LzSettings`] for more details.
    /// The settings are checked when encoding starts.
    #[inline]
    pub fn with_lz_settings(&mut self, settings: LzSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    /// Write debugging and diagnostic information to `log` while the input is
    /// being encoded.
    #[inline]
    pub fn with_logging<L: Write>(&mut self, log: &'a mut L) -> &mut Self {
        self.log = Some(log as LogWtr);
        self
    }

    /// Start the encoding and write the compressed data out to `wtr`
    #[inline]
    pub fn encode_to_writer<W: Write>(&mut self, wtr: W) -> Result<(), PakError> {
        do_encode(self, wtr)
    }

    /// Start the encoding and write the compressed data out to the newly created
    /// `File` `f`
    #[inline]
    pub fn encode_to_file<P: AsRef<Path>>(&mut self, f: P) -> Result<(), PakError> {
        let mut wtr = BufWriter::new(File::create(f)?);
        self.encode_to_writer(&mut wtr)?;
        wtr.flush().map_err(Into::into)
    }

    /// Start the encoding and return the compressed data in a `Vec<u8>`.
    #[inline]
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>, PakError> {
        let mut data = Vec::new();
        self.encode_to_writer(&mut data).map(|_| data)
    }
}

impl<'a> EncoderBuilder<'a, BufReader<File>> {
    /// Create a new `EncoderBuilder` for the file at `p`.
    #[inline]
    pub fn for_file<P: AsRef<Path>>(p: P) -> Result<Self, PakError> {
        let rdr = BufReader::new(File::open(p)?);
        Ok(Self::for_reader(rdr))
    }
}

impl<'a> EncoderBuilder<'a, Cursor<&'a [u8]>> {
    /// Create a new `EncoderBuilder` for the data the `bytes` slice.
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        let rdr = Cursor::new(bytes);
        Self::for_reader(rdr)
    }
}

/// Compress data into an LZ stream
///
/// This is a convenience function to encode a `Read`er without having to
/// import and set up an [`EncoderBuilder`].
pub fn encode<R: Read>(rdr: R) -> Result<Vec<u8>, PakError> {
    EncoderBuilder::for_reader(rdr).encode_to_vec()
}

/// Compress `source` into an LZ stream with the default [`LzSettings`].
///
/// Any input can be compressed, including an empty one; the output always ends
/// with the terminator. Input with nothing to match grows by one byte per 127.
/// ```
/// let packed = pak8::compress(&[5; 10]);
/// assert_eq!(packed, [0x02, 5, 5, 0x88, 0x01, 0x00]);
/// ```
pub fn compress(source: &[u8]) -> Vec<u8> {
    // a slice reader and a Vec writer can't fail, and the settings are the defaults
    EncoderBuilder::for_bytes(source)
        .encode_to_vec()
        .expect("in-memory LZ encode")
}

/// Compress `source` into an RLE stream.
/// ```
/// let packed = pak8::compress_rle(b"\0\0\0\0\0HELLO");
/// assert_eq!(packed, [0xC1, 0x00, b'H', b'E', 0x90, b'L', b'O', 0x00]);
/// ```
pub fn compress_rle(source: &[u8]) -> Vec<u8> {
    EncoderBuilder::for_bytes(source)
        .rle()
        .encode_to_vec()
        .expect("in-memory RLE encode")
}

fn do_encode<R: Read, W: Write>(
    opts: &mut EncoderBuilder<'_, R>,
    wtr: W,
) -> Result<(), PakError> {
    let EncoderBuilder {
        rdr,
        format,
        settings,
        log,
    } = opts;

    let mut out = BitWriter::endian(wtr, BigEndian);

    match format {
        StreamFormat::Lz => {
            settings.validate()?;
            let lzss = lzss::compress_rdr(rdr, *settings, log)?;

            if let Some(wtr) = log.as_mut() {
                writeln!(wtr, "{}", &lzss)?;
            }

            write_lz(&mut out, &lzss)?;
        }
        StreamFormat::Rle => {
            let mut input = Vec::new();
            rdr.read_to_end(&mut input)?;
            let tokens = rle::pack(&input);

            if let Some(wtr) = log.as_mut() {
                writeln!(wtr, "# RLE Pass")?;
                let mut position = 0;
                for token in &tokens {
                    writeln!(wtr, "{:04x} - {}", position, token)?;
                    position += token.encoded_len();
                }
            }

            for token in &tokens {
                token.write(&mut out)?;
            }
            RleToken::End.write(&mut out)?;
        }
    }

    // every token is whole bytes, so this never pads
    out.byte_align()?;

    Ok(())
}

fn write_lz<W: Write>(out: &mut BitWriter<W, BigEndian>, encoded: &LzPass) -> Result<(), PakError> {
    for code in &encoded.buf {
        code.as_token().write(out)?;
    }

    LzToken::End.write(out)
}
