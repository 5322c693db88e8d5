//! Information and structures for the `pak8` token streams.
//!
//! There are two stream formats: an LZ stream with back-references and a denser
//! RLE stream with only runs and literals. Neither has a header, a length prefix, or
//! a checksum. A stream is a flat sequence of tokens, and it ends at the first tag
//! byte that is `0`. Which format a blob holds is recorded out-of-band by whatever
//! embedded it; see [`StreamFormat`].
//!
//! ## LZ Stream
//! Every token starts with a tag byte. The top bit of the tag selects the token kind.
//!
//! | Tag         | Token    | Followed by |
//! | :---------: | -------- | ----------- |
//! | `0x00`      | End      | nothing |
//! | `0x01-0x7F` | Literal  | `tag` raw bytes |
//! | `0x80-0xFF` | Match    | one distance byte; copy `tag & 0x7F` bytes from `distance` bytes back |
//!
//! Matches are copied one byte at a time in increasing order, so a match may overlap
//! the bytes it produces. A distance of 1 repeats the previous byte `length` times,
//! and a distance of `d` repeats the previous `d` bytes periodically.
//!
//! The encoder never writes a match shorter than four bytes, so match tags start at
//! `0x84`, and a literal count is never zero. Thus `0` is always the terminator.
//!
//! ### An Example
//! Let's encode the exciting and useful ascii string "YAAAAAAAAAAAAAA".
//! The greedy search can't find a match for 'Y' or for the first 'A', but the third
//! byte starts a distance 1 match that covers the rest of the input.
//! ```text
//! 02 59 41 <- literal of two bytes: 'Y' 'A'
//! 8D 01    <- match of 13 bytes (0x80 | 13) from 1 byte back
//! 00       <- end
//! ```
//!
//! ## RLE Stream
//! | Tag         | Token    | Fields |
//! | :---------: | -------- | ------ |
//! | `0x00`      | End      | |
//! | `0x01-0x3F` | Run      | one fill byte, written `tag + 1` times (2-64) |
//! | `0x40-0x7F` | Literal  | `(tag & 0x3F) + 1` raw bytes (1-64) |
//! | `0x80-0xFF` | Combined | one fill byte written `((tag >> 4) & 7) + 1` times (1-8), then `(tag & 0x0F) + 1` raw bytes (1-16) |
//!
//! A run of a single byte has no pure run encoding, as tag `0` is the terminator.
//!
//! ### An Example
//! The bytes `00 00 00 00 00 'H' 'E' 'L' 'L' 'O'` pack into two combined tokens:
//! ```text
//! C1 00 48 45 <- five 00 bytes, then the two literals "HE"
//! 90 4C 4F    <- two 'L' bytes, then the literal "O"
//! 00          <- end
//! ```

use crate::errors::{MalformedStream, PakError};
use bitstream_io::{BitWriter, BE};
use std::fmt;
use std::io::Write;

/// The tag byte that ends every stream
pub const END: u8 = 0x00;

/// Set on the tag of every LZ match token
pub const MATCH_FLAG: u8 = 0x80;
/// Longest literal run that fits in an LZ literal tag
pub const MAX_LITERAL: usize = 0x7F;
/// Longest match that fits in the low seven bits of an LZ match tag
pub const MAX_MATCH: usize = 0x7F;
/// Furthest back-reference that fits in the distance byte
pub const MAX_DISTANCE: usize = 0xFF;
/// Shortest match that is cheaper than the same bytes as literals
pub const MIN_MATCH: usize = 4;
/// Bytes held by the ring buffer of a write-only decode
pub const SHADOW_SIZE: usize = 0x100;

/// Set on the tag of an RLE literal token (when [`RLE_COMBINED_FLAG`] is clear)
pub const RLE_LITERAL_FLAG: u8 = 0x40;
/// Set on the tag of an RLE combined token
pub const RLE_COMBINED_FLAG: u8 = 0x80;
/// Longest run in an RLE run token
pub const MAX_RLE_RUN: usize = 64;
/// Longest literal in an RLE literal token
pub const MAX_RLE_LITERAL: usize = 64;
/// Longest run in an RLE combined token
pub const MAX_COMBINED_RUN: usize = 8;
/// Longest literal that follows the run in an RLE combined token
pub const MAX_COMBINED_LITERAL: usize = 16;

/// The two token stream layouts.
///
/// Streams carry no header, so the format must be agreed on by the producer
/// and the consumer of the data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StreamFormat {
    Lz,
    Rle,
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Lz => write!(f, "LZ (literal/match)"),
            Self::Rle => write!(f, "RLE (run/literal/combined)"),
        }
    }
}

/// Summary of a stream, gathered without expanding it anywhere.
///
/// `expanded_size` is how large a destination buffer has to be to decode the stream.
/// You can get a `StreamInfo` with [`stream_info`](crate::stream_info) or
/// [`Decoder::info`](crate::Decoder::info).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub format: StreamFormat,
    /// bytes of the stream, including the terminator
    pub compressed_size: usize,
    /// bytes produced by decoding the stream
    pub expanded_size: usize,
    /// output bytes that were stored as literals
    pub literal_bytes: usize,
    /// output bytes produced by matches or runs
    pub repeated_bytes: usize,
}

fn tag_at(src: &[u8], at: usize) -> Result<u8, MalformedStream> {
    src.get(at)
        .copied()
        .ok_or(MalformedStream::UnexpectedEnd { position: at })
}

fn bytes_at(src: &[u8], at: usize, n: usize) -> Result<&[u8], MalformedStream> {
    src.get(at..at + n)
        .ok_or(MalformedStream::UnexpectedEnd {
            position: src.len(),
        })
}

/// A single token of an LZ stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzToken<'a> {
    Literal(&'a [u8]),
    Match { length: u8, distance: u8 },
    End,
}

impl<'a> LzToken<'a> {
    /// Read the token that starts at `src[at]`, returning it and the position
    /// of the following token.
    pub fn parse(src: &'a [u8], at: usize) -> Result<(Self, usize), PakError> {
        let tag = tag_at(src, at)?;

        if tag == END {
            Ok((Self::End, at + 1))
        } else if tag & MATCH_FLAG != 0 {
            let distance = tag_at(src, at + 1)?;
            let length = tag & !MATCH_FLAG;

            Ok((Self::Match { length, distance }, at + 2))
        } else {
            let bytes = bytes_at(src, at + 1, tag as usize)?;

            Ok((Self::Literal(bytes), at + 1 + bytes.len()))
        }
    }

    /// Number of bytes this token occupies in the stream
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Literal(bytes) => 1 + bytes.len(),
            Self::Match { .. } => 2,
            Self::End => 1,
        }
    }

    /// Write `self` to the `BitWriter` in the LZ wire format
    pub(crate) fn write<W: Write>(&self, wtr: &mut BitWriter<W, BE>) -> Result<(), PakError> {
        match *self {
            Self::Literal(bytes) => {
                debug_assert!(!bytes.is_empty() && bytes.len() <= MAX_LITERAL);
                wtr.write(8, bytes.len() as u8)?;
                wtr.write_bytes(bytes)?;
            }
            Self::Match { length, distance } => {
                debug_assert!(length as usize <= MAX_MATCH);
                wtr.write(8, MATCH_FLAG | length)?;
                wtr.write(8, distance)?;
            }
            Self::End => wtr.write(8, END)?,
        }

        Ok(())
    }
}

impl fmt::Display for LzToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Literal(bytes) => write!(f, "Literal: {} bytes {:02x?}", bytes.len(), bytes),
            Self::Match { length, distance } => {
                write!(f, "Match: size: {} mb: {}", length, distance)
            }
            Self::End => write!(f, "End"),
        }
    }
}

/// A single token of an RLE stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RleToken<'a> {
    /// `byte` repeated `count` times; `count` is 2..=64
    Run { byte: u8, count: u8 },
    Literal(&'a [u8]),
    /// `byte` repeated `run` times (1..=8), then 1..=16 `literal` bytes
    Combined { byte: u8, run: u8, literal: &'a [u8] },
    End,
}

impl<'a> RleToken<'a> {
    /// Read the token that starts at `src[at]`, returning it and the position
    /// of the following token.
    pub fn parse(src: &'a [u8], at: usize) -> Result<(Self, usize), PakError> {
        let tag = tag_at(src, at)?;

        let token = if tag == END {
            Self::End
        } else if tag & RLE_COMBINED_FLAG != 0 {
            let byte = tag_at(src, at + 1)?;
            let run = ((tag >> 4) & 0x07) + 1;
            let literal = bytes_at(src, at + 2, (tag & 0x0F) as usize + 1)?;

            Self::Combined { byte, run, literal }
        } else if tag & RLE_LITERAL_FLAG != 0 {
            Self::Literal(bytes_at(src, at + 1, (tag & 0x3F) as usize + 1)?)
        } else {
            let byte = tag_at(src, at + 1)?;

            Self::Run {
                byte,
                count: tag + 1,
            }
        };

        Ok((token, at + token.encoded_len()))
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Run { .. } => 2,
            Self::Literal(bytes) => 1 + bytes.len(),
            Self::Combined { literal, .. } => 2 + literal.len(),
            Self::End => 1,
        }
    }

    /// Write `self` to the `BitWriter` in the RLE wire format
    pub(crate) fn write<W: Write>(&self, wtr: &mut BitWriter<W, BE>) -> Result<(), PakError> {
        match *self {
            Self::Run { byte, count } => {
                debug_assert!((2..=MAX_RLE_RUN).contains(&(count as usize)));
                wtr.write(8, count - 1)?;
                wtr.write(8, byte)?;
            }
            Self::Literal(bytes) => {
                debug_assert!(!bytes.is_empty() && bytes.len() <= MAX_RLE_LITERAL);
                wtr.write(8, RLE_LITERAL_FLAG | (bytes.len() as u8 - 1))?;
                wtr.write_bytes(bytes)?;
            }
            Self::Combined { byte, run, literal } => {
                debug_assert!((1..=MAX_COMBINED_RUN).contains(&(run as usize)));
                debug_assert!(!literal.is_empty() && literal.len() <= MAX_COMBINED_LITERAL);
                let tag = RLE_COMBINED_FLAG | ((run - 1) << 4) | (literal.len() as u8 - 1);
                wtr.write(8, tag)?;
                wtr.write(8, byte)?;
                wtr.write_bytes(literal)?;
            }
            Self::End => wtr.write(8, END)?,
        }

        Ok(())
    }
}

impl fmt::Display for RleToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Run { byte, count } => write!(f, "Run: {:02x} x {}", byte, count),
            Self::Literal(bytes) => write!(f, "Literal: {} bytes {:02x?}", bytes.len(), bytes),
            Self::Combined { byte, run, literal } => write!(
                f,
                "Combined: {:02x} x {} then {} bytes {:02x?}",
                byte,
                run,
                literal.len(),
                literal
            ),
            Self::End => write!(f, "End"),
        }
    }
}
