//! Compression for the binary assets of 8-bit home computer and console targets.
//!
//! Bitmaps, sprites, fonts, and overlay code banks are compressed once on the
//! host while building, and expanded on the target with very little CPU time and
//! RAM. There are two headerless stream formats (see [`format`]):
//!
//! * an LZ stream of literal runs and short back-references, made by [`compress`]
//!   or an [`EncoderBuilder`], and
//! * a denser RLE stream of runs and literals, made by [`compress_rle`].
//!
//! LZ streams can be expanded into ordinary memory with [`expand_direct`], or into a
//! destination that can't be read back, such as a hardware data port, with
//! [`expand_shadow`]. Both produce the same bytes. RLE streams are expanded with
//! [`expand_rle`]. A [`Decoder`] walks several streams stored back-to-back.
//! ```
//! let sprite = [0u8, 0, 0, 0, 0x3C, 0x42, 0x81, 0x81, 0x42, 0x3C, 0, 0, 0, 0];
//! let packed = pak8::compress(&sprite);
//!
//! let mut ram = [0u8; 14];
//! let used = pak8::expand_direct(&mut ram, &packed).unwrap();
//! assert_eq!(used, packed.len());
//! assert_eq!(ram, sprite);
//!
//! let mut port = Vec::new();
//! pak8::expand_shadow(&mut port, &packed).unwrap();
//! assert_eq!(port, sprite);
//! ```

mod decode;
mod encode;
mod errors;
pub mod format;

pub use decode::{
    decode, expand_direct, expand_rle, expand_shadow, stream_info, ByteSink, Decoder, DirectSink,
    ShadowSink, ShadowWindow,
};
pub use encode::{compress, compress_rle, encode, EncoderBuilder, LzSettings};
pub use errors::{MalformedStream, PakError};
pub use format::{StreamFormat, StreamInfo};
