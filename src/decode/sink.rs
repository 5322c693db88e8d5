use crate::{
    errors::{MalformedStream, PakError},
    format::SHADOW_SIZE,
};
use std::{io, io::Write, ops::Range};

/// A destination for decoded bytes.
///
/// The token loops in [`decode`](crate::decode) only talk to a `ByteSink`, so one
/// parser serves every kind of destination. A sink that can read its own output
/// copies back-references out of itself; one that can't has to remember what it wrote.
pub trait ByteSink {
    /// Total bytes written so far
    fn written(&self) -> usize;

    fn literal(&mut self, bytes: &[u8]) -> Result<(), PakError>;

    fn fill(&mut self, byte: u8, count: usize) -> Result<(), PakError> {
        for _ in 0..count {
            self.literal(&[byte])?;
        }
        Ok(())
    }

    /// Copy `length` bytes starting `distance` bytes behind the write position.
    /// The copy must run forward one byte at a time, as it may overlap its own output.
    fn copy_back(&mut self, distance: u8, length: usize) -> Result<(), PakError>;
}

fn check_lookback(distance: u8, written: usize) -> Result<(), MalformedStream> {
    let distance = distance as usize;
    if distance == 0 || distance > written {
        Err(MalformedStream::BadLookBack { distance, written })
    } else {
        Ok(())
    }
}

/// Decode into ordinary memory that can be read back.
#[derive(Debug)]
pub struct DirectSink<'a> {
    dst: &'a mut [u8],
    pos: usize,
}

impl<'a> DirectSink<'a> {
    pub fn new(dst: &'a mut [u8]) -> Self {
        Self { dst, pos: 0 }
    }

    fn reserve(&self, n: usize) -> Result<Range<usize>, MalformedStream> {
        let capacity = self.dst.len();
        match self.pos.checked_add(n) {
            Some(end) if end <= capacity => Ok(self.pos..end),
            _ => Err(MalformedStream::OutputOverflow {
                needed: self.pos.saturating_add(n),
                capacity,
            }),
        }
    }
}

impl ByteSink for DirectSink<'_> {
    fn written(&self) -> usize {
        self.pos
    }

    fn literal(&mut self, bytes: &[u8]) -> Result<(), PakError> {
        let range = self.reserve(bytes.len())?;
        self.pos = range.end;
        self.dst[range].copy_from_slice(bytes);
        Ok(())
    }

    fn fill(&mut self, byte: u8, count: usize) -> Result<(), PakError> {
        let range = self.reserve(count)?;
        self.pos = range.end;
        self.dst[range].fill(byte);
        Ok(())
    }

    fn copy_back(&mut self, distance: u8, length: usize) -> Result<(), PakError> {
        check_lookback(distance, self.pos)?;
        let range = self.reserve(length)?;
        let distance = distance as usize;

        for i in range.clone() {
            self.dst[i] = self.dst[i - distance];
        }
        self.pos = range.end;

        Ok(())
    }
}

/// Decode into a growable buffer. Back-references may reach into anything
/// already in the `Vec`.
impl ByteSink for Vec<u8> {
    fn written(&self) -> usize {
        self.len()
    }

    fn literal(&mut self, bytes: &[u8]) -> Result<(), PakError> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn fill(&mut self, byte: u8, count: usize) -> Result<(), PakError> {
        self.resize(self.len() + count, byte);
        Ok(())
    }

    fn copy_back(&mut self, distance: u8, length: usize) -> Result<(), PakError> {
        check_lookback(distance, self.len())?;
        let start = self.len() - distance as usize;

        self.reserve(length);
        for i in start..start + length {
            let byte = self[i];
            self.push(byte);
        }

        Ok(())
    }
}

/// A 256 byte ring that mirrors the most recent output of a decode.
///
/// The cursor is a `u8`, so every index wraps for free, and any distance a
/// token can hold (at most 255) still points inside the ring.
#[derive(Clone)]
pub struct ShadowWindow {
    buf: [u8; SHADOW_SIZE],
    cursor: u8,
}

impl ShadowWindow {
    pub const fn new() -> Self {
        Self {
            buf: [0; SHADOW_SIZE],
            cursor: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buf[self.cursor as usize] = byte;
        self.cursor = self.cursor.wrapping_add(1);
    }

    /// Replay `length` bytes from `distance` bytes back, pushing each one back
    /// into the ring and handing it to `emit` as it is produced.
    pub fn copy_back<F>(&mut self, distance: u8, length: usize, mut emit: F) -> io::Result<()>
    where
        F: FnMut(u8) -> io::Result<()>,
    {
        let mut from = self.cursor.wrapping_sub(distance);
        for _ in 0..length {
            let byte = self.buf[from as usize];
            self.push(byte);
            emit(byte)?;
            from = from.wrapping_add(1);
        }

        Ok(())
    }
}

impl Default for ShadowWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode into a write-only destination, such as a hardware data port.
///
/// Each byte is written to `port` exactly once and in order. The port is never
/// read; back-references are served from a [`ShadowWindow`] owned by the sink.
pub struct ShadowSink<W> {
    port: W,
    window: ShadowWindow,
    written: usize,
}

impl<W: Write> ShadowSink<W> {
    pub fn new(port: W) -> Self {
        Self {
            port,
            window: ShadowWindow::new(),
            written: 0,
        }
    }

    /// Give back the port, dropping the window
    pub fn into_inner(self) -> W {
        self.port
    }
}

impl<W: Write> ByteSink for ShadowSink<W> {
    fn written(&self) -> usize {
        self.written
    }

    fn literal(&mut self, bytes: &[u8]) -> Result<(), PakError> {
        for &byte in bytes {
            self.window.push(byte);
        }
        self.port.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    fn copy_back(&mut self, distance: u8, length: usize) -> Result<(), PakError> {
        check_lookback(distance, self.written)?;

        let Self { port, window, .. } = self;
        window.copy_back(distance, length, |byte| port.write_all(&[byte]))?;
        self.written += length;

        Ok(())
    }
}

/// Walks a stream without storing any output, for sizing a destination.
#[derive(Debug, Default)]
pub(crate) struct Measure {
    pub written: usize,
    pub literal_bytes: usize,
    pub repeated_bytes: usize,
}

impl ByteSink for Measure {
    fn written(&self) -> usize {
        self.written
    }

    fn literal(&mut self, bytes: &[u8]) -> Result<(), PakError> {
        self.written += bytes.len();
        self.literal_bytes += bytes.len();
        Ok(())
    }

    fn fill(&mut self, _byte: u8, count: usize) -> Result<(), PakError> {
        self.written += count;
        self.repeated_bytes += count;
        Ok(())
    }

    fn copy_back(&mut self, distance: u8, length: usize) -> Result<(), PakError> {
        check_lookback(distance, self.written)?;
        self.written += length;
        self.repeated_bytes += length;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn direct_overlapping_copy() {
        let mut dst = [0u8; 8];
        let mut sink = DirectSink::new(&mut dst);
        sink.literal(&[1, 2]).unwrap();
        sink.copy_back(2, 6).unwrap();
        assert_eq!(sink.written(), 8);
        assert_eq!(dst, [1, 2, 1, 2, 1, 2, 1, 2]);
    }

    #[test]
    fn direct_rejects_overflow_and_early_lookback() {
        let mut dst = [0u8; 4];
        let mut sink = DirectSink::new(&mut dst);

        match sink.copy_back(1, 2) {
            Err(PakError::Malformed(MalformedStream::BadLookBack {
                distance: 1,
                written: 0,
            })) => (),
            other => panic!("expected bad look back, got {:?}", other),
        }

        sink.fill(7, 3).unwrap();
        match sink.literal(&[1, 2]) {
            Err(PakError::Malformed(MalformedStream::OutputOverflow {
                needed: 5,
                capacity: 4,
            })) => (),
            other => panic!("expected overflow, got {:?}", other),
        }
        // a failed token leaves the position untouched
        assert_eq!(sink.written(), 3);
    }

    #[test]
    fn zero_distance_is_a_bad_lookback() {
        let mut out = vec![1, 2, 3];
        assert!(out.copy_back(0, 1).is_err());
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn shadow_window_wraps() {
        let mut window = ShadowWindow::new();
        for i in 0..300u32 {
            window.push(i as u8);
        }
        // cursor has wrapped to 300 % 256 == 44
        let mut replay = Vec::new();
        window
            .copy_back(255, 3, |b| {
                replay.push(b);
                Ok(())
            })
            .unwrap();
        // 255 back from 300 is 45
        assert_eq!(replay, [45, 46, 47]);
    }

    #[test]
    fn shadow_sink_matches_vec_sink() {
        let mut shadow = ShadowSink::new(Vec::new());
        let mut plain: Vec<u8> = Vec::new();

        for sink in &mut [&mut shadow as &mut dyn ByteSink, &mut plain] {
            sink.literal(b"abc").unwrap();
            sink.copy_back(3, 10).unwrap();
            sink.fill(b'z', 4).unwrap();
            sink.copy_back(1, 2).unwrap();
        }

        assert_eq!(shadow.written(), plain.len());
        let port = shadow.into_inner();
        assert_eq!(port, plain);
        assert_eq!(&port[..], b"abcabcabcabcazzzzzz");
    }
}
