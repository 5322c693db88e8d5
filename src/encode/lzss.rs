use std::{
    fmt,
    io::{self, Read, Write},
};

use slice_deque::SliceDeque;
use smallvec::SmallVec;

use crate::{
    errors::PakError,
    format::{LzToken, MAX_DISTANCE, MAX_LITERAL, MAX_MATCH, MIN_MATCH},
};

/// Pending literal bytes; never longer than [`MAX_LITERAL`]
pub(super) type LiteralRun = SmallVec<[u8; 128]>;

/// Configure the greedy LZ search
///
/// The four parameters trade compression for speed and token mix. Larger values
/// than the defaults can't be stored in the token stream and are rejected when
/// encoding starts.
///
/// By [`default`](LzSettings::default):
///
/// | Parameter        | Field          | Default | Limit |
/// | ---------------- | -------------- | :-----: | :---: |
/// | Dictionary       | `max_distance` | 255     | 1-255 |
/// | Max Match        | `max_match`    | 127     | `min_match`-127 |
/// | Min Match        | `min_match`    | 4       | 1-`max_match` |
/// | Max Literal Run  | `max_literal`  | 127     | 1-127 |
///
/// A minimum match of four is the break even point for a two byte match token.
/// Smaller values are legal, but will only make the output larger.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LzSettings {
    /// furthest back a match may start (window size)
    pub max_distance: usize,
    /// longest match that is encoded
    pub max_match: usize,
    /// shortest match that is encoded instead of literals
    pub min_match: usize,
    /// longest run of literals in one token
    pub max_literal: usize,
}

impl LzSettings {
    pub const fn new(
        max_distance: usize,
        max_match: usize,
        min_match: usize,
        max_literal: usize,
    ) -> Self {
        Self {
            max_distance,
            max_match,
            min_match,
            max_literal,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PakError> {
        let bad = |msg: String| -> Result<(), PakError> { Err(PakError::InvalidSettings(msg)) };

        if self.max_distance == 0 || self.max_distance > MAX_DISTANCE {
            bad(format!(
                "dictionary of {} bytes is outside 1..={}",
                self.max_distance, MAX_DISTANCE
            ))
        } else if self.max_match > MAX_MATCH {
            bad(format!(
                "max match of {} is larger than {}",
                self.max_match, MAX_MATCH
            ))
        } else if self.min_match == 0 || self.min_match > self.max_match {
            bad(format!(
                "min match of {} is outside 1..={}",
                self.min_match, self.max_match
            ))
        } else if self.max_literal == 0 || self.max_literal > MAX_LITERAL {
            bad(format!(
                "literal run of {} is outside 1..={}",
                self.max_literal, MAX_LITERAL
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for LzSettings {
    fn default() -> Self {
        Self {
            max_distance: MAX_DISTANCE,
            max_match: MAX_MATCH,
            min_match: MIN_MATCH,
            max_literal: MAX_LITERAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum LzCode {
    Literal(LiteralRun),
    Match(MoveBack),
}

impl LzCode {
    pub(super) fn as_token(&self) -> LzToken<'_> {
        match self {
            Self::Literal(run) => LzToken::Literal(&run[..]),
            Self::Match(m) => LzToken::Match {
                length: m.size as u8,
                distance: m.moveback as u8,
            },
        }
    }

    // total number of bytes this code expands to
    fn size(&self) -> usize {
        match self {
            Self::Literal(run) => run.len(),
            Self::Match(m) => m.size,
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct LzPass {
    pub buf: Vec<LzCode>,
    pub decompressed_size: usize,
    pub literal_bytes: usize,
    pub matched_bytes: usize,
}

impl LzPass {
    /// Move any pending literals into a literal code
    fn flush(&mut self, pending: &mut LiteralRun) {
        if pending.is_empty() {
            return;
        }
        self.literal_bytes += pending.len();
        self.buf.push(LzCode::Literal(pending.clone()));
        pending.clear();
    }

    fn add_match(&mut self, m: MoveBack) {
        self.matched_bytes += m.size;
        self.buf.push(LzCode::Match(m));
    }

    /// Size of the token stream this pass encodes to, including the terminator
    pub fn encoded_size(&self) -> usize {
        self.buf.iter().map(|c| c.as_token().encoded_len()).sum::<usize>() + 1
    }
}

impl fmt::Display for LzPass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "# LZ Pass")?;
        writeln!(
            f,
            "{} bytes => {} bytes ({} literal, {} matched)",
            self.decompressed_size,
            self.encoded_size(),
            self.literal_bytes,
            self.matched_bytes
        )?;
        let mut position = 0;
        for code in &self.buf {
            writeln!(f, "{:04x} - {}", position, code.as_token())?;
            position += code.size();
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(super) struct MoveBack {
    size: usize,     // length
    moveback: usize, // distance
}

impl MoveBack {
    fn new(size: usize, moveback: usize) -> Self {
        Self { size, moveback }
    }
}

/// Compress the data in `input` with `settings` into a Vec of literal and match codes.
/// Debugging information will be printed to `log` if present.
pub(super) fn compress_rdr<R: Read>(
    input: R,
    settings: LzSettings,
    log: &mut Option<&mut dyn Write>,
) -> Result<LzPass, PakError> {
    let mut dict = SlidingDict::new(input, &settings)?;
    let mut compressed = LzPass::default();
    let mut pending = LiteralRun::new();

    while dict.remaining() > 0 {
        let bytes_matched = match find_longest_match(&dict, &settings) {
            Some(m) => {
                if let Some(wtr) = log.as_mut() {
                    writeln!(
                        wtr,
                        "{:04x} - adding match: {:?} after {} literals",
                        dict.position(),
                        &m,
                        pending.len()
                    )?;
                }
                compressed.flush(&mut pending);
                compressed.add_match(m);
                m.size
            }
            None => {
                pending.push(dict.ahead()[0]);
                if pending.len() >= settings.max_literal {
                    compressed.flush(&mut pending);
                }
                1
            }
        };

        dict.advance_by(bytes_matched)?;
    }

    compressed.flush(&mut pending);
    compressed.decompressed_size = dict.total_read;

    Ok(compressed)
}

/// Search every distance from nearest to furthest for the longest match of the
/// lookahead. Only a strictly longer match replaces the best one, so ties go to
/// the smallest distance.
///
/// A match never starts at the first byte of the input: the furthest distance
/// tried is one less than the current position.
fn find_longest_match<R>(dict: &SlidingDict<R>, settings: &LzSettings) -> Option<MoveBack> {
    let (full, csr) = dict.view();
    let ahead = &full[csr..];
    let longest_match = ahead.len().min(settings.max_match);
    let reach = csr
        .min(settings.max_distance)
        .min(dict.position().saturating_sub(1));
    let mut best: Option<MoveBack> = None;

    for distance in 1..=reach {
        let length = full[csr - distance..]
            .iter()
            .zip(&ahead[..longest_match])
            .take_while(|(s, a)| s == a)
            .count();

        if length > best.map_or(0, |b| b.size) {
            best = Some(MoveBack::new(length, distance));
            if length == longest_match {
                break;
            }
        }
    }

    best.filter(|m| m.size >= settings.min_match)
}

/// Read until `buf` is full or `rdr` is exhausted.
/// Based on the `read_exact` default implementation.
fn read_fill<R: Read>(rdr: &mut R, mut buf: &mut [u8]) -> io::Result<usize> {
    let mut bytes_read = 0;
    while !buf.is_empty() {
        match rdr.read(buf) {
            Ok(0) => break,
            Ok(n) => {
                let tmp = buf;
                buf = &mut tmp[n..];
                bytes_read += n;
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(bytes_read)
}

/// A window over the input that holds up to `window` bytes behind the cursor
/// and up to `lookahead` bytes at and after it, in one contiguous slice.
#[derive(Debug)]
struct SlidingDict<R> {
    /// size of the look-behind dictionary window
    window: usize,
    /// current position in `buf` for start of lookahead
    csr: usize,
    buf: SliceDeque<u8>,
    rdr: R,
    /// is there any more data to be read from `rdr`
    more_to_read: bool,
    /// total bytes read
    total_read: usize,
}

impl<R: Read> SlidingDict<R> {
    fn new(mut rdr: R, settings: &LzSettings) -> io::Result<Self> {
        let window = settings.max_distance;
        let lookahead = settings.max_match;

        // at the start, everything is in the lookahead
        let mut buf = SliceDeque::with_capacity(window + lookahead);
        buf.resize(lookahead, 0);
        let total_read = read_fill(&mut rdr, &mut buf[..])?;
        let more_to_read = total_read == lookahead;
        // if the rdr was too small to even fill the lookahead buffer
        // truncate the buffer back to only what was read
        buf.truncate_back(total_read);

        Ok(Self {
            window,
            csr: 0,
            buf,
            rdr,
            more_to_read,
            total_read,
        })
    }

    fn advance_by(&mut self, n: usize) -> io::Result<()> {
        // move the cursor up if needed, and record how many excess
        // bytes need to be removed from the front
        let p = self.csr + n;
        let (new_csr, excess) = (p.min(self.window), p.saturating_sub(self.window));

        if excess > 0 {
            self.buf.drain(..excess);
        }
        self.csr = new_csr;

        // refill the back of the ring with `n` new bytes from `rdr`
        if self.more_to_read {
            let len = self.buf.len();
            self.buf.resize(len + n, 0);

            let bytes_read = read_fill(&mut self.rdr, &mut self.buf[len..len + n])?;
            self.total_read += bytes_read;

            if bytes_read < n {
                self.buf.truncate_back(len + bytes_read);
                self.more_to_read = false;
            }
        }

        Ok(())
    }
}

impl<R> SlidingDict<R> {
    /// The whole window and the index of the cursor inside it
    fn view(&self) -> (&[u8], usize) {
        (&self.buf[..], self.csr)
    }

    fn ahead(&self) -> &[u8] {
        &self.buf[self.csr..]
    }

    fn remaining(&self) -> usize {
        self.ahead().len()
    }

    /// Offset of the cursor in the whole input
    fn position(&self) -> usize {
        self.total_read - self.remaining()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn pass(input: &[u8], settings: LzSettings) -> LzPass {
        compress_rdr(Cursor::new(input), settings, &mut None).unwrap()
    }

    fn codes(input: &[u8]) -> Vec<LzCode> {
        pass(input, LzSettings::default()).buf
    }

    fn literal(bytes: &[u8]) -> LzCode {
        LzCode::Literal(bytes.iter().copied().collect())
    }

    fn matched(size: usize, moveback: usize) -> LzCode {
        LzCode::Match(MoveBack::new(size, moveback))
    }

    /// Reads at most `n` bytes per call
    struct Trickle<'a>(&'a [u8], usize);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.1).min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn ties_prefer_nearest_distance() {
        // "wxyz" is both 5 and 13 bytes back from the last four bytes
        let input = b"5wxyz1234wxyz6wxyz";
        assert_eq!(
            codes(input),
            vec![
                literal(b"5wxyz1234"),
                matched(4, 8),
                literal(b"6"),
                matched(4, 5)
            ]
        );

        let input = b"abcdabcdabcdX";
        assert_eq!(
            codes(input),
            vec![literal(b"abcda"), matched(7, 4), literal(b"X")]
        );
    }

    #[test]
    fn first_byte_is_never_matched() {
        assert_eq!(codes(b"abcdabcd"), vec![literal(b"abcdabcd")]);
        assert_eq!(codes(b"wxyz1234wxyz"), vec![literal(b"wxyz1234wxyz")]);
        assert_eq!(codes(&[5; 10]), vec![literal(&[5, 5]), matched(8, 1)]);
    }

    #[test]
    fn short_matches_stay_literal() {
        let input = b"abcXabcYabc";
        assert_eq!(codes(input), vec![literal(input)]);
    }

    #[test]
    fn literal_runs_are_capped() {
        let input: Vec<u8> = (0..=255).collect();
        let lens: Vec<_> = codes(&input).iter().map(LzCode::size).collect();
        assert_eq!(lens, [127, 127, 2]);
    }

    #[test]
    fn matches_are_capped() {
        let input = vec![0x55; 300];
        assert_eq!(
            codes(&input),
            vec![
                literal(&[0x55, 0x55]),
                matched(127, 1),
                matched(127, 1),
                matched(44, 1)
            ]
        );
    }

    #[test]
    fn matches_stay_inside_dictionary() {
        // the repeated block is 300 bytes back, out of reach
        let block: Vec<u8> = (0..50).collect();
        let mut input = block.clone();
        input.extend((0..250).map(|i| (i % 251) as u8 ^ 0xA5));
        input.extend(&block);

        let p = pass(&input, LzSettings::default());
        assert!(p
            .buf
            .iter()
            .all(|c| matches!(c, LzCode::Match(m) if m.moveback <= MAX_DISTANCE)
                || matches!(c, LzCode::Literal(_))));
        assert_eq!(p.decompressed_size, input.len());
    }

    #[test]
    fn settings_change_the_search() {
        let input = b"abcabcabcabc";
        assert_eq!(codes(input), vec![literal(b"abca"), matched(8, 3)]);

        let short = LzSettings {
            max_match: 4,
            ..LzSettings::default()
        };
        assert_eq!(
            pass(input, short).buf,
            vec![literal(b"abca"), matched(4, 3), matched(4, 3)]
        );

        let near = LzSettings {
            max_distance: 2,
            ..LzSettings::default()
        };
        assert_eq!(pass(input, near).buf, vec![literal(input)]);
    }

    #[test]
    fn trickling_reader_gives_same_codes() {
        let mut input = Vec::new();
        for i in 0..40u8 {
            input.extend_from_slice(b"sprite row ");
            input.extend(std::iter::repeat(i).take(i as usize % 7));
        }

        let settings = LzSettings::default();
        let whole = pass(&input, settings);
        let trickled = compress_rdr(Trickle(&input, 3), settings, &mut None).unwrap();

        assert_eq!(whole.buf, trickled.buf);
        assert_eq!(trickled.decompressed_size, input.len());
    }

    #[test]
    fn bad_settings() {
        let bad = [
            LzSettings::new(0, 127, 4, 127),
            LzSettings::new(256, 127, 4, 127),
            LzSettings::new(255, 128, 4, 127),
            LzSettings::new(255, 127, 0, 127),
            LzSettings::new(255, 8, 9, 127),
            LzSettings::new(255, 127, 4, 0),
            LzSettings::new(255, 127, 4, 128),
        ];
        for s in &bad {
            assert!(s.validate().is_err(), "{:?} should be rejected", s);
        }
        assert!(LzSettings::default().validate().is_ok());
    }
}
