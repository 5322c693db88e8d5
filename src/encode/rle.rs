use crate::format::{
    RleToken, MAX_COMBINED_LITERAL, MAX_COMBINED_RUN, MAX_RLE_LITERAL, MAX_RLE_RUN,
};

/// Greedily split `input` into RLE tokens (without the terminator).
///
/// Two or more equal bytes become a run. A run of up to eight bytes that is
/// directly followed by literals takes up to sixteen of them along in a combined
/// token. Literals stop in front of the next pair of equal bytes.
pub(super) fn pack(input: &[u8]) -> Vec<RleToken<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let run = run_length(&input[pos..], MAX_RLE_RUN);

        let token = if run >= 2 {
            let byte = input[pos];
            let literal = literal_span(&input[pos + run..], MAX_COMBINED_LITERAL);

            if run <= MAX_COMBINED_RUN && !literal.is_empty() {
                RleToken::Combined {
                    byte,
                    run: run as u8,
                    literal,
                }
            } else {
                RleToken::Run {
                    byte,
                    count: run as u8,
                }
            }
        } else {
            RleToken::Literal(literal_span(&input[pos..], MAX_RLE_LITERAL))
        };

        pos += expanded_len(&token);
        tokens.push(token);
    }

    tokens
}

fn expanded_len(token: &RleToken) -> usize {
    match token {
        RleToken::Run { count, .. } => *count as usize,
        RleToken::Literal(bytes) => bytes.len(),
        RleToken::Combined { run, literal, .. } => *run as usize + literal.len(),
        RleToken::End => 0,
    }
}

/// Number of copies of `data[0]` at the start of `data`, up to `cap`
fn run_length(data: &[u8], cap: usize) -> usize {
    match data.first() {
        Some(&first) => data.iter().take(cap).take_while(|&&b| b == first).count(),
        None => 0,
    }
}

/// The bytes at the start of `data`, up to `cap`, that aren't the start of a run
fn literal_span(data: &[u8], cap: usize) -> &[u8] {
    let mut len = 0;
    while len < data.len().min(cap) && run_length(&data[len..], 2) < 2 {
        len += 1;
    }

    &data[..len]
}
