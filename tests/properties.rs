use pak8::{
    compress, compress_rle, expand_direct, expand_rle, expand_shadow, format::LzToken,
    stream_info, EncoderBuilder, LzSettings, StreamFormat,
};
use proptest::prelude::*;

/// Byte strings with plenty of repeats, so matches and runs actually occur
fn asset_bytes() -> impl Strategy<Value = Vec<u8>> {
    let chunk = prop_oneof![
        prop::collection::vec(any::<u8>(), 1..12),
        (any::<u8>(), 1..90usize).prop_map(|(b, n)| vec![b; n]),
        (prop::collection::vec(any::<u8>(), 1..5), 1..40usize)
            .prop_map(|(pat, n)| pat.iter().copied().cycle().take(n * pat.len()).collect::<Vec<u8>>()),
    ];
    prop::collection::vec(chunk, 0..40).prop_map(|chunks| chunks.concat())
}

fn settings() -> impl Strategy<Value = LzSettings> {
    (1..=255usize, 1..=127usize, 1..=127usize).prop_flat_map(|(distance, max_match, literal)| {
        (1..=max_match).prop_map(move |min_match| {
            LzSettings::new(distance, max_match, min_match, literal)
        })
    })
}

proptest! {
    #[test]
    fn lz_round_trip(input in asset_bytes()) {
        let compressed = compress(&input);
        let mut dst = vec![0; input.len()];
        let used = expand_direct(&mut dst, &compressed).unwrap();

        prop_assert_eq!(used, compressed.len());
        prop_assert_eq!(dst, input);
    }

    #[test]
    fn shadow_matches_direct(input in asset_bytes()) {
        let compressed = compress(&input);
        let mut dst = vec![0; input.len()];
        expand_direct(&mut dst, &compressed).unwrap();

        let mut port = Vec::new();
        let used = expand_shadow(&mut port, &compressed).unwrap();
        prop_assert_eq!(used, compressed.len());
        prop_assert_eq!(port, dst);
    }

    #[test]
    fn only_last_tag_is_zero(input in prop::collection::vec(any::<u8>(), 0..600)) {
        let compressed = compress(&input);
        let mut at = 0;
        loop {
            let (token, next) = LzToken::parse(&compressed, at).unwrap();
            if token == LzToken::End {
                prop_assert_eq!(next, compressed.len());
                break;
            }
            at = next;
        }
    }

    #[test]
    fn matches_never_copy_the_first_byte(input in asset_bytes()) {
        let compressed = compress(&input);
        let (mut at, mut written) = (0, 0);
        loop {
            let (token, next) = LzToken::parse(&compressed, at).unwrap();
            match token {
                LzToken::Literal(bytes) => written += bytes.len(),
                LzToken::Match { length, distance } => {
                    prop_assert!((distance as usize) < written, "{} at {}", token, written);
                    written += length as usize;
                }
                LzToken::End => break,
            }
            at = next;
        }
        prop_assert_eq!(written, input.len());
    }

    #[test]
    fn any_valid_settings_round_trip(input in asset_bytes(), settings in settings()) {
        let compressed = EncoderBuilder::for_bytes(&input)
            .with_lz_settings(settings)
            .encode_to_vec()
            .unwrap();

        let mut port = Vec::new();
        expand_shadow(&mut port, &compressed).unwrap();
        prop_assert_eq!(port, input);
    }

    #[test]
    fn rle_round_trip(input in asset_bytes()) {
        let compressed = compress_rle(&input);
        let info = stream_info(&compressed, StreamFormat::Rle).unwrap();
        prop_assert_eq!(info.expanded_size, input.len());

        let mut dst = vec![0; input.len()];
        let used = expand_rle(&mut dst, &compressed).unwrap();
        prop_assert_eq!(used, compressed.len());
        prop_assert_eq!(dst, input);
    }
}
