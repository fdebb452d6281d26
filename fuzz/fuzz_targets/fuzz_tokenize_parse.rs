#![no_main]

use formula_syntax::{
    fix_ranges, parse_tokens, stringify_tokens, tokenize, translate_formula_to_a1, FixOptions,
    ParseOptions, TokenizeOptions, TranslateOptions,
};
use libfuzzer_sys::fuzz_target;

/// Excel's formula length limit, plus some slack so inputs just past it are still explored.
const MAX_FUZZ_FORMULA_CHARS: usize = 8_192 + 256;
const MAX_INPUT_BYTES: usize = MAX_FUZZ_FORMULA_CHARS * 4; // max UTF-8 bytes per char

fn truncate_to_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let data = if data.len() > MAX_INPUT_BYTES {
        &data[..MAX_INPUT_BYTES]
    } else {
        data
    };

    // The first byte selects options; the rest is the formula.
    let selector = data[0];
    let input = String::from_utf8_lossy(&data[1..]);
    let formula = truncate_to_chars(&input, MAX_FUZZ_FORMULA_CHARS);

    let tokenize_opts = TokenizeOptions {
        with_location: true,
        merge_refs: selector & 0b1 == 0,
        negative_numbers: selector & 0b10 == 0,
        allow_ternary: selector & 0b100 != 0,
        r1c1: selector & 0b1000 != 0,
        xlsx: selector & 0b1_0000 != 0,
    };

    // Tokenizing is lossless: the tokens always spell the input back.
    let tokens = tokenize(formula, &tokenize_opts);
    assert_eq!(stringify_tokens(&tokens), formula);

    let parse_opts = ParseOptions {
        tokenize: tokenize_opts,
        permit_array_ranges: selector & 0b10_0000 != 0,
        permit_array_calls: selector & 0b100_0000 != 0,
        loose_ref_calls: selector & 0b1000_0000 != 0,
    };
    if let Err(err) = parse_tokens(&tokens, &parse_opts) {
        assert!(err.offset <= formula.chars().count());
    }

    if tokenize_opts.r1c1 {
        let _ = translate_formula_to_a1(formula, "B2", &TranslateOptions::default());
    } else {
        let _ = fix_ranges(
            formula,
            &FixOptions {
                add_bounds: tokenize_opts.allow_ternary,
                ..FixOptions::default()
            },
        );
    }
});
