//! 文字nグラム抽出モジュール
//!
//! Character n-gram extraction.
//!
//! Words are padded with the boundary markers `<` and `>` before extraction
//! so that n-grams can distinguish prefixes and suffixes from word-internal
//! sequences. Extraction is character-based, never byte-based.

/// Boundary marker prepended to a word before n-gram extraction.
pub const BOUNDARY_BEGIN: char = '<';
/// Boundary marker appended to a word before n-gram extraction.
pub const BOUNDARY_END: char = '>';

/// Pad `word` with the boundary markers and extract all character n-grams
/// for every size in `min_n..=max_n`, in order of increasing size and left
/// to right within each size.
pub fn extract_all_ngrams(word: &str, min_n: usize, max_n: usize) -> Vec<String> {
    let padded: Vec<char> = std::iter::once(BOUNDARY_BEGIN)
        .chain(word.chars())
        .chain(std::iter::once(BOUNDARY_END))
        .collect();

    let mut all_ngrams = Vec::new();
    for n in min_n..=max_n {
        push_ngrams_size_n(&padded, n, &mut all_ngrams);
    }
    all_ngrams
}

/// Extract all `n`-grams from the (unpadded) `word` and append them to
/// `out`. Sizes below one and empty input produce no output.
pub fn ngrams_size_n(word: &str, n: usize, out: &mut Vec<String>) {
    let chars: Vec<char> = word.chars().collect();
    push_ngrams_size_n(&chars, n, out);
}

fn push_ngrams_size_n(chars: &[char], n: usize, out: &mut Vec<String>) {
    if n < 1 || chars.is_empty() {
        return;
    }
    for window in chars.windows(n) {
        out.push(window.iter().collect());
    }
}
