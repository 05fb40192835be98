//! Reduction of raw nvidia-smi readings to bare numbers.

/// Strip every character that is not an ASCII digit or a period.
///
/// `"65 C"` becomes `"65"` and `"12.50 W"` becomes `"12.50"`. This is a
/// character filter, not a parser: `".."` survives unchanged. An empty result
/// means the reading carried no value and its metric line must be skipped.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}
