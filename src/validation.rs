//! Amount validation for conversation input.

/// Returns `true` when `value` reads as a finite real number.
///
/// Accepts optionally signed integers and decimals (`"12"`, `"12.5"`, `"-3.2"`,
/// `".5"`, `"1e3"`) with surrounding whitespace. Empty text, thousands
/// separators, `inf` and `NaN` are rejected.
pub fn is_number(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .map(f64::is_finite)
        .unwrap_or(false)
}
