//! Text and number normalization shared by the ingestion adapters.
//!
//! Source exports are inconsistent about casing, currency symbols,
//! thousand separators, and percent signs. Everything funnels through
//! these helpers exactly once, at ingestion, so the matching core can
//! assume canonical values.

/// Parse a loosely formatted number ("£1,250,000", "5.49%", " 75 ").
/// Returns `None` for anything that does not survive as a finite float.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Lowercased alphanumeric projection used for tolerant product-name
/// comparison ("2yr Fix" -> "2yrfix").
pub fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Trimmed, lowercased text for scope and label comparison.
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Boolean encodings seen in the wild: true/yes/1/y/t.
pub fn truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "y" | "t"
    )
}

/// First run of consecutive digits in a string ("Tier 2 (retention)" -> 2).
pub fn first_digit_run(raw: &str) -> Option<u32> {
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !digits.is_empty() {
            break;
        }
    }
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Detect semi-commercial scope spellings ("Semi-Commercial",
/// "semi commercial", "semi_commercial", "semicommercial").
pub fn mentions_semi_commercial(raw: &str) -> bool {
    let text = normalize_token(raw);
    text.contains("semicommercial")
}
