//! Compact value rendering for statistics tables and ranked views.

/// Render `value` compactly: millions get an `M` suffix, thousands a `k`
/// suffix, very small magnitudes use exponent notation and everything else
/// two decimals. Zero renders as `0`.
#[must_use]
pub fn compact(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 {
        "0".to_string()
    } else if magnitude > 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if magnitude > 1_000.0 {
        format!("{:.2}k", value / 1_000.0)
    } else if magnitude < 0.01 {
        format!("{value:.2e}")
    } else {
        format!("{value:.2}")
    }
}
