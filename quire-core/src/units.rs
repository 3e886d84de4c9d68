//! Fixed-point device units.
//!
//! Every coordinate the engine produces is an `i32` counting 1/64 of a
//! device pixel, the same sub-pixel grid font rasterizers use.

/// A length in 1/64 device pixel.
pub type Fixed = i32;

/// One device pixel in fixed-point units.
pub const FIXED_ONE: Fixed = 64;

/// Whole pixels → fixed point.
#[inline]
pub const fn px(value: i32) -> Fixed {
    value * FIXED_ONE
}

/// Fixed point → pixels (floating).
#[inline]
pub fn to_px(value: Fixed) -> f32 {
    value as f32 / FIXED_ONE as f32
}

/// Parse a CSS length into fixed point.
///
/// Accepts `12px`, `1.5px`, `9pt` (1pt = 4/3 px), a bare number (taken as
/// pixels) and `0`. Returns `None` for anything else, including empty input.
pub fn parse_length(value: &str) -> Option<Fixed> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (number, scale) = if let Some(n) = value.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("pt") {
        (n, 4.0 / 3.0)
    } else {
        (value, 1.0)
    };

    let number: f64 = number.trim().parse().ok()?;
    if !number.is_finite() {
        return None;
    }
    Some((number * scale * FIXED_ONE as f64).round() as Fixed)
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_roundtrip() {
        assert_eq!(px(200), 12800);
        assert_eq!(to_px(px(3)), 3.0);
    }

    #[test]
    fn test_parse_length_units() {
        assert_eq!(parse_length("20px"), Some(1280));
        assert_eq!(parse_length("1.5px"), Some(96));
        assert_eq!(parse_length("9pt"), Some(768));
        assert_eq!(parse_length("0"), Some(0));
        assert_eq!(parse_length(" 4 "), Some(256));
    }

    #[test]
    fn test_parse_length_rejects_garbage() {
        assert_eq!(parse_length(""), None);
        assert_eq!(parse_length("wide"), None);
        assert_eq!(parse_length("12em"), None);
    }
}
