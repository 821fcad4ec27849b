//! Terminal color code classification and ordering.
//!
//! A palette source maps terminal codes ("31", "48;5;17", "38;2;1;2;3") to
//! colors. Codes are classified as foreground or background by prefix, and
//! ordered numerically within their class: basic codes first, then 256-color
//! codes by palette number, then truecolor codes by packed RGB. The ordering
//! decides which code survives when several map to the same RGB, and fixes
//! the on-disk order of the color arrays.

use super::error::PaletteError;

/// Which half of an SGR attribute pair a code addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeClass {
    Fg,
    Bg,
}

impl CodeClass {
    pub fn as_str(self) -> &'static str {
        match self {
            CodeClass::Fg => "foreground",
            CodeClass::Bg => "background",
        }
    }
}

/// Sort key for a terminal code within its class.
///
/// Tier 0: basic codes (30-37, 40-47, 90-97, 100-107), keyed by the code
/// number itself. Tier 1: 256-color codes, keyed by palette number.
/// Tier 2: truecolor codes, keyed by packed RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeKey {
    tier: u8,
    value: u32,
}

/// Classify a terminal code and compute its sort key.
///
/// Foreground codes start with `3` or `9`; background codes start with `4`
/// or `10`. Anything else is rejected.
pub fn classify(code: &str) -> Result<(CodeClass, CodeKey), PaletteError> {
    let unknown = || PaletteError::UnknownCode(code.to_string());

    if let Some(rest) = code.strip_prefix("38;") {
        return Ok((CodeClass::Fg, extended_key(rest).ok_or_else(unknown)?));
    }
    if let Some(rest) = code.strip_prefix("48;") {
        return Ok((CodeClass::Bg, extended_key(rest).ok_or_else(unknown)?));
    }

    let n: u32 = code.parse().map_err(|_| unknown())?;
    let class = match n {
        30..=39 | 90..=97 => CodeClass::Fg,
        40..=49 | 100..=107 => CodeClass::Bg,
        _ => return Err(unknown()),
    };
    Ok((class, CodeKey { tier: 0, value: n }))
}

/// Key for the `5;N` / `2;r;g;b` tail of an extended code.
fn extended_key(rest: &str) -> Option<CodeKey> {
    let mut parts = rest.split(';');
    match parts.next()? {
        "5" => {
            let n: u32 = parts.next()?.parse().ok()?;
            if parts.next().is_some() || n > 255 {
                return None;
            }
            Some(CodeKey { tier: 1, value: n })
        }
        "2" => {
            let r: u32 = parts.next()?.parse().ok()?;
            let g: u32 = parts.next()?.parse().ok()?;
            let b: u32 = parts.next()?.parse().ok()?;
            if parts.next().is_some() || r > 255 || g > 255 || b > 255 {
                return None;
            }
            Some(CodeKey {
                tier: 2,
                value: (r << 16) | (g << 8) | b,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_fg_codes() {
        for code in ["30", "37", "90", "97"] {
            let (class, _) = classify(code).unwrap();
            assert_eq!(class, CodeClass::Fg, "{code} should be foreground");
        }
    }

    #[test]
    fn test_basic_bg_codes() {
        for code in ["40", "47", "100", "107"] {
            let (class, _) = classify(code).unwrap();
            assert_eq!(class, CodeClass::Bg, "{code} should be background");
        }
    }

    #[test]
    fn test_extended_codes() {
        let (class, _) = classify("38;5;124").unwrap();
        assert_eq!(class, CodeClass::Fg);
        let (class, _) = classify("48;5;17").unwrap();
        assert_eq!(class, CodeClass::Bg);
        let (class, _) = classify("38;2;1;2;3").unwrap();
        assert_eq!(class, CodeClass::Fg);
        let (class, _) = classify("48;2;255;0;0").unwrap();
        assert_eq!(class, CodeClass::Bg);
    }

    #[test]
    fn test_unknown_prefixes_rejected() {
        for code in ["", "2", "58;5;1", "38;9;1", "38;5;256", "foo", "38;5;1;2"] {
            assert!(
                matches!(classify(code), Err(PaletteError::UnknownCode(_))),
                "{code:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_sort_order_basic_before_256_before_truecolor() {
        let (_, basic) = classify("37").unwrap();
        let (_, basic_bright) = classify("97").unwrap();
        let (_, c256_low) = classify("38;5;2").unwrap();
        let (_, c256_high) = classify("38;5;250").unwrap();
        let (_, tc) = classify("38;2;0;0;1").unwrap();

        assert!(basic < basic_bright);
        assert!(basic_bright < c256_low);
        assert!(c256_low < c256_high);
        assert!(c256_high < tc);
    }

    #[test]
    fn test_basic_code_outranks_extended_duplicate() {
        let (_, basic) = classify("30").unwrap();
        let (_, extended) = classify("38;5;16").unwrap();
        assert!(basic < extended, "basic codes win the emit slot");
    }
}
