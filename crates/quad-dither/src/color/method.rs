//! Color distance methods.
//!
//! Three built-in distance functions are provided, each a pure function of
//! its two arguments. A method is identified by a stable name string that
//! also keys the per-method blocks of the palette binary container, so
//! renames are format-breaking.

use std::fmt;
use std::sync::Arc;

use super::lab::Lab;
use super::rgb::Rgb;

/// A caller-supplied color distance.
///
/// The escape hatch for palettes matched under a metric the built-ins do not
/// cover. Custom methods have no precomputed whole-cube table; lookups fall
/// back to KD-tree queries.
pub trait ColorDistance: Send + Sync {
    /// Stable identifier for this method. Must not collide with the
    /// built-in names `RGB`, `Redmean`, or `LAB`.
    fn name(&self) -> &str;

    /// Non-negative distance between two colors.
    fn distance(&self, a: Rgb, b: Rgb) -> f64;
}

/// Color distance method selection.
#[derive(Clone, Default)]
pub enum ColorMethod {
    /// Euclidean distance in RGB space.
    #[default]
    Rgb,
    /// Redmean: a cheap perceptual approximation weighting the red axis by
    /// the mean red of the two colors.
    Redmean,
    /// Euclidean distance in CIE L*a*b* (D65).
    Lab,
    /// Caller-supplied distance function.
    Custom(Arc<dyn ColorDistance>),
}

impl ColorMethod {
    /// The method's stable name, as stored in the palette binary container.
    pub fn name(&self) -> &str {
        match self {
            ColorMethod::Rgb => "RGB",
            ColorMethod::Redmean => "Redmean",
            ColorMethod::Lab => "LAB",
            ColorMethod::Custom(m) => m.name(),
        }
    }

    /// Parse a built-in method name, case-insensitively.
    ///
    /// Returns `None` for unknown names; custom methods cannot be named
    /// from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Some(ColorMethod::Rgb),
            "redmean" => Some(ColorMethod::Redmean),
            "lab" => Some(ColorMethod::Lab),
            _ => None,
        }
    }

    /// True for the three methods covered by the binary palette format.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, ColorMethod::Custom(_))
    }

    /// All built-in methods, in container order.
    pub fn builtins() -> [ColorMethod; 3] {
        [ColorMethod::Rgb, ColorMethod::Redmean, ColorMethod::Lab]
    }

    /// Distance between two colors under this method.
    #[inline]
    pub fn distance(&self, a: Rgb, b: Rgb) -> f64 {
        match self {
            ColorMethod::Rgb => euclidean(a, b),
            ColorMethod::Redmean => redmean(a, b),
            ColorMethod::Lab => Lab::from(a).distance(Lab::from(b)),
            ColorMethod::Custom(m) => m.distance(a, b),
        }
    }
}

impl fmt::Debug for ColorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColorMethod({})", self.name())
    }
}

impl PartialEq for ColorMethod {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

#[inline]
fn euclidean(a: Rgb, b: Rgb) -> f64 {
    let dr = a.r as f64 - b.r as f64;
    let dg = a.g as f64 - b.g as f64;
    let db = a.b as f64 - b.b as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

#[inline]
fn redmean(a: Rgb, b: Rgb) -> f64 {
    let rbar = (a.r as f64 + b.r as f64) / 2.0;
    let dr = a.r as f64 - b.r as f64;
    let dg = a.g as f64 - b.g as f64;
    let db = a.b as f64 - b.b as f64;
    let wr = 2.0 + rbar / 256.0;
    let wb = 2.0 + (255.0 - rbar) / 256.0;
    (wr * dr * dr + 4.0 * dg * dg + wb * db * db).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_methods() -> Vec<ColorMethod> {
        vec![ColorMethod::Rgb, ColorMethod::Redmean, ColorMethod::Lab]
    }

    #[test]
    fn test_symmetry_and_identity() {
        let samples = [
            Rgb::new(0, 0, 0),
            Rgb::new(255, 255, 255),
            Rgb::new(139, 69, 19),
            Rgb::new(0, 170, 170),
            Rgb::new(85, 85, 255),
        ];
        for method in all_methods() {
            for &a in &samples {
                assert_eq!(
                    method.distance(a, a),
                    0.0,
                    "{} identity failed for {a}",
                    method.name()
                );
                for &b in &samples {
                    let ab = method.distance(a, b);
                    let ba = method.distance(b, a);
                    assert!(
                        (ab - ba).abs() < 1e-9,
                        "{} asymmetric for {a}/{b}: {ab} vs {ba}",
                        method.name()
                    );
                    assert!(ab >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_rgb_euclidean_known_value() {
        let d = ColorMethod::Rgb.distance(Rgb::new(0, 0, 0), Rgb::new(3, 4, 0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_redmean_weights_red_by_mean() {
        // At high mean red, red differences weigh close to 3; at low mean
        // red, blue differences do. The same channel delta must therefore
        // score differently depending on which end of the cube it sits in.
        let dark_red_delta = ColorMethod::Redmean.distance(Rgb::new(0, 0, 0), Rgb::new(10, 0, 0));
        let bright_red_delta =
            ColorMethod::Redmean.distance(Rgb::new(245, 0, 0), Rgb::new(255, 0, 0));
        assert!(
            bright_red_delta > dark_red_delta,
            "redmean should weight red deltas more at high red: {bright_red_delta} vs {dark_red_delta}"
        );
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in all_methods() {
            let parsed = ColorMethod::parse(method.name()).unwrap();
            assert_eq!(parsed, method);
        }
        // Case-insensitive per the CLI contract.
        assert_eq!(ColorMethod::parse("lab").unwrap().name(), "LAB");
        assert_eq!(ColorMethod::parse("REDMEAN").unwrap().name(), "Redmean");
        assert!(ColorMethod::parse("cie2000").is_none());
    }

    #[test]
    fn test_custom_method() {
        struct Chebyshev;
        impl ColorDistance for Chebyshev {
            fn name(&self) -> &str {
                "Chebyshev"
            }
            fn distance(&self, a: Rgb, b: Rgb) -> f64 {
                let dr = (a.r as i32 - b.r as i32).abs();
                let dg = (a.g as i32 - b.g as i32).abs();
                let db = (a.b as i32 - b.b as i32).abs();
                dr.max(dg).max(db) as f64
            }
        }

        let method = ColorMethod::Custom(Arc::new(Chebyshev));
        assert!(!method.is_builtin());
        assert_eq!(method.name(), "Chebyshev");
        assert_eq!(
            method.distance(Rgb::new(0, 10, 0), Rgb::new(5, 0, 3)),
            10.0
        );
    }
}
