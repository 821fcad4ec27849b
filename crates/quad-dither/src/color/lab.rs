//! CIE L*a*b* conversion.
//!
//! Implements the standard sRGB -> XYZ -> L*a*b* transform against the D65
//! reference white, including the piecewise cube-root companding step.

use super::rgb::Rgb;

// D65 reference white in XYZ, Y normalized to 1.
const XN: f64 = 0.950_47;
const YN: f64 = 1.0;
const ZN: f64 = 1.088_83;

// (6/29)^3: threshold between the cube-root and linear segments of f(t).
const EPSILON: f64 = 216.0 / 24_389.0;
// 1 / (3 * (6/29)^2)
const KAPPA_INV: f64 = 841.0 / 108.0;

/// A color in CIE L*a*b* space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    /// Euclidean distance to another Lab color.
    #[inline]
    pub fn distance(self, other: Lab) -> f64 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        (dl * dl + da * da + db * db).sqrt()
    }
}

impl From<Rgb> for Lab {
    fn from(c: Rgb) -> Self {
        let r = srgb_to_linear(c.r);
        let g = srgb_to_linear(c.g);
        let b = srgb_to_linear(c.b);

        // sRGB D65 linear-light to XYZ.
        let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
        let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
        let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

        let fx = companding(x / XN);
        let fy = companding(y / YN);
        let fz = companding(z / ZN);

        Lab {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }
}

/// Inverse gamma for one 8-bit sRGB channel.
#[inline]
fn srgb_to_linear(v: u8) -> f64 {
    let v = v as f64 / 255.0;
    if v <= 0.040_45 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// The piecewise cube-root companding function f(t) of the Lab transform.
#[inline]
fn companding(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        KAPPA_INV * t + 4.0 / 29.0
    }
}
