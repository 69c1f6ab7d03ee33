//! Diverging blue-white-red color scale centered on zero.
//!
//! Negative values map to blue, zero to near-white, positive to red, with
//! the control points of the eleven-class `RdBu` `ColorBrewer` palette
//! (reversed).

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// `#rrggbb`
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

const RD_BU_R: [Rgb; 11] = [
    Rgb(0x05, 0x30, 0x61),
    Rgb(0x21, 0x66, 0xac),
    Rgb(0x43, 0x93, 0xc3),
    Rgb(0x92, 0xc5, 0xde),
    Rgb(0xd1, 0xe5, 0xf0),
    Rgb(0xf7, 0xf7, 0xf7),
    Rgb(0xfd, 0xdb, 0xc7),
    Rgb(0xf4, 0xa5, 0x82),
    Rgb(0xd6, 0x60, 0x4d),
    Rgb(0xb2, 0x18, 0x2b),
    Rgb(0x67, 0x00, 0x1f),
];

/// Maps `[-max_abs, max_abs]` onto the palette, saturating outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergingScale {
    max_abs: f64,
}

impl DivergingScale {
    #[must_use]
    pub const fn new(max_abs: f64) -> Self {
        Self { max_abs }
    }

    /// Position of `value` on the scale in `[0, 1]`; 0.5 is zero. A scale
    /// with no range puts everything at the midpoint.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        if self.max_abs > 0.0 && value.is_finite() {
            ((value / self.max_abs + 1.0) / 2.0).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    /// Color of `value`.
    #[must_use]
    pub fn color(&self, value: f64) -> Rgb {
        interpolate(&RD_BU_R, self.normalize(value))
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn interpolate(points: &[Rgb], t: f64) -> Rgb {
    let last = points.len() - 1;
    let idx = t.clamp(0.0, 1.0) * last as f64;
    let i = (idx.floor() as usize).min(last);
    if i == last {
        return points[last];
    }
    let frac = idx - i as f64;
    let lerp = |a: u8, b: u8| frac.mul_add(f64::from(b) - f64::from(a), f64::from(a)).round() as u8;
    let (a, b) = (points[i], points[i + 1]);
    Rgb(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}
