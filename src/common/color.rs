use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MAX_GRADIENT_COLORS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("failed to parse {0:?} as a color")]
    InvalidColor(String),
    #[error("invalid gradient angle {0:?}")]
    InvalidAngle(String),
    #[error("max colors is {MAX_GRADIENT_COLORS}")]
    TooManyColors,
    #[error("gradient has no colors")]
    Empty,
}

/// Straight RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self { Self { r, g, b, a } }

    pub fn from_argb(argb: u32) -> Self {
        let channel = |shift: u32| ((argb >> shift) & 0xff) as f32 / 255.0;
        Self {
            a: channel(24),
            r: channel(16),
            g: channel(8),
            b: channel(0),
        }
    }

    pub fn to_argb(self) -> u32 {
        let channel = |v: f32, shift: u32| ((v.clamp(0.0, 1.0) * 255.0).round() as u32) << shift;
        channel(self.a, 24) | channel(self.r, 16) | channel(self.g, 8) | channel(self.b, 0)
    }

    pub fn with_alpha(self, a: f32) -> Self { Self { a, ..self } }

    /// Multiplies the alpha channel, leaving the color channels untouched.
    pub fn fade(self, factor: f32) -> Self { self.with_alpha(self.a * factor) }
}

impl Default for Color {
    fn default() -> Self { Color::WHITE }
}

impl FromStr for Color {
    type Err = ColorParseError;

    /// Accepts `0xAARRGGBB`, `rgba(RRGGBBAA)` and `rgb(RRGGBB)`. Hex literals
    /// longer than eight digits keep their low 32 bits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ColorParseError::InvalidColor(s.to_string());
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            if hex.is_empty() || hex.len() > 16 {
                return Err(invalid());
            }
            let value = u64::from_str_radix(hex, 16).map_err(|_| invalid())?;
            return Ok(Color::from_argb(value as u32));
        }
        if let Some(inner) = s.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
            if inner.len() != 8 {
                return Err(invalid());
            }
            let rgba = u32::from_str_radix(inner, 16).map_err(|_| invalid())?;
            return Ok(Color::from_argb(rgba.rotate_right(8)));
        }
        if let Some(inner) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            if inner.len() != 6 {
                return Err(invalid());
            }
            let rgb = u32::from_str_radix(inner, 16).map_err(|_| invalid())?;
            return Ok(Color::from_argb(0xff00_0000 | rgb));
        }
        Err(invalid())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "0x{:08x}", self.to_argb()) }
}

/// Border paint: one or more colors swept along `angle` (radians).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gradient {
    pub colors: Vec<Color>,
    pub angle: f64,
}

impl Gradient {
    pub fn solid(color: Color) -> Self { Self { colors: vec![color], angle: 0.0 } }

    pub fn primary(&self) -> Color { self.colors.first().copied().unwrap_or(Color::TRANSPARENT) }

    pub fn faded(&self, factor: f32) -> Self {
        Self {
            colors: self.colors.iter().map(|c| c.fade(factor)).collect(),
            angle: self.angle,
        }
    }
}

impl FromStr for Gradient {
    type Err = ColorParseError;

    /// Space-separated colors, optionally followed by an `<N>deg` angle. Anything
    /// after the angle is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut colors = Vec::new();
        let mut angle = 0.0;
        for token in s.split_whitespace() {
            if let Some(deg) = token.find("deg").map(|at| &token[..at]) {
                let degrees: i64 =
                    deg.parse().map_err(|_| ColorParseError::InvalidAngle(token.to_string()))?;
                angle = (degrees as f64).to_radians();
                break;
            }
            if colors.len() >= MAX_GRADIENT_COLORS {
                return Err(ColorParseError::TooManyColors);
            }
            colors.push(token.parse::<Color>()?);
        }
        if colors.is_empty() {
            return Err(ColorParseError::Empty);
        }
        Ok(Gradient { colors, angle })
    }
}

impl fmt::Display for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for color in &self.colors {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{color}")?;
        }
        if self.angle != 0.0 {
            write!(f, " {}deg", self.angle.to_degrees().round() as i64)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Gradient {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<Gradient> for String {
    fn from(value: Gradient) -> Self { value.to_string() }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_argb_literal() {
        let color: Color = "0xff00ccdd".parse().unwrap();
        assert_eq!(color.to_argb(), 0xff00ccdd);
        assert_eq!(color.a, 1.0);
        assert_eq!(color.r, 0.0);
    }

    #[test]
    fn long_literal_keeps_low_bits() {
        let color: Color = "0xaabbccddff".parse().unwrap();
        assert_eq!(color.to_argb(), 0xbbccddff);
    }

    #[test]
    fn parses_css_like_forms() {
        let rgba: Color = "rgba(11223344)".parse().unwrap();
        assert_eq!(rgba.to_argb(), 0x44112233);
        let rgb: Color = "rgb(112233)".parse().unwrap();
        assert_eq!(rgb.to_argb(), 0xff112233);
    }

    #[test]
    fn rejects_garbage() {
        assert!("red".parse::<Color>().is_err());
        assert!("0x".parse::<Color>().is_err());
        assert!("rgb(12345)".parse::<Color>().is_err());
    }

    #[test]
    fn gradient_with_angle() {
        let gradient: Gradient = "0xffff0000 0xff0000ff 45deg".parse().unwrap();
        assert_eq!(gradient.colors.len(), 2);
        assert!((gradient.angle - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
        assert_eq!(gradient.to_string(), "0xffff0000 0xff0000ff 45deg");
    }

    #[test]
    fn gradient_limits() {
        let eleven = vec!["0xffffffff"; 11].join(" ");
        assert_eq!(eleven.parse::<Gradient>(), Err(ColorParseError::TooManyColors));
        assert_eq!("90deg".parse::<Gradient>(), Err(ColorParseError::Empty));
        assert!("0xffffffff xdeg".parse::<Gradient>().is_err());
    }
}
