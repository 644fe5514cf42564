//! CSS colour values as they appear in computed styles.
//!
//! The rasterizer only understands sRGB values. Wide-gamut and perceptual
//! encodings are recognised so they can be rewritten before capture; if one
//! reaches the rasterizer it paints nothing.

use serde::Deserialize;

/// Straight (non-premultiplied) sRGB colour. Deserializes from `[r, g, b, a]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const BLACK: Rgba = Rgba(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba(255, 255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba(0, 0, 0, 0);

    /// Serialize the way computed styles do: `rgb(r, g, b)` or `rgba(...)`.
    pub fn to_css(self) -> String {
        let Rgba(r, g, b, a) = self;
        if a == 255 {
            format!("rgb({}, {}, {})", r, g, b)
        } else {
            let alpha = (a as f32 / 255.0 * 1000.0).round() / 1000.0;
            format!("rgba({}, {}, {}, {})", r, g, b, alpha)
        }
    }
}

/// Colour encodings the rasterizer cannot read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedSpace {
    Oklch,
    Oklab,
    Lab,
    Lch,
    /// `color(display-p3 ...)` and friends
    ColorFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorValue {
    Srgb(Rgba),
    Unsupported(UnsupportedSpace),
    /// Anything unparseable; painted as transparent
    Invalid,
}

/// Returns the unsupported encoding a raw value uses, if any.
pub fn unsupported_space(raw: &str) -> Option<UnsupportedSpace> {
    let v = raw.trim().to_ascii_lowercase();
    // order matters: "oklch(" must be tested before "lch("
    if v.starts_with("oklch(") {
        Some(UnsupportedSpace::Oklch)
    } else if v.starts_with("oklab(") {
        Some(UnsupportedSpace::Oklab)
    } else if v.starts_with("lab(") {
        Some(UnsupportedSpace::Lab)
    } else if v.starts_with("lch(") {
        Some(UnsupportedSpace::Lch)
    } else if v.starts_with("color(") {
        Some(UnsupportedSpace::ColorFunction)
    } else {
        None
    }
}

pub fn parse_color(raw: &str) -> ColorValue {
    if let Some(space) = unsupported_space(raw) {
        return ColorValue::Unsupported(space);
    }
    let v = raw.trim().to_ascii_lowercase();
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex).map(ColorValue::Srgb).unwrap_or(ColorValue::Invalid);
    }
    if let Some(args) = function_args(&v, "rgba").or_else(|| function_args(&v, "rgb")) {
        return parse_rgb_args(args).map(ColorValue::Srgb).unwrap_or(ColorValue::Invalid);
    }
    match v.as_str() {
        "black" => ColorValue::Srgb(Rgba::BLACK),
        "white" => ColorValue::Srgb(Rgba::WHITE),
        "transparent" => ColorValue::Srgb(Rgba::TRANSPARENT),
        "red" => ColorValue::Srgb(Rgba(255, 0, 0, 255)),
        "green" => ColorValue::Srgb(Rgba(0, 128, 0, 255)),
        "blue" => ColorValue::Srgb(Rgba(0, 0, 255, 255)),
        "gray" | "grey" => ColorValue::Srgb(Rgba(128, 128, 128, 255)),
        "gold" => ColorValue::Srgb(Rgba(255, 215, 0, 255)),
        "navy" => ColorValue::Srgb(Rgba(0, 0, 128, 255)),
        _ => ColorValue::Invalid,
    }
}

fn function_args<'a>(v: &'a str, name: &str) -> Option<&'a str> {
    v.strip_prefix(name)?.trim_start().strip_prefix('(')?.strip_suffix(')')
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some(Rgba(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255)),
        4 => Some(Rgba(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, digit(3)? * 17)),
        6 => Some(Rgba(pair(0)?, pair(2)?, pair(4)?, 255)),
        8 => Some(Rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |p: &str| -> Option<u8> {
        if let Some(pct) = p.strip_suffix('%') {
            let f: f32 = pct.parse().ok()?;
            Some((f.clamp(0.0, 100.0) * 2.55).round() as u8)
        } else {
            let f: f32 = p.parse().ok()?;
            Some(f.clamp(0.0, 255.0).round() as u8)
        }
    };
    let alpha = match parts.get(3) {
        None => 255,
        Some(p) => {
            let f = match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                None => p.parse::<f32>().ok()?,
            };
            (f.clamp(0.0, 1.0) * 255.0).round() as u8
        }
    };
    Some(Rgba(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha))
}

/// Convert `oklab(...)` / `oklch(...)` to gamut-clipped sRGB.
///
/// Returns `None` for every other encoding, including `lab()` and `lch()`
/// whose CIE reference white would need a chromatic adaptation step.
pub fn convert_to_srgb(raw: &str) -> Option<Rgba> {
    let v = raw.trim().to_ascii_lowercase();
    let (space, args) = match unsupported_space(&v)? {
        UnsupportedSpace::Oklab => (UnsupportedSpace::Oklab, function_args(&v, "oklab")?),
        UnsupportedSpace::Oklch => (UnsupportedSpace::Oklch, function_args(&v, "oklch")?),
        _ => return None,
    };
    let parts: Vec<&str> = args
        .split(|c: char| c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    let lightness = match parts[0].strip_suffix('%') {
        Some(pct) => pct.parse::<f32>().ok()? / 100.0,
        None => parts[0].parse::<f32>().ok()?,
    };
    let (a, b) = match space {
        UnsupportedSpace::Oklab => (parts[1].parse::<f32>().ok()?, parts[2].parse::<f32>().ok()?),
        _ => {
            let chroma: f32 = parts[1].parse().ok()?;
            let hue: f32 = parts[2].trim_end_matches("deg").parse().ok()?;
            let h = hue.to_radians();
            (chroma * h.cos(), chroma * h.sin())
        }
    };
    let alpha = match parts.get(3) {
        None => 255,
        Some(p) => {
            let f = match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                None => p.parse::<f32>().ok()?,
            };
            (f.clamp(0.0, 1.0) * 255.0).round() as u8
        }
    };

    let l_ = lightness + 0.396_337_78 * a + 0.215_803_76 * b;
    let m_ = lightness - 0.105_561_346 * a - 0.063_854_17 * b;
    let s_ = lightness - 0.089_484_18 * a - 1.291_485_5 * b;
    let (l, m, s) = (l_ * l_ * l_, m_ * m_ * m_, s_ * s_ * s_);

    let r = 4.076_741_7 * l - 3.307_711_6 * m + 0.230_969_94 * s;
    let g = -1.268_438 * l + 2.609_757_4 * m - 0.341_319_38 * s;
    let bl = -0.004_196_086_3 * l - 0.703_418_6 * m + 1.707_614_7 * s;

    Some(Rgba(encode_srgb(r), encode_srgb(g), encode_srgb(bl), alpha))
}

fn encode_srgb(linear: f32) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_rgb_forms() {
        assert_eq!(parse_color("#fff"), ColorValue::Srgb(Rgba::WHITE));
        assert_eq!(parse_color("#1a2b3c"), ColorValue::Srgb(Rgba(0x1a, 0x2b, 0x3c, 255)));
        assert_eq!(parse_color("rgb(10, 20, 30)"), ColorValue::Srgb(Rgba(10, 20, 30, 255)));
        assert_eq!(parse_color("rgba(10, 20, 30, 0.5)"), ColorValue::Srgb(Rgba(10, 20, 30, 128)));
        assert_eq!(parse_color("rgb(10 20 30 / 50%)"), ColorValue::Srgb(Rgba(10, 20, 30, 128)));
        assert_eq!(parse_color("Transparent"), ColorValue::Srgb(Rgba::TRANSPARENT));
        assert_eq!(parse_color("not-a-color"), ColorValue::Invalid);
    }

    #[test]
    fn recognises_unsupported_spaces() {
        assert_eq!(unsupported_space("oklch(0.7 0.1 200)"), Some(UnsupportedSpace::Oklch));
        assert_eq!(unsupported_space(" OKLAB(0.5 0 0)"), Some(UnsupportedSpace::Oklab));
        assert_eq!(unsupported_space("lch(50% 30 40)"), Some(UnsupportedSpace::Lch));
        assert_eq!(unsupported_space("lab(50% 30 40)"), Some(UnsupportedSpace::Lab));
        assert_eq!(unsupported_space("color(display-p3 1 0 0)"), Some(UnsupportedSpace::ColorFunction));
        assert_eq!(unsupported_space("rgb(0, 0, 0)"), None);
    }

    #[test]
    fn css_serialization_round_trips() {
        let c = Rgba(12, 34, 56, 255);
        assert_eq!(parse_color(&c.to_css()), ColorValue::Srgb(c));
        assert_eq!(Rgba::BLACK.to_css(), "rgb(0, 0, 0)");
    }

    #[test]
    fn oklab_extremes_convert_to_black_and_white() {
        assert_eq!(convert_to_srgb("oklab(0 0 0)"), Some(Rgba::BLACK));
        assert_eq!(convert_to_srgb("oklab(1 0 0)"), Some(Rgba::WHITE));
        assert_eq!(convert_to_srgb("oklch(100% 0 0)"), Some(Rgba::WHITE));
    }

    #[test]
    fn oklch_red_is_reddish() {
        let Rgba(r, g, b, _) = convert_to_srgb("oklch(0.628 0.2577 29.23)").unwrap();
        assert!(r > 240, "r = {}", r);
        assert!(g < 30 && b < 30, "g = {}, b = {}", g, b);
    }

    #[test]
    fn lab_is_not_converted() {
        assert_eq!(convert_to_srgb("lab(50% 20 20)"), None);
        assert_eq!(convert_to_srgb("rgb(1, 2, 3)"), None);
    }
}
