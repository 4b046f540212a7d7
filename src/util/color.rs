use egui::Color32;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid hex color {0:?}, expected #RRGGBB or #RRGGBBAA")]
pub struct HexColorError(pub String);

/// Parses `#RRGGBB` (or `#RRGGBBAA`) into an unmultiplied color.
pub fn parse_hex_color(text: &str) -> Result<Color32, HexColorError> {
    let err = || HexColorError(text.to_owned());
    let digits = text.trim().strip_prefix('#').ok_or_else(err)?;
    if !digits.is_ascii() || !(digits.len() == 6 || digits.len() == 8) {
        return Err(err());
    }

    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| err());
    let r = channel(0)?;
    let g = channel(2)?;
    let b = channel(4)?;
    let a = if digits.len() == 8 { channel(6)? } else { 255 };
    Ok(Color32::from_rgba_unmultiplied(r, g, b, a))
}

/// Formats a color as `#rrggbb`, appending the alpha byte only when it is not opaque.
pub fn to_hex_color(color: Color32) -> String {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    if a == 255 {
        format!("#{r:02x}{g:02x}{b:02x}")
    } else {
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/// Serde adapter storing a `Color32` as a hex string.
pub mod hex {
    use egui::Color32;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_hex_color(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color32, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_hex_color(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0000").unwrap(), Color32::from_rgb(255, 0, 0));
        assert_eq!(parse_hex_color("#00FF0080").unwrap().a(), 0x80);
        assert!(parse_hex_color("ff0000").is_err());
        assert!(parse_hex_color("#ff00").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }

    #[test]
    fn test_hex_color_formatting() {
        assert_eq!(to_hex_color(Color32::from_rgb(18, 52, 86)), "#123456");
        let color = Color32::from_rgb(200, 10, 0);
        assert_eq!(parse_hex_color(&to_hex_color(color)).unwrap(), color);
    }
}
