use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ColorError;

/// An RGB color parsed from `#rgb` or `#rrggbb`.
///
/// The spelling as written is kept so labels show what the config says,
/// but equality only looks at the channels.
#[derive(Debug, Clone)]
pub struct HexColor {
    raw: String,
    rgb: [u8; 3],
}

impl HexColor {
    pub fn parse(hex: &str) -> Result<Self, ColorError> {
        let digits = hex.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(ColorError(hex.to_string())),
        };
        if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError(hex.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| ColorError(hex.to_string()))
        };

        Ok(Self {
            raw: hex.trim().to_string(),
            rgb: [channel(0)?, channel(2)?, channel(4)?],
        })
    }

    pub fn rgb(&self) -> [u8; 3] {
        self.rgb
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// CSS `rgba(r, g, b, a)` form.
    pub fn to_rgba_string(&self, alpha: f32) -> String {
        let [r, g, b] = self.rgb;
        format!("rgba({r}, {g}, {b}, {})", alpha.clamp(0.0, 1.0))
    }

    /// Channels as 0..1 floats, for cairo.
    pub fn to_unit_rgb(&self) -> (f64, f64, f64) {
        let [r, g, b] = self.rgb;
        (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }
}

impl PartialEq for HexColor {
    fn eq(&self, other: &Self) -> bool {
        self.rgb == other.rgb
    }
}

impl Eq for HexColor {}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for HexColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Convert a 3- or 6-digit hex color to a CSS `rgba()` string.
pub fn hex_to_rgba(hex: &str, alpha: f32) -> Result<String, ColorError> {
    Ok(HexColor::parse(hex)?.to_rgba_string(alpha))
}
