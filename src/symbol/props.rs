//! String encodings used in layer property maps

use std::collections::BTreeMap;

use glam::DVec2;

use crate::types::{Color, MapUnitScale, OutputUnit};

/// Serialized form of a symbol layer: string keys to string values.
pub type PropertyMap = BTreeMap<String, String>;

pub fn encode_color(color: Color) -> String {
    color.to_string()
}

/// Decode `r,g,b` or `r,g,b,a`.
pub fn decode_color(s: &str) -> Option<Color> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    match parts[..] {
        [r, g, b] => Some(Color::rgb(r, g, b)),
        [r, g, b, a] => Some(Color::rgba(r, g, b, a)),
        _ => None,
    }
}

pub fn encode_point(p: DVec2) -> String {
    format!("{},{}", p.x, p.y)
}

pub fn decode_point(s: &str) -> Option<DVec2> {
    let (x, y) = s.split_once(',')?;
    Some(DVec2::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

pub fn encode_map_unit_scale(scale: MapUnitScale) -> String {
    format!("{},{}", scale.min_scale, scale.max_scale)
}

pub fn decode_map_unit_scale(s: &str) -> Option<MapUnitScale> {
    let (min, max) = s.split_once(',')?;
    Some(MapUnitScale::new(min.trim().parse().ok()?, max.trim().parse().ok()?))
}

/// Read helpers that fall back to a default when a key is absent or
/// does not decode.
pub(crate) struct Props<'a>(pub &'a PropertyMap);

impl<'a> Props<'a> {
    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.0.get(key).map(String::as_str)
    }

    /// First key present, for properties with legacy names.
    pub fn first_of(&self, keys: &[&str]) -> Option<&'a str> {
        keys.iter().find_map(|k| self.str(k))
    }

    pub fn f64(&self, key: &str, default: f64) -> f64 {
        self.str(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
    }

    pub fn f64_of(&self, keys: &[&str], default: f64) -> f64 {
        self.first_of(keys).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
    }

    pub fn color_of(&self, keys: &[&str], default: Color) -> Color {
        self.first_of(keys).and_then(decode_color).unwrap_or(default)
    }

    pub fn point(&self, key: &str) -> DVec2 {
        self.str(key).and_then(decode_point).unwrap_or(DVec2::ZERO)
    }

    pub fn unit_of(&self, keys: &[&str]) -> OutputUnit {
        self.first_of(keys).map(OutputUnit::decode).unwrap_or_default()
    }

    pub fn scale(&self, key: &str) -> MapUnitScale {
        self.str(key).and_then(decode_map_unit_scale).unwrap_or_default()
    }
}
