//! Strongly-typed primitives shared by the whole crate.
//!
//! Device sizes travel as [`Px`], map-space extents as [`Rect`], and the
//! unit a symbol layer measures itself in as [`OutputUnit`]. Raw `f64`
//! stays at the property-map boundary.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use glam::DVec2;

/// Error type for invalid numeric values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericError {
    /// Value is NaN
    NaN,
    /// Value is infinite
    Infinite,
    /// Value is negative when non-negative required
    Negative,
    /// Value lies outside an allowed closed range
    OutOfRange,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::NaN => write!(f, "value is NaN"),
            NumericError::Infinite => write!(f, "value is infinite"),
            NumericError::Negative => write!(f, "value is negative"),
            NumericError::OutOfRange => write!(f, "value is out of range"),
        }
    }
}

impl std::error::Error for NumericError {}

/// A size in device pixels, after unit conversion.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default)]
#[repr(transparent)]
pub struct Px(pub f64);

impl Px {
    pub const ZERO: Px = Px(0.0);

    /// Create a pixel size with validation (rejects NaN/infinite/negative)
    pub fn try_new(val: f64) -> Result<Px, NumericError> {
        if val.is_nan() {
            Err(NumericError::NaN)
        } else if val.is_infinite() {
            Err(NumericError::Infinite)
        } else if val < 0.0 {
            Err(NumericError::Negative)
        } else {
            Ok(Px(val))
        }
    }

    #[inline]
    pub fn raw(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn max(self, other: Px) -> Px {
        Px(self.0.max(other.0))
    }
}

impl Add for Px {
    type Output = Px;
    fn add(self, rhs: Px) -> Px { Px(self.0 + rhs.0) }
}
impl Sub for Px {
    type Output = Px;
    fn sub(self, rhs: Px) -> Px { Px(self.0 - rhs.0) }
}
impl Mul<f64> for Px {
    type Output = Px;
    fn mul(self, rhs: f64) -> Px { Px(self.0 * rhs) }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

/// Opacity in the closed range 0 (invisible) to 1 (opaque).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Opacity(f64);

impl Opacity {
    pub const OPAQUE: Opacity = Opacity(1.0);
    pub const TRANSPARENT: Opacity = Opacity(0.0);

    pub fn try_new(val: f64) -> Result<Opacity, NumericError> {
        if val.is_nan() {
            Err(NumericError::NaN)
        } else if !(0.0..=1.0).contains(&val) {
            Err(NumericError::OutOfRange)
        } else {
            Ok(Opacity(val))
        }
    }

    /// Clamp any finite value into range; NaN becomes opaque.
    pub fn clamped(val: f64) -> Opacity {
        if val.is_nan() {
            Opacity::OPAQUE
        } else {
            Opacity(val.clamp(0.0, 1.0))
        }
    }

    #[inline]
    pub fn raw(self) -> f64 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Opacity::OPAQUE
    }
}

impl Mul for Opacity {
    type Output = Opacity;
    fn mul(self, rhs: Opacity) -> Opacity { Opacity(self.0 * rhs.0) }
}

/// An RGBA color with 8-bit channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Scale the alpha channel by an opacity.
    pub fn with_opacity(self, opacity: Opacity) -> Color {
        let a = (f64::from(self.a) * opacity.raw()).round() as u8;
        Color { a, ..self }
    }

    /// Replace the alpha channel.
    pub fn with_alpha(self, a: u8) -> Color {
        Color { a, ..self }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.r, self.g, self.b, self.a)
    }
}

/// Axis-aligned rectangle in map units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: DVec2,
    pub max: DVec2,
}

impl Rect {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Rect {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// A rectangle that contains nothing; expands on first point.
    pub fn empty() -> Self {
        Rect {
            min: DVec2::splat(f64::MAX),
            max: DVec2::splat(f64::MIN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand_point(&mut self, p: DVec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || other.min.x > self.max.x
            || other.max.x < self.min.x
            || other.min.y > self.max.y
            || other.max.y < self.min.y)
    }

    /// Grow the rectangle by `amount` on every side.
    pub fn buffered(&self, amount: f64) -> Rect {
        Rect {
            min: self.min - DVec2::splat(amount),
            max: self.max + DVec2::splat(amount),
        }
    }
}

/// The unit a symbol size, width or offset is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputUnit {
    /// Millimeters on the output device
    #[default]
    Millimeter,
    /// Map units, scaled by the current map-to-pixel transform
    MapUnit,
    /// Layers of one symbol disagree on units
    Mixed,
    /// Device pixels
    Pixel,
}

impl OutputUnit {
    /// Property-map encoding of the unit.
    pub fn encode(self) -> &'static str {
        match self {
            OutputUnit::Millimeter => "MM",
            OutputUnit::MapUnit => "MapUnit",
            OutputUnit::Mixed => "Mixed",
            OutputUnit::Pixel => "Pixel",
        }
    }

    /// Decode a property value; anything unrecognized is millimeters.
    pub fn decode(s: &str) -> OutputUnit {
        match s {
            "MapUnit" => OutputUnit::MapUnit,
            "Mixed" => OutputUnit::Mixed,
            "Pixel" => OutputUnit::Pixel,
            _ => OutputUnit::Millimeter,
        }
    }
}

/// Scale range limiting how map-unit sizes convert to pixels.
///
/// Both bounds are stored as `1 / scale denominator`; zero means unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct MapUnitScale {
    pub min_scale: f64,
    pub max_scale: f64,
}

impl MapUnitScale {
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        MapUnitScale { min_scale, max_scale }
    }

    /// Map units per pixel after clamping to the scale range.
    pub fn compute_map_units_per_pixel(&self, map_units_per_pixel: f64, renderer_scale: f64) -> f64 {
        let mut mup = map_units_per_pixel;
        if self.min_scale != 0.0 && renderer_scale != 0.0 {
            mup = (mup / (self.min_scale * renderer_scale)).min(mup);
        }
        if self.max_scale != 0.0 && renderer_scale != 0.0 {
            mup = (mup / (self.max_scale * renderer_scale)).max(mup);
        }
        mup
    }
}
