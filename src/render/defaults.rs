//! Default sizes and settings (millimeters unless noted)

use crate::render::painter::{BrushStyle, CapStyle, JoinStyle, MarkerShape, PenStyle};
use crate::types::Color;

/// Pixels per millimeter at 96 dpi
pub const SCALE_FACTOR: f64 = 96.0 / 25.4;

pub const MARKER_SHAPE: MarkerShape = MarkerShape::Circle;
pub const MARKER_SIZE: f64 = 2.0;
pub const MARKER_COLOR: Color = Color::RED;
pub const MARKER_OUTLINE_COLOR: Color = Color::BLACK;
pub const MARKER_OUTLINE_WIDTH: f64 = 0.0;

pub const LINE_WIDTH: f64 = 0.26;
pub const LINE_COLOR: Color = Color::BLACK;
pub const LINE_PEN_STYLE: PenStyle = PenStyle::Solid;
pub const LINE_JOIN_STYLE: JoinStyle = JoinStyle::Bevel;
pub const LINE_CAP_STYLE: CapStyle = CapStyle::Square;

pub const FILL_COLOR: Color = Color::BLUE;
pub const FILL_STYLE: BrushStyle = BrushStyle::Solid;
pub const FILL_OUTLINE_COLOR: Color = Color::BLACK;
pub const FILL_OUTLINE_WIDTH: f64 = 0.26;
pub const FILL_OUTLINE_STYLE: PenStyle = PenStyle::Solid;

pub const SELECTION_COLOR: Color = Color::YELLOW;

/// Vertex marker size in pixels
pub const VERTEX_MARKER_SIZE: f64 = 7.0;

pub const GEOMETRY_EXPRESSION: &str = "$geometry";
