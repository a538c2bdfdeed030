//! Drawing surface abstraction
//!
//! Symbol layers issue primitive draw calls in device pixels. Any backend
//! (raster, vector export, a test recorder) implements [`Painter`].

use std::fmt;

use glam::DVec2;

use crate::types::{Color, Px};

/// Receives primitive draw calls in device pixel coordinates.
pub trait Painter {
    fn draw_marker(&mut self, marker: &MarkerPrimitive);

    fn draw_polyline(&mut self, points: &[DVec2], pen: &Pen);

    fn draw_polygon(&mut self, exterior: &[DVec2], holes: &[Vec<DVec2>], brush: &Brush, pen: &Pen);
}

/// Glyph drawn by a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerShape {
    #[default]
    Circle,
    Square,
    Diamond,
    Triangle,
    Star,
    Cross,
    X,
    Line,
}

impl MarkerShape {
    pub fn name(self) -> &'static str {
        match self {
            MarkerShape::Circle => "circle",
            MarkerShape::Square => "square",
            MarkerShape::Diamond => "diamond",
            MarkerShape::Triangle => "triangle",
            MarkerShape::Star => "star",
            MarkerShape::Cross => "cross",
            MarkerShape::X => "x",
            MarkerShape::Line => "line",
        }
    }

    /// Decode a shape name; `rectangle` is accepted as a square.
    pub fn from_name(name: &str) -> Option<MarkerShape> {
        Some(match name {
            "circle" => MarkerShape::Circle,
            "square" | "rectangle" => MarkerShape::Square,
            "diamond" => MarkerShape::Diamond,
            "triangle" => MarkerShape::Triangle,
            "star" => MarkerShape::Star,
            "cross" => MarkerShape::Cross,
            "x" | "cross2" => MarkerShape::X,
            "line" => MarkerShape::Line,
            _ => return None,
        })
    }

    /// Whether the glyph is drawn only with the outline pen.
    pub fn is_stroke_only(self) -> bool {
        matches!(self, MarkerShape::Cross | MarkerShape::X | MarkerShape::Line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenStyle {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
    NoPen,
}

impl PenStyle {
    pub fn name(self) -> &'static str {
        match self {
            PenStyle::Solid => "solid",
            PenStyle::Dash => "dash",
            PenStyle::Dot => "dot",
            PenStyle::DashDot => "dash dot",
            PenStyle::DashDotDot => "dash dot dot",
            PenStyle::NoPen => "no",
        }
    }

    /// Decode a pen style; anything unrecognized is solid.
    pub fn decode(name: &str) -> PenStyle {
        match name {
            "dash" => PenStyle::Dash,
            "dot" => PenStyle::Dot,
            "dash dot" => PenStyle::DashDot,
            "dash dot dot" => PenStyle::DashDotDot,
            "no" => PenStyle::NoPen,
            _ => PenStyle::Solid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinStyle {
    #[default]
    Bevel,
    Miter,
    Round,
}

impl JoinStyle {
    pub fn name(self) -> &'static str {
        match self {
            JoinStyle::Bevel => "bevel",
            JoinStyle::Miter => "miter",
            JoinStyle::Round => "round",
        }
    }

    pub fn decode(name: &str) -> JoinStyle {
        match name {
            "miter" => JoinStyle::Miter,
            "round" => JoinStyle::Round,
            _ => JoinStyle::Bevel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapStyle {
    #[default]
    Square,
    Flat,
    Round,
}

impl CapStyle {
    pub fn name(self) -> &'static str {
        match self {
            CapStyle::Square => "square",
            CapStyle::Flat => "flat",
            CapStyle::Round => "round",
        }
    }

    pub fn decode(name: &str) -> CapStyle {
        match name {
            "flat" => CapStyle::Flat,
            "round" => CapStyle::Round,
            _ => CapStyle::Square,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrushStyle {
    #[default]
    Solid,
    NoBrush,
    Horizontal,
    Vertical,
    Cross,
    BDiagonal,
    FDiagonal,
    DiagonalCross,
    Dense1,
    Dense7,
}

impl BrushStyle {
    pub fn name(self) -> &'static str {
        match self {
            BrushStyle::Solid => "solid",
            BrushStyle::NoBrush => "no",
            BrushStyle::Horizontal => "horizontal",
            BrushStyle::Vertical => "vertical",
            BrushStyle::Cross => "cross",
            BrushStyle::BDiagonal => "b_diagonal",
            BrushStyle::FDiagonal => "f_diagonal",
            BrushStyle::DiagonalCross => "diagonal_x",
            BrushStyle::Dense1 => "dense1",
            BrushStyle::Dense7 => "dense7",
        }
    }

    pub fn decode(name: &str) -> BrushStyle {
        match name {
            "no" => BrushStyle::NoBrush,
            "horizontal" => BrushStyle::Horizontal,
            "vertical" => BrushStyle::Vertical,
            "cross" => BrushStyle::Cross,
            "b_diagonal" => BrushStyle::BDiagonal,
            "f_diagonal" => BrushStyle::FDiagonal,
            "diagonal_x" => BrushStyle::DiagonalCross,
            "dense1" => BrushStyle::Dense1,
            "dense7" => BrushStyle::Dense7,
            _ => BrushStyle::Solid,
        }
    }
}

/// Outline settings for a draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen {
    pub color: Color,
    pub width: Px,
    pub style: PenStyle,
    pub join: JoinStyle,
    pub cap: CapStyle,
}

impl Pen {
    pub fn new(color: Color, width: Px) -> Self {
        Pen {
            color,
            width,
            style: PenStyle::Solid,
            join: JoinStyle::Bevel,
            cap: CapStyle::Square,
        }
    }

    pub fn with_style(mut self, style: PenStyle) -> Self {
        self.style = style;
        self
    }

    pub fn none() -> Self {
        Pen::new(Color::TRANSPARENT, Px::ZERO).with_style(PenStyle::NoPen)
    }
}

/// Interior settings for a polygon draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub color: Color,
    pub style: BrushStyle,
    /// Pattern rotation in degrees
    pub angle: f64,
}

impl Brush {
    pub fn new(color: Color, style: BrushStyle) -> Self {
        Brush { color, style, angle: 0.0 }
    }
}

/// One marker glyph, already in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPrimitive {
    pub shape: MarkerShape,
    pub center: DVec2,
    /// Glyph diameter in pixels
    pub size: Px,
    /// Clockwise rotation in degrees
    pub angle: f64,
    pub fill: Color,
    pub outline: Pen,
}

/// A recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Marker(MarkerPrimitive),
    Polyline {
        points: Vec<DVec2>,
        pen: Pen,
    },
    Polygon {
        exterior: Vec<DVec2>,
        holes: Vec<Vec<DVec2>>,
        brush: Brush,
        pen: Pen,
    },
}

fn write_points(f: &mut fmt::Formatter<'_>, points: &[DVec2]) -> fmt::Result {
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{},{}", fmt_num(p.x), fmt_num(p.y))?;
    }
    Ok(())
}

/// Round to 3 decimals and drop trailing zeros.
fn fmt_num(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    // normalize -0
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}

impl fmt::Display for DrawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawCommand::Marker(m) => write!(
                f,
                "marker {} at {},{} size {} angle {} fill {}",
                m.shape.name(),
                fmt_num(m.center.x),
                fmt_num(m.center.y),
                fmt_num(m.size.raw()),
                fmt_num(m.angle),
                m.fill
            ),
            DrawCommand::Polyline { points, pen } => {
                write!(f, "polyline [")?;
                write_points(f, points)?;
                write!(f, "] pen {} {}", pen.color, fmt_num(pen.width.raw()))
            }
            DrawCommand::Polygon {
                exterior,
                holes,
                brush,
                pen,
            } => {
                write!(f, "polygon [")?;
                write_points(f, exterior)?;
                write!(f, "]")?;
                if !holes.is_empty() {
                    write!(f, " holes {}", holes.len())?;
                }
                write!(
                    f,
                    " brush {} {} pen {} {}",
                    brush.color,
                    brush.style.name(),
                    pen.color,
                    fmt_num(pen.width.raw())
                )
            }
        }
    }
}

/// Painter that records every call, for tests and previews.
#[derive(Debug, Default)]
pub struct RecordingPainter {
    commands: Vec<DrawCommand>,
}

impl RecordingPainter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drain recorded commands.
    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// One line per recorded command.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for cmd in &self.commands {
            out.push_str(&cmd.to_string());
            out.push('\n');
        }
        out
    }
}

impl Painter for RecordingPainter {
    fn draw_marker(&mut self, marker: &MarkerPrimitive) {
        self.commands.push(DrawCommand::Marker(*marker));
    }

    fn draw_polyline(&mut self, points: &[DVec2], pen: &Pen) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            pen: *pen,
        });
    }

    fn draw_polygon(&mut self, exterior: &[DVec2], holes: &[Vec<DVec2>], brush: &Brush, pen: &Pen) {
        self.commands.push(DrawCommand::Polygon {
            exterior: exterior.to_vec(),
            holes: holes.to_vec(),
            brush: *brush,
            pen: *pen,
        });
    }
}
