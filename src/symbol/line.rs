//! Simple line: a single stroked path

use std::any::Any;

use glam::DVec2;

use crate::geometry::close_ring;
use crate::log::debug;
use crate::render::{CapStyle, JoinStyle, Pen, PenStyle, SymbolRenderContext, defaults};
use crate::types::{Color, MapUnitScale, OutputUnit, Px};

use super::SymbolType;
use super::data_defined::DataDefinedProperties;
use super::layer::{LayerGeometry, LineLayer, SymbolLayer, common_unit};
use super::props::{PropertyMap, Props, encode_color, encode_map_unit_scale};

pub const LAYER_TYPE: &str = "SimpleLine";

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleLineLayer {
    color: Color,
    width: f64,
    width_unit: OutputUnit,
    width_map_unit_scale: MapUnitScale,
    pen_style: PenStyle,
    join_style: JoinStyle,
    cap_style: CapStyle,
    offset: f64,
    offset_unit: OutputUnit,
    offset_map_unit_scale: MapUnitScale,
    data_defined: DataDefinedProperties,
}

impl Default for SimpleLineLayer {
    fn default() -> Self {
        SimpleLineLayer::new(defaults::LINE_COLOR, defaults::LINE_WIDTH, defaults::LINE_PEN_STYLE)
    }
}

impl SimpleLineLayer {
    pub fn new(color: Color, width: f64, pen_style: PenStyle) -> Self {
        SimpleLineLayer {
            color,
            width,
            width_unit: OutputUnit::Millimeter,
            width_map_unit_scale: MapUnitScale::default(),
            pen_style,
            join_style: defaults::LINE_JOIN_STYLE,
            cap_style: defaults::LINE_CAP_STYLE,
            offset: 0.0,
            offset_unit: OutputUnit::Millimeter,
            offset_map_unit_scale: MapUnitScale::default(),
            data_defined: DataDefinedProperties::new(),
        }
    }

    pub fn create(props: &PropertyMap) -> Self {
        let p = Props(props);
        let mut layer = SimpleLineLayer::new(
            p.color_of(&["line_color", "outline_color", "color"], defaults::LINE_COLOR),
            p.f64_of(&["line_width", "outline_width", "width"], defaults::LINE_WIDTH),
            p.first_of(&["line_style", "outline_style", "penstyle"])
                .map(PenStyle::decode)
                .unwrap_or(defaults::LINE_PEN_STYLE),
        );
        layer.width_unit = p.unit_of(&["line_width_unit", "outline_width_unit"]);
        layer.width_map_unit_scale = p.scale("width_map_unit_scale");
        layer.join_style = p.str("joinstyle").map(JoinStyle::decode).unwrap_or_default();
        layer.cap_style = p.str("capstyle").map(CapStyle::decode).unwrap_or_default();
        layer.offset = p.f64("offset", 0.0);
        layer.offset_unit = p.unit_of(&["offset_unit"]);
        layer.offset_map_unit_scale = p.scale("offset_map_unit_scale");
        layer.data_defined = DataDefinedProperties::read_properties(props);
        layer
    }

    pub fn pen_style(&self) -> PenStyle {
        self.pen_style
    }

    pub fn set_pen_style(&mut self, style: PenStyle) {
        self.pen_style = style;
    }

    pub fn join_style(&self) -> JoinStyle {
        self.join_style
    }

    pub fn set_join_style(&mut self, style: JoinStyle) {
        self.join_style = style;
    }

    pub fn cap_style(&self) -> CapStyle {
        self.cap_style
    }

    pub fn set_cap_style(&mut self, style: CapStyle) {
        self.cap_style = style;
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    fn pen(&self, ctx: &mut SymbolRenderContext<'_, '_>) -> Pen {
        let color = self.data_defined.color("color", ctx, self.color);
        let width = self.data_defined.number("width", ctx, self.width);
        let width_px = ctx.to_pixels(width, self.width_unit, &self.width_map_unit_scale);
        Pen {
            color: ctx.paint_color(color),
            width: Px(width_px.max(0.0)),
            style: self.pen_style,
            join: self.join_style,
            cap: self.cap_style,
        }
    }

    fn stroke(&self, points: &[DVec2], ctx: &mut SymbolRenderContext<'_, '_>) {
        let pen = self.pen(ctx);
        let offset = self.data_defined.number("offset", ctx, self.offset);
        let offset_px = ctx.to_pixels(offset, self.offset_unit, &self.offset_map_unit_scale);
        let painter = ctx.render_context_mut().painter();
        if offset_px == 0.0 {
            painter.draw_polyline(points, &pen);
        } else {
            painter.draw_polyline(&offset_polyline(points, offset_px), &pen);
        }
    }
}

/// Shift every vertex along the averaged normal of its adjacent segments.
/// Positive distances move to the left of the direction of travel.
pub(crate) fn offset_polyline(points: &[DVec2], distance: f64) -> Vec<DVec2> {
    let normal = |a: DVec2, b: DVec2| (b - a).perp().normalize_or_zero();
    points
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let before = (i > 0).then(|| normal(points[i - 1], p));
            let after = points.get(i + 1).map(|&next| normal(p, next));
            let n = match (before, after) {
                (Some(a), Some(b)) => (a + b).normalize_or_zero(),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => DVec2::ZERO,
            };
            p + n * distance
        })
        .collect()
}

impl SymbolLayer for SimpleLineLayer {
    fn layer_type(&self) -> &'static str {
        LAYER_TYPE
    }

    fn symbol_type(&self) -> SymbolType {
        SymbolType::Line
    }

    fn render(&mut self, geometry: LayerGeometry<'_>, ctx: &mut SymbolRenderContext<'_, '_>) {
        match geometry {
            LayerGeometry::Polyline(points) => self.stroke(points, ctx),
            // Outline of a polygon in a fill symbol
            LayerGeometry::Polygon { exterior, holes } => {
                self.stroke(&close_ring(exterior), ctx);
                for hole in holes {
                    self.stroke(&close_ring(hole), ctx);
                }
            }
            _other => {
                debug!(geometry = ?_other, "simple line ignores geometry");
            }
        }
    }

    fn draw_preview_icon(&mut self, ctx: &mut SymbolRenderContext<'_, '_>, size: DVec2) {
        let y = size.y / 2.0;
        self.stroke(&[DVec2::new(0.0, y), DVec2::new(size.x, y)], ctx);
    }

    fn clone_layer(&self) -> Box<dyn SymbolLayer> {
        Box::new(self.clone())
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        let mut put = |k: &str, v: String| {
            props.insert(k.to_string(), v);
        };
        put("line_color", encode_color(self.color));
        put("line_width", self.width.to_string());
        put("line_width_unit", self.width_unit.encode().to_string());
        put("width_map_unit_scale", encode_map_unit_scale(self.width_map_unit_scale));
        put("line_style", self.pen_style.name().to_string());
        put("joinstyle", self.join_style.name().to_string());
        put("capstyle", self.cap_style.name().to_string());
        put("offset", self.offset.to_string());
        put("offset_unit", self.offset_unit.encode().to_string());
        put("offset_map_unit_scale", encode_map_unit_scale(self.offset_map_unit_scale));
        self.data_defined.write_properties(&mut props);
        props
    }

    fn color(&self) -> Color {
        self.color
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn output_unit(&self) -> OutputUnit {
        common_unit(&[self.width_unit, self.offset_unit])
    }

    fn set_output_unit(&mut self, unit: OutputUnit) {
        self.width_unit = unit;
        self.offset_unit = unit;
    }

    fn map_unit_scale(&self) -> MapUnitScale {
        if self.width_map_unit_scale == self.offset_map_unit_scale {
            self.width_map_unit_scale
        } else {
            MapUnitScale::default()
        }
    }

    fn set_map_unit_scale(&mut self, scale: MapUnitScale) {
        self.width_map_unit_scale = scale;
        self.offset_map_unit_scale = scale;
    }

    fn data_defined(&self) -> &DataDefinedProperties {
        &self.data_defined
    }

    fn data_defined_mut(&mut self) -> &mut DataDefinedProperties {
        &mut self.data_defined
    }

    fn as_line(&self) -> Option<&dyn LineLayer> {
        Some(self)
    }

    fn as_line_mut(&mut self) -> Option<&mut dyn LineLayer> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl LineLayer for SimpleLineLayer {
    fn width(&self) -> f64 {
        self.width
    }

    fn set_width(&mut self, width: f64) {
        self.width = width;
    }
}
