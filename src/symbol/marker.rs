//! Simple marker: a single geometric glyph per point

use std::any::Any;

use glam::DVec2;

use crate::log::debug;
use crate::render::{MarkerPrimitive, MarkerShape, Pen, PenStyle, SymbolRenderContext, defaults};
use crate::types::{Color, MapUnitScale, OutputUnit, Px};

use super::data_defined::DataDefinedProperties;
use super::layer::{LayerGeometry, MarkerLayer, ScaleMethod, SymbolLayer, common_unit};
use super::props::{PropertyMap, Props, encode_color, encode_map_unit_scale, encode_point};
use super::{RenderHints, SymbolType};

pub const LAYER_TYPE: &str = "SimpleMarker";

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleMarkerLayer {
    shape: MarkerShape,
    color: Color,
    outline_color: Color,
    outline_style: PenStyle,
    outline_width: f64,
    outline_width_unit: OutputUnit,
    outline_width_map_unit_scale: MapUnitScale,
    size: f64,
    size_unit: OutputUnit,
    size_map_unit_scale: MapUnitScale,
    angle: f64,
    line_angle: f64,
    offset: DVec2,
    offset_unit: OutputUnit,
    offset_map_unit_scale: MapUnitScale,
    scale_method: ScaleMethod,
    data_defined: DataDefinedProperties,
}

impl Default for SimpleMarkerLayer {
    fn default() -> Self {
        SimpleMarkerLayer::new(defaults::MARKER_SHAPE, defaults::MARKER_SIZE, 0.0)
    }
}

impl SimpleMarkerLayer {
    pub fn new(shape: MarkerShape, size: f64, angle: f64) -> Self {
        SimpleMarkerLayer {
            shape,
            color: defaults::MARKER_COLOR,
            outline_color: defaults::MARKER_OUTLINE_COLOR,
            outline_style: PenStyle::Solid,
            outline_width: defaults::MARKER_OUTLINE_WIDTH,
            outline_width_unit: OutputUnit::Millimeter,
            outline_width_map_unit_scale: MapUnitScale::default(),
            size,
            size_unit: OutputUnit::Millimeter,
            size_map_unit_scale: MapUnitScale::default(),
            angle,
            line_angle: 0.0,
            offset: DVec2::ZERO,
            offset_unit: OutputUnit::Millimeter,
            offset_map_unit_scale: MapUnitScale::default(),
            scale_method: ScaleMethod::default(),
            data_defined: DataDefinedProperties::new(),
        }
    }

    /// Build from a property map. Unknown keys are ignored and missing
    /// keys take their defaults.
    pub fn create(props: &PropertyMap) -> Self {
        let p = Props(props);
        let shape = p
            .str("name")
            .and_then(MarkerShape::from_name)
            .unwrap_or(defaults::MARKER_SHAPE);
        let mut layer = SimpleMarkerLayer::new(shape, p.f64("size", defaults::MARKER_SIZE), p.f64("angle", 0.0));
        layer.color = p.color_of(&["color"], defaults::MARKER_COLOR);
        layer.outline_color = p.color_of(&["outline_color", "color_border"], defaults::MARKER_OUTLINE_COLOR);
        layer.outline_style = p.str("outline_style").map(PenStyle::decode).unwrap_or_default();
        layer.outline_width = p.f64("outline_width", defaults::MARKER_OUTLINE_WIDTH);
        layer.outline_width_unit = p.unit_of(&["outline_width_unit"]);
        layer.outline_width_map_unit_scale = p.scale("outline_width_map_unit_scale");
        layer.size_unit = p.unit_of(&["size_unit"]);
        layer.size_map_unit_scale = p.scale("size_map_unit_scale");
        layer.offset = p.point("offset");
        layer.offset_unit = p.unit_of(&["offset_unit"]);
        layer.offset_map_unit_scale = p.scale("offset_map_unit_scale");
        layer.scale_method = p.str("scale_method").map(ScaleMethod::decode).unwrap_or_default();
        layer.data_defined = DataDefinedProperties::read_properties(props);
        layer
    }

    pub fn shape(&self) -> MarkerShape {
        self.shape
    }

    pub fn set_shape(&mut self, shape: MarkerShape) {
        self.shape = shape;
    }

    pub fn outline_color(&self) -> Color {
        self.outline_color
    }

    pub fn set_outline_color(&mut self, color: Color) {
        self.outline_color = color;
    }

    pub fn outline_width(&self) -> f64 {
        self.outline_width
    }

    pub fn set_outline_width(&mut self, width: f64) {
        self.outline_width = width;
    }

    pub fn offset(&self) -> DVec2 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: DVec2) {
        self.offset = offset;
    }

    /// Size for the current feature, after overrides and scale method.
    fn scaled_size(&self, ctx: &mut SymbolRenderContext<'_, '_>) -> f64 {
        let size = self.data_defined.number("size", ctx, self.size);
        let data_defined_size = ctx.render_hints().contains(RenderHints::DATA_DEFINED_SIZE_SCALE)
            || self.data_defined.is_active("size");
        match self.scale_method {
            ScaleMethod::ScaleArea if data_defined_size => size.max(0.0).sqrt(),
            _ => size,
        }
    }

    fn draw_at(&self, point: DVec2, ctx: &mut SymbolRenderContext<'_, '_>) {
        let size = self.scaled_size(ctx);
        let size_px = ctx.to_pixels(size, self.size_unit, &self.size_map_unit_scale);
        let angle = self.data_defined.number("angle", ctx, self.angle) + self.line_angle;

        let offset = self.offset * ctx.to_pixels(1.0, self.offset_unit, &self.offset_map_unit_scale);

        let fill = self.data_defined.color("color", ctx, self.color);
        let outline = self.data_defined.color("outline_color", ctx, self.outline_color);
        let outline_width = self.data_defined.number("outline_width", ctx, self.outline_width);
        let outline_px = ctx.to_pixels(outline_width, self.outline_width_unit, &self.outline_width_map_unit_scale);

        let marker = MarkerPrimitive {
            shape: self.shape,
            center: point + offset,
            size: Px(size_px),
            angle,
            fill: ctx.paint_color(fill),
            outline: Pen::new(ctx.apply_opacity(outline), Px(outline_px)).with_style(self.outline_style),
        };
        ctx.render_context_mut().painter().draw_marker(&marker);
    }
}

impl SymbolLayer for SimpleMarkerLayer {
    fn layer_type(&self) -> &'static str {
        LAYER_TYPE
    }

    fn symbol_type(&self) -> SymbolType {
        SymbolType::Marker
    }

    fn render(&mut self, geometry: LayerGeometry<'_>, ctx: &mut SymbolRenderContext<'_, '_>) {
        match geometry {
            LayerGeometry::Point(p) => self.draw_at(p, ctx),
            _other => {
                debug!(geometry = ?_other, "simple marker only renders points");
            }
        }
    }

    fn draw_preview_icon(&mut self, ctx: &mut SymbolRenderContext<'_, '_>, size: DVec2) {
        self.draw_at(size / 2.0, ctx);
    }

    fn clone_layer(&self) -> Box<dyn SymbolLayer> {
        Box::new(self.clone())
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        let mut put = |k: &str, v: String| {
            props.insert(k.to_string(), v);
        };
        put("name", self.shape.name().to_string());
        put("color", encode_color(self.color));
        put("outline_color", encode_color(self.outline_color));
        put("outline_style", self.outline_style.name().to_string());
        put("outline_width", self.outline_width.to_string());
        put("outline_width_unit", self.outline_width_unit.encode().to_string());
        put(
            "outline_width_map_unit_scale",
            encode_map_unit_scale(self.outline_width_map_unit_scale),
        );
        put("size", self.size.to_string());
        put("size_unit", self.size_unit.encode().to_string());
        put("size_map_unit_scale", encode_map_unit_scale(self.size_map_unit_scale));
        put("angle", self.angle.to_string());
        put("offset", encode_point(self.offset));
        put("offset_unit", self.offset_unit.encode().to_string());
        put("offset_map_unit_scale", encode_map_unit_scale(self.offset_map_unit_scale));
        put("scale_method", self.scale_method.name().to_string());
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
        common_unit(&[self.size_unit, self.offset_unit, self.outline_width_unit])
    }

    fn set_output_unit(&mut self, unit: OutputUnit) {
        self.size_unit = unit;
        self.offset_unit = unit;
        self.outline_width_unit = unit;
    }

    fn map_unit_scale(&self) -> MapUnitScale {
        if self.size_map_unit_scale == self.offset_map_unit_scale
            && self.size_map_unit_scale == self.outline_width_map_unit_scale
        {
            self.size_map_unit_scale
        } else {
            MapUnitScale::default()
        }
    }

    fn set_map_unit_scale(&mut self, scale: MapUnitScale) {
        self.size_map_unit_scale = scale;
        self.offset_map_unit_scale = scale;
        self.outline_width_map_unit_scale = scale;
    }

    fn data_defined(&self) -> &DataDefinedProperties {
        &self.data_defined
    }

    fn data_defined_mut(&mut self) -> &mut DataDefinedProperties {
        &mut self.data_defined
    }

    fn as_marker(&self) -> Option<&dyn MarkerLayer> {
        Some(self)
    }

    fn as_marker_mut(&mut self) -> Option<&mut dyn MarkerLayer> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl MarkerLayer for SimpleMarkerLayer {
    fn size(&self) -> f64 {
        self.size
    }

    fn set_size(&mut self, size: f64) {
        self.size = size;
    }

    fn angle(&self) -> f64 {
        self.angle
    }

    fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }

    fn set_line_angle(&mut self, angle: f64) {
        self.line_angle = angle;
    }

    fn scale_method(&self) -> ScaleMethod {
        self.scale_method
    }

    fn set_scale_method(&mut self, method: ScaleMethod) {
        self.scale_method = method;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCommand, RecordingPainter, RenderContext};
    use crate::symbol::DataDefined;
    use crate::types::Opacity;
    use glam::dvec2;

    fn render_point(layer: &mut SimpleMarkerLayer, hints: RenderHints) -> MarkerPrimitive {
        let mut painter = RecordingPainter::new();
        {
            let mut ctx = RenderContext::new(&mut painter).with_scale_factor(1.0);
            let mut sctx = SymbolRenderContext::new(&mut ctx, OutputUnit::Millimeter, Opacity::OPAQUE, false, hints);
            layer.render(LayerGeometry::Point(dvec2(10.0, 10.0)), &mut sctx);
        }
        match painter.commands() {
            [DrawCommand::Marker(m)] => *m,
            other => panic!("expected one marker, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_factory_defaults() {
        let layer = SimpleMarkerLayer::create(&PropertyMap::new());
        assert_eq!(layer, SimpleMarkerLayer::default());
        assert_eq!(layer.shape(), MarkerShape::Circle);
        assert_eq!(layer.color(), Color::RED);
        assert_eq!(layer.size(), 2.0);
    }

    #[test]
    fn properties_round_trip() {
        let mut layer = SimpleMarkerLayer::new(MarkerShape::Star, 4.5, 30.0);
        layer.set_offset(dvec2(1.0, -0.5));
        layer.set_output_unit(OutputUnit::Pixel);
        layer.data_defined_mut().set("size", DataDefined::new("\"size\" * 2"));
        let props = layer.properties();
        let rebuilt = SimpleMarkerLayer::create(&props);
        assert_eq!(rebuilt.properties(), props);
        assert_eq!(rebuilt, layer);
    }

    #[test]
    fn legacy_outline_key_is_read() {
        let mut props = PropertyMap::new();
        props.insert("color_border".into(), "1,2,3,255".into());
        assert_eq!(SimpleMarkerLayer::create(&props).outline_color(), Color::rgb(1, 2, 3));
    }

    #[test]
    fn renders_offset_and_rotated_glyph() {
        let mut layer = SimpleMarkerLayer::new(MarkerShape::Square, 4.0, 45.0);
        layer.set_offset(dvec2(2.0, 0.0));
        layer.set_line_angle(10.0);
        let marker = render_point(&mut layer, RenderHints::empty());
        assert_eq!(marker.center, dvec2(12.0, 10.0));
        assert_eq!(marker.size, Px(4.0));
        assert_eq!(marker.angle, 55.0);
        assert_eq!(marker.fill, Color::RED);
    }

    #[test]
    fn area_scaling_applies_to_data_defined_size() {
        let mut layer = SimpleMarkerLayer::new(MarkerShape::Circle, 16.0, 0.0);
        layer.set_scale_method(ScaleMethod::ScaleArea);
        assert_eq!(render_point(&mut layer, RenderHints::empty()).size, Px(16.0));
        assert_eq!(
            render_point(&mut layer, RenderHints::DATA_DEFINED_SIZE_SCALE).size,
            Px(4.0)
        );
    }

    #[test]
    fn ignores_non_point_geometry() {
        let mut painter = RecordingPainter::new();
        {
            let mut ctx = RenderContext::new(&mut painter);
            let mut sctx =
                SymbolRenderContext::new(&mut ctx, OutputUnit::Millimeter, Opacity::OPAQUE, false, RenderHints::empty());
            let line = [dvec2(0.0, 0.0), dvec2(1.0, 1.0)];
            SimpleMarkerLayer::default().render(LayerGeometry::Polyline(&line), &mut sctx);
            SimpleMarkerLayer::default().render(LayerGeometry::None, &mut sctx);
        }
        assert!(painter.is_empty());
    }
}
