//! Simple fill: a brush for the interior plus an outline pen

use std::any::Any;

use glam::DVec2;

use crate::log::debug;
use crate::render::{Brush, BrushStyle, JoinStyle, Pen, PenStyle, SymbolRenderContext, defaults};
use crate::types::{Color, MapUnitScale, OutputUnit, Px};

use super::SymbolType;
use super::data_defined::DataDefinedProperties;
use super::layer::{FillLayer, LayerGeometry, SymbolLayer, common_unit};
use super::props::{PropertyMap, Props, encode_color, encode_map_unit_scale, encode_point};

pub const LAYER_TYPE: &str = "SimpleFill";

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleFillLayer {
    color: Color,
    brush_style: BrushStyle,
    outline_color: Color,
    outline_style: PenStyle,
    outline_width: f64,
    outline_width_unit: OutputUnit,
    outline_width_map_unit_scale: MapUnitScale,
    join_style: JoinStyle,
    offset: DVec2,
    offset_unit: OutputUnit,
    offset_map_unit_scale: MapUnitScale,
    angle: f64,
    data_defined: DataDefinedProperties,
}

impl Default for SimpleFillLayer {
    fn default() -> Self {
        SimpleFillLayer::new(
            defaults::FILL_COLOR,
            defaults::FILL_STYLE,
            defaults::FILL_OUTLINE_COLOR,
            defaults::FILL_OUTLINE_STYLE,
            defaults::FILL_OUTLINE_WIDTH,
        )
    }
}

impl SimpleFillLayer {
    pub fn new(
        color: Color,
        brush_style: BrushStyle,
        outline_color: Color,
        outline_style: PenStyle,
        outline_width: f64,
    ) -> Self {
        SimpleFillLayer {
            color,
            brush_style,
            outline_color,
            outline_style,
            outline_width,
            outline_width_unit: OutputUnit::Millimeter,
            outline_width_map_unit_scale: MapUnitScale::default(),
            join_style: JoinStyle::Bevel,
            offset: DVec2::ZERO,
            offset_unit: OutputUnit::Millimeter,
            offset_map_unit_scale: MapUnitScale::default(),
            angle: 0.0,
            data_defined: DataDefinedProperties::new(),
        }
    }

    pub fn create(props: &PropertyMap) -> Self {
        let p = Props(props);
        let mut layer = SimpleFillLayer::new(
            p.color_of(&["color"], defaults::FILL_COLOR),
            p.str("style").map(BrushStyle::decode).unwrap_or(defaults::FILL_STYLE),
            p.color_of(&["outline_color", "color_border"], defaults::FILL_OUTLINE_COLOR),
            p.first_of(&["outline_style", "style_border"])
                .map(PenStyle::decode)
                .unwrap_or(defaults::FILL_OUTLINE_STYLE),
            p.f64_of(&["outline_width", "width_border"], defaults::FILL_OUTLINE_WIDTH),
        );
        layer.outline_width_unit = p.unit_of(&["outline_width_unit", "border_width_unit"]);
        layer.outline_width_map_unit_scale = p.scale("border_width_map_unit_scale");
        layer.join_style = p.str("joinstyle").map(JoinStyle::decode).unwrap_or_default();
        layer.offset = p.point("offset");
        layer.offset_unit = p.unit_of(&["offset_unit"]);
        layer.offset_map_unit_scale = p.scale("offset_map_unit_scale");
        layer.data_defined = DataDefinedProperties::read_properties(props);
        layer
    }

    pub fn brush_style(&self) -> BrushStyle {
        self.brush_style
    }

    pub fn set_brush_style(&mut self, style: BrushStyle) {
        self.brush_style = style;
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

    pub fn set_offset(&mut self, offset: DVec2) {
        self.offset = offset;
    }

    fn fill(&self, exterior: &[DVec2], holes: &[Vec<DVec2>], ctx: &mut SymbolRenderContext<'_, '_>) {
        let color = self.data_defined.color("color", ctx, self.color);
        let outline = self.data_defined.color("outline_color", ctx, self.outline_color);
        let outline_width = self.data_defined.number("outline_width", ctx, self.outline_width);
        let outline_px = ctx.to_pixels(outline_width, self.outline_width_unit, &self.outline_width_map_unit_scale);

        let brush = Brush {
            color: ctx.paint_color(color),
            style: self.brush_style,
            angle: self.angle,
        };
        let pen = Pen {
            color: ctx.apply_opacity(outline),
            width: Px(outline_px.max(0.0)),
            style: self.outline_style,
            join: self.join_style,
            cap: Default::default(),
        };

        let offset = self.offset * ctx.to_pixels(1.0, self.offset_unit, &self.offset_map_unit_scale);
        let painter = ctx.render_context_mut().painter();
        if offset == DVec2::ZERO {
            painter.draw_polygon(exterior, holes, &brush, &pen);
        } else {
            let shift = |ring: &[DVec2]| ring.iter().map(|p| *p + offset).collect::<Vec<_>>();
            let holes: Vec<Vec<DVec2>> = holes.iter().map(|h| shift(h)).collect();
            painter.draw_polygon(&shift(exterior), &holes, &brush, &pen);
        }
    }
}

impl SymbolLayer for SimpleFillLayer {
    fn layer_type(&self) -> &'static str {
        LAYER_TYPE
    }

    fn symbol_type(&self) -> SymbolType {
        SymbolType::Fill
    }

    fn render(&mut self, geometry: LayerGeometry<'_>, ctx: &mut SymbolRenderContext<'_, '_>) {
        match geometry {
            LayerGeometry::Polygon { exterior, holes } => self.fill(exterior, holes, ctx),
            _other => {
                debug!(geometry = ?_other, "simple fill only renders polygons");
            }
        }
    }

    fn draw_preview_icon(&mut self, ctx: &mut SymbolRenderContext<'_, '_>, size: DVec2) {
        let rect = [
            DVec2::new(0.0, 0.0),
            DVec2::new(size.x, 0.0),
            DVec2::new(size.x, size.y),
            DVec2::new(0.0, size.y),
        ];
        self.fill(&rect, &[], ctx);
    }

    fn clone_layer(&self) -> Box<dyn SymbolLayer> {
        Box::new(self.clone())
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        let mut put = |k: &str, v: String| {
            props.insert(k.to_string(), v);
        };
        put("color", encode_color(self.color));
        put("style", self.brush_style.name().to_string());
        put("outline_color", encode_color(self.outline_color));
        put("outline_style", self.outline_style.name().to_string());
        put("outline_width", self.outline_width.to_string());
        put("outline_width_unit", self.outline_width_unit.encode().to_string());
        put(
            "border_width_map_unit_scale",
            encode_map_unit_scale(self.outline_width_map_unit_scale),
        );
        put("joinstyle", self.join_style.name().to_string());
        put("offset", encode_point(self.offset));
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
        common_unit(&[self.outline_width_unit, self.offset_unit])
    }

    fn set_output_unit(&mut self, unit: OutputUnit) {
        self.outline_width_unit = unit;
        self.offset_unit = unit;
    }

    fn map_unit_scale(&self) -> MapUnitScale {
        if self.outline_width_map_unit_scale == self.offset_map_unit_scale {
            self.outline_width_map_unit_scale
        } else {
            MapUnitScale::default()
        }
    }

    fn set_map_unit_scale(&mut self, scale: MapUnitScale) {
        self.outline_width_map_unit_scale = scale;
        self.offset_map_unit_scale = scale;
    }

    fn data_defined(&self) -> &DataDefinedProperties {
        &self.data_defined
    }

    fn data_defined_mut(&mut self) -> &mut DataDefinedProperties {
        &mut self.data_defined
    }

    fn as_fill_mut(&mut self) -> Option<&mut dyn FillLayer> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl FillLayer for SimpleFillLayer {
    fn angle(&self) -> f64 {
        self.angle
    }

    fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }
}
