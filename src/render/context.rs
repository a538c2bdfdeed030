//! Rendering context - state shared by every symbol in a render pass

use glam::{DVec2, dvec2};

use crate::expression::ExpressionContext;
use crate::types::{Color, MapUnitScale, OutputUnit, Rect};

use super::defaults;
use super::painter::Painter;

/// Affine map-to-device transform: uniform scale plus origin, y flipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapToPixel {
    /// Map units covered by one device pixel
    pub map_units_per_pixel: f64,
    /// Map coordinate of the device's top-left corner
    pub origin: DVec2,
}

impl Default for MapToPixel {
    fn default() -> Self {
        MapToPixel {
            map_units_per_pixel: 1.0,
            origin: DVec2::ZERO,
        }
    }
}

impl MapToPixel {
    pub fn new(map_units_per_pixel: f64, origin: DVec2) -> Self {
        MapToPixel {
            map_units_per_pixel,
            origin,
        }
    }

    pub fn transform(&self, p: DVec2) -> DVec2 {
        dvec2(
            (p.x - self.origin.x) / self.map_units_per_pixel,
            (self.origin.y - p.y) / self.map_units_per_pixel,
        )
    }

    pub fn transform_all(&self, points: &[DVec2]) -> Vec<DVec2> {
        points.iter().map(|p| self.transform(*p)).collect()
    }
}

/// Low-level render state: the drawing surface plus scale information.
pub struct RenderContext<'p> {
    painter: &'p mut dyn Painter,
    pub map_to_pixel: MapToPixel,
    /// Visible map extent, used for clipping
    pub extent: Option<Rect>,
    /// Device pixels per millimeter
    pub scale_factor: f64,
    /// Map scale denominator
    pub renderer_scale: f64,
    pub selection_color: Color,
    pub expression_context: ExpressionContext,
}

impl<'p> RenderContext<'p> {
    pub fn new(painter: &'p mut dyn Painter) -> Self {
        RenderContext {
            painter,
            map_to_pixel: MapToPixel::default(),
            extent: None,
            scale_factor: defaults::SCALE_FACTOR,
            renderer_scale: 0.0,
            selection_color: defaults::SELECTION_COLOR,
            expression_context: ExpressionContext::new(),
        }
    }

    pub fn with_map_to_pixel(mut self, map_to_pixel: MapToPixel) -> Self {
        self.map_to_pixel = map_to_pixel;
        self
    }

    pub fn with_extent(mut self, extent: Rect) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_renderer_scale(mut self, renderer_scale: f64) -> Self {
        self.renderer_scale = renderer_scale;
        self
    }

    pub fn with_expression_context(mut self, ctx: ExpressionContext) -> Self {
        self.expression_context = ctx;
        self
    }

    pub fn painter(&mut self) -> &mut dyn Painter {
        &mut *self.painter
    }

    /// Convert a size in `unit` to device pixels.
    ///
    /// Mixed is treated as millimeters.
    pub fn convert_to_painter_units(&self, value: f64, unit: OutputUnit, scale: &MapUnitScale) -> f64 {
        match unit {
            OutputUnit::Millimeter | OutputUnit::Mixed => value * self.scale_factor,
            OutputUnit::Pixel => value,
            OutputUnit::MapUnit => {
                let mup = scale.compute_map_units_per_pixel(self.map_to_pixel.map_units_per_pixel, self.renderer_scale);
                if mup > 0.0 { value / mup } else { value }
            }
        }
    }
}
