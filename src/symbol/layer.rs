//! The symbol layer trait and its capability extensions

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;

use glam::DVec2;

use crate::render::SymbolRenderContext;
use crate::types::{Color, MapUnitScale, OutputUnit};

use super::data_defined::DataDefinedProperties;
use super::props::PropertyMap;
use super::{Symbol, SymbolType};

/// Geometry handed to a layer, already in device pixels.
///
/// `None` is used by the fallback path for layers that produce their own
/// geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerGeometry<'g> {
    None,
    Point(DVec2),
    Polyline(&'g [DVec2]),
    Polygon {
        exterior: &'g [DVec2],
        holes: &'g [Vec<DVec2>],
    },
}

/// How a data-defined marker size maps to the drawn glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMethod {
    /// The value is the glyph area; the drawn diameter is its square root
    ScaleArea,
    #[default]
    ScaleDiameter,
}

impl ScaleMethod {
    pub fn name(self) -> &'static str {
        match self {
            ScaleMethod::ScaleArea => "area",
            ScaleMethod::ScaleDiameter => "diameter",
        }
    }

    pub fn decode(s: &str) -> ScaleMethod {
        match s {
            "area" => ScaleMethod::ScaleArea,
            _ => ScaleMethod::ScaleDiameter,
        }
    }
}

/// One renderable unit of a [`Symbol`].
///
/// Layers are owned by exactly one symbol. `start_render`/`stop_render`
/// bracket a render pass; `render` may be called any number of times in
/// between.
pub trait SymbolLayer: fmt::Debug + Send {
    /// Registry name, e.g. `SimpleMarker`.
    fn layer_type(&self) -> &'static str;

    /// The symbol kind this layer draws for.
    fn symbol_type(&self) -> SymbolType;

    fn start_render(&mut self, _ctx: &mut SymbolRenderContext<'_, '_>) {}

    fn stop_render(&mut self, _ctx: &mut SymbolRenderContext<'_, '_>) {}

    fn render(&mut self, geometry: LayerGeometry<'_>, ctx: &mut SymbolRenderContext<'_, '_>);

    /// Draw a representative glyph into a `size` box at the origin.
    fn draw_preview_icon(&mut self, ctx: &mut SymbolRenderContext<'_, '_>, size: DVec2);

    fn clone_layer(&self) -> Box<dyn SymbolLayer>;

    fn properties(&self) -> PropertyMap;

    /// Attribute names this layer reads while rendering.
    fn used_attributes(&self) -> BTreeSet<String> {
        self.data_defined().referenced_columns()
    }

    /// Whether the layer may live in a symbol of `symbol_type`.
    fn is_compatible_with_symbol(&self, symbol_type: SymbolType) -> bool {
        let own = self.symbol_type();
        own == symbol_type || (own == SymbolType::Line && symbol_type == SymbolType::Fill)
    }

    fn color(&self) -> Color;

    fn set_color(&mut self, color: Color);

    fn output_unit(&self) -> OutputUnit;

    fn set_output_unit(&mut self, unit: OutputUnit);

    fn map_unit_scale(&self) -> MapUnitScale;

    fn set_map_unit_scale(&mut self, scale: MapUnitScale);

    fn data_defined(&self) -> &DataDefinedProperties;

    fn data_defined_mut(&mut self) -> &mut DataDefinedProperties;

    fn sub_symbol(&self) -> Option<&Symbol> {
        None
    }

    fn sub_symbol_mut(&mut self) -> Option<&mut Symbol> {
        None
    }

    fn as_marker(&self) -> Option<&dyn MarkerLayer> {
        None
    }

    fn as_marker_mut(&mut self) -> Option<&mut dyn MarkerLayer> {
        None
    }

    fn as_line(&self) -> Option<&dyn LineLayer> {
        None
    }

    fn as_line_mut(&mut self) -> Option<&mut dyn LineLayer> {
        None
    }

    fn as_fill_mut(&mut self) -> Option<&mut dyn FillLayer> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Layers that draw a glyph at a point.
pub trait MarkerLayer: SymbolLayer {
    fn size(&self) -> f64;
    fn set_size(&mut self, size: f64);
    fn angle(&self) -> f64;
    fn set_angle(&mut self, angle: f64);
    /// Extra rotation from the direction of the line the marker sits on.
    fn set_line_angle(&mut self, angle: f64);
    fn scale_method(&self) -> ScaleMethod;
    fn set_scale_method(&mut self, method: ScaleMethod);
}

/// Layers that stroke a path.
pub trait LineLayer: SymbolLayer {
    fn width(&self) -> f64;
    fn set_width(&mut self, width: f64);
}

/// Layers that fill an area.
pub trait FillLayer: SymbolLayer {
    fn angle(&self) -> f64;
    fn set_angle(&mut self, angle: f64);
}

/// Unit shared by all of a layer's sizes, or Mixed.
pub(crate) fn common_unit(units: &[OutputUnit]) -> OutputUnit {
    match units.split_first() {
        Some((first, rest)) if rest.iter().all(|u| u == first) => *first,
        Some(_) => OutputUnit::Mixed,
        None => OutputUnit::Millimeter,
    }
}
