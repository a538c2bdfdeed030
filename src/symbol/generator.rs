//! Geometry generator: renders an expression-derived geometry through a
//! sub-symbol
//!
//! The layer evaluates its expression against the current feature, clones
//! the feature with the result as its geometry and renders the clone with
//! the active sub-symbol. Marker, line and fill sub-symbols are kept side
//! by side so switching the active kind never discards configuration.

use std::any::Any;
use std::collections::BTreeSet;

use glam::DVec2;

use crate::errors::SymbolError;
use crate::expression::{Expression, Value};
use crate::log::{debug, warn};
use crate::render::{SymbolRenderContext, defaults};
use crate::types::{Color, MapUnitScale, OutputUnit};

use super::data_defined::DataDefinedProperties;
use super::layer::{LayerGeometry, SymbolLayer};
use super::props::{PropertyMap, Props};
use super::{RenderOptions, Symbol, SymbolType};

pub const LAYER_TYPE: &str = "GeometryGenerator";

const EXPRESSION_KEY: &str = "geometryModifier";
const SYMBOL_TYPE_KEY: &str = "SymbolType";

#[derive(Debug)]
pub struct GeometryGeneratorLayer {
    expression: Expression,
    marker_symbol: Option<Symbol>,
    line_symbol: Option<Symbol>,
    fill_symbol: Option<Symbol>,
    /// Active kind; always Marker, Line or Fill, and its slot is populated
    symbol_type: SymbolType,
    data_defined: DataDefinedProperties,
}

impl Default for GeometryGeneratorLayer {
    fn default() -> Self {
        GeometryGeneratorLayer::new(defaults::GEOMETRY_EXPRESSION)
    }
}

impl GeometryGeneratorLayer {
    /// A generator with a default fill sub-symbol.
    pub fn new(expression: &str) -> Self {
        let mut layer = GeometryGeneratorLayer {
            expression: Expression::new(expression),
            marker_symbol: None,
            line_symbol: None,
            fill_symbol: None,
            symbol_type: SymbolType::Fill,
            data_defined: DataDefinedProperties::new(),
        };
        layer.set_symbol_type(SymbolType::Fill);
        layer
    }

    /// Build from `geometryModifier` and `SymbolType`. The sub-symbol is
    /// created from the same property map by the matching simple factory.
    pub fn create(props: &PropertyMap) -> Self {
        let p = Props(props);
        let expression = p
            .str(EXPRESSION_KEY)
            .filter(|e| !e.is_empty())
            .unwrap_or(defaults::GEOMETRY_EXPRESSION);
        let mut layer = GeometryGeneratorLayer::new(expression);
        let sub_symbol = match p.str(SYMBOL_TYPE_KEY) {
            Some("Marker") => Symbol::create_simple_marker(props),
            Some("Line") => Symbol::create_simple_line(props),
            _ => Symbol::create_simple_fill(props),
        };
        // create_simple_* never builds a hybrid symbol
        if let Err(_err) = layer.set_sub_symbol(sub_symbol) {
            warn!(error = %_err, "generator sub-symbol rejected");
        }
        layer
    }

    pub fn geometry_expression(&self) -> &str {
        self.expression.text()
    }

    pub fn set_geometry_expression(&mut self, expression: &str) {
        self.expression = Expression::new(expression);
    }

    /// The active sub-symbol kind.
    pub fn symbol_type(&self) -> SymbolType {
        self.symbol_type
    }

    /// Activate a sub-symbol kind, creating a default sub-symbol for it
    /// the first time. Hybrid is not a valid sub-symbol kind and is ignored.
    pub fn set_symbol_type(&mut self, symbol_type: SymbolType) {
        let slot = match symbol_type {
            SymbolType::Marker => &mut self.marker_symbol,
            SymbolType::Line => &mut self.line_symbol,
            SymbolType::Fill => &mut self.fill_symbol,
            SymbolType::Hybrid => {
                debug!("generator sub-symbol cannot be hybrid");
                return;
            }
        };
        if slot.is_none() {
            *slot = Some(Symbol::default_for_type(symbol_type));
        }
        self.symbol_type = symbol_type;
    }

    /// Replace the sub-symbol of the given symbol's kind and activate it.
    pub fn set_sub_symbol(&mut self, symbol: Symbol) -> Result<(), SymbolError> {
        let symbol_type = symbol.symbol_type();
        match symbol_type {
            SymbolType::Marker => self.marker_symbol = Some(symbol),
            SymbolType::Line => self.line_symbol = Some(symbol),
            SymbolType::Fill => self.fill_symbol = Some(symbol),
            SymbolType::Hybrid => return Err(SymbolError::InvalidSubSymbol { symbol_type }),
        }
        self.symbol_type = symbol_type;
        Ok(())
    }

    fn active(&self) -> Option<&Symbol> {
        match self.symbol_type {
            SymbolType::Marker => self.marker_symbol.as_ref(),
            SymbolType::Line => self.line_symbol.as_ref(),
            SymbolType::Fill | SymbolType::Hybrid => self.fill_symbol.as_ref(),
        }
    }

    fn active_mut(&mut self) -> Option<&mut Symbol> {
        match self.symbol_type {
            SymbolType::Marker => self.marker_symbol.as_mut(),
            SymbolType::Line => self.line_symbol.as_mut(),
            SymbolType::Fill | SymbolType::Hybrid => self.fill_symbol.as_mut(),
        }
    }
}

impl Clone for GeometryGeneratorLayer {
    fn clone(&self) -> Self {
        let mut clone = GeometryGeneratorLayer {
            expression: Expression::new(self.expression.text()),
            marker_symbol: self.marker_symbol.clone(),
            line_symbol: self.line_symbol.clone(),
            fill_symbol: self.fill_symbol.clone(),
            symbol_type: SymbolType::Fill,
            data_defined: self.data_defined.clone(),
        };
        clone.set_symbol_type(self.symbol_type);
        clone
    }
}

impl SymbolLayer for GeometryGeneratorLayer {
    fn layer_type(&self) -> &'static str {
        LAYER_TYPE
    }

    fn symbol_type(&self) -> SymbolType {
        SymbolType::Hybrid
    }

    fn start_render(&mut self, ctx: &mut SymbolRenderContext<'_, '_>) {
        let fields = ctx.fields();
        if let Some(fields) = fields {
            if let Err(_err) = self.expression.prepare(ctx.expression_context(), fields) {
                debug!(expression = self.expression.text(), error = %_err, "generator expression will not evaluate");
            }
        }
        if let Some(symbol) = self.active_mut() {
            if let Err(_err) = symbol.start_render(ctx.render_context_mut(), fields) {
                warn!(error = %_err, "generator sub-symbol did not start");
            }
        }
    }

    fn stop_render(&mut self, ctx: &mut SymbolRenderContext<'_, '_>) {
        if let Some(symbol) = self.active_mut() {
            symbol.stop_render(ctx.render_context_mut());
        }
    }

    fn render(&mut self, _geometry: LayerGeometry<'_>, ctx: &mut SymbolRenderContext<'_, '_>) {
        // Previews and icons carry no feature
        let Some(feature) = ctx.feature() else {
            return;
        };

        let geometry = match self.expression.evaluate(ctx.expression_context(), Some(feature)) {
            Ok(Value::Geometry(geometry)) => Some(geometry),
            Ok(Value::Null) => None,
            Ok(_other) => {
                debug!(value = %_other, "generator expression did not produce a geometry");
                return;
            }
            Err(_err) => {
                debug!(expression = self.expression.text(), error = %_err, "skipping feature");
                return;
            }
        };

        let mut generated = feature.clone();
        generated.set_geometry(geometry);
        let options = RenderOptions {
            selected: ctx.selected(),
            ..RenderOptions::default()
        };
        if let Some(symbol) = self.active_mut() {
            symbol.render_feature(&generated, ctx.render_context_mut(), options);
        }
    }

    fn draw_preview_icon(&mut self, ctx: &mut SymbolRenderContext<'_, '_>, size: DVec2) {
        if let Some(symbol) = self.active_mut() {
            symbol.draw_preview_icon(ctx.render_context_mut(), size);
        }
    }

    fn clone_layer(&self) -> Box<dyn SymbolLayer> {
        Box::new(self.clone())
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert(EXPRESSION_KEY.to_string(), self.expression.text().to_string());
        let kind = match self.symbol_type {
            SymbolType::Marker => "Marker",
            SymbolType::Line => "Line",
            SymbolType::Fill | SymbolType::Hybrid => "Fill",
        };
        props.insert(SYMBOL_TYPE_KEY.to_string(), kind.to_string());
        props
    }

    fn used_attributes(&self) -> BTreeSet<String> {
        let mut attrs = self.active().map(Symbol::used_attributes).unwrap_or_default();
        attrs.extend(self.expression.referenced_columns());
        attrs
    }

    /// Compatible with every symbol kind; outside hybrid symbols the owner
    /// renders it through its fallback path.
    fn is_compatible_with_symbol(&self, _symbol_type: SymbolType) -> bool {
        true
    }

    fn color(&self) -> Color {
        self.active().map_or(Color::BLACK, Symbol::color)
    }

    fn set_color(&mut self, color: Color) {
        if let Some(symbol) = self.active_mut() {
            symbol.set_color(color);
        }
    }

    fn output_unit(&self) -> OutputUnit {
        self.active().map_or(OutputUnit::Millimeter, Symbol::output_unit)
    }

    fn set_output_unit(&mut self, unit: OutputUnit) {
        if let Some(symbol) = self.active_mut() {
            symbol.set_output_unit(unit);
        }
    }

    fn map_unit_scale(&self) -> MapUnitScale {
        self.active().map(Symbol::map_unit_scale).unwrap_or_default()
    }

    fn set_map_unit_scale(&mut self, scale: MapUnitScale) {
        if let Some(symbol) = self.active_mut() {
            symbol.set_map_unit_scale(scale);
        }
    }

    fn data_defined(&self) -> &DataDefinedProperties {
        &self.data_defined
    }

    fn data_defined_mut(&mut self) -> &mut DataDefinedProperties {
        &mut self.data_defined
    }

    fn sub_symbol(&self) -> Option<&Symbol> {
        self.active()
    }

    fn sub_symbol_mut(&mut self) -> Option<&mut Symbol> {
        self.active_mut()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
