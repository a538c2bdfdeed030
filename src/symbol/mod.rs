//! Symbols: ordered stacks of symbol layers painted for one feature
//!
//! A [`Symbol`] owns its layers exclusively. Marker, line and fill symbols
//! dispatch the feature geometry to their layers in paint order; hybrid
//! symbols hand every layer the feature itself and let the layer derive
//! what to draw (see [`GeometryGeneratorLayer`]).
//!
//! A render pass is `start_render`, any number of `render_feature` calls,
//! then `stop_render`. Passes on the same symbol must not overlap; clone
//! the symbol to render it on several threads.

mod data_defined;
mod fill;
mod generator;
mod layer;
mod line;
mod marker;
mod props;
mod registry;

use std::collections::BTreeSet;
use std::sync::Weak;

use bitflags::bitflags;
use glam::DVec2;

use crate::errors::SymbolError;
use crate::expression::ExpressionScope;
use crate::feature::{Feature, Fields, VectorLayer};
use crate::geometry::{Geometry, GeometryType};
use crate::log::{debug, warn};
use crate::render::{
    MarkerPrimitive, MarkerShape, Pen, RenderContext, SymbolRenderContext, clip_geometry, defaults,
};
use crate::types::{Color, MapUnitScale, Opacity, OutputUnit, Px};

pub use data_defined::{DataDefined, DataDefinedProperties};
pub use fill::SimpleFillLayer;
pub use generator::GeometryGeneratorLayer;
pub use layer::{FillLayer, LayerGeometry, LineLayer, MarkerLayer, ScaleMethod, SymbolLayer};
pub use line::SimpleLineLayer;
pub use marker::SimpleMarkerLayer;
pub use props::{
    PropertyMap, decode_color, decode_map_unit_scale, decode_point, encode_color, encode_map_unit_scale,
    encode_point,
};
pub use registry::{LayerFactory, LayerMetadata, SymbolLayerRegistry};

use layer::common_unit;

/// Name of the expression scope pushed while a feature renders.
pub const SYMBOL_SCOPE: &str = "Symbol";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Marker,
    Line,
    Fill,
    /// Layers derive their own geometry; only generator layers fit here
    Hybrid,
}

impl SymbolType {
    pub fn name(self) -> &'static str {
        match self {
            SymbolType::Marker => "Marker",
            SymbolType::Line => "Line",
            SymbolType::Fill => "Fill",
            SymbolType::Hybrid => "Hybrid",
        }
    }

    pub fn from_name(name: &str) -> Option<SymbolType> {
        match name {
            "Marker" => Some(SymbolType::Marker),
            "Line" => Some(SymbolType::Line),
            "Fill" => Some(SymbolType::Fill),
            "Hybrid" => Some(SymbolType::Hybrid),
            _ => None,
        }
    }

    /// The symbol kind that draws geometries of this type.
    pub fn for_geometry(geometry_type: GeometryType) -> SymbolType {
        match geometry_type {
            GeometryType::Point => SymbolType::Marker,
            GeometryType::Line => SymbolType::Line,
            GeometryType::Polygon => SymbolType::Fill,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RenderHints: u32 {
        /// Marker sizes come from a data-defined size renderer
        const DATA_DEFINED_SIZE_SCALE = 1;
        /// Marker angles come from a data-defined rotation renderer
        const DATA_DEFINED_ROTATION = 2;
    }
}

/// Glyph drawn on each vertex when vertex markers are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexMarkerType {
    #[default]
    SemiTransparentCircle,
    Cross,
    NoMarker,
}

/// Per-call options for [`Symbol::render_feature`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Render only this layer; `None` renders all of them
    pub layer: Option<usize>,
    pub selected: bool,
    pub draw_vertex_marker: bool,
    pub vertex_marker_type: VertexMarkerType,
    /// Pixels
    pub vertex_marker_size: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            layer: None,
            selected: false,
            draw_vertex_marker: false,
            vertex_marker_type: VertexMarkerType::default(),
            vertex_marker_size: defaults::VERTEX_MARKER_SIZE,
        }
    }
}

#[derive(Debug)]
pub struct Symbol {
    symbol_type: SymbolType,
    layers: Vec<Box<dyn SymbolLayer>>,
    opacity: Opacity,
    render_hints: RenderHints,
    clip_features_to_extent: bool,
    /// Only meaningful between `start_render` and `stop_render`
    layer: Option<Weak<VectorLayer>>,
    render_pass_active: bool,
}

impl Clone for Symbol {
    fn clone(&self) -> Self {
        Symbol {
            symbol_type: self.symbol_type,
            layers: self.layers.iter().map(|l| l.clone_layer()).collect(),
            opacity: self.opacity,
            render_hints: self.render_hints,
            clip_features_to_extent: self.clip_features_to_extent,
            layer: self.layer.clone(),
            render_pass_active: false,
        }
    }
}

impl Symbol {
    /// A symbol of `symbol_type` holding the compatible subset of `layers`.
    pub fn new(symbol_type: SymbolType, layers: Vec<Box<dyn SymbolLayer>>) -> Self {
        let layers = layers
            .into_iter()
            .filter(|layer| {
                let ok = layer.is_compatible_with_symbol(symbol_type);
                if !ok {
                    warn!(layer_type = layer.layer_type(), ?symbol_type, "dropping incompatible layer");
                }
                ok
            })
            .collect();
        Symbol {
            symbol_type,
            layers,
            opacity: Opacity::OPAQUE,
            render_hints: RenderHints::empty(),
            clip_features_to_extent: true,
            layer: None,
            render_pass_active: false,
        }
    }

    fn with_default_layer(symbol_type: SymbolType, mut layers: Vec<Box<dyn SymbolLayer>>) -> Self {
        if layers.is_empty() {
            layers.push(default_layer(symbol_type));
        }
        Symbol::new(symbol_type, layers)
    }

    /// A marker symbol; an empty list gets a default simple marker.
    pub fn marker(layers: Vec<Box<dyn SymbolLayer>>) -> Self {
        Symbol::with_default_layer(SymbolType::Marker, layers)
    }

    /// A line symbol; an empty list gets a default simple line.
    pub fn line(layers: Vec<Box<dyn SymbolLayer>>) -> Self {
        Symbol::with_default_layer(SymbolType::Line, layers)
    }

    /// A fill symbol; an empty list gets a default simple fill.
    pub fn fill(layers: Vec<Box<dyn SymbolLayer>>) -> Self {
        Symbol::with_default_layer(SymbolType::Fill, layers)
    }

    /// A hybrid symbol; an empty list gets a pass-through geometry generator.
    pub fn hybrid(layers: Vec<Box<dyn SymbolLayer>>) -> Self {
        Symbol::with_default_layer(SymbolType::Hybrid, layers)
    }

    pub fn create_simple_marker(props: &PropertyMap) -> Self {
        Symbol::marker(vec![Box::new(SimpleMarkerLayer::create(props))])
    }

    pub fn create_simple_line(props: &PropertyMap) -> Self {
        Symbol::line(vec![Box::new(SimpleLineLayer::create(props))])
    }

    pub fn create_simple_fill(props: &PropertyMap) -> Self {
        Symbol::fill(vec![Box::new(SimpleFillLayer::create(props))])
    }

    /// Default symbol for drawing geometries of `geometry_type`.
    pub fn default_for(geometry_type: GeometryType) -> Self {
        Symbol::default_for_type(SymbolType::for_geometry(geometry_type))
    }

    pub fn default_for_type(symbol_type: SymbolType) -> Self {
        Symbol::with_default_layer(symbol_type, Vec::new())
    }

    pub fn symbol_type(&self) -> SymbolType {
        self.symbol_type
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    pub fn symbol_layer(&self, index: usize) -> Option<&dyn SymbolLayer> {
        self.layers.get(index).map(|l| l.as_ref())
    }

    pub fn symbol_layer_mut(&mut self, index: usize) -> Option<&mut (dyn SymbolLayer + 'static)> {
        self.layers.get_mut(index).map(|l| l.as_mut())
    }

    /// Layers in paint order.
    pub fn symbol_layers(&self) -> &[Box<dyn SymbolLayer>] {
        &self.layers
    }

    pub fn symbol_layer_count(&self) -> usize {
        self.layers.len()
    }

    fn check_compatible(&self, layer: &dyn SymbolLayer) -> Result<(), SymbolError> {
        if layer.is_compatible_with_symbol(self.symbol_type) {
            Ok(())
        } else {
            Err(SymbolError::IncompatibleLayer {
                layer_type: layer.layer_type().to_string(),
                symbol_type: self.symbol_type,
            })
        }
    }

    fn check_index(&self, index: usize, count: usize) -> Result<(), SymbolError> {
        if index < count {
            Ok(())
        } else {
            Err(SymbolError::LayerIndexOutOfRange {
                index,
                count: self.layers.len(),
            })
        }
    }

    /// Insert `layer` so it paints at position `index`. `index` may equal
    /// the layer count.
    pub fn insert_symbol_layer(&mut self, index: usize, layer: Box<dyn SymbolLayer>) -> Result<(), SymbolError> {
        self.check_index(index, self.layers.len() + 1)?;
        self.check_compatible(layer.as_ref())?;
        self.layers.insert(index, layer);
        Ok(())
    }

    pub fn append_symbol_layer(&mut self, layer: Box<dyn SymbolLayer>) -> Result<(), SymbolError> {
        self.check_compatible(layer.as_ref())?;
        self.layers.push(layer);
        Ok(())
    }

    /// Replace the layer at `index`, dropping the old one.
    pub fn change_symbol_layer(&mut self, index: usize, layer: Box<dyn SymbolLayer>) -> Result<(), SymbolError> {
        self.check_index(index, self.layers.len())?;
        self.check_compatible(layer.as_ref())?;
        self.layers[index] = layer;
        Ok(())
    }

    pub fn delete_symbol_layer(&mut self, index: usize) -> Result<(), SymbolError> {
        self.take_symbol_layer(index).map(drop)
    }

    /// Remove the layer at `index` and hand it to the caller.
    pub fn take_symbol_layer(&mut self, index: usize) -> Result<Box<dyn SymbolLayer>, SymbolError> {
        self.check_index(index, self.layers.len())?;
        Ok(self.layers.remove(index))
    }

    // ------------------------------------------------------------------
    // Render pass
    // ------------------------------------------------------------------

    fn symbol_context<'a, 'p>(
        &self,
        ctx: &'a mut RenderContext<'p>,
        selected: bool,
    ) -> SymbolRenderContext<'a, 'p> {
        SymbolRenderContext::new(ctx, self.output_unit(), self.opacity, selected, self.render_hints)
            .with_map_unit_scale(self.map_unit_scale())
    }

    /// Prepare every layer for a sequence of `render_feature` calls.
    pub fn start_render(&mut self, ctx: &mut RenderContext<'_>, fields: Option<&Fields>) -> Result<(), SymbolError> {
        if self.render_pass_active {
            return Err(SymbolError::RenderPassActive);
        }
        self.render_pass_active = true;

        let mut sctx = self.symbol_context(ctx, false).with_fields(fields);
        for layer in &mut self.layers {
            layer.start_render(&mut sctx);
        }
        Ok(())
    }

    /// Release per-pass state. Safe to call without a matching start.
    pub fn stop_render(&mut self, ctx: &mut RenderContext<'_>) {
        if !self.render_pass_active {
            debug!(symbol_type = ?self.symbol_type, "stop_render without an active pass");
        }
        let mut sctx = self.symbol_context(ctx, false);
        for layer in &mut self.layers {
            layer.stop_render(&mut sctx);
        }
        self.render_pass_active = false;
        self.layer = None;
    }

    pub fn is_render_pass_active(&self) -> bool {
        self.render_pass_active
    }

    /// Paint `feature` with the targeted layers.
    pub fn render_feature(&mut self, feature: &Feature, ctx: &mut RenderContext<'_>, options: RenderOptions) {
        let Some(geometry) = feature.geometry() else {
            return;
        };

        let scope = ExpressionScope::new(SYMBOL_SCOPE)
            .with_variable("geometry_part_count", geometry.part_count() as f64)
            .with_variable("geometry_part_num", 1.0)
            .with_variable("symbol_color", encode_color(self.color()));
        ctx.expression_context.push_scope(scope);
        self.render_geometry(geometry, feature, ctx, &options);
        ctx.expression_context.pop_scope();
    }

    fn render_geometry(
        &mut self,
        geometry: &Geometry,
        feature: &Feature,
        ctx: &mut RenderContext<'_>,
        options: &RenderOptions,
    ) {
        if self.symbol_type == SymbolType::Hybrid {
            let targets = self.target_layers(options.layer);
            let mut sctx = self.symbol_context(ctx, options.selected).with_feature(Some(feature));
            for layer in &mut self.layers[targets] {
                Symbol::render_using_layer(layer.as_mut(), &mut sctx);
            }
            return;
        }

        let clipped;
        let geometry = match ctx.extent {
            Some(extent) if self.clip_features_to_extent => match clip_geometry(geometry, &extent) {
                Some(g) => {
                    clipped = g;
                    &clipped
                }
                None => return,
            },
            _ => geometry,
        };

        let map_to_pixel = ctx.map_to_pixel;
        let pixels = geometry.map_points(|p| map_to_pixel.transform(p));

        match (&pixels, self.symbol_type) {
            (Geometry::Point(p), SymbolType::Marker) => {
                self.render_part(LayerGeometry::Point(*p), 1, feature, ctx, options);
            }
            (Geometry::MultiPoint(points), SymbolType::Marker) => {
                for (i, p) in points.iter().enumerate() {
                    self.render_part(LayerGeometry::Point(*p), i + 1, feature, ctx, options);
                }
            }
            (Geometry::LineString(points), SymbolType::Line) => {
                self.render_part(LayerGeometry::Polyline(points), 1, feature, ctx, options);
            }
            (Geometry::MultiLineString(lines), SymbolType::Line) => {
                for (i, points) in lines.iter().enumerate() {
                    self.render_part(LayerGeometry::Polyline(points), i + 1, feature, ctx, options);
                }
            }
            (Geometry::Polygon(poly), SymbolType::Fill) => {
                let part = LayerGeometry::Polygon {
                    exterior: &poly.exterior,
                    holes: &poly.interiors,
                };
                self.render_part(part, 1, feature, ctx, options);
            }
            (Geometry::MultiPolygon(polys), SymbolType::Fill) => {
                for (i, poly) in polys.iter().enumerate() {
                    let part = LayerGeometry::Polygon {
                        exterior: &poly.exterior,
                        holes: &poly.interiors,
                    };
                    self.render_part(part, i + 1, feature, ctx, options);
                }
            }
            (_other, _symbol_type) => {
                debug!(
                    geometry_type = ?_other.geometry_type(),
                    symbol_type = ?_symbol_type,
                    "geometry does not match symbol type"
                );
                return;
            }
        }

        if options.draw_vertex_marker {
            draw_vertex_markers(&pixels, ctx, options);
        }
    }

    /// Render one geometry part. Layers not of this symbol's own kind draw
    /// their own geometry, so they only run for the first part.
    fn render_part(
        &mut self,
        geometry: LayerGeometry<'_>,
        part_num: usize,
        feature: &Feature,
        ctx: &mut RenderContext<'_>,
        options: &RenderOptions,
    ) {
        if let Some(scope) = ctx.expression_context.last_scope_mut() {
            scope.set_variable("geometry_part_num", part_num as f64);
        }
        let symbol_type = self.symbol_type;
        let targets = self.target_layers(options.layer);
        let mut sctx = self
            .symbol_context(ctx, options.selected)
            .with_feature(Some(feature))
            .with_fields(Some(feature.fields()));
        for layer in &mut self.layers[targets] {
            let own = layer.symbol_type();
            if own == symbol_type || (own == SymbolType::Line && symbol_type == SymbolType::Fill) {
                layer.render(geometry, &mut sctx);
            } else if part_num == 1 {
                Symbol::render_using_layer(layer.as_mut(), &mut sctx);
            }
        }
    }

    /// Render a layer that produces its own geometry, such as a generator.
    pub fn render_using_layer(layer: &mut dyn SymbolLayer, ctx: &mut SymbolRenderContext<'_, '_>) {
        layer.render(LayerGeometry::None, ctx);
    }

    fn target_layers(&self, layer: Option<usize>) -> std::ops::Range<usize> {
        match layer {
            None => 0..self.layers.len(),
            Some(index) if index < self.layers.len() => index..index + 1,
            Some(_index) => {
                debug!(index = _index, count = self.layers.len(), "render layer index out of range");
                0..0
            }
        }
    }

    /// Draw every layer's preview glyph into a `size` box at the origin.
    pub fn draw_preview_icon(&mut self, ctx: &mut RenderContext<'_>, size: DVec2) {
        let mut sctx = self.symbol_context(ctx, false);
        for layer in &mut self.layers {
            layer.draw_preview_icon(&mut sctx, size);
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Attribute names read by any layer or embedded expression.
    pub fn used_attributes(&self) -> BTreeSet<String> {
        self.layers.iter().flat_map(|l| l.used_attributes()).collect()
    }

    pub fn has_data_defined_properties(&self) -> bool {
        self.layers.iter().any(|l| l.data_defined().has_active())
    }

    pub fn opacity(&self) -> f64 {
        self.opacity.raw()
    }

    /// Set the opacity, clamped to 0..=1.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = Opacity::clamped(opacity);
    }

    /// The unit shared by every layer, Mixed if they disagree.
    pub fn output_unit(&self) -> OutputUnit {
        let units: Vec<OutputUnit> = self.layers.iter().map(|l| l.output_unit()).collect();
        common_unit(&units)
    }

    pub fn set_output_unit(&mut self, unit: OutputUnit) {
        for layer in &mut self.layers {
            layer.set_output_unit(unit);
        }
    }

    /// The map unit scale shared by every layer, default if they disagree.
    pub fn map_unit_scale(&self) -> MapUnitScale {
        let mut scales = self.layers.iter().map(|l| l.map_unit_scale());
        match scales.next() {
            Some(first) if scales.all(|s| s == first) => first,
            _ => MapUnitScale::default(),
        }
    }

    pub fn set_map_unit_scale(&mut self, scale: MapUnitScale) {
        for layer in &mut self.layers {
            layer.set_map_unit_scale(scale);
        }
    }

    pub fn render_hints(&self) -> RenderHints {
        self.render_hints
    }

    pub fn set_render_hints(&mut self, hints: RenderHints) {
        self.render_hints = hints;
    }

    pub fn clip_features_to_extent(&self) -> bool {
        self.clip_features_to_extent
    }

    pub fn set_clip_features_to_extent(&mut self, clip: bool) {
        self.clip_features_to_extent = clip;
    }

    /// The vector layer being rendered, while a pass is active.
    pub fn layer(&self) -> Option<&Weak<VectorLayer>> {
        self.layer.as_ref()
    }

    pub fn set_layer(&mut self, layer: Option<Weak<VectorLayer>>) {
        self.layer = layer;
    }

    /// Color of the first layer.
    pub fn color(&self) -> Color {
        self.layers.first().map_or(Color::BLACK, |l| l.color())
    }

    pub fn set_color(&mut self, color: Color) {
        for layer in &mut self.layers {
            layer.set_color(color);
        }
    }

    /// One-line description, e.g. `FILL SYMBOL (1 layers) color 0,0,255,255`.
    pub fn dump(&self) -> String {
        format!(
            "{} SYMBOL ({} layers) color {}",
            self.symbol_type.name().to_uppercase(),
            self.layers.len(),
            self.color()
        )
    }

    // ------------------------------------------------------------------
    // Marker symbols
    // ------------------------------------------------------------------

    fn marker_layers(&self) -> impl Iterator<Item = &dyn MarkerLayer> {
        self.layers.iter().filter_map(|l| l.as_marker())
    }

    fn marker_layers_mut(&mut self) -> impl Iterator<Item = &mut dyn MarkerLayer> {
        self.layers.iter_mut().filter_map(|l| l.as_marker_mut())
    }

    /// Marker rotation: the first marker layer's angle.
    pub fn angle(&self) -> f64 {
        self.marker_layers().next().map_or(0.0, |l| l.angle())
    }

    /// Rotate the symbol. Marker layers keep their offsets relative to the
    /// symbol angle; fill layers take `angle` directly.
    pub fn set_angle(&mut self, angle: f64) {
        if self.symbol_type == SymbolType::Fill {
            for layer in self.layers.iter_mut().filter_map(|l| l.as_fill_mut()) {
                layer.set_angle(angle);
            }
            return;
        }
        let delta = angle - self.angle();
        for layer in self.marker_layers_mut() {
            let current = layer.angle();
            layer.set_angle(current + delta);
        }
    }

    pub fn set_line_angle(&mut self, angle: f64) {
        for layer in self.marker_layers_mut() {
            layer.set_line_angle(angle);
        }
    }

    /// Marker size: the largest marker layer size.
    pub fn size(&self) -> f64 {
        self.marker_layers().map(|l| l.size()).fold(0.0, f64::max)
    }

    /// Resize the symbol, scaling smaller layers proportionally.
    pub fn set_size(&mut self, size: f64) {
        let orig = self.size();
        for layer in self.marker_layers_mut() {
            let current = layer.size();
            if current == orig {
                layer.set_size(size);
            } else if orig != 0.0 {
                layer.set_size(current * size / orig);
            }
        }
    }

    pub fn scale_method(&self) -> ScaleMethod {
        self.marker_layers().next().map(|l| l.scale_method()).unwrap_or_default()
    }

    pub fn set_scale_method(&mut self, method: ScaleMethod) {
        for layer in self.marker_layers_mut() {
            layer.set_scale_method(method);
        }
    }

    /// The data-defined angle applied en masse, if every marker layer
    /// carries it (offset by its own angle).
    pub fn data_defined_angle(&self) -> Option<DataDefined> {
        let base = self.angle();
        let layers: Vec<(f64, Option<&DataDefined>)> = self
            .layers
            .iter()
            .filter_map(|l| Some((l.as_marker()?.angle(), l.data_defined().get("angle"))))
            .collect();
        en_masse(&layers, base, |dd, angle| offset_expression(dd, angle - base))
    }

    /// Apply `dd` as the angle override of every marker layer, or clear it.
    pub fn set_data_defined_angle(&mut self, dd: Option<DataDefined>) {
        let base = self.angle();
        for layer in self.layers.iter_mut() {
            let Some(angle) = layer.as_marker().map(|m| m.angle()) else {
                continue;
            };
            let dd = dd.as_ref().map(|dd| offset_expression(dd, angle - base));
            apply_data_defined(layer.data_defined_mut(), "angle", dd);
        }
    }

    /// The data-defined size applied en masse, if every marker layer
    /// carries it (scaled by its own size).
    pub fn data_defined_size(&self) -> Option<DataDefined> {
        let base = self.size();
        let layers: Vec<(f64, Option<&DataDefined>)> = self
            .layers
            .iter()
            .filter_map(|l| Some((l.as_marker()?.size(), l.data_defined().get("size"))))
            .collect();
        en_masse(&layers, base, |dd, size| scaled_expression(dd, size, base))
    }

    pub fn set_data_defined_size(&mut self, dd: Option<DataDefined>) {
        let base = self.size();
        for layer in self.layers.iter_mut() {
            let Some(size) = layer.as_marker().map(|m| m.size()) else {
                continue;
            };
            let dd = dd.as_ref().map(|dd| scaled_expression(dd, size, base));
            apply_data_defined(layer.data_defined_mut(), "size", dd);
        }
    }

    // ------------------------------------------------------------------
    // Line symbols
    // ------------------------------------------------------------------

    /// Line width: the largest line layer width.
    pub fn width(&self) -> f64 {
        self.layers
            .iter()
            .filter_map(|l| l.as_line())
            .map(|l| l.width())
            .fold(0.0, f64::max)
    }

    /// Set the width, scaling thinner layers proportionally.
    pub fn set_width(&mut self, width: f64) {
        let orig = self.width();
        for layer in self.layers.iter_mut().filter_map(|l| l.as_line_mut()) {
            let current = layer.width();
            if current == orig {
                layer.set_width(width);
            } else if orig != 0.0 {
                layer.set_width(current * width / orig);
            }
        }
    }

    pub fn data_defined_width(&self) -> Option<DataDefined> {
        let base = self.width();
        let layers: Vec<(f64, Option<&DataDefined>)> = self
            .layers
            .iter()
            .filter_map(|l| Some((l.as_line()?.width(), l.data_defined().get("width"))))
            .collect();
        en_masse(&layers, base, |dd, width| scaled_expression(dd, width, base))
    }

    pub fn set_data_defined_width(&mut self, dd: Option<DataDefined>) {
        let base = self.width();
        for layer in self.layers.iter_mut() {
            let Some(width) = layer.as_line().map(|l| l.width()) else {
                continue;
            };
            let dd = dd.as_ref().map(|dd| scaled_expression(dd, width, base));
            apply_data_defined(layer.data_defined_mut(), "width", dd);
        }
    }
}

fn default_layer(symbol_type: SymbolType) -> Box<dyn SymbolLayer> {
    match symbol_type {
        SymbolType::Marker => Box::new(SimpleMarkerLayer::default()),
        SymbolType::Line => Box::new(SimpleLineLayer::default()),
        SymbolType::Fill => Box::new(SimpleFillLayer::default()),
        SymbolType::Hybrid => Box::new(GeometryGeneratorLayer::default()),
    }
}

/// Find the override set on the layer whose value equals `base`, then
/// check every other layer carries the matching derived override.
fn en_masse(
    layers: &[(f64, Option<&DataDefined>)],
    base: f64,
    derive: impl Fn(&DataDefined, f64) -> DataDefined,
) -> Option<DataDefined> {
    let symbol_dd = layers
        .iter()
        .find(|(value, dd)| *value == base && dd.is_some())
        .and_then(|(_, dd)| *dd)?;
    let consistent = layers.iter().all(|(value, dd)| match dd {
        Some(dd) if *value == base => *dd == symbol_dd,
        Some(dd) => **dd == derive(symbol_dd, *value),
        None => false,
    });
    consistent.then(|| symbol_dd.clone())
}

fn offset_expression(dd: &DataDefined, offset: f64) -> DataDefined {
    if offset == 0.0 {
        return dd.clone();
    }
    DataDefined::new(&format!("({}) + {}", dd.expression_text(), offset)).with_active(dd.is_active())
}

fn scaled_expression(dd: &DataDefined, value: f64, base: f64) -> DataDefined {
    if value == base || base == 0.0 {
        return dd.clone();
    }
    DataDefined::new(&format!("({}) * {}", dd.expression_text(), value / base)).with_active(dd.is_active())
}

fn apply_data_defined(props: &mut DataDefinedProperties, name: &str, dd: Option<DataDefined>) {
    match dd {
        Some(dd) => props.set(name, dd),
        None => {
            props.remove(name);
        }
    }
}

fn draw_vertex_markers(geometry: &Geometry, ctx: &mut RenderContext<'_>, options: &RenderOptions) {
    let (shape, fill, outline) = match options.vertex_marker_type {
        VertexMarkerType::SemiTransparentCircle => (
            MarkerShape::Circle,
            Color::rgba(255, 0, 0, 100),
            Pen::new(Color::rgba(255, 0, 0, 100), Px(1.0)),
        ),
        VertexMarkerType::Cross => (MarkerShape::Cross, Color::TRANSPARENT, Pen::new(Color::RED, Px(1.0))),
        VertexMarkerType::NoMarker => return,
    };
    for center in geometry.vertices() {
        ctx.painter().draw_marker(&MarkerPrimitive {
            shape,
            center,
            size: Px(options.vertex_marker_size),
            angle: 0.0,
            fill,
            outline,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::render::{DrawCommand, RecordingPainter};
    use crate::types::Rect;
    use glam::dvec2;

    fn marker_layer(size: f64, angle: f64) -> Box<dyn SymbolLayer> {
        Box::new(SimpleMarkerLayer::new(MarkerShape::Circle, size, angle))
    }

    #[test]
    fn incompatible_layers_are_rejected() {
        let mut symbol = Symbol::marker(Vec::new());
        let err = symbol
            .append_symbol_layer(Box::new(SimpleLineLayer::default()))
            .unwrap_err();
        assert_eq!(
            err,
            SymbolError::IncompatibleLayer {
                layer_type: "SimpleLine".into(),
                symbol_type: SymbolType::Marker
            }
        );
        assert_eq!(symbol.symbol_layer_count(), 1);

        let mut fill = Symbol::fill(Vec::new());
        fill.append_symbol_layer(Box::new(SimpleLineLayer::default())).unwrap();
        fill.append_symbol_layer(Box::new(GeometryGeneratorLayer::default())).unwrap();
        assert_eq!(fill.symbol_layer_count(), 3);
    }

    #[test]
    fn new_drops_incompatible_layers() {
        let symbol = Symbol::new(
            SymbolType::Line,
            vec![Box::new(SimpleFillLayer::default()), Box::new(SimpleLineLayer::default())],
        );
        assert_eq!(symbol.symbol_layer_count(), 1);
        assert_eq!(symbol.symbol_layer(0).map(|l| l.layer_type()), Some("SimpleLine"));
    }

    #[test]
    fn index_errors_leave_layers_unchanged() {
        let mut symbol = Symbol::line(Vec::new());
        assert_eq!(
            symbol.insert_symbol_layer(3, Box::new(SimpleLineLayer::default())),
            Err(SymbolError::LayerIndexOutOfRange { index: 3, count: 1 })
        );
        assert!(symbol.change_symbol_layer(1, Box::new(SimpleLineLayer::default())).is_err());
        assert!(symbol.take_symbol_layer(1).is_err());
        assert_eq!(symbol.symbol_layer_count(), 1);
        symbol.insert_symbol_layer(1, Box::new(SimpleLineLayer::default())).unwrap();
        assert_eq!(symbol.symbol_layer_count(), 2);
    }

    #[test]
    fn start_render_twice_is_an_error() {
        let mut painter = RecordingPainter::new();
        let mut ctx = RenderContext::new(&mut painter);
        let mut symbol = Symbol::marker(Vec::new());
        symbol.start_render(&mut ctx, None).unwrap();
        assert_eq!(symbol.start_render(&mut ctx, None), Err(SymbolError::RenderPassActive));
        symbol.stop_render(&mut ctx);
        assert!(!symbol.is_render_pass_active());
        symbol.start_render(&mut ctx, None).unwrap();
        symbol.stop_render(&mut ctx);
        // stop without start is tolerated
        symbol.stop_render(&mut ctx);
    }

    #[test]
    fn stop_render_clears_layer_reference() {
        let layer = Arc::new(VectorLayer::new("l1", "roads", Arc::new(Fields::default())));
        let mut painter = RecordingPainter::new();
        let mut ctx = RenderContext::new(&mut painter);
        let mut symbol = Symbol::line(Vec::new());
        symbol.set_layer(Some(Arc::downgrade(&layer)));
        symbol.start_render(&mut ctx, None).unwrap();
        assert!(symbol.layer().and_then(Weak::upgrade).is_some());
        symbol.stop_render(&mut ctx);
        assert!(symbol.layer().is_none());
    }

    #[test]
    fn mismatched_geometry_is_skipped() {
        let mut painter = RecordingPainter::new();
        {
            let mut ctx = RenderContext::new(&mut painter);
            let mut symbol = Symbol::marker(Vec::new());
            let feature = Feature::from_geometry(1, Geometry::line_string([(0.0, 0.0), (1.0, 1.0)]));
            symbol.render_feature(&feature, &mut ctx, RenderOptions::default());
        }
        assert!(painter.is_empty());
    }

    #[test]
    fn multipoint_renders_each_part() {
        let mut painter = RecordingPainter::new();
        {
            let mut ctx = RenderContext::new(&mut painter);
            let mut symbol = Symbol::marker(Vec::new());
            let feature = Feature::from_geometry(
                1,
                Geometry::MultiPoint(vec![dvec2(1.0, -1.0), dvec2(2.0, -2.0)]),
            );
            symbol.render_feature(&feature, &mut ctx, RenderOptions::default());
            assert_eq!(ctx.expression_context.scope_count(), 0);
        }
        let centers: Vec<DVec2> = painter
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Marker(m) => Some(m.center),
                _ => None,
            })
            .collect();
        assert_eq!(centers, vec![dvec2(1.0, 1.0), dvec2(2.0, 2.0)]);
    }

    #[test]
    fn polygons_outside_extent_are_culled() {
        let mut painter = RecordingPainter::new();
        {
            let mut ctx = RenderContext::new(&mut painter).with_extent(Rect::new(dvec2(0.0, 0.0), dvec2(10.0, 10.0)));
            let mut symbol = Symbol::fill(Vec::new());
            let far = Geometry::polygon([(20.0, 20.0), (30.0, 20.0), (30.0, 30.0)]);
            symbol.render_feature(&Feature::from_geometry(1, far.clone()), &mut ctx, RenderOptions::default());
            symbol.set_clip_features_to_extent(false);
            symbol.render_feature(&Feature::from_geometry(2, far), &mut ctx, RenderOptions::default());
        }
        assert_eq!(painter.len(), 1);
    }

    #[test]
    fn single_layer_option_renders_only_that_layer() {
        let mut painter = RecordingPainter::new();
        {
            let mut ctx = RenderContext::new(&mut painter);
            let mut symbol = Symbol::marker(vec![marker_layer(1.0, 0.0), marker_layer(2.0, 0.0)]);
            let feature = Feature::from_geometry(1, Geometry::point(0.0, 0.0));
            let options = RenderOptions {
                layer: Some(1),
                ..RenderOptions::default()
            };
            symbol.render_feature(&feature, &mut ctx, options);
            let options = RenderOptions {
                layer: Some(5),
                ..RenderOptions::default()
            };
            symbol.render_feature(&feature, &mut ctx, options);
        }
        assert_eq!(painter.len(), 1);
    }

    #[test]
    fn vertex_markers_follow_layers() {
        let mut painter = RecordingPainter::new();
        {
            let mut ctx = RenderContext::new(&mut painter);
            let mut symbol = Symbol::line(Vec::new());
            let feature = Feature::from_geometry(1, Geometry::line_string([(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)]));
            let options = RenderOptions {
                draw_vertex_marker: true,
                vertex_marker_type: VertexMarkerType::Cross,
                ..RenderOptions::default()
            };
            symbol.render_feature(&feature, &mut ctx, options);
        }
        let commands = painter.commands();
        assert_eq!(commands.len(), 4);
        assert!(matches!(commands[0], DrawCommand::Polyline { .. }));
        assert!(
            commands[1..]
                .iter()
                .all(|c| matches!(c, DrawCommand::Marker(m) if m.shape == MarkerShape::Cross))
        );
    }

    #[test]
    fn marker_size_and_angle_apply_proportionally() {
        let mut symbol = Symbol::marker(vec![marker_layer(4.0, 10.0), marker_layer(2.0, 40.0)]);
        assert_eq!(symbol.size(), 4.0);
        assert_eq!(symbol.angle(), 10.0);

        symbol.set_size(8.0);
        symbol.set_angle(20.0);
        let layers: Vec<(f64, f64)> = symbol
            .symbol_layers()
            .iter()
            .filter_map(|l| l.as_marker())
            .map(|m| (m.size(), m.angle()))
            .collect();
        assert_eq!(layers, vec![(8.0, 20.0), (4.0, 50.0)]);
    }

    #[test]
    fn data_defined_angle_round_trips_with_offsets() {
        let mut symbol = Symbol::marker(vec![marker_layer(2.0, 0.0), marker_layer(2.0, 90.0)]);
        assert_eq!(symbol.data_defined_angle(), None);

        symbol.set_data_defined_angle(Some(DataDefined::new("\"heading\"")));
        assert_eq!(
            symbol.symbol_layer(1).and_then(|l| l.data_defined().get("angle")).map(|d| d.expression_text()),
            Some("(\"heading\") + 90")
        );
        assert_eq!(symbol.data_defined_angle(), Some(DataDefined::new("\"heading\"")));
        assert!(symbol.used_attributes().contains("heading"));
        assert!(symbol.has_data_defined_properties());

        symbol.set_data_defined_angle(None);
        assert!(!symbol.has_data_defined_properties());
    }

    #[test]
    fn data_defined_width_scales_thinner_layers() {
        let mut symbol = Symbol::line(vec![
            Box::new(SimpleLineLayer::new(Color::BLACK, 2.0, Default::default())),
            Box::new(SimpleLineLayer::new(Color::WHITE, 1.0, Default::default())),
        ]);
        symbol.set_data_defined_width(Some(DataDefined::new("lanes")));
        assert_eq!(
            symbol.symbol_layer(1).and_then(|l| l.data_defined().get("width")).map(|d| d.expression_text()),
            Some("(lanes) * 0.5")
        );
        assert_eq!(symbol.data_defined_width(), Some(DataDefined::new("lanes")));

        symbol.set_width(4.0);
        assert_eq!(symbol.width(), 4.0);
        assert_eq!(symbol.symbol_layer(1).and_then(|l| l.as_line()).map(|l| l.width()), Some(2.0));
    }

    #[test]
    fn output_unit_reports_mixed() {
        let mut symbol = Symbol::marker(vec![marker_layer(1.0, 0.0), marker_layer(2.0, 0.0)]);
        assert_eq!(symbol.output_unit(), OutputUnit::Millimeter);
        if let Some(layer) = symbol.symbol_layer_mut(1) {
            layer.set_output_unit(OutputUnit::Pixel);
        }
        assert_eq!(symbol.output_unit(), OutputUnit::Mixed);
        symbol.set_output_unit(OutputUnit::MapUnit);
        assert_eq!(symbol.output_unit(), OutputUnit::MapUnit);
    }

    #[test]
    fn opacity_is_clamped() {
        let mut symbol = Symbol::fill(Vec::new());
        symbol.set_opacity(1.5);
        assert_eq!(symbol.opacity(), 1.0);
        symbol.set_opacity(-1.0);
        assert_eq!(symbol.opacity(), 0.0);
    }

    #[test]
    fn dump_names_kind_and_color() {
        let mut symbol = Symbol::fill(Vec::new());
        symbol.set_color(Color::rgb(1, 2, 3));
        assert_eq!(symbol.dump(), "FILL SYMBOL (1 layers) color 1,2,3,255");
        assert_eq!(
            Symbol::hybrid(Vec::new()).dump(),
            "HYBRID SYMBOL (1 layers) color 0,0,255,255"
        );
    }

    #[test]
    fn symbol_type_names() {
        for kind in [SymbolType::Marker, SymbolType::Line, SymbolType::Fill, SymbolType::Hybrid] {
            assert_eq!(SymbolType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(Symbol::default_for(GeometryType::Line).symbol_type(), SymbolType::Line);
    }
}
