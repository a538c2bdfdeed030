//! Per-symbol render state handed to each symbol layer

use crate::expression::{ExpressionContext, Value};
use crate::feature::{Feature, Fields};
use crate::symbol::RenderHints;
use crate::types::{Color, MapUnitScale, OutputUnit, Opacity, Px};

use super::context::RenderContext;

/// Variable holding the undefined value of a data-defined property.
pub const ORIGINAL_VALUE_VARIABLE: &str = "value";

/// Scratch state for one symbol render call.
///
/// Borrowed pieces (feature, fields) are only valid for the duration of
/// the call that built the context.
pub struct SymbolRenderContext<'a, 'p> {
    render: &'a mut RenderContext<'p>,
    feature: Option<&'a Feature>,
    fields: Option<&'a Fields>,
    opacity: Opacity,
    selected: bool,
    render_hints: RenderHints,
    output_unit: OutputUnit,
    map_unit_scale: MapUnitScale,
}

impl<'a, 'p> SymbolRenderContext<'a, 'p> {
    pub fn new(
        render: &'a mut RenderContext<'p>,
        output_unit: OutputUnit,
        opacity: Opacity,
        selected: bool,
        render_hints: RenderHints,
    ) -> Self {
        SymbolRenderContext {
            render,
            feature: None,
            fields: None,
            opacity,
            selected,
            render_hints,
            output_unit,
            map_unit_scale: MapUnitScale::default(),
        }
    }

    pub fn with_feature(mut self, feature: Option<&'a Feature>) -> Self {
        self.feature = feature;
        self
    }

    pub fn with_fields(mut self, fields: Option<&'a Fields>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_map_unit_scale(mut self, scale: MapUnitScale) -> Self {
        self.map_unit_scale = scale;
        self
    }

    pub fn render_context(&self) -> &RenderContext<'p> {
        &*self.render
    }

    pub fn render_context_mut(&mut self) -> &mut RenderContext<'p> {
        &mut *self.render
    }

    /// The feature being rendered; `None` for previews and icons.
    pub fn feature(&self) -> Option<&'a Feature> {
        self.feature
    }

    pub fn set_feature(&mut self, feature: Option<&'a Feature>) {
        self.feature = feature;
    }

    /// Field schema, only known between start and stop of a render pass.
    pub fn fields(&self) -> Option<&'a Fields> {
        self.fields
    }

    pub fn opacity(&self) -> Opacity {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: Opacity) {
        self.opacity = opacity;
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn render_hints(&self) -> RenderHints {
        self.render_hints
    }

    pub fn set_render_hints(&mut self, hints: RenderHints) {
        self.render_hints = hints;
    }

    pub fn output_unit(&self) -> OutputUnit {
        self.output_unit
    }

    pub fn set_output_unit(&mut self, unit: OutputUnit) {
        self.output_unit = unit;
    }

    pub fn map_unit_scale(&self) -> MapUnitScale {
        self.map_unit_scale
    }

    pub fn set_map_unit_scale(&mut self, scale: MapUnitScale) {
        self.map_unit_scale = scale;
    }

    pub fn expression_context(&self) -> &ExpressionContext {
        &self.render.expression_context
    }

    pub fn expression_context_mut(&mut self) -> &mut ExpressionContext {
        &mut self.render.expression_context
    }

    /// Bind the value a data-defined override replaces, as `@value`.
    pub fn set_original_value_variable(&mut self, value: impl Into<Value>) {
        self.render
            .expression_context
            .set_variable(ORIGINAL_VALUE_VARIABLE, value);
    }

    /// Line width in the symbol's output unit, converted to pixels.
    pub fn output_line_width(&self, width: f64) -> Px {
        Px(self
            .render
            .convert_to_painter_units(width, self.output_unit, &self.map_unit_scale))
    }

    /// Size in the symbol's output unit, converted to pixels.
    pub fn output_pixel_size(&self, size: f64) -> f64 {
        self.render
            .convert_to_painter_units(size, self.output_unit, &self.map_unit_scale)
    }

    /// Convert a layer value in its own unit and scale to pixels.
    pub fn to_pixels(&self, value: f64, unit: OutputUnit, scale: &MapUnitScale) -> f64 {
        self.render.convert_to_painter_units(value, unit, scale)
    }

    /// Apply the symbol opacity.
    pub fn apply_opacity(&self, color: Color) -> Color {
        color.with_opacity(self.opacity)
    }

    /// Apply the symbol opacity, or swap in the selection color.
    pub fn paint_color(&self, color: Color) -> Color {
        let base = if self.selected {
            self.render.selection_color
        } else {
            color
        };
        base.with_opacity(self.opacity)
    }
}
