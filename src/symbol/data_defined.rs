//! Data-defined property overrides
//!
//! A layer property (size, angle, color, ...) can be overridden per
//! feature by an expression. The expression sees the undefined value as
//! `@value`; a NULL result or an evaluation error keeps that value.

use std::collections::{BTreeMap, BTreeSet};

use crate::expression::{Expression, Value};
use crate::log::debug;
use crate::render::SymbolRenderContext;
use crate::types::Color;

use super::props::{PropertyMap, decode_color, encode_color};

const EXPRESSION_SUFFIX: &str = "_dd_expression";
const ACTIVE_SUFFIX: &str = "_dd_active";

/// One expression override.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDefined {
    expression: Expression,
    active: bool,
}

impl DataDefined {
    pub fn new(expression: &str) -> Self {
        DataDefined {
            expression: Expression::new(expression),
            active: true,
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn expression_text(&self) -> &str {
        self.expression.text()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Evaluate the override with `base` bound as the original value.
    pub fn evaluate(&self, ctx: &mut SymbolRenderContext<'_, '_>, base: Value) -> Value {
        if !self.active {
            return base;
        }
        ctx.set_original_value_variable(base.clone());
        match self.expression.evaluate(ctx.expression_context(), ctx.feature()) {
            Ok(Value::Null) => base,
            Ok(value) => value,
            Err(_err) => {
                debug!(expression = self.expression.text(), error = %_err, "data-defined override failed");
                base
            }
        }
    }
}

/// The overrides of one symbol layer, keyed by property name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataDefinedProperties {
    properties: BTreeMap<String, DataDefined>,
}

impl DataDefinedProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&DataDefined> {
        self.properties.get(name)
    }

    pub fn set(&mut self, name: &str, dd: DataDefined) {
        self.properties.insert(name.to_string(), dd);
    }

    pub fn remove(&mut self, name: &str) -> Option<DataDefined> {
        self.properties.remove(name)
    }

    pub fn clear(&mut self) {
        self.properties.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.get(name).is_some_and(DataDefined::is_active)
    }

    pub fn has_active(&self) -> bool {
        self.properties.values().any(DataDefined::is_active)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataDefined)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Columns read by the active overrides.
    pub fn referenced_columns(&self) -> BTreeSet<String> {
        self.properties
            .values()
            .filter(|dd| dd.is_active())
            .flat_map(|dd| dd.expression.referenced_columns())
            .collect()
    }

    pub fn write_properties(&self, props: &mut PropertyMap) {
        for (name, dd) in &self.properties {
            props.insert(format!("{name}{EXPRESSION_SUFFIX}"), dd.expression_text().to_string());
            props.insert(
                format!("{name}{ACTIVE_SUFFIX}"),
                if dd.active { "1" } else { "0" }.to_string(),
            );
        }
    }

    /// Collect every `<name>_dd_expression` entry; a missing active flag
    /// means active.
    pub fn read_properties(props: &PropertyMap) -> Self {
        let mut out = DataDefinedProperties::new();
        for (key, text) in props {
            let Some(name) = key.strip_suffix(EXPRESSION_SUFFIX) else {
                continue;
            };
            let active = props
                .get(&format!("{name}{ACTIVE_SUFFIX}"))
                .is_none_or(|v| v == "1");
            out.set(name, DataDefined::new(text).with_active(active));
        }
        out
    }

    /// Numeric property value for the current feature.
    pub fn number(&self, name: &str, ctx: &mut SymbolRenderContext<'_, '_>, base: f64) -> f64 {
        match self.get(name) {
            Some(dd) => dd.evaluate(ctx, Value::Number(base)).to_number().unwrap_or(base),
            None => base,
        }
    }

    /// Color property value for the current feature.
    pub fn color(&self, name: &str, ctx: &mut SymbolRenderContext<'_, '_>, base: Color) -> Color {
        let Some(dd) = self.get(name) else {
            return base;
        };
        match dd.evaluate(ctx, Value::String(encode_color(base))) {
            Value::String(s) => decode_color(&s).unwrap_or(base),
            _ => base,
        }
    }
}
