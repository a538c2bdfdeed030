//! Styling expressions
//!
//! A small expression language over feature attributes, feature geometry
//! and context variables. Expressions keep their source text; a parse
//! failure is stored rather than raised so a symbol can hold an invalid
//! expression and report it later, the way a styling dialog would.

mod ast;
mod context;
mod eval;
mod functions;
mod parse;
mod value;

use std::collections::BTreeSet;
use std::fmt;

pub use ast::{BinaryOp, Expr, FeatureVar, FunctionCall, UnaryOp};
pub use context::{ExpressionContext, ExpressionScope};
pub use functions::{Arity, Function};
pub use parse::parse;
pub use value::Value;

use crate::errors::{EvalError, ParseError};
use crate::feature::{Feature, Fields};

/// Expression text together with its parsed form.
#[derive(Debug)]
pub struct Expression {
    text: String,
    parsed: Result<Expr, ParseError>,
}

impl Expression {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let parsed = parse(&text);
        Expression { text, parsed }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_parser_error(&self) -> bool {
        self.parsed.is_err()
    }

    pub fn parser_error(&self) -> Option<&ParseError> {
        self.parsed.as_ref().err()
    }

    pub fn root(&self) -> Option<&Expr> {
        self.parsed.as_ref().ok()
    }

    /// Attribute names the expression reads. Empty when it failed to parse.
    pub fn referenced_columns(&self) -> BTreeSet<String> {
        let mut columns = BTreeSet::new();
        if let Ok(root) = &self.parsed {
            root.walk(&mut |node| {
                if let Expr::Column(name) = node {
                    columns.insert(name.clone());
                }
            });
        }
        columns
    }

    /// Whether evaluation reads the feature geometry.
    pub fn needs_geometry(&self) -> bool {
        let mut needs = false;
        if let Ok(root) = &self.parsed {
            root.walk(&mut |node| {
                if let Expr::Feature(var) = node {
                    needs |= var.needs_geometry();
                }
            });
        }
        needs
    }

    /// Check the expression against the fields it will be evaluated with.
    pub fn prepare(&self, _ctx: &ExpressionContext, fields: &Fields) -> Result<(), EvalError> {
        self.root().ok_or_else(|| self.parse_failure())?;
        match self.referenced_columns().into_iter().find(|c| !fields.contains(c)) {
            Some(name) => Err(EvalError::UnknownColumn { name }),
            None => Ok(()),
        }
    }

    pub fn evaluate(&self, ctx: &ExpressionContext, feature: Option<&Feature>) -> Result<Value, EvalError> {
        let root = self.root().ok_or_else(|| self.parse_failure())?;
        eval::eval_expr(root, ctx, feature)
    }

    fn parse_failure(&self) -> EvalError {
        EvalError::Parse {
            message: self
                .parser_error()
                .map_or_else(String::new, |e| e.to_string()),
        }
    }
}

/// Cloning re-parses the text so the copy owns an independent tree.
impl Clone for Expression {
    fn clone(&self) -> Self {
        Expression::new(self.text.clone())
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::geometry::Geometry;

    fn feature() -> Feature {
        let fields = Arc::new(Fields::new(["name", "pop"]));
        Feature::new(7, fields)
            .with_geometry(Geometry::point(10.0, 20.0))
            .with_attribute("name", "Oslo")
            .with_attribute("pop", 700000.0)
    }

    fn eval(text: &str) -> Result<Value, EvalError> {
        Expression::new(text).evaluate(&ExpressionContext::new(), Some(&feature()))
    }

    #[test]
    fn evaluates_against_feature() {
        assert_eq!(eval("$x + 1").unwrap(), Value::Number(11.0));
        assert_eq!(eval("upper(name)").unwrap(), Value::from("OSLO"));
        assert_eq!(eval("pop > 500000 and name = 'Oslo'").unwrap(), Value::Bool(true));
        assert_eq!(eval("$id").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn make_point_from_geometry_vars() {
        let v = eval("make_point($x + 1, $y)").unwrap();
        assert_eq!(v.to_string(), "Point (11 20)");
    }

    #[test]
    fn null_semantics() {
        assert_eq!(eval("NULL + 1").unwrap(), Value::Null);
        assert_eq!(eval("NULL and false").unwrap(), Value::Bool(false));
        assert_eq!(eval("NULL or true").unwrap(), Value::Bool(true));
        assert_eq!(eval("NULL and true").unwrap(), Value::Null);
        assert_eq!(eval("1 / 0").unwrap(), Value::Null);
        assert_eq!(eval("coalesce(NULL, 'x')").unwrap(), Value::from("x"));
    }

    #[test]
    fn missing_column_is_an_error() {
        assert_eq!(
            eval("height * 2").unwrap_err(),
            EvalError::UnknownColumn { name: "height".into() }
        );
    }

    #[test]
    fn no_feature_for_geometry_variable() {
        let err = Expression::new("$geometry")
            .evaluate(&ExpressionContext::new(), None)
            .unwrap_err();
        assert!(matches!(err, EvalError::NoFeature { .. }));
    }

    #[test]
    fn invalid_text_is_kept() {
        let expr = Expression::new("make_point(");
        assert!(expr.has_parser_error());
        assert_eq!(expr.text(), "make_point(");
        assert!(matches!(
            expr.evaluate(&ExpressionContext::new(), None),
            Err(EvalError::Parse { .. })
        ));
        assert!(expr.referenced_columns().is_empty());
    }

    #[test]
    fn referenced_columns_and_geometry_use() {
        let expr = Expression::new("translate($geometry, \"dx\", dy * 2)");
        let cols: Vec<_> = expr.referenced_columns().into_iter().collect();
        assert_eq!(cols, vec!["dx".to_string(), "dy".to_string()]);
        assert!(expr.needs_geometry());
        assert!(!Expression::new("name || '!'").needs_geometry());
    }

    #[test]
    fn prepare_checks_fields() {
        let fields = Fields::new(["name"]);
        let ctx = ExpressionContext::new();
        assert!(Expression::new("upper(name)").prepare(&ctx, &fields).is_ok());
        assert!(Expression::new("other").prepare(&ctx, &fields).is_err());
    }

    #[test]
    fn clone_reparses() {
        let expr = Expression::new("$geometry");
        let copy = expr.clone();
        assert_eq!(copy, expr);
        assert_eq!(copy.root(), expr.root());
    }
}
