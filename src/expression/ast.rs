//! Abstract syntax tree for parsed expressions

use super::functions::Function;
use super::value::Value;

/// A parsed expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant: 1.5, 'text', NULL, TRUE
    Literal(Value),
    /// Attribute reference: "name" or name
    Column(String),
    /// Feature variable: $geometry, $x, ...
    Feature(FeatureVar),
    /// Context variable: @value, @geometry_part_num
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// `expr IS NULL` (negated: `IS NOT NULL`)
    IsNull { expr: Box<Expr>, negated: bool },
    Call(FunctionCall),
}

/// Variables bound to the feature being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureVar {
    Geometry,
    X,
    Y,
    Area,
    Length,
    Perimeter,
    Id,
}

impl FeatureVar {
    pub fn from_name(name: &str) -> Option<FeatureVar> {
        Some(match name.to_ascii_lowercase().as_str() {
            "geometry" => FeatureVar::Geometry,
            "x" => FeatureVar::X,
            "y" => FeatureVar::Y,
            "area" => FeatureVar::Area,
            "length" => FeatureVar::Length,
            "perimeter" => FeatureVar::Perimeter,
            "id" => FeatureVar::Id,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            FeatureVar::Geometry => "$geometry",
            FeatureVar::X => "$x",
            FeatureVar::Y => "$y",
            FeatureVar::Area => "$area",
            FeatureVar::Length => "$length",
            FeatureVar::Perimeter => "$perimeter",
            FeatureVar::Id => "$id",
        }
    }

    /// Whether evaluating this variable reads the feature geometry.
    pub fn needs_geometry(self) -> bool {
        !matches!(self, FeatureVar::Id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// A resolved function call
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub func: Function,
    pub args: Vec<Expr>,
}

impl Expr {
    /// Visit this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Unary(_, e) => e.walk(visit),
            Expr::Binary(l, _, r) => {
                l.walk(visit);
                r.walk(visit);
            }
            Expr::IsNull { expr, .. } => expr.walk(visit),
            Expr::Call(call) => {
                for arg in &call.args {
                    arg.walk(visit);
                }
            }
            Expr::Literal(_) | Expr::Column(_) | Expr::Feature(_) | Expr::Variable(_) => {}
        }
    }
}
