//! Expression evaluation against a feature and a variable context

use crate::errors::EvalError;
use crate::feature::Feature;
use crate::geometry::Geometry;

use super::ast::{BinaryOp, Expr, FeatureVar, FunctionCall, UnaryOp};
use super::context::ExpressionContext;
use super::functions::Function;
use super::value::Value;

/// Evaluate a node. NULL propagates through arithmetic and comparison.
pub fn eval_expr(expr: &Expr, ctx: &ExpressionContext, feature: Option<&Feature>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Column(name) => {
            let feature = feature.ok_or_else(|| EvalError::NoFeature {
                what: format!("column \"{name}\""),
            })?;
            feature
                .attribute(name)
                .cloned()
                .ok_or_else(|| EvalError::UnknownColumn { name: name.clone() })
        }
        Expr::Feature(var) => eval_feature_var(*var, feature),
        Expr::Variable(name) => Ok(ctx.variable(name).cloned().unwrap_or_default()),
        Expr::Unary(op, inner) => {
            let v = eval_expr(inner, ctx, feature)?;
            if v.is_null() {
                return Ok(Value::Null);
            }
            Ok(match op {
                UnaryOp::Neg => Value::Number(-v.expect_number("unary minus")?),
                UnaryOp::Not => Value::Bool(!v.to_bool()),
            })
        }
        Expr::IsNull { expr, negated } => {
            let v = eval_expr(expr, ctx, feature)?;
            Ok(Value::Bool(v.is_null() != *negated))
        }
        Expr::Binary(lhs, op, rhs) => eval_binary(lhs, *op, rhs, ctx, feature),
        Expr::Call(call) => eval_call(call, ctx, feature),
    }
}

fn eval_feature_var(var: FeatureVar, feature: Option<&Feature>) -> Result<Value, EvalError> {
    let feature = feature.ok_or_else(|| EvalError::NoFeature {
        what: var.name().to_string(),
    })?;
    if var == FeatureVar::Id {
        return Ok(Value::Number(feature.id() as f64));
    }
    let Some(geom) = feature.geometry() else {
        return Ok(Value::Null);
    };
    Ok(match var {
        FeatureVar::Geometry => Value::Geometry(geom.clone()),
        FeatureVar::X | FeatureVar::Y => {
            let p = match geom {
                Geometry::Point(p) => Some(*p),
                other => other.centroid(),
            };
            p.map_or(Value::Null, |p| {
                Value::Number(if var == FeatureVar::X { p.x } else { p.y })
            })
        }
        FeatureVar::Area => Value::Number(geom.area()),
        FeatureVar::Length => Value::Number(geom.length()),
        FeatureVar::Perimeter => Value::Number(geom.perimeter()),
        FeatureVar::Id => Value::Number(feature.id() as f64),
    })
}

fn eval_binary(
    lhs: &Expr,
    op: BinaryOp,
    rhs: &Expr,
    ctx: &ExpressionContext,
    feature: Option<&Feature>,
) -> Result<Value, EvalError> {
    // Three-valued logic with short-circuiting
    match op {
        BinaryOp::And => {
            let l = eval_expr(lhs, ctx, feature)?;
            if !l.is_null() && !l.to_bool() {
                return Ok(Value::Bool(false));
            }
            let r = eval_expr(rhs, ctx, feature)?;
            return Ok(match (l.is_null(), r.is_null()) {
                (_, false) if !r.to_bool() => Value::Bool(false),
                (false, false) => Value::Bool(true),
                _ => Value::Null,
            });
        }
        BinaryOp::Or => {
            let l = eval_expr(lhs, ctx, feature)?;
            if !l.is_null() && l.to_bool() {
                return Ok(Value::Bool(true));
            }
            let r = eval_expr(rhs, ctx, feature)?;
            return Ok(match (l.is_null(), r.is_null()) {
                (_, false) if r.to_bool() => Value::Bool(true),
                (false, false) => Value::Bool(false),
                _ => Value::Null,
            });
        }
        _ => {}
    }

    let l = eval_expr(lhs, ctx, feature)?;
    let r = eval_expr(rhs, ctx, feature)?;
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }

    let ctx_name = op_name(op);
    Ok(match op {
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let Some(ord) = l.compare(&r) else {
                return Ok(Value::Null);
            };
            Value::Bool(match op {
                BinaryOp::Eq => ord.is_eq(),
                BinaryOp::Ne => ord.is_ne(),
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            })
        }
        BinaryOp::Concat => Value::String(format!("{l}{r}")),
        BinaryOp::Add => match (&l, &r) {
            (Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
            _ => Value::Number(l.expect_number(ctx_name)? + r.expect_number(ctx_name)?),
        },
        BinaryOp::Sub => Value::Number(l.expect_number(ctx_name)? - r.expect_number(ctx_name)?),
        BinaryOp::Mul => Value::Number(l.expect_number(ctx_name)? * r.expect_number(ctx_name)?),
        BinaryOp::Div | BinaryOp::Mod => {
            let a = l.expect_number(ctx_name)?;
            let b = r.expect_number(ctx_name)?;
            if b == 0.0 {
                return Ok(Value::Null);
            }
            Value::Number(if op == BinaryOp::Div { a / b } else { a % b })
        }
        BinaryOp::Pow => Value::Number(l.expect_number(ctx_name)?.powf(r.expect_number(ctx_name)?)),
        BinaryOp::And | BinaryOp::Or => Value::Null,
    })
}

fn op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "OR",
        BinaryOp::And => "AND",
        BinaryOp::Eq => "=",
        BinaryOp::Ne => "<>",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Concat => "||",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "^",
    }
}

fn eval_call(call: &FunctionCall, ctx: &ExpressionContext, feature: Option<&Feature>) -> Result<Value, EvalError> {
    match call.func {
        Function::If => {
            let cond = eval_expr(&call.args[0], ctx, feature)?;
            let branch = if cond.to_bool() { &call.args[1] } else { &call.args[2] };
            eval_expr(branch, ctx, feature)
        }
        Function::Coalesce => {
            for arg in &call.args {
                let v = eval_expr(arg, ctx, feature)?;
                if !v.is_null() {
                    return Ok(v);
                }
            }
            Ok(Value::Null)
        }
        func => {
            let args = call
                .args
                .iter()
                .map(|a| eval_expr(a, ctx, feature))
                .collect::<Result<Vec<_>, _>>()?;
            func.call(&args)
        }
    }
}
