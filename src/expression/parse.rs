//! Parse pest pairs into expression nodes

use std::sync::LazyLock;

use miette::SourceSpan;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::errors::{ParseError, expression_source, suggest};

use super::ast::{BinaryOp, Expr, FeatureVar, FunctionCall, UnaryOp};
use super::functions::Function;
use super::value::Value;

#[derive(Parser)]
#[grammar = "expression/expression.pest"]
pub struct ExpressionParser;

/// Operator table, lowest precedence first.
static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::prefix(Rule::not))
        .op(Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left)
            | Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left)
            | Op::postfix(Rule::is_null)
            | Op::postfix(Rule::is_not_null))
        .op(Op::infix(Rule::concat, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::modulo, Assoc::Left))
        .op(Op::infix(Rule::pow, Assoc::Right))
        .op(Op::prefix(Rule::neg))
});

/// Parse expression text into a tree.
pub fn parse(text: &str) -> Result<Expr, ParseError> {
    let mut pairs = ExpressionParser::parse(Rule::program, text).map_err(|e| syntax_error(text, e))?;

    // program = { SOI ~ expr ~ EOI }
    let program = pairs.next().ok_or_else(|| ParseError::Syntax {
        message: "empty expression".to_string(),
        src: expression_source(text),
        span: (0, 0).into(),
    })?;
    let expr = program
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| ParseError::Syntax {
            message: "expected an expression".to_string(),
            src: expression_source(text),
            span: (0, text.len()).into(),
        })?;
    parse_expr(expr.into_inner(), text)
}

fn syntax_error(text: &str, err: pest::error::Error<Rule>) -> ParseError {
    let span: SourceSpan = match err.location {
        pest::error::InputLocation::Pos(pos) => (pos, 0).into(),
        pest::error::InputLocation::Span((start, end)) => (start, end - start).into(),
    };
    ParseError::Syntax {
        message: err.variant.message().to_string(),
        src: expression_source(text),
        span,
    }
}

fn span_of(pair: &Pair<Rule>) -> SourceSpan {
    let span = pair.as_span();
    (span.start(), span.end() - span.start()).into()
}

fn parse_expr(pairs: Pairs<Rule>, text: &str) -> Result<Expr, ParseError> {
    PRATT
        .map_primary(|primary| parse_primary(primary, text))
        .map_prefix(|op, rhs| {
            let op = match op.as_rule() {
                Rule::neg => UnaryOp::Neg,
                _ => UnaryOp::Not,
            };
            Ok(Expr::Unary(op, Box::new(rhs?)))
        })
        .map_postfix(|lhs, op| {
            Ok(Expr::IsNull {
                expr: Box::new(lhs?),
                negated: op.as_rule() == Rule::is_not_null,
            })
        })
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::or => BinaryOp::Or,
                Rule::and => BinaryOp::And,
                Rule::eq => BinaryOp::Eq,
                Rule::ne => BinaryOp::Ne,
                Rule::lt => BinaryOp::Lt,
                Rule::le => BinaryOp::Le,
                Rule::gt => BinaryOp::Gt,
                Rule::ge => BinaryOp::Ge,
                Rule::concat => BinaryOp::Concat,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                Rule::modulo => BinaryOp::Mod,
                _ => BinaryOp::Pow,
            };
            Ok(Expr::Binary(Box::new(lhs?), op, Box::new(rhs?)))
        })
        .parse(pairs)
}

fn parse_primary(pair: Pair<Rule>, text: &str) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expr => parse_expr(pair.into_inner(), text),
        Rule::null_lit => Ok(Expr::Literal(Value::Null)),
        Rule::bool_lit => Ok(Expr::Literal(Value::Bool(
            pair.as_str().eq_ignore_ascii_case("true"),
        ))),
        Rule::number => {
            let raw = pair.as_str();
            raw.parse::<f64>()
                .map(|n| Expr::Literal(Value::Number(n)))
                .map_err(|e| ParseError::Syntax {
                    message: format!("invalid number {raw:?}: {e}"),
                    src: expression_source(text),
                    span: span_of(&pair),
                })
        }
        Rule::string => {
            let inner = pair.into_inner().next().map_or("", |p| p.as_str());
            Ok(Expr::Literal(Value::String(inner.replace("''", "'"))))
        }
        Rule::column_ref => {
            let inner = pair.into_inner().next().map_or("", |p| p.as_str());
            Ok(Expr::Column(inner.replace("\"\"", "\"")))
        }
        Rule::bare_column => Ok(Expr::Column(pair.as_str().to_string())),
        Rule::at_var => Ok(Expr::Variable(pair.as_str()[1..].to_string())),
        Rule::dollar_var => {
            let name = &pair.as_str()[1..];
            FeatureVar::from_name(name)
                .map(Expr::Feature)
                .ok_or_else(|| ParseError::Syntax {
                    message: format!("unknown feature variable ${name}"),
                    src: expression_source(text),
                    span: span_of(&pair),
                })
        }
        Rule::function_call => parse_function_call(pair, text),
        rule => Err(ParseError::Syntax {
            message: format!("unexpected {rule:?}"),
            src: expression_source(text),
            span: span_of(&pair),
        }),
    }
}

fn parse_function_call(pair: Pair<Rule>, text: &str) -> Result<Expr, ParseError> {
    let call_span = span_of(&pair);
    let mut inner = pair.into_inner();
    let Some(ident) = inner.next() else {
        return Err(ParseError::Syntax {
            message: "missing function name".to_string(),
            src: expression_source(text),
            span: call_span,
        });
    };

    let name = ident.as_str();
    let Some(func) = Function::from_name(name) else {
        return Err(ParseError::UnknownFunction {
            name: name.to_string(),
            src: expression_source(text),
            span: span_of(&ident),
            suggestion: suggest(name, Function::names()),
        });
    };

    let args = inner
        .filter(|p| p.as_rule() == Rule::expr)
        .map(|p| parse_expr(p.into_inner(), text))
        .collect::<Result<Vec<_>, _>>()?;

    let arity = func.arity();
    if !arity.accepts(args.len()) {
        return Err(ParseError::ArgumentCount {
            name: func.name().to_string(),
            expected: arity.describe(),
            got: args.len(),
            src: expression_source(text),
            span: call_span,
        });
    }

    Ok(Expr::Call(FunctionCall { func, args }))
}
