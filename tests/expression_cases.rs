//! Data-driven expression tests.
//!
//! Each `tests/expressions/*.case` file holds directives, one expression
//! per line, a `===` separator, then one expected result per expression.
//!
//! Directives (values are themselves expressions, evaluated without a
//! feature):
//!
//! ```text
//! -- fields: name, size
//! -- attr: size = 3
//! -- geometry: make_point(1, 2)
//! -- var: scale = 2
//! ```
//!
//! Results are printed with `Display`; failures print as `error: <kind>`.

use std::sync::Arc;

use datatest_stable::Utf8Path;
use regex_lite::Regex;
use symbology::{EvalError, Expression, ExpressionContext, ExpressionScope, Feature, Fields, ParseError, Value};

struct Case {
    fields: Vec<String>,
    attrs: Vec<(String, String)>,
    geometry: Option<String>,
    vars: Vec<(String, String)>,
    expressions: Vec<String>,
    expected: Vec<String>,
}

fn parse_case(source: &str) -> Result<Case, String> {
    let directive = Regex::new(r"^--\s*(\w+):\s*(.*)$").map_err(|e| e.to_string())?;
    let assignment = Regex::new(r"^(\w+)\s*=\s*(.+)$").map_err(|e| e.to_string())?;

    let (body, expected) = source
        .split_once("\n===\n")
        .ok_or_else(|| "missing === separator".to_string())?;

    let mut case = Case {
        fields: Vec::new(),
        attrs: Vec::new(),
        geometry: None,
        vars: Vec::new(),
        expressions: Vec::new(),
        expected: expected.lines().map(str::to_string).collect(),
    };

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = directive.captures(line) else {
            case.expressions.push(line.to_string());
            continue;
        };
        let value = caps[2].trim();
        match &caps[1] {
            "fields" => case.fields = value.split(',').map(|f| f.trim().to_string()).collect(),
            "geometry" => case.geometry = Some(value.to_string()),
            kind @ ("attr" | "var") => {
                let caps = assignment
                    .captures(value)
                    .ok_or_else(|| format!("bad {kind} directive: {value}"))?;
                let pair = (caps[1].to_string(), caps[2].to_string());
                if kind == "attr" {
                    case.attrs.push(pair);
                } else {
                    case.vars.push(pair);
                }
            }
            other => return Err(format!("unknown directive: {other}")),
        }
    }
    Ok(case)
}

fn constant(text: &str) -> Result<Value, String> {
    Expression::new(text)
        .evaluate(&ExpressionContext::new(), None)
        .map_err(|e| format!("{text}: {e}"))
}

fn describe_error(expr: &Expression, err: &EvalError) -> String {
    match expr.parser_error() {
        Some(ParseError::Syntax { .. }) => "error: syntax".to_string(),
        Some(ParseError::UnknownFunction { name, .. }) => format!("error: unknown function {name}"),
        Some(ParseError::ArgumentCount { name, .. }) => format!("error: argument count {name}"),
        None => match err {
            EvalError::TypeMismatch { expected, got, .. } => format!("error: expected {expected}, got {got}"),
            EvalError::ArgumentCount { name, .. } => format!("error: argument count {name}"),
            EvalError::UnknownColumn { name } => format!("error: unknown column {name}"),
            EvalError::NoFeature { .. } => "error: no feature".to_string(),
            EvalError::NoGeometry { .. } => "error: no geometry".to_string(),
            EvalError::InvalidGeometry { .. } => "error: invalid geometry".to_string(),
            EvalError::Parse { .. } => "error: parse".to_string(),
        },
    }
}

fn run_case(case: &Case) -> Result<String, String> {
    let fields = Arc::new(Fields::new(case.fields.iter().map(String::as_str)));
    let mut feature = Feature::new(1, fields);
    for (name, text) in &case.attrs {
        if !feature.set_attribute(name, constant(text)?) {
            return Err(format!("attribute {name} is not a declared field"));
        }
    }
    if let Some(text) = &case.geometry {
        feature.set_geometry(constant(text)?.into_geometry());
    }

    let mut ctx = ExpressionContext::new();
    let mut scope = ExpressionScope::new("Case");
    for (name, text) in &case.vars {
        scope.set_variable(name, constant(text)?);
    }
    ctx.push_scope(scope);

    let mut out = String::new();
    for text in &case.expressions {
        let expr = Expression::new(text.as_str());
        let line = match expr.evaluate(&ctx, Some(&feature)) {
            Ok(value) => value.to_string(),
            Err(err) => describe_error(&expr, &err),
        };
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

fn format_diff(expected: &str, actual: &str) -> String {
    use dissimilar::Chunk;

    let mut output = String::from("[-expected-] [+actual+]\n");
    for chunk in dissimilar::diff(expected, actual) {
        match chunk {
            Chunk::Equal(s) => output.push_str(s),
            Chunk::Delete(s) => {
                output.push_str("[-");
                output.push_str(s);
                output.push_str("-]");
            }
            Chunk::Insert(s) => {
                output.push_str("[+");
                output.push_str(s);
                output.push_str("+]");
            }
        }
    }
    output
}

fn test_expression_case(path: &Utf8Path) -> datatest_stable::Result<()> {
    let source = std::fs::read_to_string(path)?.replace("\r\n", "\n");
    let case = parse_case(&source).map_err(|e| format!("{path}: {e}"))?;
    if case.expressions.len() != case.expected.len() {
        return Err(format!(
            "{path}: {} expressions but {} expected results",
            case.expressions.len(),
            case.expected.len()
        )
        .into());
    }

    let actual = run_case(&case).map_err(|e| format!("{path}: {e}"))?;
    let mut expected = case.expected.join("\n");
    expected.push('\n');
    if actual != expected {
        return Err(format!("{path}: output mismatch\n{}", format_diff(&expected, &actual)).into());
    }
    Ok(())
}

datatest_stable::harness! {
    { test = test_expression_case, root = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/expressions"), pattern = r"\.case$" },
}
