//! Error types with rich diagnostics using miette
//!
//! Expression errors carry the expression text and a span so a styling
//! dialog can point at the offending token.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::symbol::SymbolType;

/// Build the named source attached to expression diagnostics.
pub(crate) fn expression_source(text: &str) -> NamedSource<String> {
    NamedSource::new("<expression>", text.to_string())
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Errors raised while parsing expression text
#[derive(Error, Diagnostic, Debug)]
pub enum ParseError {
    #[error("syntax error: {message}")]
    #[diagnostic(code(symbology::parse::syntax))]
    Syntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unknown function: {name}")]
    #[diagnostic(code(symbology::parse::unknown_function))]
    UnknownFunction {
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a known function")]
        span: SourceSpan,
        #[help]
        suggestion: Option<String>,
    },

    #[error("{name}() takes {expected} arguments, got {got}")]
    #[diagnostic(code(symbology::parse::argument_count))]
    ArgumentCount {
        name: String,
        expected: String,
        got: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("called here")]
        span: SourceSpan,
    },
}

// ============================================================================
// Evaluation Errors
// ============================================================================

/// Errors raised while evaluating a parsed expression
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("expression did not parse: {message}")]
    #[diagnostic(code(symbology::eval::parse))]
    Parse { message: String },

    #[error("type mismatch in {context}: expected {expected}, got {got}")]
    #[diagnostic(code(symbology::eval::type_mismatch))]
    TypeMismatch {
        context: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("{name} takes {expected} arguments, got {got}")]
    #[diagnostic(code(symbology::eval::argument_count))]
    ArgumentCount {
        name: &'static str,
        expected: String,
        got: usize,
    },

    #[error("column not found: {name}")]
    #[diagnostic(code(symbology::eval::unknown_column))]
    UnknownColumn { name: String },

    #[error("{what} requires a feature")]
    #[diagnostic(
        code(symbology::eval::no_feature),
        help("preview and icon rendering have no current feature")
    )]
    NoFeature { what: String },

    #[error("{what} requires a feature geometry")]
    #[diagnostic(code(symbology::eval::no_geometry))]
    NoGeometry { what: String },

    #[error("invalid geometry: {message}")]
    #[diagnostic(code(symbology::eval::invalid_geometry))]
    InvalidGeometry { message: String },
}

// ============================================================================
// Symbol Errors
// ============================================================================

/// Structural errors from symbol and registry operations
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum SymbolError {
    #[error("symbol layer index {index} out of range (symbol has {count} layers)")]
    #[diagnostic(code(symbology::symbol::index_out_of_range))]
    LayerIndexOutOfRange { index: usize, count: usize },

    #[error("{layer_type} layer cannot be used in a {symbol_type:?} symbol")]
    #[diagnostic(code(symbology::symbol::incompatible_layer))]
    IncompatibleLayer {
        layer_type: String,
        symbol_type: SymbolType,
    },

    #[error("render pass already active")]
    #[diagnostic(
        code(symbology::symbol::render_pass_active),
        help("call stop_render before starting another pass, or clone the symbol per pass")
    )]
    RenderPassActive,

    #[error("unknown symbol layer type: {name}")]
    #[diagnostic(code(symbology::symbol::unknown_layer_type))]
    UnknownLayerType {
        name: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("sub-symbol must be a marker, line or fill symbol, not {symbol_type:?}")]
    #[diagnostic(code(symbology::symbol::invalid_sub_symbol))]
    InvalidSubSymbol { symbol_type: SymbolType },
}

/// Suggest the closest candidate to `name`, if any is reasonably close.
pub(crate) fn suggest<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let name = name.to_ascii_lowercase();
    candidates
        .into_iter()
        .map(|c| (edit_distance(&name, &c.to_ascii_lowercase()), c))
        .filter(|(d, c)| *d <= (c.len() / 3).max(1))
        .min_by_key(|(d, _)| *d)
        .map(|(_, c)| format!("did you mean `{c}`?"))
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut cur = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        prev = cur;
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_names() {
        let names = ["make_point", "make_line", "centroid"];
        assert_eq!(
            suggest("make_pont", names),
            Some("did you mean `make_point`?".to_string())
        );
        assert_eq!(suggest("buffer", names), None);
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }
}
