//! Symbol and symbol-layer composition for vector map features.
//!
//! A [`Symbol`] is an ordered stack of [`SymbolLayer`]s painted for one
//! feature. Layers emit device-pixel primitives to a [`Painter`]; the
//! geometry generator layer derives an alternate geometry per feature
//! from an [`Expression`] and paints it with a sub-symbol.
//!
//! ```
//! use symbology::{Feature, Geometry, RecordingPainter, RenderContext, RenderOptions, Symbol};
//! use symbology::symbol::PropertyMap;
//!
//! let mut symbol = Symbol::create_simple_marker(&PropertyMap::new());
//! let mut painter = RecordingPainter::new();
//! let mut ctx = RenderContext::new(&mut painter);
//! let features = [Feature::from_geometry(1, Geometry::point(3.0, -4.0))];
//! symbology::render_features(&mut symbol, &features, &mut ctx, RenderOptions::default()).unwrap();
//! assert_eq!(painter.len(), 1);
//! ```

pub mod errors;
pub mod expression;
pub mod feature;
pub mod geometry;
pub mod log;
pub mod render;
pub mod symbol;
pub mod types;

pub use errors::{EvalError, ParseError, SymbolError};
pub use expression::{Expression, ExpressionContext, ExpressionScope, Value};
pub use feature::{Feature, FeatureId, Fields, VectorLayer};
pub use geometry::{Geometry, GeometryType, Polygon};
pub use render::{DrawCommand, MapToPixel, Painter, RecordingPainter, RenderContext, SymbolRenderContext};
pub use symbol::{
    GeometryGeneratorLayer, RenderHints, RenderOptions, Symbol, SymbolLayer, SymbolLayerRegistry, SymbolType,
};
pub use types::{Color, MapUnitScale, Opacity, OutputUnit, Px, Rect};

/// Run one render pass of `symbol` over `features`.
///
/// The field schema of the first feature is handed to `start_render`.
/// The pass is always stopped, even when there are no features.
pub fn render_features(
    symbol: &mut Symbol,
    features: &[Feature],
    ctx: &mut RenderContext<'_>,
    options: RenderOptions,
) -> Result<(), SymbolError> {
    let fields = features.first().map(Feature::fields);
    symbol.start_render(ctx, fields)?;
    for feature in features {
        symbol.render_feature(feature, ctx, options);
    }
    symbol.stop_render(ctx);
    Ok(())
}
