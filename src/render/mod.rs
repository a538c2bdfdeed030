//! Render-pass plumbing: drawing surface, contexts, clipping

mod clip;
mod context;
pub mod defaults;
mod painter;
mod symbol_context;

pub use clip::{clip_geometry, clip_ring};
pub use context::{MapToPixel, RenderContext};
pub use painter::{
    Brush, BrushStyle, CapStyle, DrawCommand, JoinStyle, MarkerPrimitive, MarkerShape, Painter, Pen, PenStyle,
    RecordingPainter,
};
pub use symbol_context::{ORIGINAL_VALUE_VARIABLE, SymbolRenderContext};
