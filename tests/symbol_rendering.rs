//! End-to-end render passes through a recording painter.
//!
//! Run with logging: RUST_LOG=debug cargo test --features tracing -- --nocapture

use std::any::Any;
use std::sync::{Arc, Mutex};

use glam::{DVec2, dvec2};
use symbology::render::{BrushStyle, DrawCommand, MapToPixel, PenStyle, RecordingPainter, RenderContext, SymbolRenderContext};
use symbology::symbol::{
    DataDefined, DataDefinedProperties, GeometryGeneratorLayer, LayerGeometry, PropertyMap, RenderHints, RenderOptions,
    SimpleFillLayer, SimpleLineLayer, SimpleMarkerLayer, Symbol, SymbolLayer, SymbolLayerRegistry, SymbolType,
};
use symbology::types::{Color, MapUnitScale, Opacity, OutputUnit};
use symbology::{Feature, Fields, Geometry, SymbolError, render_features};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Map origin at (0, 10), one map unit per pixel, one pixel per millimeter.
fn context(painter: &mut RecordingPainter) -> RenderContext<'_> {
    RenderContext::new(painter)
        .with_map_to_pixel(MapToPixel::new(1.0, dvec2(0.0, 10.0)))
        .with_scale_factor(1.0)
}

fn square() -> Geometry {
    Geometry::polygon([(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
}

fn render(symbol: &mut Symbol, features: &[Feature], options: RenderOptions) -> RecordingPainter {
    let mut painter = RecordingPainter::new();
    {
        let mut ctx = context(&mut painter);
        render_features(symbol, features, &mut ctx, options).unwrap();
    }
    painter
}

/// What a recording layer saw for one render call.
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    feature_geometry: Option<Geometry>,
    pixel: Option<DVec2>,
    part_num: Option<f64>,
}

/// Marker layer that records what it is asked to draw.
#[derive(Debug, Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<Seen>>>,
    data_defined: DataDefinedProperties,
}

impl Recorder {
    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

impl SymbolLayer for Recorder {
    fn layer_type(&self) -> &'static str {
        "Recorder"
    }

    fn symbol_type(&self) -> SymbolType {
        SymbolType::Marker
    }

    fn render(&mut self, geometry: LayerGeometry<'_>, ctx: &mut SymbolRenderContext<'_, '_>) {
        let pixel = match geometry {
            LayerGeometry::Point(p) => Some(p),
            _ => None,
        };
        self.seen.lock().unwrap().push(Seen {
            feature_geometry: ctx.feature().and_then(|f| f.geometry()).cloned(),
            pixel,
            part_num: ctx
                .expression_context()
                .variable("geometry_part_num")
                .and_then(|v| v.to_number()),
        });
    }

    fn draw_preview_icon(&mut self, _ctx: &mut SymbolRenderContext<'_, '_>, _size: DVec2) {}

    fn clone_layer(&self) -> Box<dyn SymbolLayer> {
        Box::new(self.clone())
    }

    fn properties(&self) -> PropertyMap {
        PropertyMap::new()
    }

    fn color(&self) -> Color {
        Color::BLACK
    }

    fn set_color(&mut self, _color: Color) {}

    fn output_unit(&self) -> OutputUnit {
        OutputUnit::Millimeter
    }

    fn set_output_unit(&mut self, _unit: OutputUnit) {}

    fn map_unit_scale(&self) -> MapUnitScale {
        MapUnitScale::default()
    }

    fn set_map_unit_scale(&mut self, _scale: MapUnitScale) {}

    fn data_defined(&self) -> &DataDefinedProperties {
        &self.data_defined
    }

    fn data_defined_mut(&mut self) -> &mut DataDefinedProperties {
        &mut self.data_defined
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn generator_mut(symbol: &mut Symbol, index: usize) -> &mut GeometryGeneratorLayer {
    symbol
        .symbol_layer_mut(index)
        .and_then(|l| l.as_any_mut().downcast_mut::<GeometryGeneratorLayer>())
        .expect("generator layer")
}

fn line(color: Color) -> Box<dyn SymbolLayer> {
    Box::new(SimpleLineLayer::new(color, 1.0, PenStyle::Solid))
}

fn pen_colors(painter: &RecordingPainter) -> Vec<Color> {
    painter
        .commands()
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Polyline { pen, .. } => Some(pen.color),
            _ => None,
        })
        .collect()
}

#[test]
fn paint_order_follows_layer_order() {
    init_tracing();
    let red = Color::RED;
    let green = Color::rgb(0, 255, 0);
    let blue = Color::BLUE;

    let mut symbol = Symbol::line(vec![line(red)]);
    symbol.append_symbol_layer(line(blue)).unwrap();
    symbol.insert_symbol_layer(1, line(green)).unwrap();

    let features = [Feature::from_geometry(1, Geometry::line_string([(0.0, 0.0), (5.0, 0.0)]))];
    let before = render(&mut symbol, &features, RenderOptions::default());
    assert_eq!(pen_colors(&before), vec![red, green, blue]);

    let taken = symbol.take_symbol_layer(1).unwrap();
    assert_eq!(symbol.symbol_layer_count(), 2);
    symbol.insert_symbol_layer(1, taken).unwrap();
    let after = render(&mut symbol, &features, RenderOptions::default());
    assert_eq!(after.commands(), before.commands());
}

#[test]
fn delete_out_of_range_leaves_symbol_unchanged() {
    let mut symbol = Symbol::fill(vec![Box::new(SimpleFillLayer::default())]);
    assert_eq!(
        symbol.delete_symbol_layer(4),
        Err(SymbolError::LayerIndexOutOfRange { index: 4, count: 1 })
    );
    assert_eq!(symbol.symbol_layer_count(), 1);
    symbol.delete_symbol_layer(0).unwrap();
    assert_eq!(symbol.symbol_layer_count(), 0);
}

#[test]
fn clone_is_deep_for_every_kind() {
    fn mutate(symbol: &mut Symbol, kind: SymbolType) {
        if let Some(layer) = symbol.symbol_layer_mut(0) {
            layer.set_output_unit(OutputUnit::Pixel);
        }
        symbol.set_color(Color::rgb(9, 9, 9));
        if kind != SymbolType::Hybrid {
            symbol
                .append_symbol_layer(Symbol::default_for_type(kind).take_symbol_layer(0).unwrap())
                .unwrap();
        }
    }
    let snapshot = |s: &Symbol| {
        (
            s.symbol_layer_count(),
            s.color(),
            s.symbol_layer(0).map(|l| l.properties()),
        )
    };

    for kind in [SymbolType::Marker, SymbolType::Line, SymbolType::Fill, SymbolType::Hybrid] {
        // clone edits leave the original alone
        let original = Symbol::default_for_type(kind);
        let before = snapshot(&original);
        let mut copy = original.clone();
        mutate(&mut copy, kind);
        assert_ne!(snapshot(&copy), before, "{kind:?}");
        assert_eq!(snapshot(&original), before, "{kind:?}");

        // and original edits leave the clone alone
        let mut original = Symbol::default_for_type(kind);
        let copy = original.clone();
        let before = snapshot(&copy);
        mutate(&mut original, kind);
        assert_ne!(snapshot(&original), before, "{kind:?}");
        assert_eq!(snapshot(&copy), before, "{kind:?}");
    }
}

#[test]
fn hybrid_clone_owns_its_sub_symbol() {
    let mut generator = GeometryGeneratorLayer::new("$geometry");
    generator.set_symbol_type(SymbolType::Line);
    let original = Symbol::hybrid(vec![Box::new(generator)]);

    let mut copy = original.clone();
    generator_mut(&mut copy, 0)
        .sub_symbol_mut()
        .expect("active sub-symbol")
        .set_width(5.0);

    let width = |s: &Symbol| s.symbol_layer(0).and_then(|l| l.sub_symbol()).map(Symbol::width);
    assert_eq!(width(&copy), Some(5.0));
    assert_eq!(width(&original), Some(0.26));
}

#[test]
fn properties_round_trip_through_the_registry() {
    let registry = SymbolLayerRegistry::with_defaults();

    let mut marker = SimpleMarkerLayer::default();
    marker.set_offset(dvec2(1.0, 2.0));
    marker.data_defined_mut().set("angle", DataDefined::new("\"heading\" + 90").with_active(false));

    let mut line = SimpleLineLayer::new(Color::rgba(10, 20, 30, 40), 0.8, PenStyle::Dash);
    line.set_output_unit(OutputUnit::MapUnit);
    line.set_map_unit_scale(MapUnitScale::new(0.0001, 0.01));

    let fill = SimpleFillLayer::new(Color::WHITE, BrushStyle::Cross, Color::RED, PenStyle::Dot, 1.2);

    let mut generator = GeometryGeneratorLayer::new("$geometry");
    generator.set_geometry_expression("centroid($geometry)");
    generator.set_symbol_type(SymbolType::Marker);

    let layers: Vec<Box<dyn SymbolLayer>> = vec![
        Box::new(marker),
        Box::new(line),
        Box::new(fill),
        Box::new(generator),
    ];
    for layer in layers {
        let props = layer.properties();
        let rebuilt = registry.create_layer(layer.layer_type(), &props).unwrap();
        assert_eq!(rebuilt.properties(), props, "{}", layer.layer_type());
    }
}

#[test]
fn generator_created_from_empty_properties() {
    let registry = SymbolLayerRegistry::with_defaults();
    let layer = registry.create_layer("GeometryGenerator", &PropertyMap::new()).unwrap();
    let props = layer.properties();
    assert_eq!(props.get("geometryModifier").map(String::as_str), Some("$geometry"));
    assert_eq!(props.get("SymbolType").map(String::as_str), Some("Fill"));
    assert_eq!(layer.sub_symbol().map(Symbol::symbol_type), Some(SymbolType::Fill));
    assert!(layer.is_compatible_with_symbol(SymbolType::Marker));
    assert!(layer.is_compatible_with_symbol(SymbolType::Hybrid));
}

#[test]
fn set_symbol_type_twice_keeps_the_same_sub_symbol() {
    let mut layer = GeometryGeneratorLayer::default();
    layer.set_symbol_type(SymbolType::Marker);
    layer.sub_symbol_mut().expect("marker").set_size(7.0);
    let first: *const Symbol = layer.sub_symbol().expect("marker");

    layer.set_symbol_type(SymbolType::Marker);
    let second: *const Symbol = layer.sub_symbol().expect("marker");
    assert!(std::ptr::eq(first, second));
    assert_eq!(layer.sub_symbol().map(Symbol::size), Some(7.0));
}

#[test]
fn generator_used_attributes_include_expression_columns() {
    let layer = GeometryGeneratorLayer::new("concat(\"name\", \"_suffix\")");
    assert!(layer.sub_symbol().is_some_and(|s| s.used_attributes().is_empty()));
    assert!(layer.used_attributes().contains("name"));

    let symbol = Symbol::hybrid(vec![Box::new(layer)]);
    assert!(symbol.used_attributes().contains("name"));
}

#[test]
fn generator_renders_the_synthetic_feature() {
    init_tracing();
    let recorder = Recorder::default();
    let mut generator = GeometryGeneratorLayer::new("make_point($x + 1, $y)");
    generator
        .set_sub_symbol(Symbol::marker(vec![Box::new(recorder.clone())]))
        .unwrap();
    let mut symbol = Symbol::hybrid(vec![Box::new(generator)]);

    let fields = Arc::new(Fields::new(["name"]));
    let feature = Feature::new(7, fields)
        .with_attribute("name", "depot")
        .with_geometry(Geometry::point(10.0, 20.0));
    let painter = render(&mut symbol, std::slice::from_ref(&feature), RenderOptions::default());

    assert!(painter.is_empty());
    assert_eq!(
        recorder.seen(),
        vec![Seen {
            feature_geometry: Some(Geometry::point(11.0, 20.0)),
            pixel: Some(dvec2(11.0, -10.0)),
            part_num: Some(1.0),
        }]
    );
    assert_eq!(feature.geometry(), Some(&Geometry::point(10.0, 20.0)));
}

#[test]
fn generator_without_feature_draws_nothing() {
    let recorder = Recorder::default();
    let mut generator = GeometryGeneratorLayer::default();
    generator
        .set_sub_symbol(Symbol::marker(vec![Box::new(recorder.clone())]))
        .unwrap();

    let mut painter = RecordingPainter::new();
    let mut ctx = context(&mut painter);
    let mut sctx = SymbolRenderContext::new(
        &mut ctx,
        OutputUnit::Millimeter,
        Opacity::OPAQUE,
        false,
        RenderHints::empty(),
    );
    Symbol::render_using_layer(&mut generator, &mut sctx);
    assert!(recorder.seen().is_empty());
}

#[test]
fn unevaluable_expression_skips_only_that_feature() {
    let mut generator = GeometryGeneratorLayer::new("translate($geometry, \"dx\", 0)");
    generator.set_symbol_type(SymbolType::Fill);
    let mut symbol = Symbol::hybrid(vec![Box::new(generator)]);

    let fields = Arc::new(Fields::new(["dx"]));
    let good = Feature::new(1, fields.clone()).with_attribute("dx", 1.0).with_geometry(square());
    let bad = Feature::new(2, fields).with_attribute("dx", "wide").with_geometry(square());
    let painter = render(&mut symbol, &[bad, good], RenderOptions::default());

    insta::assert_snapshot!(painter.dump().trim_end(), @"polygon [1,10 11,10 11,0 1,0] brush 0,0,255,255 solid pen 0,0,0,255 0.26");
}

#[test]
fn fill_with_outline_and_centroid_marker() {
    init_tracing();
    let mut symbol = Symbol::fill(Vec::new());
    symbol
        .append_symbol_layer(Box::new(SimpleLineLayer::new(Color::RED, 2.0, PenStyle::Solid)))
        .unwrap();
    let mut generator = GeometryGeneratorLayer::new("centroid($geometry)");
    generator.set_symbol_type(SymbolType::Marker);
    symbol.append_symbol_layer(Box::new(generator)).unwrap();

    insta::assert_snapshot!(symbol.dump(), @"FILL SYMBOL (3 layers) color 0,0,255,255");

    let painter = render(&mut symbol, &[Feature::from_geometry(1, square())], RenderOptions::default());
    insta::assert_snapshot!(painter.dump().trim_end(), @r"
    polygon [0,10 10,10 10,0 0,0] brush 0,0,255,255 solid pen 0,0,0,255 0.26
    polyline [0,10 10,10 10,0 0,0 0,10] pen 255,0,0,255 2
    marker circle at 5,5 size 2 angle 0 fill 255,0,0,255
    ");
}

#[test]
fn selection_reaches_the_sub_symbol() {
    let mut generator = GeometryGeneratorLayer::new("centroid($geometry)");
    generator.set_symbol_type(SymbolType::Marker);
    let mut symbol = Symbol::hybrid(vec![Box::new(generator)]);
    let options = RenderOptions {
        selected: true,
        ..RenderOptions::default()
    };
    let painter = render(&mut symbol, &[Feature::from_geometry(1, square())], options);
    match painter.commands() {
        [DrawCommand::Marker(m)] => assert_eq!(m.fill, Color::YELLOW),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn part_variables_track_each_part() {
    let recorder = Recorder::default();
    let mut symbol = Symbol::marker(vec![Box::new(recorder.clone())]);
    let multi = Geometry::MultiPoint(vec![dvec2(1.0, 1.0), dvec2(2.0, 2.0), dvec2(3.0, 3.0)]);
    render(&mut symbol, &[Feature::from_geometry(1, multi)], RenderOptions::default());

    let parts: Vec<Option<f64>> = recorder.seen().iter().map(|s| s.part_num).collect();
    assert_eq!(parts, vec![Some(1.0), Some(2.0), Some(3.0)]);
}

#[test]
fn data_defined_size_sees_original_value() {
    let mut marker = SimpleMarkerLayer::default();
    marker.data_defined_mut().set("size", DataDefined::new("@value * \"scale\""));
    let mut symbol = Symbol::marker(vec![Box::new(marker)]);

    let fields = Arc::new(Fields::new(["scale"]));
    let features = [
        Feature::new(1, fields.clone())
            .with_attribute("scale", 3.0)
            .with_geometry(Geometry::point(1.0, 1.0)),
        // NULL falls back to the undefined size
        Feature::new(2, fields).with_geometry(Geometry::point(2.0, 2.0)),
    ];
    let painter = render(&mut symbol, &features, RenderOptions::default());
    insta::assert_snapshot!(painter.dump().trim_end(), @r"
    marker circle at 1,9 size 6 angle 0 fill 255,0,0,255
    marker circle at 2,8 size 2 angle 0 fill 255,0,0,255
    ");
}

#[test]
fn preview_icon_uses_the_active_sub_symbol() {
    let mut symbol = Symbol::hybrid(Vec::new());
    let mut painter = RecordingPainter::new();
    {
        let mut ctx = context(&mut painter);
        symbol.draw_preview_icon(&mut ctx, dvec2(16.0, 16.0));
    }
    insta::assert_snapshot!(painter.dump().trim_end(), @"polygon [0,0 16,0 16,16 0,16] brush 0,0,255,255 solid pen 0,0,0,255 0.26");
}

#[test]
fn render_pass_cannot_overlap() {
    let mut symbol = Symbol::default_for_type(SymbolType::Line);
    let mut painter = RecordingPainter::new();
    let mut ctx = context(&mut painter);
    symbol.start_render(&mut ctx, None).unwrap();
    assert_eq!(
        render_features(&mut symbol, &[], &mut ctx, RenderOptions::default()),
        Err(SymbolError::RenderPassActive)
    );
    symbol.stop_render(&mut ctx);
    assert!(render_features(&mut symbol, &[], &mut ctx, RenderOptions::default()).is_ok());
}
