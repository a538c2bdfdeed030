//! Built-in expression functions

use glam::DVec2;

use crate::errors::EvalError;
use crate::geometry::{Geometry, Polygon};

use super::value::Value;

/// Every function the expression language knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    // Math
    Abs,
    Sqrt,
    Round,
    Min,
    Max,
    // Conditionals
    Coalesce,
    If,
    // Strings
    Concat,
    Upper,
    Lower,
    Length,
    ToString,
    ToReal,
    // Geometry
    MakePoint,
    MakeLine,
    MakePolygon,
    Centroid,
    Translate,
    X,
    Y,
    Area,
    Perimeter,
    StartPoint,
    EndPoint,
    NumPoints,
    GeomToWkt,
}

/// Allowed argument counts; `max` of `None` means variadic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    const fn exactly(n: usize) -> Self {
        Arity { min: n, max: Some(n) }
    }

    const fn between(min: usize, max: usize) -> Self {
        Arity { min, max: Some(max) }
    }

    const fn at_least(min: usize) -> Self {
        Arity { min, max: None }
    }

    pub fn accepts(self, n: usize) -> bool {
        n >= self.min && self.max.is_none_or(|max| n <= max)
    }

    pub fn describe(self) -> String {
        match self.max {
            Some(max) if max == self.min => format!("{}", self.min),
            Some(max) => format!("{} to {}", self.min, max),
            None => format!("at least {}", self.min),
        }
    }
}

const ALL: [Function; 26] = [
    Function::Abs,
    Function::Sqrt,
    Function::Round,
    Function::Min,
    Function::Max,
    Function::Coalesce,
    Function::If,
    Function::Concat,
    Function::Upper,
    Function::Lower,
    Function::Length,
    Function::ToString,
    Function::ToReal,
    Function::MakePoint,
    Function::MakeLine,
    Function::MakePolygon,
    Function::Centroid,
    Function::Translate,
    Function::X,
    Function::Y,
    Function::Area,
    Function::Perimeter,
    Function::StartPoint,
    Function::EndPoint,
    Function::NumPoints,
    Function::GeomToWkt,
];

impl Function {
    /// Every function name, for diagnostics.
    pub fn names() -> impl Iterator<Item = &'static str> {
        ALL.iter().map(|f| f.name())
    }

    pub fn from_name(name: &str) -> Option<Function> {
        let lower = name.to_ascii_lowercase();
        ALL.iter().copied().find(|f| f.name() == lower)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Sqrt => "sqrt",
            Function::Round => "round",
            Function::Min => "min",
            Function::Max => "max",
            Function::Coalesce => "coalesce",
            Function::If => "if",
            Function::Concat => "concat",
            Function::Upper => "upper",
            Function::Lower => "lower",
            Function::Length => "length",
            Function::ToString => "to_string",
            Function::ToReal => "to_real",
            Function::MakePoint => "make_point",
            Function::MakeLine => "make_line",
            Function::MakePolygon => "make_polygon",
            Function::Centroid => "centroid",
            Function::Translate => "translate",
            Function::X => "x",
            Function::Y => "y",
            Function::Area => "area",
            Function::Perimeter => "perimeter",
            Function::StartPoint => "start_point",
            Function::EndPoint => "end_point",
            Function::NumPoints => "num_points",
            Function::GeomToWkt => "geom_to_wkt",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Function::Abs | Function::Sqrt => Arity::exactly(1),
            Function::Round => Arity::between(1, 2),
            Function::Min | Function::Max | Function::Coalesce | Function::Concat => Arity::at_least(1),
            Function::If => Arity::exactly(3),
            Function::Upper | Function::Lower | Function::Length | Function::ToString | Function::ToReal => {
                Arity::exactly(1)
            }
            Function::MakePoint => Arity::exactly(2),
            Function::MakeLine => Arity::at_least(2),
            Function::MakePolygon => Arity::exactly(1),
            Function::Translate => Arity::exactly(3),
            Function::Centroid
            | Function::X
            | Function::Y
            | Function::Area
            | Function::Perimeter
            | Function::StartPoint
            | Function::EndPoint
            | Function::NumPoints
            | Function::GeomToWkt => Arity::exactly(1),
        }
    }

    /// Apply an eager function to already-evaluated arguments.
    pub fn call(self, args: &[Value]) -> Result<Value, EvalError> {
        let name = self.name();
        let arity = self.arity();
        if !arity.accepts(args.len()) {
            return Err(EvalError::ArgumentCount {
                name,
                expected: arity.describe(),
                got: args.len(),
            });
        }
        // Most functions propagate NULL from their first argument
        let null_in = |i: usize| args.get(i).is_none_or(Value::is_null);

        Ok(match self {
            Function::Abs => {
                if null_in(0) {
                    return Ok(Value::Null);
                }
                Value::Number(args[0].expect_number(name)?.abs())
            }
            Function::Sqrt => {
                if null_in(0) {
                    return Ok(Value::Null);
                }
                let v = args[0].expect_number(name)?;
                if v < 0.0 { Value::Null } else { Value::Number(v.sqrt()) }
            }
            Function::Round => {
                if null_in(0) {
                    return Ok(Value::Null);
                }
                let v = args[0].expect_number(name)?;
                let places = match args.get(1) {
                    Some(p) if !p.is_null() => p.expect_number(name)? as i32,
                    _ => 0,
                };
                let factor = 10f64.powi(places);
                Value::Number((v * factor).round() / factor)
            }
            Function::Min | Function::Max => {
                let mut best: Option<f64> = None;
                for arg in args.iter().filter(|a| !a.is_null()) {
                    let v = arg.expect_number(name)?;
                    best = Some(match best {
                        None => v,
                        Some(b) if self == Function::Min => b.min(v),
                        Some(b) => b.max(v),
                    });
                }
                best.map_or(Value::Null, Value::Number)
            }
            Function::Concat => Value::String(
                args.iter()
                    .filter(|a| !a.is_null())
                    .map(Value::to_string)
                    .collect(),
            ),
            Function::Upper => match &args[0] {
                Value::Null => Value::Null,
                v => Value::String(v.to_string().to_uppercase()),
            },
            Function::Lower => match &args[0] {
                Value::Null => Value::Null,
                v => Value::String(v.to_string().to_lowercase()),
            },
            Function::Length => match &args[0] {
                Value::Null => Value::Null,
                Value::Geometry(g) => Value::Number(g.length()),
                v => Value::Number(v.to_string().chars().count() as f64),
            },
            Function::ToString => match &args[0] {
                Value::Null => Value::Null,
                v => Value::String(v.to_string()),
            },
            Function::ToReal => match &args[0] {
                Value::Null => Value::Null,
                v => v.to_number().map_or(Value::Null, Value::Number),
            },
            Function::MakePoint => {
                if null_in(0) || null_in(1) {
                    return Ok(Value::Null);
                }
                let x = args[0].expect_number(name)?;
                let y = args[1].expect_number(name)?;
                Value::Geometry(Geometry::point(x, y))
            }
            Function::MakeLine => {
                let mut points = Vec::with_capacity(args.len());
                for arg in args {
                    match arg.expect_geometry(name)? {
                        Geometry::Point(p) => points.push(*p),
                        other => {
                            return Err(EvalError::InvalidGeometry {
                                message: format!("{name}() expects points, got {}", other),
                            });
                        }
                    }
                }
                Value::Geometry(Geometry::LineString(points))
            }
            Function::MakePolygon => {
                if null_in(0) {
                    return Ok(Value::Null);
                }
                match args[0].expect_geometry(name)? {
                    Geometry::LineString(ring) if ring.len() >= 3 => {
                        Value::Geometry(Geometry::Polygon(Polygon::new(ring.clone())))
                    }
                    other => {
                        return Err(EvalError::InvalidGeometry {
                            message: format!("{name}() expects a ring of at least 3 points, got {}", other),
                        });
                    }
                }
            }
            Function::Centroid => geometry_arg(args, name)?
                .and_then(Geometry::centroid)
                .map_or(Value::Null, |c| Value::Geometry(Geometry::Point(c))),
            Function::Translate => {
                let Some(g) = geometry_arg(args, name)? else {
                    return Ok(Value::Null);
                };
                let dx = args[1].expect_number(name)?;
                let dy = args[2].expect_number(name)?;
                Value::Geometry(g.translated(dx, dy))
            }
            Function::X | Function::Y => match geometry_arg(args, name)? {
                None => Value::Null,
                Some(g) => {
                    let p: Option<DVec2> = match g {
                        Geometry::Point(p) => Some(*p),
                        other => other.centroid(),
                    };
                    p.map_or(Value::Null, |p| {
                        Value::Number(if self == Function::X { p.x } else { p.y })
                    })
                }
            },
            Function::Area => geometry_arg(args, name)?.map_or(Value::Null, |g| Value::Number(g.area())),
            Function::Perimeter => {
                geometry_arg(args, name)?.map_or(Value::Null, |g| Value::Number(g.perimeter()))
            }
            Function::StartPoint | Function::EndPoint => {
                let p = geometry_arg(args, name)?.and_then(|g| {
                    if self == Function::StartPoint { g.start_point() } else { g.end_point() }
                });
                p.map_or(Value::Null, |p| Value::Geometry(Geometry::Point(p)))
            }
            Function::NumPoints => {
                geometry_arg(args, name)?.map_or(Value::Null, |g| Value::Number(g.vertices().len() as f64))
            }
            Function::GeomToWkt => {
                geometry_arg(args, name)?.map_or(Value::Null, |g| Value::String(g.to_string()))
            }
            // The evaluator short-circuits these; eager forms for completeness
            Function::If => {
                if args[0].to_bool() {
                    args[1].clone()
                } else {
                    args[2].clone()
                }
            }
            Function::Coalesce => args.iter().find(|a| !a.is_null()).cloned().unwrap_or_default(),
        })
    }
}

/// First argument as a geometry; NULL maps to `None`.
fn geometry_arg<'a>(args: &'a [Value], name: &str) -> Result<Option<&'a Geometry>, EvalError> {
    match args.first() {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.expect_geometry(name).map(Some),
    }
}
