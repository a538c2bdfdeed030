//! Vector feature geometry in map units.

use std::fmt;

use glam::DVec2;

use crate::types::Rect;

/// Broad geometry class a symbol kind can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    Line,
    Polygon,
}

/// A polygon: one exterior ring plus zero or more holes.
///
/// Rings are stored open or closed as given; consumers that need a closed
/// ring use [`close_ring`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub exterior: Vec<DVec2>,
    pub interiors: Vec<Vec<DVec2>>,
}

impl Polygon {
    pub fn new(exterior: Vec<DVec2>) -> Self {
        Polygon {
            exterior,
            interiors: Vec::new(),
        }
    }

    pub fn with_interiors(mut self, interiors: Vec<Vec<DVec2>>) -> Self {
        self.interiors = interiors;
        self
    }

    /// Signed-area-free polygon area (holes subtracted).
    pub fn area(&self) -> f64 {
        let holes: f64 = self.interiors.iter().map(|r| ring_area(r)).sum();
        (ring_area(&self.exterior) - holes).max(0.0)
    }

    pub fn perimeter(&self) -> f64 {
        ring_length(&self.exterior) + self.interiors.iter().map(|r| ring_length(r)).sum::<f64>()
    }

    fn rings(&self) -> impl Iterator<Item = &Vec<DVec2>> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }
}

/// A feature geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(DVec2),
    MultiPoint(Vec<DVec2>),
    LineString(Vec<DVec2>),
    MultiLineString(Vec<Vec<DVec2>>),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(DVec2::new(x, y))
    }

    pub fn line_string(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Geometry::LineString(points.into_iter().map(|(x, y)| DVec2::new(x, y)).collect())
    }

    pub fn polygon(exterior: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Geometry::Polygon(Polygon::new(
            exterior.into_iter().map(|(x, y)| DVec2::new(x, y)).collect(),
        ))
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => GeometryType::Point,
            Geometry::LineString(_) | Geometry::MultiLineString(_) => GeometryType::Line,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => GeometryType::Polygon,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            Geometry::MultiPoint(_) | Geometry::MultiLineString(_) | Geometry::MultiPolygon(_)
        )
    }

    /// Number of parts; single geometries have one.
    pub fn part_count(&self) -> usize {
        match self {
            Geometry::MultiPoint(p) => p.len(),
            Geometry::MultiLineString(l) => l.len(),
            Geometry::MultiPolygon(p) => p.len(),
            _ => 1,
        }
    }

    /// Every vertex of the geometry, rings included, in storage order.
    pub fn vertices(&self) -> Vec<DVec2> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::MultiPoint(pts) | Geometry::LineString(pts) => pts.clone(),
            Geometry::MultiLineString(lines) => lines.iter().flatten().copied().collect(),
            Geometry::Polygon(poly) => poly.rings().flatten().copied().collect(),
            Geometry::MultiPolygon(polys) => polys
                .iter()
                .flat_map(|p| p.rings().flatten().copied())
                .collect(),
        }
    }

    /// Bounding box, or `None` when the geometry has no vertices.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut rect = Rect::empty();
        for v in self.vertices() {
            rect.expand_point(v);
        }
        (!rect.is_empty()).then_some(rect)
    }

    pub fn area(&self) -> f64 {
        match self {
            Geometry::Polygon(p) => p.area(),
            Geometry::MultiPolygon(polys) => polys.iter().map(Polygon::area).sum(),
            _ => 0.0,
        }
    }

    /// Length of linework; zero for points and polygons.
    pub fn length(&self) -> f64 {
        match self {
            Geometry::LineString(l) => line_length(l),
            Geometry::MultiLineString(lines) => lines.iter().map(|l| line_length(l)).sum(),
            _ => 0.0,
        }
    }

    /// Ring length for polygons; zero otherwise.
    pub fn perimeter(&self) -> f64 {
        match self {
            Geometry::Polygon(p) => p.perimeter(),
            Geometry::MultiPolygon(polys) => polys.iter().map(Polygon::perimeter).sum(),
            _ => 0.0,
        }
    }

    /// Centroid weighted by the geometry's own dimension.
    pub fn centroid(&self) -> Option<DVec2> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::MultiPoint(pts) => mean(pts),
            Geometry::LineString(l) => line_centroid(std::slice::from_ref(l)),
            Geometry::MultiLineString(lines) => line_centroid(lines),
            Geometry::Polygon(p) => polygon_centroid(std::slice::from_ref(p)),
            Geometry::MultiPolygon(polys) => polygon_centroid(polys),
        }
    }

    /// A copy shifted by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Geometry {
        self.map_points(|p| p + DVec2::new(dx, dy))
    }

    /// A copy with every vertex passed through `f`.
    pub fn map_points(&self, f: impl Fn(DVec2) -> DVec2) -> Geometry {
        let ring = |r: &Vec<DVec2>| r.iter().map(|p| f(*p)).collect::<Vec<_>>();
        let poly = |p: &Polygon| Polygon {
            exterior: ring(&p.exterior),
            interiors: p.interiors.iter().map(ring).collect(),
        };
        match self {
            Geometry::Point(p) => Geometry::Point(f(*p)),
            Geometry::MultiPoint(pts) => Geometry::MultiPoint(ring(pts)),
            Geometry::LineString(l) => Geometry::LineString(ring(l)),
            Geometry::MultiLineString(lines) => Geometry::MultiLineString(lines.iter().map(ring).collect()),
            Geometry::Polygon(p) => Geometry::Polygon(poly(p)),
            Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(polys.iter().map(poly).collect()),
        }
    }

    /// First vertex of the geometry.
    pub fn start_point(&self) -> Option<DVec2> {
        self.vertices().first().copied()
    }

    /// Last vertex of the geometry.
    pub fn end_point(&self) -> Option<DVec2> {
        self.vertices().last().copied()
    }
}

/// Return `ring` with its first vertex repeated at the end if it is open.
pub fn close_ring(ring: &[DVec2]) -> Vec<DVec2> {
    let mut closed = ring.to_vec();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            closed.push(*first);
        }
    }
    closed
}

fn ring_area(ring: &[DVec2]) -> f64 {
    let closed = close_ring(ring);
    closed.windows(2).map(|w| w[0].perp_dot(w[1])).sum::<f64>().abs() / 2.0
}

fn ring_length(ring: &[DVec2]) -> f64 {
    line_length(&close_ring(ring))
}

fn line_length(line: &[DVec2]) -> f64 {
    line.windows(2).map(|w| w[0].distance(w[1])).sum()
}

fn mean(points: &[DVec2]) -> Option<DVec2> {
    if points.is_empty() {
        return None;
    }
    Some(points.iter().copied().sum::<DVec2>() / points.len() as f64)
}

fn line_centroid(lines: &[Vec<DVec2>]) -> Option<DVec2> {
    let mut total = 0.0;
    let mut acc = DVec2::ZERO;
    for line in lines {
        for w in line.windows(2) {
            let len = w[0].distance(w[1]);
            total += len;
            acc += (w[0] + w[1]) * 0.5 * len;
        }
    }
    if total > 0.0 {
        Some(acc / total)
    } else {
        mean(&lines.iter().flatten().copied().collect::<Vec<_>>())
    }
}

fn polygon_centroid(polys: &[Polygon]) -> Option<DVec2> {
    let mut total = 0.0;
    let mut acc = DVec2::ZERO;
    for poly in polys {
        for (ring, sign) in poly
            .rings()
            .enumerate()
            .map(|(i, r)| (r, if i == 0 { 1.0 } else { -1.0 }))
        {
            let closed = close_ring(ring);
            let signed: f64 = closed.windows(2).map(|w| w[0].perp_dot(w[1])).sum::<f64>() / 2.0;
            if signed == 0.0 {
                continue;
            }
            let mut c = DVec2::ZERO;
            for w in closed.windows(2) {
                c += (w[0] + w[1]) * w[0].perp_dot(w[1]);
            }
            let ring_centroid = c / (6.0 * signed);
            let weight = signed.abs() * sign;
            total += weight;
            acc += ring_centroid * weight;
        }
    }
    if total != 0.0 {
        Some(acc / total)
    } else {
        mean(
            &polys
                .iter()
                .flat_map(|p| p.exterior.iter().copied())
                .collect::<Vec<_>>(),
        )
    }
}

fn fmt_coords(f: &mut fmt::Formatter<'_>, pts: &[DVec2]) -> fmt::Result {
    for (i, p) in pts.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} {}", p.x, p.y)?;
    }
    Ok(())
}

fn fmt_polygon_body(f: &mut fmt::Formatter<'_>, poly: &Polygon) -> fmt::Result {
    write!(f, "(")?;
    for (i, ring) in poly.rings().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "(")?;
        fmt_coords(f, &close_ring(ring))?;
        write!(f, ")")?;
    }
    write!(f, ")")
}

/// Well-known text.
impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(p) => write!(f, "Point ({} {})", p.x, p.y),
            Geometry::MultiPoint(pts) => {
                write!(f, "MultiPoint (")?;
                fmt_coords(f, pts)?;
                write!(f, ")")
            }
            Geometry::LineString(l) => {
                write!(f, "LineString (")?;
                fmt_coords(f, l)?;
                write!(f, ")")
            }
            Geometry::MultiLineString(lines) => {
                write!(f, "MultiLineString (")?;
                for (i, l) in lines.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "(")?;
                    fmt_coords(f, l)?;
                    write!(f, ")")?;
                }
                write!(f, ")")
            }
            Geometry::Polygon(p) => {
                write!(f, "Polygon ")?;
                fmt_polygon_body(f, p)
            }
            Geometry::MultiPolygon(polys) => {
                write!(f, "MultiPolygon (")?;
                for (i, p) in polys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    fmt_polygon_body(f, p)?;
                }
                write!(f, ")")
            }
        }
    }
}
