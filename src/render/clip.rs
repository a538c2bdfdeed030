//! Clipping geometry to the visible extent

use glam::DVec2;

use crate::geometry::{Geometry, Polygon};
use crate::types::Rect;

#[derive(Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    fn inside(self, p: DVec2, r: &Rect) -> bool {
        match self {
            Edge::Left => p.x >= r.min.x,
            Edge::Right => p.x <= r.max.x,
            Edge::Bottom => p.y >= r.min.y,
            Edge::Top => p.y <= r.max.y,
        }
    }

    fn intersect(self, a: DVec2, b: DVec2, r: &Rect) -> DVec2 {
        let d = b - a;
        let t = match self {
            Edge::Left => (r.min.x - a.x) / d.x,
            Edge::Right => (r.max.x - a.x) / d.x,
            Edge::Bottom => (r.min.y - a.y) / d.y,
            Edge::Top => (r.max.y - a.y) / d.y,
        };
        a + d * t
    }
}

/// Sutherland-Hodgman clip of one ring against a rectangle.
///
/// The result is an open ring; fewer than three vertices means the ring
/// lies entirely outside.
pub fn clip_ring(ring: &[DVec2], rect: &Rect) -> Vec<DVec2> {
    let mut output: Vec<DVec2> = ring.to_vec();
    if output.len() > 1 && output.first() == output.last() {
        output.pop();
    }
    for edge in [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top] {
        let input = std::mem::take(&mut output);
        let Some(&last) = input.last() else {
            break;
        };
        let mut prev = last;
        for &cur in &input {
            match (edge.inside(prev, rect), edge.inside(cur, rect)) {
                (true, true) => output.push(cur),
                (true, false) => output.push(edge.intersect(prev, cur, rect)),
                (false, true) => {
                    output.push(edge.intersect(prev, cur, rect));
                    output.push(cur);
                }
                (false, false) => {}
            }
            prev = cur;
        }
    }
    output
}

fn clip_polygon(poly: &Polygon, rect: &Rect) -> Option<Polygon> {
    let exterior = clip_ring(&poly.exterior, rect);
    if exterior.len() < 3 {
        return None;
    }
    let interiors = poly
        .interiors
        .iter()
        .map(|hole| clip_ring(hole, rect))
        .filter(|hole| hole.len() >= 3)
        .collect();
    Some(Polygon::new(exterior).with_interiors(interiors))
}

/// Clip a geometry to `rect`. Polygons are cut; points and lines are
/// kept whole or culled. `None` means nothing remains visible.
pub fn clip_geometry(geom: &Geometry, rect: &Rect) -> Option<Geometry> {
    let line_visible = |pts: &[DVec2]| {
        let mut bbox = Rect::empty();
        pts.iter().for_each(|p| bbox.expand_point(*p));
        bbox.intersects(rect)
    };

    match geom {
        Geometry::Point(p) => rect.contains(*p).then(|| geom.clone()),
        Geometry::MultiPoint(pts) => {
            let kept: Vec<DVec2> = pts.iter().copied().filter(|p| rect.contains(*p)).collect();
            (!kept.is_empty()).then_some(Geometry::MultiPoint(kept))
        }
        Geometry::LineString(pts) => line_visible(pts).then(|| geom.clone()),
        Geometry::MultiLineString(lines) => {
            let kept: Vec<Vec<DVec2>> = lines.iter().filter(|l| line_visible(l)).cloned().collect();
            (!kept.is_empty()).then_some(Geometry::MultiLineString(kept))
        }
        Geometry::Polygon(poly) => clip_polygon(poly, rect).map(Geometry::Polygon),
        Geometry::MultiPolygon(polys) => {
            let kept: Vec<Polygon> = polys.iter().filter_map(|p| clip_polygon(p, rect)).collect();
            (!kept.is_empty()).then_some(Geometry::MultiPolygon(kept))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;

    fn unit_rect() -> Rect {
        Rect::new(dvec2(0.0, 0.0), dvec2(10.0, 10.0))
    }

    #[test]
    fn ring_inside_is_unchanged() {
        let ring = vec![dvec2(1.0, 1.0), dvec2(2.0, 1.0), dvec2(2.0, 2.0)];
        assert_eq!(clip_ring(&ring, &unit_rect()), ring);
    }

    #[test]
    fn ring_overlapping_edge_is_cut() {
        let ring = vec![dvec2(5.0, 5.0), dvec2(15.0, 5.0), dvec2(15.0, 8.0), dvec2(5.0, 8.0)];
        let clipped = clip_ring(&ring, &unit_rect());
        assert!(clipped.iter().all(|p| p.x <= 10.0));
        let poly = Geometry::Polygon(Polygon::new(clipped));
        assert!((poly.area() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn outside_geometries_are_culled() {
        let rect = unit_rect();
        assert!(clip_geometry(&Geometry::point(20.0, 20.0), &rect).is_none());
        assert!(clip_geometry(&Geometry::line_string([(20.0, 20.0), (30.0, 30.0)]), &rect).is_none());
        assert!(clip_geometry(&Geometry::polygon([(20.0, 20.0), (30.0, 20.0), (30.0, 30.0)]), &rect).is_none());
        assert!(clip_geometry(&Geometry::line_string([(-5.0, 5.0), (15.0, 5.0)]), &rect).is_some());
    }
}
