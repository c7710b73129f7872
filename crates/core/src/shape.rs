//! Conversion from `shapefile` records into [`Geometry`].
//!
//! M and Z variants are flattened to 2D. Polygon rings arrive already
//! classified by winding order: each outer ring opens a new polygon and
//! the inner rings that follow are its holes.

use std::path::Path;

use shapefile::{Point, PointM, PointZ, PolygonRing, Shape};

use crate::error::LayerError;
use crate::geometry::{Coord, Geometry, Line, Rings};

/// Read every shape record of the `.shp` file at `path`.
pub fn read_shapes(path: &Path) -> Result<Vec<Shape>, LayerError> {
    shapefile::read_shapes(path).map_err(|source| LayerError::Shapes {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert one shape. Null shapes yield `None`.
pub fn to_geometry(shape: &Shape) -> Result<Option<Geometry>, LayerError> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => Geometry::Point(p.coord()),
        Shape::PointM(p) => Geometry::Point(p.coord()),
        Shape::PointZ(p) => Geometry::Point(p.coord()),
        Shape::Multipoint(m) => points(m.points()),
        Shape::MultipointM(m) => points(m.points()),
        Shape::MultipointZ(m) => points(m.points()),
        Shape::Polyline(l) => lines(l.parts()),
        Shape::PolylineM(l) => lines(l.parts()),
        Shape::PolylineZ(l) => lines(l.parts()),
        Shape::Polygon(p) => polygons(p.rings()),
        Shape::PolygonM(p) => polygons(p.rings()),
        Shape::PolygonZ(p) => polygons(p.rings()),
        other => {
            return Err(LayerError::UnsupportedShape(format!("{:?}", other.shapetype())));
        }
    };
    Ok(Some(geometry))
}

/// Access to the planar part of every shapefile point flavour.
trait Planar {
    fn coord(&self) -> Coord;
}

impl Planar for Point {
    fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

impl Planar for PointM {
    fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

impl Planar for PointZ {
    fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

fn line<P: Planar>(points: &[P]) -> Line {
    points.iter().map(Planar::coord).collect()
}

fn points<P: Planar>(points: &[P]) -> Geometry {
    Geometry::MultiPoint(line(points))
}

fn lines<P: Planar>(parts: &[Vec<P>]) -> Geometry {
    let mut lines: Vec<Line> = parts.iter().map(|part| line(part)).collect();
    if lines.len() == 1 {
        Geometry::LineString(lines.remove(0))
    } else {
        Geometry::MultiLineString(lines)
    }
}

fn polygons<P: Planar>(rings: &[PolygonRing<P>]) -> Geometry {
    let mut polygons: Vec<Rings> = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => polygons.push(vec![line(points)]),
            PolygonRing::Inner(points) => match polygons.last_mut() {
                Some(polygon) => polygon.push(line(points)),
                // A hole with no preceding shell is kept as its own polygon.
                None => polygons.push(vec![line(points)]),
            },
        }
    }
    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(polygons)
    }
}
