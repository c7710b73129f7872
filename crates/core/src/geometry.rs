//! Planar geometry model and its PostGIS EWKB encoding.

use serde::Serialize;

use crate::types::Srid;

/// EWKB flag announcing an embedded SRID after the type word.
const EWKB_SRID_FLAG: u32 = 0x2000_0000;

/// NDR (little-endian) byte-order marker.
const WKB_LITTLE_ENDIAN: u8 = 1;

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A line or ring as an ordered list of coordinates.
pub type Line = Vec<Coord>;

/// Polygon rings; the first ring is the exterior, the rest are holes.
pub type Rings = Vec<Line>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Line),
    Polygon(Rings),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Line>),
    MultiPolygon(Vec<Rings>),
}

/// Geometry type as declared on a PostGIS column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    /// Mixed or unknown content.
    Geometry,
}

impl GeometryKind {
    /// Type name used in `geometry(<TYPE>, <SRID>)`.
    pub fn postgis_name(&self) -> &'static str {
        match self {
            Self::Point => "POINT",
            Self::LineString => "LINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPoint => "MULTIPOINT",
            Self::MultiLineString => "MULTILINESTRING",
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::Geometry => "GEOMETRY",
        }
    }

    fn wkb_code(&self) -> u32 {
        match self {
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
            Self::MultiPoint => 4,
            Self::MultiLineString => 5,
            Self::MultiPolygon => 6,
            Self::Geometry => 0,
        }
    }

    /// The multi variant of a single-part kind.
    pub fn multi(&self) -> Self {
        match self {
            Self::Point => Self::MultiPoint,
            Self::LineString => Self::MultiLineString,
            Self::Polygon => Self::MultiPolygon,
            other => *other,
        }
    }

    /// Column kind able to hold every kind in `kinds`.
    ///
    /// Identical kinds keep their type. A mix of the single and multi
    /// variant of one family is promoted to the multi variant. Anything
    /// else, including an empty input, is `Geometry`.
    pub fn common<I: IntoIterator<Item = GeometryKind>>(kinds: I) -> Self {
        let mut acc: Option<GeometryKind> = None;
        for kind in kinds {
            acc = Some(match acc {
                None => kind,
                Some(prev) if prev == kind => prev,
                Some(prev) if prev.multi() == kind.multi() => kind.multi(),
                Some(_) => return Self::Geometry,
            });
        }
        acc.unwrap_or(Self::Geometry)
    }
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::LineString(_) => GeometryKind::LineString,
            Self::Polygon(_) => GeometryKind::Polygon,
            Self::MultiPoint(_) => GeometryKind::MultiPoint,
            Self::MultiLineString(_) => GeometryKind::MultiLineString,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Wrap a single-part geometry into its multi variant.
    pub fn into_multi(self) -> Self {
        match self {
            Self::Point(c) => Self::MultiPoint(vec![c]),
            Self::LineString(p) => Self::MultiLineString(vec![p]),
            Self::Polygon(r) => Self::MultiPolygon(vec![r]),
            multi => multi,
        }
    }

    /// Apply `f` to every coordinate in place, stopping at the first error.
    pub fn try_for_each_coord_mut<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&mut Coord) -> Result<(), E>,
    {
        match self {
            Self::Point(c) => f(c),
            Self::LineString(p) | Self::MultiPoint(p) => p.iter_mut().try_for_each(&mut f),
            Self::Polygon(rings) | Self::MultiLineString(rings) => rings
                .iter_mut()
                .flat_map(|r| r.iter_mut())
                .try_for_each(&mut f),
            Self::MultiPolygon(polys) => polys
                .iter_mut()
                .flat_map(|p| p.iter_mut())
                .flat_map(|r| r.iter_mut())
                .try_for_each(&mut f),
        }
    }

    /// Encode as little-endian EWKB carrying `srid`.
    pub fn to_ewkb(&self, srid: Srid) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.push(WKB_LITTLE_ENDIAN);
        out.extend_from_slice(&(self.kind().wkb_code() | EWKB_SRID_FLAG).to_le_bytes());
        out.extend_from_slice(&srid.to_le_bytes());
        self.write_body(&mut out);
        out
    }

    fn write_body(&self, out: &mut Vec<u8>) {
        match self {
            Self::Point(c) => write_coord(out, c),
            Self::LineString(p) => write_path(out, p),
            Self::Polygon(rings) => write_rings(out, rings),
            Self::MultiPoint(points) => {
                write_len(out, points.len());
                for c in points {
                    write_header(out, GeometryKind::Point);
                    write_coord(out, c);
                }
            }
            Self::MultiLineString(lines) => {
                write_len(out, lines.len());
                for p in lines {
                    write_header(out, GeometryKind::LineString);
                    write_path(out, p);
                }
            }
            Self::MultiPolygon(polys) => {
                write_len(out, polys.len());
                for rings in polys {
                    write_header(out, GeometryKind::Polygon);
                    write_rings(out, rings);
                }
            }
        }
    }
}

fn write_header(out: &mut Vec<u8>, kind: GeometryKind) {
    out.push(WKB_LITTLE_ENDIAN);
    out.extend_from_slice(&kind.wkb_code().to_le_bytes());
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u32).to_le_bytes());
}

fn write_coord(out: &mut Vec<u8>, c: &Coord) {
    out.extend_from_slice(&c.x.to_le_bytes());
    out.extend_from_slice(&c.y.to_le_bytes());
}

fn write_path(out: &mut Vec<u8>, path: &[Coord]) {
    write_len(out, path.len());
    for c in path {
        write_coord(out, c);
    }
}

fn write_rings(out: &mut Vec<u8>, rings: &[Line]) {
    write_len(out, rings.len());
    for ring in rings {
        write_path(out, ring);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ewkb_layout() {
        let ewkb = Geometry::Point(Coord::new(-70.68, -33.45)).to_ewkb(4326);

        assert_eq!(ewkb.len(), 1 + 4 + 4 + 16);
        assert_eq!(ewkb[0], 1);
        assert_eq!(&ewkb[1..5], &0x2000_0001u32.to_le_bytes());
        assert_eq!(&ewkb[5..9], &4326u32.to_le_bytes());
        assert_eq!(&ewkb[9..17], &(-70.68f64).to_le_bytes());
        assert_eq!(&ewkb[17..25], &(-33.45f64).to_le_bytes());
    }

    #[test]
    fn multipolygon_members_carry_no_srid() {
        let square = vec![
            Coord::new(0.0, 0.0),
            Coord::new(0.0, 1.0),
            Coord::new(1.0, 1.0),
            Coord::new(0.0, 0.0),
        ];
        let ewkb = Geometry::MultiPolygon(vec![vec![square]]).to_ewkb(4326);

        // header(9) + count(4) + member header(5) + rings(4) + points(4) + 4 * 16
        assert_eq!(ewkb.len(), 9 + 4 + 5 + 4 + 4 + 64);
        assert_eq!(&ewkb[13..18], &[1, 3, 0, 0, 0]);
    }

    #[test]
    fn common_kind_promotes_within_a_family() {
        use GeometryKind as K;
        assert_eq!(K::common([K::Polygon, K::Polygon]), K::Polygon);
        assert_eq!(K::common([K::Polygon, K::MultiPolygon]), K::MultiPolygon);
        assert_eq!(
            K::common([K::LineString, K::MultiLineString, K::LineString]),
            K::MultiLineString
        );
        assert_eq!(K::common([K::Point, K::Polygon]), K::Geometry);
        assert_eq!(K::common(Vec::new()), K::Geometry);
    }

    #[test]
    fn for_each_coord_visits_every_vertex() {
        let mut g = Geometry::MultiLineString(vec![
            vec![Coord::new(1.0, 1.0), Coord::new(2.0, 2.0)],
            vec![Coord::new(3.0, 3.0)],
        ]);
        let mut seen = 0;
        g.try_for_each_coord_mut(|c| {
            c.x *= 10.0;
            seen += 1;
            Ok::<_, ()>(())
        })
        .unwrap();

        assert_eq!(seen, 3);
        assert_eq!(
            g,
            Geometry::MultiLineString(vec![
                vec![Coord::new(10.0, 1.0), Coord::new(20.0, 2.0)],
                vec![Coord::new(30.0, 3.0)],
            ])
        );
    }
}
