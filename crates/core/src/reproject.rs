//! Reprojection of layer geometries to WGS84.

use std::fmt;

use proj4rs::proj::Proj;

use crate::crs::{epsg_proj_string, Crs};
use crate::error::CrsError;
use crate::geometry::Geometry;
use crate::types::WGS84;

/// What has to happen to a layer's coordinates to land in WGS84.
pub enum Reprojection {
    /// Source is already WGS84; coordinates are left untouched.
    Identity,
    Transform(Box<Transformer>),
}

impl Reprojection {
    /// Plan the reprojection of `source` into WGS84.
    pub fn to_wgs84(source: &Crs) -> Result<Self, CrsError> {
        if source.is_wgs84() {
            return Ok(Self::Identity);
        }
        let target = epsg_proj_string(WGS84)?;
        let transformer = Transformer::new(&source.proj_string()?, &target)?;
        Ok(Self::Transform(Box::new(transformer)))
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Reproject `geometry` in place.
    pub fn apply(&self, geometry: &mut Geometry) -> Result<(), CrsError> {
        match self {
            Self::Identity => Ok(()),
            Self::Transform(t) => t.apply(geometry),
        }
    }
}

impl fmt::Debug for Reprojection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::Transform(t) => f.debug_tuple("Transform").field(t).finish(),
        }
    }
}

/// A PROJ.4 source/target pair.
///
/// `proj4rs` works in radians for geographic systems, so degrees are
/// converted on the way in and out.
pub struct Transformer {
    source_definition: String,
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
}

impl Transformer {
    pub fn new(source: &str, target: &str) -> Result<Self, CrsError> {
        Ok(Self {
            source_definition: source.to_owned(),
            source: parse_proj(source)?,
            target: parse_proj(target)?,
            source_geographic: is_geographic(source),
            target_geographic: is_geographic(target),
        })
    }

    pub fn apply(&self, geometry: &mut Geometry) -> Result<(), CrsError> {
        geometry.try_for_each_coord_mut(|c| {
            let mut point = if self.source_geographic {
                (c.x.to_radians(), c.y.to_radians(), 0.0)
            } else {
                (c.x, c.y, 0.0)
            };
            proj4rs::transform::transform(&self.source, &self.target, &mut point)
                .map_err(|e| CrsError::Transform(e.to_string()))?;
            if self.target_geographic {
                c.x = point.0.to_degrees();
                c.y = point.1.to_degrees();
            } else {
                c.x = point.0;
                c.y = point.1;
            }
            Ok(())
        })
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("source", &self.source_definition)
            .finish_non_exhaustive()
    }
}

fn parse_proj(definition: &str) -> Result<Proj, CrsError> {
    Proj::from_proj_string(definition).map_err(|e| CrsError::Projection {
        definition: definition.to_owned(),
        message: e.to_string(),
    })
}

fn is_geographic(definition: &str) -> bool {
    definition.split_whitespace().any(|token| {
        matches!(
            token,
            "+proj=longlat" | "+proj=latlong" | "+proj=lonlat" | "+proj=latlon"
        )
    })
}
