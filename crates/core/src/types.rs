/// EPSG code identifying a spatial reference system.
pub type Srid = u32;

/// WGS84 latitude/longitude. Every loaded table is stored in this system.
pub const WGS84: Srid = 4326;
