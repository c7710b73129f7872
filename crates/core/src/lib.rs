//! `geoload-core` -- database-free shapefile ingestion logic.
//!
//! Turns a shapefile on disk into a [`layer::Layer`]: typed attribute
//! rows decoded from the `.dbf`, geometries converted from the `.shp`
//! and reprojected to WGS84 using the `.prj`. Nothing in this crate
//! touches the database.

pub mod crs;
pub mod dataset;
pub mod dbf;
pub mod encoding;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
pub mod geometry;
pub mod layer;
pub mod reproject;
pub mod shape;
pub mod types;
