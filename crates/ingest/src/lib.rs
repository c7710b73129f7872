//! `geoload-ingest` -- the shapefile to PostGIS batch job.
//!
//! Configuration comes from the environment ([`config`]), the dataset list
//! from the built-in defaults or a JSON manifest ([`manifest`]), and
//! [`pipeline::run`] sequences connection, schemas, loads and the SQL
//! script, collecting a [`report::RunReport`].

pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod report;
