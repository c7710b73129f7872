//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. DDL on
//! the shared connection takes `&mut PgConnection`; bulk writes take the
//! pool.

pub mod layer_repo;
pub mod schema_repo;

pub use layer_repo::LayerRepo;
pub use schema_repo::SchemaRepo;
