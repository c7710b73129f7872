//! Repository for geospatial layer tables.
//!
//! Tables are never updated in place: every load drops the previous table,
//! recreates it from the layer's columns and inserts all features, all in
//! one transaction on the pool.

use geoload_core::dbf::AttributeValue;
use geoload_core::layer::{Feature, Layer, GEOMETRY_COLUMN};
use geoload_core::types::WGS84;
use sha2::{Digest, Sha256};
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::DbError;
use crate::ident::{qualified, quote_ident};

/// PostgreSQL accepts at most this many bind parameters per statement.
const MAX_BIND_PARAMS: usize = 65_535;

/// PostgreSQL truncates identifiers to this many bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Writes layers into PostGIS tables.
pub struct LayerRepo;

impl LayerRepo {
    /// Replace `schema.table` with the contents of `layer`.
    ///
    /// Drop, create, batched inserts and the spatial index share one
    /// transaction. Returns the number of rows inserted.
    pub async fn replace(
        pool: &PgPool,
        schema: &str,
        table: &str,
        layer: &Layer,
        batch_rows: usize,
    ) -> Result<u64, DbError> {
        let target = qualified(schema, table)?;
        let create = create_table_sql(&target, layer)?;
        let insert = insert_sql(&target, layer)?;
        let index = create_index_sql(&target, table)?;
        let rows = rows_per_batch(layer.columns.len() + 1, batch_rows);

        let mut tx = pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {target}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&create).execute(&mut *tx).await?;

        let mut inserted = 0;
        for chunk in layer.features.chunks(rows) {
            let mut builder = QueryBuilder::<Postgres>::new(insert.as_str());
            builder.push_values(chunk, push_feature);
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
            tracing::debug!(table = %target, rows = chunk.len(), "Inserted batch");
        }

        sqlx::query(&index).execute(&mut *tx).await?;
        tx.commit().await?;
        tracing::debug!(table = %target, rows = inserted, "Table replaced");

        Ok(inserted)
    }

    /// SRID registered for the geometry column of `schema.table`.
    pub async fn geometry_srid(pool: &PgPool, schema: &str, table: &str) -> Result<i32, DbError> {
        let srid: (i32,) = sqlx::query_as("SELECT Find_SRID($1, $2, $3)")
            .bind(schema)
            .bind(table)
            .bind(GEOMETRY_COLUMN)
            .fetch_one(pool)
            .await?;
        Ok(srid.0)
    }

    /// Number of rows in `schema.table`.
    pub async fn count(pool: &PgPool, schema: &str, table: &str) -> Result<i64, DbError> {
        let query = format!("SELECT COUNT(*) FROM {}", qualified(schema, table)?);
        let count: (i64,) = sqlx::query_as(&query).fetch_one(pool).await?;
        Ok(count.0)
    }
}

fn push_feature(mut row: Separated<'_, '_, Postgres, &'static str>, feature: &Feature) {
    for value in &feature.attributes {
        match value {
            AttributeValue::Text(v) => row.push_bind(v.clone()),
            AttributeValue::Integer(v) => row.push_bind(*v),
            AttributeValue::Float(v) => row.push_bind(*v),
            AttributeValue::Boolean(v) => row.push_bind(*v),
            AttributeValue::Date(v) => row.push_bind(*v),
        };
    }
    let ewkb = feature.geometry.as_ref().map(|g| g.to_ewkb(WGS84));
    row.push("ST_GeomFromEWKB(")
        .push_bind_unseparated(ewkb)
        .push_unseparated(")");
}

/// Rows per `INSERT` so that `params_per_row * rows` stays within the
/// bind limit.
pub fn rows_per_batch(params_per_row: usize, configured: usize) -> usize {
    let cap = (MAX_BIND_PARAMS / params_per_row.max(1)).max(1);
    configured.clamp(1, cap)
}

/// `CREATE TABLE` for a layer: attribute columns then the geometry column.
pub fn create_table_sql(target: &str, layer: &Layer) -> Result<String, DbError> {
    let mut columns = Vec::with_capacity(layer.columns.len() + 1);
    for column in &layer.columns {
        columns.push(format!("{} {}", quote_ident(&column.name)?, column.kind.sql_type()));
    }
    columns.push(format!(
        "{} geometry({}, {WGS84})",
        quote_ident(GEOMETRY_COLUMN)?,
        layer.geometry_kind.postgis_name()
    ));
    Ok(format!("CREATE TABLE {target} ({})", columns.join(", ")))
}

/// `INSERT INTO ... (columns) ` prefix; `VALUES` is appended per batch.
pub fn insert_sql(target: &str, layer: &Layer) -> Result<String, DbError> {
    let mut columns = Vec::with_capacity(layer.columns.len() + 1);
    for column in &layer.columns {
        columns.push(quote_ident(&column.name)?);
    }
    columns.push(quote_ident(GEOMETRY_COLUMN)?);
    Ok(format!("INSERT INTO {target} ({}) ", columns.join(", ")))
}

/// GiST index on the geometry column, named by [`index_name`].
pub fn create_index_sql(target: &str, table: &str) -> Result<String, DbError> {
    let name = quote_ident(&index_name(table))?;
    Ok(format!(
        "CREATE INDEX {name} ON {target} USING GIST ({})",
        quote_ident(GEOMETRY_COLUMN)?
    ))
}

/// `idx_<table>_geometry`, or for long tables a shortened prefix plus a
/// digest of the full name so the result stays within the identifier limit
/// and distinct per table.
pub fn index_name(table: &str) -> String {
    let name = format!("idx_{table}_{GEOMETRY_COLUMN}");
    if name.len() <= MAX_IDENTIFIER_LEN {
        return name;
    }

    let digest = format!("{:x}", Sha256::digest(table.as_bytes()));
    let suffix = format!("_{}_{GEOMETRY_COLUMN}", &digest[..8]);
    let mut cut = MAX_IDENTIFIER_LEN - "idx_".len() - suffix.len();
    while !table.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("idx_{}{suffix}", &table[..cut])
}
