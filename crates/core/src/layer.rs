//! Shapefile to [`Layer`]: attributes, geometry and CRS in one pass.

use std::collections::HashSet;
use std::path::Path;

use crate::crs::Crs;
use crate::dbf::{self, AttributeValue, ColumnKind};
use crate::encoding::TextPolicy;
use crate::error::LayerError;
use crate::geometry::{Geometry, GeometryKind};
use crate::reproject::Reprojection;
use crate::shape;
use crate::types::Srid;

/// Name of the geometry column written for every layer.
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Options that control how a shapefile is read.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub text_policy: TextPolicy,
    /// EPSG code assumed when the shapefile ships no `.prj`.
    pub fallback_srid: Option<Srid>,
}

/// An attribute column of a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// One row: attribute values in column order plus an optional geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub attributes: Vec<AttributeValue>,
    pub geometry: Option<Geometry>,
}

/// A shapefile decoded and reprojected to WGS84.
#[derive(Debug, Clone)]
pub struct Layer {
    pub columns: Vec<Column>,
    pub features: Vec<Feature>,
    /// Common kind of all geometries; drives the column type.
    pub geometry_kind: GeometryKind,
    /// CRS the data was read in.
    pub source_crs: Crs,
    /// Whether any coordinate transformation was applied.
    pub reprojected: bool,
    /// Bytes discarded while repairing attribute text.
    pub dropped_bytes: usize,
}

impl Layer {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Read the shapefile at `path` and bring it into WGS84.
pub fn read_layer(path: &Path, options: &ReadOptions) -> Result<Layer, LayerError> {
    if !path.exists() {
        return Err(LayerError::NotFound(path.to_path_buf()));
    }

    let source_crs = match Crs::read_prj(path).map_err(|source| LayerError::Projection {
        path: path.with_extension("prj"),
        source,
    })? {
        Some(crs) => crs,
        None => match options.fallback_srid {
            Some(code) => {
                tracing::warn!(path = %path.display(), srid = code, "No .prj found, assuming fallback SRID");
                Crs::from_epsg(code)
            }
            None => return Err(LayerError::MissingCrs(path.to_path_buf())),
        },
    };

    let dbf_path = path.with_extension("dbf");
    let table = dbf::read_table(&dbf_path, options.text_policy).map_err(|source| {
        LayerError::Attributes {
            path: dbf_path.clone(),
            source,
        }
    })?;
    let shapes = shape::read_shapes(path)?;

    if shapes.len() != table.records.len() {
        return Err(LayerError::CountMismatch {
            shapes: shapes.len(),
            records: table.records.len(),
        });
    }

    let columns = unique_columns(
        table
            .fields
            .iter()
            .map(|f| Column {
                name: f.name.clone(),
                kind: f.column_kind(),
            })
            .collect(),
    );

    let mut features = Vec::with_capacity(table.live_records());
    for (shape, record) in shapes.iter().zip(table.records) {
        let Some(attributes) = record else {
            continue;
        };
        features.push(Feature {
            attributes,
            geometry: shape::to_geometry(shape)?,
        });
    }

    let reprojection = Reprojection::to_wgs84(&source_crs)?;
    if !reprojection.is_identity() {
        tracing::info!(
            path = %path.display(),
            source_srid = ?source_crs.epsg,
            "Reprojecting to EPSG:4326"
        );
        for geometry in features.iter_mut().filter_map(|f| f.geometry.as_mut()) {
            reprojection.apply(geometry)?;
        }
    }

    let geometry_kind = normalize_kinds(&mut features);

    if table.dropped_bytes > 0 {
        tracing::warn!(
            path = %dbf_path.display(),
            dropped_bytes = table.dropped_bytes,
            "Dropped bytes that are not valid UTF-8"
        );
    }

    Ok(Layer {
        columns,
        features,
        geometry_kind,
        source_crs,
        reprojected: !reprojection.is_identity(),
        dropped_bytes: table.dropped_bytes,
    })
}

/// Settle on one geometry kind for the layer, promoting single-part
/// geometries when the layer mixes them with their multi variant.
fn normalize_kinds(features: &mut [Feature]) -> GeometryKind {
    let kind = GeometryKind::common(
        features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .map(Geometry::kind),
    );

    if matches!(
        kind,
        GeometryKind::MultiPoint | GeometryKind::MultiLineString | GeometryKind::MultiPolygon
    ) {
        for feature in features.iter_mut() {
            if let Some(g) = feature.geometry.take() {
                feature.geometry = Some(g.into_multi());
            }
        }
    }
    kind
}

/// Make column names unique and keep them clear of the geometry column.
fn unique_columns(columns: Vec<Column>) -> Vec<Column> {
    let mut taken: HashSet<String> = HashSet::from([GEOMETRY_COLUMN.to_owned()]);
    columns
        .into_iter()
        .map(|mut column| {
            let base = column.name.clone();
            let mut suffix = 1;
            while !taken.insert(column.name.clone()) {
                column.name = format!("{base}_{suffix}");
                suffix += 1;
            }
            column
        })
        .collect()
}
