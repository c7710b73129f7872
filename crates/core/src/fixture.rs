//! Writers for small point shapefiles used by tests across the workspace.
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `fixtures` feature.

use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, ShapeWriter};

/// ESRI `.prj` for WGS84 geographic coordinates.
pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// ESRI `.prj` for WGS84 / UTM zone 19S (EPSG:32719).
pub const UTM_19S_PRJ: &str = r#"PROJCS["WGS_1984_UTM_Zone_19S",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",10000000.0],PARAMETER["Central_Meridian",-69.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

/// A dBase field descriptor: name, type letter, width, decimals.
#[derive(Debug, Clone)]
pub struct FixtureField {
    pub name: String,
    pub kind: u8,
    pub length: u8,
    pub decimals: u8,
}

impl FixtureField {
    pub fn new(name: &str, kind: u8, length: u8, decimals: u8) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            length,
            decimals,
        }
    }
}

/// A dBase record: deletion flag plus raw cell bytes (padded on write).
#[derive(Debug, Clone)]
pub struct FixtureRecord {
    pub deleted: bool,
    pub cells: Vec<Vec<u8>>,
}

/// Builder for a point shapefile with `.shp`, `.shx`, `.dbf` and optional `.prj`.
#[derive(Debug, Clone, Default)]
pub struct PointShapefile {
    fields: Vec<FixtureField>,
    points: Vec<(f64, f64)>,
    records: Vec<FixtureRecord>,
    prj: Option<String>,
}

impl PointShapefile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, kind: u8, length: u8, decimals: u8) -> Self {
        self.fields.push(FixtureField::new(name, kind, length, decimals));
        self
    }

    pub fn prj(mut self, wkt: &str) -> Self {
        self.prj = Some(wkt.to_owned());
        self
    }

    pub fn point(self, x: f64, y: f64, cells: &[&str]) -> Self {
        let cells = cells.iter().map(|c| c.as_bytes().to_vec()).collect();
        self.raw_point(x, y, false, cells)
    }

    /// Add a point whose record carries raw bytes and an explicit deletion flag.
    pub fn raw_point(mut self, x: f64, y: f64, deleted: bool, cells: Vec<Vec<u8>>) -> Self {
        self.points.push((x, y));
        self.records.push(FixtureRecord { deleted, cells });
        self
    }

    /// Write `<dir>/<stem>.*` and return the `.shp` path.
    pub fn write(&self, dir: &Path, stem: &str) -> io::Result<PathBuf> {
        let shp = dir.join(format!("{stem}.shp"));
        let points: Vec<Point> = self.points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        ShapeWriter::from_path(&shp)
            .and_then(|writer| writer.write_shapes(&points))
            .map_err(|e| io::Error::other(e.to_string()))?;
        std::fs::write(shp.with_extension("dbf"), dbf_bytes(&self.fields, &self.records)?)?;
        if let Some(prj) = &self.prj {
            std::fs::write(shp.with_extension("prj"), prj)?;
        }
        Ok(shp)
    }
}

/// Encode a dBase table.
///
/// The layout comes from the `dbase` table writer; cells are then stored
/// byte for byte so tests can plant legacy encodings, malformed numbers and
/// deletion flags that the typed writer refuses to produce.
pub fn dbf_bytes(fields: &[FixtureField], records: &[FixtureRecord]) -> io::Result<Vec<u8>> {
    let mut builder = TableWriterBuilder::new();
    let mut blank = Record::default();
    for field in fields {
        let name = FieldName::try_from(field.name.as_str()).map_err(io::Error::other)?;
        let (next, value) = match field.kind {
            b'C' => (
                builder.add_character_field(name, field.length),
                FieldValue::Character(None),
            ),
            b'N' => (
                builder.add_numeric_field(name, field.length, field.decimals),
                FieldValue::Numeric(None),
            ),
            b'F' => (
                builder.add_float_field(name, field.length, field.decimals),
                FieldValue::Float(None),
            ),
            b'L' => (builder.add_logical_field(name), FieldValue::Logical(None)),
            b'D' => (builder.add_date_field(name), FieldValue::Date(None)),
            b'I' => (builder.add_integer_field(name), FieldValue::Integer(0)),
            other => {
                return Err(io::Error::other(format!(
                    "unsupported field type '{}'",
                    other as char
                )))
            }
        };
        builder = next;
        blank.insert(field.name.clone(), value);
    }

    let mut image = Cursor::new(Vec::new());
    {
        let mut writer = builder.build_with_dest(&mut image);
        for _ in records {
            writer
                .write_record(&blank)
                .map_err(|e| io::Error::other(e.to_string()))?;
        }
        writer
            .close()
            .map_err(|e| io::Error::other(e.to_string()))?;
    }
    let mut bytes = image.into_inner();

    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let record_len = u16::from_le_bytes([bytes[10], bytes[11]]) as usize;
    for (index, record) in records.iter().enumerate() {
        let mut offset = header_len + index * record_len;
        bytes[offset] = if record.deleted { b'*' } else { b' ' };
        offset += 1;
        for (field, cell) in fields.iter().zip(&record.cells) {
            let width = field.length as usize;
            let mut padded = cell.clone();
            padded.resize(width, b' ');
            bytes[offset..offset + width].copy_from_slice(&padded);
            offset += width;
        }
    }
    Ok(bytes)
}
