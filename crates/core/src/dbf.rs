//! dBase III/IV (`.dbf`) attribute table reader.
//!
//! Field values are sliced out of the fixed-width records as raw bytes so
//! that text can be repaired with [`crate::encoding::reencode`] before it
//! is ever interpreted; field names go through the same repair. Only the subset of field types that shapefile
//! producers emit is decoded; anything else is kept as text.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::encoding::{reencode, TextPolicy};
use crate::error::DbfError;

/// Size of the fixed table header and of each field descriptor.
const BLOCK_LEN: usize = 32;

/// Terminates the field descriptor array.
const HEADER_TERMINATOR: u8 = 0x0D;

/// Marks a deleted record in its first byte.
const DELETED_FLAG: u8 = b'*';

/// Widest `N` field that still fits an `i64`.
const MAX_INTEGER_WIDTH: u8 = 18;

/// Field type letter from the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Character,
    Numeric,
    Float,
    Logical,
    Date,
    /// Visual FoxPro 4-byte little-endian integer.
    Integer,
    Other(u8),
}

impl From<u8> for FieldType {
    fn from(b: u8) -> Self {
        match b.to_ascii_uppercase() {
            b'C' => Self::Character,
            b'N' => Self::Numeric,
            b'F' => Self::Float,
            b'L' => Self::Logical,
            b'D' => Self::Date,
            b'I' => Self::Integer,
            other => Self::Other(other),
        }
    }
}

/// Column type a field is loaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
}

impl ColumnKind {
    /// PostgreSQL column type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "BIGINT",
            Self::Float => "DOUBLE PRECISION",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
        }
    }
}

/// A decoded field descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Re-encoded field name, case preserved.
    pub name: String,
    pub field_type: FieldType,
    pub length: u8,
    pub decimals: u8,
}

impl Field {
    pub fn column_kind(&self) -> ColumnKind {
        match self.field_type {
            FieldType::Character | FieldType::Other(_) => ColumnKind::Text,
            FieldType::Numeric if self.decimals == 0 && self.length <= MAX_INTEGER_WIDTH => {
                ColumnKind::Integer
            }
            FieldType::Numeric | FieldType::Float => ColumnKind::Float,
            FieldType::Logical => ColumnKind::Boolean,
            FieldType::Date => ColumnKind::Date,
            FieldType::Integer => ColumnKind::Integer,
        }
    }
}

/// One typed attribute value. `None` is SQL `NULL`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Float(Option<f64>),
    Boolean(Option<bool>),
    Date(Option<NaiveDate>),
}

/// A fully decoded attribute table.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTable {
    pub fields: Vec<Field>,
    /// One entry per stored record, in file order. Deleted records are
    /// `None` so that record indices stay aligned with shape indices.
    pub records: Vec<Option<Vec<AttributeValue>>>,
    /// Total bytes discarded while repairing text.
    pub dropped_bytes: usize,
}

impl AttributeTable {
    pub fn live_records(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }
}

/// Read and decode the `.dbf` file at `path`.
pub fn read_table(path: &Path, policy: TextPolicy) -> Result<AttributeTable, DbfError> {
    let bytes = std::fs::read(path)?;
    parse_table(&bytes, policy)
}

/// Decode an in-memory `.dbf` image.
///
/// The declared layout is checked against the image before any record is
/// read, so a corrupt header fails with an error instead of sizing buffers
/// from untrusted counts.
pub fn parse_table(bytes: &[u8], policy: TextPolicy) -> Result<AttributeTable, DbfError> {
    if bytes.len() < BLOCK_LEN {
        return Err(DbfError::TruncatedHeader {
            expected: BLOCK_LEN,
            actual: bytes.len(),
        });
    }

    let record_count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let record_len = u16::from_le_bytes([bytes[10], bytes[11]]) as usize;

    if header_len <= BLOCK_LEN {
        return Err(DbfError::InvalidHeaderLength(header_len));
    }
    if bytes.len() < header_len {
        return Err(DbfError::TruncatedHeader {
            expected: header_len,
            actual: bytes.len(),
        });
    }

    let mut tally = Tally::default();
    let mut fields = Vec::new();
    let mut offset = BLOCK_LEN;
    while offset + BLOCK_LEN <= header_len && bytes[offset] != HEADER_TERMINATOR {
        let descriptor = &bytes[offset..offset + BLOCK_LEN];
        let raw_name = trim_nul(&descriptor[..11]);
        let recoded = reencode(raw_name, policy);
        tally.dropped_bytes += recoded.dropped_bytes;

        let name = if recoded.text.trim().is_empty() {
            format!("field_{}", fields.len() + 1)
        } else {
            recoded.text.trim().to_owned()
        };

        fields.push(Field {
            name,
            field_type: FieldType::from(descriptor[11]),
            length: descriptor[16],
            decimals: descriptor[17],
        });
        offset += BLOCK_LEN;
    }

    // Deletion flag plus every field width.
    let required = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();
    if record_len < required {
        return Err(DbfError::InvalidRecordLength {
            declared: record_len,
            required,
        });
    }

    let available = (bytes.len() - header_len) / record_len;
    if available < record_count {
        return Err(DbfError::TruncatedRecord { index: available });
    }

    let mut records = Vec::with_capacity(record_count);
    for index in 0..record_count {
        let start = header_len + index * record_len;
        let record = &bytes[start..start + record_len];

        if record[0] == DELETED_FLAG {
            records.push(None);
            continue;
        }

        let mut values = Vec::with_capacity(fields.len());
        let mut cursor = 1;
        for field in &fields {
            let width = field.length as usize;
            let raw = &record[cursor..cursor + width];
            values.push(decode_value(field, raw, policy, &mut tally)?);
            cursor += width;
        }
        records.push(Some(values));
    }

    if tally.truncated > 0 {
        tracing::warn!(
            values = tally.truncated,
            "Fractional values in integer fields were truncated"
        );
    }

    Ok(AttributeTable {
        fields,
        records,
        dropped_bytes: tally.dropped_bytes,
    })
}

/// Repairs made while decoding, reported once per table.
#[derive(Debug, Default)]
struct Tally {
    dropped_bytes: usize,
    truncated: usize,
}

fn decode_value(
    field: &Field,
    raw: &[u8],
    policy: TextPolicy,
    tally: &mut Tally,
) -> Result<AttributeValue, DbfError> {
    match field.column_kind() {
        ColumnKind::Text => {
            let recoded = reencode(trim_trailing(raw), policy);
            tally.dropped_bytes += recoded.dropped_bytes;
            Ok(AttributeValue::Text(Some(recoded.text)))
        }
        ColumnKind::Integer if field.field_type == FieldType::Integer => {
            let bytes: [u8; 4] = raw
                .try_into()
                .map_err(|_| invalid(field, "integer", raw))?;
            Ok(AttributeValue::Integer(Some(i32::from_le_bytes(bytes) as i64)))
        }
        ColumnKind::Integer => {
            let value = match numeric_text(raw) {
                None => None,
                Some(text) => {
                    let (value, exact) =
                        parse_integer(text).ok_or_else(|| invalid(field, "integer", raw))?;
                    if !exact {
                        tracing::debug!(field = %field.name, raw = text, value, "Truncated fraction");
                        tally.truncated += 1;
                    }
                    Some(value)
                }
            };
            Ok(AttributeValue::Integer(value))
        }
        ColumnKind::Float => {
            let value = match numeric_text(raw) {
                None => None,
                Some(text) => Some(
                    text.parse::<f64>()
                        .map_err(|_| invalid(field, "numeric", raw))?,
                ),
            };
            Ok(AttributeValue::Float(value))
        }
        ColumnKind::Boolean => {
            let value = match raw.first().copied().unwrap_or(b'?') {
                b'T' | b't' | b'Y' | b'y' => Some(true),
                b'F' | b'f' | b'N' | b'n' => Some(false),
                _ => None,
            };
            Ok(AttributeValue::Boolean(value))
        }
        ColumnKind::Date => {
            let text = String::from_utf8_lossy(raw);
            let text = text.trim();
            let value = if text.is_empty() || text.bytes().all(|b| b == b'0') {
                None
            } else {
                Some(
                    NaiveDate::parse_from_str(text, "%Y%m%d")
                        .map_err(|_| invalid(field, "date", raw))?,
                )
            };
            Ok(AttributeValue::Date(value))
        }
    }
}

/// Numeric cell contents, or `None` when the cell is blank or overflowed
/// (filled with `*`).
fn numeric_text(raw: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(raw).ok()?.trim();
    if text.is_empty() || text.bytes().all(|b| b == b'*') {
        None
    } else {
        Some(text)
    }
}

/// Integer value of an `N` cell and whether it was exact. Producers
/// sometimes write fractions into zero-decimal fields; those are truncated
/// toward zero.
fn parse_integer(text: &str) -> Option<(i64, bool)> {
    if let Ok(v) = text.parse::<i64>() {
        return Some((v, true));
    }
    let v = text.parse::<f64>().ok()?;
    (v.is_finite() && v.abs() < i64::MAX as f64).then(|| (v.trunc() as i64, v.fract() == 0.0))
}

fn invalid(field: &Field, kind: &'static str, raw: &[u8]) -> DbfError {
    DbfError::InvalidValue {
        field: field.name.clone(),
        kind,
        raw: String::from_utf8_lossy(raw).into_owned(),
    }
}

fn trim_nul(raw: &[u8]) -> &[u8] {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    &raw[..end]
}

fn trim_trailing(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    &raw[..end]
}
