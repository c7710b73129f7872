//! Legacy-to-UTF-8 text repair for dBase attribute values and field names.
//!
//! Attribute bytes are read as Latin-1, i.e. one raw byte per character.
//! Most sources in practice hold UTF-8 text behind a Latin-1 code page
//! mark, so the repair reinterprets those raw bytes as UTF-8. What happens
//! to byte sequences that are not valid UTF-8 is governed by
//! [`TextPolicy`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How to treat attribute bytes that are not valid UTF-8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPolicy {
    /// Keep the valid UTF-8 runs and drop every invalid byte.
    #[default]
    Drop,
    /// Decode the whole value as Windows-1252 (the Latin-1 superset).
    Legacy,
}

impl TextPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for TextPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown text policy '{other}' (expected 'drop' or 'legacy')")),
        }
    }
}

/// Result of re-encoding one raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recoded {
    pub text: String,
    /// Bytes discarded by [`TextPolicy::Drop`].
    pub dropped_bytes: usize,
}

/// Re-encode raw legacy bytes as a UTF-8 string.
pub fn reencode(raw: &[u8], policy: TextPolicy) -> Recoded {
    if let Ok(text) = std::str::from_utf8(raw) {
        return Recoded {
            text: text.to_owned(),
            dropped_bytes: 0,
        };
    }

    match policy {
        TextPolicy::Drop => {
            let mut text = String::with_capacity(raw.len());
            let mut dropped_bytes = 0;
            for chunk in raw.utf8_chunks() {
                text.push_str(chunk.valid());
                dropped_bytes += chunk.invalid().len();
            }
            Recoded {
                text,
                dropped_bytes,
            }
        }
        TextPolicy::Legacy => {
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(raw);
            Recoded {
                text: text.into_owned(),
                dropped_bytes: 0,
            }
        }
    }
}
