//! Coordinate reference system detection from `.prj` sidecars.
//!
//! A `.prj` holds WKT, either OGC flavoured (with `AUTHORITY["EPSG",...]`
//! on the root node) or ESRI flavoured (names only). The EPSG code is
//! taken from the root authority when present, otherwise inferred from
//! the well-known ESRI names for WGS84 and its UTM zones.

use std::path::Path;

use crate::error::CrsError;
use crate::types::{Srid, WGS84};

/// A source coordinate reference system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crs {
    /// Identified EPSG code, if any.
    pub epsg: Option<Srid>,
    /// Original WKT, absent when the CRS was configured as a bare code.
    pub wkt: Option<String>,
}

impl Crs {
    pub fn from_epsg(code: Srid) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    pub fn from_wkt(wkt: &str) -> Self {
        let wkt = wkt.trim_start_matches('\u{feff}').trim();
        Self {
            epsg: detect_epsg(wkt),
            wkt: Some(wkt.to_owned()),
        }
    }

    /// Read the `.prj` sidecar of `shp_path`, if there is one.
    pub fn read_prj(shp_path: &Path) -> std::io::Result<Option<Self>> {
        let prj = shp_path.with_extension("prj");
        if !prj.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(prj)?;
        let text = String::from_utf8_lossy(&bytes);
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::from_wkt(&text)))
    }

    pub fn is_wgs84(&self) -> bool {
        self.epsg == Some(WGS84)
    }

    /// PROJ.4 definition of this CRS.
    pub fn proj_string(&self) -> Result<String, CrsError> {
        if let Some(code) = self.epsg {
            return epsg_proj_string(code);
        }
        match &self.wkt {
            Some(wkt) => {
                proj4wkt::wkt_to_projstring(wkt).map_err(|e| CrsError::Wkt(format!("{e:?}")))
            }
            None => Err(CrsError::Wkt("no definition available".into())),
        }
    }
}

/// PROJ.4 definition of an EPSG code from the bundled registry.
pub fn epsg_proj_string(code: Srid) -> Result<String, CrsError> {
    u16::try_from(code)
        .ok()
        .and_then(crs_definitions::from_code)
        .map(|def| def.proj4.to_owned())
        .ok_or(CrsError::UnknownEpsg(code))
}

/// Identify the EPSG code of a WKT definition.
pub fn detect_epsg(wkt: &str) -> Option<Srid> {
    let root = RootNode::parse(wkt)?;
    if let Some(code) = root.authority {
        return Some(code);
    }

    let name = root.name.to_ascii_uppercase().replace([' ', '-'], "_");
    match root.keyword.as_str() {
        "GEOGCS" | "GEOGCRS" | "GEOGRAPHICCRS" => {
            matches!(name.as_str(), "GCS_WGS_1984" | "WGS_84" | "WGS84" | "WGS_1984").then_some(WGS84)
        }
        "PROJCS" | "PROJCRS" | "PROJECTEDCRS" => utm_zone_epsg(&name),
        _ => None,
    }
}

/// `WGS_1984_UTM_Zone_19S` or `WGS 84 / UTM zone 19S` -> 32719.
fn utm_zone_epsg(name: &str) -> Option<Srid> {
    let zone = name
        .strip_prefix("WGS_1984_UTM_ZONE_")
        .or_else(|| name.strip_prefix("WGS_84_/_UTM_ZONE_"))?;
    let (digits, hemisphere) = zone.split_at(zone.len().checked_sub(1)?);
    let number: Srid = digits.parse().ok()?;
    if !(1..=60).contains(&number) {
        return None;
    }
    match hemisphere {
        "N" => Some(32600 + number),
        "S" => Some(32700 + number),
        _ => None,
    }
}

/// Keyword, name and authority code of the outermost WKT node.
struct RootNode {
    keyword: String,
    name: String,
    authority: Option<Srid>,
}

impl RootNode {
    fn parse(wkt: &str) -> Option<Self> {
        let open = wkt.find(['[', '('])?;
        let keyword = wkt[..open].trim().to_ascii_uppercase();
        let body = &wkt[open + 1..];
        let name = first_quoted(body)?.to_owned();

        // Walk the direct children of the root, remembering the last
        // AUTHORITY/ID node seen at depth one.
        let mut authority = None;
        let mut depth = 1usize;
        let mut in_quotes = false;
        let mut token_start = 0;
        for (i, ch) in body.char_indices() {
            match ch {
                '"' => in_quotes = !in_quotes,
                _ if in_quotes => {}
                '[' | '(' => {
                    if depth == 1 {
                        let token = body[token_start..i].trim().to_ascii_uppercase();
                        if token == "AUTHORITY" || token == "ID" {
                            authority = parse_authority(&body[i + 1..]).or(authority);
                        }
                    }
                    depth += 1;
                }
                ']' | ')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                ',' => token_start = i + 1,
                _ => {}
            }
        }

        Some(Self {
            keyword,
            name,
            authority,
        })
    }
}

fn first_quoted(s: &str) -> Option<&str> {
    let start = s.find('"')? + 1;
    let len = s[start..].find('"')?;
    Some(&s[start..start + len])
}

/// `"EPSG","32719"]` or `"EPSG",32719]` -> 32719.
fn parse_authority(args: &str) -> Option<Srid> {
    let end = args.find([']', ')'])?;
    let mut parts = args[..end].split(',');
    let authority = parts.next()?.trim().trim_matches('"');
    if !authority.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    parts.next()?.trim().trim_matches('"').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OGC_UTM_19S: &str = r#"PROJCS["WGS 84 / UTM zone 19S",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],PARAMETER["latitude_of_origin",0],PARAMETER["central_meridian",-69],PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],PARAMETER["false_northing",10000000],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","32719"]]"#;

    const ESRI_UTM_19S: &str = r#"PROJCS["WGS_1984_UTM_Zone_19S",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",10000000.0],PARAMETER["Central_Meridian",-69.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    const ESRI_WGS84: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    #[test]
    fn root_authority_wins_over_nested_ones() {
        // The nested GEOGCS carries EPSG:4326; only the root code counts.
        assert_eq!(detect_epsg(OGC_UTM_19S), Some(32719));
    }

    #[test]
    fn esri_names_are_recognised() {
        assert_eq!(detect_epsg(ESRI_UTM_19S), Some(32719));
        assert_eq!(detect_epsg(ESRI_WGS84), Some(4326));
        assert!(Crs::from_wkt(ESRI_WGS84).is_wgs84());
    }

    #[test]
    fn unknown_projection_has_no_code() {
        let wkt = r#"PROJCS["SIRGAS-Chile_UTM_Zone_19S",GEOGCS["GCS_SIRGAS-Chile",DATUM["D_SIRGAS-Chile",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],UNIT["Meter",1.0]]"#;
        assert_eq!(detect_epsg(wkt), None);
        assert!(!Crs::from_wkt(wkt).is_wgs84());
    }

    #[test]
    fn wkt2_id_nodes_are_read() {
        let wkt = r#"GEOGCRS["WGS 84",DATUM["World Geodetic System 1984",ELLIPSOID["WGS 84",6378137,298.257223563]],CS[ellipsoidal,2],ID["EPSG",4326]]"#;
        assert_eq!(detect_epsg(wkt), Some(4326));
    }

    #[test]
    fn epsg_registry_lookup() {
        let proj = epsg_proj_string(32719).unwrap();
        assert!(proj.contains("+proj=utm"));
        assert!(proj.contains("+zone=19"));
        assert!(proj.contains("+south"));
        assert!(matches!(epsg_proj_string(999_999), Err(CrsError::UnknownEpsg(999_999))));
    }

    #[test]
    fn missing_prj_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("layer.shp");
        assert_eq!(Crs::read_prj(&shp).unwrap(), None);

        std::fs::write(dir.path().join("layer.prj"), ESRI_WGS84).unwrap();
        let crs = Crs::read_prj(&shp).unwrap().unwrap();
        assert_eq!(crs.epsg, Some(4326));
    }
}
