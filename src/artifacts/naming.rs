//! Artifact naming grammar.
//!
//! Every stage finds its inputs by file name alone, so these functions are the
//! whole lineage protocol:
//!
//! - raw:        `ingest_<source>_<YYYYMMDD>_<HHMMSS>.json`
//! - normalized: `processed_<core>_<YYYYMMDD>_<HHMMSS>.{csv,json}`
//! - enriched:   `enriched_<core>.csv`

use std::path::Path;

use chrono::NaiveDateTime;

pub const RAW_PREFIX: &str = "ingest";
pub const PROCESSED_PREFIX: &str = "processed";
pub const ENRICHED_PREFIX: &str = "enriched";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Raw,
    Processed,
    Enriched,
}

/// `20240101_120000` style stamp used in raw and normalized names.
pub fn format_stamp(at: NaiveDateTime) -> String {
    at.format(STAMP_FORMAT).to_string()
}

pub fn parse_stamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{}_{}", date, time), STAMP_FORMAT).ok()
}

/// Derive the file-safe source name from a search target.
/// `repo:apache/superset is:issue` -> `apache_superset`
pub fn source_name(target: &str) -> String {
    target
        .replace("repo:", "")
        .replace(" is:issue", "")
        .replace('/', "_")
}

pub fn raw_file_name(source: &str, at: NaiveDateTime) -> String {
    format!("{}_{}_{}.json", RAW_PREFIX, source, format_stamp(at))
}

/// Stem shared by the CSV and JSON halves of a normalized artifact.
pub fn processed_stem(core: &str, at: NaiveDateTime) -> String {
    format!("{}_{}_{}", PROCESSED_PREFIX, core, format_stamp(at))
}

pub fn enriched_file_name(core: &str) -> String {
    format!("{}_{}.csv", ENRICHED_PREFIX, core)
}

/// Split `<head>_<date>_<time>` from the right. `None` when the stem has fewer
/// than three underscore-delimited segments.
fn split_stamp(stem: &str) -> Option<(&str, &str, &str)> {
    let mut parts = stem.rsplitn(3, '_');
    let time = parts.next()?;
    let date = parts.next()?;
    let head = parts.next()?;
    Some((head, date, time))
}

/// Core-name of a raw capture stem.
///
/// The trailing date and time segments are dropped first, then the capture
/// prefix. A stem with fewer than three segments is returned whole, prefix
/// included: `ingest_x` stays `ingest_x`.
pub fn core_name_from_raw(stem: &str) -> String {
    match split_stamp(stem) {
        Some((head, _, _)) => head
            .strip_prefix(&format!("{}_", RAW_PREFIX))
            .unwrap_or(head)
            .to_string(),
        None => stem.to_string(),
    }
}

/// Core-name of a normalized artifact stem. The stage prefix goes first, then
/// the two timestamp segments if at least three segments remain.
pub fn core_name_from_processed(stem: &str) -> String {
    let rest = stem
        .strip_prefix(&format!("{}_", PROCESSED_PREFIX))
        .unwrap_or(stem);
    match split_stamp(rest) {
        Some((head, _, _)) => head.to_string(),
        None => rest.to_string(),
    }
}

pub fn core_name_from_enriched(stem: &str) -> String {
    stem.strip_prefix(&format!("{}_", ENRICHED_PREFIX))
        .unwrap_or(stem)
        .to_string()
}

/// A file name parsed back into its lineage parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub core: String,
    /// Capture or processing time; enriched names carry none.
    pub stamp: Option<NaiveDateTime>,
}

impl ArtifactName {
    pub fn parse(stage: Stage, path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;

        let (core, stamp) = match stage {
            Stage::Raw => (core_name_from_raw(stem), stamp_of(stem)),
            Stage::Processed => {
                let rest = stem
                    .strip_prefix(&format!("{}_", PROCESSED_PREFIX))
                    .unwrap_or(stem);
                (core_name_from_processed(stem), stamp_of(rest))
            }
            Stage::Enriched => {
                if !stem.starts_with(&format!("{}_", ENRICHED_PREFIX)) {
                    return None;
                }
                (core_name_from_enriched(stem), None)
            }
        };

        Some(Self { core, stamp })
    }
}

fn stamp_of(stem: &str) -> Option<NaiveDateTime> {
    split_stamp(stem).and_then(|(_, date, time)| parse_stamp(date, time))
}
