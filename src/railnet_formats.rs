//! Railnet documents: the order lists dumped by the route extractor, the
//! station table and the cargo labels, plus their binary and JSON encodings.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type StationId = u32;
pub type UnitId = u32;
/// Four ASCII bytes, most significant first (`PASS`, `MAIL`, ...).
pub type CargoLabel = u32;

pub const RAILNET_FORMAT: &str = "openttd/railnet";
pub const RAILNET_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stop {
    pub station: StationId,
    /// `false` for stations the train only passes through.
    pub halts: bool,
}

impl Stop {
    pub fn halting(station: StationId) -> Self {
        Self {
            station,
            halts: true,
        }
    }

    pub fn passing(station: StationId) -> Self {
        Self {
            station,
            halts: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CargoInfo {
    pub forward: bool,
    pub backward: bool,
    pub slice: u32,
}

fn path_found_default() -> bool {
    true
}

/// One vehicle route as resolved by the extractor, already reduced to a
/// closed loop without consecutive duplicate stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRoute {
    pub primary_id: UnitId,
    #[serde(default)]
    pub reverse_id: Option<UnitId>,
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub forward_cargo: BTreeSet<CargoLabel>,
    #[serde(default)]
    pub backward_cargo: BTreeSet<CargoLabel>,
    #[serde(default = "path_found_default")]
    pub path_found: bool,
}

impl CandidateRoute {
    pub fn new(primary_id: UnitId, stops: Vec<Stop>) -> Self {
        Self {
            primary_id,
            reverse_id: None,
            stops,
            forward_cargo: BTreeSet::new(),
            backward_cargo: BTreeSet::new(),
            path_found: true,
        }
    }

    pub fn with_cargo(mut self, labels: &[CargoLabel]) -> Self {
        self.forward_cargo.extend(labels.iter().copied());
        self
    }

    pub fn halting_stations(&self) -> Vec<StationId> {
        self.stops
            .iter()
            .filter(|stop| stop.halts)
            .map(|stop| stop.station)
            .collect()
    }

    pub fn has_cargo(&self) -> bool {
        !self.forward_cargo.is_empty() || !self.backward_cargo.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub name: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RailnetHeader {
    format: String,
    version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RailnetFile {
    pub order_lists: Vec<CandidateRoute>,
    pub stations: BTreeMap<StationId, StationInfo>,
    pub cargo_labels: Vec<CargoLabel>,
}

/// JSON layout: the header fields sit next to the body fields.
#[derive(Serialize, Deserialize)]
struct RailnetJsonDocument {
    format: String,
    version: u32,
    #[serde(default)]
    order_lists: Vec<CandidateRoute>,
    #[serde(default)]
    stations: BTreeMap<StationId, StationInfo>,
    #[serde(default)]
    cargo_labels: Vec<CargoLabel>,
}

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("I/O error accessing '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a railnet document: expected format tag '{}', found '{found}'", RAILNET_FORMAT)]
    HeaderMismatch { found: String },
    #[error("unsupported railnet version {found}, this build reads version {expected}")]
    VersionMismatch { found: u64, expected: u32 },
    #[error("failed to decode binary railnet document: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("failed to encode binary railnet document: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("invalid JSON railnet document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEncoding {
    Binary,
    Json,
}

impl FileEncoding {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileEncoding::Json,
            _ => FileEncoding::Binary,
        }
    }
}

fn check_header(format: &str, version: u64) -> Result<(), FormatError> {
    if format != RAILNET_FORMAT {
        return Err(FormatError::HeaderMismatch {
            found: format.to_string(),
        });
    }
    if version != RAILNET_VERSION as u64 {
        return Err(FormatError::VersionMismatch {
            found: version,
            expected: RAILNET_VERSION,
        });
    }
    Ok(())
}

impl RailnetFile {
    pub fn read_from<R: Read>(reader: &mut R, encoding: FileEncoding) -> Result<Self, FormatError> {
        let config = bincode::config::legacy();
        match encoding {
            FileEncoding::Binary => {
                let header: RailnetHeader =
                    bincode::serde::decode_from_std_read(&mut *reader, config)?;
                check_header(&header.format, header.version as u64)?;
                Ok(bincode::serde::decode_from_std_read(&mut *reader, config)?)
            }
            FileEncoding::Json => {
                let value: serde_json::Value = serde_json::from_reader(reader)?;
                let format = value
                    .get("format")
                    .and_then(|v| v.as_str())
                    .unwrap_or("<missing>");
                let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
                check_header(format, version)?;
                let document: RailnetJsonDocument = serde_json::from_value(value)?;
                Ok(RailnetFile {
                    order_lists: document.order_lists,
                    stations: document.stations,
                    cargo_labels: document.cargo_labels,
                })
            }
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W, encoding: FileEncoding) -> Result<(), FormatError> {
        let config = bincode::config::legacy();
        match encoding {
            FileEncoding::Binary => {
                let header = RailnetHeader {
                    format: RAILNET_FORMAT.to_string(),
                    version: RAILNET_VERSION,
                };
                bincode::serde::encode_into_std_write(&header, &mut *writer, config)?;
                bincode::serde::encode_into_std_write(self, &mut *writer, config)?;
            }
            FileEncoding::Json => {
                let document = RailnetJsonDocument {
                    format: RAILNET_FORMAT.to_string(),
                    version: RAILNET_VERSION,
                    order_lists: self.order_lists.clone(),
                    stations: self.stations.clone(),
                    cargo_labels: self.cargo_labels.clone(),
                };
                serde_json::to_writer_pretty(writer, &document)?;
            }
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, FormatError> {
        let file = File::open(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, FileEncoding::from_path(path))
    }

    pub fn save(&self, path: &Path) -> Result<(), FormatError> {
        let io_err = |source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, FileEncoding::from_path(path))?;
        writer.flush().map_err(io_err)
    }
}

pub fn cargo_label_name(label: CargoLabel) -> String {
    label
        .to_be_bytes()
        .iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
        .collect()
}

pub fn parse_cargo_label(text: &str) -> Option<CargoLabel> {
    let bytes = text.as_bytes();
    if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_uppercase() || *b == b'_') {
        return None;
    }
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
