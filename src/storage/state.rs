//! Persisted map state: topology plus a flat dump of grid weights.
//!
//! Two encodings of the same [`MapState`] are supported:
//!
//! - **JSON** (`.json`): `{"inputSize", "width", "height", "weights"}`
//! - **Binary** (anything else): a 8-byte header followed by a bincode payload
//!
//! ### Binary header (8 bytes)
//! - Magic number (4 bytes): "KSOM"
//! - Version (2 bytes, little endian)
//! - Reserved (2 bytes)

use crate::error::{KohonenError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic number for binary map files.
const MAGIC: &[u8; 4] = b"KSOM";

/// Current binary format version.
const VERSION: u16 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 8;

/// Topology and weights of a map, the only persisted representation.
///
/// Training history (winner, radius, unit states) is not part of the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    /// Dimensionality of the input vectors.
    pub input_size: usize,
    /// Grid width.
    pub width: usize,
    /// Grid height.
    pub height: usize,
    /// One weight vector per grid unit, in row-major unit order.
    pub weights: Vec<Vec<f64>>,
}

/// On-disk encoding of a [`MapState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    /// Human-readable JSON.
    Json,
    /// Compact bincode with a magic header.
    Binary,
}

impl StateFormat {
    /// Picks the encoding from a file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => StateFormat::Json,
            _ => StateFormat::Binary,
        }
    }
}

impl MapState {
    /// Encodes the state as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a state from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encodes the state in the binary format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..6].copy_from_slice(&VERSION.to_le_bytes());
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }

    /// Decodes a state from the binary format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(KohonenError::Serialization("Header too short".to_string()));
        }
        if &bytes[0..4] != MAGIC {
            return Err(KohonenError::Serialization("Invalid magic number".to_string()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(KohonenError::Serialization(format!(
                "Unsupported format version {}",
                version
            )));
        }
        Ok(bincode::deserialize(&bytes[HEADER_SIZE..])?)
    }

    /// Writes the state to `path`, encoding chosen by extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let format = StateFormat::from_path(&path);
        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            StateFormat::Json => serde_json::to_writer(&mut writer, self)?,
            StateFormat::Binary => writer.write_all(&self.to_bytes()?)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a state from `path`, encoding chosen by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let format = StateFormat::from_path(&path);
        let mut reader = BufReader::new(File::open(path)?);
        match format {
            StateFormat::Json => Ok(serde_json::from_reader(reader)?),
            StateFormat::Binary => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                Self::from_bytes(&bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_state() -> MapState {
        MapState {
            input_size: 2,
            width: 2,
            height: 1,
            weights: vec![vec![0.25, -0.5], vec![0.125, 0.75]],
        }
    }

    #[test]
    fn test_json_field_names() {
        let json = sample_state().to_json().unwrap();
        assert!(json.contains("\"inputSize\":2"));
        assert!(json.contains("\"width\":2"));
        assert!(json.contains("\"weights\":[[0.25,-0.5],[0.125,0.75]]"));
    }

    #[test]
    fn test_from_json() {
        let state = MapState::from_json(
            r#"{"inputSize": 1, "width": 1, "height": 2, "weights": [[0.1], [0.2]]}"#,
        )
        .unwrap();
        assert_eq!(state.height, 2);
        assert_eq!(state.weights, vec![vec![0.1], vec![0.2]]);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample_state().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(MapState::from_bytes(&bytes).is_err());
        assert!(MapState::from_bytes(&bytes[..4]).is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(StateFormat::from_path("map.json"), StateFormat::Json);
        assert_eq!(StateFormat::from_path("map.JSON"), StateFormat::Json);
        assert_eq!(StateFormat::from_path("map.som"), StateFormat::Binary);
        assert_eq!(StateFormat::from_path("map"), StateFormat::Binary);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let state = sample_state();

        for name in ["map.json", "map.som"] {
            let path = dir.path().join(name);
            state.save(&path).unwrap();
            assert_eq!(MapState::load(&path).unwrap(), state);
        }
    }
}
