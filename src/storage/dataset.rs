//! Dataset files: one input vector per row.
//!
//! `.json` files hold an array of arrays. Any other file holds one vector per
//! line with comma- or whitespace-separated components; blank lines and lines
//! starting with `#` are skipped.

use crate::error::{KohonenError, Result};
use std::path::Path;

/// Loads a dataset, choosing the parser from the file extension.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f64>>> {
    let is_json = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let content = std::fs::read_to_string(&path)?;
    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        parse_dataset(&content)
    }
}

/// Parses line-oriented text into vectors.
///
/// Every row must have the same length.
pub fn parse_dataset(content: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = parse_vector(line)
            .map_err(|e| KohonenError::Dataset(format!("line {}: {}", line_no + 1, e)))?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(KohonenError::Dataset(format!(
                    "line {}: expected {} components, found {}",
                    line_no + 1,
                    first.len(),
                    row.len()
                )));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Parses one comma- or whitespace-separated vector.
pub fn parse_vector(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| KohonenError::Dataset(format!("invalid number '{}'", s)))
        })
        .collect()
}
