//! Reading location and place-ID input files.

use crate::error::CliError;
use geoharvest::geo::Location;
use std::collections::HashSet;
use std::path::Path;

/// Reads a locations CSV with an `id,location` header, where `location`
/// is a `"lat,lon"` pair.
///
/// IDs name output files and directories, so a duplicate ID is rejected
/// rather than silently collapsing two locations into one artifact.
pub fn read_locations(path: &Path) -> Result<Vec<(String, Location)>, CliError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| CliError::Input(format!("cannot read {}: {e}", path.display())))?;

    let mut seen = HashSet::new();
    let mut locations = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| CliError::Input(format!("{}: {e}", path.display())))?;
        let id = record
            .get(0)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| row_error(path, line, "missing id column"))?;
        if !seen.insert(id.to_string()) {
            return Err(row_error(path, line, &format!("duplicate id '{id}'")));
        }
        let pair = record
            .get(1)
            .ok_or_else(|| row_error(path, line, "missing location column"))?;
        let location = Location::parse(pair)
            .map_err(|e| row_error(path, line, &e.to_string()))?;
        locations.push((id.to_string(), location));
    }

    if locations.is_empty() {
        return Err(CliError::Input(format!(
            "{} contains no locations",
            path.display()
        )));
    }
    Ok(locations)
}

/// Reads a place-ID file: one ID per line, blank lines ignored.
pub fn read_place_ids(path: &Path) -> Result<Vec<String>, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("cannot read {}: {e}", path.display())))?;
    let ids: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(CliError::Input(format!(
            "{} contains no place IDs",
            path.display()
        )));
    }
    Ok(ids)
}

fn row_error(path: &Path, line: usize, reason: &str) -> CliError {
    CliError::Input(format!("{} row {}: {reason}", path.display(), line + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_locations_parses_pairs() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,location").unwrap();
        writeln!(file, "a,\"40.714728,-73.998672\"").unwrap();
        writeln!(file, "b,\"51.5,-0.1\"").unwrap();

        let locations = read_locations(file.path()).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].0, "a");
        assert!((locations[0].1.lat() - 40.714728).abs() < 1e-9);
    }

    #[test]
    fn test_read_locations_reports_bad_pair() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,location").unwrap();
        writeln!(file, "a,not-a-location").unwrap();

        let err = read_locations(file.path()).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_read_locations_rejects_duplicate_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,location").unwrap();
        writeln!(file, "a,\"40.0,-74.0\"").unwrap();
        writeln!(file, "b,\"41.0,-75.0\"").unwrap();
        writeln!(file, "a,\"42.0,-76.0\"").unwrap();

        let err = read_locations(file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate id 'a'"));
        assert!(err.to_string().contains("row 4"));
    }

    #[test]
    fn test_read_locations_rejects_empty_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,location").unwrap();
        assert!(read_locations(file.path()).is_err());
    }

    #[test]
    fn test_read_place_ids_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ChIJa\n\nChIJb  ").unwrap();

        let ids = read_place_ids(file.path()).unwrap();
        assert_eq!(ids, vec!["ChIJa", "ChIJb"]);
    }
}
