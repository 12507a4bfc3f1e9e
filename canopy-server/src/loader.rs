//! Dataset file loading

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use canopy::prelude::{Dataset, Row};
use serde::Deserialize;
use tracing::info;

use crate::error::{Result, ServerError};

/// On-disk layout of a dataset.
#[derive(Debug, Deserialize)]
struct DatasetFile {
    /// Measure columns; names only seen in rows are added
    #[serde(default)]
    measures: Vec<String>,
    rows: Vec<Row>,
}

/// Parse a dataset from any JSON reader.
pub fn read_dataset<R: Read>(reader: R) -> Result<Dataset> {
    let file: DatasetFile = serde_json::from_reader(reader)?;
    if file.rows.is_empty() {
        return Err(ServerError::Dataset("dataset has no rows".into()));
    }
    Ok(Dataset::with_measures(file.measures, file.rows))
}

/// Load the dataset at `path`.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let file = File::open(path)?;
    let dataset = read_dataset(BufReader::new(file))?;
    info!(
        "Loaded {} rows with measures {:?} from {}",
        dataset.len(),
        dataset.schema().measures(),
        path.display()
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_and_declared_measures() {
        let json = r#"{
            "measures": ["grid_VCI"],
            "rows": [
                {"source": "dep10", "cultivar_n": "I-214", "age_plan": 5, "measures": {"grid_PAI": 1.2}}
            ]
        }"#;
        let ds = read_dataset(json.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.schema().measures(), ["grid_PAI", "grid_VCI"]);
    }

    #[test]
    fn rejects_unknown_sources() {
        let json = r#"{"rows": [{"source": "dep99", "cultivar": "I-214"}]}"#;
        let err = read_dataset(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ServerError::Serialization(_)));
    }

    #[test]
    fn rejects_empty_datasets() {
        let err = read_dataset(r#"{"rows": []}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, ServerError::Dataset(_)));
    }
}
