use std::path::Path;

use crate::error::DatasetError;
use crate::model::Dataset;

/// Save a dataset to a JSON file.
pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<(), DatasetError> {
    let json = serde_json::to_string_pretty(dataset).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a dataset from a JSON file.
pub fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    let json = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dataset_survives_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("team.planner.json");

        let mut dataset = Dataset::new("Team");
        dataset
            .content_items
            .push(json!({"id": "c-1", "start_date": "2024-03-04"}).as_object().cloned().unwrap());
        save_dataset(&dataset, &path).unwrap();

        let loaded = load_dataset(&path).unwrap();
        assert_eq!(loaded.name, "Team");
        assert_eq!(loaded.content_items, dataset.content_items);
        assert!(loaded.tasks.is_empty());
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"tasks": [{"id": "t"}]}"#).unwrap();

        let loaded = load_dataset(&path).unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.name, "Untitled Planner");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_dataset(Path::new("/nonexistent/planner.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/planner.json"));
    }
}
