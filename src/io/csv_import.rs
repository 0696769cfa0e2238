use std::path::Path;

use serde_json::Value;

use crate::error::DatasetError;
use crate::model::{RawFields, RawRecord, SourceKind};

/// Detect delimiter by checking the first line for common separators.
fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();

    if semicolons >= commas && semicolons >= tabs && semicolons > 0 {
        b';'
    } else if tabs >= commas && tabs > 0 {
        b'\t'
    } else {
        b','
    }
}

/// Turn a header into a field name the normalizer knows.
///
/// A few spreadsheet-style headers are mapped onto known field names.
/// camelCase headers (`startDate`, `assigneeIds`) are kept as they are;
/// anything else passes through lowercased with `_` separators.
fn header_to_field(header: &str) -> String {
    let raw = header.trim();
    let key = raw.to_lowercase().replace([' ', '-', '.'], "_");
    match key.as_str() {
        "task" | "task_label" | "activity" => "title".to_string(),
        "from" | "begin" | "begin_date" => "start_date".to_string(),
        "to" | "finish" | "finish_date" | "due" => "end_date".to_string(),
        "owner" | "owners" | "assignee" => "assignee_ids".to_string(),
        "editor" => "editor_ids".to_string(),
        "idea_owner" => "idea_owner_ids".to_string(),
        "table" => "source".to_string(),
        _ if is_camel_case(raw) => raw.to_string(),
        _ => key,
    }
}

fn is_camel_case(header: &str) -> bool {
    header.starts_with(|c: char| c.is_ascii_lowercase())
        && header.chars().any(|c| c.is_ascii_uppercase())
        && header.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Import raw records from a CSV file.
///
/// Auto-detects delimiter (comma, semicolon, tab). Every non-empty cell
/// becomes a string field under its header name, so the normalizer's alias
/// table applies. A `source`/`table` column selects the source table; rows
/// without one land in the generic task table.
/// Returns `(records, skipped_count)` on success.
pub fn import_csv(path: &Path) -> Result<(Vec<RawRecord>, usize), DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let first_line = content.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| DatasetError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(header_to_field)
        .collect();

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(row = i + 2, "skipping CSV row: {e}");
                skipped += 1;
                continue;
            }
        };

        let mut fields = RawFields::new();
        let mut kind = SourceKind::GenericTask;
        for (header, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            if header == "source" {
                match SourceKind::from_table(cell) {
                    Some(k) => kind = k,
                    None => tracing::warn!(row = i + 2, "unknown source table '{cell}'"),
                }
                continue;
            }
            fields.insert(header.clone(), Value::String(cell.to_string()));
        }

        if fields.is_empty() {
            skipped += 1;
            continue;
        }
        records.push(RawRecord::new(kind, fields));
    }

    if records.is_empty() {
        return Err(DatasetError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }

    Ok((records, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::normalize::normalize_batch;

    #[test]
    fn delimiter_detection() {
        assert_eq!(detect_delimiter("a;b;c"), b';');
        assert_eq!(detect_delimiter("a\tb"), b'\t');
        assert_eq!(detect_delimiter("a,b"), b',');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn headers_map_to_normalizer_fields() {
        assert_eq!(header_to_field("Task Label"), "title");
        assert_eq!(header_to_field("Start Date"), "start_date");
        assert_eq!(header_to_field("Owner"), "assignee_ids");
        assert_eq!(header_to_field("Review-Status"), "review_status");
        assert_eq!(header_to_field(" startDate "), "startDate");
        assert_eq!(header_to_field("Id"), "id");
    }

    #[test]
    fn camel_case_headers_survive_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.csv");
        std::fs::write(
            &path,
            "id,title,startDate,endDate,assigneeIds,isUnscheduled\n\
             7,Plan sprint,2024-03-04,2024-03-05,ana,\n\
             8,Someday,,,bo,true\n",
        )
        .unwrap();

        let (records, skipped) = import_csv(&path).unwrap();
        assert_eq!(skipped, 0);
        assert!(records[0].fields.contains_key("startDate"));

        let (tasks, bad) = normalize_batch(&records);
        assert_eq!(bad, 0);
        assert_eq!(tasks[0].duration_days(), 2);
        assert_eq!(tasks[0].owners.assignees.len(), 1);
        assert!(tasks[1].is_unscheduled);
    }

    #[test]
    fn imported_rows_normalize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("week.csv");
        std::fs::write(
            &path,
            "Id;Task Label;Start Date;End Date;Owner;Source\n\
             1;Shoot video;04/03/2024;06/03/2024;ana;content\n\
             2;Plan sprint;2024-03-05;;ana, bo;\n\
             ;;;;;\n",
        )
        .unwrap();

        let (records, skipped) = import_csv(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(records[0].kind, SourceKind::ContentItem);
        assert_eq!(records[1].kind, SourceKind::GenericTask);

        let (tasks, bad) = normalize_batch(&records);
        assert_eq!(bad, 0);
        assert_eq!(tasks[1].owners.flatten().len(), 2);
        assert_eq!(tasks[0].duration_days(), 3);
    }
}
