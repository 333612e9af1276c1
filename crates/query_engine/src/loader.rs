//! Reads data files from disk into an untyped column/row table.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use serde_json::{Map, Value};
use shared::domain::DataFormat;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Real,
    Text,
}

impl Affinity {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

pub async fn read_table(path: &Path) -> Result<ParsedTable, EngineError> {
    let format = DataFormat::from_path(path);
    let delimiter = match format {
        Some(DataFormat::Csv) => Some(b','),
        Some(DataFormat::Tsv) => Some(b'\t'),
        Some(DataFormat::Json) => None,
        Some(other) => {
            return Err(EngineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: other.label().to_string(),
            })
        }
        None => {
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| format!("'.{ext}'"))
                .unwrap_or_else(|| "Extensionless".to_string());
            return Err(EngineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: extension,
            });
        }
    };

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(EngineError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let parsed = match delimiter {
        Some(delimiter) => parse_delimited(&bytes, delimiter),
        None => parse_json(&bytes),
    };
    parsed.map_err(|detail| EngineError::Malformed {
        path: path.to_path_buf(),
        detail,
    })
}

pub fn parse_delimited(bytes: &[u8], delimiter: u8) -> Result<ParsedTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|err| format!("invalid header row: {err}"))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err("missing header row".to_string());
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|err| format!("record {}: {err}", index + 1))?;
        rows.push(
            record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }

    Ok(ParsedTable {
        columns: normalize_column_names(headers),
        rows,
    })
}

/// Accepts a top-level array of objects or newline-delimited objects.
pub fn parse_json(bytes: &[u8]) -> Result<ParsedTable, String> {
    let objects = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(map),
                _ => Err(format!("element {index} is not an object")),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Ok(Value::Object(map)) => vec![map],
        Ok(_) => return Err("expected an array of objects".to_string()),
        Err(_) => parse_json_lines(bytes)?,
    };

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for object in &objects {
        for key in object.keys() {
            if !positions.contains_key(key) {
                positions.insert(key.clone(), columns.len());
                columns.push(key.clone());
            }
        }
    }
    if columns.is_empty() {
        return Err("no fields found".to_string());
    }

    let rows = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|column| object.get(column).and_then(json_cell))
                .collect()
        })
        .collect();

    Ok(ParsedTable {
        columns: normalize_column_names(columns),
        rows,
    })
}

fn parse_json_lines(bytes: &[u8]) -> Result<Vec<Map<String, Value>>, String> {
    let text = std::str::from_utf8(bytes).map_err(|err| format!("not valid UTF-8: {err}"))?;
    let mut objects = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => objects.push(map),
            Ok(_) => return Err(format!("line {} is not an object", index + 1)),
            Err(err) => return Err(format!("line {}: {err}", index + 1)),
        }
    }
    Ok(objects)
}

fn json_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        // nested values keep their JSON text
        other => Some(other.to_string()),
    }
}

/// Fills blank headers and suffixes repeats until every name is unique,
/// ignoring case.
fn normalize_column_names(raw: Vec<String>) -> Vec<String> {
    let mut emitted: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(index, name)| {
            let base = match name.trim() {
                "" => format!("column_{}", index + 1),
                trimmed => trimmed.to_string(),
            };
            let key = base.to_ascii_lowercase();
            let mut candidate = base.clone();
            if emitted.contains(&key) {
                let suffix = next_suffix.entry(key).or_insert(2);
                loop {
                    candidate = format!("{base}_{suffix}");
                    *suffix += 1;
                    if !emitted.contains(&candidate.to_ascii_lowercase()) {
                        break;
                    }
                }
            }
            emitted.insert(candidate.to_ascii_lowercase());
            candidate
        })
        .collect()
}

pub fn infer_affinities(table: &ParsedTable) -> Vec<Affinity> {
    (0..table.columns.len())
        .map(|column| {
            let mut affinity = Affinity::Integer;
            for value in table
                .rows
                .iter()
                .filter_map(|row| row.get(column).and_then(|cell| cell.as_deref()))
            {
                if affinity == Affinity::Integer && value.parse::<i64>().is_err() {
                    affinity = Affinity::Real;
                }
                if affinity == Affinity::Real && value.parse::<f64>().is_err() {
                    return Affinity::Text;
                }
            }
            affinity
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_with_header_and_empty_cells() {
        let table = parse_delimited(b"id,name,score\n1,alice,3.5\n2,,4\n", b',').expect("csv");
        assert_eq!(table.columns, vec!["id", "name", "score"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][1], None);
        assert_eq!(
            infer_affinities(&table),
            vec![Affinity::Integer, Affinity::Text, Affinity::Real]
        );
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = parse_delimited(b"a,b\n1,2,3\n", b',').expect_err("ragged");
        assert!(err.starts_with("record 1"), "{err}");
    }

    #[test]
    fn parses_tab_separated_values() {
        let table = parse_delimited(b"city\tpop\nOslo\t700000\n", b'\t').expect("tsv");
        assert_eq!(table.columns, vec!["city", "pop"]);
        assert_eq!(table.rows[0], vec![Some("Oslo".into()), Some("700000".into())]);
    }

    #[test]
    fn json_array_columns_are_union_of_keys_in_first_seen_order() {
        let table =
            parse_json(br#"[{"a": 1, "b": "x"}, {"c": true, "a": null}, {"b": {"k": 2}}]"#)
                .expect("json");
        assert_eq!(table.columns, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0], vec![Some("1".into()), Some("x".into()), None]);
        assert_eq!(table.rows[1], vec![None, None, Some("true".into())]);
        assert_eq!(table.rows[2][1], Some(r#"{"k":2}"#.into()));
    }

    #[test]
    fn parses_newline_delimited_json() {
        let table = parse_json(b"{\"x\": 1}\n\n{\"x\": 2}\n").expect("ndjson");
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn renames_blank_and_duplicate_headers() {
        let table = parse_delimited(b"id,,id,ID\n1,2,3,4\n", b',').expect("csv");
        assert_eq!(table.columns, vec!["id", "column_2", "id_2", "ID_3"]);

        let table = parse_delimited(b"id,id,id_2\n1,2,3\n", b',').expect("csv");
        assert_eq!(table.columns, vec!["id", "id_2", "id_2_2"]);

        let table = parse_delimited(b",column_1\n1,2\n", b',').expect("csv");
        assert_eq!(table.columns, vec!["column_1", "column_1_2"]);
    }

    #[tokio::test]
    async fn reports_missing_and_unsupported_files() {
        let err = read_table(Path::new("/definitely/not/here.csv"))
            .await
            .expect_err("missing");
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = read_table(Path::new("/data/book.parquet"))
            .await
            .expect_err("unsupported");
        assert!(matches!(err, EngineError::UnsupportedFormat { .. }));
    }
}
