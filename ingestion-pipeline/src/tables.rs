use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// A raw table as delivered by the external detection step: one object per
/// row, column name mapped to cell value, plus the page it was found on.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTable {
    pub page: u32,
    pub rows: Vec<serde_json::Value>,
}

/// A table serialized for indexing, tagged with its ordinal position in the
/// source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub table_index: usize,
    pub page: u32,
    pub content: String,
}

/// Tables below this much flattened text carry no usable content.
const MIN_TABLE_TEXT_CHARS: usize = 10;

/// External table-detection capability.
///
/// Implementations must tolerate total failure by returning an empty
/// sequence; a document without detectable tables is not an error.
#[async_trait]
pub trait TableExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Vec<RawTable>;
}

/// Reads tables from a `<stem>.tables.json` sidecar file written by an
/// external detection tool.
///
/// A missing or malformed sidecar yields no tables.
pub struct SidecarTableExtractor;

#[async_trait]
impl TableExtractor for SidecarTableExtractor {
    async fn extract(&self, path: &Path) -> Vec<RawTable> {
        let sidecar = path.with_extension("tables.json");

        let raw = match tokio::fs::read_to_string(&sidecar).await {
            Ok(raw) => raw,
            Err(_) => {
                debug!(path = %sidecar.display(), "No table sidecar found");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<RawTable>>(&raw) {
            Ok(tables) => {
                debug!(path = %sidecar.display(), count = tables.len(), "Loaded table sidecar");
                tables
            }
            Err(e) => {
                warn!(path = %sidecar.display(), error = %e, "Table sidecar did not parse, ignoring it");
                Vec::new()
            }
        }
    }
}

/// Converts raw tables into serialized records, dropping empty tables and
/// tables whose flattened text is too short to mean anything.
pub fn convert_tables(tables: &[RawTable]) -> Vec<TableRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (idx, table) in tables.iter().enumerate() {
        if table.rows.is_empty() {
            debug!(table_index = idx, "Skipping empty table");
            skipped += 1;
            continue;
        }

        let flat_text = flatten_cells(&table.rows);
        if flat_text.trim().chars().count() < MIN_TABLE_TEXT_CHARS {
            debug!(table_index = idx, "Skipping meaningless table");
            skipped += 1;
            continue;
        }

        let content = match serde_json::to_string_pretty(&table.rows) {
            Ok(content) => content,
            Err(e) => {
                warn!(table_index = idx, error = %e, "Failed to serialize table rows");
                skipped += 1;
                continue;
            }
        };

        records.push(TableRecord {
            table_index: idx,
            page: table.page,
            content,
        });
    }

    debug!(
        valid = records.len(),
        skipped, "Converted extracted tables to records"
    );
    records
}

fn flatten_cells(rows: &[serde_json::Value]) -> String {
    let mut cells = Vec::new();
    for row in rows {
        if let Some(object) = row.as_object() {
            for value in object.values() {
                match value {
                    serde_json::Value::String(s) => cells.push(s.clone()),
                    other => cells.push(other.to_string()),
                }
            }
        }
    }
    cells.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_tables_keeps_meaningful() {
        let tables = vec![RawTable {
            page: 5,
            rows: vec![
                json!({"Position": "1", "Points": "25"}),
                json!({"Position": "2", "Points": "18"}),
            ],
        }];

        let records = convert_tables(&tables);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].table_index, 0);
        assert_eq!(records[0].page, 5);
        assert!(records[0].content.contains("25"));
    }

    #[test]
    fn test_convert_tables_drops_empty_and_short() {
        let tables = vec![
            RawTable {
                page: 1,
                rows: vec![],
            },
            RawTable {
                page: 2,
                rows: vec![json!({"a": "x"})],
            },
            RawTable {
                page: 3,
                rows: vec![json!({"Driver": "Verstappen", "Team": "Red Bull Racing"})],
            },
        ];

        let records = convert_tables(&tables);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].table_index, 2);
        assert_eq!(records[0].page, 3);
    }

    #[tokio::test]
    async fn test_sidecar_extractor_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf = dir.path().join("sporting_regulations.pdf");

        let tables = SidecarTableExtractor.extract(&pdf).await;
        assert!(tables.is_empty());
    }

    #[tokio::test]
    async fn test_sidecar_extractor_reads_and_tolerates_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf = dir.path().join("sporting_regulations.pdf");
        let sidecar = dir.path().join("sporting_regulations.tables.json");

        tokio::fs::write(
            &sidecar,
            r#"[{"page": 4, "rows": [{"Driver": "HAM", "Points": "12"}]}]"#,
        )
        .await
        .expect("write sidecar");
        let tables = SidecarTableExtractor.extract(&pdf).await;
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page, 4);

        tokio::fs::write(&sidecar, "{ not json").await.expect("write");
        let tables = SidecarTableExtractor.extract(&pdf).await;
        assert!(tables.is_empty());
    }
}
