use crate::{error::AppError, stored_object};
use uuid::Uuid;

stored_object!(TableChunk, "table_chunk", {
    table_index: usize,
    page: u32,
    content: String,
    embedding: Vec<f32>
});

impl TableChunk {
    pub fn new(table_index: usize, page: u32, content: String, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            table_index,
            page,
            content,
            embedding,
        }
    }

    /// Parses the stored row array back into structured JSON.
    ///
    /// The content is the JSON serialization of the extracted table rows;
    /// a chunk that no longer parses is dropped by callers, not fatal.
    pub fn rows(&self) -> Result<serde_json::Value, AppError> {
        serde_json::from_str(&self.content)
            .map_err(|e| AppError::TableParse(format!("Invalid table chunk content: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_parses_stored_json() {
        let chunk = TableChunk::new(
            0,
            3,
            r#"[{"Driver":"VER","Points":"25"}]"#.into(),
            vec![0.5],
        );

        let rows = chunk.rows().expect("rows should parse");
        assert!(rows.is_array());
        assert_eq!(rows[0]["Points"], "25");
    }

    #[test]
    fn test_rows_rejects_invalid_json() {
        let chunk = TableChunk::new(1, 4, "not json at all".into(), vec![0.5]);
        assert!(matches!(chunk.rows(), Err(AppError::TableParse(_))));
    }
}
