use crate::stored_object;
use uuid::Uuid;

stored_object!(TextChunk, "text_chunk", {
    article: String,
    section: String,
    subchunk_index: usize,
    content: String,
    page: Option<u32>,
    embedding: Vec<f32>
});

impl TextChunk {
    pub fn new(
        article: String,
        section: String,
        subchunk_index: usize,
        content: String,
        page: Option<u32>,
        embedding: Vec<f32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            article,
            section,
            subchunk_index,
            content,
            page,
            embedding,
        }
    }
}
