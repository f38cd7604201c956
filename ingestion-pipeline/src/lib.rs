#![allow(clippy::missing_docs_in_private_items)]

pub mod classifier;
pub mod optimizer;
pub mod pipeline;
pub mod segmenter;
pub mod tables;
pub mod utils;

pub use classifier::{classify, DocumentCategory};
pub use pipeline::IngestionPipeline;
