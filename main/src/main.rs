use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{Parser, Subcommand};
use common::{
    storage::registry::PartitionRegistry,
    utils::{
        chat::OpenAiChatModel,
        config::get_config,
        embedding::EmbeddingProvider,
    },
};
use ingestion_pipeline::{pipeline::IngestionPipeline, tables::SidecarTableExtractor};
use retrieval_pipeline::{AnswerComposer, CrossStoreRetriever};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "regatta", about = "Regulation QA over per-category vector partitions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest every PDF found in the configured data directory
    Ingest,
    /// Ingest a single PDF
    IngestFile { path: PathBuf },
    /// Ask a question over the indexed corpus
    Ask {
        query: String,
        /// Documents to retrieve per partition and language
        #[arg(long)]
        k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;
    let cli = Cli::parse();

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    let embedding_provider =
        Arc::new(EmbeddingProvider::from_config(&config, Arc::clone(&openai_client))?);
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    let mut registry = PartitionRegistry::load_all(Path::new(&config.index_dir)).await?;
    info!(partitions = registry.len(), "Partition registry loaded");

    match cli.command {
        Command::Ingest => {
            let pipeline = IngestionPipeline::new(
                config.clone(),
                Arc::clone(&embedding_provider),
                Arc::new(SidecarTableExtractor),
            );
            let documents = pipeline.ingest_all(&mut registry).await?;
            info!(documents, partitions = registry.len(), "Ingestion finished");
        }
        Command::IngestFile { path } => {
            let pipeline = IngestionPipeline::new(
                config.clone(),
                Arc::clone(&embedding_provider),
                Arc::new(SidecarTableExtractor),
            );
            pipeline.ingest_file(&mut registry, &path).await?;
            info!(file = %path.display(), partitions = registry.len(), "Ingestion finished");
        }
        Command::Ask { query, k } => {
            let chat = Arc::new(OpenAiChatModel::new(
                Arc::clone(&openai_client),
                Duration::from_secs(config.generation_timeout_secs),
            ));
            let retriever = CrossStoreRetriever::new(&registry, &embedding_provider);
            let composer = AnswerComposer::new(
                retriever,
                chat,
                config.chat_model.clone(),
                config.translation_model.clone(),
            );

            let answer = composer.ask(&query, k.unwrap_or(config.retrieval_k)).await?;
            println!("{}", answer.to_display_string());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use common::{
        error::AppError,
        storage::{partition::PartitionStore, registry::PartitionRegistry, types::text_chunk::TextChunk},
        utils::{chat::ChatModel, embedding::EmbeddingProvider},
    };
    use ingestion_pipeline::{
        optimizer::optimize,
        segmenter::{split_into_articles, split_into_sections, Page},
    };
    use retrieval_pipeline::{AnswerComposer, CrossStoreRetriever};
    use std::sync::{Arc, Mutex};

    struct ScriptedChat {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedChat {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AppError> {
            self.responses
                .lock()
                .expect("responses lock")
                .pop()
                .ok_or(AppError::Generation("script exhausted".into()))
        }
    }

    #[tokio::test]
    async fn end_to_end_section_chunk_is_retrieved_and_cited() {
        let pages = vec![Page {
            number: 4,
            content: "ARTICLE B1: Definitions\nGeneral scope of the definitions. \
                      B1.7.3 Pit lane speed limit is 60 km/h save for conditions in B1.7.4."
                .to_string(),
        }];

        let articles = split_into_articles(&pages);
        let sections: Vec<_> = articles.iter().flat_map(split_into_sections).collect();
        let chunks = optimize(&sections).expect("optimize");
        assert!(chunks.iter().any(|c| c.section == "B1.7.3"));

        let provider = EmbeddingProvider::new_hashed(16).expect("provider");
        let store = PartitionStore::memory("sporting_text", 16)
            .await
            .expect("partition");

        let mut rows = Vec::new();
        for chunk in &chunks {
            rows.push(TextChunk::new(
                chunk.article.clone(),
                chunk.section.clone(),
                chunk.subchunk_index,
                chunk.content.clone(),
                chunk.page,
                provider.embed(&chunk.content).await.expect("embed"),
            ));
        }
        store.insert_text_chunks(rows).await.expect("insert");

        let mut registry = PartitionRegistry::new();
        registry.insert(store);

        let chat = Arc::new(ScriptedChat::new(vec![
            "pit lane speed limit",
            "The pit lane speed limit is 60 km/h.",
            "피트레인 속도 제한은 60 km/h입니다.",
        ]));
        let composer = AnswerComposer::new(
            CrossStoreRetriever::new(&registry, &provider),
            chat,
            "gpt-4o".into(),
            "gpt-4o-mini".into(),
        );

        let answer = composer
            .ask("피트레인 속도 제한은 얼마인가요?", 8)
            .await
            .expect("answer");

        assert_eq!(answer.text, "피트레인 속도 제한은 60 km/h입니다.");
        assert!(!answer.citations.is_empty());
        assert_eq!(answer.citations[0].label, "sporting_text · p.4");
        assert!(answer
            .citations
            .iter()
            .any(|c| c.excerpt.contains("Pit lane speed limit")));
    }
}
