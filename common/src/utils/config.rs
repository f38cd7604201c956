use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    OpenAI,
    Hashed,
}

fn default_embedding_backend() -> EmbeddingBackend {
    EmbeddingBackend::OpenAI
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_index_dir")]
    pub index_dir: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_translation_model")]
    pub translation_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_index_dir() -> String {
    "./output/partitions".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_translation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_embedding_dimensions() -> u32 {
    3072
}

fn default_retrieval_k() -> usize {
    8
}

fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_embedding_timeout_secs() -> u64 {
    60
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_fields() {
        let config = Config::builder()
            .set_override("openai_api_key", "test-key")
            .expect("override")
            .build()
            .expect("config");

        let app_config: AppConfig = config.try_deserialize().expect("deserialize");

        assert_eq!(app_config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(app_config.index_dir, "./output/partitions");
        assert_eq!(app_config.chat_model, "gpt-4o");
        assert_eq!(app_config.translation_model, "gpt-4o-mini");
        assert_eq!(app_config.embedding_backend, EmbeddingBackend::OpenAI);
        assert_eq!(app_config.retrieval_k, 8);
    }

    #[test]
    fn test_embedding_backend_parses_lowercase() {
        let config = Config::builder()
            .set_override("openai_api_key", "test-key")
            .expect("override")
            .set_override("embedding_backend", "hashed")
            .expect("override")
            .build()
            .expect("config");

        let app_config: AppConfig = config.try_deserialize().expect("deserialize");
        assert_eq!(app_config.embedding_backend, EmbeddingBackend::Hashed);
    }
}
