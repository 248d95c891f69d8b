use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use crate::application::PipelineOrchestrator;
use crate::domain::error::Result;
use crate::domain::keywords::KeywordSet;
use crate::infrastructure::config::{Settings, StorageSettings};
use crate::infrastructure::keyword_store::{
    InMemoryKeywordStore, JsonFileKeywordStore, KeywordStore,
};
use crate::infrastructure::storage::{ensure_dir, resolve_in_data_dir};
use crate::interfaces::http::{add_log, start_server};

pub async fn run() -> std::io::Result<()> {
    let settings = Settings::load().map_err(std::io::Error::other)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let store = open_keyword_store(&settings.storage).map_err(std::io::Error::other)?;
    let orchestrator = Arc::new(PipelineOrchestrator::new(store, settings.pipeline.clone()));
    let logs = Arc::new(Mutex::new(Vec::new()));

    add_log(
        &logs,
        "INFO",
        "Startup",
        &format!(
            "Listening on {}:{} with {} negative keywords",
            settings.server.host,
            settings.server.port,
            orchestrator.keywords().len()
        ),
    );

    start_server(orchestrator, logs, &settings.server)?.await
}

fn open_keyword_store(storage: &StorageSettings) -> Result<Arc<dyn KeywordStore>> {
    match &storage.data_dir {
        Some(data_dir) => {
            ensure_dir(data_dir)?;
            let path = resolve_in_data_dir(data_dir, &storage.keywords_file);
            Ok(Arc::new(JsonFileKeywordStore::open(
                path,
                &storage.seed_keywords,
            )?))
        }
        None => {
            tracing::warn!("No data_dir configured, keywords will not survive a restart");
            Ok(Arc::new(InMemoryKeywordStore::new(KeywordSet::normalized(
                &storage.seed_keywords,
            ))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_store_persists_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageSettings {
            data_dir: Some(dir.path().join("nested")),
            seed_keywords: vec![
                "sunco".to_string(),
                "chandelier".to_string(),
                "home depot".to_string(),
            ],
            ..Default::default()
        };

        let store = open_keyword_store(&storage).unwrap();
        assert_eq!(store.get().as_slice(), ["sunco", "chandelier", "home depot"]);
        store.merge(&["shoe".to_string()]).unwrap();

        let reopened = open_keyword_store(&storage).unwrap();
        assert_eq!(reopened.get().len(), 4);
        assert!(dir.path().join("nested").join("keywords.json").exists());
    }

    #[test]
    fn test_default_storage_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageSettings {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(open_keyword_store(&storage).unwrap().get().is_empty());
    }

    #[test]
    fn test_in_memory_store_without_data_dir() {
        let storage = StorageSettings {
            data_dir: None,
            seed_keywords: vec!["a".to_string(), " a ".to_string()],
            ..Default::default()
        };
        let store = open_keyword_store(&storage).unwrap();
        assert_eq!(store.get().as_slice(), ["a"]);
    }
}
