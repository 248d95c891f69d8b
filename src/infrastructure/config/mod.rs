// ============================================================
// SETTINGS
// ============================================================
// Defaults -> TOML file -> KWC_* environment, layered with figment

use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};
use crate::domain::pipeline_config::PipelineConfig;

pub const DEFAULT_CONFIG_FILE: &str = "keyword_consolidator.toml";
pub const CONFIG_PATH_ENV: &str = "KWC_CONFIG";
pub const ENV_PREFIX: &str = "KWC_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding the keyword file. `None` keeps keywords in memory only.
    pub data_dir: Option<PathBuf>,
    /// Keyword file name, resolved against `data_dir` when relative
    pub keywords_file: PathBuf,
    /// Written once when no keyword file exists yet. Empty by default; see
    /// `keyword_consolidator.example.toml` for a starter list.
    pub seed_keywords: Vec<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: Some(PathBuf::from("data")),
            keywords_file: PathBuf::from("keywords.json"),
            seed_keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub pipeline: PipelineConfig,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            pipeline: PipelineConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load `.env`, then the TOML file (or `$KWC_CONFIG`), then `KWC_*` variables.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let figment = Self::base()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::from_figment(figment)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| AppError::ValidationError(format!("Invalid configuration: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(AppError::ValidationError(
                "server.host must not be empty".to_string(),
            ));
        }
        if self.storage.keywords_file.as_os_str().is_empty() {
            return Err(AppError::ValidationError(
                "storage.keywords_file must not be empty".to_string(),
            ));
        }
        self.pipeline
            .validate()
            .map_err(|e| AppError::ValidationError(format!("pipeline.{}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline_config::MatchMode;

    fn from_toml(toml: &str) -> Result<Settings> {
        Settings::from_figment(Settings::base().merge(Toml::string(toml)))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_figment(Settings::base()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.server.port, 5000);
        assert!(settings.storage.seed_keywords.is_empty());
        assert_eq!(settings.pipeline.output_filename, "combined_spreadsheet.xlsx");
    }

    #[test]
    fn test_toml_overrides_nested_values() {
        let settings = from_toml(
            r#"
            log_filter = "debug"

            [server]
            port = 8080

            [pipeline]
            match_mode = "legacy_word"
            source_column = "Source File"
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.pipeline.match_mode, MatchMode::LegacyWord);
        assert_eq!(settings.pipeline.source_column.as_deref(), Some("Source File"));
        assert_eq!(settings.pipeline.max_files, 50);
    }

    #[test]
    fn test_example_config_loads() {
        let settings = from_toml(include_str!("../../../keyword_consolidator.example.toml")).unwrap();
        assert_eq!(
            settings.storage.seed_keywords,
            ["sunco", "chandelier", "home depot"]
        );
        assert_eq!(settings.server, ServerSettings::default());
        assert_eq!(settings.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_invalid_pipeline_values_are_rejected() {
        let err = from_toml("[pipeline]\nsheet_name = \"a:b\"\n").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("sheet_name")));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let err = from_toml("[server]\nport = \"not a port\"\n").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
