use config::{Config, ConfigBuilder, ConfigError, FileFormat, builder::DefaultState};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub tables: TableNames,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    S3,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_s3_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Empty credentials fall back to the default AWS provider chain.
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_s3_bucket")]
    pub bucket: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            endpoint: default_s3_endpoint(),
            region: default_s3_region(),
            access_key: String::new(),
            secret_key: String::new(),
            bucket: default_s3_bucket(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TableNames {
    #[serde(default = "default_validation_table")]
    pub validation: String,
    #[serde(default = "default_transformation_table")]
    pub transformation: String,
    #[serde(default = "default_store_table")]
    pub store: String,
    #[serde(default = "default_final_table")]
    pub final_records: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            validation: default_validation_table(),
            transformation: default_transformation_table(),
            store: default_store_table(),
            final_records: default_final_table(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSettings {
    #[serde(default = "default_input_separator")]
    pub input_separator: String,
    #[serde(default = "default_transformed_separator")]
    pub transformed_separator: String,
    #[serde(default = "default_usd_to_eur")]
    pub usd_to_eur: f64,
    /// Store stage fails roughly once every `failsim_one_in` calls; 0 disables it.
    #[serde(default)]
    pub failsim_one_in: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input_separator: default_input_separator(),
            transformed_separator: default_transformed_separator(),
            usd_to_eur: default_usd_to_eur(),
            failsim_one_in: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

fn default_s3_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_s3_bucket() -> String {
    "taxi-pipeline".to_string()
}

fn default_validation_table() -> String {
    "validationStatus".to_string()
}

fn default_transformation_table() -> String {
    "transformationStatus".to_string()
}

fn default_store_table() -> String {
    "storeStatus".to_string()
}

fn default_final_table() -> String {
    "nycYellowTaxis".to_string()
}

fn default_input_separator() -> String {
    ",".to_string()
}

fn default_transformed_separator() -> String {
    "\t".to_string()
}

fn default_usd_to_eur() -> f64 {
    0.95
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_api_port() -> u16 {
    3000
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(config::File::with_name(path));
        Self::build(builder)
    }

    /// Loads settings from an in-memory TOML document, still honouring `APP__` overrides.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let builder =
            Config::builder().add_source(config::File::from_str(contents, FileFormat::Toml));
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config = builder
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;

        if settings.pipeline.input_separator == settings.pipeline.transformed_separator {
            return Err(ConfigError::Message(
                "input and transformed separators must differ".to_string(),
            ));
        }

        debug!(
            backend = ?settings.storage.backend,
            bucket = %settings.storage.bucket,
            "Parsed pipeline settings"
        );

        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            tables: TableNames::default(),
            pipeline: PipelineSettings::default(),
            retry: RetrySettings::default(),
            api_port: default_api_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty_document() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert_eq!(settings.tables.validation, "validationStatus");
        assert_eq!(settings.tables.final_records, "nycYellowTaxis");
        assert_eq!(settings.pipeline.input_separator, ",");
        assert_eq!(settings.pipeline.transformed_separator, "\t");
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.retry.initial_delay_ms, 1000);
        assert_eq!(settings.api_port, 3000);
    }

    #[test]
    fn test_sections_override_defaults() {
        let settings = Settings::from_toml(
            r#"
            api_port = 8080

            [storage]
            backend = "s3"
            bucket = "trips"

            [tables]
            store = "storeStatusV2"

            [pipeline]
            usd_to_eur = 0.9
            failsim_one_in = 100

            [retry]
            initial_delay_ms = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.api_port, 8080);
        assert_eq!(settings.storage.backend, StorageBackend::S3);
        assert_eq!(settings.storage.bucket, "trips");
        assert_eq!(settings.tables.store, "storeStatusV2");
        assert_eq!(settings.tables.transformation, "transformationStatus");
        assert_eq!(settings.pipeline.usd_to_eur, 0.9);
        assert_eq!(settings.pipeline.failsim_one_in, 100);
        assert_eq!(settings.retry.initial_delay_ms, 5);
        assert_eq!(settings.retry.max_retries, 3);
    }

    #[test]
    fn test_identical_separators_are_rejected() {
        let result = Settings::from_toml(
            r#"
            [pipeline]
            input_separator = ","
            transformed_separator = ","
            "#,
        );
        assert!(result.is_err());
    }
}
