use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

const ENV_VAR_NAME: &str = "BOOKCATALOG_ENV";
const CONFIG_DIR_ENV: &str = "BOOKCATALOG_CONFIG_DIR";

/// Configuration of the service, layered from `config/base.toml`,
/// `config/<BOOKCATALOG_ENV>.toml` and `BOOKCATALOG_*` environment variables
/// (nested keys separated by `__`, e.g. `BOOKCATALOG_STORE__BACKEND`)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub seed: SeedSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        // Missing `.env` is fine
        let _ = dotenvy::dotenv();

        let config_dir = std::env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));
        let mut builder = config::Config::builder()
            .add_source(config::File::from(config_dir.join("base.toml")).required(false));
        if let Ok(environment) = std::env::var(ENV_VAR_NAME) {
            builder = builder.add_source(
                config::File::from(config_dir.join(format!("{}.toml", environment)))
                    .required(false),
            );
        }

        builder
            .add_source(
                config::Environment::with_prefix("BOOKCATALOG")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_templates_dir")]
    pub templates_dir: String,
    #[serde(default = "ServerSettings::default_static_dir")]
    pub static_dir: String,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3030
    }

    fn default_templates_dir() -> String {
        "views".to_string()
    }

    fn default_static_dir() -> String {
        "css".to_string()
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            templates_dir: Self::default_templates_dir(),
            static_dir: Self::default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Mongodb,
    Postgres,
    InMemory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "StoreSettings::default_database")]
    pub database: String,
    #[serde(default = "StoreSettings::default_collection")]
    pub collection: String,
    #[serde(default)]
    pub mongodb: MongoSettings,
    #[serde(default)]
    pub postgres: PostgresSettings,
}

impl StoreSettings {
    fn default_database() -> String {
        "exercise-1".to_string()
    }

    fn default_collection() -> String {
        "information".to_string()
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database: Self::default_database(),
            collection: Self::default_collection(),
            mongodb: MongoSettings::default(),
            postgres: PostgresSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoSettings {
    #[serde(default = "MongoSettings::default_uri")]
    pub uri: String,
    #[serde(default = "MongoSettings::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl MongoSettings {
    fn default_uri() -> String {
        "mongodb://localhost:27017".to_string()
    }

    fn default_connect_timeout_secs() -> u64 {
        10
    }
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            connect_timeout_secs: Self::default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresSettings {
    #[serde(default = "PostgresSettings::default_hostname")]
    pub hostname: String,
    #[serde(default = "PostgresSettings::default_username")]
    pub username: String,
    #[serde(default = "PostgresSettings::default_password")]
    pub password: String,
}

impl PostgresSettings {
    fn default_hostname() -> String {
        "127.0.0.1".to_string()
    }

    fn default_username() -> String {
        "postgres".to_string()
    }

    fn default_password() -> String {
        "postgres".to_string()
    }
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            hostname: Self::default_hostname(),
            username: Self::default_username(),
            password: Self::default_password(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    #[serde(default = "SeedSettings::default_enabled")]
    pub enabled: bool,
    /// Json array of books used instead of the built-in fixtures
    #[serde(default)]
    pub fixtures_path: Option<PathBuf>,
}

impl SeedSettings {
    fn default_enabled() -> bool {
        true
    }
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            fixtures_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default = "TelemetrySettings::default_service_name")]
    pub service_name: String,
    /// Export spans to a local jaeger agent
    #[serde(default)]
    pub jaeger_enabled: bool,
}

impl TelemetrySettings {
    fn default_service_name() -> String {
        "bookcatalog".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: Self::default_service_name(),
            jaeger_enabled: false,
        }
    }
}
