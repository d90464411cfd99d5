use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reply::validate_template;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub classifier: ClassifierConfig,
    pub catalog: CatalogConfig,
    pub replies: RepliesConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub provider: ClassifierProvider,
    /// Full recognizer URL. It carries the subscription key, so it is secret.
    pub endpoint: Option<SecretString>,
    pub min_confidence: f32,
    pub timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepliesConfig {
    pub greeting: String,
    pub working_hours: String,
    pub order_added: String,
    pub fallback: String,
    pub apology: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierProvider {
    Luis,
    Keyword,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub storage_backend: Option<StorageBackend>,
    pub storage_url: Option<String>,
    pub classifier_provider: Option<ClassifierProvider>,
    pub classifier_endpoint: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            greeting: "Boa noite, Pizzaria Kalabalis, o que deseja?".to_string(),
            working_hours: "Trabalhamos das 11:00 às 15:00 e das 18:00 às 24:00".to_string(),
            order_added: "Pedido adicionado".to_string(),
            fallback: "You reached the default message handler. You said '{{ text }}'."
                .to_string(),
            apology: "Desculpe, tivemos um problema. Tente novamente em instantes.".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3978,
                graceful_shutdown_secs: 15,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                url: "sqlite://orderbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 5,
            },
            classifier: ClassifierConfig {
                provider: ClassifierProvider::Keyword,
                endpoint: None,
                min_confidence: 0.1,
                timeout_ms: 3_000,
            },
            catalog: CatalogConfig { path: PathBuf::from("config/menu.json") },
            replies: RepliesConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unsupported storage backend `{other}` (expected memory|sqlite)"
            ))),
        }
    }
}

impl std::str::FromStr for ClassifierProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "luis" => Ok(Self::Luis),
            "keyword" => Ok(Self::Keyword),
            other => Err(ConfigError::Validation(format!(
                "unsupported classifier provider `{other}` (expected luis|keyword)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("orderbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(backend) = storage.backend {
                self.storage.backend = backend;
            }
            if let Some(url) = storage.url {
                self.storage.url = url;
            }
            if let Some(max_connections) = storage.max_connections {
                self.storage.max_connections = max_connections;
            }
            if let Some(timeout_secs) = storage.timeout_secs {
                self.storage.timeout_secs = timeout_secs;
            }
        }

        if let Some(classifier) = patch.classifier {
            if let Some(provider) = classifier.provider {
                self.classifier.provider = provider;
            }
            if let Some(endpoint) = classifier.endpoint {
                self.classifier.endpoint = Some(secret_value(endpoint));
            }
            if let Some(min_confidence) = classifier.min_confidence {
                self.classifier.min_confidence = min_confidence;
            }
            if let Some(timeout_ms) = classifier.timeout_ms {
                self.classifier.timeout_ms = timeout_ms;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = path;
            }
        }

        if let Some(replies) = patch.replies {
            if let Some(greeting) = replies.greeting {
                self.replies.greeting = greeting;
            }
            if let Some(working_hours) = replies.working_hours {
                self.replies.working_hours = working_hours;
            }
            if let Some(order_added) = replies.order_added {
                self.replies.order_added = order_added;
            }
            if let Some(fallback) = replies.fallback {
                self.replies.fallback = fallback;
            }
            if let Some(apology) = replies.apology {
                self.replies.apology = apology;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ORDERBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ORDERBOT_SERVER_PORT") {
            self.server.port = parse_u16("ORDERBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("ORDERBOT_STORAGE_BACKEND") {
            self.storage.backend = value.parse()?;
        }
        if let Some(value) = read_env("ORDERBOT_STORAGE_URL") {
            self.storage.url = value;
        }
        if let Some(value) = read_env("ORDERBOT_STORAGE_MAX_CONNECTIONS") {
            self.storage.max_connections = parse_u32("ORDERBOT_STORAGE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_STORAGE_TIMEOUT_SECS") {
            self.storage.timeout_secs = parse_u64("ORDERBOT_STORAGE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ORDERBOT_CLASSIFIER_PROVIDER") {
            self.classifier.provider = value.parse()?;
        }
        let endpoint = read_env("ORDERBOT_CLASSIFIER_ENDPOINT").or_else(|| read_env("LUIS_URL"));
        if let Some(value) = endpoint {
            self.classifier.endpoint = Some(secret_value(value));
        }
        if let Some(value) = read_env("ORDERBOT_CLASSIFIER_MIN_CONFIDENCE") {
            self.classifier.min_confidence = parse_f32("ORDERBOT_CLASSIFIER_MIN_CONFIDENCE", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_CLASSIFIER_TIMEOUT_MS") {
            self.classifier.timeout_ms = parse_u64("ORDERBOT_CLASSIFIER_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = read_env("ORDERBOT_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(value);
        }

        let log_level =
            read_env("ORDERBOT_LOGGING_LEVEL").or_else(|| read_env("ORDERBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ORDERBOT_LOGGING_FORMAT").or_else(|| read_env("ORDERBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend) = overrides.storage_backend {
            self.storage.backend = backend;
        }
        if let Some(url) = overrides.storage_url {
            self.storage.url = url;
        }
        if let Some(provider) = overrides.classifier_provider {
            self.classifier.provider = provider;
        }
        if let Some(endpoint) = overrides.classifier_endpoint {
            self.classifier.endpoint = Some(secret_value(endpoint));
        }
        if let Some(path) = overrides.catalog_path {
            self.catalog.path = path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_storage(&self.storage)?;
        validate_classifier(&self.classifier)?;
        validate_catalog(&self.catalog)?;
        validate_replies(&self.replies)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("orderbot.toml"), PathBuf::from("config/orderbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.backend == StorageBackend::Sqlite {
        let url = storage.url.trim();
        let sqlite_url =
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
        if !sqlite_url {
            return Err(ConfigError::Validation(
                "storage.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                    .to_string(),
            ));
        }

        if storage.max_connections == 0 {
            return Err(ConfigError::Validation(
                "storage.max_connections must be greater than zero".to_string(),
            ));
        }
    }

    if storage.timeout_secs == 0 || storage.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "storage.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_classifier(classifier: &ClassifierConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&classifier.min_confidence) {
        return Err(ConfigError::Validation(
            "classifier.min_confidence must be in range 0.0..=1.0".to_string(),
        ));
    }

    if classifier.timeout_ms == 0 || classifier.timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "classifier.timeout_ms must be in range 1..=60000".to_string(),
        ));
    }

    if classifier.provider == ClassifierProvider::Luis {
        let endpoint = classifier
            .endpoint
            .as_ref()
            .map(|value| value.expose_secret().trim().to_string())
            .unwrap_or_default();
        if endpoint.is_empty() {
            return Err(ConfigError::Validation(
                "classifier.endpoint is required for the luis provider (set ORDERBOT_CLASSIFIER_ENDPOINT or LUIS_URL)"
                    .to_string(),
            ));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(
                "classifier.endpoint must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("catalog.path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_replies(replies: &RepliesConfig) -> Result<(), ConfigError> {
    let templates = [
        ("replies.greeting", &replies.greeting),
        ("replies.working_hours", &replies.working_hours),
        ("replies.order_added", &replies.order_added),
        ("replies.fallback", &replies.fallback),
    ];

    for (key, template) in templates {
        if template.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
        validate_template(template)
            .map_err(|error| ConfigError::Validation(format!("{key} is not a valid template: {error}")))?;
    }

    // Sent verbatim when a turn fails, so it is plain text rather than a template.
    if replies.apology.trim().is_empty() {
        return Err(ConfigError::Validation("replies.apology must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    storage: Option<StoragePatch>,
    classifier: Option<ClassifierPatch>,
    catalog: Option<CatalogPatch>,
    replies: Option<RepliesPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    backend: Option<StorageBackend>,
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ClassifierPatch {
    provider: Option<ClassifierProvider>,
    endpoint: Option<String>,
    min_confidence: Option<f32>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RepliesPatch {
    greeting: Option<String>,
    working_hours: Option<String>,
    order_added: Option<String>,
    fallback: Option<String>,
    apology: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ClassifierProvider, ConfigError, ConfigOverrides, LoadOptions, LogFormat,
        StorageBackend,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const MANAGED_VARS: &[&str] = &[
        "ORDERBOT_STORAGE_BACKEND",
        "ORDERBOT_STORAGE_URL",
        "ORDERBOT_CLASSIFIER_PROVIDER",
        "ORDERBOT_CLASSIFIER_ENDPOINT",
        "ORDERBOT_CLASSIFIER_TIMEOUT_MS",
        "ORDERBOT_LOG_LEVEL",
        "ORDERBOT_LOG_FORMAT",
        "LUIS_URL",
        "TEST_LUIS_URL",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_run_offline_without_any_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("does-not-exist.toml")),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.server.port == 3978, "default port should match the emulator endpoint")?;
        ensure(config.storage.backend == StorageBackend::Memory, "memory storage by default")?;
        ensure(
            config.classifier.provider == ClassifierProvider::Keyword,
            "keyword classifier by default",
        )?;
        ensure(
            config.replies.greeting == "Boa noite, Pizzaria Kalabalis, o que deseja?",
            "greeting default",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("TEST_LUIS_URL", "https://luis.example/apps/pizza?subscription-key=abc");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("orderbot.toml");
            fs::write(
                &path,
                r#"
[classifier]
provider = "luis"
endpoint = "${TEST_LUIS_URL}"
min_confidence = 0.4

[replies]
greeting = "Olá!"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.classifier.endpoint.as_ref().map(|value| value.expose_secret().to_string())
                    == Some("https://luis.example/apps/pizza?subscription-key=abc".to_string()),
                "endpoint should be interpolated from the environment",
            )?;
            ensure(config.classifier.min_confidence == 0.4, "min confidence from file")?;
            ensure(config.replies.greeting == "Olá!", "greeting from file")?;
            ensure(config.replies.order_added == "Pedido adicionado", "untouched reply keeps default")?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn legacy_luis_url_variable_is_honoured() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("ORDERBOT_CLASSIFIER_PROVIDER", "luis");
        env::set_var("LUIS_URL", "https://luis.example/apps/legacy");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.classifier.provider == ClassifierProvider::Luis, "provider from env")?;
            ensure(
                config.classifier.endpoint.as_ref().map(|value| value.expose_secret().to_string())
                    == Some("https://luis.example/apps/legacy".to_string()),
                "LUIS_URL should feed the endpoint",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("ORDERBOT_STORAGE_URL", "sqlite://from-env.db");
        env::set_var("ORDERBOT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("orderbot.toml");
            fs::write(
                &path,
                r#"
[storage]
backend = "sqlite"
url = "sqlite://from-file.db"

[logging]
level = "warn"
format = "json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    storage_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.storage.backend == StorageBackend::Sqlite, "file backend should apply")?;
            ensure(
                config.storage.url == "sqlite://from-override.db",
                "override storage url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "env log format should win over file",
            )?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn luis_provider_without_endpoint_fails_fast() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("ORDERBOT_CLASSIFIER_PROVIDER", "luis");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("classifier.endpoint")
            );
            ensure(has_message, "validation failure should mention classifier.endpoint")
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn invalid_numeric_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("ORDERBOT_CLASSIFIER_TIMEOUT_MS", "soon");

        let result = (|| -> Result<(), String> {
            let error = AppConfig::load(LoadOptions::default())
                .err()
                .ok_or_else(|| "expected env override failure".to_string())?;
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "ORDERBOT_CLASSIFIER_TIMEOUT_MS"),
                "error should name the offending variable",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn broken_reply_template_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("orderbot.toml");
        fs::write(&path, "[replies]\nfallback = \"Você disse {{ mensagem }}\"\n")
            .map_err(|err| err.to_string())?;

        let error = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            .err()
            .ok_or_else(|| "expected template validation failure".to_string())?;

        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("replies.fallback")),
            "validation failure should name replies.fallback",
        )
    }

    #[test]
    fn apology_is_plain_text_not_a_template() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("orderbot.toml");
        fs::write(&path, "[replies]\napology = \"Desculpe {{ erro }}, tente de novo\"\n")
            .map_err(|err| err.to_string())?;

        let config = AppConfig::load(LoadOptions { config_path: Some(path.clone()), ..LoadOptions::default() })
            .map_err(|err| format!("apology with braces should load: {err}"))?;
        ensure(
            config.replies.apology == "Desculpe {{ erro }}, tente de novo",
            "apology should be kept verbatim",
        )?;

        fs::write(&path, "[replies]\napology = \"   \"\n").map_err(|err| err.to_string())?;
        let error = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            .err()
            .ok_or_else(|| "expected blank apology to fail".to_string())?;

        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("replies.apology")),
            "validation failure should name replies.apology",
        )
    }

    #[test]
    fn required_file_must_exist() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("missing/orderbot.toml")),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("missing required file");

        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn secret_endpoint_is_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("ORDERBOT_CLASSIFIER_ENDPOINT", "https://luis.example/?subscription-key=s3cr3t");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("s3cr3t"), "debug output should not contain the endpoint key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }
}
