use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use orderbot_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let endpoint = config
        .classifier
        .endpoint
        .as_ref()
        .map(redact_endpoint)
        .unwrap_or_else(|| "<unset>".to_string());

    let fields = [
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            source("server.bind_address", &["ORDERBOT_SERVER_BIND_ADDRESS"]),
        ),
        ("server.port", config.server.port.to_string(), source("server.port", &["ORDERBOT_SERVER_PORT"])),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            source("server.graceful_shutdown_secs", &["ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
        ),
        (
            "storage.backend",
            format!("{:?}", config.storage.backend),
            source("storage.backend", &["ORDERBOT_STORAGE_BACKEND"]),
        ),
        ("storage.url", config.storage.url.clone(), source("storage.url", &["ORDERBOT_STORAGE_URL"])),
        (
            "storage.timeout_secs",
            config.storage.timeout_secs.to_string(),
            source("storage.timeout_secs", &["ORDERBOT_STORAGE_TIMEOUT_SECS"]),
        ),
        (
            "classifier.provider",
            format!("{:?}", config.classifier.provider),
            source("classifier.provider", &["ORDERBOT_CLASSIFIER_PROVIDER"]),
        ),
        (
            "classifier.endpoint",
            endpoint,
            source("classifier.endpoint", &["ORDERBOT_CLASSIFIER_ENDPOINT", "LUIS_URL"]),
        ),
        (
            "classifier.min_confidence",
            config.classifier.min_confidence.to_string(),
            source("classifier.min_confidence", &["ORDERBOT_CLASSIFIER_MIN_CONFIDENCE"]),
        ),
        (
            "classifier.timeout_ms",
            config.classifier.timeout_ms.to_string(),
            source("classifier.timeout_ms", &["ORDERBOT_CLASSIFIER_TIMEOUT_MS"]),
        ),
        (
            "catalog.path",
            config.catalog.path.display().to_string(),
            source("catalog.path", &["ORDERBOT_CATALOG_PATH"]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["ORDERBOT_LOGGING_LEVEL", "ORDERBOT_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            source("logging.format", &["ORDERBOT_LOGGING_FORMAT", "ORDERBOT_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|(key, value, source)| render_line(key, value, source)));
    lines.join("\n")
}

/// Keeps scheme, host and path; the query string carries the subscription key.
pub fn redact_endpoint(endpoint: &SecretString) -> String {
    let raw = endpoint.expose_secret().trim();
    if raw.is_empty() {
        return "<empty>".to_string();
    }

    match raw.split_once('?') {
        Some((base, _)) => format!("{base}?<redacted>"),
        None => raw.to_string(),
    }
}

fn detect_config_path() -> Option<PathBuf> {
    ["orderbot.toml", "config/orderbot.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: &str) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{contains_path, redact_endpoint};

    #[test]
    fn endpoint_query_is_redacted() {
        let endpoint = SecretString::from(
            "https://westus.api.cognitive.microsoft.com/luis/v2.0/apps/abc?subscription-key=s3cr3t&verbose=true"
                .to_string(),
        );

        let redacted = redact_endpoint(&endpoint);

        assert_eq!(redacted, "https://westus.api.cognitive.microsoft.com/luis/v2.0/apps/abc?<redacted>");
        assert!(!redacted.contains("s3cr3t"));
    }

    #[test]
    fn nested_keys_are_found_in_toml() {
        let doc = "[classifier]\nprovider = \"luis\"\n".parse::<toml::Value>().expect("toml");

        assert!(contains_path(&doc, "classifier.provider"));
        assert!(!contains_path(&doc, "classifier.endpoint"));
    }
}
