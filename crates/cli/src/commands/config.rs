use std::env;
use std::fs;
use std::path::Path;

use shiptrack_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let seed_path = config
        .store
        .seed_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in>".to_string());
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let fields = [
        (
            "ratings.path",
            config.ratings.path.display().to_string(),
            source("ratings.path", &["SHIPTRACK_RATINGS_PATH"]),
        ),
        ("store.seed_path", seed_path, source("store.seed_path", &["SHIPTRACK_STORE_SEED_PATH"])),
        ("llm.base_url", config.llm.base_url.clone(), source("llm.base_url", &["SHIPTRACK_LLM_BASE_URL"])),
        ("llm.model", config.llm.model.clone(), source("llm.model", &["SHIPTRACK_LLM_MODEL"])),
        ("llm.api_key", llm_api_key.to_string(), source("llm.api_key", &["SHIPTRACK_LLM_API_KEY"])),
        (
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            source("llm.timeout_secs", &["SHIPTRACK_LLM_TIMEOUT_SECS"]),
        ),
        (
            "llm.max_retries",
            config.llm.max_retries.to_string(),
            source("llm.max_retries", &["SHIPTRACK_LLM_MAX_RETRIES"]),
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            source("server.bind_address", &["SHIPTRACK_SERVER_BIND_ADDRESS"]),
        ),
        ("server.port", config.server.port.to_string(), source("server.port", &["SHIPTRACK_SERVER_PORT"])),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["SHIPTRACK_LOGGING_LEVEL", "SHIPTRACK_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            source("logging.format", &["SHIPTRACK_LOGGING_FORMAT", "SHIPTRACK_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.into_iter().map(|(key, value, source)| render_line(key, &value, source)));
    lines.join("\n")
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
