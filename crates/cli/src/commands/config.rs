use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use storefront_core::config::{AppConfig, LoadOptions};
use toml::Value;

use super::{CommandResult, EXIT_CONFIG};

/// One reported setting: its dotted key, display value and the environment
/// variables that can set it, highest priority first.
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: EXIT_CONFIG,
                output: format!("config validation failed: {error}"),
            }
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::plain(lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let api_key = config
        .shopify
        .api_key
        .as_ref()
        .map(redact_secret)
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        Field {
            key: "shopify.shop_url",
            value: config.shopify.shop_url.clone(),
            env_keys: &["STOREFRONT_SHOPIFY_SHOP_URL", "SHOPIFY_SHOP_URL"],
        },
        Field {
            key: "shopify.api_version",
            value: config.shopify.api_version.clone(),
            env_keys: &["STOREFRONT_SHOPIFY_API_VERSION"],
        },
        Field {
            key: "shopify.access_token",
            value: redact_secret(&config.shopify.access_token),
            env_keys: &["STOREFRONT_SHOPIFY_ACCESS_TOKEN", "SHOPIFY_ACCESS_TOKEN"],
        },
        Field {
            key: "shopify.api_key",
            value: api_key,
            env_keys: &["STOREFRONT_SHOPIFY_API_KEY", "SHOPIFY_API_KEY"],
        },
        Field {
            key: "shopify.timeout_secs",
            value: config.shopify.timeout_secs.to_string(),
            env_keys: &["STOREFRONT_SHOPIFY_TIMEOUT_SECS"],
        },
        Field {
            key: "llm.base_url",
            value: config.llm.base_url.clone(),
            env_keys: &["STOREFRONT_LLM_BASE_URL"],
        },
        Field {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["STOREFRONT_LLM_MODEL"],
        },
        Field {
            key: "llm.api_key",
            value: redact_secret(&config.llm.api_key),
            env_keys: &["STOREFRONT_LLM_API_KEY", "OPENAI_API_KEY"],
        },
        Field {
            key: "llm.max_steps",
            value: config.llm.max_steps.to_string(),
            env_keys: &["STOREFRONT_LLM_MAX_STEPS"],
        },
        Field {
            key: "enhancer.strategy",
            value: format!("{:?}", config.enhancer.strategy),
            env_keys: &["STOREFRONT_ENHANCER_STRATEGY"],
        },
        Field {
            key: "enhancer.marker_tag",
            value: config.enhancer.marker_tag.clone(),
            env_keys: &["STOREFRONT_ENHANCER_MARKER_TAG"],
        },
        Field {
            key: "enhancer.image_width",
            value: config.enhancer.image_width.to_string(),
            env_keys: &["STOREFRONT_ENHANCER_IMAGE_WIDTH"],
        },
        Field {
            key: "notes.path",
            value: config.notes.path.display().to_string(),
            env_keys: &["STOREFRONT_NOTES_PATH"],
        },
        Field {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["STOREFRONT_SERVER_BIND_ADDRESS"],
        },
        Field {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["STOREFRONT_SERVER_PORT"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["STOREFRONT_LOGGING_LEVEL", "STOREFRONT_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["STOREFRONT_LOGGING_FORMAT", "STOREFRONT_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["storefront.toml", "config/storefront.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
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

fn redact_secret(secret: &SecretString) -> String {
    redact_token(secret.expose_secret())
}

/// Keeps a recognisable prefix such as `shpat_` or `sk-` and hides the rest.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.find(|ch: char| ch == '-' || ch == '_') {
        Some(index) if index > 0 && index <= 8 => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}
