use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ADMIN_API_VERSION: &str = "2025-01";
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo-0125";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub shopify: ShopifyConfig,
    pub llm: LlmConfig,
    pub enhancer: EnhancerConfig,
    pub notes: NotesConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ShopifyConfig {
    pub api_key: Option<SecretString>,
    pub access_token: SecretString,
    pub shop_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_steps: u32,
}

#[derive(Clone, Debug)]
pub struct EnhancerConfig {
    pub strategy: MatchStrategy,
    pub marker_tag: String,
    pub image_width: u32,
}

#[derive(Clone, Debug)]
pub struct NotesConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// How the enhancer finds product mentions in agent output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Product names wrapped in a marker element such as `<h3>Blue Mug</h3>`.
    Marker,
    /// Bold or line-leading title text followed by ` - Price`, `:` or a line break.
    TitleLine,
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
    pub shopify_access_token: Option<String>,
    pub shopify_shop_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub match_strategy: Option<MatchStrategy>,
    pub notes_path: Option<PathBuf>,
    pub log_level: Option<String>,
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

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            shopify: ShopifyConfig {
                api_key: None,
                access_token: String::new().into(),
                shop_url: String::new(),
                api_version: DEFAULT_ADMIN_API_VERSION.to_string(),
                timeout_secs: 30,
            },
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: DEFAULT_LLM_BASE_URL.to_string(),
                model: DEFAULT_LLM_MODEL.to_string(),
                timeout_secs: 60,
                max_steps: 8,
            },
            enhancer: EnhancerConfig {
                strategy: MatchStrategy::Marker,
                marker_tag: "h3".to_string(),
                image_width: 100,
            },
            notes: NotesConfig { path: PathBuf::from("data").join("notes.text") },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8501,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for MatchStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "marker" => Ok(Self::Marker),
            "title_line" => Ok(Self::TitleLine),
            other => Err(ConfigError::Validation(format!(
                "unsupported match strategy `{other}` (expected marker|title_line)"
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

impl ShopifyConfig {
    /// Scheme + host of the storefront, e.g. `https://myshop.myshopify.com`.
    pub fn shop_base_url(&self) -> String {
        let trimmed = self.shop_url.trim().trim_end_matches('/');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        }
    }

    pub fn admin_base_url(&self) -> String {
        format!("{}/admin/api/{}", self.shop_base_url(), self.api_version)
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("storefront.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(shopify) = patch.shopify {
            if let Some(api_key) = shopify.api_key {
                self.shopify.api_key = Some(secret_value(api_key));
            }
            if let Some(access_token) = shopify.access_token {
                self.shopify.access_token = secret_value(access_token);
            }
            if let Some(shop_url) = shopify.shop_url {
                self.shopify.shop_url = shop_url;
            }
            if let Some(api_version) = shopify.api_version {
                self.shopify.api_version = api_version;
            }
            if let Some(timeout_secs) = shopify.timeout_secs {
                self.shopify.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = secret_value(api_key);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_steps) = llm.max_steps {
                self.llm.max_steps = max_steps;
            }
        }

        if let Some(enhancer) = patch.enhancer {
            if let Some(strategy) = enhancer.strategy {
                self.enhancer.strategy = strategy;
            }
            if let Some(marker_tag) = enhancer.marker_tag {
                self.enhancer.marker_tag = marker_tag;
            }
            if let Some(image_width) = enhancer.image_width {
                self.enhancer.image_width = image_width;
            }
        }

        if let Some(notes) = patch.notes {
            if let Some(path) = notes.path {
                self.notes.path = path;
            }
        }

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
        // The unprefixed names are the ones the storefront tooling has always exported.
        if let Some(value) =
            read_env("STOREFRONT_SHOPIFY_API_KEY").or_else(|| read_env("SHOPIFY_API_KEY"))
        {
            self.shopify.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("STOREFRONT_SHOPIFY_ACCESS_TOKEN")
            .or_else(|| read_env("SHOPIFY_ACCESS_TOKEN"))
        {
            self.shopify.access_token = secret_value(value);
        }
        if let Some(value) =
            read_env("STOREFRONT_SHOPIFY_SHOP_URL").or_else(|| read_env("SHOPIFY_SHOP_URL"))
        {
            self.shopify.shop_url = value;
        }
        if let Some(value) = read_env("STOREFRONT_SHOPIFY_API_VERSION") {
            self.shopify.api_version = value;
        }
        if let Some(value) = read_env("STOREFRONT_SHOPIFY_TIMEOUT_SECS") {
            self.shopify.timeout_secs = parse_u64("STOREFRONT_SHOPIFY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) =
            read_env("STOREFRONT_LLM_API_KEY").or_else(|| read_env("OPENAI_API_KEY"))
        {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("STOREFRONT_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("STOREFRONT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("STOREFRONT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("STOREFRONT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_LLM_MAX_STEPS") {
            self.llm.max_steps = parse_u32("STOREFRONT_LLM_MAX_STEPS", &value)?;
        }

        if let Some(value) = read_env("STOREFRONT_ENHANCER_STRATEGY") {
            self.enhancer.strategy = value.parse()?;
        }
        if let Some(value) = read_env("STOREFRONT_ENHANCER_MARKER_TAG") {
            self.enhancer.marker_tag = value;
        }
        if let Some(value) = read_env("STOREFRONT_ENHANCER_IMAGE_WIDTH") {
            self.enhancer.image_width = parse_u32("STOREFRONT_ENHANCER_IMAGE_WIDTH", &value)?;
        }

        if let Some(value) = read_env("STOREFRONT_NOTES_PATH") {
            self.notes.path = PathBuf::from(value);
        }

        if let Some(value) = read_env("STOREFRONT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STOREFRONT_SERVER_PORT") {
            self.server.port = parse_u16("STOREFRONT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("STOREFRONT_LOGGING_LEVEL").or_else(|| read_env("STOREFRONT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STOREFRONT_LOGGING_FORMAT").or_else(|| read_env("STOREFRONT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(access_token) = overrides.shopify_access_token {
            self.shopify.access_token = secret_value(access_token);
        }
        if let Some(shop_url) = overrides.shopify_shop_url {
            self.shopify.shop_url = shop_url;
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = secret_value(api_key);
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = base_url;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(strategy) = overrides.match_strategy {
            self.enhancer.strategy = strategy;
        }
        if let Some(path) = overrides.notes_path {
            self.notes.path = path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_shopify(&self.shopify)?;
        validate_llm(&self.llm)?;
        validate_enhancer(&self.enhancer)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("storefront.toml"), PathBuf::from("config/storefront.toml")]
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

fn validate_shopify(shopify: &ShopifyConfig) -> Result<(), ConfigError> {
    if shopify.shop_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "shopify.shop_url is required (e.g. `myshop.myshopify.com`); set SHOPIFY_SHOP_URL"
                .to_string(),
        ));
    }
    if shopify.shop_url.contains(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "shopify.shop_url must not contain whitespace".to_string(),
        ));
    }

    if shopify.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "shopify.access_token is required. Get it from Shopify admin > Apps > Develop apps > API credentials; set SHOPIFY_ACCESS_TOKEN".to_string(),
        ));
    }

    if shopify.api_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "shopify.api_version must be a dated version such as `2025-01`".to_string(),
        ));
    }

    if shopify.timeout_secs == 0 || shopify.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "shopify.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.api_key is required; set OPENAI_API_KEY".to_string(),
        ));
    }

    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_steps == 0 {
        return Err(ConfigError::Validation(
            "llm.max_steps must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_enhancer(enhancer: &EnhancerConfig) -> Result<(), ConfigError> {
    let tag = enhancer.marker_tag.trim();
    if tag.is_empty() || !tag.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation(
            "enhancer.marker_tag must be a bare element name such as `h3`".to_string(),
        ));
    }

    if enhancer.image_width == 0 {
        return Err(ConfigError::Validation(
            "enhancer.image_width must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
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

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    shopify: Option<ShopifyPatch>,
    llm: Option<LlmPatch>,
    enhancer: Option<EnhancerPatch>,
    notes: Option<NotesPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ShopifyPatch {
    api_key: Option<String>,
    access_token: Option<String>,
    shop_url: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_steps: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct EnhancerPatch {
    strategy: Option<MatchStrategy>,
    marker_tag: Option<String>,
    image_width: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct NotesPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
