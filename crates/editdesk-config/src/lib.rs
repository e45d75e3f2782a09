use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_SCHEMA: &str = include_str!("../../../config/config.schema.json");

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1-distill-llama-70b:free";
pub const MAX_TEMPERATURE: f64 = 0.2;

/// Credential variables, in lookup order.
pub const API_KEY_ENV: [&str; 2] = ["OPENROUTER_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config failed: {0}")]
    Read(String),
    #[error("parse config failed: {0}")]
    Parse(String),
    #[error("schema load failed: {0}")]
    SchemaLoad(String),
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub upstream: Upstream,
    pub defaults: Defaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub listen_addr: String,
    pub allowed_origin: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            allowed_origin: "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Upstream {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_ms: Option<u64>,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: None,
        }
    }
}

impl Upstream {
    /// The credential, if one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub action: String,
    pub language: String,
    pub tone: String,
    pub min_text_chars: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            action: "rewrite".to_string(),
            language: "ar".to_string(),
            tone: "formal".to_string(),
            min_text_chars: default_min_text_chars(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_temperature() -> f64 {
    0.05
}

fn default_max_tokens() -> u32 {
    1600
}

fn default_min_text_chars() -> usize {
    10
}

/// Loads the YAML file at `path` (or built-in defaults when `None`), applies
/// environment overrides and checks the result.
pub fn load(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut cfg = match path {
        Some(p) => read_and_validate(p)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    validate_runtime_support(&cfg)?;
    Ok(cfg)
}

pub fn load_and_validate(path: &str) -> Result<Config, ConfigError> {
    load(Some(path))
}

fn read_and_validate(path: &str) -> Result<Config, ConfigError> {
    let config_text =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
    parse_and_validate(&config_text)
}

/// Parses YAML text and checks it against the bundled JSON schema.
pub fn parse_and_validate(config_text: &str) -> Result<Config, ConfigError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(config_text).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut instance =
        serde_json::to_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
    if instance.is_null() {
        instance = serde_json::Value::Object(serde_json::Map::new());
    }
    validate_against_schema(&instance)?;

    serde_json::from_value(instance).map_err(|e| ConfigError::Parse(e.to_string()))
}

fn validate_against_schema(instance: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;

    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;
    if let Err(first) = validator.validate(instance) {
        return Err(ConfigError::SchemaValidation(first.to_string()));
    }
    Ok(())
}

/// Overrides file values with process environment, read through `lookup`.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = API_KEY_ENV.iter().find_map(|k| non_blank(*k)) {
        cfg.upstream.api_key = Some(key);
    }
    if let Some(model) = non_blank("MODEL") {
        cfg.upstream.model = model;
    }
    if let Some(raw) = non_blank("MAX_TOKENS") {
        cfg.upstream.max_tokens = raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::Parse(format!("MAX_TOKENS={raw}: {e}")))?;
    }
    if let Some(origin) = non_blank("ALLOWED_ORIGIN") {
        cfg.server.allowed_origin = origin;
    }
    Ok(())
}

fn validate_runtime_support(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.upstream.endpoint.trim().is_empty() {
        return Err(ConfigError::UnsupportedConfig(
            "upstream.endpoint must not be empty".to_string(),
        ));
    }
    if cfg.upstream.model.trim().is_empty() {
        return Err(ConfigError::UnsupportedConfig(
            "upstream.model must not be empty".to_string(),
        ));
    }
    if !(0.0..=MAX_TEMPERATURE).contains(&cfg.upstream.temperature) {
        return Err(ConfigError::UnsupportedConfig(format!(
            "upstream.temperature={} must be within [0, {MAX_TEMPERATURE}]",
            cfg.upstream.temperature
        )));
    }
    if cfg.upstream.max_tokens == 0 {
        return Err(ConfigError::UnsupportedConfig(
            "upstream.max_tokens must be >= 1".to_string(),
        ));
    }
    if cfg.upstream.timeout_ms == Some(0) {
        return Err(ConfigError::UnsupportedConfig(
            "upstream.timeout_ms must be >= 1 when set".to_string(),
        ));
    }
    if cfg.defaults.min_text_chars == 0 {
        return Err(ConfigError::UnsupportedConfig(
            "defaults.min_text_chars must be >= 1".to_string(),
        ));
    }
    if cfg.defaults.language != "ar" && cfg.defaults.language != "en" {
        return Err(ConfigError::UnsupportedConfig(format!(
            "defaults.language={} is not supported; supported: ar, en",
            cfg.defaults.language
        )));
    }
    if cfg.server.allowed_origin.trim().is_empty() {
        return Err(ConfigError::UnsupportedConfig(
            "server.allowed_origin must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn write_temp_config(contents: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("editdesk-config-test-{nanos}.yaml"));
        std::fs::write(&path, contents).expect("write temp config");
        path.to_string_lossy().to_string()
    }

    fn base_yaml() -> String {
        r#"
server:
  listen_addr: "127.0.0.1:0"
  allowed_origin: "https://example.org"

upstream:
  endpoint: "http://127.0.0.1:9/v1/chat/completions"
  model: "test-model"
  temperature: 0.1
  max_tokens: 800

defaults:
  action: "rewrite"
  language: "en"
  tone: "formal"
  min_text_chars: 8
"#
        .to_string()
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_full_config() {
        let cfg = parse_and_validate(&base_yaml()).expect("valid config");
        assert_eq!(cfg.server.allowed_origin, "https://example.org");
        assert_eq!(cfg.upstream.model, "test-model");
        assert_eq!(cfg.upstream.max_tokens, 800);
        assert_eq!(cfg.defaults.language, "en");
        assert_eq!(cfg.defaults.min_text_chars, 8);
        assert!(cfg.upstream.api_key().is_none());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse_and_validate("").expect("empty config is allowed");
        assert_eq!(cfg.upstream.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.upstream.max_tokens, 1600);
        assert_eq!(cfg.defaults.tone, "formal");
        assert_eq!(cfg.server.allowed_origin, "*");
    }

    #[test]
    fn loads_from_file() {
        let path = write_temp_config(&base_yaml());
        let cfg = load_and_validate(&path).expect("file config should load");
        assert_eq!(cfg.server.listen_addr, "127.0.0.1:0");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_and_validate("/definitely/not/here.yaml").expect_err("expected read error");
        assert!(matches!(err, ConfigError::Read(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = parse_and_validate(&format!("{}\nextra: 1\n", base_yaml()))
            .expect_err("expected schema error");
        assert!(matches!(err, ConfigError::SchemaValidation(_)));
    }

    #[test]
    fn rejects_high_temperature_at_runtime() {
        let cfg = parse_and_validate(&base_yaml().replace("temperature: 0.1", "temperature: 0.7"));
        let err = match cfg {
            Ok(cfg) => validate_runtime_support(&cfg).expect_err("expected unsupported config"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            ConfigError::SchemaValidation(_) | ConfigError::UnsupportedConfig(_)
        ));
    }

    #[test]
    fn rejects_unknown_default_language() {
        let mut cfg = parse_and_validate(&base_yaml()).unwrap();
        cfg.defaults.language = "fr".to_string();
        assert!(matches!(
            validate_runtime_support(&cfg),
            Err(ConfigError::UnsupportedConfig(_))
        ));
    }

    #[test]
    fn env_overrides_credentials_and_model() {
        let mut cfg = Config::default();
        apply_env_overrides(
            &mut cfg,
            env(&[
                ("OPENAI_API_KEY", "sk-openai"),
                ("MODEL", "other/model"),
                ("MAX_TOKENS", "400"),
                ("ALLOWED_ORIGIN", "https://app.example"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.upstream.api_key(), Some("sk-openai"));
        assert_eq!(cfg.upstream.model, "other/model");
        assert_eq!(cfg.upstream.max_tokens, 400);
        assert_eq!(cfg.server.allowed_origin, "https://app.example");
    }

    #[test]
    fn openrouter_key_wins_over_openai_key() {
        let mut cfg = Config::default();
        apply_env_overrides(
            &mut cfg,
            env(&[("OPENROUTER_API_KEY", "sk-or"), ("OPENAI_API_KEY", "sk-openai")]),
        )
        .unwrap();
        assert_eq!(cfg.upstream.api_key(), Some("sk-or"));
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.upstream.api_key = Some("   ".to_string());
        apply_env_overrides(&mut cfg, env(&[("OPENROUTER_API_KEY", "")])).unwrap();
        assert!(cfg.upstream.api_key().is_none());
    }

    #[test]
    fn bad_max_tokens_env_is_a_parse_error() {
        let mut cfg = Config::default();
        let err = apply_env_overrides(&mut cfg, env(&[("MAX_TOKENS", "lots")]))
            .expect_err("expected parse error");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
