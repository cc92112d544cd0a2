/*!
common/src/lib.rs

Shared configuration types for NEWSimplify.

This file provides:
- Config data structures (deserialized from TOML, every field defaulted)
- An async loader merging a default config file with an optional override
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Chat completion endpoint configuration (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Full URL of the chat completions endpoint
    pub api_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub top_p: f32,
    /// Client-side request timeout
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 1.0,
            max_tokens: 1024,
            top_p: 1.0,
            timeout_seconds: 60,
        }
    }
}

/// News search backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL of the DuckDuckGo frontend (token page and `news.js` live under it)
    pub endpoint: String,
    pub region: String,
    /// Raw results requested from the backend before filtering
    pub max_raw_results: usize,
    /// Results returned when the caller does not ask for a count
    pub default_count: usize,
    /// Results whose URL contains this substring are dropped
    pub blocked_domain: String,
    pub timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://duckduckgo.com".to_string(),
            region: "us-en".to_string(),
            max_raw_results: 10,
            default_count: 3,
            blocked_domain: "msn.com".to_string(),
            timeout_seconds: 20,
        }
    }
}

/// Article extraction configuration (static download + headless browser fallback)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// Path to a Chrome/Chromium executable; autodetected when absent
    pub chrome_path: Option<String>,
    pub headless: bool,
    /// Settle time after navigation before the rendered HTML is captured
    pub render_wait_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 20,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            chrome_path: None,
            headless: true,
            render_wait_ms: 1500,
        }
    }
}

/// HTTP server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Sessions untouched for this long are discarded
    pub session_idle_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            session_idle_minutes: 60,
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub extraction: ExtractionConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped; with neither present the built-in defaults apply.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_from_string_fills_defaults() {
        let toml = r#"
            [llm]
            model = "llama-3.1-8b-instant"

            [search]
            default_count = 5
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.llm.model, "llama-3.1-8b-instant");
        assert_eq!(cfg.llm.api_key_env, "GROQ_API_KEY");
        assert_eq!(cfg.llm.max_tokens, 1024);
        assert_eq!(cfg.search.default_count, 5);
        assert_eq!(cfg.search.max_raw_results, 10);
        assert_eq!(cfg.search.blocked_domain, "msn.com");
        assert!(cfg.extraction.headless);
    }

    #[test]
    fn empty_config_is_complete() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.session_idle_minutes, 60);
        assert!((cfg.llm.temperature - 1.0).abs() < f32::EPSILON);
        assert!(cfg.extraction.chrome_path.is_none());
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");

        let default_path = dir.path().join("config.default.toml");
        let mut f = std::fs::File::create(&default_path).expect("create default");
        writeln!(f, "[llm]\nmodel = \"base-model\"\ntimeout_seconds = 10\n\n[server]\nport = 9000").unwrap();

        let override_path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&override_path).expect("create override");
        writeln!(f, "[llm]\nmodel = \"override-model\"").unwrap();

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load merged config");

        assert_eq!(cfg.llm.model, "override-model");
        assert_eq!(cfg.llm.timeout_seconds, 10);
        assert_eq!(cfg.server.port, 9000);
    }

    #[tokio::test]
    async fn missing_files_fall_back_to_builtin_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let absent = dir.path().join("nope.toml");

        let cfg = Config::load_with_defaults(Some(&absent), None)
            .await
            .expect("load defaults");
        assert_eq!(cfg.search.region, "us-en");
    }
}
