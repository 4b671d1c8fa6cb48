use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::constants::{
    DEFAULT_FANOUT_CONCURRENCY, DEFAULT_TIMEOUT_SECS, ENV_ARRAY_STYLE, ENV_BASE_URL,
    ENV_FANOUT_CONCURRENCY, ENV_QUERY_ESCAPE, ENV_RESPONSE_MODE, ENV_TIMEOUT_SECS, ENV_TOKEN,
};
use crate::error::{GatewayError, Result};
use crate::request::{normalize_endpoint, QueryEncoding};
use crate::response::ResponseMode;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_fanout_concurrency() -> usize {
    DEFAULT_FANOUT_CONCURRENCY
}

/// Everything a gateway needs before the first call. Missing base URL or
/// token is fatal at startup.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub encoding: QueryEncoding,
    #[serde(default)]
    pub response_mode: ResponseMode,
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
}

#[derive(Deserialize)]
struct ConfigFile {
    moodle: GatewayConfig,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            encoding: QueryEncoding::default(),
            response_mode: ResponseMode::default(),
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }

    /// Loads from the given TOML file, or from the environment when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }

    /// Reads the `[moodle]` table of a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| GatewayError::Config(format!("invalid config file: {}", e)))?;
        file.moodle.validated()
    }

    /// Reads `MOODLE_*` variables, loading a `.env` file first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| GatewayError::Config(format!("{} is not set", key)))
        };
        let mut config = Self::new(required(ENV_BASE_URL)?, required(ENV_TOKEN)?);

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                GatewayError::Config(format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))
            })?;
        }
        if let Some(raw) = lookup(ENV_ARRAY_STYLE) {
            config.encoding.arrays = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_QUERY_ESCAPE) {
            config.encoding.escape = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_RESPONSE_MODE) {
            config.response_mode = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_FANOUT_CONCURRENCY) {
            config.fanout_concurrency = raw.trim().parse().map_err(|_| {
                GatewayError::Config(format!("{} must be a positive integer", ENV_FANOUT_CONCURRENCY))
            })?;
        }
        config.validated()
    }

    pub fn validated(self) -> Result<Self> {
        if self.base_url.trim().is_empty() {
            return Err(GatewayError::Config("base_url must not be empty".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(GatewayError::Config("token must not be empty".to_string()));
        }
        let endpoint = normalize_endpoint(&self.base_url);
        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| GatewayError::Config(format!("invalid base_url '{}': {}", self.base_url, e)))?;
        match url.scheme() {
            "https" => {}
            "http" => warn!("base_url uses plain http; the token travels unencrypted"),
            other => {
                return Err(GatewayError::Config(format!("unsupported URL scheme '{}'", other)));
            }
        }
        if self.timeout_secs == 0 {
            return Err(GatewayError::Config("timeout_secs must be greater than zero".to_string()));
        }
        if self.fanout_concurrency == 0 {
            return Err(GatewayError::Config("fanout_concurrency must be greater than zero".to_string()));
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .field("encoding", &self.encoding)
            .field("response_mode", &self.response_mode)
            .field("fanout_concurrency", &self.fanout_concurrency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ArrayStyle, EscapeMode};
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let err = GatewayConfig::from_lookup(lookup_from(&[("MOODLE_BASE_URL", "https://moodle.test")]))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config(msg) if msg.contains("MOODLE_TOKEN")));
    }

    #[test]
    fn missing_base_url_is_a_configuration_error() {
        let err = GatewayConfig::from_lookup(lookup_from(&[("MOODLE_TOKEN", "abc")])).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn environment_overrides_encoding_and_mode() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("MOODLE_BASE_URL", "https://moodle.test"),
            ("MOODLE_TOKEN", "abc"),
            ("MOODLE_TIMEOUT_SECS", "12"),
            ("MOODLE_ARRAY_STYLE", "repeated"),
            ("MOODLE_QUERY_ESCAPE", "literal"),
            ("MOODLE_RESPONSE_MODE", "strict"),
        ]))
        .unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(12));
        assert_eq!(config.encoding.arrays, ArrayStyle::Repeated);
        assert_eq!(config.encoding.escape, EscapeMode::Literal);
        assert_eq!(config.response_mode, ResponseMode::Strict);
        assert_eq!(config.fanout_concurrency, DEFAULT_FANOUT_CONCURRENCY);
    }

    #[test]
    fn unknown_escape_mode_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup_from(&[
            ("MOODLE_BASE_URL", "https://moodle.test"),
            ("MOODLE_TOKEN", "abc"),
            ("MOODLE_QUERY_ESCAPE", "sometimes"),
        ]))
        .unwrap_err();
        assert!(matches!(err, GatewayError::Config(msg) if msg.contains("sometimes")));
    }

    #[test]
    fn reads_moodle_table_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[moodle]\nbase_url = \"https://moodle.test/\"\ntoken = \"abc\"\nfanout_concurrency = 2\n\n[moodle.encoding]\nescape = \"literal\""
        )
        .unwrap();

        let config = GatewayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.fanout_concurrency, 2);
        assert_eq!(config.encoding.escape, EscapeMode::Literal);
        assert_eq!(config.encoding.arrays, ArrayStyle::Indexed);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = GatewayConfig::new("https://moodle.test", "abc");
        config.timeout_secs = 0;
        assert!(config.validated().is_err());
    }

    #[test]
    fn debug_output_hides_the_token() {
        let config = GatewayConfig::new("https://moodle.test", "very-secret");
        assert!(!format!("{:?}", config).contains("very-secret"));
    }
}
