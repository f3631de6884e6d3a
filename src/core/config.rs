use crate::core::types::Language;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.paladins.com/paladinsapi.svc";
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 120;
pub const DEFAULT_REQUESTS_PER_DAY: u32 = 7500;
pub const DEFAULT_MAX_RETRIES: usize = 4;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub developer_id: String,
    pub auth_key: Secret<String>,
    pub base_url: Option<String>,
    pub cache_enabled: bool,
    pub language: Language,
    pub response_timeout: Duration,
    /// Inactivity period after which the service drops a session.
    pub session_timeout: Duration,
    /// Hard cap on a session's age regardless of activity.
    pub session_max_age: Option<Duration>,
    pub requests_per_minute: u32,
    pub requests_per_day: u32,
    /// Age after which cached catalogs are refreshed in the background.
    pub cache_ttl: Option<Duration>,
    pub max_retries: usize,
    pub retry_base_delay: Duration,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ClientConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ClientConfig", 13)?;
        state.serialize_field("developer_id", &self.developer_id)?;
        state.serialize_field("auth_key", "[REDACTED]")?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("cache_enabled", &self.cache_enabled)?;
        state.serialize_field("language", &self.language)?;
        state.serialize_field("response_timeout_secs", &self.response_timeout.as_secs())?;
        state.serialize_field("session_timeout_secs", &self.session_timeout.as_secs())?;
        state.serialize_field(
            "session_max_age_secs",
            &self.session_max_age.map(|d| d.as_secs()),
        )?;
        state.serialize_field("requests_per_minute", &self.requests_per_minute)?;
        state.serialize_field("requests_per_day", &self.requests_per_day)?;
        state.serialize_field("cache_ttl_secs", &self.cache_ttl.map(|d| d.as_secs()))?;
        state.serialize_field("max_retries", &self.max_retries)?;
        state.serialize_field(
            "retry_base_delay_ms",
            &(self.retry_base_delay.as_millis() as u64),
        )?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ClientConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ClientConfigHelper {
            developer_id: String,
            auth_key: String,
            #[serde(default)]
            base_url: Option<String>,
            #[serde(default = "default_true")]
            cache_enabled: bool,
            #[serde(default)]
            language: Language,
            #[serde(default)]
            response_timeout_secs: Option<u64>,
            #[serde(default)]
            session_timeout_secs: Option<u64>,
            #[serde(default)]
            session_max_age_secs: Option<u64>,
            #[serde(default)]
            requests_per_minute: Option<u32>,
            #[serde(default)]
            requests_per_day: Option<u32>,
            #[serde(default)]
            cache_ttl_secs: Option<u64>,
            #[serde(default)]
            max_retries: Option<usize>,
            #[serde(default)]
            retry_base_delay_ms: Option<u64>,
        }

        const fn default_true() -> bool {
            true
        }

        let helper = ClientConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            developer_id: helper.developer_id,
            auth_key: Secret::new(helper.auth_key),
            base_url: helper.base_url,
            cache_enabled: helper.cache_enabled,
            language: helper.language,
            response_timeout: helper
                .response_timeout_secs
                .map_or(DEFAULT_RESPONSE_TIMEOUT, Duration::from_secs),
            session_timeout: helper
                .session_timeout_secs
                .map_or(DEFAULT_SESSION_TIMEOUT, Duration::from_secs),
            session_max_age: helper.session_max_age_secs.map(Duration::from_secs),
            requests_per_minute: helper
                .requests_per_minute
                .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE),
            requests_per_day: helper.requests_per_day.unwrap_or(DEFAULT_REQUESTS_PER_DAY),
            cache_ttl: helper.cache_ttl_secs.map(Duration::from_secs),
            max_retries: helper.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_base_delay: helper
                .retry_base_delay_ms
                .map_or(DEFAULT_RETRY_BASE_DELAY, Duration::from_millis),
        })
    }
}

impl ClientConfig {
    /// Create a new configuration with developer credentials and default settings
    #[must_use]
    pub fn new(developer_id: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self {
            developer_id: developer_id.into(),
            auth_key: Secret::new(auth_key.into()),
            base_url: None,
            cache_enabled: true,
            language: Language::English,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            session_max_age: None,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            requests_per_day: DEFAULT_REQUESTS_PER_DAY,
            cache_ttl: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_DEV_ID` (e.g., `PALADINS_DEV_ID`)
    /// - `{PREFIX}_AUTH_KEY` (e.g., `PALADINS_AUTH_KEY`)
    /// - `{PREFIX}_BASE_URL` (optional)
    /// - `{PREFIX}_LANGUAGE` (optional, name, alias or numeric code)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let dev_id_var = format!("{}_DEV_ID", prefix);
        let auth_key_var = format!("{}_AUTH_KEY", prefix);
        let base_url_var = format!("{}_BASE_URL", prefix);
        let language_var = format!("{}_LANGUAGE", prefix);

        let developer_id = env::var(&dev_id_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(dev_id_var))?;

        let auth_key = env::var(&auth_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(auth_key_var))?;

        let mut config = Self::new(developer_id, auth_key);
        config.base_url = env::var(&base_url_var).ok();
        if let Ok(raw) = env::var(&language_var) {
            config.language = raw
                .parse()
                .map_err(ConfigError::InvalidConfiguration)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Create configuration from .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            // a missing file is fine, system variables still apply
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Check that credentials and limits are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.developer_id.trim().is_empty() || self.auth_key.expose_secret().trim().is_empty()
        {
            return Err(ConfigError::MissingCredentials);
        }
        if self.requests_per_minute == 0 || self.requests_per_day == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "request limits must be greater than zero".to_string(),
            ));
        }
        if self.session_timeout.is_zero() {
            return Err(ConfigError::InvalidConfiguration(
                "session timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Set custom base URL
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub const fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub const fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn session_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.session_max_age = max_age;
        self
    }

    #[must_use]
    pub const fn rate_limits(mut self, per_minute: u32, per_day: u32) -> Self {
        self.requests_per_minute = per_minute;
        self.requests_per_day = per_day;
        self
    }

    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn retries(mut self, max_retries: usize, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    /// Base URL with the default applied and trailing slashes removed
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    /// Get auth key (use carefully - exposes secret)
    pub fn auth_key(&self) -> &str {
        self.auth_key.expose_secret()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Developer id and auth key are both required")]
    MissingCredentials,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
