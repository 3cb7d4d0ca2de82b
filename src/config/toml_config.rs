use crate::core::http::{default_protected_prefixes, HttpClientConfig};
use crate::utils::error::{ClientError, Result};
use crate::utils::validation::{
    validate_api_path, validate_non_empty_string, validate_path, validate_range, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub connect_timeout_seconds: u64,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            connect_timeout_seconds: 5,
            timeout_seconds: 30,
            retry_attempts: 2,
            retry_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub refresh_path: String,
    pub protected_prefixes: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_path: "/auth/token/refresh/".to_string(),
            protected_prefixes: default_protected_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            path: format!("{}/.docfinder/session.json", base.trim_end_matches('/')),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub page_size: usize,
    pub schedule_days: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: crate::core::pagination::DEFAULT_PAGE_SIZE,
            schedule_days: 7,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClientError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ClientError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown names stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ClientError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            self.api.base_url = base_url;
        }
        self
    }

    pub fn with_session_path(mut self, path: Option<String>) -> Self {
        if let Some(path) = path {
            self.session.path = path;
        }
        self
    }

    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig::new(&self.api.base_url)
            .with_protected_prefixes(self.auth.protected_prefixes.clone())
            .with_refresh_path(&self.auth.refresh_path)
            .with_timeouts(
                self.api.connect_timeout_seconds * 1000,
                self.api.timeout_seconds * 1000,
            )
            .with_retry(self.api.retry_attempts, self.api.retry_delay_ms)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_range(
            "api.connect_timeout_seconds",
            self.api.connect_timeout_seconds,
            1,
            600,
        )?;
        validate_range("api.timeout_seconds", self.api.timeout_seconds, 1, 600)?;
        validate_range("api.retry_attempts", self.api.retry_attempts, 0, 10)?;
        validate_api_path("auth.refresh_path", &self.auth.refresh_path)?;
        for prefix in &self.auth.protected_prefixes {
            validate_non_empty_string("auth.protected_prefixes", prefix)?;
        }
        validate_path("session.path", &self.session.path)?;
        validate_range("display.page_size", self.display.page_size, 1, 100)?;
        Ok(())
    }
}
