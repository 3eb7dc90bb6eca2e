#[cfg(feature = "cli")]
pub mod cli;

use crate::core::client::DEFAULT_DISPATCHER_THREADS;
use crate::utils::error::{CallError, Result};
use crate::utils::validation::{
    validate_base_url, validate_non_empty_string, validate_positive_number, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client: ClientSection,
    pub timeouts: Option<TimeoutConfig>,
    pub dispatcher: Option<DispatcherConfig>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    pub base_url: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub connect_seconds: Option<u64>,
    pub request_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub threads: usize,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: ClientSection {
                base_url: base_url.into(),
                user_agent: None,
            },
            timeouts: None,
            dispatcher: None,
            headers: None,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| CallError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string, substituting `${VAR}` references
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CallError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CallError::ConfigError {
            message: e.to_string(),
        })?;

        let mut missing = Vec::new();
        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                missing.push(var_name.to_string());
                String::new()
            })
        });

        if !missing.is_empty() {
            return Err(CallError::ConfigValidationError {
                field: "environment".to_string(),
                message: format!("undefined environment variables: {}", missing.join(", ")),
            });
        }
        Ok(result.into_owned())
    }

    pub fn dispatcher_threads(&self) -> usize {
        self.dispatcher
            .as_ref()
            .map(|d| d.threads)
            .unwrap_or(DEFAULT_DISPATCHER_THREADS)
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        validate_base_url("client.base_url", &self.client.base_url)?;

        if let Some(user_agent) = &self.client.user_agent {
            validate_non_empty_string("client.user_agent", user_agent)?;
        }

        if let Some(timeouts) = &self.timeouts {
            if let Some(seconds) = timeouts.connect_seconds {
                validate_range("timeouts.connect_seconds", seconds, 1, 3600)?;
            }
            if let Some(seconds) = timeouts.request_seconds {
                validate_range("timeouts.request_seconds", seconds, 1, 3600)?;
            }
        }

        if let Some(dispatcher) = &self.dispatcher {
            validate_positive_number("dispatcher.threads", dispatcher.threads, 1)?;
        }

        if let Some(headers) = &self.headers {
            for name in headers.keys() {
                validate_non_empty_string("headers", name)?;
            }
        }

        Ok(())
    }
}
