use std::{env, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::validation::validate_file_path;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 10 * 1024 * 1024;
pub const MAX_REQUEST_SIZE_CEILING: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub log_level: LogLevel,
    pub enable_health_check: bool,
    pub max_request_size: usize,
    pub cors_origins: Vec<String>,
    pub environment: Environment,
    pub resource_root: PathBuf,
    pub resource_files: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a valid u16")]
    InvalidPort,
    #[error("PORT must leave room for the health check port (PORT + 1)")]
    PortOutOfRange,
    #[error("HOST must not be empty")]
    EmptyHost,
    #[error("LOG_LEVEL must be one of: error, warn, info, debug")]
    InvalidLogLevel,
    #[error("{0} must be a boolean (true/false)")]
    InvalidBool(&'static str),
    #[error("MAX_REQUEST_SIZE must be a positive byte count up to {MAX_REQUEST_SIZE_CEILING}")]
    InvalidMaxRequestSize,
    #[error("CORS_ORIGINS entries must be '*' or http(s) origins, got {0:?}")]
    InvalidCorsOrigin(String),
    #[error("environment must be one of: development, production, test")]
    InvalidEnvironment,
    #[error("RESOURCE_FILES entry {0:?} is not a safe relative path")]
    InvalidResourceFile(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "localhost".to_string(),
            log_level: LogLevel::Info,
            enable_health_check: true,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            cors_origins: vec!["*".to_string()],
            environment: Environment::Development,
            resource_root: PathBuf::from("."),
            resource_files: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let port = read("PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(defaults.port);
        let host = read("HOST").unwrap_or(defaults.host);
        let log_level = read("LOG_LEVEL")
            .map(|value| parse_log_level(&value))
            .transpose()?
            .unwrap_or(defaults.log_level);
        let enable_health_check = read("ENABLE_HEALTH_CHECK")
            .map(|value| parse_bool("ENABLE_HEALTH_CHECK", &value))
            .transpose()?
            .unwrap_or(defaults.enable_health_check);
        let max_request_size = read("MAX_REQUEST_SIZE")
            .map(|value| {
                value
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidMaxRequestSize)
            })
            .transpose()?
            .unwrap_or(defaults.max_request_size);
        let cors_origins = read("CORS_ORIGINS")
            .map(|value| split_list(&value))
            .unwrap_or(defaults.cors_origins);
        let environment = read("ENVIRONMENT")
            .or_else(|| read("NODE_ENV"))
            .map(|value| parse_environment(&value))
            .transpose()?
            .unwrap_or(defaults.environment);
        let resource_root = read("RESOURCE_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.resource_root);
        let resource_files = read("RESOURCE_FILES")
            .map(|value| split_list(&value))
            .unwrap_or_default();

        Ok(Self {
            port,
            host,
            log_level,
            enable_health_check,
            max_request_size,
            cors_origins,
            environment,
            resource_root,
            resource_files,
        })
    }

    /// Rejects configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.enable_health_check && self.port == u16::MAX {
            return Err(ConfigError::PortOutOfRange);
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.max_request_size == 0 || self.max_request_size > MAX_REQUEST_SIZE_CEILING {
            return Err(ConfigError::InvalidMaxRequestSize);
        }
        if let Some(origin) = self.cors_origins.iter().find(|origin| {
            origin.as_str() != "*"
                && !origin.starts_with("http://")
                && !origin.starts_with("https://")
        }) {
            return Err(ConfigError::InvalidCorsOrigin(origin.clone()));
        }
        if let Some(file) = self
            .resource_files
            .iter()
            .find(|file| validate_file_path(file).map_or(true, |cleaned| &cleaned != *file))
        {
            return Err(ConfigError::InvalidResourceFile(file.clone()));
        }

        Ok(())
    }

    pub fn health_port(&self) -> Result<u16, ConfigError> {
        self.port.checked_add(1).ok_or(ConfigError::PortOutOfRange)
    }
}

fn parse_log_level(value: &str) -> Result<LogLevel, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "error" => Ok(LogLevel::Error),
        "warn" | "warning" => Ok(LogLevel::Warn),
        "info" => Ok(LogLevel::Info),
        "debug" => Ok(LogLevel::Debug),
        _ => Err(ConfigError::InvalidLogLevel),
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool(name)),
    }
}

fn parse_environment(value: &str) -> Result<Environment, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "production" | "prod" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        _ => Err(ConfigError::InvalidEnvironment),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
