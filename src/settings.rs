//! Process configuration
//!
//! [`Settings`] is resolved once at startup from environment variables (after
//! the dotfile has been sourced by `main`) and passed by reference to every
//! component. Nothing in the crate reads the environment on its own.

use crate::error::PlatformError;
use eyre::Result;
use std::path::{Path, PathBuf};

pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Read-only configuration record
#[derive(Clone, Debug)]
pub struct Settings {
    pub app_name: String,
    pub environment: String,
    pub log_level: String,
    pub log_file: PathBuf,

    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub cache_dir: PathBuf,

    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub aws_region: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_endpoint_url: Option<String>,

    pub snowflake_account: Option<String>,
    pub snowflake_user: Option<String>,
    pub snowflake_password: Option<String>,
    pub snowflake_role: Option<String>,
    pub snowflake_warehouse: Option<String>,
    pub snowflake_database: Option<String>,
    pub snowflake_schema: Option<String>,

    pub api_host: String,
    pub api_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Enterprise Data Platform".to_string(),
            environment: "dev".to_string(),
            log_level: "INFO".to_string(),
            log_file: PathBuf::from("logs/app.log"),
            data_dir: PathBuf::from("data"),
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            cache_dir: PathBuf::from("data/cache"),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_session_token: None,
            aws_region: None,
            s3_bucket: None,
            s3_endpoint_url: None,
            snowflake_account: None,
            snowflake_user: None,
            snowflake_password: None,
            snowflake_role: None,
            snowflake_warehouse: None,
            snowflake_database: None,
            snowflake_schema: None,
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    ///
    /// Each field is read from its UPPERCASE variable name, falling back to
    /// the lowercase form so dotfiles written either way work.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .or_else(|| lookup(&key.to_lowercase()))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        let api_port = match get("API_PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| {
                PlatformError::configuration(format!("API_PORT '{}' is not a valid port: {}", port, e))
            })?,
            None => defaults.api_port,
        };

        Ok(Self {
            app_name: get("APP_NAME").unwrap_or(defaults.app_name),
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_file: get("LOG_FILE").map(PathBuf::from).unwrap_or(defaults.log_file),
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            raw_dir: get("RAW_DIR").map(PathBuf::from).unwrap_or(defaults.raw_dir),
            processed_dir: get("PROCESSED_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_dir),
            cache_dir: get("CACHE_DIR").map(PathBuf::from).unwrap_or(defaults.cache_dir),
            aws_access_key_id: get("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            aws_session_token: get("AWS_SESSION_TOKEN"),
            aws_region: get("AWS_REGION"),
            s3_bucket: get("S3_BUCKET"),
            s3_endpoint_url: get("S3_ENDPOINT_URL"),
            snowflake_account: get("SNOWFLAKE_ACCOUNT"),
            snowflake_user: get("SNOWFLAKE_USER"),
            snowflake_password: get("SNOWFLAKE_PASSWORD"),
            snowflake_role: get("SNOWFLAKE_ROLE"),
            snowflake_warehouse: get("SNOWFLAKE_WAREHOUSE"),
            snowflake_database: get("SNOWFLAKE_DATABASE"),
            snowflake_schema: get("SNOWFLAKE_SCHEMA"),
            api_host: get("API_HOST").unwrap_or(defaults.api_host),
            api_port,
        })
    }

    /// Settings rooted at `base`, with every data directory underneath it
    pub fn with_data_dir(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            data_dir: base.to_path_buf(),
            raw_dir: base.join("raw"),
            processed_dir: base.join("processed"),
            cache_dir: base.join("cache"),
            ..Self::default()
        }
    }

    pub fn raw_path(&self, file_name: &str) -> PathBuf {
        self.raw_dir.join(file_name)
    }

    pub fn processed_path(&self, file_name: &str) -> PathBuf {
        self.processed_dir.join(file_name)
    }

    /// Validated object storage configuration
    ///
    /// # Errors
    /// [`PlatformError::Configuration`] if the bucket or either access key is
    /// missing. The bucket is checked first.
    pub fn s3(&self) -> Result<S3Config, PlatformError> {
        let bucket = self.s3_bucket.clone().ok_or_else(|| {
            PlatformError::configuration(
                "S3 bucket name is not configured. Set S3_BUCKET in your .env file.",
            )
        })?;

        let (access_key_id, secret_access_key) =
            match (&self.aws_access_key_id, &self.aws_secret_access_key) {
                (Some(id), Some(secret)) => (id.clone(), secret.clone()),
                _ => {
                    return Err(PlatformError::configuration(
                        "AWS credentials are not configured. Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY in your .env file.",
                    ));
                }
            };

        Ok(S3Config {
            bucket,
            access_key_id,
            secret_access_key,
            session_token: self.aws_session_token.clone(),
            region: self
                .aws_region
                .clone()
                .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            endpoint_url: self.s3_endpoint_url.clone(),
        })
    }

    /// Validated warehouse configuration
    ///
    /// # Errors
    /// [`PlatformError::Configuration`] naming every missing field. Role is
    /// optional.
    pub fn snowflake(&self) -> Result<SnowflakeConfig, PlatformError> {
        let required = [
            ("SNOWFLAKE_ACCOUNT", &self.snowflake_account),
            ("SNOWFLAKE_USER", &self.snowflake_user),
            ("SNOWFLAKE_PASSWORD", &self.snowflake_password),
            ("SNOWFLAKE_WAREHOUSE", &self.snowflake_warehouse),
            ("SNOWFLAKE_DATABASE", &self.snowflake_database),
            ("SNOWFLAKE_SCHEMA", &self.snowflake_schema),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(PlatformError::configuration(format!(
                "Snowflake credentials are incomplete, missing: {}",
                missing.join(", ")
            )));
        }

        let value = |field: &Option<String>| field.clone().unwrap_or_default();
        Ok(SnowflakeConfig {
            account: value(&self.snowflake_account),
            user: value(&self.snowflake_user),
            password: value(&self.snowflake_password),
            role: self.snowflake_role.clone(),
            warehouse: value(&self.snowflake_warehouse),
            database: value(&self.snowflake_database),
            schema: value(&self.snowflake_schema),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct S3Config {
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub endpoint_url: Option<String>,
}

#[derive(Clone, PartialEq)]
pub struct SnowflakeConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: Option<String>,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
}

// Keep the password out of debug logs
impl std::fmt::Debug for SnowflakeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
