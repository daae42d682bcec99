//! Deployment settings and per-run request structures.
//!
//! This module defines [`DeploySettings`] for server and policy settings,
//! along with associated error types. Configuration is loaded via
//! `ortho-config` which merges defaults, configuration files, and environment
//! variables.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default FTP control port.
pub const DEFAULT_PORT: u16 = 21;

/// Default path of the password file, relative to the working directory.
pub const DEFAULT_PASSWORD_FILE: &str = ".ftp.password";

fn default_exclude() -> Vec<String> {
    vec![
        String::from(".git"),
        String::from(".gitignore"),
        String::from(DEFAULT_PASSWORD_FILE),
    ]
}

/// Policy applied when a single file fails to upload.
#[derive(Clone, Copy, Debug, Default, Deserialize, serde::Serialize, clap::ValueEnum, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The first per-file upload error fails the whole run.
    #[default]
    Strict,
    /// Per-file upload errors are reported and collected; the run still
    /// succeeds.
    Lenient,
}

/// Server and policy settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "SITEDROP",
    discovery(
        app_name = "sitedrop",
        env_var = "SITEDROP_CONFIG_PATH",
        config_file_name = "sitedrop.toml",
        dotfile_name = ".sitedrop.toml",
        project_file_name = "sitedrop.toml"
    )
)]
pub struct DeploySettings {
    /// Hostname of the FTP server to deploy to.
    #[ortho_config(default = String::new())]
    pub host: String,
    /// FTP control port. Defaults to 21.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// User to authenticate as.
    #[ortho_config(default = "anonymous".to_owned())]
    pub username: String,
    /// Path of the file holding the FTP password, relative to the working
    /// directory. The file's trimmed contents become the password; it is
    /// never written to any output.
    #[ortho_config(default = DEFAULT_PASSWORD_FILE.to_owned())]
    pub password_file: String,
    /// Relative paths never uploaded. An entry matches a path when it equals
    /// the path or is a component-wise prefix of it, so `.git` also covers
    /// `.git/config`.
    #[ortho_config(default = default_exclude())]
    pub exclude: Vec<String>,
    /// Whether to empty the remote root before uploading.
    #[ortho_config(default = true)]
    pub clean_remote: bool,
    /// Policy applied when a single file fails to upload.
    #[ortho_config(default = FailurePolicy::Strict)]
    pub failure_policy: FailurePolicy,
}

/// Errors raised when loading the settings from layered sources.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SettingsLoadError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("settings parsing failed: {0}")]
    Parse(String),
}

/// Errors raised by settings and request validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SettingsError {
    /// Raised when a required setting is empty. The message includes guidance
    /// on how to provide the value via environment variable or configuration
    /// file.
    #[error("missing {field}: set SITEDROP_{env_suffix} or add {field} to sitedrop.toml", env_suffix = field.to_uppercase())]
    MissingValue {
        /// Settings field that failed validation.
        field: String,
    },
    /// Raised when a required command line parameter is empty.
    #[error("the --{field} command line parameter is required")]
    MissingRoot {
        /// Flag name that was empty.
        field: &'static str,
    },
}

impl DeploySettings {
    /// Loads settings using defaults, configuration files, and environment
    /// variables, without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsLoadError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, SettingsLoadError> {
        Self::load_from_iter([std::ffi::OsString::from("sitedrop")])
            .map_err(|err| SettingsLoadError::Parse(err.to_string()))
    }

    /// Loads settings using the default argument iterator.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsLoadError::Parse`] when merging sources fails.
    pub fn load_from_sources() -> Result<Self, SettingsLoadError> {
        Self::load().map_err(|err| SettingsLoadError::Parse(err.to_string()))
    }

    /// Ensures required values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingValue`] when any required field is
    /// empty.
    pub fn validate(&self) -> Result<(), SettingsError> {
        Self::require_value(&self.host, "host")?;
        Self::require_value(&self.username, "username")?;
        Self::require_value(&self.password_file, "password_file")?;
        Ok(())
    }

    fn require_value(value: &str, field: &str) -> Result<(), SettingsError> {
        if value.trim().is_empty() {
            return Err(SettingsError::MissingValue {
                field: field.to_owned(),
            });
        }
        Ok(())
    }
}

/// Per-run inputs resolved from the command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeployRequest {
    /// Local directory whose contents are uploaded.
    pub local_root: Utf8PathBuf,
    /// Remote directory receiving the upload.
    pub remote_root: Utf8PathBuf,
}

impl DeployRequest {
    /// Builds a request from the raw CLI values, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingRoot`] when either value is empty.
    pub fn new(
        local_root: impl AsRef<str>,
        remote_root: impl AsRef<str>,
    ) -> Result<Self, SettingsError> {
        let local = local_root.as_ref().trim();
        let remote = remote_root.as_ref().trim();
        if local.is_empty() {
            return Err(SettingsError::MissingRoot {
                field: "local-root",
            });
        }
        if remote.is_empty() {
            return Err(SettingsError::MissingRoot {
                field: "remote-root",
            });
        }
        Ok(Self {
            local_root: Utf8PathBuf::from(local),
            remote_root: Utf8PathBuf::from(remote),
        })
    }
}
