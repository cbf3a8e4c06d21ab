//! Application settings.
//!
//! Settings are read once at startup from the JSON file named by the
//! `APP_SETTINGS_FILE` environment variable and passed by reference from
//! there on.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::signatures::SignatureOptions;

/// Environment variable holding the settings file path.
pub const APP_SETTINGS_FILE_VAR: &str = "APP_SETTINGS_FILE";

/// Application name and version shown in the banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Display name
    pub name: String,
    /// Display version
    pub version: String,
}

/// Log file location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Directory for log files
    pub directory: String,
    /// Base file name, prefixed with the date when opened
    pub file: String,
}

impl LoggerConfig {
    /// Path of the log file for `date` (`YYYY-MM-DD`).
    pub fn file_path(&self, date: &str) -> PathBuf {
        Path::new(&self.directory).join(format!("{}_{}", date, self.file))
    }
}

/// Azure Key Vault connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureKeyVaultConfig {
    /// Vault name, the first label of the vault host
    pub vault_name: String,
    /// Directory tenant
    pub tenant_id: String,
    /// Application id
    pub client_id: String,
    /// Client secret
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Client certificate file
    #[serde(default)]
    pub client_certificate_file: Option<String>,
    /// Name of the signing certificate (and its key)
    pub certificate_name: String,
    /// Name of the secret holding the PEM chain
    #[serde(default)]
    pub certificate_full_chain_name: Option<String>,
}

impl AzureKeyVaultConfig {
    /// Base URL of the vault.
    pub fn vault_url(&self) -> String {
        format!("https://{}.vault.azure.net", self.vault_name)
    }
}

/// PEM key and chain files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PemCertificateConfig {
    /// PEM certificate chain, leaf first
    pub full_chain_path: String,
    /// PEM private key
    pub key_path: String,
}

/// PKCS#12 container file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P12CertificateConfig {
    /// Container path
    pub path: String,
    /// Container password, empty when absent
    #[serde(default)]
    pub password: Option<String>,
}

/// Everything the application reads from its settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Banner information
    pub app: AppInfo,
    /// Log file location
    pub logger: LoggerConfig,
    /// Remote signer settings
    #[serde(default)]
    pub azure_key_vault: Option<AzureKeyVaultConfig>,
    /// PEM signer settings
    #[serde(default)]
    pub pem_certificate: Option<PemCertificateConfig>,
    /// PKCS#12 signer settings
    #[serde(default)]
    pub p12_certificate: Option<P12CertificateConfig>,
    /// Signature identity and placement
    pub signature_options: SignatureOptions,
}

impl AppSettings {
    /// Load settings from the file named by `APP_SETTINGS_FILE`.
    pub fn load() -> Result<Self> {
        let path = std::env::var(APP_SETTINGS_FILE_VAR).map_err(|_| {
            Error::Config(format!("{} environment variable is not set", APP_SETTINGS_FILE_VAR))
        })?;
        Self::from_file(path)
    }

    /// Load settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("{} is not a valid file: {}", path.display(), e))
        })?;
        let settings = Self::from_json(&data)?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse settings from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("settings are not valid JSON: {}", e)))
    }

    /// Banner line, e.g. `PDF Signer Version 1.0.0`.
    pub fn banner(&self) -> String {
        format!("{} Version {}", self.app.name, self.app.version)
    }
}
