//! Settings file for the CLI.
//!
//! Default location: ~/.coffer/storage.toml
//!
//! ```toml
//! [app]
//! name = "coffer"
//! env = "dev"
//!
//! [log]
//! json = false
//! level = "info"
//!
//! [storage]
//! type = "dir"
//! path = "tmp"
//! ```
//!
//! Values missing from the file fall back to the usual environment variables
//! (`AWS_REGION`, `GCS_BUCKET`, `ETCD_ADDR`, ...).

use anyhow::{Context, Result};
use coffer_storage::{AppIdentity, StorageConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything the CLI reads from its settings file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub app: AppIdentity,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogSettings {
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            json: false,
            level: default_level(),
        }
    }
}

/// Default settings path (~/.coffer/storage.toml)
pub fn default_settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".coffer")
        .join("storage.toml")
}

impl Settings {
    /// Load settings from `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading settings file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("parsing settings file {}", path.display()))?
        } else {
            Settings::default()
        };
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Fill in a derived etcd namespace when none is configured.
    ///
    /// Returns the namespace if it was derived here, so the caller can
    /// persist it once the backend is up.
    pub fn derive_etcd_namespace(&mut self) -> Option<String> {
        let StorageConfig::Etcd(etcd) = &mut self.storage else {
            return None;
        };
        etcd.establish_namespace(&self.app).then(|| etcd.namespace.clone())
    }

    /// Record `namespace` as `storage.namespace` in the settings file.
    ///
    /// Only that key is written: the file is re-read from disk so values
    /// taken from the environment never end up in it.
    pub fn persist_etcd_namespace(path: &Path, namespace: &str) -> Result<()> {
        let mut doc: toml::Table = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading settings file {}", path.display()))?;
            content
                .parse()
                .with_context(|| format!("parsing settings file {}", path.display()))?
        } else {
            toml::Table::new()
        };

        let storage = doc
            .entry("storage")
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        let Some(storage) = storage.as_table_mut() else {
            anyhow::bail!("'storage' in {} is not a table", path.display());
        };
        storage
            .entry("type")
            .or_insert_with(|| toml::Value::String("etcd".to_string()));
        storage.insert(
            "namespace".to_string(),
            toml::Value::String(namespace.to_string()),
        );

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(&doc)?)
            .with_context(|| format!("writing settings file {}", path.display()))?;
        tracing::info!("Saved etcd namespace {} to {}", namespace, path.display());
        Ok(())
    }

    /// Fill unset values from the environment.
    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| env(name).filter(|v| !v.is_empty());
        let flag = |name: &str| var(name).map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"));

        match &mut self.storage {
            StorageConfig::Dir { .. } => {}
            StorageConfig::S3(s3) => {
                fill(&mut s3.bucket, var("AWS_S3_BUCKET"));
                fill(&mut s3.region, var("AWS_REGION"));
                fill_opt(&mut s3.access_key_id, var("AWS_ACCESS_KEY_ID"));
                fill_opt(&mut s3.secret_access_key, var("AWS_SECRET_ACCESS_KEY"));
            }
            StorageConfig::Gcs(gcs) => {
                fill(&mut gcs.bucket, var("GCS_BUCKET"));
                if gcs.credentials_file.is_none() {
                    gcs.credentials_file = var("GOOGLE_APP_CREDENTIALS").map(PathBuf::from);
                }
            }
            StorageConfig::Etcd(etcd) => {
                if etcd.endpoints.is_empty() {
                    etcd.endpoints = var("ETCD_ADDR")
                        .map(|v| v.split(',').map(|e| e.trim().to_string()).collect())
                        .unwrap_or_default();
                }
                fill_opt(&mut etcd.username, var("ETCD_ROLE"));
                fill_opt(&mut etcd.password, var("ETCD_PASSWORD"));
                if let Some(enabled) = flag("ETCD_SSL_ENABLED") {
                    etcd.tls.enabled |= enabled;
                }
                if let Some(verify) = flag("ETCD_SSL_VERIFY") {
                    etcd.tls.verify = verify;
                }
                if etcd.tls.ca.is_none() {
                    etcd.tls.ca = var("ETCD_SSL_CA").map(PathBuf::from);
                }
                if etcd.tls.cert.is_none() {
                    etcd.tls.cert = var("ETCD_SSL_CERT").map(PathBuf::from);
                }
                if etcd.tls.key.is_none() {
                    etcd.tls.key = var("ETCD_SSL_KEY").map(PathBuf::from);
                }
            }
        }
    }
}

fn fill(target: &mut String, value: Option<String>) {
    if target.is_empty() {
        if let Some(value) = value {
            *target = value;
        }
    }
}

fn fill_opt(target: &mut Option<String>, value: Option<String>) {
    if target.is_none() {
        *target = value;
    }
}
