//! Backend configuration.
//!
//! Plain values handed to a backend constructor; nothing here reads files or
//! the environment. The `type` field selects the backend:
//!
//! ```toml
//! [storage]
//! type = "s3"
//! bucket = "charts"
//! region = "eu-west-1"
//! prefix = "stable/"
//! server_side_encryption = "AES256"
//! ```
//!
//! ```toml
//! [storage]
//! type = "etcd"
//! endpoints = ["https://etcd-0:2379"]
//!
//! [storage.tls]
//! enabled = true
//! ca = "/etc/etcd/ca.pem"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration enum.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage
    Dir {
        /// Root directory for data
        path: PathBuf,
    },
    /// S3-compatible object storage
    S3(S3Config),
    /// Google Cloud Storage
    Gcs(GcsConfig),
    /// etcd key-value store
    Etcd(EtcdConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Dir {
            path: PathBuf::from("tmp"),
        }
    }
}

impl StorageConfig {
    /// Short name of the selected backend kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageConfig::Dir { .. } => "dir",
            StorageConfig::S3(_) => "s3",
            StorageConfig::Gcs(_) => "gcs",
            StorageConfig::Etcd(_) => "etcd",
        }
    }
}

/// Configuration for S3 storage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    #[serde(default)]
    pub region: String,
    /// Prefix for all keys
    #[serde(default)]
    pub prefix: String,
    /// Custom endpoint (MinIO and other S3-compatible services)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Access key (falls back to the AWS credential chain)
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Server-side encryption algorithm sent with every write, e.g. `AES256`
    #[serde(default)]
    pub server_side_encryption: Option<String>,
    /// KMS key for `aws:kms` encryption
    #[serde(default)]
    pub sse_kms_key_id: Option<String>,
}

impl S3Config {
    /// Create a new S3 configuration for AWS.
    pub fn aws(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    /// Create configuration for MinIO or other S3-compatible services.
    pub fn minio(bucket: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }

    /// Set prefix for all keys.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set explicit credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Attach a server-side encryption algorithm to every write.
    pub fn with_server_side_encryption(mut self, algorithm: impl Into<String>) -> Self {
        self.server_side_encryption = Some(algorithm.into());
        self
    }

    /// Custom endpoints are addressed path-style.
    pub fn force_path_style(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Plain HTTP is allowed only for an explicit `http://` endpoint.
    pub fn allow_http(&self) -> bool {
        self.endpoint
            .as_deref()
            .is_some_and(|e| e.starts_with("http://"))
    }
}

/// Configuration for Google Cloud Storage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GcsConfig {
    pub bucket: String,
    /// Prefix for all keys
    #[serde(default)]
    pub prefix: String,
    /// Service account JSON (falls back to application default credentials)
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
}

impl GcsConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set prefix for all keys.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Application name and environment, used to derive an etcd namespace.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppIdentity {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_env")]
    pub env: String,
}

fn default_app_name() -> String {
    "coffer".to_string()
}

fn default_app_env() -> String {
    "dev".to_string()
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: default_app_env(),
        }
    }
}

/// Configuration for the etcd key-value store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EtcdConfig {
    pub endpoints: Vec<String>,
    /// Key prefix for every object; derived from the app identity when empty
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,
    #[serde(default)]
    pub tls: EtcdTlsConfig,
}

fn default_dial_timeout_secs() -> u64 {
    5
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            namespace: String::new(),
            username: None,
            password: None,
            dial_timeout_secs: default_dial_timeout_secs(),
            tls: EtcdTlsConfig::default(),
        }
    }
}

impl EtcdConfig {
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// The configured namespace, or `/{name}/{env}/` when none is set.
    pub fn namespace_or_default(&self, app: &AppIdentity) -> String {
        if self.namespace.is_empty() {
            format!("/{}/{}/", app.name, app.env)
        } else {
            self.namespace.clone()
        }
    }

    /// Fill in a derived namespace. Returns true if the value changed.
    pub fn establish_namespace(&mut self, app: &AppIdentity) -> bool {
        if !self.namespace.is_empty() {
            return false;
        }
        self.namespace = self.namespace_or_default(app);
        true
    }
}

/// TLS material for the etcd client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EtcdTlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub ca: Option<PathBuf>,
    #[serde(default)]
    pub cert: Option<PathBuf>,
    #[serde(default)]
    pub key: Option<PathBuf>,
    /// Verify the server certificate
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_verify() -> bool {
    true
}

impl Default for EtcdTlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ca: None,
            cert: None,
            key: None,
            verify: default_verify(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        storage: StorageConfig,
    }

    fn parse(toml: &str) -> StorageConfig {
        toml::from_str::<Wrapper>(toml).unwrap().storage
    }

    #[test]
    fn test_default_is_dir() {
        let config = StorageConfig::default();
        assert_eq!(config.kind(), "dir");
        assert_eq!(config, StorageConfig::Dir { path: PathBuf::from("tmp") });
    }

    #[test]
    fn test_parse_dir() {
        let config = parse(
            r#"
            [storage]
            type = "dir"
            path = "/var/lib/charts"
            "#,
        );
        assert_eq!(config, StorageConfig::Dir { path: PathBuf::from("/var/lib/charts") });
    }

    #[test]
    fn test_parse_s3() {
        let config = parse(
            r#"
            [storage]
            type = "s3"
            bucket = "charts"
            region = "eu-west-1"
            prefix = "/stable/"
            server_side_encryption = "AES256"
            "#,
        );
        let StorageConfig::S3(s3) = config else {
            panic!("expected s3 config");
        };
        assert_eq!(s3.bucket, "charts");
        assert_eq!(s3.prefix, "/stable/");
        assert_eq!(s3.server_side_encryption.as_deref(), Some("AES256"));
        assert!(!s3.force_path_style());
    }

    #[test]
    fn test_parse_etcd() {
        let config = parse(
            r#"
            [storage]
            type = "etcd"
            endpoints = ["https://etcd-0:2379"]

            [storage.tls]
            enabled = true
            ca = "/etc/etcd/ca.pem"
            "#,
        );
        let StorageConfig::Etcd(etcd) = config else {
            panic!("expected etcd config");
        };
        assert_eq!(etcd.endpoints, vec!["https://etcd-0:2379"]);
        assert_eq!(etcd.dial_timeout_secs, 5);
        assert!(etcd.tls.enabled);
        assert!(etcd.tls.verify);
        assert_eq!(etcd.tls.ca, Some(PathBuf::from("/etc/etcd/ca.pem")));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = toml::from_str::<Wrapper>(
            r#"
            [storage]
            type = "azure"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_s3_endpoint_flags() {
        let config = S3Config::minio("local", "http://localhost:9000");
        assert!(config.force_path_style());
        assert!(config.allow_http());

        let config = S3Config::minio("local", "https://minio.internal");
        assert!(config.force_path_style());
        assert!(!config.allow_http());
    }

    #[test]
    fn test_namespace_derivation() {
        let app = AppIdentity {
            name: "museum".into(),
            env: "prod".into(),
        };
        let mut config = EtcdConfig::new(["http://127.0.0.1:2379"]);
        assert_eq!(config.namespace_or_default(&app), "/museum/prod/");

        assert!(config.establish_namespace(&app));
        assert_eq!(config.namespace, "/museum/prod/");
        assert!(!config.establish_namespace(&AppIdentity::default()));
        assert_eq!(config.namespace, "/museum/prod/");
    }
}
