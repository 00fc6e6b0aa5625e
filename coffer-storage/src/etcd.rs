//! etcd connection for the key-value backend.
//!
//! Connects with an optional TLS identity, checks cluster status once at
//! startup and hands the KV client to [`KvStorage`].

use async_trait::async_trait;
use bytes::Bytes;
use etcd_client::{
    Certificate, Client, ConnectOptions, GetOptions, Identity, KvClient, TlsOptions,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AppIdentity, EtcdConfig, EtcdTlsConfig};
use crate::error::{Result, StorageError};
use crate::kv::{KeyValueStore, KvEntry, KvStorage};

const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

fn unavailable(err: etcd_client::Error) -> StorageError {
    StorageError::Unavailable(format!("etcd: {}", err))
}

fn entry(kv: &etcd_client::KeyValue) -> Result<KvEntry> {
    let key = kv
        .key_str()
        .map_err(|e| StorageError::Unavailable(format!("etcd: non UTF-8 key: {}", e)))?;
    Ok(KvEntry {
        key: key.to_string(),
        value: Bytes::copy_from_slice(kv.value()),
        version: kv.version(),
    })
}

#[async_trait]
impl KeyValueStore for KvClient {
    async fn get(&self, key: &str) -> Result<Option<KvEntry>> {
        let mut client = self.clone();
        let response = client.get(key, None).await.map_err(unavailable)?;
        response.kvs().first().map(entry).transpose()
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<KvEntry>> {
        let mut client = self.clone();
        let response = client
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await
            .map_err(unavailable)?;
        response.kvs().iter().map(entry).collect()
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        let mut client = self.clone();
        client
            .put(key, value.to_vec(), None)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        let mut client = self.clone();
        let response = client.delete(key, None).await.map_err(unavailable)?;
        Ok(response.deleted().max(0) as u64)
    }
}

async fn tls_options(tls: &EtcdTlsConfig) -> Result<TlsOptions> {
    let mut options = TlsOptions::new();

    if !tls.verify {
        warn!("etcd TLS verification cannot be disabled; server certificate will be verified");
    }

    if let Some(ca) = &tls.ca {
        let pem = tokio::fs::read(ca).await?;
        options = options.ca_certificate(Certificate::from_pem(pem));
    }

    match (&tls.cert, &tls.key) {
        (Some(cert), Some(key)) => {
            let cert = tokio::fs::read(cert).await?;
            let key = tokio::fs::read(key).await?;
            options = options.identity(Identity::from_pem(cert, key));
        }
        (None, None) => {}
        _ => {
            return Err(StorageError::InvalidArgument(
                "etcd TLS requires both cert and key".to_string(),
            ))
        }
    }

    Ok(options)
}

/// Connect to etcd and build a key-value storage backend.
///
/// The namespace comes from the configuration, or is derived from `app` when
/// unset. A cluster that does not answer the startup status check is a
/// configuration error.
pub async fn connect(config: &EtcdConfig, app: &AppIdentity) -> Result<KvStorage> {
    let endpoint = config.endpoints.first().ok_or_else(|| {
        StorageError::InvalidArgument("etcd storage requires at least one endpoint".to_string())
    })?;

    let mut options =
        ConnectOptions::new().with_connect_timeout(Duration::from_secs(config.dial_timeout_secs));

    if config.tls.enabled {
        debug!("Connecting with etcd-client TLS credentials");
        options = options.with_tls(tls_options(&config.tls).await?);
    }

    if let (Some(user), Some(password)) = (&config.username, &config.password) {
        options = options.with_user(user, password);
    }

    let mut client = Client::connect(&config.endpoints, Some(options))
        .await
        .map_err(unavailable)?;

    match tokio::time::timeout(STATUS_TIMEOUT, client.status()).await {
        Ok(Ok(_)) => debug!("etcd status ok at {}", endpoint),
        Ok(Err(e)) => {
            return Err(StorageError::InvalidArgument(format!(
                "unable to check etcd status at {}: {}",
                endpoint, e
            )))
        }
        Err(_) => {
            return Err(StorageError::InvalidArgument(format!(
                "etcd status check at {} timed out",
                endpoint
            )))
        }
    }

    let namespace = config.namespace_or_default(app);
    info!("Using etcd namespace {}", namespace);

    Ok(KvStorage::new(Arc::new(client.kv_client()), namespace))
}
