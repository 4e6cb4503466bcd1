use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::storage::{self, Storage, StorageEntry};

use super::certificate::PresentedCertificate;
use super::serial::SerialNumber;

/// Storage namespaces holding per-serial certificate data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Issued certificates, raw DER.
    Certs,
    /// Revocation records.
    Revoked,
}

impl Namespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Certs => "certs/",
            Namespace::Revoked => "revoked/",
        }
    }

    fn path(self, serial: &SerialNumber) -> String {
        format!("{}{}", self.prefix(), serial.storage_key())
    }

    fn legacy_path(self, serial: &SerialNumber) -> String {
        format!("{}{}", self.prefix(), serial.as_str())
    }
}

/// Persisted marker that a certificate has been revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub serial_number: SerialNumber,
    /// Base64 of the revoked certificate's DER bytes.
    pub certificate: String,
    /// Unix timestamp in seconds.
    pub revocation_time: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub revocation_time_utc: OffsetDateTime,
}

impl RevocationRecord {
    pub fn new(cert: &PresentedCertificate, revoked_at: OffsetDateTime) -> Self {
        Self {
            serial_number: cert.serial().clone(),
            certificate: STANDARD.encode(cert.raw()),
            revocation_time: revoked_at.unix_timestamp(),
            revocation_time_utc: revoked_at,
        }
    }

    pub fn certificate_der(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.certificate)
    }
}

/// Serial-indexed access to issued certificates and their revocation records.
pub struct CertificateStore<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for CertificateStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<S: Storage> CertificateStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Loads the entry for `serial` in `namespace`.
    ///
    /// Entries written by older releases are keyed by the colon form of the
    /// serial; those are found when the hyphenated key is absent.
    pub async fn fetch_cert_by_serial(
        &self,
        namespace: Namespace,
        serial: &SerialNumber,
    ) -> storage::Result<Option<StorageEntry>> {
        let path = namespace.path(serial);
        if let Some(entry) = self.storage.get(&path).await? {
            return Ok(Some(entry));
        }

        let legacy = namespace.legacy_path(serial);
        if legacy == path {
            return Ok(None);
        }
        let entry = self.storage.get(&legacy).await?;
        if entry.is_some() {
            debug!(%serial, "Found entry under legacy serial path");
        }
        Ok(entry)
    }

    /// Records an issued certificate under `certs/`.
    pub async fn store_certificate(&self, cert: &PresentedCertificate) -> storage::Result<()> {
        let entry = StorageEntry::new(Namespace::Certs.path(cert.serial()), cert.raw());
        self.storage.put(&entry).await
    }

    pub async fn is_revoked(&self, serial: &SerialNumber) -> storage::Result<bool> {
        Ok(self
            .fetch_cert_by_serial(Namespace::Revoked, serial)
            .await?
            .is_some())
    }

    pub async fn fetch_revocation(
        &self,
        serial: &SerialNumber,
    ) -> storage::Result<Option<RevocationRecord>> {
        match self.fetch_cert_by_serial(Namespace::Revoked, serial).await? {
            Some(entry) => Ok(Some(entry.decode_json()?)),
            None => Ok(None),
        }
    }

    pub async fn write_revocation(&self, record: &RevocationRecord) -> storage::Result<()> {
        let entry = StorageEntry::json(Namespace::Revoked.path(&record.serial_number), record)?;
        self.storage.put(&entry).await
    }

    /// Returns every revocation record, ordered by storage key.
    pub async fn list_revoked(&self) -> storage::Result<Vec<RevocationRecord>> {
        let prefix = Namespace::Revoked.prefix();
        let keys = self.storage.list(prefix).await?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.storage.get(&format!("{prefix}{key}")).await? {
                records.push(entry.decode_json()?);
            }
        }
        Ok(records)
    }
}
