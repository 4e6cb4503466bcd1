use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::pki::SerialNumber;
use crate::storage::{Storage, StorageEntry, StorageError};

const ACCOUNT_PREFIX: &str = "acme/accounts/";

#[derive(Debug, Error)]
pub enum AcmeStateError {
    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("invalid account key identifier {0:?}")]
    InvalidKid(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Valid,
    Deactivated,
    Revoked,
}

/// A registered ACME account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub kid: String,
    pub status: AccountStatus,
    #[serde(default)]
    pub contact: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Proof that an account ordered the certificate with the given serial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCertEntry {
    pub account_id: String,
    pub serial_number: SerialNumber,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Read access to the ACME account subsystem.
#[async_trait]
pub trait AcmeState: Send + Sync + 'static {
    /// Loads the account identified by `kid`.
    async fn load_account(&self, kid: &str) -> Result<Account, AcmeStateError>;

    /// Looks up the issuance record of `serial` for the account `kid`.
    async fn get_issued_cert(
        &self,
        kid: &str,
        serial: &SerialNumber,
    ) -> Result<Option<IssuedCertEntry>, AcmeStateError>;
}

/// [`AcmeState`] reading accounts from the mount's storage.
///
/// Accounts live at `acme/accounts/<kid>`, issuance records at
/// `acme/accounts/<kid>/certs/<serial>`.
pub struct StorageAcmeState<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> StorageAcmeState<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub async fn save_account(&self, account: &Account) -> Result<(), AcmeStateError> {
        let entry = StorageEntry::json(account_path(&account.kid)?, account)?;
        self.storage.put(&entry).await?;
        Ok(())
    }

    /// Records that `entry.account_id` ordered the certificate `entry.serial_number`.
    pub async fn track_issued_cert(&self, entry: &IssuedCertEntry) -> Result<(), AcmeStateError> {
        let path = issued_cert_path(&entry.account_id, &entry.serial_number)?;
        self.storage.put(&StorageEntry::json(path, entry)?).await?;
        Ok(())
    }
}

#[async_trait]
impl<S: Storage> AcmeState for StorageAcmeState<S> {
    async fn load_account(&self, kid: &str) -> Result<Account, AcmeStateError> {
        let Some(entry) = self.storage.get(&account_path(kid)?).await? else {
            return Err(AcmeStateError::AccountNotFound(kid.to_string()));
        };
        Ok(entry.decode_json()?)
    }

    async fn get_issued_cert(
        &self,
        kid: &str,
        serial: &SerialNumber,
    ) -> Result<Option<IssuedCertEntry>, AcmeStateError> {
        match self.storage.get(&issued_cert_path(kid, serial)?).await? {
            Some(entry) => Ok(Some(entry.decode_json()?)),
            None => Ok(None),
        }
    }
}

fn account_path(kid: &str) -> Result<String, AcmeStateError> {
    if kid.is_empty() || kid.contains('/') {
        return Err(AcmeStateError::InvalidKid(kid.to_string()));
    }
    Ok(format!("{ACCOUNT_PREFIX}{kid}"))
}

fn issued_cert_path(kid: &str, serial: &SerialNumber) -> Result<String, AcmeStateError> {
    Ok(format!("{}/certs/{}", account_path(kid)?, serial.storage_key()))
}
