use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info, warn};

use crate::pki::cert_store::{CertificateStore, RevocationRecord};
use crate::storage::{Storage, StorageEntry};

use super::config::{CRL_CONFIG_PATH, CrlConfig};
use super::errors::CrlResult;

/// Serializes and signs revocation lists.
///
/// Implemented by the issuer side of the platform; the builder only decides
/// when a new list is due and what goes into it.
#[async_trait]
pub trait CrlRebuilder: Send + Sync + 'static {
    async fn rebuild(&self, config: &CrlConfig, revoked: &[RevocationRecord]) -> CrlResult<()>;
}

/// Tracks CRL configuration and rebuild state for a mount.
pub struct CrlBuilder<S: Storage> {
    store: CertificateStore<S>,
    rebuilder: Arc<dyn CrlRebuilder>,
    config: RwLock<Option<CrlConfig>>,
    invalidated: AtomicBool,
    dirty: AtomicBool,
    pending_revocations: AtomicU64,
    last_rebuild: RwLock<Option<OffsetDateTime>>,
    rebuild_lock: Mutex<()>,
    wakeup: Notify,
}

impl<S: Storage> CrlBuilder<S> {
    pub fn new(store: CertificateStore<S>, rebuilder: Arc<dyn CrlRebuilder>) -> Self {
        Self {
            store,
            rebuilder,
            config: RwLock::new(None),
            invalidated: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
            pending_revocations: AtomicU64::new(0),
            last_rebuild: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
            wakeup: Notify::new(),
        }
    }

    /// Returns the cached CRL configuration, reloading it from storage when
    /// the cache is empty or has been invalidated.
    pub async fn get_config_with_update(&self) -> CrlResult<CrlConfig> {
        if !self.invalidated.load(Ordering::Acquire)
            && let Some(config) = self.config.read().await.as_ref()
        {
            return Ok(config.clone());
        }

        let mut cached = self.config.write().await;
        let stale = self.invalidated.swap(false, Ordering::AcqRel);
        if let Some(config) = cached.as_ref()
            && !stale
        {
            return Ok(config.clone());
        }

        match self.load_config().await {
            Ok(config) => {
                debug!(?config, "Loaded CRL configuration");
                *cached = Some(config.clone());
                Ok(config)
            }
            Err(e) => {
                if stale {
                    self.invalidated.store(true, Ordering::Release);
                }
                Err(e)
            }
        }
    }

    /// Persists a new configuration and drops the cached copy.
    pub async fn set_config(&self, config: &CrlConfig) -> CrlResult<()> {
        config.validate()?;
        let entry = StorageEntry::json(CRL_CONFIG_PATH, config)?;
        self.store.storage().put(&entry).await?;
        self.invalidate_config();
        Ok(())
    }

    /// Marks the cached configuration as stale, e.g. after another node wrote it.
    pub fn invalidate_config(&self) {
        self.invalidated.store(true, Ordering::Release);
    }

    async fn load_config(&self) -> CrlResult<CrlConfig> {
        let config = match self.store.storage().get(CRL_CONFIG_PATH).await? {
            Some(entry) => entry.decode_json()?,
            None => CrlConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Records that a certificate was revoked.
    ///
    /// Without auto rebuild the CRL is rebuilt before returning; otherwise
    /// the scheduler is woken up and rebuilds later.
    pub async fn notify_revocation(&self, config: &CrlConfig) -> CrlResult<()> {
        self.pending_revocations.fetch_add(1, Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);

        if config.auto_rebuild {
            self.wakeup.notify_one();
            return Ok(());
        }
        self.rebuild().await.map(|_| ())
    }

    /// Rebuilds the CRL from the current revocation records.
    ///
    /// Returns the number of serials handed to the rebuilder. On failure the
    /// builder stays dirty.
    pub async fn rebuild(&self) -> CrlResult<usize> {
        let _guard = self.rebuild_lock.lock().await;

        // Revocations landing while the list is assembled mark it dirty again.
        self.dirty.store(false, Ordering::Release);
        let pending = self.pending_revocations.swap(0, Ordering::AcqRel);

        match self.rebuild_locked().await {
            Ok(count) => {
                *self.last_rebuild.write().await = Some(OffsetDateTime::now_utc());
                info!(revoked = count, "Rebuilt CRL");
                Ok(count)
            }
            Err(e) => {
                self.pending_revocations.fetch_add(pending, Ordering::AcqRel);
                self.dirty.store(true, Ordering::Release);
                warn!("CRL rebuild failed: {e}");
                Err(e)
            }
        }
    }

    async fn rebuild_locked(&self) -> CrlResult<usize> {
        let config = self.get_config_with_update().await?;
        let revoked = if config.disable {
            Vec::new()
        } else {
            self.store.list_revoked().await?
        };
        self.rebuilder.rebuild(&config, &revoked).await?;
        Ok(revoked.len())
    }

    /// Rebuilds when revocations are pending, or when auto rebuild is on and
    /// the current CRL is about to expire. Returns whether a rebuild happened.
    pub async fn rebuild_if_needed(&self) -> CrlResult<bool> {
        let config = self.get_config_with_update().await?;
        let stale = config.auto_rebuild
            && match *self.last_rebuild.read().await {
                Some(at) => OffsetDateTime::now_utc() - at >= config.rebuild_after(),
                None => true,
            };

        if !self.is_dirty() && !stale {
            return Ok(false);
        }
        self.rebuild().await?;
        Ok(true)
    }

    /// Resolves once a deferred rebuild has been requested.
    pub async fn wait_for_rebuild_request(&self) {
        self.wakeup.notified().await;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Revocations recorded since the last successful rebuild.
    pub fn pending_revocations(&self) -> u64 {
        self.pending_revocations.load(Ordering::Acquire)
    }

    pub async fn last_rebuild(&self) -> Option<OffsetDateTime> {
        *self.last_rebuild.read().await
    }
}
