use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::pki::crl::{CrlBuilder, CrlConfig};
use crate::pki::{CertificateStore, Namespace, PresentedCertificate, RevocationRecord, SerialNumber};
use crate::storage::Storage;

use super::account::AcmeState;
use super::authorize::authorizer_for;
use super::errors::AcmeError;
use super::identity::CallerIdentity;
use super::request::RevocationRequest;

/// Mutual exclusion shared by every revocation of a mount.
///
/// Clones share the same lock. The revoked set and the CRL rebuild trigger
/// are only ever updated while it is held.
#[derive(Debug, Clone, Default)]
pub struct RevocationLock {
    inner: Arc<Mutex<()>>,
}

impl RevocationLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the lock. Dropping the returned future before it resolves
    /// leaves the lock untouched.
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        self.inner.clone().lock_owned().await
    }

    pub fn try_acquire(&self) -> Option<OwnedMutexGuard<()>> {
        self.inner.clone().try_lock_owned().ok()
    }
}

/// Outcome of a successful revocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationResponse {
    pub serial_number: SerialNumber,
    pub revocation_time: OffsetDateTime,
}

/// Writes revocation records under the [`RevocationLock`].
pub struct RevocationExecutor<S: Storage> {
    store: CertificateStore<S>,
    crl: Arc<CrlBuilder<S>>,
    lock: RevocationLock,
}

impl<S: Storage> Clone for RevocationExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            crl: self.crl.clone(),
            lock: self.lock.clone(),
        }
    }
}

impl<S: Storage> RevocationExecutor<S> {
    pub fn new(store: CertificateStore<S>, crl: Arc<CrlBuilder<S>>, lock: RevocationLock) -> Self {
        Self { store, crl, lock }
    }

    pub fn lock(&self) -> &RevocationLock {
        &self.lock
    }

    /// Revokes `cert`, which must already have passed authorization.
    ///
    /// Once the lock is held the remaining work runs on its own task, so the
    /// record and the CRL signal are written even if the caller goes away.
    pub async fn revoke(
        &self,
        cert: &PresentedCertificate,
        config: &CrlConfig,
    ) -> Result<RevocationResponse, AcmeError> {
        let guard = self.lock.acquire().await;

        let executor = self.clone();
        let cert = cert.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let _guard = guard;
            executor.revoke_locked(&cert, &config).await
        })
        .await
        .map_err(|e| AcmeError::internal("unable to revoke certificate: revocation task failed", e))?
    }

    async fn revoke_locked(
        &self,
        cert: &PresentedCertificate,
        config: &CrlConfig,
    ) -> Result<RevocationResponse, AcmeError> {
        let serial = cert.serial();

        // Another request may have revoked the serial since it was checked.
        let revoked = self.store.is_revoked(serial).await.map_err(|e| {
            AcmeError::internal("unable to revoke certificate: err reading revocation entry", e)
        })?;
        if revoked {
            return Err(already_revoked());
        }

        let record = RevocationRecord::new(cert, OffsetDateTime::now_utc());
        self.store.write_revocation(&record).await.map_err(|e| {
            AcmeError::internal("unable to revoke certificate: error persisting revocation", e)
        })?;

        if let Err(e) = self.crl.notify_revocation(config).await {
            warn!(%serial, "Revocation stored but CRL rebuild failed, retrying later: {e}");
        }

        info!(%serial, subject = cert.subject(), "Revoked certificate");
        Ok(RevocationResponse {
            serial_number: serial.clone(),
            revocation_time: record.revocation_time_utc,
        })
    }
}

fn already_revoked() -> AcmeError {
    AcmeError::AlreadyRevoked("certificate with specified serial number has already been revoked".into())
}

/// Entry point for revocation requests of a mount.
pub struct RevocationService<S: Storage, A: AcmeState> {
    store: CertificateStore<S>,
    crl: Arc<CrlBuilder<S>>,
    acme_state: Arc<A>,
    executor: RevocationExecutor<S>,
}

impl<S: Storage, A: AcmeState> RevocationService<S, A> {
    pub fn new(store: CertificateStore<S>, crl: Arc<CrlBuilder<S>>, acme_state: Arc<A>) -> Self {
        let executor = RevocationExecutor::new(store.clone(), crl.clone(), RevocationLock::new());
        Self {
            store,
            crl,
            acme_state,
            executor,
        }
    }

    /// Replaces the service's lock, e.g. to share one between service instances
    /// backed by the same storage.
    pub fn with_lock(mut self, lock: RevocationLock) -> Self {
        self.executor = RevocationExecutor::new(self.store.clone(), self.crl.clone(), lock);
        self
    }

    pub fn store(&self) -> &CertificateStore<S> {
        &self.store
    }

    pub fn crl(&self) -> &Arc<CrlBuilder<S>> {
        &self.crl
    }

    pub fn lock(&self) -> &RevocationLock {
        self.executor.lock()
    }

    /// Handles a decoded revocation request on behalf of `identity`.
    #[instrument(
        skip_all,
        fields(serial = %request.certificate.serial(), account = identity.is_existing())
    )]
    pub async fn revoke(
        &self,
        identity: &CallerIdentity,
        request: &RevocationRequest,
    ) -> Result<RevocationResponse, AcmeError> {
        let config = match self.validate_revocation(identity, request).await {
            Ok(config) => config,
            Err(e) => {
                if e.is_client_error() {
                    warn!("Rejected revocation request: {e}");
                }
                return Err(e);
            }
        };

        self.executor.revoke(&request.certificate, &config).await
    }

    /// Runs every check that does not need the revocation lock and returns
    /// the CRL configuration to revoke under.
    pub async fn validate_revocation(
        &self,
        identity: &CallerIdentity,
        request: &RevocationRequest,
    ) -> Result<CrlConfig, AcmeError> {
        let cert = &request.certificate;

        if cert.is_expired_at(OffsetDateTime::now_utc()) {
            return Err(AcmeError::malformed("refusing to revoke expired certificate"));
        }

        let config = self.crl.get_config_with_update().await.map_err(|e| {
            AcmeError::internal("unable to revoke certificate: failed reading revocation config", e)
        })?;

        let stored = match self
            .store
            .fetch_cert_by_serial(Namespace::Certs, cert.serial())
            .await
        {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                return Err(AcmeError::internal_msg(format!(
                    "unable to revoke certificate: no global cert entry found for serial {}",
                    cert.serial()
                )));
            }
            Err(e) => {
                return Err(AcmeError::internal(
                    "unable to revoke certificate: err reading global cert entry",
                    e,
                ));
            }
        };

        if stored.value != cert.raw() {
            return Err(AcmeError::malformed(
                "unable to revoke certificate: supplied certificate does not match CA's stored value",
            ));
        }

        let revoked = self
            .store
            .fetch_cert_by_serial(Namespace::Revoked, cert.serial())
            .await
            .map_err(|e| {
                AcmeError::internal("unable to revoke certificate: err reading revocation entry", e)
            })?;
        if revoked.is_some() {
            return Err(already_revoked());
        }

        authorizer_for(identity, self.acme_state.as_ref())
            .authorize(cert)
            .await?;
        debug!("Revocation request authorized");

        Ok(config)
    }
}
