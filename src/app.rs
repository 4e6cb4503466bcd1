//! Assembles the revocation engine for a host process.
//!
//! JWS verification and CRL signing belong to the host, which passes them in
//! as a [`JwsVerifier`] and a [`CrlRebuilder`]. Storage, the CRL scheduler and
//! the HTTP server are wired here from [`Config`].

use std::sync::Arc;

use color_eyre::eyre::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::acme::{RevocationService, StorageAcmeState};
use crate::config::{self, Config};
use crate::pki::CertificateStore;
use crate::pki::crl::{CrlBuilder, CrlRebuilder, CrlScheduler, CrlSchedulerConfig};
use crate::server::{JwsVerifier, Server, ServerConfig};
use crate::storage::{MemoryStorage, Storage};
use crate::telemetry;

pub type MountedService<S> = RevocationService<S, StorageAcmeState<S>>;

/// A revocation service and its CRL scheduler over one storage.
pub struct App<S: Storage> {
    service: Arc<MountedService<S>>,
    scheduler: CrlScheduler<S>,
}

impl<S: Storage> App<S> {
    pub fn new(storage: Arc<S>, rebuilder: Arc<dyn CrlRebuilder>, crl: CrlSchedulerConfig) -> Self {
        let store = CertificateStore::new(storage.clone());
        let builder = Arc::new(CrlBuilder::new(store.clone(), rebuilder));
        let accounts = Arc::new(StorageAcmeState::new(storage));
        let service = Arc::new(RevocationService::new(store, builder.clone(), accounts));

        Self {
            service,
            scheduler: CrlScheduler::new(crl, builder),
        }
    }

    pub fn service(&self) -> &Arc<MountedService<S>> {
        &self.service
    }

    /// Runs a first CRL check, binds the server and starts the scheduler.
    ///
    /// The caller owns both halves: run the server and abort the scheduler
    /// once it returns.
    pub async fn start<V: JwsVerifier>(
        self,
        server: &config::ServerConfig,
        verifier: V,
    ) -> Result<(Server, JoinHandle<()>)> {
        if let Err(e) = self.scheduler.run_once().await {
            warn!("Initial CRL check failed: {e}");
        }

        let server = Server::new(
            self.service,
            verifier,
            ServerConfig {
                host: &server.host,
                port: server.port,
            },
        )
        .await?;

        Ok((server, self.scheduler.start()))
    }
}

/// Serves the revocation endpoint described by `config` until the server stops.
///
/// Uses Redis when `config.redis` is set and in-memory storage otherwise.
/// Installs the default tracing subscriber unless the host already set one.
///
/// ```no_run
/// # async fn host(
/// #     verifier: impl pki_acme::server::JwsVerifier,
/// #     signer: std::sync::Arc<dyn pki_acme::pki::crl::CrlRebuilder>,
/// # ) -> color_eyre::Result<()> {
/// let config = pki_acme::config::Config::load()?;
/// pki_acme::app::run(&config, verifier, signer).await
/// # }
/// ```
pub async fn run<V: JwsVerifier>(
    config: &Config,
    verifier: V,
    rebuilder: Arc<dyn CrlRebuilder>,
) -> Result<()> {
    telemetry::init_tracing();

    match &config.redis {
        Some(redis) => {
            let storage = redis.storage().await.context("Connecting to Redis")?;
            info!("Using Redis storage under prefix {:?}", redis.key_prefix);
            let app = App::new(Arc::new(storage), rebuilder, config.crl.clone());
            serve(app, &config.server, verifier).await
        }
        None => {
            warn!("No Redis configured, revocations are kept in memory only");
            let app = App::new(Arc::new(MemoryStorage::new()), rebuilder, config.crl.clone());
            serve(app, &config.server, verifier).await
        }
    }
}

async fn serve<S: Storage, V: JwsVerifier>(
    app: App<S>,
    server: &config::ServerConfig,
    verifier: V,
) -> Result<()> {
    let (server, scheduler) = app.start(server, verifier).await?;
    let result = server.run().await;
    scheduler.abort();
    result
}
