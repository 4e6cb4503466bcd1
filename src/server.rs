pub mod errors;
pub mod handlers;
pub mod responses;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::{
    Router,
    routing::{get, post},
};
use color_eyre::eyre::{Context, Result};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::acme::{AcmeError, AcmeState, CallerIdentity, RevocationService};
use crate::storage::Storage;
use handlers::health::health_check;
use handlers::revoke::revoke_cert;

/// A request whose JWS envelope has been checked.
#[derive(Debug, Clone)]
pub struct VerifiedRequest {
    pub identity: CallerIdentity,
    /// The decoded JWS payload.
    pub payload: Value,
}

/// Verifies the JWS envelope of an ACME request (signature, nonce, URL) and
/// resolves who signed it.
#[async_trait]
pub trait JwsVerifier: Send + Sync + 'static {
    async fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<VerifiedRequest, AcmeError>;
}

pub struct AppState<S: Storage, A: AcmeState, V: JwsVerifier> {
    pub revocation: Arc<RevocationService<S, A>>,
    pub verifier: Arc<V>,
}

impl<S: Storage, A: AcmeState, V: JwsVerifier> Clone for AppState<S, A, V> {
    fn clone(&self) -> Self {
        Self {
            revocation: self.revocation.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig<'a> {
    pub host: &'a str,
    pub port: u16,
}

/// Builds the router serving the ACME revocation endpoints.
pub fn router<S: Storage, A: AcmeState, V: JwsVerifier>(state: AppState<S, A, V>) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &'_ axum::extract::Request<_>| {
            let uri = request.uri().to_string();
            tracing::info_span!("request", method = %request.method(), uri)
        });

    Router::new()
        .route("/health", get(health_check))
        .route("/acme/revoke-cert", post(revoke_cert::<S, A, V>))
        .layer(trace_layer)
        .with_state(state)
}

pub struct Server {
    router: Router,
    listener: TcpListener,
}

impl Server {
    /// Binds the listener and builds the router. Port `0` picks a free port.
    pub async fn new<S, A, V>(
        revocation: Arc<RevocationService<S, A>>,
        verifier: V,
        config: ServerConfig<'_>,
    ) -> Result<Self>
    where
        S: Storage,
        A: AcmeState,
        V: JwsVerifier,
    {
        let state = AppState {
            revocation,
            verifier: Arc::new(verifier),
        };

        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Binding TCP listener on {addr}"))?;

        Ok(Self {
            router: router(state),
            listener,
        })
    }

    pub fn port(&self) -> Result<u16> {
        Ok(self
            .listener
            .local_addr()
            .context("Getting local address")?
            .port())
    }

    pub async fn run(self) -> Result<()> {
        let addr = self.listener.local_addr().context("Getting local address")?;
        tracing::info!("Server listening on http://{addr}");

        axum::serve(self.listener, self.router)
            .await
            .context("Running HTTP server")
    }
}
