#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use pki_acme::{
    acme::{AcmeError, CallerIdentity, JwsKey, RevocationService, StorageAcmeState},
    config::Config,
    pki::{
        CertificateStore, PresentedCertificate, RevocationRecord,
        crl::{CrlBuilder, CrlConfig, CrlRebuilder, CrlResult},
    },
    server::{JwsVerifier, Server, ServerConfig, VerifiedRequest},
    storage::MemoryStorage,
};
use rcgen::{CertificateParams, DnType, KeyPair, PublicKeyData};
use time::{Duration, OffsetDateTime};

/// Header carrying the account key identifier of a test request.
pub const KID_HEADER: &str = "x-test-kid";
/// Header carrying the base64url SubjectPublicKeyInfo of a test request.
pub const JWK_HEADER: &str = "x-test-jwk";

pub type TestService = RevocationService<MemoryStorage, StorageAcmeState<MemoryStorage>>;

/// Trusts identity headers instead of checking JWS signatures.
pub struct HeaderVerifier;

#[async_trait]
impl JwsVerifier for HeaderVerifier {
    async fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<VerifiedRequest, AcmeError> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let identity = if let Some(kid) = header(KID_HEADER) {
            CallerIdentity::Account {
                kid: kid.to_string(),
            }
        } else if let Some(jwk) = header(JWK_HEADER) {
            let der = URL_SAFE_NO_PAD
                .decode(jwk)
                .map_err(|e| AcmeError::malformed(format!("bad jwk header: {e}")))?;
            CallerIdentity::KeyHolder {
                key: JwsKey::PublicKey(der),
            }
        } else {
            return Err(AcmeError::malformed("request is not signed"));
        };

        let payload = serde_json::from_slice(body)
            .map_err(|e| AcmeError::malformed(format!("failed to parse JWS payload: {e}")))?;
        Ok(VerifiedRequest { identity, payload })
    }
}

/// Records how many serials each CRL rebuild contained.
#[derive(Default)]
pub struct CountingRebuilder {
    calls: Mutex<Vec<usize>>,
}

impl CountingRebuilder {
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CrlRebuilder for CountingRebuilder {
    async fn rebuild(&self, _config: &CrlConfig, revoked: &[RevocationRecord]) -> CrlResult<()> {
        self.calls.lock().unwrap().push(revoked.len());
        Ok(())
    }
}

pub struct TestMount {
    pub storage: Arc<MemoryStorage>,
    pub accounts: Arc<StorageAcmeState<MemoryStorage>>,
    pub rebuilder: Arc<CountingRebuilder>,
    pub service: Arc<TestService>,
}

impl TestMount {
    pub fn new() -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let store = CertificateStore::new(storage.clone());
        let rebuilder = Arc::new(CountingRebuilder::default());
        let crl = Arc::new(CrlBuilder::new(
            store.clone(),
            rebuilder.clone() as Arc<dyn CrlRebuilder>,
        ));
        let accounts = Arc::new(StorageAcmeState::new(storage.clone()));
        let service = Arc::new(RevocationService::new(store, crl, accounts.clone()));

        Self {
            storage,
            accounts,
            rebuilder,
            service,
        }
    }

    /// Records `cert` as issued by this mount.
    pub async fn issue(&self, cert: &TestCert) -> PresentedCertificate {
        let presented = cert.presented();
        self.service
            .store()
            .store_certificate(&presented)
            .await
            .unwrap();
        presented
    }
}

pub struct TestCert {
    pub key_pair: KeyPair,
    pub der: Vec<u8>,
}

impl TestCert {
    pub fn new(serial: &[u8]) -> Self {
        Self::with_validity(serial, Duration::days(30))
    }

    pub fn expired(serial: &[u8]) -> Self {
        Self::with_validity(serial, -Duration::hours(1))
    }

    fn with_validity(serial: &[u8], valid_for: Duration) -> Self {
        let key_pair = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["acme.example.org".to_string()]).unwrap();
        params
            .distinguished_name
            .push(DnType::CommonName, "acme.example.org");
        params.serial_number = Some(rcgen::SerialNumber::from(serial.to_vec()));
        let now = OffsetDateTime::now_utc();
        params.not_before = now - Duration::days(1);
        params.not_after = now + valid_for;

        let der = params.self_signed(&key_pair).unwrap().der().to_vec();
        Self { key_pair, der }
    }

    pub fn presented(&self) -> PresentedCertificate {
        PresentedCertificate::from_der(self.der.clone()).unwrap()
    }

    pub fn encoded(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.der)
    }

    pub fn encoded_key(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.key_pair.subject_public_key_info())
    }
}

// Helper function to spawn a test server on a random port
pub async fn spawn_server(service: Arc<TestService>) -> String {
    let config = {
        let mut config = Config::load_with_sources(Some(Default::default())).unwrap();
        config.server.host = "localhost".to_string();
        // Use a random OS port
        config.server.port = 0;
        config
    };

    let server_config = ServerConfig {
        host: &config.server.host,
        port: config.server.port,
    };

    let server = Server::new(service, HeaderVerifier, server_config.clone())
        .await
        .unwrap();

    let port = server.port().unwrap();
    tokio::spawn(async move {
        server.run().await.expect("failed to run server");
    });

    format!("http://{}:{}", server_config.host, port)
}
