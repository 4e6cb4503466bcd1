//! Certificate fixtures shared by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use rcgen::{CertificateParams, DnType, KeyPair};
use time::{Duration, OffsetDateTime};

use crate::pki::cert_store::RevocationRecord;
use crate::pki::crl::{CrlConfig, CrlError, CrlRebuilder, CrlResult};

pub(crate) struct CertFixture {
    pub key_pair: KeyPair,
    pub der: Vec<u8>,
}

impl CertFixture {
    /// A self-signed leaf valid from yesterday until thirty days from now.
    pub fn new(serial: u64) -> Self {
        Self::build(serial, KeyPair::generate().unwrap(), Duration::days(30))
    }

    /// A self-signed leaf whose `not_after` lies `ago` in the past.
    pub fn expired(serial: u64, ago: Duration) -> Self {
        Self::build(serial, KeyPair::generate().unwrap(), -ago)
    }

    fn build(serial: u64, key_pair: KeyPair, valid_for: Duration) -> Self {
        let mut params =
            CertificateParams::new(vec!["revocation.example.com".to_string()]).unwrap();
        params
            .distinguished_name
            .push(DnType::CommonName, "revocation.example.com");
        params.serial_number = Some(rcgen::SerialNumber::from(minimal_be_bytes(serial)));

        let now = OffsetDateTime::now_utc();
        params.not_before = now - Duration::days(2);
        params.not_after = now + valid_for;

        let cert = params.self_signed(&key_pair).unwrap();
        Self {
            der: cert.der().to_vec(),
            key_pair,
        }
    }
}

fn minimal_be_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

/// Records the number of serials passed to each rebuild.
#[derive(Default)]
pub(crate) struct RecordingRebuilder {
    calls: Mutex<Vec<usize>>,
    fail: bool,
}

impl RecordingRebuilder {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CrlRebuilder for RecordingRebuilder {
    async fn rebuild(&self, _config: &CrlConfig, revoked: &[RevocationRecord]) -> CrlResult<()> {
        if self.fail {
            return Err(CrlError::Rebuild("signing key unavailable".into()));
        }
        self.calls.lock().unwrap().push(revoked.len());
        Ok(())
    }
}
