use thiserror::Error;
use ::time::OffsetDateTime;
use x509_parser::prelude::{FromDer, X509Certificate, X509Error};

use super::serial::SerialNumber;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("X.509 error: {0}")]
    X509(#[from] X509Error),

    #[error("{0} trailing bytes after certificate")]
    TrailingData(usize),
}

/// A certificate presented by a client, parsed once from DER.
///
/// Only the fields the revocation path relies on are kept, so the value owns
/// its data and can move across tasks freely.
#[derive(Debug, Clone)]
pub struct PresentedCertificate {
    raw: Vec<u8>,
    serial: SerialNumber,
    subject: String,
    not_after: OffsetDateTime,
    public_key_der: Vec<u8>,
}

impl PresentedCertificate {
    /// Parses a DER encoded certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, CertificateError> {
        let raw = der.into();
        let (rest, cert) = X509Certificate::from_der(&raw).map_err(X509Error::from)?;
        if !rest.is_empty() {
            return Err(CertificateError::TrailingData(rest.len()));
        }

        let serial = SerialNumber::from_bytes(&cert.tbs_certificate.serial.to_bytes_be());
        let subject = cert.subject().to_string();
        let not_after = cert.validity().not_after.to_datetime();
        let public_key_der = cert.public_key().raw.to_vec();

        Ok(Self {
            raw,
            serial,
            subject,
            not_after,
            public_key_der,
        })
    }

    /// The exact DER bytes the certificate was parsed from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn serial(&self) -> &SerialNumber {
        &self.serial
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }

    /// DER encoded SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// A certificate is expired once `not_after` is no longer strictly in the future.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.not_after <= now
    }
}
