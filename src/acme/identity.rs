//! Caller identity as established by the JWS layer.

use openssl::error::ErrorStack;
use openssl::pkey::{Id, PKey, Public};
use secrecy::{ExposeSecret, SecretSlice};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("symmetric keys cannot produce signatures")]
    Symmetric,

    #[error("key type {0:?} cannot produce signatures")]
    Unsupported(Id),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] ErrorStack),
}

/// Key material the request was signed with.
#[derive(Debug)]
pub enum JwsKey {
    /// DER encoded SubjectPublicKeyInfo of an asymmetric JWK.
    PublicKey(Vec<u8>),
    /// A MAC key (`kty: oct`).
    Symmetric(SecretSlice<u8>),
}

impl Clone for JwsKey {
    fn clone(&self) -> Self {
        match self {
            JwsKey::PublicKey(der) => JwsKey::PublicKey(der.clone()),
            JwsKey::Symmetric(secret) => {
                JwsKey::Symmetric(SecretSlice::new(secret.expose_secret().into()))
            }
        }
    }
}

impl JwsKey {
    /// Short key type label for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            JwsKey::PublicKey(_) => "public key",
            JwsKey::Symmetric(_) => "oct",
        }
    }

    /// Returns the key as a signature verifier.
    ///
    /// Fails unless the key belongs to an algorithm usable for JWS
    /// signatures (RSA, ECDSA, Ed25519, Ed448).
    pub fn signer(&self) -> Result<JwsSigner, KeyError> {
        let der = match self {
            JwsKey::PublicKey(der) => der,
            JwsKey::Symmetric(_) => return Err(KeyError::Symmetric),
        };

        let key = PKey::public_key_from_der(der)?;
        match key.id() {
            Id::RSA | Id::EC | Id::ED25519 | Id::ED448 => Ok(JwsSigner { key }),
            other => Err(KeyError::Unsupported(other)),
        }
    }
}

/// A public key known to be capable of signing.
#[derive(Debug)]
pub struct JwsSigner {
    key: PKey<Public>,
}

impl JwsSigner {
    /// Checks whether this key equals the given DER encoded SubjectPublicKeyInfo.
    pub fn matches_spki(&self, spki_der: &[u8]) -> Result<bool, KeyError> {
        let other = PKey::public_key_from_der(spki_der)?;
        Ok(self.key.public_eq(&other))
    }
}

/// Who is asking, as established by the transport layer.
#[derive(Debug, Clone)]
pub enum CallerIdentity {
    /// The request was signed by a registered ACME account.
    Account { kid: String },
    /// No account: the request was signed with a bare key, which has to be
    /// the certificate's own key.
    KeyHolder { key: JwsKey },
}

impl CallerIdentity {
    /// Whether an ACME account exists for the caller.
    pub fn is_existing(&self) -> bool {
        matches!(self, CallerIdentity::Account { .. })
    }
}
