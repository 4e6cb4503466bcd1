use async_trait::async_trait;
use tracing::{debug, warn};

use crate::pki::PresentedCertificate;

use super::account::{AccountStatus, AcmeState};
use super::errors::AcmeError;
use super::identity::{CallerIdentity, JwsKey};

/// Decides whether the caller may revoke a certificate.
#[async_trait]
pub trait RevocationAuthorizer: Send + Sync {
    async fn authorize(&self, cert: &PresentedCertificate) -> Result<(), AcmeError>;
}

/// Authorization for callers without an account: the request must be signed
/// with the certificate's own key.
pub struct ProofOfPossession<'a> {
    key: &'a JwsKey,
}

impl<'a> ProofOfPossession<'a> {
    pub fn new(key: &'a JwsKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl RevocationAuthorizer for ProofOfPossession<'_> {
    async fn authorize(&self, cert: &PresentedCertificate) -> Result<(), AcmeError> {
        let signer = self.key.signer().map_err(|e| {
            AcmeError::malformed(format!(
                "unable to revoke certificate: unable to parse JWS key of type ({}): {e}",
                self.key.kind()
            ))
        })?;

        match signer.matches_spki(cert.public_key_der()) {
            Ok(true) => {
                debug!(serial = %cert.serial(), "Proof of possession verified");
                Ok(())
            }
            Ok(false) => Err(pop_failed()),
            Err(e) => {
                debug!("Failed to compare certificate key: {e}");
                Err(pop_failed())
            }
        }
    }
}

fn pop_failed() -> AcmeError {
    AcmeError::malformed("unable to revoke certificate: unable to verify proof of possession")
}

/// Authorization for registered accounts: the account must be valid and must
/// have ordered the certificate itself.
pub struct AccountOwnership<'a, A: AcmeState + ?Sized> {
    state: &'a A,
    kid: &'a str,
}

impl<'a, A: AcmeState + ?Sized> AccountOwnership<'a, A> {
    pub fn new(state: &'a A, kid: &'a str) -> Self {
        Self { state, kid }
    }
}

#[async_trait]
impl<A: AcmeState + ?Sized> RevocationAuthorizer for AccountOwnership<'_, A> {
    async fn authorize(&self, cert: &PresentedCertificate) -> Result<(), AcmeError> {
        let account = self
            .state
            .load_account(self.kid)
            .await
            .map_err(|e| AcmeError::internal("failed to lookup account", e))?;

        if account.status != AccountStatus::Valid {
            return Err(AcmeError::Unauthorized(format!(
                "account isn't presently valid: {:?}",
                account.status
            )));
        }

        match self.state.get_issued_cert(self.kid, cert.serial()).await {
            Ok(Some(_)) => {
                debug!(kid = self.kid, serial = %cert.serial(), "Account owns certificate");
                Ok(())
            }
            // The storage cause is not echoed back to the caller.
            Ok(None) => Err(not_owned()),
            Err(e) => {
                warn!(kid = self.kid, serial = %cert.serial(), "Failed to look up issued certificate: {e}");
                Err(not_owned())
            }
        }
    }
}

fn not_owned() -> AcmeError {
    AcmeError::malformed(
        "unable to revoke certificate: certificate was not issued to the requesting account",
    )
}

/// Picks the authorization strategy matching the caller's identity.
pub fn authorizer_for<'a, A: AcmeState + ?Sized>(
    identity: &'a CallerIdentity,
    state: &'a A,
) -> Box<dyn RevocationAuthorizer + 'a> {
    match identity {
        CallerIdentity::Account { kid } => Box::new(AccountOwnership::new(state, kid)),
        CallerIdentity::KeyHolder { key } => Box::new(ProofOfPossession::new(key)),
    }
}
