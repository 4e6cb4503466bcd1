//! ACME certificate revocation (RFC 8555 section 7.6).

pub mod account;
pub mod authorize;
pub mod errors;
pub mod identity;
pub mod request;
pub mod revoke;

pub use account::{Account, AccountStatus, AcmeState, AcmeStateError, IssuedCertEntry, StorageAcmeState};
pub use authorize::{AccountOwnership, ProofOfPossession, RevocationAuthorizer, authorizer_for};
pub use errors::AcmeError;
pub use identity::{CallerIdentity, JwsKey};
pub use request::{RevocationReason, RevocationRequest};
pub use revoke::{RevocationExecutor, RevocationLock, RevocationResponse, RevocationService};
