//! Certificate Revocation List (CRL) bookkeeping
//!
//! This module tracks when the mount's CRL must be regenerated. Serializing
//! and signing the list is delegated to a [`CrlRebuilder`].
//!
//! # Features
//! - Cached CRL configuration with explicit invalidation
//! - Rebuild trigger signalled by every revocation
//! - Scheduled background rebuilds for deferred (auto rebuild) mode

mod builder;
mod config;
mod errors;
pub mod scheduler;

// Re-export public types
pub use builder::{CrlBuilder, CrlRebuilder};
pub use config::{CRL_CONFIG_PATH, CrlConfig};
pub use errors::{CrlError, CrlResult};
pub use scheduler::{CrlScheduler, CrlSchedulerConfig};
