use serde::{Deserialize, Serialize};
use time::Duration;

use super::errors::{CrlError, CrlResult};

/// Storage path of the persisted CRL configuration.
pub const CRL_CONFIG_PATH: &str = "config/crl";

const DEFAULT_EXPIRY_SECS: u64 = 72 * 3600;
const DEFAULT_GRACE_PERIOD_SECS: u64 = 12 * 3600;

/// Revocation list configuration of the mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrlConfig {
    /// Validity of a freshly built CRL.
    pub expiry_secs: u64,
    /// Build empty CRLs instead of listing revoked serials.
    pub disable: bool,
    /// Defer rebuilds to the background scheduler instead of rebuilding on
    /// every revocation.
    pub auto_rebuild: bool,
    /// How long before expiry the scheduler rebuilds an otherwise clean CRL.
    pub auto_rebuild_grace_period_secs: u64,
    pub enable_delta: bool,
}

impl Default for CrlConfig {
    fn default() -> Self {
        Self {
            expiry_secs: DEFAULT_EXPIRY_SECS,
            disable: false,
            auto_rebuild: false,
            auto_rebuild_grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
            enable_delta: false,
        }
    }
}

impl CrlConfig {
    pub fn validate(&self) -> CrlResult<()> {
        if self.expiry_secs == 0 {
            return Err(CrlError::Config("expiry must be greater than zero".into()));
        }
        if self.auto_rebuild && self.auto_rebuild_grace_period_secs >= self.expiry_secs {
            return Err(CrlError::Config(format!(
                "auto rebuild grace period ({}s) must be shorter than the CRL expiry ({}s)",
                self.auto_rebuild_grace_period_secs, self.expiry_secs
            )));
        }
        if self.enable_delta && !self.auto_rebuild {
            return Err(CrlError::Config(
                "delta CRLs require auto rebuild to be enabled".into(),
            ));
        }
        Ok(())
    }

    /// Validity of a freshly built CRL, i.e. the distance to its next update.
    pub fn expiry(&self) -> Duration {
        Duration::seconds(self.expiry_secs as i64)
    }

    /// Age after which the scheduler considers the current CRL stale.
    pub fn rebuild_after(&self) -> Duration {
        let grace = Duration::seconds(self.auto_rebuild_grace_period_secs as i64);
        (self.expiry() - grace).max(Duration::ZERO)
    }
}
