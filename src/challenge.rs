//! Bridges "present" / "clean up" calls from the certificate-management
//! controller to writes against the [record store][crate::store].
//!
//! Each challenge is stored under two independent keys: the literal FQDN the
//! controller supplied, and the lowercase concatenation of that FQDN with
//! the authoritative domain. The second key tolerates callers that hand over
//! a name without the trailing domain; TXT lookups normalize to lowercase
//! dot-terminated names and will hit whichever variant matches.

use crate::config::SharedConfig;
use crate::error::Error;
use crate::store::DynRecordStore;

pub struct Presenter {
    config: SharedConfig,
    store: DynRecordStore,
}

impl Presenter {
    #[must_use]
    pub fn new(config: SharedConfig, store: DynRecordStore) -> Self {
        Presenter { config, store }
    }

    /// Write `token` under both key variants for `fqdn`.
    ///
    /// Safe to call repeatedly with identical arguments; a repeat is an
    /// overwrite, per the ACME retry contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on a backend write failure. The controller
    /// is expected to retry.
    pub async fn present(&self, fqdn: &str, token: &str) -> Result<(), Error> {
        tracing::debug!("presenting record for \"{fqdn}\"");
        self.store.set(fqdn, token.as_bytes()).await?;
        self.store
            .set(&self.suffixed_key(fqdn), token.as_bytes())
            .await?;
        Ok(())
    }

    /// Delete both key variants for `fqdn`.
    ///
    /// The delete is value-agnostic: whatever token is currently stored is
    /// removed, `token` notwithstanding — the store has no concept of
    /// value-matched deletion. Cleaning up a name that was never presented
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on a backend failure.
    pub async fn clean_up(&self, fqdn: &str, _token: &str) -> Result<(), Error> {
        tracing::debug!("cleaning up record for \"{fqdn}\"");
        self.store.delete(fqdn).await?;
        self.store.delete(&self.suffixed_key(fqdn)).await?;
        Ok(())
    }

    /// The defensive key variant: `lowercase(fqdn + domain)`, where the
    /// domain is already dot-terminated.
    fn suffixed_key(&self, fqdn: &str) -> String {
        format!("{fqdn}{}", self.config.domain).to_lowercase()
    }
}
