//! TLS material retrieval.
//!
//! A [`SecretStore`] hands out one [`SecretBundle`] per `(bag_name, bag_item)`
//! pair. Nothing here caches: every provisioning pass fetches again.

pub mod file;
pub mod memory;
pub mod provisioner;

pub use file::FileSecretStore;
pub use memory::MemorySecretStore;
pub use provisioner::{SecretProvisioner, TlsTargets};

use crate::error::Result;
use serde::Deserialize;
use std::fmt;

/// CA certificate, certificate and private key for one agent.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SecretBundle {
    pub ca_certificate: String,
    pub certificate: String,
    pub private_key: String,
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBundle")
            .field("ca_certificate", &self.ca_certificate)
            .field("certificate", &self.certificate)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Key/value store holding TLS bundles.
pub trait SecretStore {
    /// Fetch the bundle stored under `bag_name`/`bag_item`.
    ///
    /// Returns `ConsulRenderError::SecretNotFound` when the store has no
    /// such item.
    fn fetch(&self, bag_name: &str, bag_item: &str) -> Result<SecretBundle>;
}
