use super::SecretStore;
use crate::converge::{FileSpec, Plan};
use crate::error::Result;
use std::path::PathBuf;
use tracing::debug;

/// Mode of the CA certificate and the agent certificate.
pub const CERTIFICATE_MODE: u32 = 0o644;
/// Mode of the private key.
pub const PRIVATE_KEY_MODE: u32 = 0o640;

/// Where the three TLS files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsTargets {
    pub ca_file: PathBuf,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Turns a secret bundle into file instructions.
pub struct SecretProvisioner<'a> {
    store: &'a dyn SecretStore,
}

impl<'a> SecretProvisioner<'a> {
    pub fn new(store: &'a dyn SecretStore) -> Self {
        Self { store }
    }

    /// Fetch the bundle for `bag_name`/`bag_item` and plan the three writes.
    ///
    /// The fetch happens here, before any instruction runs, so a missing
    /// item aborts the whole action with nothing written.
    pub fn provision(
        &self,
        bag_name: &str,
        bag_item: &str,
        targets: &TlsTargets,
        user: &str,
        group: &str,
    ) -> Result<Plan> {
        debug!(bag_name, bag_item, "fetching TLS material");
        let bundle = self.store.fetch(bag_name, bag_item)?;

        let files = [
            (&targets.ca_file, bundle.ca_certificate, CERTIFICATE_MODE, false),
            (&targets.cert_file, bundle.certificate, CERTIFICATE_MODE, false),
            (&targets.key_file, bundle.private_key, PRIVATE_KEY_MODE, true),
        ];

        let mut plan = Plan::new();
        for (path, content, mode, sensitive) in files {
            plan.ensure_parent_directory(path);
            plan.write_file(FileSpec {
                path: path.clone(),
                content,
                mode,
                owner: user.to_string(),
                group: group.to_string(),
                sensitive,
            });
        }
        Ok(plan)
    }
}
