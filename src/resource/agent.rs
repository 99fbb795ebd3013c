//! The main agent configuration file.
//!
//! [`AgentConfig`] mirrors the agent's option set plus a handful of
//! bookkeeping fields (`path`, ownership, secret coordinates) that steer
//! convergence but never reach the rendered file. Only names on
//! [`ALLOWED_OPTIONS`] are emitted, followed by the three TLS paths when
//! [`AgentConfig::tls_active`] holds.
//!
//! See <https://www.consul.io/docs/agent/options.html> for option semantics.

use super::{default_group, default_owner, require_non_empty, CONFIG_FILE_MODE};
use crate::converge::{FileSpec, Plan};
use crate::error::{ConsulRenderError, Result};
use crate::render::to_canonical_json;
use crate::secrets::{SecretProvisioner, SecretStore, TlsTargets};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Agent options emitted into the rendered file, in output order.
pub const ALLOWED_OPTIONS: [&str; 43] = [
    "acl_datacenter",
    "acl_default_policy",
    "acl_down_policy",
    "acl_master_token",
    "acl_token",
    "acl_ttl",
    "addresses",
    "advertise_addr",
    "bind_addr",
    "bootstrap",
    "bootstrap_expect",
    "check_update_interval",
    "client_addr",
    "data_dir",
    "datacenter",
    "disable_anonymous_signature",
    "disable_remote_exec",
    "disable_update_check",
    "dns_config",
    "domain",
    "enable_debug",
    "enable_syslog",
    "encrypt",
    "leave_on_terminate",
    "log_level",
    "node_name",
    "ports",
    "protocol",
    "recurser",
    "retry_interval",
    "server",
    "server_name",
    "skip_leave_on_interrupt",
    "start_join",
    "rejoin_after_leave",
    "statsd_addr",
    "statsite_addr",
    "syslog_facility",
    "ui_dir",
    "verify_incoming",
    "verify_outgoing",
    "verify_server_hostname",
    "watches",
];

/// Certificate paths, emitted after the allowed options only when TLS is active.
pub const TLS_OPTIONS: [&str; 3] = ["ca_file", "cert_file", "key_file"];

pub const DEFAULT_BAG_NAME: &str = "consul";
pub const DEFAULT_BAG_ITEM: &str = "secrets";
pub const DEFAULT_BOOTSTRAP_EXPECT: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
    Warn,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Warn => "WARN",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of the agent configuration file.
///
/// Missing keys take the values from [`Default`]; `path` has no usable
/// default and is checked by [`AgentConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub path: String,
    pub user: String,
    pub group: String,
    pub bag_name: String,
    pub bag_item: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_datacenter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_default_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_down_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_master_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertise_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<String>,
    pub bootstrap: bool,
    pub bootstrap_expect: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_update_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    pub disable_anonymous_signature: bool,
    pub disable_remote_exec: bool,
    pub disable_update_check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_config: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub enable_debug: bool,
    pub enable_syslog: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    pub leave_on_terminate: bool,
    pub log_level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<u64>,
    pub server: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    pub skip_leave_on_interrupt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_join: Option<Vec<String>>,
    pub rejoin_after_leave: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statsd_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statsite_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syslog_facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_dir: Option<String>,
    pub verify_incoming: bool,
    pub verify_outgoing: bool,
    pub verify_server_hostname: bool,
    pub watches: Map<String, Value>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            user: default_owner(),
            group: default_group(),
            bag_name: DEFAULT_BAG_NAME.to_string(),
            bag_item: DEFAULT_BAG_ITEM.to_string(),
            acl_datacenter: None,
            acl_default_policy: None,
            acl_down_policy: None,
            acl_master_token: None,
            acl_token: None,
            acl_ttl: None,
            addresses: None,
            advertise_addr: None,
            bind_addr: None,
            bootstrap: false,
            bootstrap_expect: DEFAULT_BOOTSTRAP_EXPECT,
            ca_file: None,
            cert_file: None,
            check_update_interval: None,
            client_addr: None,
            data_dir: None,
            datacenter: None,
            disable_anonymous_signature: false,
            disable_remote_exec: false,
            disable_update_check: false,
            dns_config: None,
            domain: None,
            enable_debug: false,
            enable_syslog: false,
            encrypt: None,
            key_file: None,
            leave_on_terminate: false,
            log_level: LogLevel::default(),
            node_name: None,
            ports: None,
            protocol: None,
            recurser: None,
            retry_interval: None,
            server: true,
            server_name: None,
            skip_leave_on_interrupt: false,
            start_join: None,
            rejoin_after_leave: false,
            statsd_addr: None,
            statsite_addr: None,
            syslog_facility: None,
            ui_dir: None,
            verify_incoming: false,
            verify_outgoing: false,
            verify_server_hostname: false,
            watches: Map::new(),
        }
    }
}

impl AgentConfig {
    /// A config for `path` with every other field at its default.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// TLS is on when either direction verifies certificates.
    ///
    /// Whether the certificate paths are set plays no part here.
    pub fn tls_active(&self) -> bool {
        self.verify_incoming || self.verify_outgoing
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("path", &self.path)?;
        require_non_empty("user", &self.user)?;
        require_non_empty("group", &self.group)?;
        require_non_empty("bag_name", &self.bag_name)?;
        require_non_empty("bag_item", &self.bag_item)?;
        Ok(())
    }

    /// The option names that end up in the rendered file for this config,
    /// in output order, whether or not each one is set.
    pub fn selected_options(&self) -> Vec<&'static str> {
        let mut keys = ALLOWED_OPTIONS.to_vec();
        if self.tls_active() {
            keys.extend(TLS_OPTIONS);
        }
        keys
    }

    /// Set and defaulted fields intersected with [`Self::selected_options`].
    pub fn options(&self) -> Result<Map<String, Value>> {
        let Value::Object(mut fields) = serde_json::to_value(self)? else {
            return Err(ConsulRenderError::Validation(
                "agent configuration did not serialize to an object".to_string(),
            ));
        };

        let mut options = Map::new();
        for key in self.selected_options() {
            if let Some(value) = fields.remove(key) {
                options.insert(key.to_string(), value);
            }
        }
        Ok(options)
    }

    /// Render the agent configuration file.
    pub fn render(&self) -> Result<String> {
        self.validate()?;
        to_canonical_json(&self.options()?)
    }

    fn tls_path(&self, field: &str, value: &Option<String>) -> Result<PathBuf> {
        match value.as_deref() {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Err(ConsulRenderError::Validation(format!(
                "'{}' is required when verify_incoming or verify_outgoing is set",
                field
            ))),
        }
    }

    pub fn tls_targets(&self) -> Result<TlsTargets> {
        Ok(TlsTargets {
            ca_file: self.tls_path("ca_file", &self.ca_file)?,
            cert_file: self.tls_path("cert_file", &self.cert_file)?,
            key_file: self.tls_path("key_file", &self.key_file)?,
        })
    }

    /// Instructions that bring the agent configuration (and, with TLS, its
    /// certificate files) into existence.
    ///
    /// TLS files come first so the agent never sees a config that points at
    /// certificates not yet on disk.
    pub fn create_plan(&self, store: &dyn SecretStore) -> Result<Plan> {
        let content = self.render()?;
        let mut plan = Plan::new();

        if self.tls_active() {
            let targets = self.tls_targets()?;
            plan.extend(SecretProvisioner::new(store).provision(
                &self.bag_name,
                &self.bag_item,
                &targets,
                &self.user,
                &self.group,
            )?);
        }

        let path = Path::new(&self.path);
        plan.ensure_parent_directory(path);
        plan.write_file(FileSpec {
            path: path.to_path_buf(),
            content,
            mode: CONFIG_FILE_MODE,
            owner: self.user.clone(),
            group: self.group.clone(),
            sensitive: false,
        });

        debug!(path = %self.path, instructions = plan.len(), "planned agent config create");
        Ok(plan)
    }

    /// Instructions that remove the agent configuration.
    ///
    /// With TLS active the certificate and key are removed too, but the CA
    /// certificate stays in place.
    pub fn delete_plan(&self) -> Result<Plan> {
        self.validate()?;
        let mut plan = Plan::new();

        if self.tls_active() {
            plan.delete_file(self.tls_path("cert_file", &self.cert_file)?);
            plan.delete_file(self.tls_path("key_file", &self.key_file)?);
            if let Some(ca_file) = &self.ca_file {
                warn!(ca_file = %ca_file, "leaving CA certificate in place");
            }
        }
        plan.delete_file(&self.path);

        Ok(plan)
    }
}
