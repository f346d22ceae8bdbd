//! Data structures shared by the reconciler and its two seams.
//!
//! Containers declare the name they want via a label; the provider is
//! told to point that name either at a fixed address or at a fixed alias,
//! depending on which default target the daemon was started with.

use std::collections::HashMap;
use std::fmt;

/// Kind of record managed for the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// Host-address (`A`) records, stored under `customdns`.
    Address,
    /// Canonical-name (`CNAME`) records, stored under `customcname`.
    Alias,
}

impl RecordMode {
    /// Query key selecting the record table on the provider.
    pub fn table(self) -> &'static str {
        match self {
            RecordMode::Address => "customdns",
            RecordMode::Alias => "customcname",
        }
    }

    /// Query key carrying the record's target value.
    pub fn target_param(self) -> &'static str {
        match self {
            RecordMode::Address => "ip",
            RecordMode::Alias => "target",
        }
    }
}

/// Daemon-wide record target. Immutable once the config is loaded.
///
/// The address is kept exactly as configured (validated, not normalised),
/// so it compares equal to records the provider already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Address(String),
    Alias(String),
}

impl ResolvedTarget {
    pub fn mode(&self) -> RecordMode {
        match self {
            ResolvedTarget::Address(_) => RecordMode::Address,
            ResolvedTarget::Alias(_) => RecordMode::Alias,
        }
    }

    /// The literal value sent to, and compared against, the provider.
    pub fn value(&self) -> String {
        match self {
            ResolvedTarget::Address(ip) => ip.clone(),
            ResolvedTarget::Alias(domain) => domain.clone(),
        }
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedTarget::Address(ip) => write!(f, "A -> {}", ip),
            ResolvedTarget::Alias(domain) => write!(f, "CNAME -> {}", domain),
        }
    }
}

/// One configured DNS provider instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    /// Full API URL, e.g. `http://pi.hole/admin/api.php`.
    pub api_url: String,
    pub auth_token: String,
}

impl fmt::Debug for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEndpoint")
            .field("api_url", &self.api_url)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.api_url)
    }
}

/// A record a container asks for. `name` is always lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    pub name: String,
}

impl DesiredRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_lowercase(),
        }
    }
}

/// Read-only view of one container from the host inventory.
#[derive(Debug, Clone, Default)]
pub struct ContainerSnapshot {
    pub name: String,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Created,
    Removed,
}

impl ActionKind {
    /// Maps a runtime action string to a lifecycle kind we act upon.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "create" => Some(ActionKind::Created),
            "destroy" | "remove" => Some(ActionKind::Removed),
            _ => None,
        }
    }
}

/// A container lifecycle event delivered by the runtime.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub action: ActionKind,
    pub container_name: String,
    pub attributes: HashMap<String, String>,
}

/// Operation applied to a provider record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
}

impl Operation {
    pub fn action(self) -> &'static str {
        match self {
            Operation::Create => "add",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

/// `(name, target)` pairs as reported by a provider. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingRecords(pub Vec<(String, String)>);

impl ExistingRecords {
    pub fn contains(&self, name: &str, target: &str) -> bool {
        self.0.iter().any(|(n, t)| n == name && t == target)
    }
}

/// Result of a single mutation attempt, as judged by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
