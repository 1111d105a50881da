use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque control-plane VM identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmId(pub String);

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared intent for one virtual machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSpec {
    pub name: String,
    pub tenant: String,
    pub project: String,
    pub flavor: String,
    pub disk_flavor: String,
    pub disk_name: String,
    pub image: String,
    /// Comma-delimited network names, e.g. `"net-a, net-b"`.
    pub networks: String,
}

/// A `{id, name}` pair as listed by the control plane (tenants, projects).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedResource {
    pub id: String,
    pub name: String,
}

/// Tenant and project of a [`VmSpec`], resolved to control-plane IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub tenant: NamedResource,
    pub project: NamedResource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskKind {
    Ephemeral,
    Persistent,
}

impl DiskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ephemeral => "ephemeral-disk",
            Self::Persistent => "persistent-disk",
        }
    }

    /// Anything that is not explicitly ephemeral is treated as persistent.
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "ephemeral-disk" | "ephemeral" => Self::Ephemeral,
            _ => Self::Persistent,
        }
    }
}

impl fmt::Display for DiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDisk {
    /// Assigned by the control plane; absent for disks declared at creation.
    pub id: Option<String>,
    pub name: String,
    pub flavor: String,
    pub kind: DiskKind,
    pub boot_disk: bool,
}

impl AttachedDisk {
    /// The boot disk created inline with the VM and deleted along with it.
    pub fn boot(name: impl Into<String>, flavor: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            flavor: flavor.into(),
            kind: DiskKind::Ephemeral,
            boot_disk: true,
        }
    }
}

/// The "create VM" payload assembled from a [`VmSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmCreateRequest {
    pub name: String,
    pub flavor: String,
    pub image: String,
    pub disks: Vec<AttachedDisk>,
    pub networks: Vec<String>,
}

/// Current control-plane view of a VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmDetails {
    pub id: VmId,
    pub name: String,
    pub attached_disks: Vec<AttachedDisk>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Completed,
    Errored,
}

/// Handle for one asynchronous control-plane operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTask {
    pub id: String,
    pub state: TaskState,
    /// Entity the task acted on. Only meaningful once `Completed`.
    pub entity_id: Option<String>,
    pub operation: Option<String>,
    /// Operation-specific result payload (e.g. network connections).
    pub resource_properties: Option<serde_json::Value>,
}

/// Outcome of provisioning, owned by the caller.
///
/// `vm_id` is filled as soon as the create task completes and is never
/// reassigned. `ip_address` is filled only after network resolution succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRecord {
    pub vm_id: Option<VmId>,
    pub ip_address: Option<String>,
}

impl VmRecord {
    pub fn new() -> Self {
        Self::default()
    }
}
