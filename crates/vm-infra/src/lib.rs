pub mod config;
pub mod identity;
pub mod lifecycle;
pub mod network;
pub mod photon;
pub mod task;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use types::{AttachedDisk, NamedResource, RemoteTask, VmCreateRequest, VmDetails, VmId};

pub use config::PhotonConfig;
pub use lifecycle::VmController;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a raw [`ControlPlane`] call.
pub type RemoteResult<T> = std::result::Result<T, BoxError>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("photon controller error: {0}")]
    Photon(#[from] photon_api::Error),

    #[error("tenant '{0}' not found")]
    TenantNotFound(String),

    #[error("project '{name}' not found in tenant {tenant_id}")]
    ProjectNotFound { tenant_id: String, name: String },

    #[error("found {count} projects named '{name}' in tenant {tenant_id}")]
    ProjectAmbiguous {
        tenant_id: String,
        name: String,
        count: usize,
    },

    #[error("tenant/project lookup failed: {0}")]
    IdentityLookupFailed(BoxError),

    #[error("failed to submit {operation}: {source}")]
    TaskSubmissionFailed {
        operation: Operation,
        source: BoxError,
    },

    #[error("{operation} task {task_id} failed: {source}")]
    TaskAwaitFailed {
        operation: Operation,
        task_id: String,
        source: BoxError,
    },

    #[error("failed to list disks of vm {vm_id}: {source}")]
    DiskLookupFailed { vm_id: VmId, source: BoxError },

    #[error("no usable IP address reported for vm {vm_id} within {timeout:?}")]
    IpResolutionTimeout { vm_id: VmId, timeout: Duration },

    #[error("network query for vm {vm_id} failed: {source}")]
    NetworkQueryFailed { vm_id: VmId, source: Box<Error> },

    #[error("record already holds vm {0}")]
    AlreadyCreated(VmId),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Remote operations that are tracked through a [`RemoteTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateVm,
    StartVm,
    StopVm,
    DetachDisk,
    DeleteVm,
    GetNetworks,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateVm => "create vm",
            Self::StartVm => "start vm",
            Self::StopVm => "stop vm",
            Self::DetachDisk => "detach disk",
            Self::DeleteVm => "delete vm",
            Self::GetNetworks => "get vm networks",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control-plane operations the VM lifecycle is built on.
///
/// Mutating calls return a [`RemoteTask`] as soon as the request is accepted;
/// [`ControlPlane::wait_task`] blocks until that task is terminal.
#[async_trait]
pub trait ControlPlane: Send + Sync + 'static {
    async fn list_tenants(&self) -> RemoteResult<Vec<NamedResource>>;

    /// Projects of a tenant, filtered server-side by exact name.
    async fn list_projects(&self, tenant_id: &str, name: &str) -> RemoteResult<Vec<NamedResource>>;

    async fn create_vm(&self, project_id: &str, spec: &VmCreateRequest) -> RemoteResult<RemoteTask>;

    async fn start_vm(&self, vm_id: &VmId) -> RemoteResult<RemoteTask>;

    async fn stop_vm(&self, vm_id: &VmId) -> RemoteResult<RemoteTask>;

    async fn delete_vm(&self, vm_id: &VmId) -> RemoteResult<RemoteTask>;

    async fn get_vm(&self, vm_id: &VmId) -> RemoteResult<VmDetails>;

    async fn detach_disk(&self, vm_id: &VmId, disk_id: &str) -> RemoteResult<RemoteTask>;

    /// The awaited task carries the network connections in `resource_properties`.
    async fn get_vm_networks(&self, vm_id: &VmId) -> RemoteResult<RemoteTask>;

    async fn wait_task(&self, task_id: &str) -> RemoteResult<RemoteTask>;
}

/// Connect to the configured Photon endpoint and wrap it in a controller.
pub async fn build_controller(config: &PhotonConfig) -> Result<VmController> {
    let client = config.connect().await?;
    Ok(VmController::new(Arc::new(client)))
}

/// Non-boot disks that must be detached before the VM can be deleted.
pub fn detachable_disks(disks: &[AttachedDisk]) -> impl Iterator<Item = &AttachedDisk> {
    disks.iter().filter(|d| !d.boot_disk)
}
