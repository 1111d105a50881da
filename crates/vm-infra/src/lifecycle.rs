//! Create, read and delete sequencing for one virtual machine.

use std::sync::Arc;

use tracing::info;

use crate::identity;
use crate::network::NetworkPoller;
use crate::task::TaskTracker;
use crate::types::{AttachedDisk, VmCreateRequest, VmId, VmRecord, VmSpec};
use crate::{ControlPlane, Error, Operation, Result, detachable_disks};

/// Split a comma-delimited network list, trimming whitespace around names.
pub fn split_networks(networks: &str) -> Vec<String> {
    networks
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Assemble the create payload. The only disk is the boot disk.
pub fn build_create_request(spec: &VmSpec) -> VmCreateRequest {
    VmCreateRequest {
        name: spec.name.clone(),
        flavor: spec.flavor.clone(),
        image: spec.image.clone(),
        disks: vec![AttachedDisk::boot(&spec.disk_name, &spec.disk_flavor)],
        networks: split_networks(&spec.networks),
    }
}

/// Drives VM lifecycle operations against a [`ControlPlane`].
///
/// Every step is awaited before the next one is issued and the first failure
/// aborts the sequence. Nothing is rolled back.
#[derive(Clone)]
pub struct VmController {
    plane: Arc<dyn ControlPlane>,
    poller: NetworkPoller,
}

impl VmController {
    pub fn new(plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            plane,
            poller: NetworkPoller::default(),
        }
    }

    pub fn with_poller(mut self, poller: NetworkPoller) -> Self {
        self.poller = poller;
        self
    }

    fn tracker(&self) -> TaskTracker<'_> {
        TaskTracker::new(self.plane.as_ref())
    }

    /// Create and start a VM, then wait for its IP address.
    ///
    /// `record.vm_id` is written as soon as the create task completes, so a
    /// later failure still leaves the caller with the ID needed to delete the
    /// partially provisioned VM.
    pub async fn create(&self, spec: &VmSpec, record: &mut VmRecord) -> Result<()> {
        if let Some(existing) = &record.vm_id {
            return Err(Error::AlreadyCreated(existing.clone()));
        }

        let plane = self.plane.as_ref();
        let identity = identity::resolve(plane, &spec.tenant, &spec.project).await?;
        let request = build_create_request(spec);

        let created = self
            .tracker()
            .run(
                Operation::CreateVm,
                plane.create_vm(&identity.project.id, &request),
            )
            .await?;
        let vm_id = created
            .entity_id
            .map(VmId)
            .ok_or_else(|| Error::TaskAwaitFailed {
                operation: Operation::CreateVm,
                task_id: created.id.clone(),
                source: "completed create task carries no vm id".into(),
            })?;
        record.vm_id = Some(vm_id.clone());
        info!(vm_id = %vm_id, name = %spec.name, project_id = %identity.project.id, "vm created");

        self.tracker()
            .run(Operation::StartVm, plane.start_vm(&vm_id))
            .await?;
        info!(vm_id = %vm_id, name = %spec.name, "vm started");

        let ip = self.poller.resolve(plane, &vm_id).await?;
        info!(vm_id = %vm_id, ip = %ip, "vm IP address assigned");
        record.ip_address = Some(ip);

        Ok(())
    }

    /// Re-read a VM's IP address.
    pub async fn read(&self, vm_id: &VmId) -> Result<VmRecord> {
        let ip = self.poller.resolve(self.plane.as_ref(), vm_id).await?;
        Ok(VmRecord {
            vm_id: Some(vm_id.clone()),
            ip_address: Some(ip),
        })
    }

    /// Stop the VM, detach every non-boot disk, then delete it.
    pub async fn delete(&self, vm_id: &VmId) -> Result<()> {
        let plane = self.plane.as_ref();
        let tracker = self.tracker();
        info!(vm_id = %vm_id, "deleting vm");

        tracker.run(Operation::StopVm, plane.stop_vm(vm_id)).await?;

        let vm = plane
            .get_vm(vm_id)
            .await
            .map_err(|source| Error::DiskLookupFailed {
                vm_id: vm_id.clone(),
                source,
            })?;

        for disk in detachable_disks(&vm.attached_disks) {
            let Some(disk_id) = disk.id.as_deref() else {
                return Err(Error::DiskLookupFailed {
                    vm_id: vm_id.clone(),
                    source: format!("attached disk '{}' has no id", disk.name).into(),
                });
            };
            tracker
                .run(Operation::DetachDisk, plane.detach_disk(vm_id, disk_id))
                .await?;
            info!(vm_id = %vm_id, disk_id, kind = %disk.kind, "disk detached");
        }

        tracker.run(Operation::DeleteVm, plane.delete_vm(vm_id)).await?;
        info!(vm_id = %vm_id, "vm deleted");
        Ok(())
    }
}
