use async_trait::async_trait;
use photon_api::PhotonClient;

use crate::types::{
    AttachedDisk, DiskKind, NamedResource, RemoteTask, TaskState, VmCreateRequest, VmDetails, VmId,
};
use crate::{ControlPlane, RemoteResult};

impl From<photon_api::Task> for RemoteTask {
    fn from(task: photon_api::Task) -> Self {
        let state = match task.state {
            photon_api::TaskState::Queued => TaskState::Queued,
            photon_api::TaskState::Started => TaskState::Running,
            photon_api::TaskState::Completed => TaskState::Completed,
            photon_api::TaskState::Error => TaskState::Errored,
        };

        Self {
            id: task.id,
            state,
            entity_id: task.entity.map(|e| e.id),
            operation: task.operation,
            resource_properties: task.resource_properties,
        }
    }
}

impl From<photon_api::AttachedDisk> for AttachedDisk {
    fn from(disk: photon_api::AttachedDisk) -> Self {
        Self {
            id: disk.id,
            kind: DiskKind::from_kind(&disk.kind),
            name: disk.name,
            flavor: disk.flavor,
            boot_disk: disk.boot_disk,
        }
    }
}

fn create_spec(request: &VmCreateRequest) -> photon_api::VmCreateSpec {
    photon_api::VmCreateSpec {
        name: request.name.clone(),
        flavor: request.flavor.clone(),
        source_image_id: request.image.clone(),
        attached_disks: request
            .disks
            .iter()
            .map(|d| photon_api::AttachedDisk {
                id: d.id.clone(),
                name: d.name.clone(),
                flavor: d.flavor.clone(),
                kind: d.kind.as_str().into(),
                boot_disk: d.boot_disk,
            })
            .collect(),
        subnets: request.networks.clone(),
    }
}

fn named(id: String, name: String) -> NamedResource {
    NamedResource { id, name }
}

#[async_trait]
impl ControlPlane for PhotonClient {
    async fn list_tenants(&self) -> RemoteResult<Vec<NamedResource>> {
        let tenants = PhotonClient::list_tenants(self).await?;
        Ok(tenants.items.into_iter().map(|t| named(t.id, t.name)).collect())
    }

    async fn list_projects(&self, tenant_id: &str, name: &str) -> RemoteResult<Vec<NamedResource>> {
        let projects = PhotonClient::list_projects(self, tenant_id, Some(name)).await?;
        Ok(projects.items.into_iter().map(|p| named(p.id, p.name)).collect())
    }

    async fn create_vm(&self, project_id: &str, spec: &VmCreateRequest) -> RemoteResult<RemoteTask> {
        let task = PhotonClient::create_vm(self, project_id, &create_spec(spec)).await?;
        Ok(task.into())
    }

    async fn start_vm(&self, vm_id: &VmId) -> RemoteResult<RemoteTask> {
        Ok(PhotonClient::start_vm(self, &vm_id.0).await?.into())
    }

    async fn stop_vm(&self, vm_id: &VmId) -> RemoteResult<RemoteTask> {
        Ok(PhotonClient::stop_vm(self, &vm_id.0).await?.into())
    }

    async fn delete_vm(&self, vm_id: &VmId) -> RemoteResult<RemoteTask> {
        Ok(PhotonClient::delete_vm(self, &vm_id.0).await?.into())
    }

    async fn get_vm(&self, vm_id: &VmId) -> RemoteResult<VmDetails> {
        let vm = PhotonClient::get_vm(self, &vm_id.0).await?;
        Ok(VmDetails {
            id: VmId(vm.id),
            name: vm.name,
            attached_disks: vm.attached_disks.into_iter().map(AttachedDisk::from).collect(),
        })
    }

    async fn detach_disk(&self, vm_id: &VmId, disk_id: &str) -> RemoteResult<RemoteTask> {
        let op = photon_api::VmDiskOperation {
            disk_id: disk_id.to_string(),
        };
        Ok(PhotonClient::detach_disk(self, &vm_id.0, &op).await?.into())
    }

    async fn get_vm_networks(&self, vm_id: &VmId) -> RemoteResult<RemoteTask> {
        Ok(PhotonClient::get_vm_networks(self, &vm_id.0).await?.into())
    }

    async fn wait_task(&self, task_id: &str) -> RemoteResult<RemoteTask> {
        Ok(PhotonClient::wait_task(self, task_id).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VmSpec;

    #[test]
    fn photon_task_maps_to_remote_task() {
        let task: photon_api::Task = serde_json::from_value(serde_json::json!({
            "id": "task-1",
            "state": "STARTED",
            "operation": "GET_NETWORKS",
            "entity": { "id": "vm-1", "kind": "vm" },
            "resourceProperties": { "networkConnections": [] }
        }))
        .unwrap();

        let remote = RemoteTask::from(task);
        assert_eq!(remote.state, TaskState::Running);
        assert_eq!(remote.entity_id.as_deref(), Some("vm-1"));
        assert!(remote.resource_properties.is_some());
    }

    #[test]
    fn create_spec_carries_boot_disk_and_subnets() {
        let request = crate::lifecycle::build_create_request(&VmSpec {
            name: "vm1".into(),
            tenant: "t1".into(),
            project: "p1".into(),
            flavor: "f1".into(),
            disk_flavor: "d1".into(),
            disk_name: "disk1".into(),
            image: "img1".into(),
            networks: "n1, n2".into(),
        });

        let spec = create_spec(&request);
        assert_eq!(spec.source_image_id, "img1");
        assert_eq!(spec.subnets, vec!["n1", "n2"]);
        assert_eq!(spec.attached_disks.len(), 1);
        assert_eq!(spec.attached_disks[0].kind, "ephemeral-disk");
        assert!(spec.attached_disks[0].boot_disk);
    }

    #[test]
    fn photon_disk_kinds_map_to_disk_kind() {
        let disk: photon_api::AttachedDisk = serde_json::from_value(serde_json::json!({
            "id": "disk-9",
            "name": "data",
            "flavor": "ssd",
            "kind": "persistent-disk",
            "bootDisk": false
        }))
        .unwrap();

        let disk = AttachedDisk::from(disk);
        assert_eq!(disk.kind, DiskKind::Persistent);
        assert_eq!(disk.id.as_deref(), Some("disk-9"));
        assert!(!disk.boot_disk);
    }
}
