//! In-memory [`ControlPlane`] for tests.
//!
//! Every call is recorded in order so tests can assert on the exact sequence
//! of remote operations. Tasks complete as soon as they are awaited unless a
//! failure was injected for their operation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::types::{
    AttachedDisk, DiskKind, NamedResource, RemoteTask, TaskState, VmCreateRequest, VmDetails, VmId,
};
use crate::{ControlPlane, Operation, RemoteResult};

/// A recorded control-plane call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListTenants,
    ListProjects { tenant_id: String, name: String },
    CreateVm { project_id: String, request: VmCreateRequest },
    StartVm(VmId),
    StopVm(VmId),
    DeleteVm(VmId),
    GetVm(VmId),
    DetachDisk { vm_id: VmId, disk_id: String },
    GetVmNetworks(VmId),
    WaitTask(String),
}

#[derive(Default)]
struct FakeState {
    tenants: Vec<NamedResource>,
    projects: Vec<(String, NamedResource)>,
    vm_id: String,
    disks: Vec<AttachedDisk>,
    network_polls: VecDeque<serde_json::Value>,
    last_network_poll: Option<serde_json::Value>,
    fail_submit: HashSet<Operation>,
    fail_task: HashSet<Operation>,
    fail_wait: HashSet<Operation>,
    fail_identity_lookup: bool,
    fail_get_vm: bool,
    tasks: HashMap<String, (Operation, RemoteTask)>,
    next_task: u32,
    calls: Vec<Call>,
}

pub struct FakeControlPlane {
    state: Mutex<FakeState>,
}

impl Default for FakeControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                vm_id: "vm-0001".into(),
                ..FakeState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake control plane state poisoned")
    }

    pub fn with_tenant(self, id: &str, name: &str) -> Self {
        self.state().tenants.push(NamedResource {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_project(self, tenant_id: &str, id: &str, name: &str) -> Self {
        self.state().projects.push((
            tenant_id.into(),
            NamedResource {
                id: id.into(),
                name: name.into(),
            },
        ));
        self
    }

    /// ID assigned to the VM by the create task.
    pub fn with_vm_id(self, id: &str) -> Self {
        self.state().vm_id = id.into();
        self
    }

    pub fn with_disk(self, id: &str, boot_disk: bool) -> Self {
        self.state().disks.push(AttachedDisk {
            id: Some(id.into()),
            name: id.into(),
            flavor: "disk-flavor".into(),
            kind: if boot_disk {
                DiskKind::Ephemeral
            } else {
                DiskKind::Persistent
            },
            boot_disk,
        });
        self
    }

    /// Queue the `networkConnections` payload for the next network query.
    /// Once the queue is drained the last payload keeps being returned.
    pub fn with_network_poll(self, connections: serde_json::Value) -> Self {
        self.state().network_polls.push_back(connections);
        self
    }

    /// Reject the submission of `operation`.
    pub fn fail_submit(self, operation: Operation) -> Self {
        self.state().fail_submit.insert(operation);
        self
    }

    /// Let tasks of `operation` finish in the error state.
    pub fn fail_task(self, operation: Operation) -> Self {
        self.state().fail_task.insert(operation);
        self
    }

    /// Make awaiting tasks of `operation` fail with a transport error.
    pub fn fail_wait(self, operation: Operation) -> Self {
        self.state().fail_wait.insert(operation);
        self
    }

    pub fn fail_identity_lookup(self) -> Self {
        self.state().fail_identity_lookup = true;
        self
    }

    pub fn fail_get_vm(self) -> Self {
        self.state().fail_get_vm = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    fn issue(
        &self,
        call: Call,
        operation: Operation,
        resource_properties: Option<serde_json::Value>,
    ) -> RemoteResult<RemoteTask> {
        let mut state = self.state();
        state.calls.push(call);

        if state.fail_submit.contains(&operation) {
            return Err(format!("injected {operation} submission failure").into());
        }

        state.next_task += 1;
        let id = format!("task-{:04}", state.next_task);
        let final_state = if state.fail_task.contains(&operation) {
            TaskState::Errored
        } else {
            TaskState::Completed
        };
        let done = RemoteTask {
            id: id.clone(),
            state: final_state,
            entity_id: Some(state.vm_id.clone()),
            operation: Some(operation.as_str().into()),
            resource_properties,
        };
        state.tasks.insert(id.clone(), (operation, done));

        Ok(RemoteTask {
            id,
            state: TaskState::Queued,
            entity_id: None,
            operation: Some(operation.as_str().into()),
            resource_properties: None,
        })
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn list_tenants(&self) -> RemoteResult<Vec<NamedResource>> {
        let mut state = self.state();
        state.calls.push(Call::ListTenants);
        if state.fail_identity_lookup {
            return Err("injected tenant lookup failure".into());
        }
        Ok(state.tenants.clone())
    }

    async fn list_projects(&self, tenant_id: &str, name: &str) -> RemoteResult<Vec<NamedResource>> {
        let mut state = self.state();
        state.calls.push(Call::ListProjects {
            tenant_id: tenant_id.into(),
            name: name.into(),
        });
        if state.fail_identity_lookup {
            return Err("injected project lookup failure".into());
        }
        Ok(state
            .projects
            .iter()
            .filter(|(t, p)| t == tenant_id && p.name == name)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn create_vm(&self, project_id: &str, spec: &VmCreateRequest) -> RemoteResult<RemoteTask> {
        let call = Call::CreateVm {
            project_id: project_id.into(),
            request: spec.clone(),
        };
        self.issue(call, Operation::CreateVm, None)
    }

    async fn start_vm(&self, vm_id: &VmId) -> RemoteResult<RemoteTask> {
        self.issue(Call::StartVm(vm_id.clone()), Operation::StartVm, None)
    }

    async fn stop_vm(&self, vm_id: &VmId) -> RemoteResult<RemoteTask> {
        self.issue(Call::StopVm(vm_id.clone()), Operation::StopVm, None)
    }

    async fn delete_vm(&self, vm_id: &VmId) -> RemoteResult<RemoteTask> {
        self.issue(Call::DeleteVm(vm_id.clone()), Operation::DeleteVm, None)
    }

    async fn get_vm(&self, vm_id: &VmId) -> RemoteResult<VmDetails> {
        let mut state = self.state();
        state.calls.push(Call::GetVm(vm_id.clone()));
        if state.fail_get_vm {
            return Err("injected get vm failure".into());
        }
        Ok(VmDetails {
            id: vm_id.clone(),
            name: "fake".into(),
            attached_disks: state.disks.clone(),
        })
    }

    async fn detach_disk(&self, vm_id: &VmId, disk_id: &str) -> RemoteResult<RemoteTask> {
        let call = Call::DetachDisk {
            vm_id: vm_id.clone(),
            disk_id: disk_id.into(),
        };
        self.issue(call, Operation::DetachDisk, None)
    }

    async fn get_vm_networks(&self, vm_id: &VmId) -> RemoteResult<RemoteTask> {
        let connections = {
            let mut state = self.state();
            match state.network_polls.pop_front() {
                Some(next) => {
                    state.last_network_poll = Some(next.clone());
                    next
                }
                None => state
                    .last_network_poll
                    .clone()
                    .unwrap_or_else(|| serde_json::json!([])),
            }
        };
        let props = serde_json::json!({ "networkConnections": connections });
        self.issue(
            Call::GetVmNetworks(vm_id.clone()),
            Operation::GetNetworks,
            Some(props),
        )
    }

    async fn wait_task(&self, task_id: &str) -> RemoteResult<RemoteTask> {
        let mut state = self.state();
        state.calls.push(Call::WaitTask(task_id.into()));
        let (operation, task) = state
            .tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| format!("unknown task {task_id}"))?;
        if state.fail_wait.contains(&operation) {
            return Err(format!("injected {operation} wait failure").into());
        }
        Ok(task)
    }
}
