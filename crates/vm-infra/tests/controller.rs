//! Drives `VmController` through a full create, read and delete cycle
//! against the in-memory control plane.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;
use vm_infra::network::NetworkPoller;
use vm_infra::testing::{Call, FakeControlPlane};
use vm_infra::types::{VmId, VmRecord, VmSpec};
use vm_infra::{Error, Operation, VmController};

fn spec() -> VmSpec {
    VmSpec {
        name: "web-1".into(),
        tenant: "dev".into(),
        project: "web".into(),
        flavor: "core-100".into(),
        disk_flavor: "core-100-disk".into(),
        disk_name: "web-1-boot".into(),
        image: "img-ubuntu".into(),
        networks: "net-a, net-b".into(),
    }
}

fn plane() -> FakeControlPlane {
    FakeControlPlane::new()
        .with_tenant("tenant-1", "dev")
        .with_tenant("tenant-2", "dev")
        .with_project("tenant-1", "project-1", "web")
        .with_vm_id("vm-7")
        .with_disk("disk-boot", true)
        .with_disk("disk-data", false)
}

fn without_waits(calls: Vec<Call>) -> Vec<Call> {
    calls
        .into_iter()
        .filter(|c| !matches!(c, Call::WaitTask(_)))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn create_read_delete_cycle() {
    let plane = Arc::new(
        plane()
            .with_network_poll(json!([{ "ipAddress": "-", "macAddress": "00:50:56:01:02:03" }]))
            .with_network_poll(json!([{ "ipAddress": "10.1.0.4", "macAddress": "00:50:56:01:02:03" }])),
    );
    let controller = VmController::new(plane.clone());
    let mut record = VmRecord::new();

    controller.create(&spec(), &mut record).await.unwrap();
    let vm_id = VmId("vm-7".into());
    assert_eq!(record.vm_id.as_ref(), Some(&vm_id));
    assert_eq!(record.ip_address.as_deref(), Some("10.1.0.4"));

    let read = controller.read(&vm_id).await.unwrap();
    assert_eq!(read, record);

    controller.delete(&vm_id).await.unwrap();

    let calls = without_waits(plane.calls());
    let tail: Vec<Call> = calls
        .iter()
        .skip_while(|c| !matches!(c, Call::StopVm(_)))
        .cloned()
        .collect();
    assert_eq!(
        tail,
        vec![
            Call::StopVm(vm_id.clone()),
            Call::GetVm(vm_id.clone()),
            Call::DetachDisk {
                vm_id: vm_id.clone(),
                disk_id: "disk-data".into(),
            },
            Call::DeleteVm(vm_id),
        ]
    );
    assert_eq!(
        calls.iter().filter(|c| matches!(c, Call::ListTenants)).count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn partial_create_can_be_cleaned_up() {
    let plane = Arc::new(plane().with_network_poll(json!([
        { "ipAddress": "192.168.0.10", "macAddress": "52:54:00:aa:bb:cc" }
    ])));
    let controller = VmController::new(plane.clone())
        .with_poller(NetworkPoller::new(Duration::from_secs(2), Duration::from_secs(7)));
    let mut record = VmRecord::new();
    let start = Instant::now();

    let err = controller.create(&spec(), &mut record).await.unwrap_err();

    assert!(matches!(err, Error::IpResolutionTimeout { .. }), "{err:?}");
    assert!(start.elapsed() >= Duration::from_secs(7));
    assert_eq!(plane.count(|c| matches!(c, Call::GetVmNetworks(_))), 3);

    let vm_id = record.vm_id.clone().unwrap();
    assert_eq!(record.ip_address, None);

    let err = controller.create(&spec(), &mut record).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyCreated(ref id) if *id == vm_id));

    controller.delete(&vm_id).await.unwrap();
    assert_eq!(plane.count(|c| matches!(c, Call::DeleteVm(_))), 1);
}

#[tokio::test]
async fn failed_detach_keeps_vm() {
    let plane = Arc::new(plane().fail_task(Operation::DetachDisk));
    let controller = VmController::new(plane.clone());

    let err = controller.delete(&VmId("vm-7".into())).await.unwrap_err();

    assert!(matches!(
        err,
        Error::TaskAwaitFailed {
            operation: Operation::DetachDisk,
            ..
        }
    ));
    assert_eq!(plane.count(|c| matches!(c, Call::DeleteVm(_))), 0);
}
