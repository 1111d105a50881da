//! Issue a control-plane operation and follow its task to a terminal state.

use std::future::Future;

use crate::types::{RemoteTask, TaskState};
use crate::{ControlPlane, Error, Operation, RemoteResult, Result};

/// Tracks remote tasks against one [`ControlPlane`].
///
/// Errors are surfaced as-is; nothing is retried here. A caller that wants a
/// retry issues a fresh submission.
pub struct TaskTracker<'a> {
    plane: &'a dyn ControlPlane,
}

impl<'a> TaskTracker<'a> {
    pub fn new(plane: &'a dyn ControlPlane) -> Self {
        Self { plane }
    }

    /// Await the remote call that issues `operation` and return its task handle.
    pub async fn submit<F>(&self, operation: Operation, call: F) -> Result<RemoteTask>
    where
        F: Future<Output = RemoteResult<RemoteTask>>,
    {
        let task = call
            .await
            .map_err(|source| Error::TaskSubmissionFailed { operation, source })?;

        tracing::debug!(%operation, task_id = %task.id, "task submitted");
        Ok(task)
    }

    /// Block until `task` is terminal. Only a `Completed` task is returned.
    pub async fn wait(&self, operation: Operation, task: &RemoteTask) -> Result<RemoteTask> {
        let done = self
            .plane
            .wait_task(&task.id)
            .await
            .map_err(|source| Error::TaskAwaitFailed {
                operation,
                task_id: task.id.clone(),
                source,
            })?;

        match done.state {
            TaskState::Completed => {
                tracing::debug!(%operation, task_id = %done.id, "task completed");
                Ok(done)
            }
            TaskState::Errored => Err(Error::TaskAwaitFailed {
                operation,
                task_id: done.id,
                source: "task finished in error state".into(),
            }),
            TaskState::Queued | TaskState::Running => Err(Error::TaskAwaitFailed {
                operation,
                task_id: done.id,
                source: format!("wait returned non-terminal state {:?}", done.state).into(),
            }),
        }
    }

    /// [`submit`](Self::submit) followed by [`wait`](Self::wait).
    pub async fn run<F>(&self, operation: Operation, call: F) -> Result<RemoteTask>
    where
        F: Future<Output = RemoteResult<RemoteTask>>,
    {
        let task = self.submit(operation, call).await?;
        self.wait(operation, &task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeControlPlane};
    use crate::types::VmId;

    #[tokio::test]
    async fn run_returns_completed_task() {
        let plane = FakeControlPlane::new().with_vm_id("vm-1");
        let tracker = TaskTracker::new(&plane);
        let id = VmId("vm-1".into());

        let task = tracker.run(Operation::StartVm, plane.start_vm(&id)).await.unwrap();

        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.entity_id.as_deref(), Some("vm-1"));
        assert_eq!(
            plane.calls(),
            vec![Call::StartVm(id), Call::WaitTask(task.id.clone())]
        );
    }

    #[tokio::test]
    async fn submission_error_is_not_awaited() {
        let plane = FakeControlPlane::new().fail_submit(Operation::StopVm);
        let tracker = TaskTracker::new(&plane);
        let id = VmId("vm-1".into());

        let err = tracker.run(Operation::StopVm, plane.stop_vm(&id)).await.unwrap_err();

        assert!(matches!(
            err,
            Error::TaskSubmissionFailed {
                operation: Operation::StopVm,
                ..
            }
        ));
        assert_eq!(plane.calls(), vec![Call::StopVm(id)]);
    }

    #[tokio::test]
    async fn errored_task_fails_await() {
        let plane = FakeControlPlane::new().fail_task(Operation::DeleteVm);
        let tracker = TaskTracker::new(&plane);

        let err = tracker
            .run(Operation::DeleteVm, plane.delete_vm(&VmId("vm-1".into())))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::TaskAwaitFailed {
                operation: Operation::DeleteVm,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn wait_transport_error_fails_await() {
        let plane = FakeControlPlane::new().fail_wait(Operation::StartVm);
        let tracker = TaskTracker::new(&plane);

        let err = tracker
            .run(Operation::StartVm, plane.start_vm(&VmId("vm-1".into())))
            .await
            .unwrap_err();

        let source = match err {
            Error::TaskAwaitFailed { source, .. } => source,
            other => panic!("expected TaskAwaitFailed, got {other:?}"),
        };
        assert!(source.to_string().contains("injected"));
    }
}
