//! Typed Rust client for the Photon Controller REST API.
//!
//! Covers the subset needed for managing virtual machines:
//! tenants and projects (lookup), VMs (create, get, start, stop, delete,
//! detach disk, networks) and tasks (get, wait).

mod types;

use std::time::Duration;

use tokio::time::Instant;

pub use types::*;

const DEFAULT_TASK_POLL_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_TASK_POLL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("photon api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("photon api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("photon task {id} ({operation}) failed: {message}")]
    TaskFailed {
        id: String,
        operation: String,
        message: String,
    },

    #[error("photon task {id} did not finish within {timeout:?}")]
    TaskTimeout { id: String, timeout: Duration },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Connection options for [`PhotonClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Accept invalid TLS certificates (self-signed management endpoints).
    pub ignore_certificate: bool,
    /// Delay between two `GET /tasks/{id}` polls in [`PhotonClient::wait_task`].
    pub task_poll_delay: Duration,
    /// Upper bound on a single [`PhotonClient::wait_task`] call.
    pub task_poll_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            ignore_certificate: false,
            task_poll_delay: DEFAULT_TASK_POLL_DELAY,
            task_poll_timeout: DEFAULT_TASK_POLL_TIMEOUT,
        }
    }
}

/// Client for the Photon Controller REST API.
#[derive(Debug, Clone)]
pub struct PhotonClient {
    base_url: String,
    options: ClientOptions,
    http: reqwest::Client,
}

impl PhotonClient {
    pub fn new(base_url: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(options.ignore_certificate)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                endpoint,
                status,
                body,
            });
        }
        Ok(resp)
    }

    // ── Status ──────────────────────────────────────────────────────

    pub async fn status(&self) -> Result<Status> {
        let resp = self.http.get(self.url("/status")).send().await?;

        Self::check(resp, "get status")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    // ── Tenants & projects ──────────────────────────────────────────

    pub async fn list_tenants(&self) -> Result<ResourceList<Tenant>> {
        let resp = self.http.get(self.url("/tenants")).send().await?;

        Self::check(resp, "list tenants")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    /// List the projects of a tenant, optionally filtered by exact name.
    pub async fn list_projects(
        &self,
        tenant_id: &str,
        name: Option<&str>,
    ) -> Result<ResourceList<Project>> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(n) = name {
            query.push(("name", n));
        }

        let resp = self
            .http
            .get(self.url(&format!("/tenants/{tenant_id}/projects")))
            .query(&query)
            .send()
            .await?;

        Self::check(resp, "list projects")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    // ── VMs ─────────────────────────────────────────────────────────

    pub async fn create_vm(&self, project_id: &str, spec: &VmCreateSpec) -> Result<Task> {
        let resp = self
            .http
            .post(self.url(&format!("/projects/{project_id}/vms")))
            .json(spec)
            .send()
            .await?;

        Self::check(resp, "create vm")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn get_vm(&self, vm_id: &str) -> Result<Vm> {
        let resp = self
            .http
            .get(self.url(&format!("/vms/{vm_id}")))
            .send()
            .await?;

        Self::check(resp, "get vm")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn start_vm(&self, vm_id: &str) -> Result<Task> {
        let resp = self
            .http
            .post(self.url(&format!("/vms/{vm_id}/start")))
            .send()
            .await?;

        Self::check(resp, "start vm")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn stop_vm(&self, vm_id: &str) -> Result<Task> {
        let resp = self
            .http
            .post(self.url(&format!("/vms/{vm_id}/stop")))
            .send()
            .await?;

        Self::check(resp, "stop vm")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn delete_vm(&self, vm_id: &str) -> Result<Task> {
        let resp = self
            .http
            .delete(self.url(&format!("/vms/{vm_id}")))
            .send()
            .await?;

        Self::check(resp, "delete vm")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn detach_disk(&self, vm_id: &str, op: &VmDiskOperation) -> Result<Task> {
        let resp = self
            .http
            .post(self.url(&format!("/vms/{vm_id}/detach_disk")))
            .json(op)
            .send()
            .await?;

        Self::check(resp, "detach disk")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    /// Request the VM's network connections. The payload arrives in the
    /// awaited task's `resourceProperties`.
    pub async fn get_vm_networks(&self, vm_id: &str) -> Result<Task> {
        let resp = self
            .http
            .get(self.url(&format!("/vms/{vm_id}/networks")))
            .send()
            .await?;

        Self::check(resp, "get vm networks")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    // ── Tasks ───────────────────────────────────────────────────────

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let resp = self
            .http
            .get(self.url(&format!("/tasks/{task_id}")))
            .send()
            .await?;

        Self::check(resp, "get task")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    /// Poll a task until it is `COMPLETED` or `ERROR`.
    ///
    /// An `ERROR` task is returned as [`Error::TaskFailed`]. Transport errors
    /// are returned as-is, without retrying.
    pub async fn wait_task(&self, task_id: &str) -> Result<Task> {
        let deadline = Instant::now() + self.options.task_poll_timeout;

        loop {
            let task = self.get_task(task_id).await?;
            match task.state {
                TaskState::Completed => return Ok(task),
                TaskState::Error => return Err(task_failure(task)),
                TaskState::Queued | TaskState::Started => {}
            }

            if Instant::now() >= deadline {
                return Err(Error::TaskTimeout {
                    id: task_id.to_string(),
                    timeout: self.options.task_poll_timeout,
                });
            }

            tracing::trace!(task_id, state = ?task.state, "photon: task in flight");
            tokio::time::sleep(self.options.task_poll_delay).await;
        }
    }
}

fn task_failure(task: Task) -> Error {
    let message = task
        .errors
        .iter()
        .filter_map(|e| match (&e.code, &e.message) {
            (Some(code), Some(msg)) => Some(format!("{code}: {msg}")),
            (None, Some(msg)) => Some(msg.clone()),
            (Some(code), None) => Some(code.clone()),
            (None, None) => None,
        })
        .collect::<Vec<_>>()
        .join("; ");

    Error::TaskFailed {
        id: task.id,
        operation: task.operation.unwrap_or_else(|| "unknown".into()),
        message: if message.is_empty() {
            "no error details reported".into()
        } else {
            message
        },
    }
}
