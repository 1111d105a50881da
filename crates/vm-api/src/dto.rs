use serde::{Deserialize, Serialize};
use vm_infra::types::{VmId, VmRecord, VmSpec};

use crate::config::AppConfig;
use crate::error::ApiError;

// ── Requests ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateVmRequest {
    pub name: String,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    pub flavor: String,
    pub disk_flavor: String,
    pub disk_name: String,
    pub image: String,
    #[serde(default)]
    pub networks: String,
}

impl CreateVmRequest {
    /// Fill in tenant/project defaults and build the VM spec.
    pub fn into_spec(self, config: &AppConfig) -> Result<VmSpec, ApiError> {
        for (field, value) in [
            ("name", &self.name),
            ("flavor", &self.flavor),
            ("disk_flavor", &self.disk_flavor),
            ("disk_name", &self.disk_name),
            ("image", &self.image),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::BadRequest(format!("{field} must not be empty")));
            }
        }

        let tenant = pick(self.tenant, &config.photon.tenant, "tenant")?;
        let project = pick(self.project, &config.photon.project, "project")?;

        Ok(VmSpec {
            name: self.name,
            tenant,
            project,
            flavor: self.flavor,
            disk_flavor: self.disk_flavor,
            disk_name: self.disk_name,
            image: self.image,
            networks: self.networks,
        })
    }
}

fn pick(requested: Option<String>, default: &Option<String>, what: &str) -> Result<String, ApiError> {
    requested
        .filter(|s| !s.trim().is_empty())
        .or_else(|| default.clone())
        .ok_or_else(|| {
            vm_infra::Error::ConfigurationInvalid(format!(
                "no {what} in request and no PHOTON_{} default configured",
                what.to_uppercase()
            ))
            .into()
        })
}

// ── Responses ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct VmResponse {
    pub vm_id: Option<VmId>,
    pub ip_address: Option<String>,
}

impl From<VmRecord> for VmResponse {
    fn from(record: VmRecord) -> Self {
        Self {
            vm_id: record.vm_id,
            ip_address: record.ip_address,
        }
    }
}
