//! Tenant and project name resolution.
//!
//! Tenants resolve first-match-wins while projects reject duplicates. The two
//! lookups deliberately keep that difference; see DESIGN.md.

use tracing::debug;

use crate::types::{NamedResource, ResolvedIdentity};
use crate::{ControlPlane, Error, Result};

/// Resolve a tenant name to its ID. The first tenant with that exact name wins.
pub async fn resolve_tenant(plane: &dyn ControlPlane, name: &str) -> Result<NamedResource> {
    let tenants = plane
        .list_tenants()
        .await
        .map_err(Error::IdentityLookupFailed)?;

    let tenant = tenants
        .into_iter()
        .find(|t| t.name == name)
        .ok_or_else(|| Error::TenantNotFound(name.to_string()))?;

    debug!(tenant_id = %tenant.id, tenant = name, "resolved tenant");
    Ok(tenant)
}

/// Resolve a project name within a tenant. Exactly one match is required.
pub async fn resolve_project(
    plane: &dyn ControlPlane,
    tenant_id: &str,
    name: &str,
) -> Result<NamedResource> {
    let mut projects = plane
        .list_projects(tenant_id, name)
        .await
        .map_err(Error::IdentityLookupFailed)?;

    match projects.len() {
        0 => Err(Error::ProjectNotFound {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
        }),
        1 => {
            let project = projects.remove(0);
            debug!(project_id = %project.id, project = name, "resolved project");
            Ok(project)
        }
        count => Err(Error::ProjectAmbiguous {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            count,
        }),
    }
}

pub async fn resolve(plane: &dyn ControlPlane, tenant: &str, project: &str) -> Result<ResolvedIdentity> {
    let tenant = resolve_tenant(plane, tenant).await?;
    let project = resolve_project(plane, &tenant.id, project).await?;
    Ok(ResolvedIdentity { tenant, project })
}
