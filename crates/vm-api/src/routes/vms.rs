use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use vm_infra::types::{VmId, VmRecord};

use crate::dto::{CreateVmRequest, VmResponse};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn create_vm(
    State(state): State<AppState>,
    Json(req): Json<CreateVmRequest>,
) -> Result<(StatusCode, Json<VmResponse>), ApiError> {
    let spec = req.into_spec(&state.config)?;

    let mut record = VmRecord::new();
    if let Err(e) = state.controller.create(&spec, &mut record).await {
        tracing::error!(name = %spec.name, vm_id = ?record.vm_id, error = %e, "failed to create vm");
        return Err(ApiError::Vm {
            source: e,
            vm_id: record.vm_id,
        });
    }

    Ok((StatusCode::CREATED, Json(VmResponse::from(record))))
}

pub async fn get_vm(
    State(state): State<AppState>,
    Path(vm_id): Path<String>,
) -> Result<Json<VmResponse>, ApiError> {
    let record = state.controller.read(&VmId(vm_id)).await?;
    Ok(Json(VmResponse::from(record)))
}

pub async fn delete_vm(
    State(state): State<AppState>,
    Path(vm_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let vm_id = VmId(vm_id);
    if let Err(e) = state.controller.delete(&vm_id).await {
        tracing::error!(vm_id = %vm_id, error = %e, "failed to delete vm");
        return Err(e.into());
    }

    Ok(StatusCode::NO_CONTENT)
}
