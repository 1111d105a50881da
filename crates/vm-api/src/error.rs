use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vm_infra::types::VmId;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    /// A lifecycle failure. `vm_id` is set when the VM already exists on the
    /// control plane and needs cleaning up.
    #[error("{source}")]
    Vm {
        source: vm_infra::Error,
        vm_id: Option<VmId>,
    },
}

impl From<vm_infra::Error> for ApiError {
    fn from(source: vm_infra::Error) -> Self {
        ApiError::Vm {
            source,
            vm_id: None,
        }
    }
}

fn vm_error_status(err: &vm_infra::Error) -> StatusCode {
    use vm_infra::Error;

    match err {
        Error::ConfigurationInvalid(_) => StatusCode::BAD_REQUEST,
        Error::TenantNotFound(_) | Error::ProjectNotFound { .. } => StatusCode::NOT_FOUND,
        Error::ProjectAmbiguous { .. } | Error::AlreadyCreated(_) => StatusCode::CONFLICT,
        Error::IpResolutionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        Error::Photon(_)
        | Error::IdentityLookupFailed(_)
        | Error::TaskSubmissionFailed { .. }
        | Error::TaskAwaitFailed { .. }
        | Error::DiskLookupFailed { .. }
        | Error::NetworkQueryFailed { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, vm_id) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, None),
            ApiError::Vm { source, vm_id } => (vm_error_status(source), vm_id.clone()),
        };

        let body = match vm_id {
            Some(id) => serde_json::json!({ "error": self.to_string(), "vm_id": id }),
            None => serde_json::json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}
