pub mod vms;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use crate::auth::auth_middleware;
use crate::state::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/vms", post(vms::create_vm))
        .route("/vms/{id}", get(vms::get_vm).delete(vms::delete_vm))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use vm_infra::network::NetworkPoller;
    use vm_infra::testing::{Call, FakeControlPlane};
    use vm_infra::{Operation, PhotonConfig, VmController};

    use super::*;
    use crate::config::AppConfig;

    const KEY: &str = "test-key";

    fn app(plane: Arc<FakeControlPlane>) -> Router {
        let controller = VmController::new(plane)
            .with_poller(NetworkPoller::new(Duration::from_secs(1), Duration::from_secs(10)));
        api_router(AppState {
            controller,
            config: AppConfig {
                listen_addr: "127.0.0.1:0".parse().unwrap(),
                control_plane_api_key: KEY.into(),
                photon: PhotonConfig {
                    endpoint: "https://photon.invalid".into(),
                    ignore_certificate: false,
                    tenant: Some("t1".into()),
                    project: Some("p1".into()),
                },
            },
        })
    }

    fn plane() -> FakeControlPlane {
        FakeControlPlane::new()
            .with_tenant("tenant-1", "t1")
            .with_project("tenant-1", "project-1", "p1")
            .with_vm_id("vm-42")
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {KEY}"))
            .header("content-type", "application/json");
        match body {
            Some(b) => builder.body(Body::from(b.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn create_body() -> Value {
        json!({
            "name": "vm1",
            "flavor": "f1",
            "disk_flavor": "d1",
            "disk_name": "disk1",
            "image": "img1",
            "networks": "n1,n2"
        })
    }

    #[tokio::test]
    async fn rejects_missing_bearer_token() {
        let resp = app(Arc::new(plane()))
            .oneshot(Request::get("/vms/vm-42").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test(start_paused = true)]
    async fn create_uses_configured_defaults() {
        let plane = Arc::new(plane().with_network_poll(json!([
            { "ipAddress": "10.0.0.5", "macAddress": "00:50:56:aa:bb:cc" }
        ])));

        let resp = app(plane.clone())
            .oneshot(request("POST", "/vms", Some(create_body())))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            json_body(resp).await,
            json!({ "vm_id": "vm-42", "ip_address": "10.0.0.5" })
        );
        assert_eq!(plane.count(|c| matches!(c, Call::CreateVm { .. })), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_timeout_reports_vm_id_for_cleanup() {
        let plane = Arc::new(plane());

        let resp = app(plane)
            .oneshot(request("POST", "/vms", Some(create_body())))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json_body(resp).await["vm_id"], "vm-42");
    }

    #[tokio::test]
    async fn create_with_unknown_project_is_not_found() {
        let mut body = create_body();
        body["project"] = json!("missing");

        let resp = app(Arc::new(plane()))
            .oneshot(request("POST", "/vms", Some(body)))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = json_body(resp).await;
        assert!(body.get("vm_id").is_none());
    }

    #[tokio::test]
    async fn create_with_empty_name_is_bad_request() {
        let mut body = create_body();
        body["name"] = json!(" ");

        let resp = app(Arc::new(plane()))
            .oneshot(request("POST", "/vms", Some(body)))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn get_returns_current_ip() {
        let plane = Arc::new(plane().with_network_poll(json!([
            { "ipAddress": "10.0.0.9", "macAddress": "00:0c:29:aa:bb:cc" }
        ])));

        let resp = app(plane)
            .oneshot(request("GET", "/vms/vm-42", None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            json_body(resp).await,
            json!({ "vm_id": "vm-42", "ip_address": "10.0.0.9" })
        );
    }

    #[tokio::test]
    async fn delete_returns_no_content() {
        let plane = Arc::new(plane().with_disk("boot", true).with_disk("data", false));

        let resp = app(plane.clone())
            .oneshot(request("DELETE", "/vms/vm-42", None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(plane.count(|c| matches!(c, Call::DetachDisk { .. })), 1);
        assert_eq!(plane.count(|c| matches!(c, Call::DeleteVm(_))), 1);
    }

    #[tokio::test]
    async fn delete_failure_is_bad_gateway() {
        let plane = Arc::new(plane().fail_task(Operation::StopVm));

        let resp = app(plane)
            .oneshot(request("DELETE", "/vms/vm-42", None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
