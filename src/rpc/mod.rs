pub mod handlers;
pub mod types;

use crate::account::AccountService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct RpcState {
    pub accounts: Arc<AccountService>,
}

pub struct RpcServer {
    state: RpcState,
    bind_addr: String,
}

impl RpcServer {
    pub fn new(accounts: Arc<AccountService>, bind_addr: impl Into<String>) -> Self {
        Self {
            state: RpcState { accounts },
            bind_addr: bind_addr.into(),
        }
    }

    pub async fn start(self) -> std::io::Result<()> {
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;

        info!("RPC server listening on {}", self.bind_addr);
        axum::serve(listener, app).await
    }
}

pub fn router(state: RpcState) -> Router {
    Router::new()
        .route("/", post(handlers::handle_rpc_request))
        .route("/health", get(handlers::handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Argon2Credentials, MemoryStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(MemoryStore::new());
        let accounts = AccountService::new(
            store.clone(),
            store,
            Arc::new(Argon2Credentials),
            "http://localhost:3333",
        );
        router(RpcState {
            accounts: Arc::new(accounts),
        })
    }

    async fn call(app: &Router, method: &str, params: Value) -> (StatusCode, Value) {
        let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 });
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_create_list_update() {
        let app = app();

        let (status, created) = call(
            &app,
            "createAccount",
            json!({ "name": "Alice", "email": "alice@example.com", "password": "secret1" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["result"]["provider"], false);
        let id = created["result"]["id"].as_str().unwrap().to_string();

        let (_, listed) = call(&app, "listAccounts", Value::Null).await;
        assert_eq!(listed["result"].as_array().unwrap().len(), 1);
        assert!(listed["result"][0].get("password_hash").is_none());

        let (status, updated) = call(
            &app,
            "updateAccount",
            json!({ "accountId": id, "changes": { "name": "Alicia" } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["result"]["name"], "Alicia");
        assert_eq!(updated["result"]["avatar"], Value::Null);
    }

    #[tokio::test]
    async fn test_error_status_and_kind() {
        let app = app();
        let (_, created) = call(
            &app,
            "createAccount",
            json!({ "name": "Alice", "email": "alice@example.com", "password": "secret1" }),
        )
        .await;
        let id = created["result"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            "createAccount",
            json!({ "name": "Alice", "email": "alice@example.com", "password": "secret1" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], types::ACCOUNT_CONFLICT);
        assert_eq!(body["error"]["data"]["kind"], "conflict");

        let (status, body) = call(
            &app,
            "updateAccount",
            json!({
                "accountId": id,
                "changes": { "oldPassword": "wrong11", "password": "newpass1", "confirmPassword": "newpass1" },
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Password does not match");

        let (status, body) = call(
            &app,
            "updateAccount",
            json!({ "accountId": id, "changes": { "oldPassword": "secret1" } }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["data"]["kind"], "validation");
        assert_eq!(body["error"]["message"], "Validation fails");
    }

    #[tokio::test]
    async fn test_envelope_errors() {
        let app = app();

        let (status, body) = call(&app, "dropAccounts", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], types::METHOD_NOT_FOUND);

        let (_, body) = call(&app, "updateAccount", json!({ "accountId": "nope" })).await;
        assert_eq!(body["error"]["code"], types::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
