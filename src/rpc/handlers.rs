use super::types::*;
use crate::error::AccountError;
use crate::rpc::RpcState;
use axum::{debug_handler, extract::State, http::StatusCode, Json};
use tracing::{debug, error};

type MethodResult = Result<serde_json::Value, (StatusCode, RpcError)>;

/// Main dispatcher: routes incoming JSON-RPC requests to the correct handler.
#[debug_handler]
pub async fn handle_rpc_request(
    State(state): State<RpcState>,
    Json(req): Json<RpcRequest>,
) -> (StatusCode, Json<RpcResponse>) {
    debug!("RPC Request: method={}, id={}", req.method, req.id);

    let result = match req.method.as_str() {
        "listAccounts" => handle_list_accounts(&state).await,
        "createAccount" => handle_create_account(&state, req.params).await,
        "updateAccount" => handle_update_account(&state, req.params).await,
        _ => Err((
            StatusCode::OK,
            RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", req.method)),
        )),
    };

    // Build response
    match result {
        Ok(val) => (
            StatusCode::OK,
            Json(RpcResponse {
                jsonrpc: "2.0".to_string(),
                result: Some(val),
                error: None,
                id: req.id,
            }),
        ),
        Err((status, err)) => (
            status,
            Json(RpcResponse {
                jsonrpc: "2.0".to_string(),
                result: None,
                error: Some(err),
                id: req.id,
            }),
        ),
    }
}

pub async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

//
// === Helper Functions ===
//

/// Map a workflow failure onto the HTTP status and JSON-RPC error.
fn account_failure(err: AccountError) -> (StatusCode, RpcError) {
    if let AccountError::Internal(detail) = &err {
        error!("Account operation failed: {}", detail);
    }
    (err.status(), RpcError::from(&err))
}

/// Safely serialize to JSON value
fn to_json<T: serde::Serialize>(value: &T) -> MethodResult {
    serde_json::to_value(value).map_err(|e| {
        error!("Serialization error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            RpcError::new(INTERNAL_ERROR, "Internal error"),
        )
    })
}

//
// === Individual Handlers ===
//

/// Handle listAccounts()
async fn handle_list_accounts(state: &RpcState) -> MethodResult {
    let accounts = state.accounts.list().await.map_err(account_failure)?;
    to_json(&accounts)
}

/// Handle createAccount(name, email, password, [provider], [avatarId])
async fn handle_create_account(state: &RpcState, params: serde_json::Value) -> MethodResult {
    let account = state.accounts.create(params).await.map_err(account_failure)?;
    to_json(&account)
}

/// Handle updateAccount(accountId, changes)
async fn handle_update_account(state: &RpcState, params: serde_json::Value) -> MethodResult {
    let params: UpdateAccountParams = serde_json::from_value(params).map_err(|e| {
        (
            StatusCode::OK,
            RpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)),
        )
    })?;

    let profile = state
        .accounts
        .update(params.account_id, params.changes)
        .await
        .map_err(account_failure)?;
    to_json(&profile)
}
