//! Resource collection routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::Value;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_create, handle_list, handle_remove, handle_replace, ListQuery};
use crate::AppState;

/// Create resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/{resource}", get(list_handler).post(create_handler))
        .route(
            "/api/{resource}/{id}",
            put(replace_handler).delete(remove_handler),
        )
}

/// GET /api/{resource} - List elements.
async fn list_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(resource): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Value>>> {
    let query = ListQuery::from_pairs(&pairs);
    let elements = handle_list(&state.store, &resource, &query)?;
    Ok(Json(elements))
}

/// POST /api/{resource} - Create an element.
async fn create_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(resource): Path<String>,
    Json(element): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    let stored = handle_create(&state.store, &resource, element)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// PUT /api/{resource}/{id} - Replace an element.
async fn replace_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((resource, id)): Path<(String, String)>,
    Json(element): Json<Value>,
) -> Result<Json<Value>> {
    let stored = handle_replace(&state.store, &resource, &id, element)?;
    Ok(Json(stored))
}

/// DELETE /api/{resource}/{id} - Remove an element.
async fn remove_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((resource, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    handle_remove(&state.store, &resource, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
