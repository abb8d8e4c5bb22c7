//! In-memory item CRUD router.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::http::error::ApiError;
use crate::http::server::{AppState, RequestLogger};
use crate::service::{Item, NewItem};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items/", get(list_items).post(create_item))
        .route("/items/{item_id}", get(get_item).delete(delete_item))
}

async fn list_items(
    RequestLogger(logger): RequestLogger,
    State(state): State<AppState>,
) -> Json<Vec<Item>> {
    let items = state.store.list();
    logger.info("Getting all items", json!({ "item_count": items.len() }));
    Json(items)
}

async fn create_item(
    RequestLogger(logger): RequestLogger,
    State(state): State<AppState>,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let Json(new_item) = payload?;
    let item = state.store.insert(new_item)?;
    logger.info(
        "Item created",
        json!({ "item_id": item.id, "item_name": item.name }),
    );
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    RequestLogger(logger): RequestLogger,
    State(state): State<AppState>,
    item_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Item>, ApiError> {
    let Path(item_id) = item_id?;
    match state.store.get(item_id) {
        Some(item) => {
            logger.info("Getting item", json!({ "item_id": item_id }));
            Ok(Json(item))
        }
        None => Err(ApiError::not_found("Item not found")),
    }
}

/// Deletion is business-significant; it emits an audit record naming the
/// item and the acting user (from the `x-user-id` header when present).
async fn delete_item(
    RequestLogger(logger): RequestLogger,
    State(state): State<AppState>,
    item_id: Result<Path<u64>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Path(item_id) = item_id?;
    let item = state
        .store
        .remove(item_id)
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    let user_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous");
    logger.audit(
        "Item deleted",
        json!({
            "item_id": item.id,
            "item_name": item.name,
            "user_id": user_id,
        }),
    );
    Ok(Json(json!({ "status": "deleted", "item_id": item_id })))
}
