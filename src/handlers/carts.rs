use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_to_cart))
        .route("/remove", post(remove_from_cart))
        .route("/get", get(get_cart))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItemRequest {
    #[serde(rename = "itemId")]
    pub item_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub success: bool,
    #[serde(rename = "cartData")]
    #[schema(value_type = Object)]
    pub cart_data: Value,
}

async fn add_to_cart(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CartItemRequest>,
) -> Result<Response, ServiceError> {
    if payload.item_id.trim().is_empty() {
        return Err(ServiceError::BadRequest("Item ID is required".to_string()));
    }
    let cart = state
        .services
        .accounts
        .add_to_cart(auth.user_id, &payload.item_id)
        .await?;
    Ok(Json(CartResponse {
        success: true,
        cart_data: cart,
    })
    .into_response())
}

async fn remove_from_cart(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CartItemRequest>,
) -> Result<Response, ServiceError> {
    if payload.item_id.trim().is_empty() {
        return Err(ServiceError::BadRequest("Item ID is required".to_string()));
    }
    let cart = state
        .services
        .accounts
        .remove_from_cart(auth.user_id, &payload.item_id)
        .await?;
    Ok(Json(CartResponse {
        success: true,
        cart_data: cart,
    })
    .into_response())
}

async fn get_cart(auth: AuthUser, State(state): State<AppState>) -> Result<Response, ServiceError> {
    let cart = state.services.accounts.get_cart(auth.user_id).await?;
    Ok(Json(CartResponse {
        success: true,
        cart_data: cart,
    })
    .into_response())
}
