use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{message_response, success_response, validate_input};
use crate::services::vouchers::{CreateVoucherInput, UpdateVoucherInput};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_vouchers))
        .route("/add", post(add_voucher))
        .route("/update/{id}", put(update_voucher))
        .route("/delete/{id}", delete(delete_voucher))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVoucherRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    pub description: Option<String>,
    #[serde(rename = "discountPercent")]
    pub discount_percent: i32,
    #[serde(rename = "minOrderAmount")]
    pub min_order_amount: Option<Decimal>,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateVoucherRequest {
    pub description: Option<String>,
    #[serde(rename = "discountPercent")]
    pub discount_percent: Option<i32>,
    #[serde(rename = "minOrderAmount")]
    pub min_order_amount: Option<Decimal>,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

async fn list_vouchers(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let vouchers = state.services.vouchers.list_vouchers().await?;
    Ok(success_response(vouchers))
}

async fn add_voucher(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateVoucherRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    validate_input(&payload)?;

    let voucher = state
        .services
        .vouchers
        .create_voucher(CreateVoucherInput {
            code: payload.code,
            description: payload.description,
            discount_percent: payload.discount_percent,
            min_order_amount: payload.min_order_amount,
            expires_at: payload.expires_at,
        })
        .await?;
    Ok(success_response(voucher))
}

async fn update_voucher(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVoucherRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;

    let voucher = state
        .services
        .vouchers
        .update_voucher(
            id,
            UpdateVoucherInput {
                description: payload.description,
                discount_percent: payload.discount_percent,
                min_order_amount: payload.min_order_amount,
                expires_at: payload.expires_at,
            },
        )
        .await?;
    Ok(success_response(voucher))
}

async fn delete_voucher(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    state.services.vouchers.delete_voucher(id).await?;
    Ok(message_response("Voucher deleted"))
}
