use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::{order, order_item};
use crate::errors::ServiceError;
use crate::handlers::common::{message_response, success_response, validate_input};
use crate::services::checkout::{CartLine, CheckoutOutcome, PlaceOrderInput};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/place", post(place_order))
        .route("/verify", post(verify_order))
        .route("/user", get(user_orders))
        .route("/list", get(list_orders))
        .route("/status", post(update_status))
        .route("/delete", post(delete_order))
}

// Request/response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<PlaceOrderItem>,
    /// Client-computed display total; ignored, the server recomputes.
    #[serde(default, rename = "totalAmount")]
    #[schema(value_type = Object)]
    pub total_amount: Option<Value>,
    #[serde(rename = "shippingAddress")]
    pub shipping_address: Option<String>,
    #[serde(rename = "paymentMethod")]
    pub payment_method: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PlaceOrderItem {
    /// Product reference; accepts the storefront's `_id` alias.
    #[serde(rename = "productId", alias = "_id")]
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "orderId", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyOrderRequest {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    pub success: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyOrderResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserOrderView {
    #[serde(rename = "orderId")]
    pub order_id: Uuid,
    /// Localized order date (dd/mm/yyyy)
    #[serde(rename = "orderDate")]
    pub order_date: String,
    pub products: Vec<order_item::Model>,
    pub total: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct AdminOrderView {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    #[serde(rename = "orderStatus")]
    pub order_status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteOrderRequest {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

fn parse_order_id(raw: Option<&str>) -> Result<Uuid, ServiceError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::BadRequest("Order ID is required".to_string()))?;
    Uuid::parse_str(raw).map_err(|_| ServiceError::BadRequest("Invalid order id".to_string()))
}

// Handlers

/// Checkout: creates the order, clears the cart, and either finalizes
/// immediately (cash on delivery) or returns a hosted-checkout URL.
#[utoipa::path(
    post,
    path = "/api/order/place",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = PlaceOrderResponse),
        (status = 400, description = "Invalid order payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing caller identity", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment processor rejected the session", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn place_order(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let input = PlaceOrderInput {
        items: payload
            .items
            .into_iter()
            .map(|item| CartLine {
                product_id: item.product_id,
                name: item.name,
                price: item.price,
                quantity: item.quantity,
                image: item.image,
            })
            .collect(),
        shipping_address: payload.shipping_address,
        payment_method: payload.payment_method,
        note: payload.note,
    };

    let outcome = state
        .services
        .checkout
        .place_order(auth.user_id, input)
        .await?;

    let response = match outcome {
        CheckoutOutcome::CashOnDelivery { order_id } => PlaceOrderResponse {
            success: true,
            message: "Order placed with cash on delivery".to_string(),
            order_id: Some(order_id),
            session_url: None,
        },
        CheckoutOutcome::HostedCheckout {
            order_id,
            session_url,
        } => PlaceOrderResponse {
            success: true,
            message: "Hosted checkout session created".to_string(),
            order_id: Some(order_id),
            session_url: Some(session_url),
        },
    };

    Ok(Json(response))
}

/// Client-redirect payment confirmation. The boolean comes from the
/// browser after returning from the hosted page, so it is informational
/// rather than authoritative; the gateway IPN is the verified path.
#[utoipa::path(
    post,
    path = "/api/order/verify",
    request_body = VerifyOrderRequest,
    responses(
        (status = 200, description = "Payment status recorded", body = VerifyOrderResponse),
        (status = 400, description = "Missing or invalid order id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn verify_order(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = parse_order_id(payload.order_id.as_deref())?;

    state
        .services
        .checkout
        .confirm_payment(order_id, payload.success)
        .await?;

    let response = if payload.success {
        VerifyOrderResponse {
            success: true,
            message: "Payment successful".to_string(),
        }
    } else {
        VerifyOrderResponse {
            success: false,
            message: "Payment failed".to_string(),
        }
    };

    Ok(Json(response))
}

/// Orders of the authenticated account, shaped for the storefront.
pub async fn user_orders(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    let orders = state.services.orders.orders_for_user(auth.user_id).await?;

    let views: Vec<UserOrderView> = orders
        .into_iter()
        .map(|(order, items)| UserOrderView {
            order_id: order.id,
            order_date: order.order_date.format("%d/%m/%Y").to_string(),
            products: items,
            total: order.total_amount,
            status: order.order_status.to_lowercase(),
        })
        .collect();

    Ok(success_response(views))
}

/// Administrative listing of every order.
pub async fn list_orders(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;

    let orders = state.services.orders.list_orders().await?;
    let views: Vec<AdminOrderView> = orders
        .into_iter()
        .map(|(order, items)| AdminOrderView { order, items })
        .collect();

    Ok(success_response(views))
}

/// Administrative update of the order-status field only.
pub async fn update_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;

    let new_status = payload
        .order_status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ServiceError::BadRequest("Order ID and status are required".to_string())
        })?;
    let order_id = parse_order_id(payload.order_id.as_deref())?;

    let updated = state
        .services
        .orders
        .update_order_status(order_id, new_status.to_string())
        .await?;

    Ok(success_response(updated))
}

/// Administrative delete by identifier.
pub async fn delete_order(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DeleteOrderRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;

    let order_id = parse_order_id(payload.order_id.as_deref())?;
    state.services.orders.delete_order(order_id).await?;

    Ok(message_response("Order deleted successfully"))
}
