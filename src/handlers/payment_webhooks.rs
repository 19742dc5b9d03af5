use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::order::PaymentStatus;
use crate::errors::ServiceError;
use crate::services::payments::vnpay::{
    VnpayGateway, PARAM_RESPONSE_CODE, PARAM_TXN_REF, RESPONSE_CODE_SUCCESS,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vnpay_return", get(vnpay_return))
        .route("/vnpay_ipn", get(vnpay_ipn))
}

fn gateway(state: &AppState) -> Option<VnpayGateway> {
    state
        .config
        .vnpay_hash_secret
        .as_deref()
        .map(VnpayGateway::new)
}

fn callback_outcome(params: &BTreeMap<String, String>) -> Option<(Uuid, PaymentStatus)> {
    let order_id = params
        .get(PARAM_TXN_REF)
        .and_then(|raw| Uuid::parse_str(raw).ok())?;
    let status = match params.get(PARAM_RESPONSE_CODE).map(String::as_str) {
        Some(RESPONSE_CODE_SUCCESS) => PaymentStatus::Paid,
        _ => PaymentStatus::Failed,
    };
    Some((order_id, status))
}

/// Client-redirect leg of the gateway flow. Signature-checked like the IPN,
/// but only informational for the storefront.
async fn vnpay_return(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response, ServiceError> {
    let gateway = gateway(&state).ok_or_else(|| {
        ServiceError::InvalidOperation("Payment gateway is not configured".to_string())
    })?;

    if !gateway.verify_signature(&params) {
        warn!("Gateway return with invalid signature");
        return Err(ServiceError::BadRequest(
            "Invalid gateway signature".to_string(),
        ));
    }

    let (order_id, status) = callback_outcome(&params)
        .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

    state
        .services
        .orders
        .set_payment_status(order_id, status)
        .await?;

    let (success, message) = match status {
        PaymentStatus::Paid => (true, "Payment successful"),
        _ => (false, "Payment failed"),
    };
    Ok(Json(json!({ "success": success, "message": message })).into_response())
}

/// Server-to-server confirmation (IPN): the trustworthy path. Responds in
/// the gateway's `{RspCode, Message}` convention and always with HTTP 200,
/// so the gateway does not retry on application-level failures.
async fn vnpay_ipn(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<serde_json::Value> {
    let Some(gateway) = gateway(&state) else {
        return Json(json!({ "RspCode": "99", "Message": "Gateway not configured" }));
    };

    if !gateway.verify_signature(&params) {
        warn!("Gateway IPN with invalid signature");
        return Json(json!({ "RspCode": "97", "Message": "Invalid signature" }));
    }

    let Some((order_id, status)) = callback_outcome(&params) else {
        return Json(json!({ "RspCode": "01", "Message": "Order not found" }));
    };

    match state
        .services
        .orders
        .set_payment_status(order_id, status)
        .await
    {
        Ok(_) => {
            info!(order_id = %order_id, status = %status, "Gateway IPN processed");
            Json(json!({ "RspCode": "00", "Message": "Confirm Success" }))
        }
        Err(ServiceError::NotFound(_)) => {
            Json(json!({ "RspCode": "01", "Message": "Order not found" }))
        }
        Err(e) => {
            warn!("Gateway IPN failed: {e}");
            Json(json!({ "RspCode": "99", "Message": "Unknown error" }))
        }
    }
}
