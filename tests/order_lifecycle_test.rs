//! End-to-end tests for payment confirmation and administrative order
//! management: verify endpoint, gateway callbacks, status update, delete.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;
use std::collections::BTreeMap;
use storefront_api::entities::order::PaymentStatus;
use storefront_api::entities::user::UserRole;
use storefront_api::services::payments::vnpay::{VnpayGateway, PARAM_SECURE_HASH};
use uuid::Uuid;

async fn place_cod_order(app: &TestApp, token: &str) -> Uuid {
    let response = app
        .request(
            Method::POST,
            "/api/order/place",
            Some(json!({
                "items": [{
                    "_id": Uuid::new_v4().to_string(),
                    "name": "Ca phe sua",
                    "price": 45000,
                    "quantity": 1
                }],
                "paymentMethod": "cash on delivery"
            })),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    Uuid::parse_str(body["orderId"].as_str().unwrap()).unwrap()
}

// ==================== Payment confirmation ====================

#[tokio::test]
async fn verify_success_marks_order_paid() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("verify-ok@test.com", UserRole::Customer).await;
    let order_id = place_cod_order(&app, &token).await;

    let response = app
        .request(
            Method::POST,
            "/api/order/verify",
            Some(json!({ "orderId": order_id.to_string(), "success": true })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("Payment successful"));

    let order = app.order_by_id(order_id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn verify_failure_marks_order_failed() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("verify-ko@test.com", UserRole::Customer).await;
    let order_id = place_cod_order(&app, &token).await;

    let response = app
        .request(
            Method::POST,
            "/api/order/verify",
            Some(json!({ "orderId": order_id.to_string(), "success": false })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Payment failed"));

    let order = app.order_by_id(order_id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);
}

#[tokio::test]
async fn verify_unknown_order_is_a_failure_without_side_effects() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/order/verify",
            Some(json!({ "orderId": Uuid::new_v4().to_string(), "success": true })),
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(false));

    // No order record was created by the failed confirmation
    let orders = app.state.services.orders.list_orders().await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn verify_requires_an_order_id() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/order/verify",
            Some(json!({ "orderId": "", "success": true })),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
}

// ==================== Gateway callbacks ====================

fn signed_callback_params(secret: &str, order_id: Uuid, response_code: &str) -> String {
    let mut params = BTreeMap::new();
    params.insert("vnp_TxnRef".to_string(), order_id.to_string());
    params.insert("vnp_ResponseCode".to_string(), response_code.to_string());
    params.insert("vnp_Amount".to_string(), "7500000".to_string());
    let signature = VnpayGateway::new(secret).sign(&params);
    params.insert(PARAM_SECURE_HASH.to_string(), signature);

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[tokio::test]
async fn ipn_confirms_payment_with_valid_signature() {
    let secret = "ipn-secret";
    let app = TestApp::with_vnpay_secret(secret).await;
    let (_, token) = app.seed_user("ipn@test.com", UserRole::Customer).await;
    let order_id = place_cod_order(&app, &token).await;

    let query = signed_callback_params(secret, order_id, "00");
    let response = app
        .request(
            Method::GET,
            &format!("/api/vnpay/vnpay_ipn?{query}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["RspCode"], json!("00"));

    let order = app.order_by_id(order_id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn ipn_rejects_invalid_signature() {
    let app = TestApp::with_vnpay_secret("real-secret").await;
    let (_, token) = app.seed_user("ipn-bad@test.com", UserRole::Customer).await;
    let order_id = place_cod_order(&app, &token).await;

    // Signed with the wrong secret
    let query = signed_callback_params("wrong-secret", order_id, "00");
    let response = app
        .request(
            Method::GET,
            &format!("/api/vnpay/vnpay_ipn?{query}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["RspCode"], json!("97"));

    // Payment status untouched
    let order = app.order_by_id(order_id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::PendingCashOnDelivery);
}

#[tokio::test]
async fn ipn_reports_unknown_orders() {
    let secret = "ipn-secret";
    let app = TestApp::with_vnpay_secret(secret).await;

    let query = signed_callback_params(secret, Uuid::new_v4(), "00");
    let response = app
        .request(
            Method::GET,
            &format!("/api/vnpay/vnpay_ipn?{query}"),
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["RspCode"], json!("01"));
}

#[tokio::test]
async fn gateway_return_records_failure_codes() {
    let secret = "return-secret";
    let app = TestApp::with_vnpay_secret(secret).await;
    let (_, token) = app.seed_user("return@test.com", UserRole::Customer).await;
    let order_id = place_cod_order(&app, &token).await;

    let query = signed_callback_params(secret, order_id, "24");
    let response = app
        .request(
            Method::GET,
            &format!("/api/vnpay/vnpay_return?{query}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(false));

    let order = app.order_by_id(order_id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);
}

// ==================== Administrative order management ====================

#[tokio::test]
async fn admin_status_update_rewrites_only_the_status_label() {
    let app = TestApp::new().await;
    let (_, customer_token) = app.seed_user("c1@test.com", UserRole::Customer).await;
    let (_, admin_token) = app.seed_user("admin1@test.com", UserRole::Admin).await;
    let order_id = place_cod_order(&app, &customer_token).await;

    let response = app
        .request(
            Method::POST,
            "/api/order/status",
            Some(json!({ "orderId": order_id.to_string(), "orderStatus": "shipped" })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let order = app.order_by_id(order_id).await.unwrap();
    assert_eq!(order.order_status, "shipped");
    assert_eq!(order.payment_status, PaymentStatus::PendingCashOnDelivery);
    assert_eq!(order.total_amount, "75.000 ₫");
}

#[tokio::test]
async fn admin_status_update_on_unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.seed_user("admin2@test.com", UserRole::Admin).await;

    let response = app
        .request(
            Method::POST,
            "/api/order/status",
            Some(json!({ "orderId": Uuid::new_v4().to_string(), "orderStatus": "shipped" })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 404);

    // And no record was created
    assert!(app.state.services.orders.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_status_update_requires_both_fields() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.seed_user("admin3@test.com", UserRole::Admin).await;

    let response = app
        .request(
            Method::POST,
            "/api/order/status",
            Some(json!({ "orderId": Uuid::new_v4().to_string(), "orderStatus": "" })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn delete_removes_the_order_from_the_listing() {
    let app = TestApp::new().await;
    let (_, customer_token) = app.seed_user("c2@test.com", UserRole::Customer).await;
    let (_, admin_token) = app.seed_user("admin4@test.com", UserRole::Admin).await;
    let order_id = place_cod_order(&app, &customer_token).await;

    let response = app
        .request(
            Method::POST,
            "/api/order/delete",
            Some(json!({ "orderId": order_id.to_string() })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let list = app
        .request(Method::GET, "/api/order/list", None, Some(&admin_token))
        .await;
    let body = response_json(list).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn delete_unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.seed_user("admin5@test.com", UserRole::Admin).await;

    let response = app
        .request(
            Method::POST,
            "/api/order/delete",
            Some(json!({ "orderId": Uuid::new_v4().to_string() })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn order_list_is_admin_only() {
    let app = TestApp::new().await;
    let (_, customer_token) = app.seed_user("c3@test.com", UserRole::Customer).await;

    let response = app
        .request(Method::GET, "/api/order/list", None, Some(&customer_token))
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn user_orders_are_shaped_for_the_storefront() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("mine@test.com", UserRole::Customer).await;
    let order_id = place_cod_order(&app, &token).await;

    let response = app
        .request(Method::GET, "/api/order/user", None, Some(&token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;

    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    let view = &orders[0];
    assert_eq!(view["orderId"], json!(order_id.to_string()));
    assert_eq!(view["status"], json!("processing"));
    assert_eq!(view["total"], json!("75.000 ₫"));
    // dd/mm/yyyy
    let date = view["orderDate"].as_str().unwrap();
    assert_eq!(date.len(), 10);
    assert_eq!(&date[2..3], "/");
    assert_eq!(&date[5..6], "/");

    let products = view["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], json!("Ca phe sua"));
    assert_eq!(products[0]["price"], json!("45.000 ₫"));
}
