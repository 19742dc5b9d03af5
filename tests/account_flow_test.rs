//! Integration tests for account flows (registration, verification, login,
//! cart, saved vouchers) and the remaining CRUD surfaces.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;
use storefront_api::entities::user::UserRole;
use uuid::Uuid;

// ==================== Registration & login ====================

#[tokio::test]
async fn registration_verification_and_login_round_trip() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/user/register",
            Some(json!({
                "name": "Linh",
                "email": "linh@test.com",
                "password": "Sup3r!secret"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    // A confirmation mail went out
    assert_eq!(app.mailer.sent.lock().unwrap().len(), 1);

    // Unverified accounts cannot log in
    let login = app
        .request(
            Method::POST,
            "/api/user/login",
            Some(json!({ "email": "linh@test.com", "password": "Sup3r!secret" })),
            None,
        )
        .await;
    assert_eq!(login.status(), 401);

    // Confirm with the stored code
    let user = app.user_by_email("linh@test.com").await.unwrap();
    assert!(!user.email_verified);
    let code = user.verification_code.clone().unwrap();

    let confirm = app
        .request(Method::GET, &format!("/api/user/confirm/{code}"), None, None)
        .await;
    assert_eq!(confirm.status(), 200);

    // Now login succeeds and returns a usable token
    let login = app
        .request(
            Method::POST,
            "/api/user/login",
            Some(json!({ "email": "linh@test.com", "password": "Sup3r!secret" })),
            None,
        )
        .await;
    assert_eq!(login.status(), 200);
    let body = response_json(login).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["role"], json!("customer"));

    let token = body["token"].as_str().unwrap().to_string();
    let me = app
        .request(Method::GET, "/api/user/me", None, Some(&token))
        .await;
    assert_eq!(me.status(), 200);
    let me = response_json(me).await;
    assert_eq!(me["data"]["email"], json!("linh@test.com"));
    // Credential material never leaves the API
    assert!(me["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn weak_passwords_and_duplicate_emails_are_rejected() {
    let app = TestApp::new().await;
    app.seed_user("taken@test.com", UserRole::Customer).await;

    let weak = app
        .request(
            Method::POST,
            "/api/user/register",
            Some(json!({ "name": "A", "email": "new@test.com", "password": "weakpass" })),
            None,
        )
        .await;
    assert_eq!(weak.status(), 400);

    let duplicate = app
        .request(
            Method::POST,
            "/api/user/register",
            Some(json!({ "name": "B", "email": "taken@test.com", "password": "Sup3r!secret" })),
            None,
        )
        .await;
    assert_eq!(duplicate.status(), 400);
    let body = response_json(duplicate).await;
    assert!(body["message"].as_str().unwrap().contains("already registered"));
}

#[tokio::test]
async fn password_reset_with_emailed_code() {
    let app = TestApp::new().await;
    let (user, _) = app.seed_user("reset@test.com", UserRole::Customer).await;

    let response = app
        .request(
            Method::POST,
            "/api/user/forgot-password",
            Some(json!({ "email": "reset@test.com" })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let code = app
        .user_by_email("reset@test.com")
        .await
        .unwrap()
        .verification_code
        .unwrap();

    let reset = app
        .request(
            Method::POST,
            "/api/user/reset-password",
            Some(json!({
                "email": "reset@test.com",
                "verificationCode": code,
                "newPassword": "N3w!password"
            })),
            None,
        )
        .await;
    assert_eq!(reset.status(), 200);

    // Old password no longer works, new one does
    let old_login = app
        .request(
            Method::POST,
            "/api/user/login",
            Some(json!({ "email": "reset@test.com", "password": common::TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(old_login.status(), 401);

    let new_login = app
        .request(
            Method::POST,
            "/api/user/login",
            Some(json!({ "email": "reset@test.com", "password": "N3w!password" })),
            None,
        )
        .await;
    assert_eq!(new_login.status(), 200);
    let body = response_json(new_login).await;
    assert_eq!(body["user"]["id"], json!(user.id.to_string()));
}

#[tokio::test]
async fn manager_login_resolves_branch_id() {
    let app = TestApp::new().await;
    let (manager, _) = app.seed_user("manager@test.com", UserRole::Manager).await;
    let (_, admin_token) = app.seed_user("admin@test.com", UserRole::Admin).await;

    let created = app
        .request(
            Method::POST,
            "/api/branch/add",
            Some(json!({
                "name": "District 1",
                "address": "1 Le Loi",
                "managerId": manager.id.to_string()
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(created.status(), 200);
    let branch = response_json(created).await;

    let login = app
        .request(
            Method::POST,
            "/api/user/login",
            Some(json!({ "email": "manager@test.com", "password": common::TEST_PASSWORD })),
            None,
        )
        .await;
    let body = response_json(login).await;
    assert_eq!(body["user"]["branch_id"], branch["data"]["id"]);
}

// ==================== Cart ====================

#[tokio::test]
async fn cart_add_remove_get_round_trip() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart@test.com", UserRole::Customer).await;

    for _ in 0..2 {
        let add = app
            .request(
                Method::POST,
                "/api/cart/add",
                Some(json!({ "itemId": "prod-1" })),
                Some(&token),
            )
            .await;
        assert_eq!(add.status(), 200);
    }

    let get = app
        .request(Method::GET, "/api/cart/get", None, Some(&token))
        .await;
    let body = response_json(get).await;
    assert_eq!(body["cartData"]["prod-1"], json!(2));

    let remove = app
        .request(
            Method::POST,
            "/api/cart/remove",
            Some(json!({ "itemId": "prod-1" })),
            Some(&token),
        )
        .await;
    let body = response_json(remove).await;
    assert_eq!(body["cartData"]["prod-1"], json!(1));

    // Removing the last unit drops the key entirely
    let remove = app
        .request(
            Method::POST,
            "/api/cart/remove",
            Some(json!({ "itemId": "prod-1" })),
            Some(&token),
        )
        .await;
    let body = response_json(remove).await;
    assert!(body["cartData"].get("prod-1").is_none());
}

// ==================== Saved vouchers ====================

#[tokio::test]
async fn saved_vouchers_reject_duplicates_and_resolve_records() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("vouch@test.com", UserRole::Customer).await;
    let (_, admin_token) = app.seed_user("vadmin@test.com", UserRole::Admin).await;

    let created = app
        .request(
            Method::POST,
            "/api/vouchers/add",
            Some(json!({ "code": "SUMMER10", "discountPercent": 10 })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(created.status(), 200);
    let voucher = response_json(created).await;
    let voucher_id = voucher["data"]["id"].as_str().unwrap().to_string();

    let save = app
        .request(
            Method::POST,
            "/api/user/vouchers/save",
            Some(json!({ "voucherId": voucher_id })),
            Some(&token),
        )
        .await;
    assert_eq!(save.status(), 200);

    // Saving twice is refused
    let again = app
        .request(
            Method::POST,
            "/api/user/vouchers/save",
            Some(json!({ "voucherId": voucher_id })),
            Some(&token),
        )
        .await;
    assert_eq!(again.status(), 400);

    let list = app
        .request(Method::GET, "/api/user/vouchers", None, Some(&token))
        .await;
    let body = response_json(list).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["code"], json!("SUMMER10"));

    let remove = app
        .request(
            Method::POST,
            "/api/user/vouchers/remove",
            Some(json!({ "voucherId": voucher_id })),
            Some(&token),
        )
        .await;
    assert_eq!(remove.status(), 200);

    let list = app
        .request(Method::GET, "/api/user/vouchers", None, Some(&token))
        .await;
    let body = response_json(list).await;
    assert_eq!(body["data"], json!([]));
}

// ==================== Remaining CRUD surfaces ====================

#[tokio::test]
async fn product_crud_round_trip() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.seed_user("padmin@test.com", UserRole::Admin).await;

    let created = app
        .request(
            Method::POST,
            "/api/product/add",
            Some(json!({ "name": "Banh mi", "price": 25000, "category": "food" })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(created.status(), 200);
    let product = response_json(created).await;
    let product_id = product["data"]["id"].as_str().unwrap().to_string();

    let updated = app
        .request(
            Method::PUT,
            &format!("/api/product/update/{product_id}"),
            Some(json!({ "price": 27000 })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(updated.status(), 200);

    let list = app.request(Method::GET, "/api/product/list", None, None).await;
    let body = response_json(list).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let removed = app
        .request(
            Method::POST,
            "/api/product/remove",
            Some(json!({ "id": product_id })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(removed.status(), 200);

    let list = app.request(Method::GET, "/api/product/list", None, None).await;
    let body = response_json(list).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn product_mutations_require_admin_role() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("plain@test.com", UserRole::Customer).await;

    let response = app
        .request(
            Method::POST,
            "/api/product/add",
            Some(json!({ "name": "Nope", "price": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn employee_crud_and_branch_filter() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.seed_user("eadmin@test.com", UserRole::Admin).await;

    let branch = app
        .request(
            Method::POST,
            "/api/branch/add",
            Some(json!({ "name": "District 3" })),
            Some(&admin_token),
        )
        .await;
    let branch_id = response_json(branch).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let created = app
        .request(
            Method::POST,
            "/api/employee/add",
            Some(json!({
                "name": "Tuan",
                "position": "barista",
                "branchId": branch_id
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(created.status(), 200);
    let employee_id = response_json(created).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let by_branch = app
        .request(
            Method::GET,
            &format!("/api/employee/branch/{branch_id}"),
            None,
            None,
        )
        .await;
    let body = response_json(by_branch).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let other = app
        .request(
            Method::GET,
            &format!("/api/employee/branch/{}", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    let body = response_json(other).await;
    assert_eq!(body["data"], json!([]));

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/employee/delete/{employee_id}"),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(deleted.status(), 200);

    let deleted_again = app
        .request(
            Method::DELETE,
            &format!("/api/employee/delete/{employee_id}"),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(deleted_again.status(), 404);
}
