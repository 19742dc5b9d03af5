use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::user::UserRole;
use crate::errors::ServiceError;
use crate::handlers::common::{message_response, success_response, validate_input};
use crate::services::accounts::{RegisterInput, UpdateProfileInput, UserSummary};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/confirm/{code}", get(confirm_email))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/change-password", post(change_password))
        .route("/me", get(current_user))
        .route("/list", get(list_users))
        .route("/remove", post(remove_user))
        .route("/update/{id}", put(update_user))
        .route("/role/{id}", put(update_role))
        .route("/vouchers", get(saved_vouchers))
        .route("/vouchers/save", post(save_voucher))
        .route("/vouchers/remove", post(remove_saved_voucher))
        .route("/{id}", get(get_user))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email is not valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: UserSummary,
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[serde(rename = "verificationCode")]
    pub verification_code: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    #[serde(rename = "oldPassword")]
    pub old_password: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "dateOfBirth")]
    pub date_of_birth: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveUserRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VoucherRefRequest {
    #[serde(rename = "voucherId")]
    pub voucher_id: Uuid,
}

// Handlers

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;

    state
        .services
        .accounts
        .register(RegisterInput {
            name: payload.name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(message_response(
        "Registration successful! Check your email to activate your account.",
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let result = state
        .services
        .accounts
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        token: result.token.token,
        user: result.user,
        message: "Login successful".to_string(),
    }))
}

async fn confirm_email(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, ServiceError> {
    state.services.accounts.confirm_email(&code).await?;
    Ok(message_response("Your account has been confirmed"))
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;
    state.services.accounts.forgot_password(&payload.email).await?;
    Ok(message_response(
        "A verification code has been sent to your email",
    ))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;
    state
        .services
        .accounts
        .reset_password(
            &payload.email,
            &payload.verification_code,
            &payload.new_password,
        )
        .await?;
    Ok(message_response("Your password has been updated"))
}

async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response, ServiceError> {
    let (old_password, new_password) = match (&payload.old_password, &payload.new_password) {
        (Some(old), Some(new)) if !old.is_empty() && !new.is_empty() => (old, new),
        _ => {
            return Err(ServiceError::BadRequest(
                "Old and new passwords are required".to_string(),
            ))
        }
    };

    state
        .services
        .accounts
        .change_password(auth.user_id, old_password, new_password)
        .await?;
    Ok(message_response("Password changed successfully"))
}

async fn current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    let user = state.services.accounts.get_user(auth.user_id).await?;
    Ok(success_response(user))
}

async fn get_user(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let user = state.services.accounts.get_user(id).await?;
    Ok(success_response(user))
}

async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    let users = state.services.accounts.list_users().await?;
    Ok(success_response(users))
}

async fn remove_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RemoveUserRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    state.services.accounts.remove_user(payload.id).await?;
    Ok(message_response("User removed"))
}

async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Response, ServiceError> {
    // Accounts may edit themselves; everything else needs the admin role.
    if auth.user_id != id {
        auth.require_admin()?;
    }

    let user = state
        .services
        .accounts
        .update_profile(
            id,
            UpdateProfileInput {
                name: payload.name,
                phone: payload.phone,
                address: payload.address,
                date_of_birth: payload.date_of_birth,
                image: payload.image,
            },
        )
        .await?;
    Ok(success_response(user))
}

async fn update_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;

    let role = UserRole::parse(&payload.role)
        .ok_or_else(|| ServiceError::BadRequest(format!("Unknown role: {}", payload.role)))?;
    let user = state.services.accounts.update_role(id, role).await?;
    Ok(success_response(user))
}

async fn save_voucher(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<VoucherRefRequest>,
) -> Result<Response, ServiceError> {
    state
        .services
        .accounts
        .save_voucher(auth.user_id, payload.voucher_id)
        .await?;
    Ok(message_response("Voucher saved"))
}

async fn remove_saved_voucher(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<VoucherRefRequest>,
) -> Result<Response, ServiceError> {
    state
        .services
        .accounts
        .remove_saved_voucher(auth.user_id, payload.voucher_id)
        .await?;
    Ok(message_response("Voucher removed from saved list"))
}

async fn saved_vouchers(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    let vouchers = state.services.accounts.saved_vouchers(auth.user_id).await?;
    Ok(success_response(vouchers))
}
