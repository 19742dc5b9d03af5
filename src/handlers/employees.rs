use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{message_response, success_response, validate_input};
use crate::services::employees::{CreateEmployeeInput, UpdateEmployeeInput};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_employee))
        .route("/update/{id}", put(update_employee))
        .route("/delete/{id}", delete(delete_employee))
        .route("/list", get(list_employees))
        .route("/branch/{branch_id}", get(employees_by_branch))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    #[serde(rename = "branchId")]
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEmployeeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    #[serde(rename = "branchId")]
    pub branch_id: Option<Uuid>,
}

async fn list_employees(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let employees = state.services.employees.list_employees().await?;
    Ok(success_response(employees))
}

async fn employees_by_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let employees = state
        .services
        .employees
        .employees_by_branch(branch_id)
        .await?;
    Ok(success_response(employees))
}

async fn add_employee(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateEmployeeRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    validate_input(&payload)?;

    let employee = state
        .services
        .employees
        .create_employee(CreateEmployeeInput {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            position: payload.position,
            branch_id: payload.branch_id,
        })
        .await?;
    Ok(success_response(employee))
}

async fn update_employee(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;

    let employee = state
        .services
        .employees
        .update_employee(
            id,
            UpdateEmployeeInput {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                position: payload.position,
                branch_id: payload.branch_id,
            },
        )
        .await?;
    Ok(success_response(employee))
}

async fn delete_employee(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    state.services.employees.delete_employee(id).await?;
    Ok(message_response("Employee deleted"))
}
