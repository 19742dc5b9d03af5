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
use crate::services::branches::{CreateBranchInput, UpdateBranchInput};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_branches))
        .route("/add", post(add_branch))
        .route("/update/{id}", put(update_branch))
        .route("/delete/{id}", delete(delete_branch))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "managerId")]
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBranchRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "managerId")]
    pub manager_id: Option<Uuid>,
}

async fn list_branches(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let branches = state.services.branches.list_branches().await?;
    Ok(success_response(branches))
}

async fn add_branch(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBranchRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    validate_input(&payload)?;

    let branch = state
        .services
        .branches
        .create_branch(CreateBranchInput {
            name: payload.name,
            address: payload.address,
            phone: payload.phone,
            manager_id: payload.manager_id,
        })
        .await?;
    Ok(success_response(branch))
}

async fn update_branch(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBranchRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;

    let branch = state
        .services
        .branches
        .update_branch(
            id,
            UpdateBranchInput {
                name: payload.name,
                address: payload.address,
                phone: payload.phone,
                manager_id: payload.manager_id,
            },
        )
        .await?;
    Ok(success_response(branch))
}

async fn delete_branch(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    state.services.branches.delete_branch(id).await?;
    Ok(message_response("Branch deleted"))
}
