use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{message_response, success_response, validate_input};
use crate::services::catalog::{CreateProductInput, UpdateProductInput};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_products))
        .route("/add", post(add_product))
        .route("/update/{id}", put(update_product))
        .route("/remove", post(remove_product))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveProductRequest {
    pub id: Uuid,
}

async fn list_products(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let products = state.services.catalog.list_products().await?;
    Ok(success_response(products))
}

async fn add_product(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .create_product(CreateProductInput {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            category: payload.category,
            image: payload.image,
        })
        .await?;
    Ok(success_response(product))
}

async fn update_product(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;

    let product = state
        .services
        .catalog
        .update_product(
            id,
            UpdateProductInput {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                category: payload.category,
                image: payload.image,
            },
        )
        .await?;
    Ok(success_response(product))
}

async fn remove_product(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RemoveProductRequest>,
) -> Result<Response, ServiceError> {
    auth.require_admin()?;
    state.services.catalog.delete_product(payload.id).await?;
    Ok(message_response("Product removed"))
}
