//! OpenAPI document and Swagger UI for the order/payment surface.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ErrorResponse;
use crate::handlers::orders::{
    PlaceOrderItem, PlaceOrderRequest, PlaceOrderResponse, VerifyOrderRequest, VerifyOrderResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        description = "Checkout, payment confirmation and order administration"
    ),
    paths(
        crate::handlers::orders::place_order,
        crate::handlers::orders::verify_order,
    ),
    components(schemas(
        ErrorResponse,
        PlaceOrderRequest,
        PlaceOrderItem,
        PlaceOrderResponse,
        VerifyOrderRequest,
        VerifyOrderResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Orders", description = "Checkout and order lifecycle")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI mounted at `/docs`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
