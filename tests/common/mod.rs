// Shared by every integration test binary; not all of them use every helper.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::{json, Value};
use storefront_api::{
    auth::{hash_password, AuthConfig, AuthService},
    config::AppConfig,
    db::{self, DbConfig},
    entities::{order, product, user, user::UserRole, Order},
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    services::email::Mailer,
    services::payments::{CheckoutClient, CreateSessionRequest, HostedSession},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration_test_secret_key_that_is_long_enough";
pub const TEST_PASSWORD: &str = "Password1!";

/// Checkout client double: records every session request and either returns
/// a canned hosted session or a processor-style failure.
#[derive(Default)]
pub struct MockCheckoutClient {
    pub requests: Mutex<Vec<CreateSessionRequest>>,
    pub fail_with: Option<String>,
}

#[async_trait]
impl CheckoutClient for MockCheckoutClient {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<HostedSession, ServiceError> {
        self.requests.lock().unwrap().push(request);
        if let Some(message) = &self.fail_with {
            return Err(ServiceError::ExternalServiceError(message.clone()));
        }
        Ok(HostedSession {
            id: "cs_test_session".to_string(),
            url: "https://checkout.example/session/cs_test_session".to_string(),
        })
    }
}

/// Mailer double that records outbound mail instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), html_body.to_string()));
        Ok(())
    }
}

/// Application harness backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    pub checkout_client: Arc<MockCheckoutClient>,
    pub mailer: Arc<RecordingMailer>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(MockCheckoutClient::default(), None).await
    }

    /// Harness whose processor rejects every session-creation call.
    pub async fn with_checkout_failure(message: &str) -> Self {
        Self::build(
            MockCheckoutClient {
                requests: Mutex::new(Vec::new()),
                fail_with: Some(message.to_string()),
            },
            None,
        )
        .await
    }

    /// Harness with the local payment gateway configured.
    pub async fn with_vnpay_secret(secret: &str) -> Self {
        Self::build(MockCheckoutClient::default(), Some(secret.to_string())).await
    }

    async fn build(checkout_client: MockCheckoutClient, vnpay_secret: Option<String>) -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:", TEST_JWT_SECRET, "127.0.0.1", 0, "test");
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.vnpay_hash_secret = vnpay_secret;
        let cfg = Arc::new(cfg);

        // Single connection keeps the in-memory database alive for the
        // lifetime of the harness.
        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
        })
        .await
        .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration_secs),
        )));

        let checkout_client = Arc::new(checkout_client);
        let mailer = Arc::new(RecordingMailer::default());

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            auth_service.clone(),
            mailer.clone(),
            checkout_client.clone(),
            cfg.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let auth_for_layer = auth_service.clone();
        let router = Router::new()
            .nest("/api", storefront_api::api_routes())
            .layer(axum::middleware::from_fn_with_state(
                auth_for_layer,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            auth_service,
            checkout_client,
            mailer,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Inserts a verified account and returns it with a bearer token.
    pub async fn seed_user(&self, email: &str, role: UserRole) -> (user::Model, String) {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Test User".to_string()),
            email: Set(email.to_string()),
            password_hash: Set(hash_password(TEST_PASSWORD).expect("hash test password")),
            role: Set(role),
            phone: Set(None),
            address: Set(None),
            date_of_birth: Set(None),
            image: Set(None),
            cart_data: Set(json!({})),
            saved_vouchers: Set(json!([])),
            email_verified: Set(true),
            verification_code: Set(None),
            verification_expires: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed user");

        let token = self
            .auth_service
            .generate_token(model.id, &model.email, model.role)
            .expect("mint test token")
            .token;

        (model, token)
    }

    /// Replaces an account's cart map directly in the store.
    pub async fn set_cart(&self, user_id: Uuid, cart: Value) {
        let user = storefront_api::entities::User::find_by_id(user_id)
            .one(&*self.state.db)
            .await
            .expect("load user")
            .expect("user exists");
        let mut active: user::ActiveModel = user.into();
        active.cart_data = Set(cart);
        active.update(&*self.state.db).await.expect("store cart");
    }

    pub async fn seed_product(&self, name: &str, price: Decimal) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            category: Set(None),
            image: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn user_by_email(&self, email: &str) -> Option<user::Model> {
        use sea_orm::{ColumnTrait, QueryFilter};
        storefront_api::entities::User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.state.db)
            .await
            .expect("load user by email")
    }

    pub async fn order_by_id(&self, order_id: Uuid) -> Option<order::Model> {
        Order::find_by_id(order_id)
            .one(&*self.state.db)
            .await
            .expect("load order")
    }

    pub async fn cart_of(&self, user_id: Uuid) -> Value {
        storefront_api::entities::User::find_by_id(user_id)
            .one(&*self.state.db)
            .await
            .expect("load user")
            .expect("user exists")
            .cart_data
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Reads a response body as JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
