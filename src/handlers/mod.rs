pub mod branches;
pub mod carts;
pub mod common;
pub mod employees;
pub mod orders;
pub mod payment_webhooks;
pub mod products;
pub mod users;
pub mod vouchers;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::email::Mailer;
use crate::services::payments::CheckoutClient;
use crate::services::{
    AccountService, BranchService, CheckoutService, EmployeeService, OrderService, ProductService,
    VoucherService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer backing the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
    pub catalog: Arc<ProductService>,
    pub vouchers: Arc<VoucherService>,
    pub branches: Arc<BranchService>,
    pub employees: Arc<EmployeeService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
        mailer: Arc<dyn Mailer>,
        checkout_client: Arc<dyn CheckoutClient>,
        config: Arc<AppConfig>,
    ) -> Self {
        let accounts = Arc::new(AccountService::new(
            db.clone(),
            event_sender.clone(),
            auth,
            mailer,
            config.client_url.clone(),
        ));
        let orders = Arc::new(OrderService::new(db.clone(), event_sender.clone()));
        let catalog = Arc::new(ProductService::new(db.clone(), event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(
            orders.clone(),
            accounts.clone(),
            catalog.clone(),
            checkout_client,
            event_sender.clone(),
            config,
        ));
        let vouchers = Arc::new(VoucherService::new(db.clone(), event_sender));
        let branches = Arc::new(BranchService::new(db.clone()));
        let employees = Arc::new(EmployeeService::new(db));

        Self {
            accounts,
            orders,
            checkout,
            catalog,
            vouchers,
            branches,
            employees,
        }
    }
}
