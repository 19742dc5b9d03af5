pub mod accounts;
pub mod branches;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod employees;
pub mod orders;
pub mod payments;
pub mod vouchers;

pub use accounts::AccountService;
pub use branches::BranchService;
pub use catalog::ProductService;
pub use checkout::CheckoutService;
pub use employees::EmployeeService;
pub use orders::OrderService;
pub use vouchers::VoucherService;
