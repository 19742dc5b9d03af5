pub mod branch;
pub mod employee;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;
pub mod voucher;

pub use branch::Entity as Branch;
pub use employee::Entity as Employee;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use user::Entity as User;
pub use voucher::Entity as Voucher;
