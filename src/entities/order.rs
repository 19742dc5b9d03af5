use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;

/// One checkout transaction.
///
/// `total_amount` and the per-item prices are display strings captured at
/// checkout time; they are never recomputed from the live catalog, so later
/// price or name drift does not rewrite order history.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: String,
    #[sea_orm(nullable)]
    pub shipping_address: Option<String>,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    /// Free-text workflow label; any value may follow any value. Mutated
    /// only through the administrative status update.
    pub order_status: String,
    #[sea_orm(nullable)]
    pub note: Option<String>,
    pub order_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payment lifecycle of an order. Once `Paid` or `Failed` the status is not
/// expected to change outside an explicit corrective update.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting physical payment on delivery
    #[sea_orm(string_value = "pending_cod")]
    PendingCashOnDelivery,
    /// Awaiting completion of a bank/card payment
    #[sea_orm(string_value = "pending_bank")]
    PendingBank,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_paid_and_failed() {
        assert!(PaymentStatus::Paid.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::PendingCashOnDelivery.is_terminal());
        assert!(!PaymentStatus::PendingBank.is_terminal());
    }

    #[test]
    fn payment_status_serializes_as_snake_case() {
        let value = serde_json::to_string(&PaymentStatus::PendingCashOnDelivery).unwrap();
        assert_eq!(value, "\"pending_cash_on_delivery\"");
        assert_eq!(PaymentStatus::Paid.to_string(), "paid");
    }
}
