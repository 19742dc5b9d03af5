use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, PaymentStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Line item snapshot handed to [`OrderService::create_order`]. Prices are
/// already formatted for display by the checkout orchestrator.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: String,
    pub name: String,
    pub price: String,
    pub quantity: i32,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub items: Vec<NewOrderItem>,
    pub total_amount: String,
    pub shipping_address: Option<String>,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub note: Option<String>,
}

/// Persistence and lifecycle of order records. The checkout orchestrator
/// creates them; the confirmation receiver and the admin surface mutate
/// single fields afterwards.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Persists an order with its line-item snapshot in one transaction.
    #[instrument(skip(self, new_order), fields(user_id = %new_order.user_id, items = new_order.items.len()))]
    pub async fn create_order(&self, new_order: NewOrder) -> Result<order::Model, ServiceError> {
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(new_order.user_id),
            total_amount: Set(new_order.total_amount),
            shipping_address: Set(new_order.shipping_address),
            payment_method: Set(new_order.payment_method),
            payment_status: Set(new_order.payment_status),
            order_status: Set("processing".to_string()),
            note: Set(new_order.note),
            order_date: Set(now),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await?;

        for item in new_order.items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                name: Set(item.name),
                price: Set(item.price),
                quantity: Set(item.quantity),
                image: Set(item.image),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(order_id = %order_id, "Order created");
        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;

        Ok(order_model)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// All orders with their items, newest first (administrative listing).
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
    ) -> Result<Vec<(order::Model, Vec<order_item::Model>)>, ServiceError> {
        OrderEntity::find()
            .find_with_related(OrderItemEntity)
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Orders belonging to one account, newest first.
    #[instrument(skip(self))]
    pub async fn orders_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(order::Model, Vec<order_item::Model>)>, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .find_with_related(OrderItemEntity)
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Administrative update of the free-text order status. No transition
    /// graph is enforced: any label may follow any label.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: String,
    ) -> Result<order::Model, ServiceError> {
        let order = self
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let old_status = order.order_status.clone();

        let mut active: order::ActiveModel = order.into();
        active.order_status = Set(new_status.clone());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        info!(order_id = %order_id, %old_status, %new_status, "Order status updated");
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;

        Ok(updated)
    }

    /// Sets the payment status. Overwriting a terminal status is allowed as
    /// an explicit corrective update but logged.
    #[instrument(skip(self), fields(order_id = %order_id, status = %status))]
    pub async fn set_payment_status(
        &self,
        order_id: Uuid,
        status: PaymentStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = self
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if order.payment_status.is_terminal() && order.payment_status != status {
            warn!(
                order_id = %order_id,
                previous = %order.payment_status,
                "Overwriting terminal payment status"
            );
        }

        let mut active: order::ActiveModel = order.into();
        active.payment_status = Set(status);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        info!(order_id = %order_id, "Payment status updated");
        self.event_sender
            .send_or_log(Event::PaymentStatusChanged {
                order_id,
                status: status.to_string(),
            })
            .await;

        Ok(updated)
    }

    /// Removes an order and its items. No soft-delete.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let order = self
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let txn = self.db.begin().await?;
        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        order.delete(&txn).await?;
        txn.commit().await?;

        info!(order_id = %order_id, "Order deleted");
        self.event_sender
            .send_or_log(Event::OrderDeleted(order_id))
            .await;

        Ok(())
    }
}
