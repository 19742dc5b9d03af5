use crate::{
    db::DbPool,
    entities::voucher::{self, Entity as VoucherEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateVoucherInput {
    pub code: String,
    pub description: Option<String>,
    pub discount_percent: i32,
    pub min_order_amount: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateVoucherInput {
    pub description: Option<String>,
    pub discount_percent: Option<i32>,
    pub min_order_amount: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct VoucherService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl VoucherService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list_vouchers(&self) -> Result<Vec<voucher::Model>, ServiceError> {
        VoucherEntity::find()
            .order_by_desc(voucher::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_voucher(
        &self,
        input: CreateVoucherInput,
    ) -> Result<voucher::Model, ServiceError> {
        if !(0..=100).contains(&input.discount_percent) {
            return Err(ServiceError::ValidationError(
                "Discount must be between 0 and 100 percent".to_string(),
            ));
        }

        let existing = VoucherEntity::find()
            .filter(voucher::Column::Code.eq(&input.code))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(
                "Voucher code already exists".to_string(),
            ));
        }

        let voucher_id = Uuid::new_v4();
        let model = voucher::ActiveModel {
            id: Set(voucher_id),
            code: Set(input.code),
            description: Set(input.description),
            discount_percent: Set(input.discount_percent),
            min_order_amount: Set(input.min_order_amount),
            expires_at: Set(input.expires_at),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(voucher_id = %voucher_id, "Voucher created");
        self.event_sender
            .send_or_log(Event::VoucherCreated(voucher_id))
            .await;
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update_voucher(
        &self,
        voucher_id: Uuid,
        input: UpdateVoucherInput,
    ) -> Result<voucher::Model, ServiceError> {
        let voucher = VoucherEntity::find_by_id(voucher_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Voucher not found".to_string()))?;

        let mut active: voucher::ActiveModel = voucher.into();
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(discount_percent) = input.discount_percent {
            if !(0..=100).contains(&discount_percent) {
                return Err(ServiceError::ValidationError(
                    "Discount must be between 0 and 100 percent".to_string(),
                ));
            }
            active.discount_percent = Set(discount_percent);
        }
        if let Some(min_order_amount) = input.min_order_amount {
            active.min_order_amount = Set(Some(min_order_amount));
        }
        if let Some(expires_at) = input.expires_at {
            active.expires_at = Set(Some(expires_at));
        }

        active.update(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn delete_voucher(&self, voucher_id: Uuid) -> Result<(), ServiceError> {
        let result = VoucherEntity::delete_by_id(voucher_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Voucher not found".to_string()));
        }
        self.event_sender
            .send_or_log(Event::VoucherDeleted(voucher_id))
            .await;
        Ok(())
    }
}
