use crate::{
    db::DbPool,
    entities::branch::{self, Entity as BranchEntity},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateBranchInput {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBranchInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub manager_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct BranchService {
    db: Arc<DbPool>,
}

impl BranchService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_branches(&self) -> Result<Vec<branch::Model>, ServiceError> {
        BranchEntity::find()
            .order_by_asc(branch::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_branch(
        &self,
        input: CreateBranchInput,
    ) -> Result<branch::Model, ServiceError> {
        let now = Utc::now();
        branch::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            address: Set(input.address),
            phone: Set(input.phone),
            manager_id: Set(input.manager_id),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.db)
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self, input))]
    pub async fn update_branch(
        &self,
        branch_id: Uuid,
        input: UpdateBranchInput,
    ) -> Result<branch::Model, ServiceError> {
        let branch = BranchEntity::find_by_id(branch_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Branch not found".to_string()))?;

        let mut active: branch::ActiveModel = branch.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(manager_id) = input.manager_id {
            active.manager_id = Set(Some(manager_id));
        }
        active.updated_at = Set(Some(Utc::now()));

        active.update(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn delete_branch(&self, branch_id: Uuid) -> Result<(), ServiceError> {
        let result = BranchEntity::delete_by_id(branch_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Branch not found".to_string()));
        }
        Ok(())
    }
}
