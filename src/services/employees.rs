use crate::{
    db::DbPool,
    entities::employee::{self, Entity as EmployeeEntity},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateEmployeeInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateEmployeeInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub branch_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct EmployeeService {
    db: Arc<DbPool>,
}

impl EmployeeService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_employees(&self) -> Result<Vec<employee::Model>, ServiceError> {
        EmployeeEntity::find()
            .order_by_asc(employee::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn employees_by_branch(
        &self,
        branch_id: Uuid,
    ) -> Result<Vec<employee::Model>, ServiceError> {
        EmployeeEntity::find()
            .filter(employee::Column::BranchId.eq(branch_id))
            .order_by_asc(employee::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_employee(
        &self,
        input: CreateEmployeeInput,
    ) -> Result<employee::Model, ServiceError> {
        let now = Utc::now();
        employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            position: Set(input.position),
            branch_id: Set(input.branch_id),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.db)
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self, input))]
    pub async fn update_employee(
        &self,
        employee_id: Uuid,
        input: UpdateEmployeeInput,
    ) -> Result<employee::Model, ServiceError> {
        let employee = EmployeeEntity::find_by_id(employee_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Employee not found".to_string()))?;

        let mut active: employee::ActiveModel = employee.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = input.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(position) = input.position {
            active.position = Set(Some(position));
        }
        if let Some(branch_id) = input.branch_id {
            active.branch_id = Set(Some(branch_id));
        }
        active.updated_at = Set(Some(Utc::now()));

        active.update(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn delete_employee(&self, employee_id: Uuid) -> Result<(), ServiceError> {
        let result = EmployeeEntity::delete_by_id(employee_id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Employee not found".to_string()));
        }
        Ok(())
    }
}
