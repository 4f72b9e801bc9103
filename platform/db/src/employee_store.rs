use async_trait::async_trait;
use entity::employees;
use products_hr::{Employee, EmployeeId, EmployeeStore, EmployeeStoreError};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, Statement, TransactionTrait,
};
use tracing::debug;

use crate::DbPool;

const RESYNC_ID_SEQUENCE: &str = "SELECT setval(pg_get_serial_sequence('employees', 'id'), \
     (SELECT MAX(id) FROM employees))";

/// Employee store backed by the `employees` table.
///
/// The table carries a unique index on `email`; violations come back as
/// [`EmployeeStoreError::Conflict`].
#[derive(Clone, Debug)]
pub struct SeaOrmEmployeeStore {
    pool: DbPool,
}

impl SeaOrmEmployeeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_new(&self, employee: Employee) -> Result<employees::Model, DbErr> {
        active_model(employee, ActiveValue::NotSet)
            .insert(&self.pool)
            .await
    }

    async fn replace(&self, id: EmployeeId, employee: Employee) -> Result<employees::Model, DbErr> {
        match active_model(employee.clone(), Set(id)).update(&self.pool).await {
            Err(DbErr::RecordNotUpdated) => self.insert_at(id, employee).await,
            other => other,
        }
    }

    // An explicit id bypasses the serial sequence, so bump it past the new row.
    async fn insert_at(&self, id: EmployeeId, employee: Employee) -> Result<employees::Model, DbErr> {
        let txn = self.pool.begin().await?;
        let model = active_model(employee, Set(id)).insert(&txn).await?;
        txn.execute(Statement::from_string(
            DatabaseBackend::Postgres,
            RESYNC_ID_SEQUENCE.to_string(),
        ))
        .await?;
        txn.commit().await?;
        Ok(model)
    }
}

#[async_trait]
impl EmployeeStore for SeaOrmEmployeeStore {
    async fn find_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, EmployeeStoreError> {
        let row = employees::Entity::find_by_id(id)
            .one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(row.map(to_domain))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, EmployeeStoreError> {
        let row = employees::Entity::find()
            .filter(employees::Column::Email.eq(email))
            .one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(row.map(to_domain))
    }

    async fn save(&self, employee: Employee) -> Result<Employee, EmployeeStoreError> {
        let row = match employee.id {
            None => self.insert_new(employee).await,
            Some(id) => self.replace(id, employee).await,
        }
        .map_err(store_error)?;
        debug!(id = row.id, "employee row written");
        Ok(to_domain(row))
    }

    async fn delete_by_id(&self, id: EmployeeId) -> Result<(), EmployeeStoreError> {
        let result = employees::Entity::delete_by_id(id)
            .exec(&self.pool)
            .await
            .map_err(store_error)?;
        debug!(id, rows = result.rows_affected, "employee delete executed");
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Employee>, EmployeeStoreError> {
        let rows = employees::Entity::find()
            .order_by_asc(employees::Column::Id)
            .all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(to_domain).collect())
    }
}

fn active_model(employee: Employee, id: ActiveValue<i64>) -> employees::ActiveModel {
    employees::ActiveModel {
        id,
        first_name: Set(employee.first_name),
        last_name: Set(employee.last_name),
        email: Set(employee.email),
    }
}

fn to_domain(model: employees::Model) -> Employee {
    Employee {
        id: Some(model.id),
        first_name: model.first_name,
        last_name: model.last_name,
        email: model.email,
    }
}

fn store_error(err: DbErr) -> EmployeeStoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return EmployeeStoreError::conflict(detail);
    }
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
            EmployeeStoreError::connection(err.to_string())
        }
        other => EmployeeStoreError::query(other.to_string()),
    }
}
