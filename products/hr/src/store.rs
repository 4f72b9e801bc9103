//! Persistence port for employee records plus an in-memory implementation.
//!
//! Adapters map their failures into [`EmployeeStoreError`] so the service can
//! tell a uniqueness conflict apart from an unavailable backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::employee::{Employee, EmployeeId};

/// Failures raised by employee store adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmployeeStoreError {
    /// Backend could not be reached.
    #[error("employee store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("employee store query failed: {message}")]
    Query { message: String },
    /// A uniqueness constraint rejected the write.
    #[error("employee store rejected a conflicting write: {message}")]
    Conflict { message: String },
}

impl EmployeeStoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

/// Keyed storage for employee records.
///
/// Each call is atomic on its own; nothing spans two calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Fetch an employee by identifier.
    async fn find_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, EmployeeStoreError>;

    /// Fetch the employee registered under `email`, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, EmployeeStoreError>;

    /// Insert when `employee.id` is `None`, otherwise replace the record at that id.
    /// Returns the stored value with its id populated.
    async fn save(&self, employee: Employee) -> Result<Employee, EmployeeStoreError>;

    /// Remove the record at `id`. Missing ids are not an error.
    async fn delete_by_id(&self, id: EmployeeId) -> Result<(), EmployeeStoreError>;

    /// Every stored employee.
    async fn find_all(&self) -> Result<Vec<Employee>, EmployeeStoreError>;
}

#[derive(Debug)]
struct Records {
    next_id: EmployeeId,
    rows: BTreeMap<EmployeeId, Employee>,
}

/// Process-local store keyed by id. Does not enforce email uniqueness.
#[derive(Debug)]
pub struct InMemoryEmployeeStore {
    records: RwLock<Records>,
}

impl Default for InMemoryEmployeeStore {
    fn default() -> Self {
        Self {
            records: RwLock::new(Records {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EmployeeStore for InMemoryEmployeeStore {
    async fn find_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, EmployeeStoreError> {
        Ok(self.records.read().await.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, EmployeeStoreError> {
        let records = self.records.read().await;
        Ok(records.rows.values().find(|e| e.email == email).cloned())
    }

    async fn save(&self, employee: Employee) -> Result<Employee, EmployeeStoreError> {
        let mut records = self.records.write().await;
        let id = match employee.id {
            Some(id) => id,
            None => records.next_id,
        };
        let after = id.checked_add(1).ok_or_else(|| {
            EmployeeStoreError::query(format!("employee id {id} is out of range"))
        })?;
        records.next_id = records.next_id.max(after);
        let stored = employee.with_id(id);
        records.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_by_id(&self, id: EmployeeId) -> Result<(), EmployeeStoreError> {
        self.records.write().await.rows.remove(&id);
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Employee>, EmployeeStoreError> {
        Ok(self.records.read().await.rows.values().cloned().collect())
    }
}
