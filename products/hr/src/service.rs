//! Employee orchestration: the email uniqueness rule and CRUD delegation.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::employee::{Employee, EmployeeId, ValidationError};
use crate::store::{EmployeeStore, EmployeeStoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmployeeServiceError {
    /// Another employee already owns the email.
    #[error("employee with email {email} already exists")]
    DuplicateResource { email: String },
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),
    /// Store failure, passed through untouched.
    #[error(transparent)]
    Storage(#[from] EmployeeStoreError),
}

pub type ServiceResult<T> = Result<T, EmployeeServiceError>;

/// Stateless between calls; all state lives in the store.
#[derive(Clone)]
pub struct EmployeeService {
    store: Arc<dyn EmployeeStore>,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn EmployeeStore>) -> Self {
        Self { store }
    }

    /// Persist a new employee unless its email is taken.
    ///
    /// The lookup and the insert are two separate store calls, so two
    /// concurrent creates with one email can both pass the lookup. Stores
    /// that enforce uniqueness themselves report the loser as a conflict,
    /// which surfaces here as [`EmployeeServiceError::DuplicateResource`].
    pub async fn create(&self, employee: Employee) -> ServiceResult<Employee> {
        let employee = employee.validated()?;
        if self.store.find_by_email(&employee.email).await?.is_some() {
            warn!(email = %employee.email, "rejecting employee with duplicate email");
            return Err(EmployeeServiceError::DuplicateResource {
                email: employee.email,
            });
        }
        let email = employee.email.clone();
        let saved = self
            .store
            .save(employee)
            .await
            .map_err(|err| conflict_as_duplicate(err, &email))?;
        info!(id = ?saved.id, email = %saved.email, "employee created");
        Ok(saved)
    }

    pub async fn get_by_id(&self, id: EmployeeId) -> ServiceResult<Option<Employee>> {
        Ok(self.store.find_by_id(id).await?)
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<Employee>> {
        Ok(self.store.find_all().await?)
    }

    /// Replace the stored record at `employee.id`.
    ///
    /// The new email is not checked against other employees here.
    pub async fn update(&self, employee: Employee) -> ServiceResult<Employee> {
        let employee = employee.validated()?;
        let email = employee.email.clone();
        let saved = self
            .store
            .save(employee)
            .await
            .map_err(|err| conflict_as_duplicate(err, &email))?;
        info!(id = ?saved.id, email = %saved.email, "employee updated");
        Ok(saved)
    }

    /// Delete by id; succeeds whether or not the record existed.
    pub async fn delete_by_id(&self, id: EmployeeId) -> ServiceResult<()> {
        self.store.delete_by_id(id).await?;
        debug!(id, "employee deleted");
        Ok(())
    }
}

fn conflict_as_duplicate(err: EmployeeStoreError, email: &str) -> EmployeeServiceError {
    match err {
        EmployeeStoreError::Conflict { .. } => EmployeeServiceError::DuplicateResource {
            email: email.to_string(),
        },
        other => EmployeeServiceError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryEmployeeStore, MockEmployeeStore};

    fn christian() -> Employee {
        Employee::new("Christian", "Ramirez", "c1@gmail.com")
    }

    fn service_with(store: MockEmployeeStore) -> EmployeeService {
        EmployeeService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn create_saves_when_email_is_free() {
        let mut store = MockEmployeeStore::new();
        store
            .expect_find_by_email()
            .withf(|email| email == "c1@gmail.com")
            .times(1)
            .returning(|_| Ok(None));
        store
            .expect_save()
            .times(1)
            .returning(|employee| Ok(employee.with_id(1)));

        let saved = service_with(store).create(christian()).await.unwrap();
        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.first_name, "Christian");
    }

    #[tokio::test]
    async fn create_with_taken_email_never_writes() {
        let mut store = MockEmployeeStore::new();
        store
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(christian().with_id(1))));
        store.expect_save().never();

        let err = service_with(store).create(christian()).await.unwrap_err();
        assert_eq!(
            err,
            EmployeeServiceError::DuplicateResource {
                email: "c1@gmail.com".into()
            }
        );
    }

    #[tokio::test]
    async fn create_maps_store_conflict_to_duplicate() {
        let mut store = MockEmployeeStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));
        store
            .expect_save()
            .times(1)
            .returning(|_| Err(EmployeeStoreError::conflict("employees_email_key")));

        let err = service_with(store).create(christian()).await.unwrap_err();
        assert!(matches!(err, EmployeeServiceError::DuplicateResource { .. }));
    }

    #[tokio::test]
    async fn create_rejects_invalid_input_before_touching_the_store() {
        let mut store = MockEmployeeStore::new();
        store.expect_find_by_email().never();
        store.expect_save().never();

        let err = service_with(store)
            .create(Employee::new("Christian", "Ramirez", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, EmployeeServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn storage_failures_propagate_unchanged() {
        let mut store = MockEmployeeStore::new();
        store
            .expect_find_by_email()
            .returning(|_| Err(EmployeeStoreError::connection("pool timed out")));
        store
            .expect_find_all()
            .returning(|| Err(EmployeeStoreError::query("relation missing")));
        let service = service_with(store);

        let err = service.create(christian()).await.unwrap_err();
        assert_eq!(
            err,
            EmployeeServiceError::Storage(EmployeeStoreError::connection("pool timed out"))
        );
        let err = service.get_all().await.unwrap_err();
        assert_eq!(
            err,
            EmployeeServiceError::Storage(EmployeeStoreError::query("relation missing"))
        );
    }

    #[tokio::test]
    async fn get_all_lists_every_employee() {
        let mut store = MockEmployeeStore::new();
        store.expect_find_all().times(1).returning(|| {
            Ok(vec![
                christian().with_id(1),
                Employee::new("Jule", "Oliva", "j2@gmail.com").with_id(2),
            ])
        });

        let employees = service_with(store).get_all().await.unwrap();
        assert_eq!(employees.len(), 2);
    }

    #[tokio::test]
    async fn get_all_on_empty_store_is_empty() {
        let mut store = MockEmployeeStore::new();
        store.expect_find_all().returning(|| Ok(Vec::new()));

        let employees = service_with(store).get_all().await.unwrap();
        assert!(employees.is_empty());
    }

    #[tokio::test]
    async fn get_by_id_returns_none_for_unknown_id() {
        let mut store = MockEmployeeStore::new();
        store
            .expect_find_by_id()
            .withf(|id| *id == 1)
            .returning(|_| Ok(Some(christian().with_id(1))));
        store
            .expect_find_by_id()
            .withf(|id| *id != 1)
            .returning(|_| Ok(None));
        let service = service_with(store);

        assert!(service.get_by_id(1).await.unwrap().is_some());
        assert!(service.get_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_saves_new_fields_without_email_lookup() {
        let mut store = MockEmployeeStore::new();
        store.expect_find_by_email().never();
        store
            .expect_save()
            .withf(|e| e.id == Some(1) && e.email == "chr2@gmail.com")
            .times(1)
            .returning(Ok);

        let changed = Employee {
            email: "chr2@gmail.com".into(),
            first_name: "Christian Raul".into(),
            ..christian().with_id(1)
        };
        let updated = service_with(store).update(changed).await.unwrap();
        assert_eq!(updated.email, "chr2@gmail.com");
        assert_eq!(updated.first_name, "Christian Raul");
    }

    #[tokio::test]
    async fn update_maps_store_conflict_to_duplicate() {
        let mut store = MockEmployeeStore::new();
        store.expect_find_by_email().never();
        store
            .expect_save()
            .times(1)
            .returning(|_| Err(EmployeeStoreError::conflict("idx_employees_email_unique")));

        let taken = Employee {
            email: "g1@gmail.com".into(),
            ..christian().with_id(1)
        };
        let err = service_with(store).update(taken).await.unwrap_err();
        assert_eq!(
            err,
            EmployeeServiceError::DuplicateResource {
                email: "g1@gmail.com".into()
            }
        );
    }

    #[tokio::test]
    async fn update_at_unusable_id_is_a_storage_error() {
        let service = EmployeeService::new(Arc::new(InMemoryEmployeeStore::new()));
        let err = service
            .update(Employee::new("A", "B", "a@x.com").with_id(i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmployeeServiceError::Storage(EmployeeStoreError::Query { .. })
        ));
    }

    #[tokio::test]
    async fn create_accepts_free_form_email() {
        let service = EmployeeService::new(Arc::new(InMemoryEmployeeStore::new()));
        let saved = service
            .create(Employee::new("A", "B", "employee-42"))
            .await
            .unwrap();
        assert_eq!(saved.email, "employee-42");
    }

    #[tokio::test]
    async fn delete_calls_store_once() {
        let mut store = MockEmployeeStore::new();
        store
            .expect_delete_by_id()
            .withf(|id| *id == 1)
            .times(1)
            .returning(|_| Ok(()));

        service_with(store).delete_by_id(1).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_create_leaves_store_unchanged() {
        let store = Arc::new(InMemoryEmployeeStore::new());
        let service = EmployeeService::new(store.clone());

        let saved = service.create(christian()).await.unwrap();
        assert!(saved.id.is_some());
        assert_eq!(saved.first_name, "Christian");
        assert_eq!(saved.last_name, "Ramirez");
        assert_eq!(saved.email, "c1@gmail.com");

        let err = service
            .create(Employee::new("Other", "Person", "c1@gmail.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, EmployeeServiceError::DuplicateResource { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn list_reflects_created_employees() {
        let service = EmployeeService::new(Arc::new(InMemoryEmployeeStore::new()));
        assert!(service.get_all().await.unwrap().is_empty());

        for (first, email) in [("A", "a@x.com"), ("B", "b@x.com"), ("C", "c@x.com")] {
            service
                .create(Employee::new(first, "Ramirez", email))
                .await
                .unwrap();
        }
        let mut emails: Vec<_> = service
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.email)
            .collect();
        emails.sort();
        assert_eq!(emails, vec!["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[tokio::test]
    async fn update_preserves_id_and_replaces_fields() {
        let service = EmployeeService::new(Arc::new(InMemoryEmployeeStore::new()));
        let saved = service.create(christian()).await.unwrap();
        let id = saved.id.unwrap();

        service
            .update(Employee {
                email: "new@x.com".into(),
                first_name: "X".into(),
                ..saved
            })
            .await
            .unwrap();

        let fetched = service.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.id, Some(id));
        assert_eq!(fetched.email, "new@x.com");
        assert_eq!(fetched.first_name, "X");
        assert_eq!(fetched.last_name, "Ramirez");
    }

    #[tokio::test]
    async fn update_may_take_another_employees_email() {
        let service = EmployeeService::new(Arc::new(InMemoryEmployeeStore::new()));
        service.create(christian()).await.unwrap();
        let other = service
            .create(Employee::new("Gabriel", "Ramirez", "g1@gmail.com"))
            .await
            .unwrap();

        let updated = service
            .update(Employee {
                email: "c1@gmail.com".into(),
                ..other
            })
            .await
            .unwrap();
        assert_eq!(updated.email, "c1@gmail.com");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let service = EmployeeService::new(Arc::new(InMemoryEmployeeStore::new()));
        let id = service.create(christian()).await.unwrap().id.unwrap();

        service.delete_by_id(id).await.unwrap();
        assert!(service.get_by_id(id).await.unwrap().is_none());
        service.delete_by_id(id).await.unwrap();
        service.delete_by_id(12345).await.unwrap();
    }
}
