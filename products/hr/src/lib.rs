//! HR vertical slice: the employee directory.
//!
//! [`EmployeeService`] owns the one business rule (emails are unique) and
//! talks to storage only through the [`EmployeeStore`] port.

mod employee;
mod service;
mod store;

pub use employee::{Employee, EmployeeId, ValidationError};
pub use service::{EmployeeService, EmployeeServiceError, ServiceResult};
pub use store::{EmployeeStore, EmployeeStoreError, InMemoryEmployeeStore};
