use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-assigned employee identifier.
pub type EmployeeId = i64;

/// An employee record. `id` stays `None` until the store persists it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default)]
    pub id: Option<EmployeeId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Employee {
    /// Build an unsaved employee.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }

    /// Copy of this employee carrying the given id.
    pub fn with_id(self, id: EmployeeId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    /// Trim every field and reject any that ends up blank.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let first_name = required(&self.first_name, "firstName")?;
        let last_name = required(&self.last_name, "lastName")?;
        let email = required(&self.email, "email")?;
        Ok(Self {
            id: self.id,
            first_name,
            last_name,
            email,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(trimmed.to_string())
}
