mod validator;

pub use validator::{validate_client, FieldError};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::store::Lifecycle;

#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub nit: Option<String>,
    pub email: Option<String>,
    pub lifecycle: Lifecycle,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn to_input(&self) -> ClientInput {
        ClientInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            nit: self.nit.clone(),
            email: self.email.clone(),
        }
    }
}

/// Client fields as submitted for create or after applying an update.
#[derive(Debug, Clone, Default)]
pub struct ClientInput {
    pub first_name: String,
    pub last_name: String,
    pub nit: Option<String>,
    pub email: Option<String>,
}

impl ClientInput {
    /// Trim every field and turn blank optional fields into `None`.
    pub fn normalized(&self) -> ClientInput {
        fn opt(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }
        ClientInput {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            nit: opt(&self.nit),
            email: opt(&self.email),
        }
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nit: Option<String>,
    pub email: Option<String>,
}

impl ClientUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.nit.is_none()
            && self.email.is_none()
    }

    pub fn apply(&self, current: &ClientInput) -> ClientInput {
        ClientInput {
            first_name: self
                .first_name
                .clone()
                .unwrap_or_else(|| current.first_name.clone()),
            last_name: self
                .last_name
                .clone()
                .unwrap_or_else(|| current.last_name.clone()),
            nit: self.nit.clone().or_else(|| current.nit.clone()),
            email: self.email.clone().or_else(|| current.email.clone()),
        }
    }
}
