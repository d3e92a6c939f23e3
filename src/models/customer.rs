//! Customer model
//!
//! Phone and email are unique lookup keys when present. These fields are
//! the ones callers typically protect with field-level encryption inside
//! sale records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique numeric identifier
    pub id: u64,

    /// Customer name
    pub name: String,

    /// Phone number; unique when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Email address; unique when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Postal address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// When the customer was created
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Create a new customer with just a name
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phone: None,
            email: None,
            address: None,
            created_at: Utc::now(),
        }
    }

    /// Set the phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
