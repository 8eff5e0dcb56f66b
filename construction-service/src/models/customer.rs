//! Customer model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEmails {
    pub work: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<String>,
}

impl ContactEmails {
    /// Work email first, then personal.
    pub fn preferred(&self) -> Option<&str> {
        [Some(self.work.as_str()), self.personal.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPhones {
    pub work: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl Address {
    /// "street, city, state zip"
    pub fn one_line(&self) -> String {
        format!("{}, {}, {} {}", self.street, self.city, self.state, self.zip)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Customer {
    pub customer_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub emails: Json<ContactEmails>,
    pub phones: Json<ContactPhones>,
    pub addresses: Json<Vec<Address>>,
    pub lead_source: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Customer {
    pub fn primary_address(&self) -> Option<String> {
        self.addresses.0.first().map(Address::one_line)
    }
}

/// Input for creating a customer.
#[derive(Debug, Clone)]
pub struct CreateCustomer {
    pub company_id: Uuid,
    pub name: String,
    pub emails: ContactEmails,
    pub phones: ContactPhones,
    pub addresses: Vec<Address>,
    pub lead_source: Option<String>,
    pub notes: Option<String>,
}

/// Input for a partial customer update.
#[derive(Debug, Clone, Default)]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub emails: Option<ContactEmails>,
    pub phones: Option<ContactPhones>,
    pub addresses: Option<Vec<Address>>,
    pub lead_source: Option<String>,
    pub notes: Option<String>,
}
