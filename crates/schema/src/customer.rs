//! Customer entity and its registration input.

use common::CustomerId;
use serde::{Deserialize, Serialize};

use crate::validate::required;
use crate::{EntityKind, OrderWithDetails, Record, Validate, ValidationError};

pub const CUSTOMER_NAME_MAX: usize = 50;
pub const CUSTOMER_EMAIL_MAX: usize = 50;
pub const CUSTOMER_PASSWORD_MAX: usize = 50;
const PASSWORD_HASH_MAX: usize = 255;

/// A registered customer.
///
/// The stored password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// What a client submits to register: the plaintext password is bounded here
/// and hashed before it reaches storage.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRegistration {
    #[serde(alias = "customerName")]
    pub name: String,
    pub email: String,
    pub password: String,
}

impl CustomerRegistration {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for CustomerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerRegistration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validate for CustomerRegistration {
    fn validate(&self) -> Result<(), ValidationError> {
        required("Customer", "name", &self.name, CUSTOMER_NAME_MAX)?;
        required("Customer", "email", &self.email, CUSTOMER_EMAIL_MAX)?;
        required("Customer", "password", &self.password, CUSTOMER_PASSWORD_MAX)
    }
}

/// Customer row as written by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewCustomer {
    pub fn into_customer(self, id: CustomerId) -> Customer {
        Customer {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
        }
    }
}

impl Validate for NewCustomer {
    fn validate(&self) -> Result<(), ValidationError> {
        required("Customer", "name", &self.name, CUSTOMER_NAME_MAX)?;
        required("Customer", "email", &self.email, CUSTOMER_EMAIL_MAX)?;
        required("Customer", "password", &self.password_hash, PASSWORD_HASH_MAX)
    }
}

impl Record for NewCustomer {
    const KIND: EntityKind = EntityKind::Customer;
}

/// A customer with orders and their details eagerly loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerWithOrders {
    #[serde(flatten)]
    pub customer: Customer,
    pub orders: Vec<OrderWithDetails>,
}
