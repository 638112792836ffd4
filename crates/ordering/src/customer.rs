//! Customer registration and credential checks.

use std::sync::Arc;

use access::{hash_password, verify_password};
use common::CustomerId;
use schema::{
    Customer, CustomerRegistration, CustomerWithOrders, EntityKind, NewCustomer, Validate,
};
use store::{Store, StoreExt};

use crate::error::ServiceError;

/// Service for customers.
///
/// Plaintext passwords never reach the store: registration hashes them on a
/// blocking thread first.
pub struct CustomerService<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for CustomerService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> CustomerService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validates the registration, hashes the password and stores the
    /// customer. A duplicate email is a `Conflict`.
    #[tracing::instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: CustomerRegistration,
    ) -> Result<Customer, ServiceError> {
        registration.validate()?;

        let CustomerRegistration {
            name,
            email,
            password,
        } = registration;
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        let customer = self
            .store
            .create_customer(NewCustomer {
                name,
                email,
                password_hash,
            })
            .await?;
        tracing::info!(customer_id = %customer.id, "customer registered");
        Ok(customer)
    }

    /// Returns the customer whose stored hash matches `password`.
    ///
    /// An unknown email and a wrong password fail the same way.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Customer, ServiceError> {
        let Some(customer) = self.store.find_customer_by_email(email).await? else {
            tracing::debug!("unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        let stored = customer.password_hash.clone();
        let candidate = password.to_string();
        let matches =
            tokio::task::spawn_blocking(move || verify_password(&candidate, &stored)).await??;

        if matches {
            Ok(customer)
        } else {
            tracing::debug!(customer_id = %customer.id, "password mismatch");
            Err(ServiceError::InvalidCredentials)
        }
    }

    /// Loads a customer with orders and each order's details.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: CustomerId) -> Result<Option<CustomerWithOrders>, ServiceError> {
        Ok(self.store.find_customer(id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Customer>, ServiceError> {
        Ok(self.store.list_customers().await?)
    }

    /// Deletes a customer. Refused while any order or detail refers to them.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: CustomerId) -> Result<u64, ServiceError> {
        Ok(self.store.delete(EntityKind::Customer, id.as_i64()).await?)
    }
}
