//! Shared application state.

use std::sync::Arc;

use access::TokenAuthority;
use ordering::{CatalogService, CustomerService, OrderService};
use store::Store;

/// Shared application state accessible from all handlers.
///
/// Built once at startup; nothing in it is mutated afterwards.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub orders: OrderService<dyn Store>,
    pub customers: CustomerService<dyn Store>,
    pub catalog: CatalogService<dyn Store>,
    pub authority: Arc<TokenAuthority>,
    pub cors_origin: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, authority: TokenAuthority) -> Self {
        Self {
            orders: OrderService::new(Arc::clone(&store)),
            customers: CustomerService::new(Arc::clone(&store)),
            catalog: CatalogService::new(Arc::clone(&store)),
            store,
            authority: Arc::new(authority),
            cors_origin: None,
        }
    }

    /// Restricts cross-origin requests to `origin`. Without it any origin is
    /// allowed.
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }
}
