//! API server state

use std::sync::Arc;

use crate::api::ApiError;
use crate::repository::Repository;
use crate::Error;

/// API server state, cloned into every request
#[derive(Clone)]
pub struct AppState {
    /// Item repository; shares one storage client across all requests
    pub repository: Arc<Repository>,

    /// Include raw error text in 5xx responses
    pub expose_internal_errors: bool,
}

impl AppState {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository: Arc::new(repository),
            expose_internal_errors: true,
        }
    }

    pub fn with_expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Convert a repository error into a response error
    pub fn reject(&self, err: Error) -> ApiError {
        ApiError::from_error(err, self.expose_internal_errors)
    }
}
