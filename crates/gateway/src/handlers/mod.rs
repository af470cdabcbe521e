//! API handlers module

pub mod auth;
pub mod checksum;
pub mod health;
pub mod identity;
pub mod resources;
pub mod users;

use bibstore_common::errors::{AppError, Result};
use validator::Validate;

/// Run the derived validators of a request body
pub(crate) fn validate_request<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}
