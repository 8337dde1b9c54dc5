//! Billing error types

use thiserror::Error;

/// Billing configuration errors.
///
/// Entitlement checks never fail; these only come out of loading a billing
/// configuration and resolving a subscription against it.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid billing configuration JSON: {0}")]
    Json(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::Json(err.to_string())
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
