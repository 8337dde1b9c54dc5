//! Error types for the Billkit data model

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid subscription status: {0}")]
    InvalidStatus(String),

    #[error("Invalid feature type: {0}")]
    InvalidFeatureType(String),

    #[error("Invalid add-on value mode: {0}")]
    InvalidAddonMode(String),
}
