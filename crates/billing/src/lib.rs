//! Billkit Billing
//!
//! Entitlement decisions over a plan, purchased add-ons and the subscription's
//! payment status, plus the "billing as code" loader that builds them.

pub mod config;
pub mod entitlement;
pub mod error;

pub use config::{BillingConfig, SubscriptionSnapshot};
pub use entitlement::EntitlementEngine;
pub use error::{BillingError, BillingResult};
