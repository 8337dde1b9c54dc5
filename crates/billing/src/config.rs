//! Billing-as-code configuration
//!
//! Loads the versioned declaration of features, plans and add-ons and turns a
//! customer's subscription record into an [`EntitlementEngine`].
//!
//! ```json
//! {
//!   "version": 1,
//!   "features": [{ "slug": "seats", "type": "static", "unit": "seat" }],
//!   "plans": [{ "slug": "pro", "features": { "seats": { "value_limit": 5 } } }],
//!   "addons": [{ "slug": "seat-pack", "features": { "seats": { "type": "increment", "value_limit": 3 } } }]
//! }
//! ```
//!
//! Structural validation of the declaration happens elsewhere; this module
//! only parses it and resolves slugs.

use std::path::Path;

use billkit_shared::types::{AddonDef, FeatureDef, PlanDef, SubscriptionStatus};
use serde::{Deserialize, Serialize};

use crate::{
    entitlement::EntitlementEngine,
    error::{BillingError, BillingResult},
};

/// Parsed billing declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub features: Vec<FeatureDef>,
    #[serde(default)]
    pub plans: Vec<PlanDef>,
    #[serde(default)]
    pub addons: Vec<AddonDef>,
}

fn default_version() -> u32 {
    1
}

/// A customer's subscription as the host loads it: slugs plus status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub plan: String,
    /// One entry per purchase; repeated slugs are applied repeatedly
    #[serde(default)]
    pub addons: Vec<String>,
    #[serde(default)]
    pub status: SubscriptionStatus,
}

impl BillingConfig {
    pub fn from_json_str(json: &str) -> BillingResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a declaration from disk
    pub fn from_path(path: impl AsRef<Path>) -> BillingResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BillingError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&raw)?;

        tracing::info!(
            path = %path.display(),
            version = config.version,
            features = config.features.len(),
            plans = config.plans.len(),
            addons = config.addons.len(),
            "Billing configuration loaded"
        );

        Ok(config)
    }

    pub fn feature(&self, slug: &str) -> Option<&FeatureDef> {
        self.features.iter().find(|f| f.slug == slug)
    }

    pub fn plan(&self, slug: &str) -> Option<&PlanDef> {
        self.plans.iter().find(|p| p.slug == slug)
    }

    pub fn addon(&self, slug: &str) -> Option<&AddonDef> {
        self.addons.iter().find(|a| a.slug == slug)
    }

    /// Build an engine for a subscription, resolving its plan and add-on slugs
    pub fn engine_for(
        &self,
        subscription: &SubscriptionSnapshot,
    ) -> BillingResult<EntitlementEngine> {
        let plan = self.plan(&subscription.plan).cloned().ok_or_else(|| {
            tracing::warn!(plan = %subscription.plan, "Subscription references unknown plan");
            BillingError::NotFound(format!("Plan {} not found", subscription.plan))
        })?;

        let addons = subscription
            .addons
            .iter()
            .map(|slug| {
                self.addon(slug).cloned().ok_or_else(|| {
                    tracing::warn!(addon = %slug, "Subscription references unknown add-on");
                    BillingError::NotFound(format!("Add-on {} not found", slug))
                })
            })
            .collect::<BillingResult<Vec<_>>>()?;

        Ok(EntitlementEngine::new(plan)
            .with_addons(addons)
            .with_status(subscription.status))
    }
}
