//! Entitlement Module
//!
//! Answers "can this customer use feature X right now?" from a plan, the
//! purchased add-ons and the subscription's payment status.
//!
//! ## Evaluation order
//!
//! 1. **Subscription gate**: a blocked status (`past_due`, `canceled`) denies every check
//! 2. **Source collection**: the plan's value and every add-on value for the feature
//! 3. **Ordering**: add-on values of type `set` are applied before `increment` ones,
//!    whatever order the caller supplied the add-ons in
//! 4. **Aggregation**: a left fold over [`Accumulator`]
//! 5. **Access / limit evaluation** against the caller's usage snapshot
//!
//! The engine holds no mutable state. Identical inputs always produce an
//! identical [`CheckResult`], and a shared engine can be checked from any
//! number of threads.

use std::collections::BTreeMap;

use billkit_shared::types::{
    AddonDef, AddonFeatureValue, CheckReason, CheckResult, PlanDef, PlanFeatureValue, Remaining,
    SubscriptionStatus,
};

/// Running totals folded over every source that mentions a feature
#[derive(Debug, Clone, PartialEq, Eq)]
struct Accumulator {
    total_limit: u64,
    has_access: bool,
    is_infinite: bool,
    /// Sticky: once any source relaxes the limit it stays soft
    hard_limit: bool,
    granted_by: Vec<String>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            total_limit: 0,
            has_access: false,
            is_infinite: false,
            hard_limit: true,
            granted_by: Vec::new(),
        }
    }
}

impl Accumulator {
    fn apply_plan(self, slug: &str, value: &PlanFeatureValue) -> Self {
        let grants_bool = value.value_bool == Some(true);
        let grants_limit = value.value_limit.is_some();

        Self {
            total_limit: self
                .total_limit
                .saturating_add(value.value_limit.unwrap_or(0)),
            has_access: self.has_access || grants_bool || grants_limit,
            is_infinite: self.is_infinite || grants_bool,
            hard_limit: self.hard_limit && !value.relaxes_limit(),
            granted_by: if grants_bool || grants_limit {
                with_contributor(self.granted_by, slug)
            } else {
                self.granted_by
            },
        }
    }

    fn apply_addon(self, slug: &str, value: &AddonFeatureValue) -> Self {
        let grants_access = value.has_access == Some(true);
        let granted_by = if grants_access {
            with_contributor(self.granted_by, slug)
        } else {
            self.granted_by
        };

        // `set` supersedes everything accumulated so far, contributors included
        let (total_limit, granted_by) = match value.value_limit {
            Some(limit) if value.is_set() => (limit, vec![slug.to_string()]),
            Some(limit) => (
                self.total_limit.saturating_add(limit),
                with_contributor(granted_by, slug),
            ),
            None => (self.total_limit, granted_by),
        };

        Self {
            total_limit,
            has_access: self.has_access || grants_access || value.value_limit.is_some(),
            is_infinite: self.is_infinite || grants_access,
            hard_limit: self.hard_limit && !value.relaxes_limit(),
            granted_by,
        }
    }

    fn evaluate(self, current_usage: u64) -> CheckResult {
        if !self.has_access {
            return CheckResult::denied(CheckReason::FeatureMissing);
        }

        if self.is_infinite {
            return CheckResult::unlimited(self.granted_by);
        }

        let (allowed, reason, remaining) = if current_usage < self.total_limit {
            (true, CheckReason::Included, self.total_limit - current_usage)
        } else if !self.hard_limit {
            (true, CheckReason::OverageAllowed, 0)
        } else {
            (false, CheckReason::LimitReached, 0)
        };

        CheckResult {
            allowed,
            reason: Some(reason),
            remaining: Remaining::Finite(remaining),
            granted_by: self.granted_by,
        }
    }
}

fn with_contributor(mut granted_by: Vec<String>, slug: &str) -> Vec<String> {
    if !granted_by.iter().any(|s| s == slug) {
        granted_by.push(slug.to_string());
    }
    granted_by
}

/// Stateless entitlement decisions for one subscription
#[derive(Debug, Clone)]
pub struct EntitlementEngine {
    plan: PlanDef,
    addons: Vec<AddonDef>,
    status: SubscriptionStatus,
}

impl EntitlementEngine {
    /// Engine for an active subscription with no add-ons
    pub fn new(plan: PlanDef) -> Self {
        Self {
            plan,
            addons: Vec::new(),
            status: SubscriptionStatus::default(),
        }
    }

    pub fn with_addons(mut self, addons: Vec<AddonDef>) -> Self {
        self.addons = addons;
        self
    }

    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn plan(&self) -> &PlanDef {
        &self.plan
    }

    pub fn addons(&self) -> &[AddonDef] {
        &self.addons
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    /// Check a feature with no usage recorded yet
    pub fn check_feature(&self, feature_id: &str) -> CheckResult {
        self.check(feature_id, 0)
    }

    /// Decide whether `feature_id` may be used given `current_usage`.
    ///
    /// Unknown feature IDs are a normal `feature_missing` outcome.
    pub fn check(&self, feature_id: &str, current_usage: u64) -> CheckResult {
        if self.status.is_blocked() {
            tracing::debug!(
                feature = %feature_id,
                status = %self.status,
                "Entitlement blocked by subscription status"
            );
            return CheckResult::denied(CheckReason::PastDue);
        }

        let plan_value = self.plan.feature(feature_id);
        let addon_values = self.ordered_addon_values(feature_id);

        if plan_value.is_none() && addon_values.is_empty() {
            tracing::debug!(feature = %feature_id, "Feature not defined by plan or add-ons");
            return CheckResult::denied(CheckReason::FeatureMissing);
        }

        let seed = match plan_value {
            Some(value) => Accumulator::default().apply_plan(&self.plan.slug, value),
            None => Accumulator::default(),
        };
        let result = addon_values
            .into_iter()
            .fold(seed, |acc, (slug, value)| acc.apply_addon(slug, value))
            .evaluate(current_usage);

        tracing::debug!(
            feature = %feature_id,
            usage = current_usage,
            allowed = result.allowed,
            reason = ?result.reason,
            remaining = %result.remaining,
            "Entitlement checked"
        );

        result
    }

    /// Run [`check`](Self::check) independently for every entry
    pub fn check_batch(&self, usages: &BTreeMap<String, u64>) -> BTreeMap<String, CheckResult> {
        usages
            .iter()
            .map(|(feature_id, usage)| (feature_id.clone(), self.check(feature_id, *usage)))
            .collect()
    }

    /// Add-on values for a feature, `set` entries first. The sort is stable so
    /// entries of the same type keep the caller's relative order.
    fn ordered_addon_values(&self, feature_id: &str) -> Vec<(&str, &AddonFeatureValue)> {
        let mut values: Vec<(&str, &AddonFeatureValue)> = self
            .addons
            .iter()
            .filter_map(|addon| {
                addon
                    .feature(feature_id)
                    .map(|value| (addon.slug.as_str(), value))
            })
            .collect();
        values.sort_by_key(|(_, value)| !value.is_set());
        values
    }
}
