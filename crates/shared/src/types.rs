//! Entitlement data model
//!
//! Plans, add-ons and their per-feature values as they come out of a billing
//! configuration, plus the `CheckResult` record the engine hands back.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ModelError;

// =============================================================================
// Feature Definitions
// =============================================================================

/// Kind of capability a feature slug represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    /// On/off toggle (e.g. `sso`)
    Boolean,
    /// Fixed quantity that does not reset (e.g. `seats`)
    Static,
    /// Consumable quota with a usage counter (e.g. `api-calls`)
    Metered,
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Static => write!(f, "static"),
            Self::Metered => write!(f, "metered"),
        }
    }
}

impl std::str::FromStr for FeatureType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boolean" => Ok(Self::Boolean),
            "static" => Ok(Self::Static),
            "metered" => Ok(Self::Metered),
            _ => Err(ModelError::InvalidFeatureType(s.to_string())),
        }
    }
}

/// Usage counter reset cadence for metered features.
/// Counters are owned by the host; the engine never reads this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPeriod {
    Day,
    Week,
    Month,
    Year,
}

/// Declares a capability slug once per project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDef {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

// =============================================================================
// Plan & Add-on Values
// =============================================================================

/// A feature's configuration inside a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFeatureValue {
    /// Numeric ceiling (seats, monthly quota)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_limit: Option<u64>,
    /// On/off toggle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_bool: Option<bool>,
    /// Only an explicit `false` makes the limit soft
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hard_limit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_period: Option<ResetPeriod>,
}

impl PlanFeatureValue {
    /// Boolean toggle switched on
    pub fn enabled() -> Self {
        Self {
            value_bool: Some(true),
            ..Self::default()
        }
    }

    /// Hard numeric limit
    pub fn limit(value: u64) -> Self {
        Self {
            value_limit: Some(value),
            ..Self::default()
        }
    }

    /// Numeric limit that permits overage once reached
    pub fn soft_limit(value: u64) -> Self {
        Self {
            value_limit: Some(value),
            is_hard_limit: Some(false),
            ..Self::default()
        }
    }

    pub fn relaxes_limit(&self) -> bool {
        self.is_hard_limit == Some(false)
    }
}

/// How an add-on's `value_limit` combines with what was accumulated before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonValueMode {
    /// Add onto the running limit
    #[default]
    Increment,
    /// Discard the running limit and replace it
    Set,
}

impl std::fmt::Display for AddonValueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increment => write!(f, "increment"),
            Self::Set => write!(f, "set"),
        }
    }
}

impl std::str::FromStr for AddonValueMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "increment" => Ok(Self::Increment),
            "set" => Ok(Self::Set),
            _ => Err(ModelError::InvalidAddonMode(s.to_string())),
        }
    }
}

/// A feature's configuration inside a purchased add-on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonFeatureValue {
    #[serde(rename = "type", default)]
    pub mode: AddonValueMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_limit: Option<u64>,
    /// Accepted for parity with plan values; add-ons grant booleans via `has_access`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_bool: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hard_limit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_period: Option<ResetPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_access: Option<bool>,
}

impl AddonFeatureValue {
    /// Boolean grant
    pub fn access() -> Self {
        Self {
            has_access: Some(true),
            ..Self::default()
        }
    }

    /// Adds `value` to the accumulated limit
    pub fn increment(value: u64) -> Self {
        Self {
            value_limit: Some(value),
            ..Self::default()
        }
    }

    /// Replaces the accumulated limit with `value`
    pub fn set(value: u64) -> Self {
        Self {
            mode: AddonValueMode::Set,
            value_limit: Some(value),
            ..Self::default()
        }
    }

    /// Mark this value as a soft limit
    pub fn soft(mut self) -> Self {
        self.is_hard_limit = Some(false);
        self
    }

    pub fn is_set(&self) -> bool {
        self.mode == AddonValueMode::Set
    }

    pub fn relaxes_limit(&self) -> bool {
        self.is_hard_limit == Some(false)
    }
}

// =============================================================================
// Plans & Add-ons
// =============================================================================

/// Base subscription tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDef {
    pub slug: String,
    #[serde(default)]
    pub features: HashMap<String, PlanFeatureValue>,
}

impl PlanDef {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            features: HashMap::new(),
        }
    }

    /// Builder-style feature insertion
    pub fn with_feature(mut self, slug: impl Into<String>, value: PlanFeatureValue) -> Self {
        self.features.insert(slug.into(), value);
        self
    }

    pub fn feature(&self, slug: &str) -> Option<&PlanFeatureValue> {
        self.features.get(slug)
    }
}

/// Purchased modifier on top of a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonDef {
    pub slug: String,
    #[serde(default)]
    pub features: HashMap<String, AddonFeatureValue>,
}

impl AddonDef {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            features: HashMap::new(),
        }
    }

    /// Builder-style feature insertion
    pub fn with_feature(mut self, slug: impl Into<String>, value: AddonFeatureValue) -> Self {
        self.features.insert(slug.into(), value);
        self
    }

    pub fn feature(&self, slug: &str) -> Option<&AddonFeatureValue> {
        self.features.get(slug)
    }
}

// =============================================================================
// Subscription Status
// =============================================================================

/// Payment lifecycle state of the subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Trialing,
    PastDue,
    Canceled,
    Paused,
}

/// Statuses that suppress every entitlement regardless of plan or add-ons
pub const BLOCKED_STATUSES: [SubscriptionStatus; 2] =
    [SubscriptionStatus::PastDue, SubscriptionStatus::Canceled];

impl SubscriptionStatus {
    pub fn is_blocked(&self) -> bool {
        BLOCKED_STATUSES.contains(self)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Trialing => write!(f, "trialing"),
            Self::PastDue => write!(f, "past_due"),
            Self::Canceled => write!(f, "canceled"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "trialing" => Ok(Self::Trialing),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            "paused" => Ok(Self::Paused),
            _ => Err(ModelError::InvalidStatus(s.to_string())),
        }
    }
}

// =============================================================================
// Check Results
// =============================================================================

/// Why a check came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckReason {
    /// Neither the plan nor any add-on grants the feature
    FeatureMissing,
    /// Hard numeric ceiling hit
    LimitReached,
    /// Subscription is in a blocked status
    PastDue,
    /// Usage is under the aggregated limit
    Included,
    /// Limit reached but a source made it soft
    OverageAllowed,
}

impl std::fmt::Display for CheckReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FeatureMissing => write!(f, "feature_missing"),
            Self::LimitReached => write!(f, "limit_reached"),
            Self::PastDue => write!(f, "past_due"),
            Self::Included => write!(f, "included"),
            Self::OverageAllowed => write!(f, "overage_allowed"),
        }
    }
}

/// Remaining balance. `Unlimited` travels as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Remaining {
    Finite(u64),
    Unlimited,
}

impl Remaining {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    pub fn as_finite(&self) -> Option<u64> {
        match self {
            Self::Finite(n) => Some(*n),
            Self::Unlimited => None,
        }
    }
}

impl std::fmt::Display for Remaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{}", n),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(n) => serializer.serialize_u64(*n),
            Self::Unlimited => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Remaining {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<u64>::deserialize(deserializer)? {
            Some(n) => Self::Finite(n),
            None => Self::Unlimited,
        })
    }
}

/// Decision for a single feature check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub allowed: bool,
    /// `None` only for an unlimited boolean grant
    pub reason: Option<CheckReason>,
    pub remaining: Remaining,
    /// Plan/add-on slugs that contributed, plan first when it did
    #[serde(default)]
    pub granted_by: Vec<String>,
}

impl CheckResult {
    pub fn denied(reason: CheckReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            remaining: Remaining::Finite(0),
            granted_by: Vec::new(),
        }
    }

    pub fn unlimited(granted_by: Vec<String>) -> Self {
        Self {
            allowed: true,
            reason: None,
            remaining: Remaining::Unlimited,
            granted_by,
        }
    }
}

/// `CheckResult` as exposed over the REST boundary to SDK callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub allowed: bool,
    pub reason: Option<CheckReason>,
    pub remaining_balance: Remaining,
}

impl From<&CheckResult> for CheckResponse {
    fn from(result: &CheckResult) -> Self {
        Self {
            allowed: result.allowed,
            reason: result.reason,
            remaining_balance: result.remaining,
        }
    }
}

impl From<CheckResult> for CheckResponse {
    fn from(result: CheckResult) -> Self {
        Self::from(&result)
    }
}
