//! Property tests for the entitlement engine.

use std::collections::BTreeMap;

use proptest::prelude::*;

use billkit_billing::EntitlementEngine;
use billkit_shared::types::{
    AddonDef, AddonFeatureValue, AddonValueMode, CheckReason, PlanDef, PlanFeatureValue,
    Remaining, SubscriptionStatus,
};

fn plan_value() -> impl Strategy<Value = Option<PlanFeatureValue>> {
    proptest::option::of(
        (
            proptest::option::of(0u64..50),
            proptest::option::of(any::<bool>()),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(|(value_limit, value_bool, is_hard_limit)| PlanFeatureValue {
                value_limit,
                value_bool,
                is_hard_limit,
                reset_period: None,
            }),
    )
}

fn addon_value() -> impl Strategy<Value = AddonFeatureValue> {
    (
        any::<bool>(),
        proptest::option::of(0u64..50),
        proptest::option::of(any::<bool>()),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(set, value_limit, has_access, is_hard_limit)| AddonFeatureValue {
            mode: if set {
                AddonValueMode::Set
            } else {
                AddonValueMode::Increment
            },
            value_limit,
            has_access,
            is_hard_limit,
            ..AddonFeatureValue::default()
        })
}

fn addons() -> impl Strategy<Value = Vec<AddonDef>> {
    proptest::collection::vec(addon_value(), 0..6).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| AddonDef::new(format!("addon-{i}")).with_feature("seats", value))
            .collect()
    })
}

fn status() -> impl Strategy<Value = SubscriptionStatus> {
    prop_oneof![
        Just(SubscriptionStatus::Active),
        Just(SubscriptionStatus::Trialing),
        Just(SubscriptionStatus::PastDue),
        Just(SubscriptionStatus::Canceled),
        Just(SubscriptionStatus::Paused),
    ]
}

fn plan(value: Option<PlanFeatureValue>) -> PlanDef {
    let plan = PlanDef::new("plan").with_feature("sso", PlanFeatureValue::enabled());
    match value {
        Some(value) => plan.with_feature("seats", value),
        None => plan,
    }
}

fn sorted(mut slugs: Vec<String>) -> Vec<String> {
    slugs.sort();
    slugs
}

proptest! {
    #[test]
    fn check_is_pure(
        value in plan_value(),
        addons in addons(),
        status in status(),
        usage in 0u64..120,
    ) {
        let engine = EntitlementEngine::new(plan(value))
            .with_addons(addons)
            .with_status(status);
        prop_assert_eq!(engine.check("seats", usage), engine.check("seats", usage));
    }

    #[test]
    fn blocked_status_always_denies(
        value in plan_value(),
        addons in addons(),
        blocked in prop_oneof![
            Just(SubscriptionStatus::PastDue),
            Just(SubscriptionStatus::Canceled),
        ],
        usage in 0u64..120,
    ) {
        let engine = EntitlementEngine::new(plan(value))
            .with_addons(addons)
            .with_status(blocked);

        for feature in ["seats", "sso", "unknown"] {
            let result = engine.check(feature, usage);
            prop_assert!(!result.allowed);
            prop_assert_eq!(result.reason, Some(CheckReason::PastDue));
            prop_assert_eq!(result.remaining, Remaining::Finite(0));
        }
    }

    #[test]
    fn unconfigured_feature_is_missing(
        value in plan_value(),
        addons in addons(),
        usage in 0u64..120,
    ) {
        let result = EntitlementEngine::new(plan(value))
            .with_addons(addons)
            .check("api-calls", usage);
        prop_assert!(!result.allowed);
        prop_assert_eq!(result.reason, Some(CheckReason::FeatureMissing));
    }

    #[test]
    fn unlimited_iff_boolean_grant(
        value in plan_value(),
        addons in addons(),
        usage in 0u64..120,
    ) {
        let boolean_grant = value.as_ref().is_some_and(|v| v.value_bool == Some(true))
            || addons
                .iter()
                .filter_map(|a| a.feature("seats"))
                .any(|v| v.has_access == Some(true));

        let result = EntitlementEngine::new(plan(value))
            .with_addons(addons)
            .check("seats", usage);

        prop_assert_eq!(result.remaining.is_unlimited(), boolean_grant);
        if boolean_grant {
            prop_assert!(result.allowed);
            prop_assert!(result.reason.is_none());
        }
    }

    #[test]
    fn increments_may_move_relative_to_sets(
        value in plan_value(),
        addons in addons(),
        usage in 0u64..120,
    ) {
        let (sets, mut increments): (Vec<AddonDef>, Vec<AddonDef>) = addons
            .iter()
            .cloned()
            .partition(|a| a.feature("seats").is_some_and(|v| v.is_set()));
        increments.reverse();
        let shuffled: Vec<AddonDef> = increments.into_iter().chain(sets).collect();

        let original = EntitlementEngine::new(plan(value.clone()))
            .with_addons(addons)
            .check("seats", usage);
        let reordered = EntitlementEngine::new(plan(value))
            .with_addons(shuffled)
            .check("seats", usage);

        prop_assert_eq!(original.allowed, reordered.allowed);
        prop_assert_eq!(original.reason, reordered.reason);
        prop_assert_eq!(original.remaining, reordered.remaining);
        prop_assert_eq!(sorted(original.granted_by), sorted(reordered.granted_by));
    }

    #[test]
    fn check_batch_matches_independent_checks(
        value in plan_value(),
        addons in addons(),
        status in status(),
        seats in 0u64..120,
        sso in 0u64..120,
        other in 0u64..120,
    ) {
        let engine = EntitlementEngine::new(plan(value))
            .with_addons(addons)
            .with_status(status);
        let usages = BTreeMap::from([
            ("seats".to_string(), seats),
            ("sso".to_string(), sso),
            ("other".to_string(), other),
        ]);

        let results = engine.check_batch(&usages);

        prop_assert_eq!(results.len(), usages.len());
        for (feature, usage) in &usages {
            prop_assert_eq!(&results[feature], &engine.check(feature, *usage));
        }
    }
}
