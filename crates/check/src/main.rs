//! Entitlement evaluator for Billkit
//!
//! Loads the billing declaration named by `BILLKIT_CONFIG_PATH`, reads a
//! subscription snapshot, runs every usage entry through the entitlement
//! engine and prints the decisions as JSON on stdout. Logs go to stderr.
//!
//! Usage:
//!   billkit-check snapshot.json
//!   billkit-check --sdk < snapshot.json
//!
//! Snapshot format:
//!   {"plan": "pro", "addons": ["seat-pack"], "status": "active", "usage": {"seats": 6}}
//!
//! `--sdk` prints the `{allowed, reason, remainingBalance}` shape SDK callers
//! receive instead of the full check result.

mod config;

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use billkit_billing::{BillingConfig, SubscriptionSnapshot};
use billkit_shared::types::CheckResponse;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    sdk: bool,
    snapshot_path: Option<PathBuf>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Self::default();
        for arg in args {
            match arg.as_str() {
                "--sdk" => parsed.sdk = true,
                flag if flag.starts_with("--") => bail!("Unknown flag: {}", flag),
                path => {
                    if parsed.snapshot_path.is_some() {
                        bail!("Only one snapshot path may be given");
                    }
                    parsed.snapshot_path = Some(PathBuf::from(path));
                }
            }
        }
        Ok(parsed)
    }
}

/// Subscription snapshot plus the usage counters to check
#[derive(Debug, Deserialize)]
struct CheckRequest {
    #[serde(flatten)]
    subscription: SubscriptionSnapshot,
    #[serde(default)]
    usage: BTreeMap<String, u64>,
}

fn evaluate(
    billing: &BillingConfig,
    request: &CheckRequest,
    sdk: bool,
) -> Result<serde_json::Value> {
    let engine = billing.engine_for(&request.subscription)?;
    let results = engine.check_batch(&request.usage);

    tracing::info!(
        plan = %request.subscription.plan,
        status = %request.subscription.status,
        checks = results.len(),
        denied = results.values().filter(|r| !r.allowed).count(),
        "Entitlements evaluated"
    );

    let value = if sdk {
        let responses: BTreeMap<&String, CheckResponse> = results
            .iter()
            .map(|(feature, result)| (feature, CheckResponse::from(result)))
            .collect();
        serde_json::to_value(responses)?
    } else {
        serde_json::to_value(&results)?
    };
    Ok(value)
}

fn read_snapshot(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display())),
        None => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read snapshot from stdin")?;
            Ok(raw)
        }
    }
}

fn init_tracing(config: &Config) {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&config.log_filter));

    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config);

    let args = Args::parse(std::env::args().skip(1))?;
    let billing = BillingConfig::from_path(&config.billing_config_path)?;

    let raw = read_snapshot(args.snapshot_path.as_ref())?;
    let request: CheckRequest =
        serde_json::from_str(&raw).context("Invalid subscription snapshot")?;

    let output = evaluate(&billing, &request, args.sdk)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use billkit_shared::types::SubscriptionStatus;

    fn args(raw: &[&str]) -> Result<Args> {
        Args::parse(raw.iter().map(|s| s.to_string()))
    }

    fn billing() -> BillingConfig {
        BillingConfig::from_json_str(
            r#"{
                "plans": [{ "slug": "pro", "features": {
                    "seats": { "value_limit": 5 },
                    "sso": { "value_bool": true }
                } }],
                "addons": [{ "slug": "seat-pack", "features": { "seats": { "value_limit": 3 } } }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_args_parse() {
        assert_eq!(args(&[]).unwrap(), Args::default());
        assert_eq!(
            args(&["--sdk", "snap.json"]).unwrap(),
            Args {
                sdk: true,
                snapshot_path: Some(PathBuf::from("snap.json")),
            }
        );
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
    }

    #[test]
    fn test_request_parse() {
        let request: CheckRequest = serde_json::from_str(
            r#"{"plan": "pro", "addons": ["seat-pack"], "status": "past_due", "usage": {"seats": 2}}"#,
        )
        .unwrap();
        assert_eq!(request.subscription.plan, "pro");
        assert_eq!(request.subscription.addons, vec!["seat-pack"]);
        assert_eq!(request.subscription.status, SubscriptionStatus::PastDue);
        assert_eq!(request.usage.get("seats"), Some(&2));
    }

    #[test]
    fn test_evaluate_full_results() {
        let request: CheckRequest = serde_json::from_str(
            r#"{"plan": "pro", "addons": ["seat-pack"], "usage": {"seats": 6, "sso": 0}}"#,
        )
        .unwrap();

        let output = evaluate(&billing(), &request, false).unwrap();
        assert_eq!(
            output,
            serde_json::json!({
                "seats": {
                    "allowed": true,
                    "reason": "included",
                    "remaining": 2,
                    "granted_by": ["pro", "seat-pack"],
                },
                "sso": {
                    "allowed": true,
                    "reason": null,
                    "remaining": null,
                    "granted_by": ["pro"],
                },
            })
        );
    }

    #[test]
    fn test_evaluate_sdk_shape() {
        let request: CheckRequest =
            serde_json::from_str(r#"{"plan": "pro", "usage": {"seats": 5}}"#).unwrap();

        let output = evaluate(&billing(), &request, true).unwrap();
        assert_eq!(
            output,
            serde_json::json!({
                "seats": { "allowed": false, "reason": "limit_reached", "remainingBalance": 0 },
            })
        );
    }

    #[test]
    fn test_evaluate_unknown_plan_is_error() {
        let request: CheckRequest = serde_json::from_str(r#"{"plan": "team"}"#).unwrap();
        assert!(evaluate(&billing(), &request, false).is_err());
    }
}
