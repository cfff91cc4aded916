use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::super::scoring::round_to;
use super::Policy;

const ANNUAL_USAGE_USD: &str = "annual_usage_usd";

/// Outcome class of a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allow,
    Deny,
    AllowWithFee,
    Review,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Allow => "ALLOW",
            Verdict::Deny => "DENY",
            Verdict::AllowWithFee => "ALLOW_WITH_FEE",
            Verdict::Review => "REVIEW",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict plus the trail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub allow: bool,
    pub fee_usd: f64,
    pub actions: Vec<String>,
    pub reasons: Vec<String>,
}

/// Context field a policy reads its usage amount from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UsageField {
    #[default]
    AnnualUsageUsd,
    Named(String),
}

impl UsageField {
    pub fn key(&self) -> &str {
        match self {
            UsageField::AnnualUsageUsd => ANNUAL_USAGE_USD,
            UsageField::Named(name) => name,
        }
    }
}

impl From<String> for UsageField {
    fn from(value: String) -> Self {
        if value == ANNUAL_USAGE_USD {
            UsageField::AnnualUsageUsd
        } else {
            UsageField::Named(value)
        }
    }
}

impl From<UsageField> for String {
    fn from(value: UsageField) -> Self {
        value.key().to_string()
    }
}

impl fmt::Display for UsageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("context field {field} must be a finite number, found {found}")]
    InvalidUsage { field: String, found: String },
}

/// Caller-supplied facts a decision may consult, such as annual usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionContext(BTreeMap<String, Value>);

impl DecisionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_usage(mut self, field: &UsageField, amount: f64) -> Self {
        self.0.insert(field.key().to_string(), Value::from(amount));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Amount stored under `field`; zero when the field is absent or null.
    pub fn usage_amount(&self, field: &UsageField) -> Result<f64, DecisionError> {
        let invalid = |found: &Value| DecisionError::InvalidUsage {
            field: field.key().to_string(),
            found: found.to_string(),
        };

        let amount = match self.0.get(field.key()) {
            None | Some(Value::Null) => return Ok(0.0),
            Some(value @ Value::Number(number)) => number.as_f64().ok_or_else(|| invalid(value))?,
            Some(value @ Value::String(raw)) => {
                raw.trim().parse::<f64>().map_err(|_| invalid(value))?
            }
            Some(other) => return Err(invalid(other)),
        };

        if amount.is_finite() {
            Ok(amount)
        } else {
            Err(invalid(&Value::from(amount.to_string())))
        }
    }
}

impl From<BTreeMap<String, Value>> for DecisionContext {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self(value)
    }
}

/// Map OCS/FOI onto a verdict under `policy`.
///
/// Regions are checked in order: review band, allow, foreign-dominant,
/// fallback deny. A review verdict never carries a fee.
pub fn decide(
    ocs: f64,
    foi: f64,
    policy: &Policy,
    context: &DecisionContext,
) -> Result<Decision, DecisionError> {
    let tau = policy.thresholds.tau_min_ocs;
    let gamma = policy.thresholds.gamma_max_foi;
    let mut reasons = Vec::new();

    if let Some(band) = &policy.review_band {
        if band.contains(ocs, tau) {
            let (low, high) = band.bounds(tau);
            reasons.push(format!("OCS in review band: {ocs:.3} in [{low:?},{high:?})"));
            let decision = Decision {
                verdict: Verdict::Review,
                allow: false,
                fee_usd: 0.0,
                actions: policy.actions.review_actions(),
                reasons,
            };
            log_decision(policy, &decision);
            return Ok(decision);
        }
    }

    let fee_enabled = policy.fee.enabled;
    let (verdict, allow, actions) = if ocs >= tau && foi <= gamma {
        reasons.push(format!(
            "Meets thresholds: OCS={ocs:.3}>=tau={tau:?}, FOI={foi:.2}<=gamma={gamma:?}"
        ));
        (Verdict::Allow, true, policy.actions.allow_actions())
    } else if ocs < tau && foi > gamma {
        reasons.push(format!(
            "Foreign-dominant: OCS={ocs:.3}<tau={tau:?} and FOI={foi:.2}>gamma={gamma:?}"
        ));
        if fee_enabled {
            (Verdict::AllowWithFee, true, policy.actions.allow_actions())
        } else {
            (Verdict::Deny, false, policy.actions.deny_actions())
        }
    } else {
        reasons.push(format!(
            "Does not meet thresholds: OCS={ocs:.3}, FOI={foi:.2}"
        ));
        (Verdict::Deny, false, policy.actions.deny_actions())
    };

    let mut fee_usd = 0.0;
    if allow && fee_enabled {
        let rate = policy.fee.rate;
        let usage = context.usage_amount(&policy.fee.usage_field)?;
        let fee = (usage * rate * (1.0 - ocs)).max(0.0);
        reasons.push(format!(
            "Fee computed: U={usage:?} rate={rate:?} (1-OCS)={:.3} => fee={fee:.2}",
            1.0 - ocs
        ));
        fee_usd = round_to(fee, 2);
    }

    let decision = Decision {
        verdict,
        allow,
        fee_usd,
        actions,
        reasons,
    };
    log_decision(policy, &decision);
    Ok(decision)
}

fn log_decision(policy: &Policy, decision: &Decision) {
    info!(
        policy = %policy.name,
        verdict = %decision.verdict,
        allow = decision.allow,
        fee_usd = decision.fee_usd,
        "policy decision"
    );
}
