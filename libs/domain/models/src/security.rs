use crate::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discrete assessment of session authenticity (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Deny,
    Low,
    Medium,
    High,
    Complete,
}

/// Continuous `[0,1]` assessment of request danger. Clamped on construction
/// so every consumer can treat the stored value as already valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore(f64);

impl RiskScore {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Buckets to the nearest 0.1, used by the policy decision cache key.
    pub fn quantized(&self) -> u8 {
        (self.0 * 10.0).round().clamp(0.0, 10.0) as u8
    }
}

impl Default for RiskScore {
    fn default() -> Self {
        Self(0.0)
    }
}

/// Per-request security context. Lives only for the duration of one request
/// and is never persisted directly (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityContext {
    pub request_id: Uuid,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub trust_level: TrustLevel,
    pub risk_score: RiskScore,
    pub timestamp: DateTime<Utc>,
}

/// One resource/action/scope grant produced by a `PolicyDecision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub action: String,
    pub scope: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyActionKind {
    Allow,
    Deny,
    Require2Fa,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyAction {
    pub kind: PolicyActionKind,
    #[serde(default)]
    pub parameters: Metadata,
}

/// Immutable decision emitted by the policy engine (spec §3). Once built,
/// nothing mutates it — a cache hit and a fresh evaluation must be
/// bit-identical for the same inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allow: bool,
    pub permissions: Vec<Permission>,
    pub actions: Vec<PolicyAction>,
    pub reason: String,
}

impl PolicyDecision {
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            permissions: Vec::new(),
            actions: Vec::new(),
            reason: reason.into(),
        }
    }
}

/// A closed operator set for policy rules — no reflection, no arbitrary
/// predicates (spec §9 design note).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Regex,
    InRange,
}

/// A small tagged union for rule values, rather than arbitrary `any`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Text(String),
    Number(f64),
    Range(f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub field: String,
    pub operator: RuleOperator,
    pub value: RuleValue,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCondition {
    pub field: String,
    pub operator: RuleOperator,
    pub value: RuleValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    pub conditions: Vec<PolicyCondition>,
    pub rules: Vec<PolicyRule>,
    pub actions: Vec<PolicyAction>,
}

/// Severity of an audit event, independent of the outcome it records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditResult {
    Allowed,
    Denied,
}

/// An append-only record derived from a `SecurityContext` and its decision.
/// Never constructed from a persisted context — only from the request-scoped
/// one that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub request_id: Uuid,
    pub user_id: Option<String>,
    pub category: String,
    pub severity: AuditSeverity,
    pub result: AuditResult,
    pub resource: String,
    pub action: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_score_clamps_out_of_range_input() {
        assert_eq!(RiskScore::new(1.5).value(), 1.0);
        assert_eq!(RiskScore::new(-0.5).value(), 0.0);
    }

    #[test]
    fn risk_score_quantizes_to_nearest_tenth() {
        assert_eq!(RiskScore::new(0.84).quantized(), 8);
        assert_eq!(RiskScore::new(0.86).quantized(), 9);
    }
}
