use openpenpal_models::security::{
    PolicyAction, PolicyActionKind, PolicyCondition, PolicyDecision, PolicyRule, RuleOperator,
    RuleValue, SecurityContext, SecurityPolicy,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Evaluates prioritized rule sets against a `SecurityContext` (spec C2).
///
/// Holds its policy set behind a single reader/writer lock — read-heavy,
/// written only on reload (`upsert_policy`/`remove_policy`).
pub struct PolicyEngine {
    policies: RwLock<HashMap<String, SecurityPolicy>>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
        }
    }

    pub fn upsert_policy(&self, policy: SecurityPolicy) {
        if let Ok(mut guard) = self.policies.write() {
            guard.insert(policy.id.clone(), policy);
        }
    }

    pub fn remove_policy(&self, id: &str) {
        if let Ok(mut guard) = self.policies.write() {
            guard.remove(id);
        }
    }

    /// `Evaluate` (spec §4.2). Selects enabled policies whose conditions
    /// hold, sorts by priority descending, and folds their actions into one
    /// decision. A `Deny` action anywhere short-circuits the remainder.
    pub fn evaluate(&self, ctx: &SecurityContext, resource: &str, action: &str) -> PolicyDecision {
        let guard = match self.policies.read() {
            Ok(g) => g,
            Err(_) => return PolicyDecision::deny("policy store unavailable"),
        };

        let mut applicable: Vec<&SecurityPolicy> = guard
            .values()
            .filter(|p| p.enabled && conditions_hold(p, ctx, resource, action))
            .collect();
        applicable.sort_by(|a, b| b.priority.cmp(&a.priority));

        if applicable.is_empty() {
            return PolicyDecision::deny("no applicable policy");
        }

        let mut permissions = Vec::new();
        let mut actions = Vec::new();
        let mut allow = false;

        for policy in applicable {
            if !policy_passes(policy, ctx) {
                continue;
            }

            for policy_action in &policy.actions {
                match policy_action.kind {
                    PolicyActionKind::Deny => {
                        return PolicyDecision {
                            allow: false,
                            permissions: Vec::new(),
                            actions: vec![policy_action.clone()],
                            reason: format!("denied by policy {}", policy.id),
                        };
                    }
                    PolicyActionKind::Allow => allow = true,
                    PolicyActionKind::Require2Fa | PolicyActionKind::Log => {}
                }
                actions.push(policy_action.clone());
            }

            permissions.push(openpenpal_models::security::Permission {
                resource: resource.to_string(),
                action: action.to_string(),
                scope: policy.id.clone(),
                ttl_seconds: 300,
            });
        }

        permissions.sort_by(|a, b| (&a.resource, &a.action, &a.scope).cmp(&(&b.resource, &b.action, &b.scope)));
        permissions.dedup_by(|a, b| a.resource == b.resource && a.action == b.action && a.scope == b.scope);

        PolicyDecision {
            allow,
            permissions,
            actions,
            reason: if allow { "allowed by policy".into() } else { "no allow action matched".into() },
        }
    }
}

fn conditions_hold(policy: &SecurityPolicy, ctx: &SecurityContext, resource: &str, action: &str) -> bool {
    policy
        .conditions
        .iter()
        .all(|c| evaluate_condition(c, ctx, resource, action))
}

fn evaluate_condition(condition: &PolicyCondition, ctx: &SecurityContext, resource: &str, action: &str) -> bool {
    match resolve_field(&condition.field, ctx, resource, action) {
        Some(actual) => apply_operator(condition.operator, &actual, &condition.value),
        None => false,
    }
}

/// `policy passes iff Σpassed.weight / Σtotal.weight ≥ 0.5` (spec §3).
fn policy_passes(policy: &SecurityPolicy, ctx: &SecurityContext) -> bool {
    if policy.rules.is_empty() {
        return true;
    }

    let mut passed_weight = 0.0;
    let mut total_weight = 0.0;

    for rule in &policy.rules {
        total_weight += rule.weight;
        if evaluate_rule(rule, ctx) {
            passed_weight += rule.weight;
        }
    }

    if total_weight <= 0.0 {
        return true;
    }

    passed_weight / total_weight >= 0.5
}

fn evaluate_rule(rule: &PolicyRule, ctx: &SecurityContext) -> bool {
    match resolve_field(&rule.field, ctx, "", "") {
        Some(actual) => apply_operator(rule.operator, &actual, &rule.value),
        None => {
            warn!(field = %rule.field, "policy rule references unknown field, treating as failed");
            false
        }
    }
}

fn resolve_field(field: &str, ctx: &SecurityContext, resource: &str, action: &str) -> Option<RuleValue> {
    match field {
        "risk_score" => Some(RuleValue::Number(ctx.risk_score.value())),
        "trust_level" => Some(RuleValue::Number(trust_level_rank(ctx.trust_level) as f64)),
        "resource" if !resource.is_empty() => Some(RuleValue::Text(resource.to_string())),
        "action" if !action.is_empty() => Some(RuleValue::Text(action.to_string())),
        "user_id" => ctx.user_id.clone().map(RuleValue::Text),
        "ip_address" => Some(RuleValue::Text(ctx.ip_address.clone())),
        _ => None,
    }
}

fn trust_level_rank(level: openpenpal_models::security::TrustLevel) -> u8 {
    use openpenpal_models::security::TrustLevel::*;
    match level {
        Deny => 0,
        Low => 1,
        Medium => 2,
        High => 3,
        Complete => 4,
    }
}

fn apply_operator(operator: RuleOperator, actual: &RuleValue, expected: &RuleValue) -> bool {
    match (operator, actual, expected) {
        (RuleOperator::Eq, RuleValue::Text(a), RuleValue::Text(b)) => glob_match(b, a),
        (RuleOperator::Eq, RuleValue::Number(a), RuleValue::Number(b)) => (a - b).abs() < f64::EPSILON,
        (RuleOperator::Gt, RuleValue::Number(a), RuleValue::Number(b)) => a > b,
        (RuleOperator::Gte, RuleValue::Number(a), RuleValue::Number(b)) => a >= b,
        (RuleOperator::Lt, RuleValue::Number(a), RuleValue::Number(b)) => a < b,
        (RuleOperator::Lte, RuleValue::Number(a), RuleValue::Number(b)) => a <= b,
        (RuleOperator::Regex, RuleValue::Text(a), RuleValue::Text(pattern)) => {
            Regex::new(pattern).map(|re| re.is_match(a)).unwrap_or_else(|e| {
                warn!(error = %e, pattern, "invalid policy regex, treating as no match");
                false
            })
        }
        (RuleOperator::InRange, RuleValue::Number(a), RuleValue::Range(lo, hi)) => a >= lo && a <= hi,
        _ => {
            debug!(?operator, "operator/value type mismatch, rule fails");
            false
        }
    }
}

/// Glob support limited to a trailing `*` wildcard, matching the spec's
/// "regex-style glob" phrasing for `resource` matching without pulling in a
/// full glob crate for one use-site.
fn glob_match(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpenpal_models::security::{RiskScore, TrustLevel};
    use uuid::Uuid;

    fn ctx(risk: f64) -> SecurityContext {
        SecurityContext {
            request_id: Uuid::new_v4(),
            user_id: Some("u1".into()),
            session_id: None,
            ip_address: "10.0.0.1".into(),
            user_agent: "test".into(),
            trust_level: TrustLevel::Medium,
            risk_score: RiskScore::new(risk),
            timestamp: chrono::Utc::now(),
        }
    }

    fn deny_policy(priority: i32, risk_threshold: f64) -> SecurityPolicy {
        SecurityPolicy {
            id: "deny-high-risk".into(),
            name: "Deny high risk".into(),
            priority,
            enabled: true,
            conditions: vec![],
            rules: vec![PolicyRule {
                field: "risk_score".into(),
                operator: RuleOperator::Gte,
                value: RuleValue::Number(risk_threshold),
                weight: 1.0,
            }],
            actions: vec![PolicyAction { kind: PolicyActionKind::Deny, parameters: Default::default() }],
        }
    }

    fn allow_policy(priority: i32) -> SecurityPolicy {
        SecurityPolicy {
            id: "allow-all".into(),
            name: "Allow".into(),
            priority,
            enabled: true,
            conditions: vec![],
            rules: vec![],
            actions: vec![PolicyAction { kind: PolicyActionKind::Allow, parameters: Default::default() }],
        }
    }

    #[test]
    fn deny_short_circuits_lower_priority_allow() {
        let engine = PolicyEngine::new();
        engine.upsert_policy(deny_policy(200, 0.8));
        engine.upsert_policy(allow_policy(50));

        let decision = engine.evaluate(&ctx(0.85), "letters", "read");
        assert!(!decision.allow);
        assert_eq!(decision.actions.len(), 1);
    }

    #[test]
    fn no_applicable_policy_defaults_to_deny() {
        let engine = PolicyEngine::new();
        let decision = engine.evaluate(&ctx(0.1), "letters", "read");
        assert!(!decision.allow);
    }

    #[test]
    fn low_risk_passes_to_allow() {
        let engine = PolicyEngine::new();
        engine.upsert_policy(deny_policy(200, 0.8));
        engine.upsert_policy(allow_policy(50));

        let decision = engine.evaluate(&ctx(0.1), "letters", "read");
        assert!(decision.allow);
    }
}
