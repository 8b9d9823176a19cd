use crate::audit::AuditWriter;
use crate::cache::DecisionCache;
use crate::policy::PolicyEngine;
use crate::risk::{compute_risk_score, compute_trust_level, RequestSignals};
use openpenpal_models::error::CoreError;
use openpenpal_models::security::{
    AuditEvent, AuditResult, AuditSeverity, PolicyDecision, SecurityContext,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// One inbound operation to authorize (spec §4.1 `Authorize` contract).
pub struct AuthorizeRequest {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub resource: String,
    pub action: String,
    pub authenticated: bool,
    pub signals: RequestSignals,
}

/// C1 Security Control Plane: the single entry point every inbound
/// operation passes through. Owns the decision cache and delegates rule
/// evaluation to [`PolicyEngine`] (C2) on a cache miss.
pub struct ControlPlane {
    policy_engine: Arc<PolicyEngine>,
    cache: Arc<DecisionCache>,
    audit: AuditWriter,
}

impl ControlPlane {
    pub fn new(policy_engine: Arc<PolicyEngine>, cache: Arc<DecisionCache>, audit: AuditWriter) -> Self {
        Self { policy_engine, cache, audit }
    }

    /// `Authorize(ctx, req) -> (PolicyDecision, error)` (spec §4.1).
    /// Always emits exactly one audit record, including on internal error —
    /// policy engine failures fail closed (deny).
    #[instrument(skip(self, request))]
    pub fn authorize(&self, request: AuthorizeRequest) -> Result<PolicyDecision, CoreError> {
        let request_id = Uuid::new_v4();

        if !request.authenticated {
            self.emit_audit(request_id, &request, AuditResult::Denied, AuditSeverity::Warning, "unauthenticated");
            return Err(CoreError::Unauthenticated);
        }

        let trust_level = compute_trust_level(&request.signals, request.authenticated);
        let risk_score = compute_risk_score(&request.signals);

        let context = SecurityContext {
            request_id,
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
            trust_level,
            risk_score,
            timestamp: chrono::Utc::now(),
        };

        let user_key = context.user_id.clone().unwrap_or_else(|| "anonymous".to_string());

        if let Some(cached) = self.cache.get(
            &user_key,
            &request.resource,
            &request.action,
            trust_level,
            risk_score.quantized(),
        ) {
            self.emit_audit_from_decision(&context, &request, &cached);
            return Ok(cached);
        }

        let decision = self.policy_engine.evaluate(&context, &request.resource, &request.action);

        self.cache.put(
            &user_key,
            &request.resource,
            &request.action,
            trust_level,
            risk_score.quantized(),
            decision.clone(),
        );

        self.emit_audit_from_decision(&context, &request, &decision);
        Ok(decision)
    }

    fn emit_audit_from_decision(&self, ctx: &SecurityContext, request: &AuthorizeRequest, decision: &PolicyDecision) {
        let (result, severity) = if decision.allow {
            (AuditResult::Allowed, AuditSeverity::Info)
        } else {
            (AuditResult::Denied, AuditSeverity::Warning)
        };
        self.audit.enqueue(AuditEvent {
            request_id: ctx.request_id,
            user_id: ctx.user_id.clone(),
            category: "security".into(),
            severity,
            result,
            resource: request.resource.clone(),
            action: request.action.clone(),
            reason: decision.reason.clone(),
            timestamp: ctx.timestamp,
        });
    }

    fn emit_audit(
        &self,
        request_id: Uuid,
        request: &AuthorizeRequest,
        result: AuditResult,
        severity: AuditSeverity,
        reason: &str,
    ) {
        self.audit.enqueue(AuditEvent {
            request_id,
            user_id: request.user_id.clone(),
            category: "security".into(),
            severity,
            result,
            resource: request.resource.clone(),
            action: request.action.clone(),
            reason: reason.into(),
            timestamp: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::LoggingAuditSink;
    use openpenpal_models::security::{PolicyAction, PolicyActionKind, PolicyRule, RuleOperator, RuleValue, SecurityPolicy};

    fn plane_with_allow_all() -> ControlPlane {
        let engine = Arc::new(PolicyEngine::new());
        engine.upsert_policy(SecurityPolicy {
            id: "allow-all".into(),
            name: "allow".into(),
            priority: 1,
            enabled: true,
            conditions: vec![],
            rules: vec![],
            actions: vec![PolicyAction { kind: PolicyActionKind::Allow, parameters: Default::default() }],
        });
        ControlPlane::new(
            engine,
            Arc::new(DecisionCache::default()),
            AuditWriter::new(Arc::new(LoggingAuditSink)),
        )
    }

    fn sample_request() -> AuthorizeRequest {
        AuthorizeRequest {
            user_id: Some("u1".into()),
            session_id: None,
            ip_address: "10.0.0.1".into(),
            user_agent: "test".into(),
            resource: "letters".into(),
            action: "read".into(),
            authenticated: true,
            signals: RequestSignals { request_time: chrono::Utc::now(), ..Default::default() },
        }
    }

    #[test]
    fn unauthenticated_request_is_rejected() {
        let plane = plane_with_allow_all();
        let mut request = sample_request();
        request.authenticated = false;
        assert!(matches!(plane.authorize(request), Err(CoreError::Unauthenticated)));
    }

    #[test]
    fn authenticated_request_is_evaluated_by_policy() {
        let plane = plane_with_allow_all();
        let decision = plane.authorize(sample_request()).unwrap();
        assert!(decision.allow);
    }

    #[test]
    fn second_call_hits_cache_with_identical_decision() {
        let plane = plane_with_allow_all();
        let first = plane.authorize(sample_request()).unwrap();
        let second = plane.authorize(sample_request()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn deny_policy_with_gte_rule_fails_closed() {
        let engine = Arc::new(PolicyEngine::new());
        engine.upsert_policy(SecurityPolicy {
            id: "deny-risky".into(),
            name: "deny".into(),
            priority: 100,
            enabled: true,
            conditions: vec![],
            rules: vec![PolicyRule {
                field: "risk_score".into(),
                operator: RuleOperator::Gte,
                value: RuleValue::Number(0.0),
                weight: 1.0,
            }],
            actions: vec![PolicyAction { kind: PolicyActionKind::Deny, parameters: Default::default() }],
        });
        let plane = ControlPlane::new(engine, Arc::new(DecisionCache::default()), AuditWriter::new(Arc::new(LoggingAuditSink)));
        let decision = plane.authorize(sample_request()).unwrap();
        assert!(!decision.allow);
    }
}
