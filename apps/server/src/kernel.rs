use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::state::{AppState, SystemMode};
use openpenpal_courier::CourierService;
use openpenpal_credit::{LoggingNotificationSink, StoreCreditLedger};
use openpenpal_directory::Directory;
use openpenpal_letters::LettersService;
use openpenpal_models::circuit::CircuitConfig;
use openpenpal_models::security::{PolicyAction, PolicyActionKind, PolicyRule, RuleOperator, RuleValue, SecurityPolicy};
use openpenpal_realtime::{Hub, HubEventPublisher};
use openpenpal_resilience::CircuitBreakerRegistry;
use openpenpal_security::{AuditWriter, ControlPlane, DecisionCache, PolicyEngine};
use openpenpal_store::{
    AuditRepository, BarcodeRepository, CourierRepository, CreditRepository, LetterRepository, OpCodeRepository,
    StoreAuditSink, StoreClient, UserRepository,
};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// Downstream the transport shell protects with the `store` circuit (spec
/// §4.3); all persistence goes through one `StoreClient` pool so one
/// circuit covers it.
const STORE_CIRCUIT: &str = "store";

/// Wires C1-C8 together and produces the state every handler shares (spec
/// §9 composition root). Connects the store, seeds the policy engine,
/// registers the store circuit, and starts the registry's two background
/// daemons.
pub async fn build_app_state(config: Config) -> anyhow::Result<AppState> {
    let client = StoreClient::connect(&config.database_url).await?;

    let policy_engine = Arc::new(PolicyEngine::new());
    seed_default_policies(&policy_engine);

    let decision_cache = Arc::new(DecisionCache::default());
    spawn_cache_eviction(decision_cache.clone());

    let audit = AuditWriter::new(Arc::new(StoreAuditSink::new(AuditRepository::new(client.clone()))));
    let control_plane = Arc::new(ControlPlane::new(policy_engine, decision_cache, audit));

    let circuit_breakers = Arc::new(CircuitBreakerRegistry::new());
    circuit_breakers.register(STORE_CIRCUIT, CircuitConfig { adaptive: true, ..Default::default() }, now_millis());
    circuit_breakers.clone().spawn_adaptation_daemon();
    circuit_breakers.clone().spawn_maintenance_daemon();

    let directory = Directory::new(OpCodeRepository::new(client.clone()));
    let courier_repository = CourierRepository::new(client.clone());
    let courier = CourierService::new(courier_repository.clone());

    let hub = Arc::new(Hub::new());
    let credit = Arc::new(StoreCreditLedger::new(CreditRepository::new(client.clone())));
    let events = Arc::new(HubEventPublisher::new(hub.clone()));
    let notifications = Arc::new(LoggingNotificationSink);
    let letters = Arc::new(LettersService::new(
        LetterRepository::new(client.clone()),
        BarcodeRepository::new(client.clone()),
        directory.clone(),
        credit,
        events,
        notifications,
    ));

    let users = UserRepository::new(client.clone());
    let token_verifier = Arc::new(JwtVerifier::new(&config.jwt_secret));

    Ok(AppState {
        control_plane,
        circuit_breakers,
        directory,
        courier,
        courier_repository,
        letters,
        users,
        hub,
        token_verifier,
        system_mode: Arc::new(RwLock::new(SystemMode::Operational)),
        config: Arc::new(config),
    })
}

/// The policy engine defaults to deny-everything once any policy exists
/// (spec §4.2 "if zero policies apply, default decision is deny"); with an
/// empty set every single request would be denied instead. Seed a
/// low-priority catch-all allow plus a high-priority deny for elevated
/// risk, so the "no applicable policy" default only bites requests
/// nothing else covers.
fn seed_default_policies(engine: &PolicyEngine) {
    engine.upsert_policy(SecurityPolicy {
        id: "default-allow".into(),
        name: "Default allow for authenticated traffic".into(),
        priority: 0,
        enabled: true,
        conditions: vec![],
        rules: vec![],
        actions: vec![PolicyAction { kind: PolicyActionKind::Allow, parameters: Default::default() }],
    });

    engine.upsert_policy(SecurityPolicy {
        id: "deny-elevated-risk".into(),
        name: "Deny requests scored above the elevated-risk threshold".into(),
        priority: 100,
        enabled: true,
        conditions: vec![],
        rules: vec![PolicyRule {
            field: "risk_score".into(),
            operator: RuleOperator::Gte,
            value: RuleValue::Number(0.8),
            weight: 1.0,
        }],
        actions: vec![PolicyAction { kind: PolicyActionKind::Deny, parameters: Default::default() }],
    });
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Evicts expired decision-cache entries on `DecisionCache::cleanup_interval()`
/// (spec §4.2). Runs for the lifetime of the process; the token is here so
/// a future graceful-shutdown path has something to cancel against.
fn spawn_cache_eviction(cache: Arc<DecisionCache>) {
    let token = CancellationToken::new();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(DecisionCache::cleanup_interval());
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = cache.evict_expired();
                    tracing::debug!(evicted, "decision cache eviction pass");
                }
                _ = token.cancelled() => break,
            }
        }
    });
}
