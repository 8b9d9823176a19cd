use openpenpal_models::security::{PolicyDecision, TrustLevel};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::instrument;

const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: String,
    resource: String,
    action: String,
    trust_level: TrustLevel,
    risk_bucket: u8,
}

struct CachedDecision {
    decision: PolicyDecision,
    expires_at: Instant,
}

/// In-memory policy decision cache (spec §4.2). One reader/writer lock,
/// read-heavy; writes only on insert and background eviction.
pub struct DecisionCache {
    entries: RwLock<HashMap<CacheKey, CachedDecision>>,
    ttl: Duration,
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl DecisionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(
        &self,
        user_id: &str,
        resource: &str,
        action: &str,
        trust_level: TrustLevel,
        risk_bucket: u8,
    ) -> Option<PolicyDecision> {
        let key = CacheKey {
            user_id: user_id.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            trust_level,
            risk_bucket,
        };
        let guard = self.entries.read().ok()?;
        let cached = guard.get(&key)?;
        if cached.expires_at > Instant::now() {
            Some(cached.decision.clone())
        } else {
            None
        }
    }

    pub fn put(
        &self,
        user_id: &str,
        resource: &str,
        action: &str,
        trust_level: TrustLevel,
        risk_bucket: u8,
        decision: PolicyDecision,
    ) {
        let key = CacheKey {
            user_id: user_id.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            trust_level,
            risk_bucket,
        };
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(
                key,
                CachedDecision {
                    decision,
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
    }

    #[instrument(skip(self))]
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = match self.entries.write() {
            Ok(g) => g,
            Err(_) => return 0,
        };
        let before = guard.len();
        guard.retain(|_, cached| cached.expires_at > now);
        before - guard.len()
    }

    pub fn cleanup_interval() -> Duration {
        CLEANUP_INTERVAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpenpal_models::security::PolicyDecision;

    #[test]
    fn hit_returns_identical_decision_within_ttl() {
        let cache = DecisionCache::new(Duration::from_secs(60));
        let decision = PolicyDecision {
            allow: true,
            permissions: vec![],
            actions: vec![],
            reason: "ok".into(),
        };
        cache.put("u1", "letters", "read", TrustLevel::High, 2, decision.clone());
        let hit = cache.get("u1", "letters", "read", TrustLevel::High, 2);
        assert_eq!(hit, Some(decision));
    }

    #[test]
    fn miss_on_different_key() {
        let cache = DecisionCache::new(Duration::from_secs(60));
        assert!(cache.get("u1", "letters", "read", TrustLevel::High, 2).is_none());
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = DecisionCache::new(Duration::from_millis(1));
        cache.put(
            "u1",
            "letters",
            "read",
            TrustLevel::High,
            2,
            PolicyDecision::deny("x"),
        );
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.evict_expired(), 1);
    }
}
