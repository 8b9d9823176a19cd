use chrono::{DateTime, Timelike, Utc};
use openpenpal_models::security::{RiskScore, TrustLevel};

/// Raw signals gathered by the transport layer before a [`super::control_plane::ControlPlane`]
/// call. Each factor is pre-normalized to `[0,1]`; this module only does the
/// weighting, never the extraction.
#[derive(Debug, Clone, Default)]
pub struct RequestSignals {
    pub unrecognized_ip: bool,
    pub failed_login_proximity: f64,
    pub sensitive_op_velocity: f64,
    pub known_bad_geo: bool,
    pub distance_from_usual_location_km: f64,
    pub has_mfa: bool,
    pub device_recognized: bool,
    pub password_only: bool,
    pub request_time: DateTime<Utc>,
}

const BEHAVIORAL_WEIGHT: f64 = 0.30;
const TECHNICAL_WEIGHT: f64 = 0.20;
const GEOGRAPHIC_WEIGHT: f64 = 0.20;
const TEMPORAL_WEIGHT: f64 = 0.10;
const CONTEXTUAL_WEIGHT: f64 = 0.20;

/// Weighted sum of five normalized factor groups (spec §4.1).
pub fn compute_risk_score(signals: &RequestSignals) -> RiskScore {
    let behavioral = signals.failed_login_proximity.clamp(0.0, 1.0);
    let technical = if signals.unrecognized_ip { 1.0 } else { 0.0 };
    let geographic = geographic_factor(signals);
    let temporal = if is_off_hours(signals.request_time) { 1.0 } else { 0.0 };
    let contextual = signals.sensitive_op_velocity.clamp(0.0, 1.0);

    let score = BEHAVIORAL_WEIGHT * behavioral
        + TECHNICAL_WEIGHT * technical
        + GEOGRAPHIC_WEIGHT * geographic
        + TEMPORAL_WEIGHT * temporal
        + CONTEXTUAL_WEIGHT * contextual;

    RiskScore::new(score)
}

fn geographic_factor(signals: &RequestSignals) -> f64 {
    if signals.known_bad_geo {
        return 1.0;
    }
    (signals.distance_from_usual_location_km / 1000.0).clamp(0.0, 1.0)
}

/// Off-hours window per spec §4.1: before 6am or after 10pm local.
fn is_off_hours(at: DateTime<Utc>) -> bool {
    let hour = at.hour();
    hour < 6 || hour > 22
}

/// Authentication-strength ladder feeding `TrustLevel` (spec §3/§4.1).
pub fn compute_trust_level(signals: &RequestSignals, authenticated: bool) -> TrustLevel {
    if !authenticated {
        return TrustLevel::Deny;
    }
    match (signals.has_mfa, signals.device_recognized, signals.password_only) {
        (true, true, _) => TrustLevel::Complete,
        (true, false, _) => TrustLevel::High,
        (false, true, _) => TrustLevel::Medium,
        (false, false, false) => TrustLevel::Medium,
        (false, false, true) => TrustLevel::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_signals() -> RequestSignals {
        RequestSignals {
            request_time: "2026-01-01T12:00:00Z".parse().unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn clean_request_scores_near_zero() {
        let score = compute_risk_score(&base_signals());
        assert!(score.value() < 0.1);
    }

    #[test]
    fn unrecognized_ip_and_off_hours_raise_score() {
        let mut signals = base_signals();
        signals.unrecognized_ip = true;
        signals.request_time = "2026-01-01T03:00:00Z".parse().unwrap();
        let score = compute_risk_score(&signals);
        assert!(score.value() >= TECHNICAL_WEIGHT + TEMPORAL_WEIGHT - 1e-9);
    }

    #[test]
    fn full_mfa_and_known_device_yields_complete_trust() {
        let signals = RequestSignals {
            has_mfa: true,
            device_recognized: true,
            ..base_signals()
        };
        assert_eq!(compute_trust_level(&signals, true), TrustLevel::Complete);
    }

    #[test]
    fn unauthenticated_is_always_deny() {
        assert_eq!(compute_trust_level(&base_signals(), false), TrustLevel::Deny);
    }
}
