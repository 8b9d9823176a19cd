use crate::auth::TokenVerifier;
use crate::config::Config;
use openpenpal_courier::CourierService;
use openpenpal_directory::Directory;
use openpenpal_letters::LettersService;
use openpenpal_realtime::Hub;
use openpenpal_resilience::CircuitBreakerRegistry;
use openpenpal_security::ControlPlane;
use openpenpal_store::{CourierRepository, UserRepository};
use std::sync::{Arc, RwLock};

/// Liveness gate consulted by [`crate::middleware::health_guard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemMode {
    Operational,
    Maintenance(String),
}

impl SystemMode {
    pub fn is_operational(&self) -> Result<(), String> {
        match self {
            SystemMode::Operational => Ok(()),
            SystemMode::Maintenance(reason) => Err(reason.clone()),
        }
    }
}

/// Composition-root state shared by every handler (spec §9 "lifetime-scoped
/// services owned by a composition root"). Every field is cheap to clone —
/// either an `Arc` or a handle type that itself wraps one.
#[derive(Clone)]
pub struct AppState {
    pub control_plane: Arc<ControlPlane>,
    pub circuit_breakers: Arc<CircuitBreakerRegistry>,
    pub directory: Directory,
    pub courier: CourierService,
    pub courier_repository: CourierRepository,
    pub letters: Arc<LettersService>,
    pub users: UserRepository,
    pub hub: Arc<Hub>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub system_mode: Arc<RwLock<SystemMode>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn is_operational(&self) -> Result<(), String> {
        self.system_mode.read().expect("system mode lock poisoned").is_operational()
    }
}
