use async_trait::async_trait;
use chrono::Utc;
use openpenpal_letters::CreditLedger;
use openpenpal_models::credit::{CreditTransaction, IdempotencyKey};
use openpenpal_store::CreditRepository;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Adapts `CreditRepository`'s unique-constraint idempotency to the narrow
/// `CreditLedger` interface `openpenpal-letters` (and, eventually,
/// `openpenpal-courier`) depend on (spec §4.8/§9).
pub struct StoreCreditLedger {
    repository: CreditRepository,
}

impl StoreCreditLedger {
    pub fn new(repository: CreditRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl CreditLedger for StoreCreditLedger {
    #[instrument(skip(self))]
    async fn reward(&self, key: IdempotencyKey, amount: i64) -> bool {
        let tx = CreditTransaction {
            id: Uuid::new_v4(),
            user_id: key.user_id,
            reason_code: key.reason_code,
            reference_id: key.reference_id,
            amount,
            created_at: Utc::now(),
        };

        match self.repository.record(&tx).await {
            Ok(recorded) => recorded,
            Err(err) => {
                warn!(error = %err, "credit award failed, treating as not recorded");
                false
            }
        }
    }
}
