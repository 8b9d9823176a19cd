use crate::codegen::generate_candidate;
use crate::locks::BarcodeLocks;
use crate::sideeffects::{CreditLedger, EventPublisher, NotificationSink};
use crate::transitions::is_allowed;
use chrono::{Duration, Utc};
use openpenpal_directory::Directory;
use openpenpal_models::credit::{IdempotencyKey, OutboundNotification};
use openpenpal_models::error::CoreError;
use openpenpal_models::letter::{BarcodeStatus, Letter, LetterCode, LetterStatus, LetterVisibility, StatusLog};
use openpenpal_models::opcode::OpCode;
use openpenpal_models::realtime::{RealtimePayload, RoomId};
use openpenpal_store::{BarcodeRepository, LetterRepository, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

const MAX_CODE_GENERATION_ATTEMPTS: u32 = 5;
const BARCODE_VALIDITY_DAYS: i64 = 30;

// Reward amounts aren't pinned by the contract beyond "reward X" — chosen
// to keep `delivered` worth more than the passive `read` acknowledgment.
const DELIVERED_REWARD_AMOUNT: i64 = 10;
const READ_REWARD_AMOUNT: i64 = 5;

/// C6 entry point: letter drafting plus the barcode lifecycle state
/// machine, including its credit/notification/realtime side effects
/// (spec §4.6/§4.8).
pub struct LettersService {
    letters: LetterRepository,
    barcodes: BarcodeRepository,
    directory: Directory,
    locks: BarcodeLocks,
    credit: Arc<dyn CreditLedger>,
    events: Arc<dyn EventPublisher>,
    notifications: Arc<dyn NotificationSink>,
}

impl LettersService {
    pub fn new(
        letters: LetterRepository,
        barcodes: BarcodeRepository,
        directory: Directory,
        credit: Arc<dyn CreditLedger>,
        events: Arc<dyn EventPublisher>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self { letters, barcodes, directory, locks: BarcodeLocks::new(), credit, events, notifications }
    }

    pub async fn create_draft(&self, author_id: Uuid, title: String, content: String, style: String, visibility: LetterVisibility) -> Result<Letter, CoreError> {
        let letter = Letter {
            id: Uuid::new_v4(),
            author_id,
            title,
            content,
            style,
            status: LetterStatus::Draft,
            visibility,
            like_count: 0,
            sender_opcode: None,
            recipient_opcode: None,
            created_at: Utc::now(),
        };
        self.letters.insert(&letter).await.map_err(map_store_error)?;
        Ok(letter)
    }

    pub async fn get_letter(&self, id: Uuid) -> Result<Letter, CoreError> {
        self.letters.get(id).await.map_err(map_store_error)
    }

    pub async fn list_by_author(&self, author_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Letter>, CoreError> {
        self.letters.list_by_author(author_id, limit, offset).await.map_err(map_store_error)
    }

    pub async fn list_public(&self, limit: i64, offset: i64) -> Result<Vec<Letter>, CoreError> {
        self.letters.list_public(limit, offset).await.map_err(map_store_error)
    }

    /// `GenerateBarcode(letterID) → LetterCode`. Retries with fresh
    /// randomness on collision, bounded (spec §4.6).
    #[instrument(skip(self))]
    pub async fn generate_barcode(&self, letter_id: Uuid) -> Result<LetterCode, CoreError> {
        let expires_at = Utc::now() + Duration::days(BARCODE_VALIDITY_DAYS);

        for attempt in 0..MAX_CODE_GENERATION_ATTEMPTS {
            let code = LetterCode {
                code: generate_candidate(),
                letter_id,
                envelope_id: None,
                status: BarcodeStatus::Unactivated,
                bound_at: None,
                delivered_at: None,
                last_scanned_by: None,
                last_scanned_at: None,
                scan_count: 0,
                recipient_opcode: None,
                expires_at,
                version: 0,
            };

            match self.barcodes.insert(&code).await {
                Ok(()) => {
                    self.letters.update_status(letter_id, LetterStatus::Generated).await.map_err(map_store_error)?;
                    return Ok(code);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(letter_id = %letter_id, attempt, "barcode collision, retrying");
                    continue;
                }
                Err(other) => return Err(map_store_error(other)),
            }
        }

        Err(CoreError::Internal("exhausted barcode generation attempts".into()))
    }

    /// `BindBarcode`. Only from `Unactivated`; validates OP-Code format and
    /// the operator's permission over it via C4 (spec §4.6).
    #[instrument(skip(self))]
    pub async fn bind_barcode(&self, code: &str, recipient_opcode_raw: &str, operator_id: Uuid, operator_prefixes: &HashSet<String>) -> Result<(), CoreError> {
        let recipient_opcode = self
            .directory
            .validate_format(recipient_opcode_raw)
            .map_err(|e| CoreError::InvalidInput(e.to_string()))?;

        if !self.directory.check_permission(operator_prefixes, &recipient_opcode) {
            return Err(CoreError::Forbidden("operator lacks permission over this opcode".into()));
        }

        let _guard = self.locks.lock(code).await;
        let current = self.barcodes.get(code).await.map_err(map_store_error)?;

        if current.status != BarcodeStatus::Unactivated {
            return Err(CoreError::InvalidTransition { from: current.status.to_string(), to: "Bound".into() });
        }

        let now = Utc::now();
        self.barcodes
            .apply_transition(code, current.version, BarcodeStatus::Bound, None, None, Some(now), None, Some(&recipient_opcode))
            .await
            .map_err(map_store_error)?;

        self.append_log(current.letter_id, BarcodeStatus::Bound, operator_id, None, None).await?;
        Ok(())
    }

    /// `UpdateBarcodeStatus`. Serialized per barcode; rejects anything not
    /// in the allowed-transition table without mutating state (spec §4.6).
    #[instrument(skip(self))]
    pub async fn update_barcode_status(
        &self,
        code: &str,
        new_status: BarcodeStatus,
        operator_id: Uuid,
        location: Option<String>,
        note: Option<String>,
    ) -> Result<(), CoreError> {
        let _guard = self.locks.lock(code).await;
        let current = self.barcodes.get(code).await.map_err(map_store_error)?;

        if !is_allowed(current.status, new_status) {
            return Err(CoreError::InvalidTransition { from: current.status.to_string(), to: new_status.to_string() });
        }

        let now = Utc::now();
        let delivered_at = if new_status == BarcodeStatus::Delivered { Some(now) } else { None };

        self.barcodes
            .apply_transition(code, current.version, new_status, Some(operator_id), Some(now), None, delivered_at, None)
            .await
            .map_err(map_store_error)?;

        self.append_log(current.letter_id, new_status, operator_id, location, note).await?;

        self.letters.update_status(current.letter_id, letter_status_for(new_status)).await.map_err(map_store_error)?;

        if new_status == BarcodeStatus::Delivered {
            self.on_delivered(&current).await;
        }

        Ok(())
    }

    pub async fn get_barcode_status(&self, code: &str) -> Result<LetterCode, CoreError> {
        self.barcodes.get(code).await.map_err(map_store_error)
    }

    /// `MarkAsRead(barcode, userID)`: advances `LetterStatus` to `Read`
    /// plus its own side effects, kept distinct from `UpdateBarcodeStatus`
    /// because it is triggered by the recipient, not an operator scan. The
    /// barcode itself has no `Read` state — it stays at `Delivered`; only
    /// the scan bookkeeping (who, when) changes.
    #[instrument(skip(self))]
    pub async fn mark_as_read(&self, code: &str, user_id: Uuid) -> Result<(), CoreError> {
        let _guard = self.locks.lock(code).await;
        let current = self.barcodes.get(code).await.map_err(map_store_error)?;

        if current.status != BarcodeStatus::Delivered {
            return Err(CoreError::InvalidTransition { from: current.status.to_string(), to: "read".into() });
        }

        let now = Utc::now();
        self.barcodes
            .apply_transition(code, current.version, BarcodeStatus::Delivered, Some(user_id), Some(now), None, None, None)
            .await
            .map_err(map_store_error)?;

        self.letters.update_status(current.letter_id, LetterStatus::Read).await.map_err(map_store_error)?;

        let letter = self.letters.get(current.letter_id).await.map_err(map_store_error)?;
        self.events
            .publish(RoomId::user(letter.author_id), RealtimePayload::NotificationNew {
                title: "Your letter was read".into(),
                body: format!("Letter {} was read", letter.id),
            })
            .await;
        self.credit
            .reward(IdempotencyKey { user_id, reason_code: "read".into(), reference_id: current.letter_id.to_string() }, READ_REWARD_AMOUNT)
            .await;

        Ok(())
    }

    async fn on_delivered(&self, code: &LetterCode) {
        let Ok(letter) = self.letters.get(code.letter_id).await else {
            warn!(letter_id = %code.letter_id, "letter vanished during delivery side effects");
            return;
        };

        self.credit
            .reward(
                IdempotencyKey { user_id: letter.author_id, reason_code: "delivered".into(), reference_id: letter.id.to_string() },
                DELIVERED_REWARD_AMOUNT,
            )
            .await;

        self.events
            .publish(
                RoomId::letter(letter.id),
                RealtimePayload::LetterStatusUpdate { letter_id: letter.id, status: "delivered".into() },
            )
            .await;
        self.events
            .publish(
                RoomId::user(letter.author_id),
                RealtimePayload::LetterStatusUpdate { letter_id: letter.id, status: "delivered".into() },
            )
            .await;

        if let Some(recipient_opcode) = &code.recipient_opcode {
            self.notifications
                .notify(OutboundNotification {
                    user_id: letter.author_id,
                    title: "Letter delivered".into(),
                    body: format!("Delivered to {recipient_opcode}"),
                    reference_id: letter.id.to_string(),
                })
                .await;
        }
    }

    async fn append_log(
        &self,
        letter_id: Uuid,
        to_status: BarcodeStatus,
        operator_id: Uuid,
        location: Option<String>,
        note: Option<String>,
    ) -> Result<(), CoreError> {
        let log = StatusLog { id: Uuid::new_v4(), letter_id, to_status, operator_id, location, note, timestamp: Utc::now() };
        self.barcodes.insert_status_log(&log).await.map_err(map_store_error)
    }
}

fn letter_status_for(barcode_status: BarcodeStatus) -> LetterStatus {
    match barcode_status {
        BarcodeStatus::Unactivated => LetterStatus::Generated,
        BarcodeStatus::Bound => LetterStatus::Collected,
        BarcodeStatus::InTransit => LetterStatus::InTransit,
        BarcodeStatus::Delivered => LetterStatus::Delivered,
        BarcodeStatus::Cancelled | BarcodeStatus::Expired => LetterStatus::InTransit,
    }
}

fn map_store_error(err: StoreError) -> CoreError {
    match err {
        StoreError::NotFound => CoreError::NotFound("letter resource".into()),
        StoreError::Conflict(msg) => CoreError::Conflict(msg),
        other => CoreError::Internal(other.to_string()),
    }
}
