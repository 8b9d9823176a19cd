use crate::prefix::courier_can_operate;
use openpenpal_models::error::CoreError;
use openpenpal_models::opcode::{OpCode, OpCodeError, OpCodeRecord};
use openpenpal_store::{OpCodeRepository, StoreError};
use std::collections::HashSet;
use tracing::instrument;

const DEFAULT_SEARCH_LIMIT: i64 = 50;

/// C4 entry point: `ValidateOPCode`, `Get`, `Search`, `CheckPermission`
/// (spec §4.4). Holds no state of its own beyond the repository handle —
/// permission checks are pure functions over a courier's managed prefixes,
/// supplied by the caller rather than fetched here to avoid a dependency
/// on the courier aggregate.
#[derive(Clone)]
pub struct Directory {
    repository: OpCodeRepository,
}

impl Directory {
    pub fn new(repository: OpCodeRepository) -> Self {
        Self { repository }
    }

    /// `ValidateOPCode(code) → (valid, err)`. Format validity only; existence
    /// in the directory is a separate concern handled by `get`.
    pub fn validate_format(&self, raw: &str) -> Result<OpCode, OpCodeError> {
        OpCode::parse(raw)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, code: &OpCode, include_private: bool) -> Result<OpCodeRecord, CoreError> {
        let record = self.repository.get(code).await.map_err(map_store_error)?;
        if !record.is_public && !include_private {
            return Err(CoreError::Forbidden(format!("opcode {code} is not public")));
        }
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, prefix: &str, page: u32, size: u32) -> Result<(Vec<OpCodeRecord>, usize), CoreError> {
        let limit = if size == 0 { DEFAULT_SEARCH_LIMIT } else { size as i64 };
        let results = self.repository.search(prefix, limit * (page as i64 + 1)).await.map_err(map_store_error)?;
        let total = results.len();
        let start = (page as usize) * (size.max(1) as usize);
        let page_slice = results.into_iter().skip(start).take(size.max(1) as usize).collect();
        Ok((page_slice, total))
    }

    pub async fn upsert(&self, record: &OpCodeRecord) -> Result<(), CoreError> {
        self.repository.upsert(record).await.map_err(map_store_error)
    }

    /// `CheckPermission(courierID, opCode) → (bool, err)`. The courier's
    /// `managedPrefixes` are supplied by the caller (fetched from the
    /// courier aggregate), keeping this crate free of a dependency on it.
    pub fn check_permission(&self, managed_prefixes: &HashSet<String>, code: &OpCode) -> bool {
        courier_can_operate(managed_prefixes, code)
    }
}

fn map_store_error(err: StoreError) -> CoreError {
    match err {
        StoreError::NotFound => CoreError::NotFound("opcode".into()),
        StoreError::Conflict(msg) => CoreError::Conflict(msg),
        other => CoreError::Internal(other.to_string()),
    }
}
