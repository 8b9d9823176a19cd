use crate::middleware::CurrentUser;
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::Json;
use openpenpal_models::letter::{BarcodeStatus, LetterCode};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateBarcodeRequest {
    letter_id: Uuid,
}

/// `POST /barcodes` (spec §6): a convenience alias for generating a letter's
/// barcode without going through `/letters/:id/generate-code`.
pub async fn create(State(state): State<AppState>, Json(body): Json<CreateBarcodeRequest>) -> ApiResult<LetterCode> {
    let code = state.letters.generate_barcode(body.letter_id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(code))
}

#[derive(Deserialize)]
pub struct ScanLocation {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    status: BarcodeStatusInput,
    #[serde(default)]
    location: Option<ScanLocation>,
    #[serde(default)]
    note: Option<String>,
    /// Accepted for wire compatibility with scanner clients; not persisted —
    /// no column exists for free-form device metadata (spec §1 excludes
    /// schema migration as an external collaborator).
    #[serde(default)]
    #[allow(dead_code)]
    scanner_info: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeStatusInput {
    Unactivated,
    Bound,
    InTransit,
    Delivered,
    Cancelled,
    Expired,
}

impl From<BarcodeStatusInput> for BarcodeStatus {
    fn from(value: BarcodeStatusInput) -> Self {
        match value {
            BarcodeStatusInput::Unactivated => BarcodeStatus::Unactivated,
            BarcodeStatusInput::Bound => BarcodeStatus::Bound,
            BarcodeStatusInput::InTransit => BarcodeStatus::InTransit,
            BarcodeStatusInput::Delivered => BarcodeStatus::Delivered,
            BarcodeStatusInput::Cancelled => BarcodeStatus::Cancelled,
            BarcodeStatusInput::Expired => BarcodeStatus::Expired,
        }
    }
}

/// `PATCH /barcodes/:code/status` (spec §6, §4.6 `UpdateBarcodeStatus`).
pub async fn update_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<UpdateStatusRequest>,
) -> ApiResult<()> {
    let location = body.location.and_then(|l| l.address);
    state
        .letters
        .update_barcode_status(&code, body.status.into(), current.user_id, location, body.note)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok(()))
}
