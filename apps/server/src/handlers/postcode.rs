use crate::middleware::CurrentUser;
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use openpenpal_models::error::CoreError;
use openpenpal_models::opcode::OpCodeRecord;
use serde::Serialize;
use std::collections::BTreeSet;

const DIRECTORY_SCAN_SIZE: u32 = 500;

/// `GET /postcode/:code` (spec §6, §4.4 `Get`). Private entries are only
/// visible to an authenticated caller.
pub async fn get_opcode(
    State(state): State<AppState>,
    Path(code): Path<String>,
    current: Option<Extension<CurrentUser>>,
) -> ApiResult<OpCodeRecord> {
    let opcode = state.directory.validate_format(&code).map_err(|e| CoreError::InvalidInput(e.to_string()))?;
    let record = state.directory.get(&opcode, current.is_some()).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(record))
}

#[derive(Serialize)]
pub struct AreaSummary {
    area_code: String,
    area_name: String,
}

/// `GET /postcode/schools/:school/areas` (spec §6): distinct areas within a
/// school, derived from the flat prefix search since the directory has no
/// dedicated hierarchical grouping query.
pub async fn list_areas(State(state): State<AppState>, Path(school): Path<String>) -> ApiResult<Vec<AreaSummary>> {
    let (records, _) = state.directory.search(&school, 0, DIRECTORY_SCAN_SIZE).await.map_err(ApiError::from)?;

    let mut seen = BTreeSet::new();
    let mut areas = Vec::new();
    for record in records {
        let area_code = record.code.area().to_string();
        if seen.insert(area_code.clone()) {
            areas.push(AreaSummary { area_code, area_name: record.area_name });
        }
    }
    Ok(ApiResponse::ok(areas))
}

#[derive(Serialize)]
pub struct BuildingSummary {
    building_type: String,
}

/// `GET /postcode/schools/:school/areas/:area/buildings` (spec §6).
pub async fn list_buildings(State(state): State<AppState>, Path((school, area)): Path<(String, String)>) -> ApiResult<Vec<BuildingSummary>> {
    let prefix = format!("{school}{area}");
    let (records, _) = state.directory.search(&prefix, 0, DIRECTORY_SCAN_SIZE).await.map_err(ApiError::from)?;

    let mut seen = BTreeSet::new();
    let mut buildings = Vec::new();
    for record in records {
        if seen.insert(record.building_type.clone()) {
            buildings.push(BuildingSummary { building_type: record.building_type });
        }
    }
    Ok(ApiResponse::ok(buildings))
}

/// `GET /postcode/schools/:school/areas/:area/buildings/:building/rooms`
/// (spec §6): exact delivery points (`pointType`) within one building.
pub async fn list_rooms(
    State(state): State<AppState>,
    Path((school, area, building)): Path<(String, String, String)>,
) -> ApiResult<Vec<OpCodeRecord>> {
    let prefix = format!("{school}{area}");
    let (records, _) = state.directory.search(&prefix, 0, DIRECTORY_SCAN_SIZE).await.map_err(ApiError::from)?;

    let rooms = records.into_iter().filter(|r| r.building_type == building).collect();
    Ok(ApiResponse::ok(rooms))
}
