use std::collections::HashMap;

use axum::Json;
use axum::extract::State;

use quill_types::api::Ack;

use crate::auth::AppState;
use crate::error::ApiError;

/// Public read of the whole settings table as a flat key/value object.
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<HashMap<String, String>>, ApiError> {
    let rows = state.db.all_settings()?;
    Ok(Json(
        rows.into_iter().map(|row| (row.key, row.value)).collect(),
    ))
}

/// Admin write: the body is a key/value map, applied key by key. Unknown
/// keys are ignored by the store rather than created.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<HashMap<String, String>>,
) -> Result<Json<Ack>, ApiError> {
    for (key, value) in &settings {
        state.db.update_setting(key, value)?;
    }
    Ok(Json(Ack {
        success: true,
        message: "Settings updated".to_string(),
    }))
}
