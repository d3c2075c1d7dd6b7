use axum::{Json, extract::State};
use sm_common::api::Dictionary;

use crate::SharedState;
use crate::error::ApiError;
use crate::extract::ApiPath;

pub async fn get(
    State(state): State<SharedState>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<Dictionary>, ApiError> {
    Ok(Json(state.staffing.dictionaries().find_by_name(&name).await?))
}
