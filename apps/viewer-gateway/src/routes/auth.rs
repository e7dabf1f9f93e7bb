use aps_client::AccessToken;
use axum::{extract::State, Json};

use crate::state::AppState;

use super::{map_aps_err, ApiResult};

/// Public token the browser viewer uses to stream derivatives.
pub async fn viewer_token(State(state): State<AppState>) -> ApiResult<AccessToken> {
    let token = state
        .models
        .viewer_token()
        .await
        .map_err(map_aps_err("viewer_token"))?;
    Ok(Json(token))
}
