use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::routes::extract::AppJson;
use crate::services::help_requests::{CreateHelpRequest, HelpRequest};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/help-requests",
        get(poll_help_requests).post(create_help_request),
    )
}

#[derive(Debug, Deserialize)]
pub struct HelpRequestQuery {
    pub expert: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollHelpRequestsResponse {
    pub new_request: Option<HelpRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHelpRequestResponse {
    pub success: bool,
    pub help_request: HelpRequest,
}

/// Poll target of the expert-help widget.
async fn poll_help_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HelpRequestQuery>,
) -> Json<PollHelpRequestsResponse> {
    let new_request = state.help_requests.list(query.expert.as_deref());
    Json(PollHelpRequestsResponse { new_request })
}

async fn create_help_request(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateHelpRequest>,
) -> AppResult<(StatusCode, Json<CreateHelpRequestResponse>)> {
    let help_request = state.help_requests.create(req)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateHelpRequestResponse {
            success: true,
            help_request,
        }),
    ))
}
