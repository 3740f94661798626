//! Question answering handler
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use epis_core::Answer;
use epis_rag::Route;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Query string of `/ask`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AskParams {
    /// User question, or `ACTION_CREATE_TICKET:<description>` to open a ticket
    #[param(example = "my printer is not working")]
    pub question: String,
}

/// Answer returned to the chat frontend
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AskResponse {
    /// Text shown to the user
    #[schema(example = "Check that the printer has paper.\n\nDoes this information solve your problem?")]
    pub answer: String,
    /// Whether the frontend should ask the user to confirm the fix
    pub follow_up_required: bool,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.answer,
            follow_up_required: answer.follow_up_required,
        }
    }
}

/// Answer a question or create a support ticket
///
/// Failures while answering still produce 200 with the generic apology.
#[utoipa::path(
    get,
    path = "/ask",
    tag = "assistant",
    params(AskParams),
    responses(
        (status = 200, description = "Answer produced", body = AskResponse),
        (status = 400, description = "Missing question parameter", body = crate::error::ApiError)
    )
)]
pub async fn ask(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AskParams>, QueryRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Query(params) = params?;

    let handled = state.handler.process(&params.question).await;

    state.metrics.record_intent(handled.route.label());
    if handled.failed {
        state.metrics.record_ask_failure();
    } else if handled.route == Route::Ticket {
        state.metrics.record_ticket_created();
    }

    Ok(Json(handled.answer.into()))
}
