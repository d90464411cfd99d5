use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use orderbot_agent::TurnProcessor;
use orderbot_channel::{
    message_dispatcher, ActivityDispatcher, DispatchError, EventContext, HandlerResult,
    InboundActivity, MessageEvent, OutgoingActivity, TurnService,
};
use orderbot_core::errors::ApplicationError;
use orderbot_core::reply::Reply;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Bridges the channel's message handler to the turn runtime.
pub struct RuntimeTurnService {
    processor: Arc<TurnProcessor>,
}

impl RuntimeTurnService {
    pub fn new(processor: Arc<TurnProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl TurnService for RuntimeTurnService {
    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<Vec<Reply>, ApplicationError> {
        let report =
            self.processor.process(&event.conversation_key, &event.text, &ctx.correlation_id).await?;
        Ok(report.replies)
    }
}

#[derive(Clone)]
pub struct MessagesState {
    dispatcher: Arc<ActivityDispatcher>,
    apology: String,
}

impl MessagesState {
    pub fn new(processor: Arc<TurnProcessor>, apology: impl Into<String>) -> Self {
        Self {
            dispatcher: Arc::new(message_dispatcher(RuntimeTurnService::new(processor))),
            apology: apology.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<OutgoingActivity>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

pub fn router(state: MessagesState) -> Router {
    Router::new().route("/api/messages", post(receive_activity)).with_state(state)
}

pub async fn receive_activity(
    State(state): State<MessagesState>,
    headers: HeaderMap,
    Json(activity): Json<InboundActivity>,
) -> Response {
    let ctx = EventContext { correlation_id: correlation_id(&headers) };
    info!(
        event_name = "server.activity.received",
        correlation_id = %ctx.correlation_id,
        activity_type = ?activity.activity_type,
        channel_id = %activity.channel_id,
        "inbound activity received"
    );

    match state.dispatcher.dispatch(&activity, &ctx).await {
        Ok(HandlerResult::Responded(activities)) => respond(activities),
        Ok(HandlerResult::Processed | HandlerResult::Ignored) => respond(Vec::new()),
        Err(error) if error.is_bad_request() => bad_request(&error, &ctx),
        Err(error) => {
            error!(
                event_name = "server.activity.failed",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "turn failed; replying with apology"
            );
            respond(vec![OutgoingActivity::text(state.apology.clone()).reply_to(activity.id.as_deref())])
        }
    }
}

fn respond(activities: Vec<OutgoingActivity>) -> Response {
    (StatusCode::OK, Json(ActivitiesResponse { activities })).into_response()
}

fn bad_request(error: &DispatchError, ctx: &EventContext) -> Response {
    warn!(
        event_name = "server.activity.rejected",
        correlation_id = %ctx.correlation_id,
        error = %error,
        "activity rejected"
    );
    let payload = ErrorResponse {
        error: "The request could not be processed. Check inputs and try again.".to_owned(),
        detail: error.to_string(),
        correlation_id: ctx.correlation_id.clone(),
    };
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
