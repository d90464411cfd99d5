use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use orderbot_core::errors::{ApplicationError, InterfaceError};
use orderbot_core::reply::Reply;

use crate::activity::{ActivityError, ActivityType, InboundActivity, MessageEvent, OutgoingActivity};
use crate::cards::render_reply;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Vec<OutgoingActivity>),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    Turn(#[from] InterfaceError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

impl DispatchError {
    /// True when the caller sent something malformed rather than the turn failing.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::Handler(EventHandlerError::Activity(_)))
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn activity_type(&self) -> ActivityType;
    async fn handle(
        &self,
        activity: &InboundActivity,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct ActivityDispatcher {
    handlers: HashMap<ActivityType, Arc<dyn EventHandler>>,
}

impl ActivityDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.activity_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        activity: &InboundActivity,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&activity.activity_type) else {
            debug!(
                event_name = "channel.activity.ignored",
                correlation_id = %ctx.correlation_id,
                activity_type = ?activity.activity_type,
                "no handler registered for activity type"
            );
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(activity, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Runs one message through the conversational core and returns the replies.
#[async_trait]
pub trait TurnService: Send + Sync {
    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<Vec<Reply>, ApplicationError>;
}

#[async_trait]
impl<T> TurnService for Arc<T>
where
    T: TurnService + ?Sized,
{
    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<Vec<Reply>, ApplicationError> {
        (**self).handle_message(event, ctx).await
    }
}

pub struct MessageHandler<S> {
    service: S,
}

impl<S> MessageHandler<S>
where
    S: TurnService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: TurnService + 'static,
{
    fn activity_type(&self) -> ActivityType {
        ActivityType::Message
    }

    async fn handle(
        &self,
        activity: &InboundActivity,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let event = activity.message_event()?;
        if event.text.is_empty() {
            return Ok(HandlerResult::Processed);
        }

        let replies = self
            .service
            .handle_message(&event, ctx)
            .await
            .map_err(|error| error.into_interface(ctx.correlation_id.clone()))?;

        if replies.is_empty() {
            return Ok(HandlerResult::Processed);
        }

        Ok(HandlerResult::Responded(
            replies
                .iter()
                .map(|reply| render_reply(reply).reply_to(event.activity_id.as_deref()))
                .collect(),
        ))
    }
}

pub fn message_dispatcher<S>(service: S) -> ActivityDispatcher
where
    S: TurnService + 'static,
{
    let mut dispatcher = ActivityDispatcher::new();
    dispatcher.register(MessageHandler::new(service));
    dispatcher
}
