//! Chat channel interface for orderbot
//!
//! This crate speaks the Bot Framework activity protocol used by the emulator
//! and the hosted connectors:
//! - **Activities** (`activity`) - inbound/outgoing payloads and validation
//! - **Cards** (`cards`) - hero card and carousel message builders
//! - **Events** (`events`) - dispatch by activity type to a `TurnService`
//!
//! # Architecture
//!
//! ```text
//! POST /api/messages → ActivityDispatcher → MessageHandler → TurnService
//!                                                 ↓
//!                              hero cards / text ← Reply
//! ```

pub mod activity;
pub mod cards;
pub mod events;

pub use activity::{InboundActivity, MessageEvent, OutgoingActivity};
pub use events::{
    message_dispatcher, ActivityDispatcher, DispatchError, EventContext, HandlerResult,
    TurnService,
};
