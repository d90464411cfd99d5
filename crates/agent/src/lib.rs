//! Conversation runtime - classification, routing and per-conversation state
//!
//! This crate is the pizzeria bot's "brain":
//! - Classifies free text into an intent plus entities (`recognizer`)
//! - Routes the classified turn to exactly one dialog (`router`)
//! - Implements the pizzeria dialogs (`handlers`)
//! - Serializes turns of the same conversation (`locks`)
//! - Runs a whole turn against the conversation store (`runtime`)
//!
//! # Turn lifecycle
//!
//! 1. **Classify** - `IntentClassifier` (LUIS or offline keywords), bounded by a timeout
//! 2. **Lock** - one async mutex per conversation key
//! 3. **Load** - `ConversationStore::get`
//! 4. **Route** - registered dialog, redirects, or the echo fallback
//! 5. **Commit** - a single `ConversationStore::put` of the new state
//!
//! Handlers never see the store. They take the state by value and return the
//! state to commit, so a failed turn leaves nothing half-written.

pub mod handlers;
pub mod locks;
pub mod recognizer;
pub mod router;
pub mod runtime;

pub use handlers::default_registry;
pub use recognizer::{IntentClassifier, KeywordClassifier, LuisClassifier, Recognition};
pub use router::{HandlerOutcome, HandlerRegistration, HandlerRegistry, Next, TurnHandler, TurnRouter};
pub use runtime::{RuntimeSettings, TurnProcessor, TurnReport};
