use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use orderbot_core::domain::conversation::ConversationState;
use orderbot_core::domain::turn::Turn;
use orderbot_core::errors::{ApplicationError, RoutingError};
use orderbot_core::reply::Reply;

/// Upper bound on `BeginDialog` hops within one turn.
pub const MAX_REDIRECTS: usize = 4;

/// Dialog name reported when the fallback handler answered.
pub const FALLBACK_DIALOG: &str = "default";

#[derive(Clone, Debug, PartialEq)]
pub enum Next {
    Reply(Reply),
    /// Hand the turn to another registered dialog, by label.
    BeginDialog(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HandlerOutcome {
    pub state: ConversationState,
    pub next: Next,
}

impl HandlerOutcome {
    pub fn reply(state: ConversationState, reply: Reply) -> Self {
        Self { state, next: Next::Reply(reply) }
    }

    pub fn begin_dialog(state: ConversationState, target: impl Into<String>) -> Self {
        Self { state, next: Next::BeginDialog(target.into()) }
    }
}

/// A dialog step. Receives the current state by value and returns the state
/// to commit; it never touches the store.
pub trait TurnHandler: Send + Sync {
    fn handle(&self, turn: &Turn, state: ConversationState) -> Result<HandlerOutcome, ApplicationError>;
}

impl<F> TurnHandler for F
where
    F: Fn(&Turn, ConversationState) -> Result<HandlerOutcome, ApplicationError> + Send + Sync,
{
    fn handle(&self, turn: &Turn, state: ConversationState) -> Result<HandlerOutcome, ApplicationError> {
        self(turn, state)
    }
}

#[derive(Clone)]
pub struct HandlerRegistration {
    label: String,
    triggers: Vec<String>,
    handler: Arc<dyn TurnHandler>,
}

impl HandlerRegistration {
    /// Registers `handler` as dialog `label`, triggered by the intent of the same name.
    pub fn new<H>(label: impl Into<String>, handler: H) -> Self
    where
        H: TurnHandler + 'static,
    {
        let label = label.into();
        Self { triggers: vec![label.clone()], label, handler: Arc::new(handler) }
    }

    /// Also trigger on `intent`.
    pub fn matches(mut self, intent: impl Into<String>) -> Self {
        self.triggers.push(intent.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    registrations: Vec<HandlerRegistration>,
    fallback: Option<Arc<dyn TurnHandler>>,
}

impl HandlerRegistryBuilder {
    pub fn register(mut self, registration: HandlerRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    pub fn fallback<H>(mut self, handler: H) -> Self
    where
        H: TurnHandler + 'static,
    {
        self.fallback = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> HandlerRegistry {
        let mut by_intent = HashMap::new();
        let mut by_label = HashMap::new();

        for (index, registration) in self.registrations.iter().enumerate() {
            if by_label.contains_key(&registration.label) {
                warn!(
                    event_name = "router.registration.duplicate_label",
                    label = %registration.label,
                    "dialog label already registered; keeping the first registration"
                );
                continue;
            }
            by_label.insert(registration.label.clone(), index);

            for trigger in &registration.triggers {
                if let Some(existing) = by_intent.get(trigger) {
                    let existing: &HandlerRegistration = &self.registrations[*existing];
                    if existing.label != registration.label {
                        warn!(
                            event_name = "router.registration.duplicate_trigger",
                            intent = %trigger,
                            kept = %existing.label,
                            ignored = %registration.label,
                            "intent already routed; keeping the first registration"
                        );
                    }
                    continue;
                }
                by_intent.insert(trigger.clone(), index);
            }
        }

        HandlerRegistry {
            registrations: self.registrations,
            by_intent,
            by_label,
            fallback: self.fallback,
        }
    }
}

/// Immutable routing table, built once at startup.
pub struct HandlerRegistry {
    registrations: Vec<HandlerRegistration>,
    by_intent: HashMap<String, usize>,
    by_label: HashMap<String, usize>,
    fallback: Option<Arc<dyn TurnHandler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub fn for_intent(&self, intent: &str) -> Option<&HandlerRegistration> {
        self.by_intent.get(intent).map(|index| &self.registrations[*index])
    }

    pub fn for_label(&self, label: &str) -> Option<&HandlerRegistration> {
        self.by_label.get(label).map(|index| &self.registrations[*index])
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Registered dialog labels in registration order, duplicates excluded.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels = self
            .by_label
            .iter()
            .map(|(label, index)| (*index, label.as_str()))
            .collect::<Vec<_>>();
        labels.sort_unstable();
        labels.into_iter().map(|(_, label)| label).collect()
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouterOutcome {
    /// Dialog that produced the reply.
    pub dialog: String,
    /// Every dialog entered this turn, in order.
    pub path: Vec<String>,
    pub state: ConversationState,
    pub reply: Reply,
}

pub struct TurnRouter {
    registry: Arc<HandlerRegistry>,
}

impl TurnRouter {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry: Arc::new(registry) }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn route(
        &self,
        turn: &Turn,
        state: ConversationState,
    ) -> Result<RouterOutcome, ApplicationError> {
        let (mut dialog, mut handler) = self.entry_point(turn)?;
        let origin = dialog.clone();
        let mut path = vec![dialog.clone()];
        let mut state = state;

        for hop in 0..=MAX_REDIRECTS {
            debug!(
                event_name = "router.dispatch",
                correlation_id = %turn.correlation_id,
                conversation_key = %turn.conversation_key,
                dialog = %dialog,
                hop,
                "dispatching turn to dialog"
            );

            let outcome = handler.handle(turn, state)?;
            state = outcome.state;

            let target = match outcome.next {
                Next::Reply(reply) => return Ok(RouterOutcome { dialog, path, state, reply }),
                Next::BeginDialog(target) => target,
            };

            if hop == MAX_REDIRECTS {
                break;
            }

            let registration = self.registry.for_label(&target).ok_or_else(|| {
                RoutingError::UnknownRedirect { from: dialog.clone(), target: target.clone() }
            })?;
            dialog = registration.label.clone();
            handler = Arc::clone(&registration.handler);
            path.push(dialog.clone());
        }

        Err(RoutingError::RedirectLimitExceeded { origin, limit: MAX_REDIRECTS }.into())
    }

    fn entry_point(&self, turn: &Turn) -> Result<(String, Arc<dyn TurnHandler>), RoutingError> {
        if let Some(registration) = turn.intent_label().and_then(|intent| self.registry.for_intent(intent)) {
            return Ok((registration.label.clone(), Arc::clone(&registration.handler)));
        }

        match &self.registry.fallback {
            Some(fallback) => Ok((FALLBACK_DIALOG.to_owned(), Arc::clone(fallback))),
            None => Err(RoutingError::Unmatched { intent: turn.intent.clone() }),
        }
    }
}
