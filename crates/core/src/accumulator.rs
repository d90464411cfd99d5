use crate::domain::conversation::ConversationState;
use crate::domain::turn::Entity;

#[derive(Clone, Debug, PartialEq)]
pub enum Accumulation {
    /// `state` is the new record to commit; `added` lists what this turn appended.
    Appended { state: ConversationState, added: Vec<String> },
    /// Nothing to add. The state is handed back untouched.
    NoEntities(ConversationState),
}

impl Accumulation {
    pub fn into_state(self) -> ConversationState {
        match self {
            Self::Appended { state, .. } | Self::NoEntities(state) => state,
        }
    }
}

/// Appends every entity identifier to `order`, in extraction order.
///
/// Not idempotent: feeding the same entities twice appends them twice.
pub fn accumulate(mut state: ConversationState, entities: &[Entity]) -> Accumulation {
    if entities.is_empty() {
        return Accumulation::NoEntities(state);
    }

    let added = entities.iter().map(|entity| entity.identifier().to_owned()).collect::<Vec<_>>();
    state.order.get_or_insert_with(Vec::new).extend(added.iter().cloned());

    Accumulation::Appended { state, added }
}
