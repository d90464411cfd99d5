pub mod conversation;
pub mod menu;
pub mod turn;

pub use conversation::{ConversationKey, ConversationState};
pub use menu::MenuItem;
pub use turn::{Entity, EntitySpan, Turn};
