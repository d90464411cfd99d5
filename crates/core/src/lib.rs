pub mod accumulator;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod reply;
pub mod store;

pub use accumulator::{accumulate, Accumulation};
pub use catalog::{CatalogError, MenuCatalog};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::conversation::{ConversationKey, ConversationState};
pub use domain::menu::MenuItem;
pub use domain::turn::{Entity, EntitySpan, Turn};
pub use errors::{ApplicationError, Dependency, InterfaceError, RoutingError};
pub use reply::{compose_menu, compose_text, CarouselContent, Reply, TextContent};
pub use store::{ConversationStore, StoreError};
