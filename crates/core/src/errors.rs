use std::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dependency {
    IntentClassifier,
    ConversationStore,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntentClassifier => f.write_str("intent classifier"),
            Self::ConversationStore => f.write_str("conversation store"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("no handler registered for intent `{}` and no fallback configured", .intent.as_deref().unwrap_or("<unclassified>"))]
    Unmatched { intent: Option<String> },
    #[error("dialog `{from}` redirected to unregistered dialog `{target}`")]
    UnknownRedirect { from: String, target: String },
    #[error("dialog redirects starting at `{origin}` exceeded the limit of {limit}")]
    RedirectLimitExceeded { origin: String, limit: usize },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error("{dependency} timed out after {timeout_ms}ms")]
    DependencyTimeout { dependency: Dependency, timeout_ms: u64 },
    #[error("{dependency} unavailable: {message}")]
    DependencyUnavailable { dependency: Dependency, message: String },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }

    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, Self::DependencyTimeout { .. } | Self::DependencyUnavailable { .. })
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::DependencyTimeout { .. }
            | ApplicationError::DependencyUnavailable { .. } => Self::ServiceUnavailable {
                message: value.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Routing(_) | ApplicationError::Configuration(_) => {
                Self::Internal { message: value.to_string(), correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, Dependency, InterfaceError, RoutingError};

    #[test]
    fn classifier_timeout_maps_to_service_unavailable() {
        let interface = ApplicationError::DependencyTimeout {
            dependency: Dependency::IntentClassifier,
            timeout_ms: 3_000,
        }
        .into_interface("turn-1");

        assert!(matches!(
            interface,
            InterfaceError::ServiceUnavailable {
                ref correlation_id,
                ref message,
            } if correlation_id == "turn-1" && message == "intent classifier timed out after 3000ms"
        ));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn store_outage_maps_to_service_unavailable() {
        let interface = ApplicationError::DependencyUnavailable {
            dependency: Dependency::ConversationStore,
            message: "database is locked".to_owned(),
        }
        .into_interface("turn-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "turn-2");
    }

    #[test]
    fn routing_error_maps_to_internal() {
        let interface = ApplicationError::from(RoutingError::UnknownRedirect {
            from: "create-order".to_owned(),
            target: "menu-request".to_owned(),
        })
        .into_interface("turn-3");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn unmatched_error_names_unclassified_turns() {
        let error = RoutingError::Unmatched { intent: None };
        assert_eq!(
            error.to_string(),
            "no handler registered for intent `<unclassified>` and no fallback configured"
        );
    }

    #[test]
    fn only_timeouts_and_outages_are_dependency_failures() {
        assert!(ApplicationError::DependencyTimeout {
            dependency: Dependency::ConversationStore,
            timeout_ms: 10,
        }
        .is_dependency_failure());
        assert!(!ApplicationError::Configuration("bad template".to_owned()).is_dependency_failure());
    }
}
