use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use orderbot_core::config::AppConfig;
use orderbot_core::domain::conversation::ConversationKey;
use orderbot_core::domain::turn::Turn;
use orderbot_core::errors::{ApplicationError, Dependency};
use orderbot_core::reply::Reply;
use orderbot_core::store::ConversationStore;

use crate::locks::ConversationLocks;
use crate::recognizer::IntentClassifier;
use crate::router::{RouterOutcome, TurnRouter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub classifier_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self { classifier_timeout: Duration::from_millis(3_000), store_timeout: Duration::from_secs(5) }
    }
}

impl From<&AppConfig> for RuntimeSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            classifier_timeout: Duration::from_millis(config.classifier.timeout_ms),
            store_timeout: Duration::from_secs(config.storage.timeout_secs),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnReport {
    pub correlation_id: String,
    pub intent: Option<String>,
    pub dialog: String,
    pub replies: Vec<Reply>,
    pub order_size: usize,
}

/// Runs turns end to end: classify, then read, route and commit under the
/// conversation's lock.
pub struct TurnProcessor {
    classifier: Arc<dyn IntentClassifier>,
    store: Arc<dyn ConversationStore>,
    router: TurnRouter,
    locks: ConversationLocks,
    settings: RuntimeSettings,
}

impl TurnProcessor {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        store: Arc<dyn ConversationStore>,
        router: TurnRouter,
        settings: RuntimeSettings,
    ) -> Self {
        Self { classifier, store, router, locks: ConversationLocks::new(), settings }
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    pub async fn process(
        &self,
        key: &ConversationKey,
        text: &str,
        correlation_id: &str,
    ) -> Result<TurnReport, ApplicationError> {
        info!(
            event_name = "turn.received",
            correlation_id,
            conversation_key = %key,
            text_len = text.len(),
            "turn received"
        );

        let result = self.run(key, text, correlation_id).await;
        match &result {
            Ok(report) => info!(
                event_name = "turn.completed",
                correlation_id,
                conversation_key = %key,
                intent = report.intent.as_deref().unwrap_or("<none>"),
                dialog = %report.dialog,
                order_size = report.order_size,
                "turn completed"
            ),
            Err(error) => warn!(
                event_name = "turn.failed",
                correlation_id,
                conversation_key = %key,
                dependency_failure = error.is_dependency_failure(),
                error = %error,
                "turn failed; no state committed"
            ),
        }
        result
    }

    async fn run(
        &self,
        key: &ConversationKey,
        text: &str,
        correlation_id: &str,
    ) -> Result<TurnReport, ApplicationError> {
        let recognition = bounded(
            Dependency::IntentClassifier,
            self.settings.classifier_timeout,
            self.classifier.classify(text),
        )
        .await?;

        let mut turn = Turn::new(key.clone(), text)
            .correlation_id(correlation_id)
            .entities(recognition.entities);
        if let Some(intent) = recognition.intent {
            turn = turn.intent(intent, recognition.score);
        }

        let _guard = self.locks.acquire(key).await;

        let state = bounded(Dependency::ConversationStore, self.settings.store_timeout, async {
            self.store.get(key).await.map_err(ApplicationError::from)
        })
        .await?
        .unwrap_or_default();

        let RouterOutcome { dialog, path, state, reply } = self.router.route(&turn, state)?;
        let order_size = state.order().len();

        bounded(Dependency::ConversationStore, self.settings.store_timeout, async move {
            self.store.put(key, state).await.map_err(ApplicationError::from)
        })
        .await?;

        info!(
            event_name = "turn.state.committed",
            correlation_id,
            conversation_key = %key,
            dialog = %dialog,
            path = ?path,
            "conversation state committed"
        );

        Ok(TurnReport {
            correlation_id: turn.correlation_id,
            intent: turn.intent,
            dialog,
            replies: vec![reply],
            order_size,
        })
    }
}

async fn bounded<T, F>(
    dependency: Dependency,
    limit: Duration,
    call: F,
) -> Result<T, ApplicationError>
where
    F: Future<Output = Result<T, ApplicationError>>,
{
    tokio::time::timeout(limit, call).await.map_err(|_| ApplicationError::DependencyTimeout {
        dependency,
        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
    })?
}
