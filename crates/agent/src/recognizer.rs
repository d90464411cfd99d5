//! Intent classification.
//!
//! Two classifiers share the [`IntentClassifier`] seam: [`LuisClassifier`]
//! calls a hosted LUIS v2 endpoint, [`KeywordClassifier`] runs offline against
//! fixed Portuguese keywords and the menu catalog (emulator mode).

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use orderbot_core::catalog::MenuCatalog;
use orderbot_core::domain::turn::Entity;
use orderbot_core::errors::{ApplicationError, Dependency};

use crate::handlers::{CREATE_ORDER, GREETINGS, MENU_REQUEST, WORKING_HOURS};

/// LUIS reports this label when nothing matched.
pub const NONE_INTENT: &str = "None";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recognition {
    pub intent: Option<String>,
    pub score: f32,
    pub entities: Vec<Entity>,
}

impl Recognition {
    pub fn unclassified() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn classify(&self, text: &str) -> Result<Recognition, ApplicationError>;
}

pub struct LuisClassifier {
    client: Client,
    endpoint: SecretString,
    min_confidence: f32,
}

impl LuisClassifier {
    pub fn new(endpoint: SecretString, min_confidence: f32) -> Self {
        Self::with_client(Client::new(), endpoint, min_confidence)
    }

    pub fn with_client(client: Client, endpoint: SecretString, min_confidence: f32) -> Self {
        Self { client, endpoint, min_confidence }
    }

    fn query_url(&self, text: &str) -> Result<Url, ApplicationError> {
        let mut url = Url::parse(self.endpoint.expose_secret().trim()).map_err(|error| {
            ApplicationError::Configuration(format!("classifier endpoint is not a valid URL: {error}"))
        })?;

        // Published LUIS URLs end in `&q=`; drop it and append the real query.
        let pairs = url
            .query_pairs()
            .filter(|(key, _)| key != "q")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect::<Vec<_>>();
        url.query_pairs_mut().clear().extend_pairs(pairs).append_pair("q", text);

        Ok(url)
    }
}

fn unavailable(message: impl Into<String>) -> ApplicationError {
    ApplicationError::DependencyUnavailable {
        dependency: Dependency::IntentClassifier,
        message: message.into(),
    }
}

#[async_trait]
impl IntentClassifier for LuisClassifier {
    fn name(&self) -> &'static str {
        "luis"
    }

    async fn classify(&self, text: &str) -> Result<Recognition, ApplicationError> {
        let url = self.query_url(text)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| unavailable(format!("request failed: {}", error.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("recognizer answered HTTP {status}")));
        }

        let payload: LuisResponse = response
            .json()
            .await
            .map_err(|error| unavailable(format!("unreadable recognizer response: {}", error.without_url())))?;

        let recognition = payload.into_recognition(self.min_confidence);
        debug!(
            event_name = "classifier.luis.recognized",
            intent = recognition.intent.as_deref().unwrap_or("<none>"),
            score = recognition.score,
            entity_count = recognition.entities.len(),
            "recognizer returned"
        );
        Ok(recognition)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuisResponse {
    #[serde(default)]
    top_scoring_intent: Option<LuisIntent>,
    #[serde(default)]
    entities: Vec<LuisEntity>,
}

#[derive(Debug, Deserialize)]
struct LuisIntent {
    intent: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuisEntity {
    entity: String,
    #[serde(rename = "type")]
    entity_type: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    start_index: Option<usize>,
    #[serde(default)]
    end_index: Option<usize>,
}

impl LuisResponse {
    fn into_recognition(self, min_confidence: f32) -> Recognition {
        let entities = self
            .entities
            .into_iter()
            .map(|raw| {
                let mut entity = Entity::new(raw.entity, raw.entity_type);
                entity.score = raw.score;
                if let (Some(start), Some(end)) = (raw.start_index, raw.end_index) {
                    entity = entity.span(start, end);
                }
                entity
            })
            .collect();

        let (intent, score) = match self.top_scoring_intent {
            Some(top) if top.intent != NONE_INTENT && top.score >= min_confidence => {
                (Some(top.intent), top.score)
            }
            Some(top) => (None, top.score),
            None => (None, 0.0),
        };

        Recognition { intent, score, entities }
    }
}

const KEYWORD_SCORE: f32 = 0.9;
const PIZZA_ENTITY: &str = "pizza";

/// Checked in order; the first intent with a matching phrase wins.
const KEYWORD_RULES: &[(&str, &[&str])] = &[
    (CREATE_ORDER, &["quero", "pedido", "pedir", "adicionar", "gostaria", "manda", "me ve"]),
    (MENU_REQUEST, &["cardapio", "cardápio", "menu", "sabores", "opcoes", "opções"]),
    (
        WORKING_HOURS,
        &["horario", "horário", "horarios", "horários", "aberto", "abre", "funciona", "que horas"],
    ),
    (GREETINGS, &["oi", "ola", "olá", "boa noite", "boa tarde", "bom dia", "hello", "hi"]),
];

/// Offline classifier for local development.
///
/// Catalog titles found in the text become `pizza` entities, in the order they
/// appear; a message naming a pizza with no other cue counts as an order.
pub struct KeywordClassifier {
    rules: Vec<(String, Vec<Vec<String>>)>,
    titles: Vec<(String, Vec<String>)>,
}

impl KeywordClassifier {
    pub fn new(catalog: &MenuCatalog) -> Self {
        let rules = KEYWORD_RULES
            .iter()
            .map(|(intent, phrases)| {
                ((*intent).to_owned(), phrases.iter().map(|phrase| tokenize(phrase)).collect())
            })
            .collect();
        let titles = catalog
            .items()
            .iter()
            .map(|item| (item.title.clone(), tokenize(&item.title)))
            .collect();

        Self { rules, titles }
    }

    fn recognize(&self, text: &str) -> Recognition {
        let tokens = tokenize(text);

        let mut found = self
            .titles
            .iter()
            .flat_map(|(title, phrase)| {
                phrase_positions(&tokens, phrase).into_iter().map(move |position| (position, title))
            })
            .collect::<Vec<_>>();
        found.sort_by_key(|(position, _)| *position);
        let entities = found
            .into_iter()
            .map(|(_, title)| Entity::new(title.clone(), PIZZA_ENTITY).score(1.0))
            .collect::<Vec<_>>();

        let keyword_intent = self.rules.iter().find_map(|(intent, phrases)| {
            phrases
                .iter()
                .any(|phrase| phrase_position(&tokens, phrase).is_some())
                .then(|| intent.clone())
        });

        let intent = match keyword_intent {
            Some(intent) => Some(intent),
            None if !entities.is_empty() => Some(CREATE_ORDER.to_owned()),
            None => None,
        };
        let score = if intent.is_some() { KEYWORD_SCORE } else { 0.0 };

        Recognition { intent, score, entities }
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn classify(&self, text: &str) -> Result<Recognition, ApplicationError> {
        Ok(self.recognize(text))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|character: char| !character.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

fn phrase_position(tokens: &[String], phrase: &[String]) -> Option<usize> {
    phrase_positions(tokens, phrase).into_iter().next()
}

/// Start of every occurrence of `phrase`; overlapping occurrences are skipped.
fn phrase_positions(tokens: &[String], phrase: &[String]) -> Vec<usize> {
    let mut positions = Vec::new();
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return positions;
    }

    let mut start = 0;
    while start + phrase.len() <= tokens.len() {
        if tokens[start..start + phrase.len()] == *phrase {
            positions.push(start);
            start += phrase.len();
        } else {
            start += 1;
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;

    use orderbot_core::catalog::MenuCatalog;
    use orderbot_core::domain::menu::MenuItem;
    use orderbot_core::errors::{ApplicationError, Dependency};

    use super::{IntentClassifier, KeywordClassifier, LuisClassifier, LuisResponse};

    fn catalog() -> MenuCatalog {
        MenuCatalog::new(vec![
            MenuItem::new("Margherita"),
            MenuItem::new("Calabresa"),
            MenuItem::new("Quatro Queijos"),
        ])
        .expect("valid catalog")
    }

    fn luis(payload: serde_json::Value) -> LuisResponse {
        serde_json::from_value(payload).expect("parse luis payload")
    }

    #[test]
    fn luis_payload_maps_intent_and_entities() {
        let recognition = luis(json!({
            "query": "quero uma margherita",
            "topScoringIntent": { "intent": "create-order", "score": 0.97 },
            "entities": [
                { "entity": "margherita", "type": "pizza", "startIndex": 10, "endIndex": 19, "score": 0.88 }
            ]
        }))
        .into_recognition(0.1);

        assert_eq!(recognition.intent.as_deref(), Some("create-order"));
        assert_eq!(recognition.entities.len(), 1);
        assert_eq!(recognition.entities[0].entity_text, "margherita");
        assert_eq!(recognition.entities[0].score, Some(0.88));
        assert_eq!(recognition.entities[0].span.map(|span| (span.start, span.end)), Some((10, 19)));
    }

    #[test]
    fn luis_none_intent_is_unclassified() {
        let recognition = luis(json!({
            "topScoringIntent": { "intent": "None", "score": 0.92 },
            "entities": []
        }))
        .into_recognition(0.1);

        assert_eq!(recognition.intent, None);
    }

    #[test]
    fn luis_intent_below_threshold_is_unclassified() {
        let recognition = luis(json!({
            "topScoringIntent": { "intent": "greetings", "score": 0.05 }
        }))
        .into_recognition(0.1);

        assert_eq!(recognition.intent, None);
        assert!(recognition.entities.is_empty());
    }

    #[test]
    fn query_replaces_trailing_q_parameter() {
        let classifier = LuisClassifier::new(
            SecretString::from(
                "https://westus.api.cognitive.microsoft.com/luis/v2.0/apps/app-1?subscription-key=k&verbose=true&q="
                    .to_owned(),
            ),
            0.1,
        );

        let url = classifier.query_url("quero uma pizza").expect("url");
        let pairs = url.query_pairs().into_owned().collect::<Vec<_>>();

        assert_eq!(
            pairs,
            vec![
                ("subscription-key".to_owned(), "k".to_owned()),
                ("verbose".to_owned(), "true".to_owned()),
                ("q".to_owned(), "quero uma pizza".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_recognizer_is_dependency_unavailable() {
        let classifier = LuisClassifier::new(
            SecretString::from("http://127.0.0.1:9/luis/v2.0/apps/app-1?q=".to_owned()),
            0.1,
        );

        let error = classifier.classify("oi").await.expect_err("connection refused");

        assert!(matches!(
            error,
            ApplicationError::DependencyUnavailable { dependency: Dependency::IntentClassifier, .. }
        ));
    }

    #[tokio::test]
    async fn keyword_classifier_recognizes_fixed_intents() {
        let classifier = KeywordClassifier::new(&catalog());

        let greeting = classifier.classify("Boa noite!").await.expect("classify");
        let hours = classifier.classify("Qual o horário de vocês?").await.expect("classify");
        let menu = classifier.classify("me mostra o cardápio").await.expect("classify");

        assert_eq!(greeting.intent.as_deref(), Some("greetings"));
        assert_eq!(hours.intent.as_deref(), Some("working-hours"));
        assert_eq!(menu.intent.as_deref(), Some("menu-request"));
    }

    #[tokio::test]
    async fn keyword_classifier_extracts_pizzas_in_text_order() {
        let classifier = KeywordClassifier::new(&catalog());

        let recognition = classifier
            .classify("quero uma quatro queijos e uma margherita")
            .await
            .expect("classify");

        assert_eq!(recognition.intent.as_deref(), Some("create-order"));
        let names =
            recognition.entities.iter().map(|entity| entity.entity_text.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Quatro Queijos", "Margherita"]);
    }

    #[tokio::test]
    async fn repeated_pizza_becomes_one_entity_per_mention() {
        let classifier = KeywordClassifier::new(&catalog());

        let recognition = classifier
            .classify("quero uma margherita, uma calabresa e outra margherita")
            .await
            .expect("classify");

        let names =
            recognition.entities.iter().map(|entity| entity.entity_text.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Margherita", "Calabresa", "Margherita"]);
    }

    #[tokio::test]
    async fn card_post_back_text_is_an_order() {
        let classifier = KeywordClassifier::new(&catalog());
        let recognition =
            classifier.classify("Adicionar ao pedido: Calabresa").await.expect("classify");

        assert_eq!(recognition.intent.as_deref(), Some("create-order"));
        assert_eq!(recognition.entities[0].entity_text, "Calabresa");
    }

    #[tokio::test]
    async fn keyword_classifier_does_not_match_inside_words() {
        let classifier = KeywordClassifier::new(&catalog());
        let recognition = classifier.classify("noite chuvosa").await.expect("classify");

        assert_eq!(recognition.intent, None);
        assert_eq!(recognition.score, 0.0);
    }
}
