use serde::{Deserialize, Serialize};

pub const DEFAULT_ACTION_LABEL: &str = "Adicionar";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_action_label")]
    pub action_label: String,
}

impl MenuItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: String::new(),
            text: String::new(),
            image: None,
            action_label: default_action_label(),
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Value posted back when the card's button is pressed.
    pub fn add_to_order_value(&self) -> String {
        format!("Adicionar ao pedido: {}", self.title)
    }
}

fn default_action_label() -> String {
    DEFAULT_ACTION_LABEL.to_owned()
}
