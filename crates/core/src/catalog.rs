use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::domain::menu::MenuItem;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read menu catalog `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse menu catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("menu catalog is empty")]
    Empty,
    #[error("menu item #{index} is missing a title")]
    MissingTitle { index: usize },
}

/// Menu items loaded once at startup. Cloning shares the same immutable list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuCatalog {
    items: Arc<[MenuItem]>,
}

impl MenuCatalog {
    pub fn new(items: Vec<MenuItem>) -> Result<Self, CatalogError> {
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }
        if let Some(index) = items.iter().position(|item| item.title.trim().is_empty()) {
            return Err(CatalogError::MissingTitle { index });
        }

        Ok(Self { items: items.into() })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let items = serde_json::from_str::<Vec<MenuItem>>(raw)?;
        Self::new(items)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_json_str(&raw)
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{CatalogError, MenuCatalog};
    use crate::domain::menu::{MenuItem, DEFAULT_ACTION_LABEL};

    #[test]
    fn loads_items_in_file_order() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("menu.json");
        fs::write(
            &path,
            r#"[
                {"title": "Margherita", "subtitle": "R$ 42,00", "text": "Molho, mussarela e manjericão", "image": "https://img.example/margherita.jpg"},
                {"title": "Calabresa", "subtitle": "R$ 39,00", "text": "Calabresa fatiada e cebola"}
            ]"#,
        )
        .expect("write menu");

        let catalog = MenuCatalog::load(&path).expect("catalog should load");

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.items()[0].title, "Margherita");
        assert_eq!(catalog.items()[1].title, "Calabresa");
        assert_eq!(catalog.items()[1].image, None);
        assert_eq!(catalog.items()[1].action_label, DEFAULT_ACTION_LABEL);
    }

    #[test]
    fn item_without_title_fails_at_load_time() {
        let error = MenuCatalog::from_json_str(r#"[{"title": "Portuguesa"}, {"subtitle": "R$ 10"}]"#)
            .expect_err("missing title must be rejected");

        assert!(matches!(error, CatalogError::MissingTitle { index: 1 }));
    }

    #[test]
    fn blank_title_is_treated_as_missing() {
        let error = MenuCatalog::new(vec![MenuItem::new("   ")]).expect_err("blank title");
        assert!(matches!(error, CatalogError::MissingTitle { index: 0 }));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(MenuCatalog::from_json_str("[]"), Err(CatalogError::Empty)));
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        assert!(matches!(MenuCatalog::from_json_str("{not json"), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.json");
        let error = MenuCatalog::load(&path).expect_err("missing file");
        assert!(error.to_string().contains("absent.json"));
    }
}
