//! Curated protocol library shipped with the binary.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use wall_core::model::{CatalogProtocol, Category, ProtocolId};

use crate::error::CatalogError;

const EMBEDDED_LIBRARY: &str = include_str!("../assets/catalog.json");

/// A library tab: category id plus its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub id: Category,
    pub name: String,
}

/// An expert and how many library protocols are attributed to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub name: String,
    pub protocol_count: usize,
}

#[derive(Debug, Deserialize)]
struct LibraryFile {
    categories: Vec<CategoryInfo>,
    protocols: Vec<CatalogProtocol>,
}

/// Read-only, in-order view over the protocol library.
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<CategoryInfo>,
    protocols: Vec<CatalogProtocol>,
}

impl Catalog {
    /// The library bundled into the crate.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled file is malformed.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_LIBRARY)
    }

    /// Parse a library document and reject duplicate protocol ids.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON and
    /// `CatalogError::DuplicateId` when an id repeats.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: LibraryFile = serde_json::from_str(raw)?;

        let mut seen = HashSet::new();
        for protocol in &file.protocols {
            if !seen.insert(protocol.id.as_str()) {
                return Err(CatalogError::DuplicateId(protocol.id.clone()));
            }
        }

        Ok(Self {
            categories: file.categories,
            protocols: file.protocols,
        })
    }

    #[must_use]
    pub fn list(&self) -> &[CatalogProtocol] {
        &self.protocols
    }

    #[must_use]
    pub fn get(&self, id: &ProtocolId) -> Option<&CatalogProtocol> {
        self.protocols.iter().find(|p| &p.id == id)
    }

    #[must_use]
    pub fn categories(&self) -> &[CategoryInfo] {
        &self.categories
    }

    #[must_use]
    pub fn by_category(&self, category: Category) -> Vec<&CatalogProtocol> {
        self.filter(Some(category), None)
    }

    /// Author match ignores ASCII case.
    #[must_use]
    pub fn by_author(&self, author: &str) -> Vec<&CatalogProtocol> {
        self.filter(None, Some(author))
    }

    /// Protocols matching every given criterion, in library order.
    #[must_use]
    pub fn filter(&self, category: Option<Category>, author: Option<&str>) -> Vec<&CatalogProtocol> {
        let author = author.map(str::trim);
        self.protocols
            .iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .filter(|p| author.is_none_or(|a| p.author.eq_ignore_ascii_case(a)))
            .collect()
    }

    /// Distinct authors in first-seen order.
    #[must_use]
    pub fn authors(&self) -> Vec<AuthorSummary> {
        let mut authors: Vec<AuthorSummary> = Vec::new();
        for protocol in &self.protocols {
            match authors.iter_mut().find(|a| a.name == protocol.author) {
                Some(existing) => existing.protocol_count += 1,
                None => authors.push(AuthorSummary {
                    name: protocol.author.clone(),
                    protocol_count: 1,
                }),
            }
        }
        authors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::embedded().expect("bundled library parses")
    }

    #[test]
    fn embedded_library_has_every_category() {
        let catalog = catalog();
        assert_eq!(catalog.categories().len(), Category::ALL.len());
        for category in Category::ALL {
            assert!(
                !catalog.by_category(category).is_empty(),
                "no protocols for {category}"
            );
        }
    }

    #[test]
    fn get_finds_by_id() {
        let catalog = catalog();
        let nsdr = catalog
            .get(&ProtocolId::new("nsdr").unwrap())
            .expect("nsdr in library");
        assert_eq!(nsdr.category, Category::Focus);
        assert!(catalog.get(&ProtocolId::new("missing").unwrap()).is_none());
    }

    #[test]
    fn filter_combines_category_and_author() {
        let catalog = catalog();
        let rows = catalog.filter(Some(Category::Exercise), Some("wim hof"));
        assert!(!rows.is_empty());
        assert!(
            rows.iter()
                .all(|p| p.category == Category::Exercise && p.author == "Wim Hof")
        );
        assert_eq!(catalog.filter(None, None).len(), catalog.list().len());
    }

    #[test]
    fn authors_count_their_protocols() {
        let catalog = catalog();
        let authors = catalog.authors();
        let total: usize = authors.iter().map(|a| a.protocol_count).sum();
        assert_eq!(total, catalog.list().len());
        assert_eq!(authors[0].name, catalog.list()[0].author);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"{
          "categories": [],
          "protocols": [
            {"id":"x","title":"X","category":"focus","author":"A","description":"",
             "difficulty":"Easy","timeRequired":"1 min","frequency":"Daily"},
            {"id":"x","title":"X again","category":"focus","author":"A","description":"",
             "difficulty":"Easy","timeRequired":"1 min","frequency":"Daily"}
          ]
        }"#;
        assert!(matches!(
            Catalog::from_json(raw),
            Err(CatalogError::DuplicateId(_))
        ));
    }
}
