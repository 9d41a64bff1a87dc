//! Core types for itemstore

use serde::{Deserialize, Serialize};

/// Item identifier, assigned by the repository on create
pub type ItemId = String;

/// The single resource served by the API
///
/// `id` is never trusted from a request body: create replaces it with a
/// generated identifier and update replaces it with the path parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Item {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// Attach an identifier, replacing whatever the item carried
    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = id.into();
        self
    }

    /// Body persisted in the store; the id lives in the object key
    pub(crate) fn to_document(&self) -> ItemDocument<'_> {
        ItemDocument {
            name: &self.name,
            description: &self.description,
        }
    }
}

/// Stored representation of an [`Item`]
#[derive(Debug, Serialize)]
pub(crate) struct ItemDocument<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

/// Owned form of [`ItemDocument`] used when reading back from the store
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StoredItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl StoredItem {
    pub fn into_item(self, id: impl Into<ItemId>) -> Item {
        Item {
            id: id.into(),
            name: self.name,
            description: self.description,
        }
    }
}
