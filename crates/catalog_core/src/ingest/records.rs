//! Input records accepted by the loaders.

use serde::{Deserialize, Serialize};

/// One annotation linking an image body to a catalog target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: String,
    pub body: String,
    pub target: String,
    pub motivation: String,
}

/// Descriptive metadata for one catalog entity.
///
/// `creator` holds every creator in one `;`-delimited field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub creator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasRecord {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub items: Vec<CanvasRecord>,
}

/// Root of a containment hierarchy loaded into the triple store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub items: Vec<ManifestRecord>,
}
