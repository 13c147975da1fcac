//! Catalog entity types.
//!
//! # Responsibility
//! - Define identifiable entities, annotations and the metadata-bearing
//!   Canvas/Manifest/Collection hierarchy.
//! - Expose accessors only; all construction happens in the federation layer.
//!
//! # Invariants
//! - `title` is an empty string when no relational row contributed one.
//! - `creators` keeps relational insertion order and never holds empty names.
//! - `items` on Manifest/Collection may be empty pending a join.

use serde::{Deserialize, Serialize};

/// Opaque catalog identifier shared by both stores; the merge key.
pub type EntityId = String;

/// Declared class of a structural entity in the triple store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Collection,
    Manifest,
    Canvas,
}

impl EntityKind {
    /// Local name of the class inside the catalog class namespace.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Collection => "Collection",
            Self::Manifest => "Manifest",
            Self::Canvas => "Canvas",
        }
    }

    /// Resolves a class local name back into a kind.
    pub fn from_class_name(value: &str) -> Option<Self> {
        match value {
            "Collection" => Some(Self::Collection),
            "Manifest" => Some(Self::Manifest),
            "Canvas" => Some(Self::Canvas),
            _ => None,
        }
    }
}

/// Base capability of every catalog member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifiableEntity {
    pub id: EntityId,
}

impl IdentifiableEntity {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Image used as the body of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    pub id: EntityId,
}

impl Image {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Annotation linking an image body to a target entity.
///
/// `target` and `body` are references by id; they are not resolved or owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: EntityId,
    pub motivation: String,
    pub target: IdentifiableEntity,
    pub body: Image,
}

impl Annotation {
    pub fn new(
        id: impl Into<EntityId>,
        motivation: impl Into<String>,
        target: IdentifiableEntity,
        body: Image,
    ) -> Self {
        Self {
            id: id.into(),
            motivation: motivation.into(),
            target,
            body,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn motivation(&self) -> &str {
        &self.motivation
    }

    pub fn target(&self) -> &IdentifiableEntity {
        &self.target
    }

    pub fn body(&self) -> &Image {
        &self.body
    }
}

/// Shared metadata projection for canvases, manifests and collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityWithMetadata {
    pub id: EntityId,
    /// Label from the triple store.
    pub label: String,
    /// Title from the relational store; empty when no row matched.
    pub title: String,
    /// Creator names from the relational store, in insertion order.
    pub creators: Vec<String>,
}

impl EntityWithMetadata {
    pub fn new(
        id: impl Into<EntityId>,
        label: impl Into<String>,
        title: impl Into<String>,
        creators: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            title: title.into(),
            creators,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `None` when the relational store contributed no title.
    pub fn title(&self) -> Option<&str> {
        if self.title.is_empty() {
            None
        } else {
            Some(self.title.as_str())
        }
    }

    pub fn creators(&self) -> &[String] {
        &self.creators
    }
}

/// Leaf of the containment hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    #[serde(flatten)]
    pub metadata: EntityWithMetadata,
}

impl Canvas {
    pub fn new(metadata: EntityWithMetadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &EntityWithMetadata {
        &self.metadata
    }

    pub fn id(&self) -> &str {
        self.metadata.id()
    }
}

/// Ordered group of canvases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(flatten)]
    pub metadata: EntityWithMetadata,
    pub items: Vec<Canvas>,
}

impl Manifest {
    pub fn new(metadata: EntityWithMetadata, items: Vec<Canvas>) -> Self {
        Self { metadata, items }
    }

    pub fn metadata(&self) -> &EntityWithMetadata {
        &self.metadata
    }

    pub fn id(&self) -> &str {
        self.metadata.id()
    }

    pub fn items(&self) -> &[Canvas] {
        &self.items
    }
}

/// Ordered group of manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(flatten)]
    pub metadata: EntityWithMetadata,
    pub items: Vec<Manifest>,
}

impl Collection {
    pub fn new(metadata: EntityWithMetadata, items: Vec<Manifest>) -> Self {
        Self { metadata, items }
    }

    pub fn metadata(&self) -> &EntityWithMetadata {
        &self.metadata
    }

    pub fn id(&self) -> &str {
        self.metadata.id()
    }

    pub fn items(&self) -> &[Manifest] {
        &self.items
    }
}

/// Kind-agnostic result of lookups by id, label, title or creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEntity {
    Collection(Collection),
    Manifest(Manifest),
    Canvas(Canvas),
}

impl CatalogEntity {
    /// Wraps metadata in the shape matching `kind`, with no children attached.
    pub fn from_metadata(kind: EntityKind, metadata: EntityWithMetadata) -> Self {
        match kind {
            EntityKind::Collection => Self::Collection(Collection::new(metadata, Vec::new())),
            EntityKind::Manifest => Self::Manifest(Manifest::new(metadata, Vec::new())),
            EntityKind::Canvas => Self::Canvas(Canvas::new(metadata)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Collection(_) => EntityKind::Collection,
            Self::Manifest(_) => EntityKind::Manifest,
            Self::Canvas(_) => EntityKind::Canvas,
        }
    }

    pub fn metadata(&self) -> &EntityWithMetadata {
        match self {
            Self::Collection(collection) => collection.metadata(),
            Self::Manifest(manifest) => manifest.metadata(),
            Self::Canvas(canvas) => canvas.metadata(),
        }
    }

    pub fn id(&self) -> &str {
        self.metadata().id()
    }
}
