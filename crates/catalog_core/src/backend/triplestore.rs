//! Triple-store query processor.
//!
//! # Responsibility
//! - Model each structural lookup as a `GraphQuery` and render it to SPARQL.
//! - Decode SELECT bindings into `GraphRow` records.
//!
//! # Invariants
//! - Caller-supplied values reach query text only through `escape_literal`.
//!   Identifiers are bound with `VALUES`; labels are compared through
//!   `str()` so language-tagged and typed labels match too.
//! - Every query requires class, identifier and label on the matched entity.
//! - A result never comes back absent: zero matches is an empty vector.
//! - A binding without an expected variable fails the whole call with
//!   `StoreError::MalformedResult`.

use crate::backend::sparql::{SparqlBinding, SparqlResults, SparqlTransport};
use crate::backend::{StoreError, StoreResult};
use crate::model::entity::EntityKind;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Formatter;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Namespace of catalog classes (`Collection`, `Manifest`, `Canvas`).
pub const CLASS_NS: &str = "https://github.com/n1kg0r/ds-project-dhdk/classes/";
/// Namespace of catalog attributes (`label`).
pub const ATTRIBUTE_NS: &str = "https://github.com/n1kg0r/ds-project-dhdk/attributes/";
/// Namespace of catalog relations (`items`).
pub const RELATION_NS: &str = "https://github.com/n1kg0r/ds-project-dhdk/relations/";
/// Namespace of the shared identifier property.
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// Full IRI of the identifier property.
pub fn identifier_iri() -> String {
    format!("{DC_NS}identifier")
}

/// Full IRI of the label property.
pub fn label_iri() -> String {
    format!("{ATTRIBUTE_NS}label")
}

/// Full IRI of the containment relation.
pub fn items_iri() -> String {
    format!("{RELATION_NS}items")
}

/// Full IRI of the class for `kind`.
pub fn class_iri(kind: EntityKind) -> String {
    format!("{CLASS_NS}{}", kind.class_name())
}

/// Resolves a class IRI into a catalog kind; foreign classes yield `None`.
pub fn kind_from_class_iri(iri: &str) -> Option<EntityKind> {
    iri.strip_prefix(CLASS_NS)
        .and_then(EntityKind::from_class_name)
}

/// Escapes a value for use inside a double-quoted SPARQL string literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{08}' => escaped.push_str("\\b"),
            '\u{0C}' => escaped.push_str("\\f"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Structural query shapes understood by the triple store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphQuery {
    /// Every entity declared with the given class.
    AllOfKind(EntityKind),
    /// Every entity with identifier, label and any type.
    AllEntities,
    /// Canvases reachable through two `items` hops from a collection id.
    CanvasesInCollection(String),
    /// Canvases one `items` hop from a manifest id.
    CanvasesInManifest(String),
    /// Manifests one `items` hop from a collection id.
    ManifestsInCollection(String),
    EntitiesWithLabel(String),
    EntitiesWithId(String),
}

impl GraphQuery {
    /// Operation name used in log events.
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::AllOfKind(EntityKind::Canvas) => "all_canvases",
            Self::AllOfKind(EntityKind::Manifest) => "all_manifests",
            Self::AllOfKind(EntityKind::Collection) => "all_collections",
            Self::AllEntities => "all_entities",
            Self::CanvasesInCollection(_) => "canvases_in_collection",
            Self::CanvasesInManifest(_) => "canvases_in_manifest",
            Self::ManifestsInCollection(_) => "manifests_in_collection",
            Self::EntitiesWithLabel(_) => "entities_with_label",
            Self::EntitiesWithId(_) => "entities_with_id",
        }
    }

    /// Class fixed by the query pattern, if any.
    ///
    /// Queries without a fixed class project `?type` instead.
    pub fn declared_kind(&self) -> Option<EntityKind> {
        match self {
            Self::AllOfKind(kind) => Some(*kind),
            Self::CanvasesInCollection(_) | Self::CanvasesInManifest(_) => {
                Some(EntityKind::Canvas)
            }
            Self::ManifestsInCollection(_) => Some(EntityKind::Manifest),
            Self::AllEntities | Self::EntitiesWithLabel(_) | Self::EntitiesWithId(_) => None,
        }
    }

    /// Variables every result binding must carry.
    pub fn projected_vars(&self) -> &'static [&'static str] {
        if self.declared_kind().is_some() {
            &["entity", "id", "label"]
        } else {
            &["entity", "id", "label", "type"]
        }
    }

    /// Renders the query as SPARQL 1.1 text.
    pub fn to_sparql(&self) -> String {
        let projection = self
            .projected_vars()
            .iter()
            .map(|var| format!("?{var}"))
            .collect::<Vec<_>>()
            .join(" ");

        let patterns: Vec<String> = match self {
            Self::AllOfKind(kind) => vec![
                format!("?entity a class:{} ;", kind.class_name()),
                "    dc:identifier ?id ;".to_string(),
                "    attr:label ?label .".to_string(),
            ],
            Self::AllEntities => vec![
                "?entity dc:identifier ?id ;".to_string(),
                "    attr:label ?label ;".to_string(),
                "    a ?type .".to_string(),
            ],
            Self::CanvasesInCollection(collection_id) => vec![
                values_clause("anchor", collection_id),
                "?collection a class:Collection ;".to_string(),
                "    dc:identifier ?anchor ;".to_string(),
                "    rel:items ?manifest .".to_string(),
                "?manifest a class:Manifest ;".to_string(),
                "    rel:items ?entity .".to_string(),
                "?entity a class:Canvas ;".to_string(),
                "    dc:identifier ?id ;".to_string(),
                "    attr:label ?label .".to_string(),
            ],
            Self::CanvasesInManifest(manifest_id) => vec![
                values_clause("anchor", manifest_id),
                "?manifest a class:Manifest ;".to_string(),
                "    dc:identifier ?anchor ;".to_string(),
                "    rel:items ?entity .".to_string(),
                "?entity a class:Canvas ;".to_string(),
                "    dc:identifier ?id ;".to_string(),
                "    attr:label ?label .".to_string(),
            ],
            Self::ManifestsInCollection(collection_id) => vec![
                values_clause("anchor", collection_id),
                "?collection a class:Collection ;".to_string(),
                "    dc:identifier ?anchor ;".to_string(),
                "    rel:items ?entity .".to_string(),
                "?entity a class:Manifest ;".to_string(),
                "    dc:identifier ?id ;".to_string(),
                "    attr:label ?label .".to_string(),
            ],
            Self::EntitiesWithLabel(label) => vec![
                "?entity attr:label ?label ;".to_string(),
                "    dc:identifier ?id ;".to_string(),
                "    a ?type .".to_string(),
                lexical_filter("label", label),
            ],
            Self::EntitiesWithId(id) => vec![
                values_clause("id", id),
                "?entity dc:identifier ?id ;".to_string(),
                "    attr:label ?label ;".to_string(),
                "    a ?type .".to_string(),
            ],
        };

        let mut query = format!(
            "PREFIX dc: <{DC_NS}>\n\
             PREFIX attr: <{ATTRIBUTE_NS}>\n\
             PREFIX class: <{CLASS_NS}>\n\
             PREFIX rel: <{RELATION_NS}>\n\n\
             SELECT {projection}\nWHERE {{\n"
        );
        for pattern in patterns {
            query.push_str("    ");
            query.push_str(&pattern);
            query.push('\n');
        }
        query.push_str("}\n");
        query
    }
}

fn values_clause(var: &str, value: &str) -> String {
    format!("VALUES ?{var} {{ \"{}\" }}", escape_literal(value))
}

fn lexical_filter(var: &str, value: &str) -> String {
    format!("FILTER(str(?{var}) = \"{}\")", escape_literal(value))
}

/// One structural entity returned by the triple store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRow {
    /// Subject IRI of the entity.
    pub entity: String,
    pub id: String,
    pub label: String,
    pub kind: EntityKind,
}

/// Query processor bound to one SPARQL endpoint.
#[derive(Clone)]
pub struct TripleStoreProcessor {
    endpoint: Url,
    transport: Arc<dyn SparqlTransport>,
}

impl TripleStoreProcessor {
    pub fn new(endpoint: Url, transport: Arc<dyn SparqlTransport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn transport(&self) -> &Arc<dyn SparqlTransport> {
        &self.transport
    }

    pub fn all_canvases(&self) -> StoreResult<Vec<GraphRow>> {
        self.run(&GraphQuery::AllOfKind(EntityKind::Canvas))
    }

    pub fn all_collections(&self) -> StoreResult<Vec<GraphRow>> {
        self.run(&GraphQuery::AllOfKind(EntityKind::Collection))
    }

    pub fn all_manifests(&self) -> StoreResult<Vec<GraphRow>> {
        self.run(&GraphQuery::AllOfKind(EntityKind::Manifest))
    }

    pub fn all_entities(&self) -> StoreResult<Vec<GraphRow>> {
        self.run(&GraphQuery::AllEntities)
    }

    pub fn canvases_in_collection(&self, collection_id: &str) -> StoreResult<Vec<GraphRow>> {
        self.run(&GraphQuery::CanvasesInCollection(collection_id.to_string()))
    }

    pub fn canvases_in_manifest(&self, manifest_id: &str) -> StoreResult<Vec<GraphRow>> {
        self.run(&GraphQuery::CanvasesInManifest(manifest_id.to_string()))
    }

    pub fn manifests_in_collection(&self, collection_id: &str) -> StoreResult<Vec<GraphRow>> {
        self.run(&GraphQuery::ManifestsInCollection(collection_id.to_string()))
    }

    pub fn entities_with_label(&self, label: &str) -> StoreResult<Vec<GraphRow>> {
        self.run(&GraphQuery::EntitiesWithLabel(label.to_string()))
    }

    pub fn entities_with_id(&self, id: &str) -> StoreResult<Vec<GraphRow>> {
        self.run(&GraphQuery::EntitiesWithId(id.to_string()))
    }

    /// Executes one query and decodes its rows.
    pub fn run(&self, query: &GraphQuery) -> StoreResult<Vec<GraphRow>> {
        let started_at = Instant::now();
        let results = self.transport.select(&self.endpoint, query)?;
        let rows = decode_rows(query, &results)?;
        debug!(
            "event=triplestore_query module=backend status=ok op={} rows={} skipped={} duration_ms={}",
            query.op_name(),
            rows.len(),
            results.len() - rows.len(),
            started_at.elapsed().as_millis()
        );
        Ok(rows)
    }
}

impl std::fmt::Debug for TripleStoreProcessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripleStoreProcessor")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// Decodes bindings; rows typed with a non-catalog class are skipped.
pub fn decode_rows(query: &GraphQuery, results: &SparqlResults) -> StoreResult<Vec<GraphRow>> {
    let mut rows = Vec::with_capacity(results.len());
    for binding in results.rows() {
        let kind = match query.declared_kind() {
            Some(kind) => kind,
            None => match kind_from_class_iri(required(query, binding, "type")?) {
                Some(kind) => kind,
                None => continue,
            },
        };

        rows.push(GraphRow {
            entity: required(query, binding, "entity")?.to_string(),
            id: required(query, binding, "id")?.to_string(),
            label: required(query, binding, "label")?.to_string(),
            kind,
        });
    }
    Ok(rows)
}

fn required<'a>(
    query: &GraphQuery,
    binding: &'a BTreeMap<String, SparqlBinding>,
    var: &str,
) -> StoreResult<&'a str> {
    binding
        .get(var)
        .map(|term| term.value.as_str())
        .ok_or_else(|| {
            StoreError::MalformedResult(format!(
                "binding for `{}` is missing variable `{var}`",
                query.op_name()
            ))
        })
}
