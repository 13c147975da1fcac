//! Triple-store loader for collection hierarchies.
//!
//! # Responsibility
//! - Flatten nested collection records into class, identifier, label and
//!   `items` triples.
//! - Send the triples to an endpoint as one `INSERT DATA` update.
//!
//! # Invariants
//! - The same identifier always mints the same subject IRI.
//! - Descriptive triples are emitted once per subject even when an entity
//!   appears under several parents.

use crate::backend::sparql::SparqlTransport;
use crate::backend::triplestore::{class_iri, identifier_iri, items_iri, label_iri};
use crate::backend::{escape_literal, TripleStoreProcessor};
use crate::ingest::records::CollectionRecord;
use crate::ingest::{require_non_empty, IngestResult};
use crate::model::entity::EntityKind;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Formatter;
use std::sync::Arc;
use std::time::Instant;
use url::Url;
use uuid::Uuid;

const SUBJECT_NS: &str = "https://github.com/n1kg0r/ds-project-dhdk/";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid slug regex"));

/// Object position of a triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfTerm {
    Iri(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: RdfTerm,
}

impl Triple {
    fn iri(subject: &str, predicate: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.into(),
            object: RdfTerm::Iri(object.into()),
        }
    }

    fn literal(subject: &str, predicate: impl Into<String>, value: &str) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.into(),
            object: RdfTerm::Literal(value.to_string()),
        }
    }

    /// Renders the triple as one N-Triples style statement.
    pub fn to_statement(&self) -> String {
        let object = match &self.object {
            RdfTerm::Iri(iri) => format!("<{iri}>"),
            RdfTerm::Literal(value) => format!("\"{}\"", escape_literal(value)),
        };
        format!("<{}> <{}> {} .", self.subject, self.predicate, object)
    }
}

/// Mints the subject IRI for a catalog entity.
///
/// Runs of characters outside `[A-Za-z0-9_-]` collapse to `_`; the
/// name-based UUID suffix keeps ids that collapse to the same slug apart.
pub fn mint_subject_iri(kind: EntityKind, id: &str) -> String {
    let class = kind.class_name().to_ascii_lowercase();
    let slug = NON_SLUG_RE.replace_all(id, "_");
    let name = Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{SUBJECT_NS}{class}/{id}").as_bytes(),
    );
    format!("{SUBJECT_NS}{class}-{slug}-{}", name.simple())
}

/// Flattens collection records into triples.
///
/// # Errors
/// - Returns `IngestError::InvalidRecord` when any nested id is blank; the
///   index is the position of the top-level collection.
pub fn collection_triples(records: &[CollectionRecord]) -> IngestResult<Vec<Triple>> {
    let mut triples = Vec::new();
    let mut described = HashSet::new();

    for (index, collection) in records.iter().enumerate() {
        require_non_empty(index, "id", &collection.id)?;
        let collection_iri = mint_subject_iri(EntityKind::Collection, &collection.id);
        describe(
            &mut triples,
            &mut described,
            &collection_iri,
            EntityKind::Collection,
            &collection.id,
            &collection.label,
        );

        for manifest in &collection.items {
            require_non_empty(index, "manifest id", &manifest.id)?;
            let manifest_iri = mint_subject_iri(EntityKind::Manifest, &manifest.id);
            describe(
                &mut triples,
                &mut described,
                &manifest_iri,
                EntityKind::Manifest,
                &manifest.id,
                &manifest.label,
            );
            triples.push(Triple::iri(&collection_iri, items_iri(), &manifest_iri));

            for canvas in &manifest.items {
                require_non_empty(index, "canvas id", &canvas.id)?;
                let canvas_iri = mint_subject_iri(EntityKind::Canvas, &canvas.id);
                describe(
                    &mut triples,
                    &mut described,
                    &canvas_iri,
                    EntityKind::Canvas,
                    &canvas.id,
                    &canvas.label,
                );
                triples.push(Triple::iri(&manifest_iri, items_iri(), &canvas_iri));
            }
        }
    }

    Ok(triples)
}

fn describe(
    triples: &mut Vec<Triple>,
    described: &mut HashSet<String>,
    subject: &str,
    kind: EntityKind,
    id: &str,
    label: &str,
) {
    if !described.insert(subject.to_string()) {
        return;
    }
    triples.push(Triple::iri(subject, RDF_TYPE, class_iri(kind)));
    triples.push(Triple::literal(subject, identifier_iri(), id));
    triples.push(Triple::literal(subject, label_iri(), label));
}

/// Renders triples as one SPARQL `INSERT DATA` update.
pub fn insert_data(triples: &[Triple]) -> String {
    let mut update = String::from("INSERT DATA {\n");
    for triple in triples {
        update.push_str("    ");
        update.push_str(&triple.to_statement());
        update.push('\n');
    }
    update.push_str("}\n");
    update
}

/// Writes collection hierarchies into a triple store.
pub trait CollectionLoader {
    /// Returns the number of triples written.
    fn load_collections(&self, records: &[CollectionRecord]) -> IngestResult<usize>;
}

#[derive(Clone)]
pub struct TripleStoreCollectionLoader {
    endpoint: Url,
    transport: Arc<dyn SparqlTransport>,
}

impl TripleStoreCollectionLoader {
    pub fn new(endpoint: Url, transport: Arc<dyn SparqlTransport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    /// Loader writing to the same endpoint and transport as `processor`.
    pub fn for_processor(processor: &TripleStoreProcessor) -> Self {
        Self::new(
            processor.endpoint().clone(),
            Arc::clone(processor.transport()),
        )
    }
}

impl CollectionLoader for TripleStoreCollectionLoader {
    fn load_collections(&self, records: &[CollectionRecord]) -> IngestResult<usize> {
        let started_at = Instant::now();
        let triples = collection_triples(records)?;
        if triples.is_empty() {
            return Ok(0);
        }

        self.transport
            .update(&self.endpoint, &insert_data(&triples))?;
        info!(
            "event=ingest_collections module=ingest status=ok collections={} triples={} duration_ms={}",
            records.len(),
            triples.len(),
            started_at.elapsed().as_millis()
        );
        Ok(triples.len())
    }
}

impl std::fmt::Debug for TripleStoreCollectionLoader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripleStoreCollectionLoader")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{collection_triples, insert_data, mint_subject_iri, RdfTerm};
    use crate::ingest::records::{CanvasRecord, CollectionRecord, ManifestRecord};
    use crate::model::entity::EntityKind;

    fn collection() -> CollectionRecord {
        CollectionRecord {
            id: "https://example.org/iiif/collection/1".to_string(),
            label: "Quaderni".to_string(),
            items: vec![ManifestRecord {
                id: "manifest-9".to_string(),
                label: "Quaderno 9".to_string(),
                items: vec![
                    CanvasRecord {
                        id: "c1".to_string(),
                        label: "Folio one".to_string(),
                    },
                    CanvasRecord {
                        id: "c2".to_string(),
                        label: "Folio \"two\"".to_string(),
                    },
                ],
            }],
        }
    }

    #[test]
    fn minted_iris_are_stable_and_distinct() {
        let first = mint_subject_iri(EntityKind::Canvas, "a/b");
        assert_eq!(first, mint_subject_iri(EntityKind::Canvas, "a/b"));
        assert_ne!(first, mint_subject_iri(EntityKind::Canvas, "a:b"));
        assert_ne!(first, mint_subject_iri(EntityKind::Manifest, "a/b"));
        assert!(first.starts_with("https://github.com/n1kg0r/ds-project-dhdk/canvas-a_b-"));
        assert_eq!(first.rsplit('-').next().map(str::len), Some(32));
    }

    #[test]
    fn flattens_hierarchy_into_described_subjects_and_edges() {
        let triples = collection_triples(&[collection()]).unwrap();
        // 4 subjects x 3 descriptive triples + 3 containment edges
        assert_eq!(triples.len(), 15);
        assert!(triples.iter().any(|triple| {
            triple.object == RdfTerm::Literal("manifest-9".to_string())
                && triple.predicate.ends_with("identifier")
        }));
    }

    #[test]
    fn update_text_escapes_literals() {
        let update = insert_data(&collection_triples(&[collection()]).unwrap());
        assert!(update.starts_with("INSERT DATA {"));
        assert!(update.contains("\"Folio \\\"two\\\"\""));
    }
}
