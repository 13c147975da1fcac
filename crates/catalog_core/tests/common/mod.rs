#![allow(dead_code)]

use catalog_core::backend::sparql::{SparqlBinding, SparqlResults, SparqlTransport};
use catalog_core::backend::triplestore::{class_iri, identifier_iri, items_iri, label_iri};
use catalog_core::backend::{GraphQuery, StoreError, StoreResult, TripleStoreProcessor};
use catalog_core::db::open_db;
use catalog_core::ingest::{
    collection_triples, AnnotationLoader, AnnotationRecord, CanvasRecord, CollectionRecord,
    ManifestRecord, MetadataLoader, MetadataRecord, RdfTerm, SqliteAnnotationLoader,
    SqliteMetadataLoader, Triple,
};
use catalog_core::model::entity::EntityKind;
use catalog_core::RelationalProcessor;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use url::Url;

pub const FIXTURE_ENDPOINT: &str = "http://fixture.test/blazegraph/sparql";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// In-memory triple store answering `GraphQuery` shapes directly.
#[derive(Default)]
pub struct FixtureTransport {
    triples: Vec<Triple>,
    pub updates: Mutex<Vec<String>>,
    pub selects: Mutex<Vec<GraphQuery>>,
}

struct Node {
    subject: String,
    id: String,
    label: String,
    kind: EntityKind,
}

impl FixtureTransport {
    pub fn from_triples(triples: Vec<Triple>) -> Self {
        Self {
            triples,
            ..Self::default()
        }
    }

    pub fn from_collections(records: &[CollectionRecord]) -> Self {
        Self::from_triples(collection_triples(records).unwrap())
    }

    fn literal(&self, subject: &str, predicate: &str) -> Option<String> {
        self.triples.iter().find_map(|triple| match &triple.object {
            RdfTerm::Literal(value) if triple.subject == subject && triple.predicate == predicate => {
                Some(value.clone())
            }
            _ => None,
        })
    }

    fn nodes(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        for triple in &self.triples {
            if triple.predicate != RDF_TYPE {
                continue;
            }
            let RdfTerm::Iri(class) = &triple.object else {
                continue;
            };
            let kind = [EntityKind::Collection, EntityKind::Manifest, EntityKind::Canvas]
                .into_iter()
                .find(|kind| class_iri(*kind) == *class);
            let (Some(kind), Some(id), Some(label)) = (
                kind,
                self.literal(&triple.subject, &identifier_iri()),
                self.literal(&triple.subject, &label_iri()),
            ) else {
                continue;
            };
            nodes.push(Node {
                subject: triple.subject.clone(),
                id,
                label,
                kind,
            });
        }
        nodes
    }

    fn children<'a>(&self, nodes: &'a [Node], parents: &[&Node], kind: EntityKind) -> Vec<&'a Node> {
        let items = items_iri();
        nodes
            .iter()
            .filter(|node| node.kind == kind)
            .filter(|node| {
                self.triples.iter().any(|triple| {
                    triple.predicate == items
                        && triple.object == RdfTerm::Iri(node.subject.clone())
                        && parents.iter().any(|parent| parent.subject == triple.subject)
                })
            })
            .collect()
    }

    fn evaluate<'a>(&self, nodes: &'a [Node], query: &GraphQuery) -> Vec<&'a Node> {
        let anchored = |id: &str, kind: EntityKind| -> Vec<&'a Node> {
            nodes
                .iter()
                .filter(|node| node.kind == kind && node.id == id)
                .collect()
        };
        match query {
            GraphQuery::AllOfKind(kind) => nodes.iter().filter(|node| node.kind == *kind).collect(),
            GraphQuery::AllEntities => nodes.iter().collect(),
            GraphQuery::EntitiesWithLabel(label) => {
                nodes.iter().filter(|node| &node.label == label).collect()
            }
            GraphQuery::EntitiesWithId(id) => nodes.iter().filter(|node| &node.id == id).collect(),
            GraphQuery::CanvasesInManifest(id) => {
                self.children(nodes, &anchored(id.as_str(), EntityKind::Manifest), EntityKind::Canvas)
            }
            GraphQuery::ManifestsInCollection(id) => {
                self.children(nodes, &anchored(id.as_str(), EntityKind::Collection), EntityKind::Manifest)
            }
            GraphQuery::CanvasesInCollection(id) => {
                let manifests =
                    self.children(nodes, &anchored(id.as_str(), EntityKind::Collection), EntityKind::Manifest);
                self.children(nodes, &manifests, EntityKind::Canvas)
            }
        }
    }
}

impl SparqlTransport for FixtureTransport {
    fn select(&self, _endpoint: &Url, query: &GraphQuery) -> StoreResult<SparqlResults> {
        self.selects.lock().unwrap().push(query.clone());
        let nodes = self.nodes();
        let vars = query.projected_vars();
        let rows = self
            .evaluate(&nodes, query)
            .into_iter()
            .map(|node| {
                let mut row = BTreeMap::new();
                row.insert("entity".to_string(), SparqlBinding::uri(&node.subject));
                row.insert("id".to_string(), SparqlBinding::literal(&node.id));
                row.insert("label".to_string(), SparqlBinding::literal(&node.label));
                if vars.contains(&"type") {
                    row.insert("type".to_string(), SparqlBinding::uri(class_iri(node.kind)));
                }
                row
            })
            .collect();
        Ok(SparqlResults::from_rows(vars, rows))
    }

    fn update(&self, _endpoint: &Url, update: &str) -> StoreResult<()> {
        self.updates.lock().unwrap().push(update.to_string());
        Ok(())
    }
}

/// Transport that behaves like an unreachable endpoint.
pub struct UnreachableTransport;

impl SparqlTransport for UnreachableTransport {
    fn select(&self, _endpoint: &Url, _query: &GraphQuery) -> StoreResult<SparqlResults> {
        Err(StoreError::Transport("connection refused".to_string()))
    }

    fn update(&self, _endpoint: &Url, _update: &str) -> StoreResult<()> {
        Err(StoreError::Transport("connection refused".to_string()))
    }
}

pub fn endpoint() -> Url {
    Url::parse(FIXTURE_ENDPOINT).unwrap()
}

pub fn triple_store(transport: impl SparqlTransport + 'static) -> TripleStoreProcessor {
    TripleStoreProcessor::new(endpoint(), Arc::new(transport))
}

pub fn canvas(id: &str, label: &str) -> CanvasRecord {
    CanvasRecord {
        id: id.to_string(),
        label: label.to_string(),
    }
}

/// Collection `collection-1` with manifests `manifest-1` and `manifest-9`.
pub fn catalog_collections() -> Vec<CollectionRecord> {
    vec![CollectionRecord {
        id: "collection-1".to_string(),
        label: "Quaderni".to_string(),
        items: vec![
            ManifestRecord {
                id: "manifest-9".to_string(),
                label: "Quaderno 9".to_string(),
                items: vec![canvas("c1", "Carta uno"), canvas("c2", "Carta due")],
            },
            ManifestRecord {
                id: "manifest-1".to_string(),
                label: "Manoscritto".to_string(),
                items: vec![canvas("canvas-1", "Folio one")],
            },
        ],
    }]
}

pub fn metadata(id: &str, title: &str, creator: &str) -> MetadataRecord {
    MetadataRecord {
        id: id.to_string(),
        title: title.to_string(),
        creator: creator.to_string(),
    }
}

pub fn catalog_metadata() -> Vec<MetadataRecord> {
    vec![
        metadata("canvas-1", "Folio 1", "Dante"),
        metadata("c1", "Carta 1", "Alighieri, Dante; Boccaccio"),
        metadata("manifest-9", "Quaderno nove", "Alighieri, Dante"),
        metadata("collection-1", "Raccolta", ""),
    ]
}

pub fn annotation(id: &str, body: &str, target: &str, motivation: &str) -> AnnotationRecord {
    AnnotationRecord {
        id: id.to_string(),
        body: body.to_string(),
        target: target.to_string(),
        motivation: motivation.to_string(),
    }
}

pub fn catalog_annotations() -> Vec<AnnotationRecord> {
    vec![
        annotation("annotation-1", "https://img.test/1.jpg", "c1", "painting"),
        annotation("annotation-2", "https://img.test/2.jpg", "canvas-1", "painting"),
        annotation("annotation-3", "https://img.test/3.jpg", "manifest-9", "commenting"),
        annotation("annotation-4", "https://img.test/1.jpg", "c1", "highlighting"),
    ]
}

/// Writes a migrated SQLite store at `dir/<name>` and loads the records.
pub fn relational_store(
    dir: &Path,
    name: &str,
    metadata: &[MetadataRecord],
    annotations: &[AnnotationRecord],
) -> PathBuf {
    let path = dir.join(name);
    let mut conn = open_db(&path).unwrap();
    SqliteMetadataLoader::try_new(&mut conn)
        .unwrap()
        .load_metadata(metadata)
        .unwrap();
    SqliteAnnotationLoader::try_new(&mut conn)
        .unwrap()
        .load_annotations(annotations)
        .unwrap();
    path
}

pub fn catalog_relational(dir: &Path) -> RelationalProcessor {
    RelationalProcessor::new(relational_store(
        dir,
        "relational.db",
        &catalog_metadata(),
        &catalog_annotations(),
    ))
}
