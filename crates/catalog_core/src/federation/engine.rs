//! Federated query engine over relational and triple-store processors.
//!
//! # Responsibility
//! - Dispatch each logical catalog question to every registered backend.
//! - Isolate backend failures and merge the surviving row sets on `id`.
//! - Materialize domain objects from the merged relation.
//!
//! # Invariants
//! - Backends are called sequentially, in registration order.
//! - A failing backend is logged and excluded; it never fails the query.
//! - Merge queries return nothing when either store contributed no rows.
//! - Results are sorted by `id` ascending with no duplicates.

use crate::backend::{
    EntityRow, GraphRow, HttpSparqlTransport, QueryProcessor, RelationalProcessor,
    SparqlTransport, StoreResult, TripleStoreProcessor,
};
use crate::config::{CatalogConfig, ConfigError, ConfigResult};
use crate::federation::merge::{
    annotation_bodies, annotations_on, collect_annotations, collect_images, merge_entities,
    JoinPolicy, MergedEntity,
};
use crate::federation::outcome::{BackendOutcome, FederatedResult};
use crate::logging::init_logging_with_config;
use crate::model::entity::{
    Annotation, Canvas, CatalogEntity, Collection, EntityKind, Image, Manifest,
};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Engine holding an ordered, owned set of backend processors.
///
/// Mutation takes `&mut self`; callers sharing one engine across threads wrap
/// it in their own lock.
#[derive(Debug, Default, Clone)]
pub struct FederatedQueryEngine {
    processors: Vec<QueryProcessor>,
}

impl FederatedQueryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processors(processors: Vec<QueryProcessor>) -> Self {
        Self { processors }
    }

    /// Builds an engine from config using the blocking HTTP transport.
    ///
    /// # Errors
    /// - Returns `ConfigError` for any invalid locator; no processor is built.
    pub fn from_config(config: &CatalogConfig) -> ConfigResult<Self> {
        config.validate()?;
        let transport =
            HttpSparqlTransport::new(config.http_timeout()).map_err(ConfigError::Transport)?;
        Self::from_config_with_transport(config, Arc::new(transport))
    }

    /// Builds an engine from config with a caller-provided SPARQL transport.
    ///
    /// Starts file logging first when the config names a `log_dir`.
    pub fn from_config_with_transport(
        config: &CatalogConfig,
        transport: Arc<dyn SparqlTransport>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        init_logging_with_config(config)?;
        let processors = config
            .locators()?
            .into_iter()
            .map(|locator| QueryProcessor::from_locator(locator, Arc::clone(&transport)))
            .collect::<Vec<_>>();
        info!(
            "event=engine_init module=federation status=ok processors={}",
            processors.len()
        );
        Ok(Self { processors })
    }

    pub fn add_processor(&mut self, processor: impl Into<QueryProcessor>) {
        self.processors.push(processor.into());
    }

    pub fn clear_processors(&mut self) {
        self.processors.clear();
    }

    pub fn processors(&self) -> &[QueryProcessor] {
        &self.processors
    }

    // Kind-agnostic lookups.

    pub fn entity_by_id(&self, id: &str) -> Option<CatalogEntity> {
        self.entity_by_id_report(id).into_value()
    }

    pub fn entity_by_id_report(&self, id: &str) -> FederatedResult<Option<CatalogEntity>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("entities_with_id", |store: &TripleStoreProcessor| store.entities_with_id(id)),
            ("all_entities", |store: &RelationalProcessor| store.all_entities()),
        );
        let entity = merge_entities(&graph, &relational, JoinPolicy::GraphDriven)
            .first()
            .map(MergedEntity::to_catalog_entity);
        let count = usize::from(entity.is_some());
        finish("entity_by_id", started_at, entity, count, outcomes)
    }

    pub fn entities_with_label(&self, label: &str) -> Vec<CatalogEntity> {
        self.entities_with_label_report(label).into_value()
    }

    pub fn entities_with_label_report(&self, label: &str) -> FederatedResult<Vec<CatalogEntity>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("entities_with_label", |store: &TripleStoreProcessor| {
                store.entities_with_label(label)
            }),
            ("all_entities", |store: &RelationalProcessor| store.all_entities()),
        );
        let entities = to_catalog_entities(merge_entities(
            &graph,
            &relational,
            JoinPolicy::GraphDriven,
        ));
        let count = entities.len();
        finish("entities_with_label", started_at, entities, count, outcomes)
    }

    pub fn entities_with_title(&self, title: &str) -> Vec<CatalogEntity> {
        self.entities_with_title_report(title).into_value()
    }

    /// Entities whose relational title equals `title`, shaped by their class.
    pub fn entities_with_title_report(&self, title: &str) -> FederatedResult<Vec<CatalogEntity>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("all_entities", |store: &TripleStoreProcessor| store.all_entities()),
            ("entities_with_title", |store: &RelationalProcessor| {
                store.entities_with_title(title)
            }),
        );
        let entities =
            to_catalog_entities(merge_entities(&graph, &relational, JoinPolicy::Inner));
        let count = entities.len();
        finish("entities_with_title", started_at, entities, count, outcomes)
    }

    pub fn entities_with_creator(&self, creator: &str) -> Vec<CatalogEntity> {
        self.entities_with_creator_report(creator).into_value()
    }

    /// Entities listing `creator`, carrying their full creator sequence.
    pub fn entities_with_creator_report(
        &self,
        creator: &str,
    ) -> FederatedResult<Vec<CatalogEntity>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("all_entities", |store: &TripleStoreProcessor| store.all_entities()),
            ("entities_with_creator", |store: &RelationalProcessor| {
                store.entities_with_creator(creator)
            }),
        );
        let entities =
            to_catalog_entities(merge_entities(&graph, &relational, JoinPolicy::Inner));
        let count = entities.len();
        finish("entities_with_creator", started_at, entities, count, outcomes)
    }

    // Containment hierarchy.

    pub fn canvases_in_collection(&self, collection_id: &str) -> Vec<Canvas> {
        self.canvases_in_collection_report(collection_id)
            .into_value()
    }

    pub fn canvases_in_collection_report(
        &self,
        collection_id: &str,
    ) -> FederatedResult<Vec<Canvas>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("canvases_in_collection", |store: &TripleStoreProcessor| {
                store.canvases_in_collection(collection_id)
            }),
            ("all_entities", |store: &RelationalProcessor| store.all_entities()),
        );
        let canvases = to_canvases(&graph, &relational);
        let count = canvases.len();
        finish("canvases_in_collection", started_at, canvases, count, outcomes)
    }

    pub fn canvases_in_manifest(&self, manifest_id: &str) -> Vec<Canvas> {
        self.canvases_in_manifest_report(manifest_id).into_value()
    }

    pub fn canvases_in_manifest_report(&self, manifest_id: &str) -> FederatedResult<Vec<Canvas>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("canvases_in_manifest", |store: &TripleStoreProcessor| {
                store.canvases_in_manifest(manifest_id)
            }),
            ("all_entities", |store: &RelationalProcessor| store.all_entities()),
        );
        let canvases = to_canvases(&graph, &relational);
        let count = canvases.len();
        finish("canvases_in_manifest", started_at, canvases, count, outcomes)
    }

    pub fn manifests_in_collection(&self, collection_id: &str) -> Vec<Manifest> {
        self.manifests_in_collection_report(collection_id)
            .into_value()
    }

    /// Manifests of a collection, each with its canvases attached.
    pub fn manifests_in_collection_report(
        &self,
        collection_id: &str,
    ) -> FederatedResult<Vec<Manifest>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("manifests_in_collection", |store: &TripleStoreProcessor| {
                store.manifests_in_collection(collection_id)
            }),
            ("all_entities", |store: &RelationalProcessor| store.all_entities()),
        );
        let manifests = merge_entities(&graph, &relational, JoinPolicy::GraphDriven)
            .iter()
            .map(|merged| self.manifest_with_items(merged, &relational, &mut outcomes))
            .collect::<Vec<_>>();
        let count = manifests.len();
        finish("manifests_in_collection", started_at, manifests, count, outcomes)
    }

    // All-of-kind scans.

    pub fn all_canvases(&self) -> Vec<Canvas> {
        self.all_canvases_report().into_value()
    }

    pub fn all_canvases_report(&self) -> FederatedResult<Vec<Canvas>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("all_canvases", |store: &TripleStoreProcessor| store.all_canvases()),
            ("all_entities", |store: &RelationalProcessor| store.all_entities()),
        );
        let canvases = to_canvases(&graph, &relational);
        let count = canvases.len();
        finish("all_canvases", started_at, canvases, count, outcomes)
    }

    pub fn all_manifests(&self) -> Vec<Manifest> {
        self.all_manifests_report().into_value()
    }

    pub fn all_manifests_report(&self) -> FederatedResult<Vec<Manifest>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("all_manifests", |store: &TripleStoreProcessor| store.all_manifests()),
            ("all_entities", |store: &RelationalProcessor| store.all_entities()),
        );
        let manifests = merge_entities(&graph, &relational, JoinPolicy::GraphDriven)
            .iter()
            .map(|merged| self.manifest_with_items(merged, &relational, &mut outcomes))
            .collect::<Vec<_>>();
        let count = manifests.len();
        finish("all_manifests", started_at, manifests, count, outcomes)
    }

    pub fn all_collections(&self) -> Vec<Collection> {
        self.all_collections_report().into_value()
    }

    /// Every collection with its manifests and their canvases attached.
    pub fn all_collections_report(&self) -> FederatedResult<Vec<Collection>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, relational) = self.collect(
            &mut outcomes,
            ("all_collections", |store: &TripleStoreProcessor| store.all_collections()),
            ("all_entities", |store: &RelationalProcessor| store.all_entities()),
        );
        let mut collections = Vec::new();
        for merged in merge_entities(&graph, &relational, JoinPolicy::GraphDriven) {
            let manifest_rows =
                self.collect_graph(&mut outcomes, "manifests_in_collection", |store| {
                    store.manifests_in_collection(&merged.id)
                });
            let mut items = Vec::new();
            for manifest in merge_entities(&manifest_rows, &relational, JoinPolicy::GraphDriven) {
                items.push(self.manifest_with_items(&manifest, &relational, &mut outcomes));
            }
            collections.push(Collection::new(merged.metadata(), items));
        }
        let count = collections.len();
        finish("all_collections", started_at, collections, count, outcomes)
    }

    // Annotations and images.

    pub fn all_annotations(&self) -> Vec<Annotation> {
        self.all_annotations_report().into_value()
    }

    pub fn all_annotations_report(&self) -> FederatedResult<Vec<Annotation>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let rows = self.collect_relational(&mut outcomes, "all_annotations", |store| {
            store.all_annotations()
        });
        let annotations = collect_annotations(rows);
        let count = annotations.len();
        finish("all_annotations", started_at, annotations, count, outcomes)
    }

    pub fn all_images(&self) -> Vec<Image> {
        self.all_images_report().into_value()
    }

    pub fn all_images_report(&self) -> FederatedResult<Vec<Image>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let rows = self.collect_relational(&mut outcomes, "all_images", |store| store.all_images());
        let images = collect_images(rows);
        let count = images.len();
        finish("all_images", started_at, images, count, outcomes)
    }

    pub fn annotations_with_body(&self, body_id: &str) -> Vec<Annotation> {
        self.annotations_with_body_report(body_id).into_value()
    }

    pub fn annotations_with_body_report(&self, body_id: &str) -> FederatedResult<Vec<Annotation>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let rows = self.collect_relational(&mut outcomes, "annotations_with_body", |store| {
            store.annotations_with_body(body_id)
        });
        let annotations = collect_annotations(rows);
        let count = annotations.len();
        finish("annotations_with_body", started_at, annotations, count, outcomes)
    }

    pub fn annotations_with_target(&self, target_id: &str) -> Vec<Annotation> {
        self.annotations_with_target_report(target_id).into_value()
    }

    pub fn annotations_with_target_report(
        &self,
        target_id: &str,
    ) -> FederatedResult<Vec<Annotation>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let rows = self.collect_relational(&mut outcomes, "annotations_with_target", |store| {
            store.annotations_with_target(target_id)
        });
        let annotations = collect_annotations(rows);
        let count = annotations.len();
        finish("annotations_with_target", started_at, annotations, count, outcomes)
    }

    pub fn annotations_with_body_and_target(
        &self,
        body_id: &str,
        target_id: &str,
    ) -> Vec<Annotation> {
        self.annotations_with_body_and_target_report(body_id, target_id)
            .into_value()
    }

    /// Annotations filtered by body and target; an empty value matches all.
    pub fn annotations_with_body_and_target_report(
        &self,
        body_id: &str,
        target_id: &str,
    ) -> FederatedResult<Vec<Annotation>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let rows = self.collect_relational(
            &mut outcomes,
            "annotations_with_body_and_target",
            |store| store.annotations_with_body_and_target(body_id, target_id),
        );
        let annotations = collect_annotations(rows);
        let count = annotations.len();
        finish(
            "annotations_with_body_and_target",
            started_at,
            annotations,
            count,
            outcomes,
        )
    }

    pub fn images_annotating_canvas(&self, canvas_id: &str) -> Vec<Image> {
        self.images_annotating_canvas_report(canvas_id).into_value()
    }

    /// Bodies of annotations targeting a canvas known to the triple store.
    pub fn images_annotating_canvas_report(&self, canvas_id: &str) -> FederatedResult<Vec<Image>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, annotations) = self.collect(
            &mut outcomes,
            ("entities_with_id", |store: &TripleStoreProcessor| {
                store.entities_with_id(canvas_id)
            }),
            ("annotations_with_target", |store: &RelationalProcessor| {
                store.annotations_with_target(canvas_id)
            }),
        );
        let canvases = of_kind(graph, EntityKind::Canvas);
        let images = annotation_bodies(&canvases, &annotations.concat());
        let count = images.len();
        finish("images_annotating_canvas", started_at, images, count, outcomes)
    }

    pub fn annotations_to_canvas(&self, canvas_id: &str) -> Vec<Annotation> {
        self.annotations_to_kind_report(EntityKind::Canvas, canvas_id)
            .into_value()
    }

    pub fn annotations_to_manifest(&self, manifest_id: &str) -> Vec<Annotation> {
        self.annotations_to_kind_report(EntityKind::Manifest, manifest_id)
            .into_value()
    }

    pub fn annotations_to_collection(&self, collection_id: &str) -> Vec<Annotation> {
        self.annotations_to_kind_report(EntityKind::Collection, collection_id)
            .into_value()
    }

    /// Annotations targeting `target_id` when the triple store declares it
    /// with class `kind`.
    pub fn annotations_to_kind_report(
        &self,
        kind: EntityKind,
        target_id: &str,
    ) -> FederatedResult<Vec<Annotation>> {
        let started_at = Instant::now();
        let mut outcomes = Vec::new();
        let (graph, annotations) = self.collect(
            &mut outcomes,
            ("entities_with_id", |store: &TripleStoreProcessor| {
                store.entities_with_id(target_id)
            }),
            ("annotations_with_target", |store: &RelationalProcessor| {
                store.annotations_with_target(target_id)
            }),
        );
        let targets = of_kind(graph, kind);
        let result = annotations_on(&targets, annotations.concat());
        let count = result.len();
        finish("annotations_to_kind", started_at, result, count, outcomes)
    }

    fn manifest_with_items(
        &self,
        merged: &MergedEntity,
        relational: &[Vec<EntityRow>],
        outcomes: &mut Vec<BackendOutcome>,
    ) -> Manifest {
        let canvas_rows = self.collect_graph(outcomes, "canvases_in_manifest", |store| {
            store.canvases_in_manifest(&merged.id)
        });
        Manifest::new(merged.metadata(), to_canvases(&canvas_rows, relational))
    }

    /// Calls every processor once, in registration order, with the op
    /// matching its variant. Relational rows stay grouped per store.
    fn collect<R, G, Q>(
        &self,
        outcomes: &mut Vec<BackendOutcome>,
        graph_op: (&'static str, G),
        relational_op: (&'static str, Q),
    ) -> (Vec<GraphRow>, Vec<Vec<R>>)
    where
        G: Fn(&TripleStoreProcessor) -> StoreResult<Vec<GraphRow>>,
        Q: Fn(&RelationalProcessor) -> StoreResult<Vec<R>>,
    {
        let (graph_name, graph_call) = graph_op;
        let (relational_name, relational_call) = relational_op;
        let mut graph = Vec::new();
        let mut relational = Vec::new();

        for processor in &self.processors {
            match processor {
                QueryProcessor::TripleStore(store) => {
                    graph.extend(absorb(processor, graph_name, graph_call(store), outcomes));
                }
                QueryProcessor::Relational(store) => {
                    relational.push(absorb(
                        processor,
                        relational_name,
                        relational_call(store),
                        outcomes,
                    ));
                }
            }
        }

        (graph, relational)
    }

    fn collect_graph<G>(
        &self,
        outcomes: &mut Vec<BackendOutcome>,
        op: &'static str,
        call: G,
    ) -> Vec<GraphRow>
    where
        G: Fn(&TripleStoreProcessor) -> StoreResult<Vec<GraphRow>>,
    {
        let mut rows = Vec::new();
        for processor in &self.processors {
            if let QueryProcessor::TripleStore(store) = processor {
                rows.extend(absorb(processor, op, call(store), outcomes));
            }
        }
        rows
    }

    fn collect_relational<R, Q>(
        &self,
        outcomes: &mut Vec<BackendOutcome>,
        op: &'static str,
        call: Q,
    ) -> Vec<R>
    where
        Q: Fn(&RelationalProcessor) -> StoreResult<Vec<R>>,
    {
        let mut rows = Vec::new();
        for processor in &self.processors {
            if let QueryProcessor::Relational(store) = processor {
                rows.extend(absorb(processor, op, call(store), outcomes));
            }
        }
        rows
    }
}

fn absorb<T>(
    processor: &QueryProcessor,
    op: &'static str,
    result: StoreResult<Vec<T>>,
    outcomes: &mut Vec<BackendOutcome>,
) -> Vec<T> {
    match result {
        Ok(rows) => {
            outcomes.push(BackendOutcome::rows(processor, op, rows.len()));
            rows
        }
        Err(err) => {
            warn!(
                "event=backend_query module=federation status=error backend={} target={} op={} error={}",
                processor.backend_name(),
                processor.target(),
                op,
                err
            );
            outcomes.push(BackendOutcome::failed(processor, op, &err));
            Vec::new()
        }
    }
}

fn finish<T>(
    op: &'static str,
    started_at: Instant,
    value: T,
    count: usize,
    outcomes: Vec<BackendOutcome>,
) -> FederatedResult<T> {
    let failed = outcomes.iter().filter(|outcome| outcome.is_failure()).count();
    info!(
        "event=federated_query module=federation status={} op={} results={} backend_calls={} failed_calls={} duration_ms={}",
        if failed == 0 { "ok" } else { "partial" },
        op,
        count,
        outcomes.len(),
        failed,
        started_at.elapsed().as_millis()
    );
    FederatedResult {
        value,
        outcomes,
    }
}

fn to_catalog_entities(merged: Vec<MergedEntity>) -> Vec<CatalogEntity> {
    merged.iter().map(MergedEntity::to_catalog_entity).collect()
}

fn to_canvases(graph: &[GraphRow], relational: &[Vec<EntityRow>]) -> Vec<Canvas> {
    merge_entities(graph, relational, JoinPolicy::GraphDriven)
        .iter()
        .map(MergedEntity::to_canvas)
        .collect()
}

fn of_kind(rows: Vec<GraphRow>, kind: EntityKind) -> Vec<GraphRow> {
    rows.into_iter().filter(|row| row.kind == kind).collect()
}
