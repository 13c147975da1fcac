//! Join and aggregation of per-backend row sets.
//!
//! # Invariants
//! - Either side empty means no merged rows, never a one-sided fallback.
//! - Output is sorted by `id` ascending with one entry per `id`.
//! - Creators are folded with the creators codec: joined, then re-split.

use crate::backend::{AnnotationRow, EntityRow, GraphRow, ImageRow};
use crate::model::creators::{join_creators, split_creators};
use crate::model::entity::{
    Annotation, Canvas, CatalogEntity, EntityId, EntityKind, EntityWithMetadata,
    IdentifiableEntity, Image,
};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Which side decides membership of the merged relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinPolicy {
    /// Keep every triple-store id; relational data is optional enrichment.
    GraphDriven,
    /// Keep only ids present on both sides.
    Inner,
}

/// One entity after the cross-store join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergedEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub label: String,
    pub title: String,
    pub creators: Vec<String>,
}

impl MergedEntity {
    pub fn metadata(&self) -> EntityWithMetadata {
        EntityWithMetadata::new(
            self.id.clone(),
            self.label.clone(),
            self.title.clone(),
            self.creators.clone(),
        )
    }

    pub fn to_catalog_entity(&self) -> CatalogEntity {
        CatalogEntity::from_metadata(self.kind, self.metadata())
    }

    pub fn to_canvas(&self) -> Canvas {
        Canvas::new(self.metadata())
    }
}

#[derive(Debug, Default)]
struct RelationalAggregate {
    title: String,
    creators: Vec<String>,
}

/// Folds each store's relational rows into one aggregate per `id`.
///
/// The first store listing an `id` contributes its full creator list, repeats
/// included. Later stores fill a missing title and add only creators not
/// already present.
fn aggregate_relational(stores: &[Vec<EntityRow>]) -> BTreeMap<&str, RelationalAggregate> {
    let mut aggregates: BTreeMap<&str, RelationalAggregate> = BTreeMap::new();
    for rows in stores {
        for (id, local) in aggregate_store(rows) {
            match aggregates.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(local);
                }
                Entry::Occupied(mut slot) => {
                    let aggregate = slot.get_mut();
                    if aggregate.title.is_empty() {
                        aggregate.title = local.title;
                    }
                    for creator in local.creators {
                        if !aggregate.creators.contains(&creator) {
                            aggregate.creators.push(creator);
                        }
                    }
                }
            }
        }
    }

    for aggregate in aggregates.values_mut() {
        let folded = join_creators(&aggregate.creators);
        aggregate.creators = split_creators(&folded);
    }
    aggregates
}

fn aggregate_store(rows: &[EntityRow]) -> BTreeMap<&str, RelationalAggregate> {
    let mut aggregates: BTreeMap<&str, RelationalAggregate> = BTreeMap::new();
    for row in rows {
        let aggregate = aggregates.entry(row.id.as_str()).or_default();
        if aggregate.title.is_empty() {
            if let Some(title) = row.title.as_deref() {
                aggregate.title = title.to_string();
            }
        }
        if let Some(creator) = row.creator.as_deref().filter(|creator| !creator.is_empty()) {
            aggregate.creators.push(creator.to_string());
        }
    }
    aggregates
}

/// Joins triple-store rows with per-store relational entity rows on `id`.
pub(crate) fn merge_entities(
    graph: &[GraphRow],
    relational: &[Vec<EntityRow>],
    policy: JoinPolicy,
) -> Vec<MergedEntity> {
    if graph.is_empty() || relational.iter().all(Vec::is_empty) {
        return Vec::new();
    }

    let mut structural: BTreeMap<&str, &GraphRow> = BTreeMap::new();
    for row in graph {
        if let Entry::Vacant(slot) = structural.entry(row.id.as_str()) {
            slot.insert(row);
        }
    }

    let aggregates = aggregate_relational(relational);
    structural
        .into_iter()
        .filter_map(|(id, row)| {
            let enrichment = aggregates.get(id);
            if enrichment.is_none() && policy == JoinPolicy::Inner {
                return None;
            }
            Some(MergedEntity {
                id: id.to_string(),
                kind: row.kind,
                label: row.label.clone(),
                title: enrichment
                    .map(|aggregate| aggregate.title.clone())
                    .unwrap_or_default(),
                creators: enrichment
                    .map(|aggregate| aggregate.creators.clone())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Deduplicates annotation rows by `id` and sorts them.
pub(crate) fn collect_annotations(rows: Vec<AnnotationRow>) -> Vec<Annotation> {
    let mut by_id: BTreeMap<String, Annotation> = BTreeMap::new();
    for row in rows {
        by_id.entry(row.id.clone()).or_insert_with(|| {
            Annotation::new(
                row.id,
                row.motivation,
                IdentifiableEntity::new(row.target),
                Image::new(row.body),
            )
        });
    }
    by_id.into_values().collect()
}

/// Deduplicates image rows by `id` and sorts them.
pub(crate) fn collect_images(rows: Vec<ImageRow>) -> Vec<Image> {
    let mut ids: Vec<String> = rows.into_iter().map(|row| row.id).collect();
    ids.sort();
    ids.dedup();
    ids.into_iter().map(Image::new).collect()
}

/// Bodies of annotations whose target is one of `targets`, sorted and unique.
pub(crate) fn annotation_bodies(targets: &[GraphRow], annotations: &[AnnotationRow]) -> Vec<Image> {
    if targets.is_empty() || annotations.is_empty() {
        return Vec::new();
    }
    let mut bodies: Vec<&str> = annotations
        .iter()
        .filter(|annotation| targets.iter().any(|target| target.id == annotation.target))
        .map(|annotation| annotation.body.as_str())
        .collect();
    bodies.sort_unstable();
    bodies.dedup();
    bodies.into_iter().map(Image::new).collect()
}

/// Annotations whose target is one of `targets`, sorted and unique by `id`.
pub(crate) fn annotations_on(targets: &[GraphRow], annotations: Vec<AnnotationRow>) -> Vec<Annotation> {
    if targets.is_empty() {
        return Vec::new();
    }
    collect_annotations(
        annotations
            .into_iter()
            .filter(|annotation| targets.iter().any(|target| target.id == annotation.target))
            .collect(),
    )
}
