//! SQLite loaders for annotation and metadata records.
//!
//! # Invariants
//! - A load replaces the previous contents of the tables it owns.
//! - Surrogate keys are positional: `annotation-<n>`, `image-<n>`,
//!   `entity-<n>`.
//! - Image rows are one per distinct annotation body, in first-seen order.

use crate::db::migrations::verify_schema;
use crate::ingest::records::{AnnotationRecord, MetadataRecord};
use crate::ingest::{require_non_empty, IngestResult};
use crate::model::creators::split_creators;
use log::info;
use rusqlite::{params, Connection, TransactionBehavior};
use std::collections::HashSet;
use std::time::Instant;

/// Writes annotation records and the images they reference.
pub trait AnnotationLoader {
    /// Returns the number of annotations written.
    fn load_annotations(&mut self, records: &[AnnotationRecord]) -> IngestResult<usize>;
}

/// Writes entity metadata and its creators.
pub trait MetadataLoader {
    /// Returns the number of entities written.
    fn load_metadata(&mut self, records: &[MetadataRecord]) -> IngestResult<usize>;
}

pub struct SqliteAnnotationLoader<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteAnnotationLoader<'conn> {
    /// Constructs a loader from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> IngestResult<Self> {
        verify_schema(conn)?;
        Ok(Self { conn })
    }
}

impl AnnotationLoader for SqliteAnnotationLoader<'_> {
    fn load_annotations(&mut self, records: &[AnnotationRecord]) -> IngestResult<usize> {
        let started_at = Instant::now();
        for (index, record) in records.iter().enumerate() {
            require_non_empty(index, "id", &record.id)?;
            require_non_empty(index, "body", &record.body)?;
            require_non_empty(index, "target", &record.target)?;
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM Annotation;", [])?;
        tx.execute("DELETE FROM Image;", [])?;

        for (index, record) in records.iter().enumerate() {
            tx.execute(
                "INSERT INTO Annotation (annotationId, id, body, target, motivation)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    format!("annotation-{index}"),
                    record.id.as_str(),
                    record.body.as_str(),
                    record.target.as_str(),
                    record.motivation.as_str(),
                ],
            )?;
        }

        let mut seen = HashSet::new();
        let bodies = records
            .iter()
            .map(|record| record.body.as_str())
            .filter(|body| seen.insert(*body))
            .collect::<Vec<_>>();
        for (index, body) in bodies.iter().enumerate() {
            tx.execute(
                "INSERT INTO Image (imageId, id) VALUES (?1, ?2);",
                params![format!("image-{index}"), body],
            )?;
        }

        tx.commit()?;
        info!(
            "event=ingest_annotations module=ingest status=ok annotations={} images={} duration_ms={}",
            records.len(),
            bodies.len(),
            started_at.elapsed().as_millis()
        );
        Ok(records.len())
    }
}

pub struct SqliteMetadataLoader<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteMetadataLoader<'conn> {
    /// Constructs a loader from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> IngestResult<Self> {
        verify_schema(conn)?;
        Ok(Self { conn })
    }
}

impl MetadataLoader for SqliteMetadataLoader<'_> {
    fn load_metadata(&mut self, records: &[MetadataRecord]) -> IngestResult<usize> {
        let started_at = Instant::now();
        for (index, record) in records.iter().enumerate() {
            require_non_empty(index, "id", &record.id)?;
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM Creators;", [])?;
        tx.execute("DELETE FROM Entity;", [])?;

        let mut creator_rows = 0usize;
        for (index, record) in records.iter().enumerate() {
            let entity_id = format!("entity-{index}");
            let title = record.title.trim();
            tx.execute(
                "INSERT INTO Entity (entityId, id, title) VALUES (?1, ?2, ?3);",
                params![
                    entity_id.as_str(),
                    record.id.as_str(),
                    (!title.is_empty()).then_some(title),
                ],
            )?;

            for creator in split_creators(&record.creator) {
                tx.execute(
                    "INSERT INTO Creators (entityId, creator) VALUES (?1, ?2);",
                    params![entity_id.as_str(), creator],
                )?;
                creator_rows += 1;
            }
        }

        tx.commit()?;
        info!(
            "event=ingest_metadata module=ingest status=ok entities={} creators={} duration_ms={}",
            records.len(),
            creator_rows,
            started_at.elapsed().as_millis()
        );
        Ok(records.len())
    }
}
