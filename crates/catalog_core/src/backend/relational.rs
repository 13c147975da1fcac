//! Relational query processor over the SQLite catalog store.
//!
//! # Responsibility
//! - Run parameterized reads against `Entity`, `Creators`, `Annotation` and
//!   `Image`.
//! - Decode rows into typed records for the federation layer.
//!
//! # Invariants
//! - Every call opens its own read-only connection and drops it on return.
//! - Filter values are always bound, never spliced into SQL text.
//! - An empty annotation filter matches every row for that predicate.
//! - Entity rows come back in insertion order so creator order is stable.

use crate::backend::StoreResult;
use crate::db::open_db_read_only;
use log::debug;
use rusqlite::{params, Connection, Params, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

const ANNOTATION_SELECT_SQL: &str = "SELECT
    annotationId,
    id,
    body,
    target,
    motivation
FROM Annotation";

const ENTITY_SELECT_SQL: &str = "SELECT
    Entity.entityId AS entityId,
    Entity.id AS id,
    Entity.title AS title,
    Creators.creator AS creator
FROM Entity
LEFT JOIN Creators ON Entity.entityId = Creators.entityId";

const ENTITY_ORDER_SQL: &str = " ORDER BY Entity.rowid ASC, Creators.rowid ASC";

/// One `Annotation` table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub annotation_id: String,
    pub id: String,
    pub body: String,
    pub target: String,
    pub motivation: String,
}

/// One `Image` table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRow {
    pub image_id: String,
    pub id: String,
}

/// One row of the `Entity` x `Creators` left join.
///
/// An entity with N creators yields N rows; with none it yields one row
/// whose `creator` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRow {
    pub entity_id: String,
    pub id: String,
    pub title: Option<String>,
    pub creator: Option<String>,
}

/// Query processor bound to one SQLite file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationalProcessor {
    db_path: PathBuf,
}

impl RelationalProcessor {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn all_annotations(&self) -> StoreResult<Vec<AnnotationRow>> {
        self.query_rows(
            "all_annotations",
            &format!("{ANNOTATION_SELECT_SQL} ORDER BY rowid ASC;"),
            [],
            parse_annotation_row,
        )
    }

    pub fn all_images(&self) -> StoreResult<Vec<ImageRow>> {
        self.query_rows(
            "all_images",
            "SELECT imageId, id FROM Image ORDER BY rowid ASC;",
            [],
            parse_image_row,
        )
    }

    pub fn annotations_with_body(&self, body_id: &str) -> StoreResult<Vec<AnnotationRow>> {
        self.annotations_with_body_and_target(body_id, "")
    }

    pub fn annotations_with_target(&self, target_id: &str) -> StoreResult<Vec<AnnotationRow>> {
        self.annotations_with_body_and_target("", target_id)
    }

    /// Filters annotations by body and target; an empty value disables that
    /// predicate.
    pub fn annotations_with_body_and_target(
        &self,
        body_id: &str,
        target_id: &str,
    ) -> StoreResult<Vec<AnnotationRow>> {
        self.query_rows(
            "annotations_with_body_and_target",
            &format!(
                "{ANNOTATION_SELECT_SQL}
                 WHERE (?1 = '' OR body = ?1)
                   AND (?2 = '' OR target = ?2)
                 ORDER BY rowid ASC;"
            ),
            params![body_id, target_id],
            parse_annotation_row,
        )
    }

    /// Rows of every entity listing `creator`, including its other creators.
    pub fn entities_with_creator(&self, creator: &str) -> StoreResult<Vec<EntityRow>> {
        self.query_rows(
            "entities_with_creator",
            &format!(
                "{ENTITY_SELECT_SQL}
                 WHERE Entity.entityId IN (
                     SELECT entityId FROM Creators WHERE creator = ?1
                 ){ENTITY_ORDER_SQL};"
            ),
            [creator],
            parse_entity_row,
        )
    }

    pub fn entities_with_title(&self, title: &str) -> StoreResult<Vec<EntityRow>> {
        self.query_rows(
            "entities_with_title",
            &format!("{ENTITY_SELECT_SQL} WHERE Entity.title = ?1{ENTITY_ORDER_SQL};"),
            [title],
            parse_entity_row,
        )
    }

    pub fn all_entities(&self) -> StoreResult<Vec<EntityRow>> {
        self.query_rows(
            "all_entities",
            &format!("{ENTITY_SELECT_SQL}{ENTITY_ORDER_SQL};"),
            [],
            parse_entity_row,
        )
    }

    fn query_rows<T, P, F>(&self, op: &str, sql: &str, params: P, parse: F) -> StoreResult<Vec<T>>
    where
        P: Params,
        F: Fn(&Row<'_>) -> rusqlite::Result<T>,
    {
        let started_at = Instant::now();
        let conn = open_db_read_only(&self.db_path)?;
        let rows = collect_rows(&conn, sql, params, parse)?;
        debug!(
            "event=relational_query module=backend status=ok op={} rows={} duration_ms={}",
            op,
            rows.len(),
            started_at.elapsed().as_millis()
        );
        Ok(rows)
    }
}

fn collect_rows<T, P, F>(conn: &Connection, sql: &str, params: P, parse: F) -> StoreResult<Vec<T>>
where
    P: Params,
    F: Fn(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut parsed = Vec::new();

    while let Some(row) = rows.next()? {
        parsed.push(parse(row)?);
    }

    Ok(parsed)
}

fn parse_annotation_row(row: &Row<'_>) -> rusqlite::Result<AnnotationRow> {
    Ok(AnnotationRow {
        annotation_id: row.get("annotationId")?,
        id: row.get("id")?,
        body: row.get("body")?,
        target: row.get("target")?,
        motivation: row.get("motivation")?,
    })
}

fn parse_image_row(row: &Row<'_>) -> rusqlite::Result<ImageRow> {
    Ok(ImageRow {
        image_id: row.get("imageId")?,
        id: row.get("id")?,
    })
}

fn parse_entity_row(row: &Row<'_>) -> rusqlite::Result<EntityRow> {
    Ok(EntityRow {
        entity_id: row.get("entityId")?,
        id: row.get("id")?,
        title: row.get("title")?,
        creator: row.get("creator")?,
    })
}
