mod common;

use catalog_core::backend::StoreError;
use catalog_core::db::DbError;
use catalog_core::RelationalProcessor;
use common::{annotation, catalog_relational, metadata, relational_store};

#[test]
fn entity_rows_follow_insertion_order_with_one_row_per_creator() {
    let dir = tempfile::tempdir().unwrap();
    let processor = catalog_relational(dir.path());

    let rows = processor.all_entities().unwrap();
    let pairs: Vec<(&str, Option<&str>)> = rows
        .iter()
        .map(|row| (row.id.as_str(), row.creator.as_deref()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("canvas-1", Some("Dante")),
            ("c1", Some("Alighieri, Dante")),
            ("c1", Some("Boccaccio")),
            ("manifest-9", Some("Alighieri, Dante")),
            ("collection-1", None),
        ]
    );
    assert_eq!(rows[0].entity_id, "entity-0");
    assert_eq!(rows[4].title.as_deref(), Some("Raccolta"));
}

#[test]
fn creator_filter_returns_every_creator_of_matching_entities() {
    let dir = tempfile::tempdir().unwrap();
    let processor = catalog_relational(dir.path());

    let rows = processor.entities_with_creator("Boccaccio").unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.id == "c1"));
    assert!(processor.entities_with_creator("boccaccio").unwrap().is_empty());
}

#[test]
fn title_filter_is_exact_and_bound() {
    let dir = tempfile::tempdir().unwrap();
    let path = relational_store(
        dir.path(),
        "titles.db",
        &[
            metadata("canvas-1", "Folio 1", ""),
            metadata("canvas-2", "Folio 1' OR '1'='1", ""),
        ],
        &[],
    );
    let processor = RelationalProcessor::new(path);

    let rows = processor.entities_with_title("Folio 1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "canvas-1");
    assert_eq!(rows[0].creator, None);

    let rows = processor.entities_with_title("Folio 1' OR '1'='1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "canvas-2");
}

#[test]
fn annotation_filters_treat_empty_value_as_wildcard() {
    let dir = tempfile::tempdir().unwrap();
    let path = relational_store(
        dir.path(),
        "annotations.db",
        &[],
        &[
            annotation("a-1", "img-1", "canvas-1", "painting"),
            annotation("a-2", "img-2", "canvas-1", "commenting"),
            annotation("a-3", "img-1", "canvas-2", "painting"),
        ],
    );
    let processor = RelationalProcessor::new(path);

    assert_eq!(processor.all_annotations().unwrap().len(), 3);
    assert_eq!(processor.annotations_with_body("img-1").unwrap().len(), 2);
    assert_eq!(processor.annotations_with_target("canvas-1").unwrap().len(), 2);
    assert_eq!(processor.annotations_with_body("").unwrap().len(), 3);

    let rows = processor
        .annotations_with_body_and_target("img-1", "canvas-2")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].annotation_id, "annotation-2");
    assert_eq!(rows[0].motivation, "painting");

    assert!(processor
        .annotations_with_body_and_target("img-9", "")
        .unwrap()
        .is_empty());
}

#[test]
fn images_are_distinct_bodies_in_first_seen_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = relational_store(
        dir.path(),
        "images.db",
        &[],
        &[
            annotation("a-1", "img-2", "canvas-1", "painting"),
            annotation("a-2", "img-1", "canvas-1", "painting"),
            annotation("a-3", "img-2", "canvas-2", "painting"),
        ],
    );

    let images = RelationalProcessor::new(path).all_images().unwrap();
    let pairs: Vec<(&str, &str)> = images
        .iter()
        .map(|row| (row.image_id.as_str(), row.id.as_str()))
        .collect();
    assert_eq!(pairs, vec![("image-0", "img-2"), ("image-1", "img-1")]);
}

#[test]
fn missing_file_or_table_is_a_store_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = RelationalProcessor::new(dir.path().join("absent.db"))
        .all_annotations()
        .unwrap_err();
    assert!(matches!(err, StoreError::Db(DbError::Sqlite(_))));

    let path = dir.path().join("empty.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE notes (body TEXT);")
        .unwrap();
    let err = RelationalProcessor::new(&path).all_images().unwrap_err();
    assert!(matches!(
        err,
        StoreError::Db(DbError::MissingRequiredTable("Entity"))
    ));
}
