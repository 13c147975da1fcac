mod common;

use catalog_core::db::open_db;
use catalog_core::ingest::{
    parse_records, AnnotationLoader, AnnotationRecord, CollectionLoader, IngestError,
    MetadataRecord, SqliteAnnotationLoader, TripleStoreCollectionLoader,
};
use catalog_core::{IngestResult, RelationalProcessor};
use common::{
    annotation, catalog_collections, metadata, relational_store, triple_store, FixtureTransport,
    UnreachableTransport,
};
use std::sync::Arc;

#[test]
fn reloading_annotations_replaces_previous_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.db");
    let mut conn = open_db(&path).unwrap();

    let mut loader = SqliteAnnotationLoader::try_new(&mut conn).unwrap();
    loader
        .load_annotations(&[
            annotation("a-1", "img-1", "canvas-1", "painting"),
            annotation("a-2", "img-2", "canvas-2", "painting"),
        ])
        .unwrap();
    let written = loader
        .load_annotations(&[annotation("a-3", "img-3", "canvas-3", "commenting")])
        .unwrap();
    assert_eq!(written, 1);
    drop(conn);

    let processor = RelationalProcessor::new(&path);
    let rows = processor.all_annotations().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "a-3");
    assert_eq!(rows[0].annotation_id, "annotation-0");
    assert_eq!(processor.all_images().unwrap().len(), 1);
}

#[test]
fn invalid_annotation_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = relational_store(
        dir.path(),
        "keep.db",
        &[],
        &[annotation("a-1", "img-1", "canvas-1", "painting")],
    );

    let mut conn = open_db(&path).unwrap();
    let err = SqliteAnnotationLoader::try_new(&mut conn)
        .unwrap()
        .load_annotations(&[
            annotation("a-2", "img-2", "canvas-2", "painting"),
            annotation("a-3", "img-3", "", "painting"),
        ])
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidRecord { index: 1, .. }));
    drop(conn);

    let rows = RelationalProcessor::new(&path).all_annotations().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "a-1");
}

#[test]
fn metadata_without_title_stores_null_and_no_creators() {
    let dir = tempfile::tempdir().unwrap();
    let path = relational_store(
        dir.path(),
        "metadata.db",
        &[metadata("canvas-7", "  ", " ; ")],
        &[],
    );

    let rows = RelationalProcessor::new(path).all_entities().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, None);
    assert_eq!(rows[0].creator, None);
}

#[test]
fn records_parse_from_json_documents() {
    let annotations: Vec<AnnotationRecord> = parse_records(
        r#"[{ "id": "a-1", "body": "img-1", "target": "canvas-1", "motivation": "painting" }]"#,
    )
    .unwrap();
    assert_eq!(annotations[0].target, "canvas-1");

    let metadata: Vec<MetadataRecord> =
        parse_records(r#"[{ "id": "canvas-1", "creator": "Dante; Petrarca" }]"#).unwrap();
    assert_eq!(metadata[0].title, "");

    let err: IngestResult<Vec<MetadataRecord>> = parse_records(r#"{ "id": "canvas-1" }"#);
    assert!(matches!(err, Err(IngestError::Parse(_))));
}

#[test]
fn collection_loader_sends_one_insert_data_update() {
    let transport = Arc::new(FixtureTransport::default());
    let processor = catalog_core::TripleStoreProcessor::new(common::endpoint(), transport.clone());
    let loader = TripleStoreCollectionLoader::for_processor(&processor);

    let written = loader.load_collections(&catalog_collections()).unwrap();
    // 6 subjects x 3 descriptive triples + 5 containment edges
    assert_eq!(written, 23);

    let updates = transport.updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert!(updates[0].starts_with("INSERT DATA {"));
    assert!(updates[0].contains("\"Quaderno 9\""));
    assert_eq!(updates[0].matches("relations/items").count(), 5);
}

#[test]
fn collection_loader_propagates_transport_failure() {
    let processor = triple_store(UnreachableTransport);
    let err = TripleStoreCollectionLoader::for_processor(&processor)
        .load_collections(&catalog_collections())
        .unwrap_err();
    assert!(matches!(err, IngestError::Store(_)));
}

#[test]
fn empty_collection_load_skips_the_endpoint() {
    let processor = triple_store(UnreachableTransport);
    let written = TripleStoreCollectionLoader::for_processor(&processor)
        .load_collections(&[])
        .unwrap();
    assert_eq!(written, 0);
}
