//! Index provisioning integration tests.

mod common;

use std::collections::BTreeMap;

use serde_json::json;

use common::*;
use quarry_persistence::schema::{
    IndexSchema, alias_mapping, create_index, delete_index, ensure_index, index_definition,
    put_index_templates, switch_alias, update_mappings,
};

fn library_schema() -> IndexSchema {
    IndexSchema::new("library")
        .with_settings(json!({"settings": {"number_of_shards": 1}}))
        .with_mapping("book", json!({"properties": {"title": {"type": "text"}}}))
        .with_mapping("author", json!({"properties": {"name": {"type": "keyword"}}}))
}

#[tokio::test]
async fn test_ensure_index_creates_missing_index() {
    let mock = MockConnection::new();
    mock.index_exists(false);
    mock.not_found("indices.get_alias");

    ensure_index(&mock, &library_schema(), true).await.unwrap();

    assert_eq!(
        mock.methods(),
        vec!["indices.exists", "indices.get_alias", "indices.create"]
    );

    let create = &mock.calls_to("indices.create")[0];
    let name = create["index"].as_str().unwrap();
    assert!(name.starts_with("library_"));
    assert_eq!(name.len(), "library_".len() + 14);
    assert_eq!(create["body"]["aliases"]["library"], json!({}));
    assert_eq!(create["body"]["settings"]["number_of_shards"], 1);
    assert!(create["body"]["mappings"]["book"].is_object());
}

#[tokio::test]
async fn test_ensure_index_updates_mappings_behind_alias() {
    let mock = MockConnection::new();
    mock.index_exists(false);
    mock.respond(
        "indices.get_alias",
        json!({"library_20240301120000": {"aliases": {"library": {}}}}),
    );

    ensure_index(&mock, &library_schema(), true).await.unwrap();

    assert!(mock.calls_to("indices.create").is_empty());
    assert_eq!(
        mock.calls_to("indices.put_mapping"),
        vec![
            json!({
                "index": "library",
                "type": "author",
                "body": {"author": {"properties": {"name": {"type": "keyword"}}}}
            }),
            json!({
                "index": "library",
                "type": "book",
                "body": {"book": {"properties": {"title": {"type": "text"}}}}
            }),
        ]
    );
}

#[tokio::test]
async fn test_ensure_index_updates_existing_index() {
    let mock = MockConnection::new();
    mock.index_exists(true);

    ensure_index(&mock, &library_schema(), false).await.unwrap();

    assert_eq!(
        mock.methods(),
        vec![
            "indices.exists",
            "indices.put_mapping",
            "indices.put_mapping"
        ]
    );
}

#[tokio::test]
async fn test_create_index_without_mappings() {
    let mock = MockConnection::new();

    let name = create_index(&mock, &library_schema(), false).await.unwrap();

    let create = &mock.calls_to("indices.create")[0];
    assert_eq!(create["index"], json!(name));
    assert!(create["body"].get("mappings").is_none());
}

#[tokio::test]
async fn test_create_index_rejects_blank_name() {
    let mock = MockConnection::new();
    assert!(create_index(&mock, &IndexSchema::new(""), false).await.is_err());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_delete_index_only_when_present() {
    let mock = MockConnection::new();
    mock.index_exists(false).index_exists(true);

    delete_index(&mock, "library").await.unwrap();
    assert!(mock.calls_to("indices.delete").is_empty());

    delete_index(&mock, "library").await.unwrap();
    assert_eq!(
        mock.calls_to("indices.delete"),
        vec![json!({"index": "library"})]
    );
}

#[tokio::test]
async fn test_update_mappings_without_types_is_noop() {
    let mock = MockConnection::new();
    update_mappings(&mock, &IndexSchema::new("library")).await.unwrap();
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_alias_mapping_missing_alias() {
    let mock = MockConnection::new();
    mock.not_found("indices.get_alias");

    assert!(alias_mapping(&mock, "library").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_index_definition_unwraps_concrete_index() {
    let mock = MockConnection::new();
    mock.respond(
        "indices.get_settings",
        json!({"library_1": {"settings": {"index": {"number_of_shards": "1"}}}}),
    );
    mock.respond(
        "indices.get_mapping",
        json!({"library_1": {"mappings": {"book": {"properties": {}}}}}),
    );

    let definition = index_definition(&mock, "library").await.unwrap();

    assert_eq!(definition["settings"]["index"]["number_of_shards"], "1");
    assert!(definition["mappings"]["book"].is_object());
}

#[tokio::test]
async fn test_switch_alias() {
    let mock = MockConnection::new();

    switch_alias(&mock, "library", "library_1", "library_2")
        .await
        .unwrap();

    assert_eq!(
        mock.calls_to("indices.update_aliases")[0]["body"]["actions"],
        json!([
            {"remove": {"alias": "library", "index": "library_1"}},
            {"add": {"alias": "library", "index": "library_2"}}
        ])
    );
}

#[tokio::test]
async fn test_put_index_templates() {
    let mock = MockConnection::new();
    let mut templates = BTreeMap::new();
    templates.insert(
        "library_template".to_string(),
        json!({"template": "library_*", "settings": {"number_of_shards": 1}}),
    );

    put_index_templates(&mock, &templates).await.unwrap();

    assert_eq!(
        mock.calls_to("indices.put_template"),
        vec![json!({
            "name": "library_template",
            "body": {"template": "library_*", "settings": {"number_of_shards": 1}}
        })]
    );
}
