//! Search access layer integration tests.
//!
//! These tests run finders against a [`common::MockConnection`] and check
//! both the outgoing request parameters and the mapped results.

mod common;

use serde_json::json;

use common::*;
use quarry_persistence::config::{
    ConnectorConfig, FinderConfig, IndexSelection, MethodParameters, StoredQueryConfig,
    TranslationConfig,
};
use quarry_persistence::error::{FinderError, MappingError, StorageError, ValidationError};
use quarry_persistence::finder::{ElasticsearchFinder, Finder, QueryService};
use quarry_persistence::mapper::RegistryMapper;
use quarry_persistence::query::{
    AttributeCriteria, Comparison, CriteriaQuery, CustomQuery, Query, StoredQuery,
};

fn library_config() -> FinderConfig {
    FinderConfig {
        index: Some(IndexSelection::parse("library")),
        doc_type: Some(IndexSelection::parse("book")),
        ..Default::default()
    }
}

fn projection_finder(
    mock: &MockConnection,
    config: FinderConfig,
) -> ElasticsearchFinder<RegistryMapper<Projection>> {
    ElasticsearchFinder::new(
        mock.connector(ConnectorConfig::default()),
        config,
        projection_mapper(),
    )
    .expect("valid finder config")
}

// ============================================================================
// Get
// ============================================================================

#[tokio::test]
async fn test_get_by_identifier() {
    let mock = MockConnection::new();
    mock.respond("get", hit("book-1", book_source("book-1", "Dune")));

    let config = FinderConfig {
        parameters: MethodParameters::default().with("get", json!({"realtime": true})),
        ..library_config()
    };
    let result = projection_finder(&mock, config)
        .get_by_identifier("book-1")
        .await
        .unwrap();

    assert_eq!(result.total_count(), 1);
    assert_eq!(
        result.first(),
        Some(&Projection::Book(Book::new("book-1", "Dune")))
    );
    assert_eq!(
        mock.calls_to("get"),
        vec![json!({
            "realtime": true,
            "index": ["library"],
            "type": ["book"],
            "id": "book-1"
        })]
    );
}

#[tokio::test]
async fn test_get_not_found_returns_empty_result() {
    let mock = MockConnection::new();
    mock.not_found("get");

    let result = projection_finder(&mock, library_config())
        .get_by_identifier("missing")
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.total_count(), 0);
}

#[tokio::test]
async fn test_get_falls_back_to_connector_index() {
    let mock = MockConnection::new();
    mock.respond("get", hit("book-1", book_source("book-1", "Dune")));

    let connector = mock.connector(ConnectorConfig {
        index: Some(IndexSelection::parse("shared")),
        doc_type: Some(IndexSelection::parse("book")),
        ..Default::default()
    });
    let finder =
        ElasticsearchFinder::new(connector, FinderConfig::default(), projection_mapper()).unwrap();
    finder.get_by_identifier("book-1").await.unwrap();

    assert_eq!(mock.calls_to("get")[0]["index"], json!(["shared"]));
}

#[tokio::test]
async fn test_get_rejects_multiple_indices() {
    let mock = MockConnection::new();
    let config = FinderConfig {
        index: Some(IndexSelection::parse("library, archive")),
        ..library_config()
    };

    let result = projection_finder(&mock, config).get_by_identifier("book-1").await;

    assert!(matches!(
        result,
        Err(StorageError::Finder(FinderError::UnsupportedMultiIndex { .. }))
    ));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_get_rejects_multiple_types_on_named_index() {
    let mock = MockConnection::new();
    let config = FinderConfig {
        doc_type: Some(IndexSelection::parse("book,author")),
        ..library_config()
    };

    let result = projection_finder(&mock, config).get_by_identifier("book-1").await;
    assert!(matches!(
        result,
        Err(StorageError::Finder(FinderError::UnsupportedMultiIndex { .. }))
    ));
}

#[tokio::test]
async fn test_get_rejects_blank_identifier() {
    let mock = MockConnection::new();
    let result = projection_finder(&mock, library_config())
        .get_by_identifier("  ")
        .await;

    assert!(matches!(
        result,
        Err(StorageError::Validation(ValidationError::InvalidArgument { .. }))
    ));
}

#[tokio::test]
async fn test_get_with_missing_type_information() {
    let mock = MockConnection::new();
    mock.respond("get", hit("book-1", json!({"identifier": "book-1", "title": "Dune"})));

    let result = projection_finder(&mock, library_config())
        .get_by_identifier("book-1")
        .await;

    assert!(matches!(
        result,
        Err(StorageError::Mapping(MappingError::MissingTypeInformation { ref id })) if id == "book-1"
    ));
}

// ============================================================================
// Multi-get
// ============================================================================

#[tokio::test]
async fn test_get_by_identifiers_skips_missing_documents() {
    let mock = MockConnection::new();
    mock.respond(
        "mget",
        json!({
            "docs": [
                hit("book-1", book_source("book-1", "Dune")),
                {"_id": "book-2", "found": false},
                hit("book-3", book_source("book-3", "Hyperion"))
            ]
        }),
    );

    let ids = vec![
        "book-1".to_string(),
        "book-2".to_string(),
        "book-3".to_string(),
    ];
    let result = projection_finder(&mock, library_config())
        .get_by_identifiers(&ids)
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(
        mock.calls_to("mget")[0]["body"],
        json!({"ids": ["book-1", "book-2", "book-3"], "size": 100000})
    );
}

#[tokio::test]
async fn test_get_by_identifiers_rejects_empty_list() {
    let mock = MockConnection::new();
    let result = projection_finder(&mock, library_config())
        .get_by_identifiers(&[])
        .await;

    assert!(matches!(result, Err(StorageError::Validation(_))));
    assert!(mock.calls().is_empty());
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_find_merges_parameters_and_target() {
    let mock = MockConnection::new();
    mock.respond(
        "search",
        search_response(42, vec![hit("book-1", book_source("book-1", "Dune"))]),
    );

    let config = FinderConfig {
        parameters: MethodParameters::default().with("search", json!({"preference": "_local"})),
        log_search_query: true,
        log_result_data: true,
        ..library_config()
    };
    let result = projection_finder(&mock, config)
        .find(json!({"from": 20, "size": 10, "body": {"query": {"match_all": {}}}}))
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.total_count(), 42);
    assert_eq!(result.offset(), 20);
    assert!(result.cursor().is_none());
    assert_eq!(
        mock.calls_to("search"),
        vec![json!({
            "preference": "_local",
            "from": 20,
            "size": 10,
            "body": {"query": {"match_all": {}}},
            "index": ["library"],
            "type": ["book"]
        })]
    );
}

#[tokio::test]
async fn test_find_defaults_offset_and_accepts_integer_total() {
    let mock = MockConnection::new();
    mock.respond("search", json!({"hits": {"total": 3, "hits": []}}));

    let result = projection_finder(&mock, library_config())
        .find(json!({"body": {}}))
        .await
        .unwrap();

    assert_eq!(result.offset(), 0);
    assert_eq!(result.total_count(), 3);
}

#[tokio::test]
async fn test_find_rejects_non_object_query() {
    let mock = MockConnection::new();
    let result = projection_finder(&mock, library_config())
        .find(json!(["not", "a", "query"]))
        .await;

    assert!(matches!(result, Err(StorageError::Validation(_))));
}

#[tokio::test]
async fn test_find_by_stored_reads_offset_from_template_params() {
    let mock = MockConnection::new();
    mock.respond("search_template", search_response(7, vec![]));

    let result = projection_finder(&mock, library_config())
        .find_by_stored(json!({"body": {"id": "by_author", "params": {"from": 5, "size": 5}}}))
        .await
        .unwrap();

    assert_eq!(result.offset(), 5);
    assert_eq!(result.total_count(), 7);
    assert_eq!(mock.methods(), vec!["search_template"]);
}

// ============================================================================
// Scroll
// ============================================================================

#[tokio::test]
async fn test_scroll_returns_fresh_cursor_each_page() {
    let mock = MockConnection::new();
    mock.respond(
        "search",
        scroll_response("cursor-1", 3, vec![hit("book-1", book_source("book-1", "Dune"))]),
    );
    mock.respond(
        "scroll",
        scroll_response("cursor-2", 3, vec![hit("book-2", book_source("book-2", "Emma"))]),
    );

    let config = FinderConfig {
        scroll_timeout: "30s".to_string(),
        ..library_config()
    };
    let finder = projection_finder(&mock, config);

    let first = finder
        .scroll_start(json!({"size": 1, "body": {"query": {"match_all": {}}}}))
        .await
        .unwrap();
    assert_eq!(first.cursor(), Some("cursor-1"));
    assert_eq!(first.offset(), 0);
    assert_eq!(first.total_count(), 3);

    let start = &mock.calls_to("search")[0];
    assert_eq!(start["scroll"], "30s");
    assert_eq!(start["sort"], json!(["_doc"]));

    let cursor = first.cursor().unwrap().to_string();
    let next = finder.scroll_next(&cursor, None).await.unwrap();
    assert_ne!(next.cursor(), Some(cursor.as_str()));
    assert_eq!(next.cursor(), Some("cursor-2"));
    assert_eq!(
        mock.calls_to("scroll"),
        vec![json!({"scroll_id": "cursor-1", "scroll": "30s"})]
    );
}

#[tokio::test]
async fn test_scroll_end_is_best_effort() {
    let mock = MockConnection::new();
    mock.not_found("clear_scroll");

    let finder = projection_finder(&mock, library_config());
    finder.scroll_end("cursor-1").await.unwrap();
    finder.scroll_end("cursor-1").await.unwrap();

    assert_eq!(
        mock.calls_to("clear_scroll"),
        vec![
            json!({"scroll_id": "cursor-1"}),
            json!({"scroll_id": "cursor-1"})
        ]
    );
}

#[tokio::test]
async fn test_scroll_start_without_cursor_fails() {
    let mock = MockConnection::new();
    mock.respond("search", search_response(0, vec![]));

    let result = projection_finder(&mock, library_config())
        .scroll_start(json!({}))
        .await;
    assert!(matches!(result, Err(StorageError::Backend(_))));
}

#[test]
fn test_invalid_scroll_timeout_is_rejected() {
    let mock = MockConnection::new();
    let config = FinderConfig {
        scroll_timeout: "soon".to_string(),
        ..library_config()
    };

    let result = ElasticsearchFinder::new(
        mock.connector(ConnectorConfig::default()),
        config,
        projection_mapper(),
    );
    assert!(matches!(
        result,
        Err(StorageError::Validation(ValidationError::InvalidConfig { ref key, .. })) if key == "scroll_timeout"
    ));
}

// ============================================================================
// Domain events
// ============================================================================

#[tokio::test]
async fn test_domain_event_finder() {
    let mock = MockConnection::new();
    mock.respond(
        "search",
        search_response(
            1,
            vec![hit(
                "9f1c",
                json!({
                    "@type": BOOK_CREATED_TYPE,
                    "uuid": "9f1c",
                    "aggregate_root_identifier": "book-1",
                    "seq_number": 1
                }),
            )],
        ),
    );

    let finder = ElasticsearchFinder::new(
        mock.connector(ConnectorConfig::default()),
        FinderConfig {
            index: Some(IndexSelection::parse("library_events")),
            doc_type: Some(IndexSelection::parse("domain_event")),
            ..Default::default()
        },
        event_mapper(),
    )
    .unwrap();

    let result = finder.find(json!({"body": {}})).await.unwrap();
    assert_eq!(result.items()[0].aggregate_root_identifier, "book-1");
}

// ============================================================================
// Query service
// ============================================================================

fn service(mock: &MockConnection) -> QueryService<ElasticsearchFinder<RegistryMapper<Projection>>> {
    QueryService::new(
        TranslationConfig::default(),
        StoredQueryConfig::default(),
        projection_finder(mock, library_config()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_query_service_dispatches_by_kind() {
    let mock = MockConnection::new();
    let service = service(&mock);

    let criteria = Query::from(
        CriteriaQuery::new(10, 5)
            .with_filter(AttributeCriteria::new("status", Comparison::equals("published"))),
    );
    service.find(&criteria).await.unwrap();

    let stored = Query::from(StoredQuery::new("by_author", 0, 5));
    service.find(&stored).await.unwrap();

    let custom = Query::from(CustomQuery::new(json!({"body": {"query": {"match_all": {}}}}), 0, 5));
    service.find(&custom).await.unwrap();

    assert_eq!(mock.methods(), vec!["search", "search_template", "search"]);

    let search = &mock.calls_to("search")[0];
    assert_eq!(search["from"], 10);
    assert_eq!(search["size"], 5);
    assert_eq!(
        search["body"]["query"]["bool"]["filter"],
        json!({"and": [{"term": {"status": "published"}}]})
    );
    assert_eq!(
        mock.calls_to("search_template")[0]["body"],
        json!({"id": "by_author", "params": {"from": 0, "size": 5}})
    );
}

#[tokio::test]
async fn test_query_service_scroll() {
    let mock = MockConnection::new();
    mock.respond("search", scroll_response("cursor-1", 0, vec![]));
    let service = service(&mock);

    let page = service
        .scroll_start(&Query::from(CriteriaQuery::new(0, 100)))
        .await
        .unwrap();
    assert_eq!(page.cursor(), Some("cursor-1"));

    let stored = service
        .scroll_start(&Query::from(StoredQuery::new("by_author", 0, 5)))
        .await;
    assert!(matches!(stored, Err(StorageError::Translation(_))));

    service.scroll_end("cursor-1").await.unwrap();
    assert_eq!(mock.methods(), vec!["search", "clear_scroll"]);
}
