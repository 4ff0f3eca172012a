//! End-to-end searches against a mock Elasticsearch endpoint.

use std::sync::Arc;

use lg_core::{
    Client, ClientConfig, ErrorCategory, Phase, Query, SearchOptions, SearchResult, Searcher,
    SortTime, StreamState,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn searcher_for(server: &MockServer) -> Searcher {
    let client = Client::new(&ClientConfig::new(server.uri())).unwrap();
    Searcher::new(Arc::new(client))
}

async fn mount_valid(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/logstash-2016.04.29/_validate/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": true,
            "_shards": {"total": 1, "successful": 1, "failed": 0}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn lucene_search_returns_sources_in_engine_order() {
    let server = MockServer::start().await;
    mount_valid(&server).await;
    Mock::given(method("POST"))
        .and(path("/logstash-2016.04.29/_search"))
        .and(body_partial_json(json!({
            "query": {"query_string": {"query": "error"}},
            "size": 2,
            "sort": [{"@timestamp": {"order": "desc"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 2,
            "timed_out": false,
            "hits": {
                "total": 2,
                "hits": [
                    {"_index": "logstash-2016.04.29", "_id": "b",
                     "_source": {"@timestamp": "2016-04-29T13:58:59.420Z", "message": "error two"}},
                    {"_index": "logstash-2016.04.29", "_id": "a",
                     "_source": {"@timestamp": "2016-04-29T13:50:00.000Z", "message": "error one"}}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let opts = SearchOptions::default()
        .with_size(2)
        .with_index("logstash-2016.04.29")
        .with_sort_time(SortTime::Descending);
    let results = searcher_for(&server)
        .search(Query::lucene("error").unwrap(), &opts)
        .await
        .unwrap()
        .all()
        .await
        .unwrap();

    let messages: Vec<_> = results.iter().map(|r| r.get("message").unwrap()).collect();
    assert_eq!(messages, vec![json!("error two"), json!("error one")]);
    assert!(results.iter().all(|r| matches!(r, SearchResult::Source(_))));
}

#[tokio::test]
async fn field_projection_yields_field_results() {
    let server = MockServer::start().await;
    mount_valid(&server).await;
    Mock::given(method("POST"))
        .and(path("/logstash-2016.04.29/_search"))
        .and(body_partial_json(json!({"fields": ["host", "service"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"hits": [
                {"_id": "1", "_source": {"host": "web-1", "service": "api", "message": "m"},
                 "fields": {"host": ["web-1"], "service": ["api"]}}
            ]}
        })))
        .mount(&server)
        .await;

    let opts = SearchOptions::default()
        .with_index("logstash-2016.04.29")
        .with_fields(["host", "service"]);
    let results = searcher_for(&server)
        .search(Query::lucene("*").unwrap(), &opts)
        .await
        .unwrap()
        .all()
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind(), "field");
    assert_eq!(
        serde_json::to_value(&results[0]).unwrap(),
        json!({"host": ["web-1"], "service": ["api"]})
    );
    assert_eq!(results[0].get("message"), None);
}

#[tokio::test]
async fn raw_document_is_submitted_with_options_overlaid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_search"))
        .and(body_partial_json(json!({
            "query": {"term": {"service": "billing"}},
            "size": 10,
            "aggs": {"hosts": {"terms": {"field": "host"}}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"hits": [{"_id": "x", "_index": "logs", "_source": {"service": "billing"}}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let doc = br#"{"query": {"term": {"service": "billing"}}, "aggs": {"hosts": {"terms": {"field": "host"}}}}"#;
    let opts = SearchOptions::default()
        .with_size(10)
        .with_sort_time(SortTime::Unset)
        .with_skip_validate(true)
        .with_raw_result(true);
    let results = searcher_for(&server)
        .search(Query::raw(doc.to_vec()).unwrap(), &opts)
        .await
        .unwrap()
        .all()
        .await
        .unwrap();

    assert_eq!(results[0].kind(), "raw");
    assert_eq!(results[0].get("_index"), Some(json!("logs")));
    assert_eq!(results[0].get("_source.service"), Some(json!("billing")));
}

#[tokio::test]
async fn validation_rejection_stops_before_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_validate/query"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"type": "query_shard_exception", "reason": "Failed to parse query [status:[]"},
            "status": 400
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_search"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let opts = SearchOptions::default().with_query_debug(true);
    let err = searcher_for(&server)
        .search(Query::lucene("status:[").unwrap(), &opts)
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::Validate);
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(err.to_string().contains("query_shard_exception"));
    assert!(err.validation_response().is_some());
}

#[tokio::test]
async fn unreachable_engine_fails_the_stream() {
    // Nothing listens on port 1.
    let client = Client::new(&ClientConfig::new("http://127.0.0.1:1/")).unwrap();
    let opts = SearchOptions::default().with_skip_validate(true);
    let mut stream = Searcher::new(Arc::new(client))
        .search(Query::lucene("error").unwrap(), &opts)
        .await
        .unwrap();

    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.phase, Phase::Execute);
    assert_eq!(err.category(), ErrorCategory::Execution);
    assert_eq!(stream.state(), StreamState::Failed);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn empty_result_set_is_not_an_error() {
    let server = MockServer::start().await;
    mount_valid(&server).await;
    Mock::given(method("POST"))
        .and(path("/logstash-2016.04.29/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"total": {"value": 0, "relation": "eq"}, "hits": []}
        })))
        .mount(&server)
        .await;

    let opts = SearchOptions::default().with_index("logstash-2016.04.29");
    let results = searcher_for(&server)
        .search(Query::lucene("nothing:here").unwrap(), &opts)
        .await
        .unwrap()
        .all()
        .await
        .unwrap();
    assert!(results.is_empty());
}
