//! Facade tests: the same logical operations against both transports.
//!
//! Run with: cargo test -p nexus-client --test integration

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{Canned, MockServer, Recorded, RecordingGateway};
use nexus_client::prelude::*;
use nexus_client_direct::{GatewayFailure, SqlResponse};
use nexus_client_query::SqlParam;
use serde_json::json;

fn page_rows() -> serde_json::Value {
    json!([{"id": 1, "name": "Ada"}, {"id": 2, "name": "Linus"}])
}

fn rest_page(_: &Recorded) -> Canned {
    Canned::ok(page_rows()).content_range("0-1/57")
}

fn sql_page(req: &nexus_client_direct::SqlRequest) -> SqlResponse {
    if req.sql.starts_with("SELECT count(*)") {
        SqlResponse::ok(vec![row![("total", 57)]])
    } else {
        SqlResponse::ok(vec![
            row![("id", 1), ("name", "Ada")],
            row![("id", 2), ("name", "Linus")],
        ])
    }
}

fn direct_client(gateway: &Arc<RecordingGateway>) -> NexusClient {
    NexusClient::new(Backend::direct(gateway.clone()))
}

// ─── Uniform results ──────────────────────────────────────────

#[tokio::test]
async fn both_modes_return_the_same_page() {
    let server = MockServer::start(rest_page).await;
    let remote = NexusClient::new(server.backend());
    let gateway = Arc::new(RecordingGateway::new(sql_page));
    let direct = direct_client(&gateway);

    let req = PageRequest::new("users", 2, 0).unwrap();
    let predicates = vec![make_predicate("age", "gt", "30").unwrap()];
    let sort = SortKey::new("name", true).unwrap();

    let from_rest = remote.fetch_page(&req, &predicates, Some(&sort)).await.unwrap();
    let from_sql = direct.fetch_page(&req, &predicates, Some(&sort)).await.unwrap();
    assert_eq!(from_rest, from_sql);
    assert_eq!(from_rest.total_count, 57);

    let sent = server.requests();
    let query = sent[0].query.clone().unwrap();
    assert!(query.contains("age=gt.30"), "{query}");
    assert!(query.contains("order=name.asc"), "{query}");
    assert!(gateway.statements()[0].sql.contains("WHERE \"age\" > $1"));
}

#[tokio::test]
async fn ilike_works_remotely_but_not_in_sql() {
    let server = MockServer::start(rest_page).await;
    let remote = NexusClient::new(server.backend());
    let gateway = Arc::new(RecordingGateway::empty());
    let direct = direct_client(&gateway);

    let req = PageRequest::new("users", 10, 0).unwrap();
    let predicates = vec![make_predicate("name", "ilike", "ann").unwrap()];

    remote.fetch_page(&req, &predicates, None).await.unwrap();
    let query = server.requests()[0].query.clone().unwrap();
    assert!(query.contains("name=ilike.*ann*"), "{query}");

    let err = direct.fetch_page(&req, &predicates, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TranslationUnsupported);
    assert!(gateway.requests().is_empty());
}

// ─── Uniform errors ───────────────────────────────────────────

fn forbidden(_: &Recorded) -> Canned {
    Canned::json(
        StatusCode::FORBIDDEN,
        json!({"message": "permission denied for table secrets"}),
    )
}

#[tokio::test]
async fn errors_share_one_shape() {
    let server = MockServer::start(forbidden).await;
    let remote = NexusClient::new(server.backend());
    let req = PageRequest::new("secrets", 10, 0).unwrap();
    let err = remote.fetch_page(&req, &[], None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(err.message, "permission denied for table secrets");
    assert_eq!(err.status_code, Some(403));

    let gateway = Arc::new(RecordingGateway::new(|_| {
        SqlResponse::failed(GatewayFailure::Database(
            "permission denied for table secrets".into(),
        ))
    }));
    let err = direct_client(&gateway)
        .fetch_page(&req, &[], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::QueryFailed);
    assert_eq!(err.message, "permission denied for table secrets");
}

#[tokio::test]
async fn unreachable_remote_is_backend_unavailable() {
    let backend = Backend::remote(RemoteConfig::new(
        "http://127.0.0.1:1/pg",
        "http://127.0.0.1:1/rest/v1",
    ))
    .unwrap();
    let err = NexusClient::new(backend).check_connection().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::BackendUnavailable);
}

// ─── Reconfiguration ──────────────────────────────────────────

#[tokio::test]
async fn reconfigure_swaps_the_backend() {
    let server = MockServer::start(|_| Canned::ok(json!([]))).await;
    let client = NexusClient::new(server.backend());
    assert_eq!(client.mode().await, TransportMode::Remote);

    let gateway = Arc::new(RecordingGateway::empty());
    client.reconfigure(Backend::direct(gateway.clone())).await;
    assert_eq!(client.mode().await, TransportMode::Direct);

    client.run_raw_query("SELECT 1").await.unwrap();
    assert_eq!(gateway.requests().len(), 1);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn reconfigure_remote_points_at_new_endpoints() {
    let old = MockServer::start(|_| Canned::ok(json!([]))).await;
    let new = MockServer::start(|_| Canned::ok(json!([]))).await;
    let client = NexusClient::new(old.backend());

    client.reconfigure_remote(new.config()).await.unwrap();
    client.list_tables().await.unwrap();
    assert!(old.requests().is_empty());
    assert_eq!(new.requests()[0].path, "/pg/tables");
}

#[tokio::test]
async fn reconfigure_remote_refused_in_direct_mode() {
    let gateway = Arc::new(RecordingGateway::empty());
    let client = direct_client(&gateway);
    let result = client
        .reconfigure_remote(RemoteConfig::new("http://a/pg", "http://a/rest/v1"))
        .await;
    assert!(result.is_err());
    assert_eq!(client.mode().await, TransportMode::Direct);
}

#[tokio::test]
async fn connect_direct_reaches_the_gateway() {
    let gateway = Arc::new(RecordingGateway::empty());
    direct_client(&gateway)
        .connect_direct(DirectConfig::new("db.local", "app"))
        .await
        .unwrap();
    assert_eq!(gateway.connects()[0].host, "db.local");
}

// ─── Import ───────────────────────────────────────────────────

#[tokio::test]
async fn import_rows_sends_typed_values() {
    let gateway = Arc::new(RecordingGateway::empty());
    direct_client(&gateway)
        .import_rows(
            "people",
            vec![
                row![("id", "1"), ("name", "Ada")],
                row![("id", "2"), ("name", "")],
            ],
        )
        .await
        .unwrap();

    let sent = gateway.statements();
    assert_eq!(
        sent[0].sql,
        "INSERT INTO \"people\" (\"id\", \"name\") VALUES ($1, $2), ($3, NULL) RETURNING *"
    );
    assert_eq!(
        sent[0].params,
        vec![SqlParam::I64(1), SqlParam::Text("Ada".into()), SqlParam::I64(2)]
    );
}

fn create_then_insert(req: &Recorded) -> Canned {
    match (req.method.clone(), req.path.as_str()) {
        (Method::POST, "/pg/query") => Canned::ok(json!([])),
        _ => Canned::json(StatusCode::CREATED, json!([{"id": 1, "score": 9.5}])),
    }
}

#[tokio::test]
async fn import_new_table_creates_then_inserts() {
    let server = MockServer::start(create_then_insert).await;
    let client = NexusClient::new(server.backend());
    let (columns, inserted) = client
        .import_new_table("scores", vec![row![("id", "1"), ("score", "9.5")]])
        .await
        .unwrap();

    assert_eq!(columns.len(), 2);
    assert_eq!(inserted.len(), 1);

    let sent = server.requests();
    assert_eq!(sent.len(), 2);
    let create: serde_json::Value = serde_json::from_str(&sent[0].body).unwrap();
    assert_eq!(
        create["query"],
        "CREATE TABLE \"scores\" (\"id\" int8 GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY, \"score\" numeric)"
    );
    assert_eq!(sent[1].path, "/rest/v1/scores");
    let body: serde_json::Value = serde_json::from_str(&sent[1].body).unwrap();
    assert_eq!(body, json!([{"id": 1, "score": 9.5}]));
}

#[tokio::test]
async fn failed_import_drops_the_new_table() {
    let gateway = Arc::new(RecordingGateway::new(|req| {
        if req.sql.starts_with("INSERT") {
            SqlResponse::failed(GatewayFailure::Database(
                "invalid input syntax for type date: \"soon\"".into(),
            ))
        } else {
            SqlResponse::ok(Vec::new())
        }
    }));
    let err = direct_client(&gateway)
        .import_new_table("events", vec![row![("id", "1"), ("name", "launch")]])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::QueryFailed);
    assert!(err.message.contains("type date"));

    let sent: Vec<String> = gateway.statements().into_iter().map(|req| req.sql).collect();
    assert_eq!(sent.len(), 3);
    assert!(sent[0].starts_with("CREATE TABLE \"events\""));
    assert!(sent[1].starts_with("INSERT INTO \"events\""));
    assert_eq!(sent[2], "DROP TABLE IF EXISTS \"events\"");
}

#[tokio::test]
async fn failed_import_keeps_the_insert_error_when_drop_fails() {
    let gateway = Arc::new(RecordingGateway::new(|req| {
        if req.sql.starts_with("INSERT") {
            SqlResponse::failed(GatewayFailure::Database("value too long".into()))
        } else if req.sql.starts_with("DROP") {
            SqlResponse::failed(GatewayFailure::Unavailable("connection lost".into()))
        } else {
            SqlResponse::ok(Vec::new())
        }
    }));
    let err = direct_client(&gateway)
        .import_new_table("events", vec![row![("name", "launch")]])
        .await
        .unwrap_err();
    assert_eq!(err.message, "value too long");
}
