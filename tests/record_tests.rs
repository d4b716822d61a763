//! Record CRUD integration tests against a scripted transport.
//!
//! The transport seam lets these tests drive the full lifecycle — render,
//! submit, retry, normalize, map — without a running database: each test
//! scripts the JSON replies (or transient failures) the transport should
//! produce and asserts on the resulting record state and captured SQL.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use surql_orm::{
    Client, Column, DbType, Record, Result, Schema, SqlOutcome, SurqlError, Transport, Value,
};

/// One scripted transport reply.
enum Reply {
    Json(serde_json::Value),
    ContentTypeFailure,
}

/// Transport that pops scripted replies, counting calls and capturing the
/// submitted SQL.
struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    statements: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new(replies: Vec<Reply>) -> Self {
        MockTransport {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            statements: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_sql(&self, sql: &str, _ns: &str, _db: &str) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.statements.lock().unwrap().push(sql.to_string());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Json(json!([{"result": [], "time": ""}])));
        match reply {
            Reply::Json(value) => Ok(value),
            Reply::ContentTypeFailure => Err(SurqlError::ContentType(
                "unexpected content-type \"text/plain\"".to_string(),
            )),
        }
    }
}

fn client_with(replies: Vec<Reply>) -> (Client, &'static MockTransport) {
    let _ = tracing_subscriber::fmt::try_init();
    // Leak the mock so the test can keep inspecting it after the client
    // takes ownership of a second handle.
    let transport: &'static MockTransport = Box::leak(Box::new(MockTransport::new(replies)));
    let client = Client::with_transport(Box::new(SharedTransport(transport)), "test", "test");
    (client, transport)
}

/// Forwards to a leaked mock so tests keep a view on the call log.
struct SharedTransport(&'static MockTransport);

#[async_trait]
impl Transport for SharedTransport {
    async fn post_sql(&self, sql: &str, ns: &str, db: &str) -> Result<serde_json::Value> {
        self.0.post_sql(sql, ns, db).await
    }
}

fn counter_schema() -> Schema {
    Schema::new("counter")
        .column(Column::new("message_id", DbType::int()))
        .column(Column::new("count", DbType::int()))
}

fn counter_row(message_id: i64, count: i64) -> serde_json::Value {
    json!({
        "id": "counter:abc123",
        "message_id": message_id,
        "count": count
    })
}

#[tokio::test]
async fn insert_then_fetch_round_trip() {
    let (client, transport) = client_with(vec![
        Reply::Json(json!([{"result": [counter_row(42, 1)], "time": "81.3µs"}])),
        Reply::Json(json!([{"result": [counter_row(42, 1)], "time": "102.7µs"}])),
    ]);

    let mut record = counter_schema().record();
    record.set_value("message_id", 42i64).unwrap();
    record.set_value("count", 1i64).unwrap();
    record.insert(&client).await.unwrap();

    assert!(!record.is_none());
    assert_eq!(record.table_name(), "counter:abc123");
    assert_eq!(record.last_result_time(), "81.3µs");

    let mut fetched = counter_schema().record();
    fetched
        .fetch_where(&client, "message_id = 42")
        .await
        .unwrap();

    assert!(!fetched.is_none());
    assert_eq!(fetched.value("count"), Some(&Value::Int(1)));
    assert_eq!(fetched.last_result_time(), "102.7µs");

    let statements = transport.statements();
    assert!(statements[0].starts_with("CREATE counter SET "));
    assert!(statements[0].contains("message_id = 42"));
    assert!(statements[0].contains("count = 1"));
    assert!(statements[1].starts_with("SELECT * FROM counter WHERE message_id = 42"));
}

#[tokio::test]
async fn fetch_empty_result_sets_is_none_and_preserves_columns() {
    let (client, _) = client_with(vec![Reply::Json(json!([{"result": [], "time": "12µs"}]))]);

    let mut record = counter_schema().record();
    record.set_value("count", 7i64).unwrap();
    record.fetch_where(&client, "message_id = 1").await.unwrap();

    assert!(record.is_none());
    assert_eq!(record.value("count"), Some(&Value::Int(7)));
    // An empty result carries no observable time.
    assert_eq!(record.last_result_time(), "");
}

#[tokio::test]
async fn content_type_failures_retry_exactly_five_attempts() {
    let (client, transport) = client_with(vec![
        Reply::ContentTypeFailure,
        Reply::ContentTypeFailure,
        Reply::ContentTypeFailure,
        Reply::ContentTypeFailure,
        Reply::ContentTypeFailure,
        // Never reached: a sixth attempt would consume this.
        Reply::Json(json!([{"result": [], "time": ""}])),
    ]);

    let outcome = client.executes("SELECT * FROM counter;").await;
    match outcome {
        Err(SurqlError::ContentType(msg)) => assert!(msg.contains("5 attempts")),
        other => panic!("expected ContentType error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn content_type_failure_recovers_within_budget() {
    let (client, transport) = client_with(vec![
        Reply::ContentTypeFailure,
        Reply::ContentTypeFailure,
        Reply::Json(json!([{"result": [counter_row(1, 1)], "time": "9µs"}])),
    ]);

    let outcome = client.executes("SELECT * FROM counter;").await.unwrap();
    match outcome {
        SqlOutcome::Results(envelope) => assert_eq!(envelope.time, "9µs"),
        other => panic!("expected results, got {:?}", other),
    }
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn db_error_envelope_is_returned_as_data() {
    let (client, _) = client_with(vec![Reply::Json(json!({
        "code": 403,
        "details": "Forbidden",
        "information": "Not enough permissions"
    }))]);

    let outcome = client.executes("CREATE counter SET count = 1;").await.unwrap();
    match outcome {
        SqlOutcome::DbError {
            code,
            details,
            information,
        } => {
            assert_eq!(code, 403);
            assert_eq!(details, "Forbidden");
            assert_eq!(information, "Not enough permissions");
        }
        other => panic!("expected DbError, got {:?}", other),
    }
}

#[tokio::test]
async fn db_error_is_a_hard_error_on_the_single_result_path() {
    let (client, _) = client_with(vec![Reply::Json(json!({
        "code": 403,
        "details": "Forbidden",
        "information": "Not enough permissions"
    }))]);

    match client.execute("CREATE counter SET count = 1;").await {
        Err(SurqlError::Query(msg)) => {
            assert!(msg.contains("403"));
            assert!(msg.contains("Forbidden"));
        }
        other => panic!("expected Query error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn delete_non_sequence_result_reports_false_without_raising() {
    let (client, _) = client_with(vec![Reply::Json(
        json!([{"result": {"note": "nothing deleted"}, "time": "3µs"}]),
    )]);

    let mut record = counter_schema().record();
    record.set_key(5i64);
    let deleted = record.delete(&client).await.unwrap();
    assert!(!deleted);
}

#[tokio::test]
async fn delete_sequence_result_reports_true() {
    let (client, transport) = client_with(vec![Reply::Json(
        json!([{"result": [counter_row(1, 1)], "time": "3µs"}]),
    )]);

    let mut record = counter_schema().record();
    record.set_key(5i64);
    let deleted = record.delete(&client).await.unwrap();
    assert!(deleted);
    assert!(transport.statements()[0].starts_with("DELETE FROM counter:5"));
}

#[tokio::test]
async fn create_table_emits_schemafull_and_field_definitions() {
    let (client, transport) = client_with(vec![Reply::Json(
        json!([{"result": [], "time": "40µs"}]),
    )]);

    let mut record = counter_schema().record();
    record.create_table(&client).await.unwrap();

    let sql = &transport.statements()[0];
    assert!(sql.starts_with("DEFINE TABLE counter SCHEMAFULL;"));
    assert!(sql.contains("DEFINE FIELD message_id ON TABLE counter TYPE int ;"));
    assert!(sql.contains("DEFINE FIELD count ON TABLE counter TYPE int ;"));
}

#[tokio::test]
async fn update_renders_every_declared_column() {
    let (client, transport) = client_with(vec![Reply::Json(
        json!([{"result": [counter_row(42, 2)], "time": "7µs"}]),
    )]);

    let mut record = counter_schema().record();
    record.set_key("counter:abc123");
    record.set_value("message_id", 42i64).unwrap();
    record.set_value("count", 2i64).unwrap();
    record.update(&client).await.unwrap();

    let sql = &transport.statements()[0];
    assert!(sql.starts_with("UPDATE counter:abc123 SET "));
    assert!(sql.contains("message_id = 42"));
    assert!(sql.contains("count = 2"));
    assert_eq!(record.value("count"), Some(&Value::Int(2)));
}

#[tokio::test]
async fn insert_non_sequence_result_is_a_response_error() {
    let (client, _) = client_with(vec![Reply::Json(
        json!([{"result": "created", "time": "2µs"}]),
    )]);

    let mut record = counter_schema().record();
    match record.insert(&client).await {
        Err(SurqlError::Response(_)) => {}
        other => panic!("expected Response error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn object_shaped_result_envelope_is_tolerated() {
    // A mapping where a row list was expected is flagged but not fatal on
    // the executes path.
    let (client, _) = client_with(vec![Reply::Json(
        json!([{"result": {"status": "OK"}, "time": "2µs"}]),
    )]);

    let outcome = client.executes("INFO FOR DB;").await.unwrap();
    match outcome {
        SqlOutcome::Results(envelope) => assert!(envelope.result.is_object()),
        other => panic!("expected results, got {:?}", other),
    }
}

#[tokio::test]
async fn record_reference_round_trip() {
    let (client, transport) = client_with(vec![Reply::Json(json!([{
        "result": [{
            "id": "entry:1",
            "owner": "user:alice"
        }],
        "time": "5µs"
    }]))]);

    let schema = Schema::new("entry").column(Column::new("owner", DbType::record()));
    let mut record: Record = schema.record();

    let mut owner = Schema::new("user").record();
    owner.set_key("alice");
    record.set_value("owner", owner.reference()).unwrap();
    record.insert(&client).await.unwrap();

    assert!(transport.statements()[0].contains("owner = user:alice"));
    assert_eq!(
        record.value("owner"),
        Some(&Value::Thing("user:alice".to_string()))
    );
}
