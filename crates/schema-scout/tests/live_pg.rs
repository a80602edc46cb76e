//! Integration tests against a live PostgreSQL instance.
//!
//! Set SCHEMA_SCOUT_TEST_URL to a reachable database url to enable them;
//! without it every test returns early. Each test uses its own scratch table
//! so the suite can run in parallel.

use std::sync::Arc;

use async_trait::async_trait;
use schema_scout::core::session::SessionConfig;
use schema_scout::service::{ScoutService, SqlGenerator};
use schema_scout::{AppResult, ConnectionState};

fn test_url() -> Option<String> {
    std::env::var("SCHEMA_SCOUT_TEST_URL").ok()
}

async fn connected_state(url: &str) -> ConnectionState {
    let state = ConnectionState::new(SessionConfig::default());
    assert!(state.set_connection(url).await, "could not connect to {url}");
    state
}

#[tokio::test]
async fn select_one_round_trip() {
    let Some(url) = test_url() else { return };
    let state = connected_state(&url).await;
    let session = state.get_connection().expect("session");

    let result = session.query("SELECT 1 AS x".into()).await.expect("query");
    assert_eq!(result.columns, vec!["x"]);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0]["x"], serde_json::json!(1));

    state.close_connection().await;
}

#[tokio::test]
async fn timestamps_render_as_iso_8601() {
    let Some(url) = test_url() else { return };
    let state = connected_state(&url).await;
    let session = state.get_connection().expect("session");

    let result = session
        .query("SELECT TIMESTAMP '2024-01-02 03:04:05' AS ts".into())
        .await
        .expect("query");
    assert_eq!(result.rows[0]["ts"], serde_json::json!("2024-01-02T03:04:05"));

    state.close_connection().await;
}

#[tokio::test]
async fn sql_errors_surface_to_the_caller() {
    let Some(url) = test_url() else { return };
    let state = connected_state(&url).await;
    let session = state.get_connection().expect("session");

    let err = session.query("SELECT FROM nowhere AT ALL".into()).await.unwrap_err();
    assert_eq!(err.code(), "SQL_ERROR");

    state.close_connection().await;
}

#[tokio::test]
async fn introspection_sees_a_created_table() {
    let Some(url) = test_url() else { return };
    let state = connected_state(&url).await;
    let session = state.get_connection().expect("session");

    session
        .query("DROP TABLE IF EXISTS schema_scout_smoke_a".into())
        .await
        .expect("drop");
    session
        .query("CREATE TABLE schema_scout_smoke_a (id integer, label text)".into())
        .await
        .expect("create");

    let tables = session.tables().await.expect("tables");
    assert!(tables.contains(&"schema_scout_smoke_a".to_string()));

    let definition = session
        .describe("schema_scout_smoke_a".into())
        .await
        .expect("describe");
    assert_eq!(definition.columns.len(), 2);
    assert_eq!(definition.columns[0].name, "id");
    assert_eq!(definition.columns[0].data_type, "integer");
    assert_eq!(
        definition.create_table_text(),
        "CREATE TABLE schema_scout_smoke_a (\nid integer,\nlabel text\n);"
    );

    let summaries = session.tables_and_columns().await.expect("summaries");
    let smoke = summaries
        .iter()
        .find(|t| t.table_name == "schema_scout_smoke_a")
        .expect("summary for scratch table");
    assert_eq!(smoke.columns.len(), 2);

    session
        .query("DROP TABLE schema_scout_smoke_a".into())
        .await
        .expect("drop");
    state.close_connection().await;
}

struct CountRowsGenerator;

#[async_trait]
impl SqlGenerator for CountRowsGenerator {
    async fn generate_sql(&self, _prompt: &str, _table_context: &str) -> AppResult<String> {
        Ok("SELECT count(*) AS n FROM schema_scout_smoke_b".to_string())
    }
}

#[tokio::test]
async fn generate_and_run_pipeline_end_to_end() {
    let Some(url) = test_url() else { return };
    let state = connected_state(&url).await;
    let session = state.get_connection().expect("session");

    session
        .query("DROP TABLE IF EXISTS schema_scout_smoke_b".into())
        .await
        .expect("drop");
    session
        .query("CREATE TABLE schema_scout_smoke_b (id integer)".into())
        .await
        .expect("create");
    session
        .query("INSERT INTO schema_scout_smoke_b VALUES (1), (2), (3)".into())
        .await
        .expect("insert");

    let service =
        ScoutService::new(state.clone()).with_generator(Arc::new(CountRowsGenerator));

    // The prompt names the table, so the lexical pass matches it even with
    // no embedder configured.
    let outcome = service
        .generate_and_run("how many rows are in schema_scout_smoke_b")
        .await
        .expect("pipeline");
    assert!(outcome.table_context.contains("CREATE TABLE schema_scout_smoke_b"));
    assert_eq!(outcome.result.rows.len(), 1);
    assert_eq!(outcome.result.rows[0]["n"], serde_json::json!(3));

    session
        .query("DROP TABLE schema_scout_smoke_b".into())
        .await
        .expect("drop");
    state.close_connection().await;
}
