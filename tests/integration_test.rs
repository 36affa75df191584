// ABOUTME: Integration tests for the probe against a real database
// ABOUTME: Covers output shape, failure classification, idempotence, and session release

use pg_extension_probe::commands::{self, ProbeOptions};
use pg_extension_probe::config::{ProbeConfig, SslMode};
use pg_extension_probe::postgres;
use pg_extension_probe::report::{self, OutputFormat};
use std::env;

/// Helper to get the test database config from environment
fn get_test_config() -> Option<ProbeConfig> {
    let url = env::var("TEST_DATABASE_URL").ok()?;
    Some(ProbeConfig::from_url(&url).expect("TEST_DATABASE_URL must be a valid connection URL"))
}

async fn run_probe(config: &ProbeConfig, options: &ProbeOptions) -> (String, postgres::ResultSet) {
    let mut out = Vec::new();
    let result = commands::probe(config, options, &mut out)
        .await
        .expect("probe should succeed");
    (String::from_utf8(out).unwrap(), result)
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    let config = ProbeConfig {
        host: "127.0.0.1".into(),
        port: 1,
        ssl_mode: SslMode::Disable,
        connect_timeout_secs: Some(5),
        ..Default::default()
    };
    let mut out = Vec::new();

    let err = commands::probe(&config, &ProbeOptions::default(), &mut out)
        .await
        .unwrap_err();

    assert!(err.is_connection(), "unexpected error: {err:?}");
    assert!(out.is_empty(), "no report line on failure");
}

#[tokio::test]
#[ignore]
async fn test_probe_prints_one_line_per_run() {
    let config = get_test_config().expect("TEST_DATABASE_URL must be set");

    let (text, result) = run_probe(&config, &ProbeOptions::default()).await;

    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("Available extensions: ["));
    assert_eq!(
        text.trim_end(),
        report::render(&result, OutputFormat::Text).unwrap()
    );
    assert_eq!(
        result.column_index(postgres::EXTENSION_NAME_COLUMN),
        if result.is_empty() { None } else { Some(1) }
    );
}

#[tokio::test]
#[ignore]
async fn test_probe_output_is_idempotent() {
    let config = get_test_config().expect("TEST_DATABASE_URL must be set");

    let (first, _) = run_probe(&config, &ProbeOptions::default()).await;
    let (second, _) = run_probe(&config, &ProbeOptions::default()).await;

    assert_eq!(first, second);
}

#[tokio::test]
#[ignore]
async fn test_probe_json_format() {
    let config = get_test_config().expect("TEST_DATABASE_URL must be set");
    let options = ProbeOptions {
        format: OutputFormat::Json,
        ..Default::default()
    };

    let (text, result) = run_probe(&config, &options).await;

    let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
    assert_eq!(value["label"], "Available extensions");
    assert_eq!(value["extensions"].as_array().unwrap().len(), result.len());
}

#[tokio::test]
#[ignore]
async fn test_missing_required_extension_fails_after_report() {
    let config = get_test_config().expect("TEST_DATABASE_URL must be set");
    let options = ProbeOptions {
        required_extensions: vec!["definitely_not_an_extension".to_string()],
        ..Default::default()
    };
    let mut out = Vec::new();

    let err = commands::probe(&config, &options, &mut out)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("definitely_not_an_extension"));
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
}

#[tokio::test]
#[ignore]
async fn test_unknown_database_message_names_the_database() {
    let mut config = get_test_config().expect("TEST_DATABASE_URL must be set");
    config.database = "pg_extension_probe_no_such_db".to_string();

    let err = match postgres::connect(&config).await {
        Err(err) => err,
        Ok(_) => panic!("connecting to an unknown database should fail"),
    };

    assert!(err.is_connection(), "unexpected error: {err:?}");
    let message = err.to_string();
    assert!(message.starts_with("Database does not exist"), "{message}");
    assert!(message.contains("pg_extension_probe_no_such_db"), "{message}");
    assert!(!message.contains("db error"), "{message}");
}

#[tokio::test]
#[ignore]
async fn test_missing_catalog_table_is_query_error() {
    let config = get_test_config().expect("TEST_DATABASE_URL must be set");

    let connection = postgres::connect(&config)
        .await
        .expect("connection should succeed");
    let mut cursor = connection.open_cursor().unwrap();

    let err = cursor
        .execute("SELECT * FROM pg_extension_renamed")
        .await
        .unwrap_err();
    assert!(err.is_query(), "unexpected error: {err:?}");
    assert!(err.to_string().starts_with("Catalog table not found"));
    assert!(
        err.to_string().contains("pg_extension_renamed"),
        "server message missing from: {err}"
    );

    cursor.close();
    drop(cursor);
    connection.close().await;
}

#[tokio::test]
#[ignore]
async fn test_cursor_lifecycle() {
    let config = get_test_config().expect("TEST_DATABASE_URL must be set");
    let connection = postgres::connect(&config).await.unwrap();
    let mut cursor = connection.open_cursor().unwrap();

    assert!(cursor.fetch_all().unwrap_err().is_query());

    cursor.execute(postgres::EXTENSION_CATALOG_QUERY).await.unwrap();
    assert_eq!(cursor.state(), postgres::CursorState::Executed);
    cursor.fetch_all().unwrap();
    assert!(cursor.fetch_all().unwrap_err().is_query());

    cursor.close();
    cursor.close();
    assert!(cursor
        .execute(postgres::EXTENSION_CATALOG_QUERY)
        .await
        .unwrap_err()
        .is_invalid_state());
    assert!(cursor.fetch_all().unwrap_err().is_query());

    drop(cursor);
    connection.close().await;
}

#[tokio::test]
#[ignore]
async fn test_no_session_remains_after_probe() {
    let mut config = get_test_config().expect("TEST_DATABASE_URL must be set");
    config.application_name = "pg-extension-probe-release-test".to_string();

    run_probe(&config, &ProbeOptions::default()).await;

    // Observe from a separate session that the probe's session is gone
    let mut observer_config = config.clone();
    observer_config.application_name = "pg-extension-probe-observer".to_string();
    let observer = postgres::connect(&observer_config).await.unwrap();

    // The backend exits asynchronously after Terminate, so allow it a moment
    let mut remaining = None;
    for _ in 0..20 {
        let mut cursor = observer.open_cursor().unwrap();
        cursor
            .execute(
                "SELECT count(*) FROM pg_stat_activity \
                 WHERE application_name = 'pg-extension-probe-release-test'",
            )
            .await
            .unwrap();
        let result = cursor.fetch_all().unwrap();
        remaining = result.rows()[0].get(0).map(str::to_string);
        if remaining.as_deref() == Some("0") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    assert_eq!(remaining.as_deref(), Some("0"));

    observer.close().await;
}
