// ABOUTME: Probe command implementation - connect, list extensions, disconnect
// ABOUTME: Runs the linear probe lifecycle and releases every handle on every exit path

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::postgres::{self, Connection, ResultSet, EXTENSION_CATALOG_QUERY};
use crate::report::{self, OutputFormat};
use crate::utils::sanitize_identifier;
use std::fmt;
use std::io::Write;

/// Options that shape the probe output and outcome
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    pub format: OutputFormat,
    /// Extensions that must be installed for the probe to succeed
    pub required_extensions: Vec<String>,
}

/// Where the probe is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProbeStage {
    Unconnected,
    Connected,
    CursorOpen,
    QueryExecuted,
    ResultsFetched,
    CursorClosed,
    ConnectionClosed,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeStage::Unconnected => "unconnected",
            ProbeStage::Connected => "connected",
            ProbeStage::CursorOpen => "cursor open",
            ProbeStage::QueryExecuted => "query executed",
            ProbeStage::ResultsFetched => "results fetched",
            ProbeStage::CursorClosed => "cursor closed",
            ProbeStage::ConnectionClosed => "connection closed",
        };
        f.write_str(name)
    }
}

/// Stage tracker that logs each transition
struct Progress {
    stage: ProbeStage,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: ProbeStage::Unconnected,
        }
    }

    fn advance(&mut self, next: ProbeStage) {
        debug_assert!(next > self.stage, "{} cannot follow {}", next, self.stage);
        tracing::debug!("Probe stage: {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn fail(&self, err: ProbeError) -> ProbeError {
        tracing::error!("Probe failed while {}", self.stage);
        err
    }
}

/// Check connectivity and report the installed extensions
///
/// This command:
/// 1. Connects to the configured endpoint (no retry)
/// 2. Runs `SELECT * FROM pg_extension` on a fresh cursor and fetches every row
/// 3. Writes one line to `out` in the requested format
/// 4. Closes the cursor and the connection, also when a step above failed
/// 5. Fails with [`ProbeError::MissingExtensions`] if a required extension is absent
///
/// Returns the fetched rows on success.
pub async fn probe<W: Write>(
    config: &ProbeConfig,
    options: &ProbeOptions,
    out: &mut W,
) -> Result<ResultSet, ProbeError> {
    let mut progress = Progress::new();

    tracing::info!("Connecting to {}...", config);
    let connection = postgres::connect(config)
        .await
        .map_err(|e| progress.fail(e))?;
    progress.advance(ProbeStage::Connected);
    tracing::info!("✓ Connected to {}", connection.endpoint());

    let outcome = query_and_report(&connection, options, out, &mut progress).await;

    connection.close().await;
    progress.advance(ProbeStage::ConnectionClosed);

    let result = outcome?;

    let missing = postgres::missing_extensions(&result, &options.required_extensions);
    if !missing.is_empty() {
        return Err(ProbeError::MissingExtensions(missing));
    }
    if !options.required_extensions.is_empty() {
        tracing::info!("✓ All required extensions are installed");
    }

    Ok(result)
}

async fn query_and_report<W: Write>(
    connection: &Connection,
    options: &ProbeOptions,
    out: &mut W,
    progress: &mut Progress,
) -> Result<ResultSet, ProbeError> {
    let result = fetch_extensions(connection, progress)
        .await
        .map_err(|e| progress.fail(e))?;

    tracing::info!(
        "Found {} installed extensions: {}",
        result.len(),
        postgres::installed_extension_names(&result)
            .iter()
            .map(|name| sanitize_identifier(name))
            .collect::<Vec<_>>()
            .join(", ")
    );

    report::report(out, &result, options.format)
        .map_err(|e| progress.fail(ProbeError::Io(e)))?;

    Ok(result)
}

async fn fetch_extensions(
    connection: &Connection,
    progress: &mut Progress,
) -> Result<ResultSet, ProbeError> {
    let mut cursor = connection.open_cursor()?;
    progress.advance(ProbeStage::CursorOpen);

    let fetched = match cursor.execute(EXTENSION_CATALOG_QUERY).await {
        Ok(()) => {
            progress.advance(ProbeStage::QueryExecuted);
            cursor.fetch_all()
        }
        Err(e) => Err(e),
    };
    if fetched.is_ok() {
        progress.advance(ProbeStage::ResultsFetched);
    }

    cursor.close();
    progress.advance(ProbeStage::CursorClosed);

    fetched
}
