// ABOUTME: Statement handle bound to a Connection
// ABOUTME: Executes one statement over the simple query protocol and hands back its rows as text

use crate::error::ProbeError;
use tokio_postgres::{Client, SimpleQueryMessage};

/// One result row; values are the server's text representation, `None` for NULL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<Option<String>>,
}

impl Row {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Column names plus the ordered rows of one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Column names; empty when the statement returned no rows
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lifecycle of a cursor: `Open → Executed → Fetched`, `Closed` from anywhere
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Open,
    Executed,
    Fetched,
    Closed,
}

impl CursorState {
    /// Check that a statement may be sent from this state
    pub fn check_execute(self) -> Result<(), ProbeError> {
        match self {
            CursorState::Closed => Err(ProbeError::InvalidState(
                "cannot execute on a closed cursor".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Check that pending results may be fetched from this state
    pub fn check_fetch(self) -> Result<(), ProbeError> {
        let message = match self {
            CursorState::Executed => return Ok(()),
            CursorState::Open => "no statement has been executed on this cursor",
            CursorState::Fetched => "results of the last statement were already fetched",
            CursorState::Closed => "cannot fetch from a closed cursor",
        };
        Err(ProbeError::Query {
            message: message.to_string(),
            source: None,
        })
    }
}

/// A scoped statement handle
///
/// Borrows the connection's client, so it can never outlive the session.
/// `close` is idempotent.
pub struct Cursor<'c> {
    client: &'c Client,
    state: CursorState,
    pending: Option<ResultSet>,
}

impl<'c> Cursor<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self {
            client,
            state: CursorState::Open,
            pending: None,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Send one statement and buffer its rows until `fetch_all`
    ///
    /// Uses the simple query protocol so every column of any type comes back
    /// as text. Re-executing discards unfetched rows of the previous statement.
    pub async fn execute(&mut self, query: &str) -> Result<(), ProbeError> {
        self.state.check_execute()?;

        tracing::debug!("Executing: {}", query);
        let messages = self
            .client
            .simple_query(query)
            .await
            .map_err(ProbeError::query)?;

        self.pending = Some(collect_rows(messages));
        self.state = CursorState::Executed;
        Ok(())
    }

    /// Take every row of the pending result set
    pub fn fetch_all(&mut self) -> Result<ResultSet, ProbeError> {
        self.state.check_fetch()?;

        let result = self.pending.take().unwrap_or_default();
        self.state = CursorState::Fetched;
        tracing::debug!("Fetched {} rows", result.len());
        Ok(result)
    }

    /// Release the handle; later calls are no-ops
    pub fn close(&mut self) {
        if self.state != CursorState::Closed {
            self.pending = None;
            self.state = CursorState::Closed;
        }
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build a result set from simple-query messages
fn collect_rows(messages: Vec<SimpleQueryMessage>) -> ResultSet {
    let mut columns = Vec::new();
    let mut rows = Vec::new();

    for message in messages {
        if let SimpleQueryMessage::Row(row) = message {
            if columns.is_empty() {
                columns = row
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect();
            }
            let values = (0..row.len())
                .map(|idx| row.get(idx).map(str::to_string))
                .collect();
            rows.push(Row::new(values));
        }
    }

    ResultSet::new(columns, rows)
}
