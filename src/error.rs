// ABOUTME: Error taxonomy for the probe
// ABOUTME: Separates connection, query, and handle-state failures so callers can tell them apart

use std::path::PathBuf;
use tokio_postgres::error::SqlState;

/// Errors produced while probing a database
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Endpoint unreachable, authentication rejected, or database unknown
    #[error("{message}")]
    Connection {
        message: String,
        #[source]
        source: Option<tokio_postgres::Error>,
    },

    /// Statement execution or result retrieval failed
    #[error("{message}")]
    Query {
        message: String,
        #[source]
        source: Option<tokio_postgres::Error>,
    },

    /// Operation attempted on a handle that is already closed
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration values are missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse config file {}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Probe succeeded but required extensions are not installed
    #[error("Required extensions not installed: {}", .0.join(", "))]
    MissingExtensions(Vec<String>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Build a connection error from a driver failure, with a hint for the common causes
    pub fn connection(err: tokio_postgres::Error) -> Self {
        let message = connect_hint(err.code(), &driver_message(&err));
        ProbeError::Connection {
            message,
            source: Some(err),
        }
    }

    /// Build a query error from a driver failure
    pub fn query(err: tokio_postgres::Error) -> Self {
        let message = query_hint(err.code(), &driver_message(&err));
        ProbeError::Query {
            message,
            source: Some(err),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, ProbeError::Connection { .. })
    }

    pub fn is_query(&self) -> bool {
        matches!(self, ProbeError::Query { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, ProbeError::InvalidState(_))
    }
}

/// Text of a driver error
///
/// Server-side errors display only as "db error"; the server's own message
/// lives on the `DbError`.
pub fn driver_message(err: &tokio_postgres::Error) -> String {
    err.as_db_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Turn a connection failure into an actionable message
///
/// SQLSTATE codes are checked first; driver errors that never reached the
/// server (refused, timeout, TLS) only carry text, so those fall back to
/// matching on the message.
pub fn connect_hint(code: Option<&SqlState>, error_msg: &str) -> String {
    if let Some(code) = code {
        if *code == SqlState::INVALID_PASSWORD {
            return "Authentication failed: Invalid username or password.\n\
                    Please verify your database credentials."
                .to_string();
        }
        if *code == SqlState::INVALID_CATALOG_NAME {
            return format!(
                "Database does not exist: {}\n\
                 Please check the database name in the configuration.",
                error_msg
            );
        }
        if *code == SqlState::INVALID_AUTHORIZATION_SPECIFICATION {
            return format!(
                "Access denied: The server rejected this host or user.\n\
                 Check pg_hba.conf on the server.\n\
                 Error: {}",
                error_msg
            );
        }
    }

    if error_msg.contains("password authentication failed") {
        "Authentication failed: Invalid username or password.\n\
         Please verify your database credentials."
            .to_string()
    } else if error_msg.contains("database") && error_msg.contains("does not exist") {
        format!(
            "Database does not exist: {}\n\
             Please check the database name in the configuration.",
            error_msg
        )
    } else if error_msg.contains("no pg_hba.conf entry") {
        format!(
            "Access denied: No pg_hba.conf entry for host.\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("timeout") || error_msg.contains("timed out") {
        format!(
            "Connection timeout: Database server did not respond in time.\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("Connection refused")
        || error_msg.contains("connection refused")
        || error_msg.contains("could not connect")
    {
        format!(
            "Connection refused: Unable to reach database server.\n\
             Please check:\n\
             - The host and port are correct\n\
             - The database server is running\n\
             - Firewall rules allow connections\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("SSL") || error_msg.contains("TLS") || error_msg.contains("tls")
    {
        format!(
            "TLS/SSL error: Failed to establish secure connection.\n\
             Try a different sslmode or check the server certificate.\n\
             Error: {}",
            error_msg
        )
    } else {
        format!("Failed to connect to database: {}", error_msg)
    }
}

/// Turn a statement failure into an actionable message
pub fn query_hint(code: Option<&SqlState>, error_msg: &str) -> String {
    match code {
        Some(code) if *code == SqlState::UNDEFINED_TABLE => format!(
            "Catalog table not found: {}\n\
             The server does not expose the expected extension catalog.",
            error_msg
        ),
        Some(code) if *code == SqlState::INSUFFICIENT_PRIVILEGE => format!(
            "Permission denied reading the extension catalog: {}",
            error_msg
        ),
        Some(code) if *code == SqlState::SYNTAX_ERROR => {
            format!("Query syntax error: {}", error_msg)
        }
        _ => format!("Query failed: {}", error_msg),
    }
}
