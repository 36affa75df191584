// ABOUTME: PostgreSQL session handle for the probe
// ABOUTME: Handles TLS setup, error classification, and guaranteed release of the session

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::postgres::cursor::Cursor;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::task::JoinHandle;
use tokio_postgres::Client;

/// A live session to the database
///
/// Owns the client and the background task driving the socket. Call
/// [`Connection::close`] to end the session and wait for the driver to finish;
/// dropping the handle also ends the session, without waiting.
pub struct Connection {
    client: Client,
    driver: Option<JoinHandle<()>>,
    endpoint: String,
}

/// Connect to PostgreSQL with TLS support
///
/// No retry: the first failure is returned as [`ProbeError::Connection`].
pub async fn connect(config: &ProbeConfig) -> Result<Connection, ProbeError> {
    let endpoint = config.to_string();

    // Set up TLS connector; sslmode decides whether it is used
    let tls_connector = TlsConnector::builder()
        .danger_accept_invalid_certs(false)
        .build()
        .map_err(|e| ProbeError::Connection {
            message: format!("Failed to build TLS connector: {}", e),
            source: None,
        })?;
    let tls = MakeTlsConnector::new(tls_connector);

    tracing::debug!("Opening session to {}", endpoint);
    let (client, connection) = config
        .to_pg_config()
        .connect(tls)
        .await
        .map_err(ProbeError::connection)?;

    // Spawn connection handler
    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    Ok(Connection {
        client,
        driver: Some(driver),
        endpoint,
    })
}

impl Connection {
    /// Allocate a statement handle on this session
    ///
    /// Fails with [`ProbeError::InvalidState`] if the server or network has
    /// already closed the session.
    pub fn open_cursor(&self) -> Result<Cursor<'_>, ProbeError> {
        if self.client.is_closed() {
            return Err(ProbeError::InvalidState(format!(
                "connection to {} is closed",
                self.endpoint
            )));
        }
        Ok(Cursor::new(&self.client))
    }

    /// Redacted description of the endpoint, safe for logs
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// End the session and wait until the socket is shut down
    ///
    /// Dropping the client makes the driver send Terminate and exit.
    pub async fn close(mut self) {
        let driver = self.driver.take();
        let endpoint = std::mem::take(&mut self.endpoint);
        drop(self);

        if let Some(driver) = driver {
            if let Err(e) = driver.await {
                tracing::warn!("Connection driver for {} did not shut down cleanly: {}", endpoint, e);
            }
        }
        tracing::debug!("Closed session to {}", endpoint);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.driver.is_some() {
            tracing::debug!(
                "Session to {} released without explicit close",
                self.endpoint
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SslMode;

    #[tokio::test]
    async fn test_connect_to_unreachable_port_is_connection_error() {
        // Port 1 on loopback is never a PostgreSQL server
        let config = ProbeConfig {
            host: "127.0.0.1".into(),
            port: 1,
            ssl_mode: SslMode::Disable,
            connect_timeout_secs: Some(5),
            ..Default::default()
        };

        let result = connect(&config).await;
        match result {
            Err(err) => assert!(err.is_connection(), "unexpected error: {err:?}"),
            Ok(_) => panic!("connection to port 1 should fail"),
        }
    }

    // NOTE: This test requires a real PostgreSQL instance
    // Skip if TEST_DATABASE_URL is not set
    #[tokio::test]
    #[ignore]
    async fn test_connect_and_close() {
        let url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must be set for integration tests");
        let config = ProbeConfig::from_url(&url).unwrap();

        let connection = connect(&config).await.unwrap();
        assert!(!connection.is_closed());
        assert_eq!(connection.endpoint(), config.to_string());
        if config.password.is_some() {
            assert!(connection.endpoint().contains(":***@"));
        }
        assert!(connection.open_cursor().is_ok());
        connection.close().await;
    }
}
