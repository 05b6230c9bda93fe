/// ProxySQL admin interface over the MySQL text protocol
use super::{AdminExecutor, AdminStatement};
use crate::config::EndpointConfig;
use crate::error::{BoxError, SyncError, SyncResult};
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder};

/// Admin schema holding the staged configuration tables
const ADMIN_DATABASE: &str = "main";

/// Session settings sent up front so the server is never asked for them
const MAX_ALLOWED_PACKET: usize = 16 * 1024 * 1024;
const WAIT_TIMEOUT_SEC: usize = 28_800;

/// Build connection options for a configured MySQL-protocol endpoint.
///
/// The connection always stays on the configured TCP endpoint; a loopback
/// host must not be swapped for a socket reported by whatever sits behind it.
pub(crate) fn opts_for(endpoint: &EndpointConfig, database: &str) -> OptsBuilder {
    OptsBuilder::default()
        .ip_or_hostname(endpoint.host.clone())
        .tcp_port(endpoint.port)
        .user(Some(endpoint.username.clone()))
        .pass(Some(endpoint.password.clone()))
        .db_name(Some(database.to_string()))
        .prefer_socket(false)
        .max_allowed_packet(Some(MAX_ALLOWED_PACKET))
        .wait_timeout(Some(WAIT_TIMEOUT_SEC))
}

/// Connection to the proxy's admin interface
pub struct MySqlAdmin {
    conn: Conn,
}

impl MySqlAdmin {
    /// Connect to the admin interface and verify it answers
    pub async fn connect(endpoint: &EndpointConfig) -> SyncResult<Self> {
        let target = format!("proxy admin {}:{}", endpoint.host, endpoint.port);
        let mut conn = Conn::new(opts_for(endpoint, ADMIN_DATABASE))
            .await
            .map_err(|e| SyncError::connect(target.clone(), e))?;
        conn.ping()
            .await
            .map_err(|e| SyncError::connect(target.clone(), e))?;

        tracing::info!(endpoint = %target, "connected");
        Ok(Self { conn })
    }

    /// Close the connection, logging rather than failing on error
    pub async fn close(self) {
        if let Err(e) = self.conn.disconnect().await {
            tracing::warn!(error = %e, "close proxy admin connection failed");
        }
    }
}

#[async_trait]
impl AdminExecutor for MySqlAdmin {
    async fn execute(&mut self, statement: &AdminStatement) -> Result<(), BoxError> {
        // admin interface only speaks the text protocol
        self.conn.query_drop(statement.to_string()).await?;
        Ok(())
    }
}
