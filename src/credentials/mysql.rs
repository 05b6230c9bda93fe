/// MySQL user catalog
use super::AccountCatalog;
use crate::admin::mysql::opts_for;
use crate::config::EndpointConfig;
use crate::core::CatalogAccount;
use crate::error::{BoxError, SyncError, SyncResult};
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{from_value_opt, Conn, Row, Value};

/// Accounts granted from a given host. The host is always a bind parameter.
const ACCOUNTS_FOR_HOST_SQL: &str =
    "SELECT user, authentication_string, max_user_connections FROM mysql.user WHERE host = ?";

const CATALOG_DATABASE: &str = "mysql";

/// Connection to the upstream database's user catalog
pub struct MySqlCatalog {
    conn: Conn,
}

impl MySqlCatalog {
    pub async fn connect(endpoint: &EndpointConfig) -> SyncResult<Self> {
        let target = format!("account catalog {}:{}", endpoint.host, endpoint.port);
        let mut conn = Conn::new(opts_for(endpoint, CATALOG_DATABASE))
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
            tracing::warn!(error = %e, "close account catalog connection failed");
        }
    }
}

#[async_trait]
impl AccountCatalog for MySqlCatalog {
    async fn accounts_for_host(&mut self, host: &str) -> Result<Vec<CatalogAccount>, BoxError> {
        let rows: Vec<Row> = self.conn.exec(ACCOUNTS_FOR_HOST_SQL, (host,)).await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for mut row in rows {
            let username: Value = row.take(0).unwrap_or(Value::NULL);
            let password: Value = row.take(1).unwrap_or(Value::NULL);
            let limit: Value = row.take(2).unwrap_or(Value::NULL);

            if let Some(account) = account_from_row(username, password, limit)? {
                accounts.push(account);
            }
        }

        Ok(accounts)
    }
}

/// Convert one catalog row.
///
/// Accounts without a textual authentication string are skipped: a NULL
/// would become an empty proxy password, and binary hashes
/// (caching_sha2_password) cannot be written as admin text. A username or
/// connection limit that does not convert is an error.
fn account_from_row(
    username: Value,
    password: Value,
    limit: Value,
) -> Result<Option<CatalogAccount>, BoxError> {
    let username: String = from_value_opt(username)
        .map_err(|e| format!("catalog user column is not text: {:?}", e.0))?;

    let password = match password {
        Value::NULL => {
            tracing::warn!(user = %username, "authentication string is NULL, skipping");
            return Ok(None);
        }
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(password) => password,
            Err(_) => {
                tracing::warn!(user = %username, "authentication string is not text, skipping");
                return Ok(None);
            }
        },
        other => {
            return Err(format!(
                "user {} authentication string has unexpected type: {:?}",
                username, other
            )
            .into())
        }
    };

    let limit: i64 = from_value_opt(limit).map_err(|e| {
        format!(
            "user {} max_user_connections is not an integer: {:?}",
            username, e.0
        )
    })?;
    let connection_limit = u32::try_from(limit).map_err(|_| {
        format!(
            "user {} max_user_connections out of range: {}",
            username, limit
        )
    })?;

    Ok(Some(CatalogAccount {
        username,
        password,
        connection_limit,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Value {
        Value::Bytes(value.as_bytes().to_vec())
    }

    #[test]
    fn test_account_from_row_mirrors_values() {
        let account = account_from_row(text("app"), text("*A1"), Value::UInt(20))
            .unwrap()
            .unwrap();

        assert_eq!(account.username, "app");
        assert_eq!(account.password, "*A1");
        assert_eq!(account.connection_limit, 20);

        let unlimited = account_from_row(text("report"), text("*B2"), Value::Int(0))
            .unwrap()
            .unwrap();
        assert_eq!(unlimited.connection_limit, 0);
    }

    #[test]
    fn test_account_from_row_skips_null_password() {
        let account = account_from_row(text("app"), Value::NULL, Value::UInt(0)).unwrap();
        assert!(account.is_none());
    }

    #[test]
    fn test_account_from_row_skips_binary_password() {
        let hash = Value::Bytes(vec![b'$', b'A', 0xff, 0xfe, 0x00]);
        let account = account_from_row(text("app"), hash, Value::UInt(0)).unwrap();
        assert!(account.is_none());
    }

    #[test]
    fn test_account_from_row_negative_limit_is_error() {
        let err = account_from_row(text("app"), text("*A1"), Value::Int(-1)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_account_from_row_bad_limit_type_is_error() {
        let err = account_from_row(text("app"), text("*A1"), text("lots")).unwrap_err();
        assert!(err.to_string().contains("max_user_connections"));
    }
}
