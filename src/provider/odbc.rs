use log::{debug, error, info};
use odbc_api::{buffers::TextRowSet, Connection, ConnectionOptions, Cursor, Environment};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use super::{DbConnection, ParameterStyle, ProviderFactory, ServerInfo};
use crate::error::ConnectionError;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

fn environment() -> Result<&'static Environment, ConnectionError> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new()?;
    // A concurrent initialiser may have won; either environment is usable.
    let _ = ENVIRONMENT.set(env);
    ENVIRONMENT
        .get()
        .ok_or_else(|| ConnectionError::ConnectionFailed("ODBC environment unavailable".to_string()))
}

/// Version probes keyed by a lowercase fragment of the DBMS name.
const VERSION_QUERIES: &[(&str, &str)] = &[
    ("postgres", "SELECT version()"),
    ("mysql", "SELECT VERSION()"),
    ("mariadb", "SELECT VERSION()"),
    ("sqlite", "SELECT sqlite_version()"),
    ("sql server", "SELECT CAST(SERVERPROPERTY('ProductVersion') AS VARCHAR(64))"),
    ("oracle", "SELECT version FROM product_component_version WHERE ROWNUM = 1"),
    ("duckdb", "SELECT version()"),
    ("firebird", "SELECT rdb$get_context('SYSTEM', 'ENGINE_VERSION') FROM rdb$database"),
];

/// Provider factory backed by the ODBC driver manager.
pub struct OdbcProviderFactory {
    connection_string: String,
}

impl OdbcProviderFactory {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }
}

impl ProviderFactory for OdbcProviderFactory {
    fn provider_name(&self) -> &str {
        "odbc"
    }

    fn create_connection(&self) -> Result<Arc<dyn DbConnection>, ConnectionError> {
        Ok(Arc::new(OdbcConnection::new(self.connection_string.clone())))
    }

    fn parameter_style(&self) -> ParameterStyle {
        ParameterStyle::Positional
    }
}

pub struct OdbcConnection {
    connection_string: String,
    inner: Mutex<Option<Connection<'static>>>,
}

impl OdbcConnection {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            inner: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection<'static>>> {
        // A panic while holding the lock leaves the handle itself intact.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn query_single_value(connection: &Connection<'static>, query: &str) -> Result<Option<String>, ConnectionError> {
        debug!("Querying single value: {}", query);

        let mut prepared = connection
            .prepare(query)
            .map_err(|e| ConnectionError::QueryFailed(e.to_string()))?;

        let mut cursor = prepared
            .execute(())
            .map_err(|e| ConnectionError::QueryFailed(e.to_string()))?
            .ok_or_else(|| ConnectionError::QueryFailed("Query returned no cursor".to_string()))?;

        let mut buffer = TextRowSet::for_cursor(1, &mut cursor, Some(4096))?;
        let mut row_set_cursor = cursor.bind_buffer(&mut buffer)?;

        if let Some(row_set) = row_set_cursor.fetch()? {
            if row_set.num_rows() > 0 {
                if let Some(value) = row_set.at(0, 0) {
                    return Ok(Some(String::from_utf8_lossy(value).to_string()));
                }
            }
        }

        Ok(None)
    }
}

impl DbConnection for OdbcConnection {
    fn connection_string(&self) -> &str {
        &self.connection_string
    }

    fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    fn open(&self) -> Result<(), ConnectionError> {
        let mut guard = self.lock();
        if guard.is_some() {
            return Ok(());
        }

        debug!(
            "Connecting to database with connection string length: {}",
            self.connection_string.len()
        );
        let connection = environment()?
            .connect_with_connection_string(&self.connection_string, ConnectionOptions::default())
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                ConnectionError::ConnectionFailed(e.to_string())
            })?;

        info!("Successfully connected to database");
        *guard = Some(connection);
        Ok(())
    }

    fn close(&self) -> Result<(), ConnectionError> {
        // Dropping the handle disconnects.
        if self.lock().take().is_some() {
            debug!("ODBC connection closed");
        }
        Ok(())
    }

    fn server_info(&self) -> Result<ServerInfo, ConnectionError> {
        let guard = self.lock();
        let connection = guard.as_ref().ok_or(ConnectionError::Closed)?;

        let product_name = connection.database_management_system_name()?;
        let lower = product_name.to_lowercase();

        let mut product_version = String::new();
        if let Some((_, query)) = VERSION_QUERIES.iter().find(|(key, _)| lower.contains(key)) {
            match Self::query_single_value(connection, query) {
                Ok(Some(version)) => product_version = version,
                Ok(None) => debug!("Version probe returned no value"),
                Err(e) => debug!("Version probe failed: {}", e),
            }
        }

        Ok(ServerInfo {
            product_name,
            product_version,
        })
    }

    fn execute(&self, sql: &str) -> Result<(), ConnectionError> {
        let guard = self.lock();
        let connection = guard.as_ref().ok_or(ConnectionError::Closed)?;

        debug!("Executing SQL statement: {}", sql);
        let mut prepared = connection
            .prepare(sql)
            .map_err(|e| ConnectionError::QueryFailed(e.to_string()))?;

        match prepared.execute(()) {
            Ok(Some(mut cursor)) => {
                let mut buffer = TextRowSet::for_cursor(100, &mut cursor, Some(4096))?;
                let mut row_set_cursor = cursor.bind_buffer(&mut buffer)?;
                while row_set_cursor.fetch()?.is_some() {
                    // Consume results
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                error!("Statement execution failed: {}", e);
                Err(ConnectionError::QueryFailed(e.to_string()))
            }
        }
    }
}
