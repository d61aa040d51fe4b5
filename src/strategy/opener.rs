use log::{debug, warn};
use std::sync::Arc;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::ConnectionError;
use crate::provider::{DbConnection, ProviderFactory};

/// Opens Exclusive connections from the provider factory and prepares them
/// with the dialect's session settings.
#[derive(Clone)]
pub struct ConnectionOpener {
    factory: Arc<dyn ProviderFactory>,
    session_settings: Arc<[String]>,
    diagnostics: Arc<Diagnostics>,
}

impl ConnectionOpener {
    pub fn new(factory: Arc<dyn ProviderFactory>, session_settings: Vec<String>, diagnostics: Diagnostics) -> Self {
        Self {
            factory,
            session_settings: session_settings.into(),
            diagnostics: Arc::new(diagnostics),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn open(&self) -> Result<Arc<dyn DbConnection>, ConnectionError> {
        let guard = ReleaseGuard::new(self.factory.create_connection()?, &self.diagnostics);
        guard.connection().open()?;
        self.apply_session_settings(guard.connection())?;
        Ok(guard.disarm())
    }

    /// Async twin of [`open`](Self::open). Dropping the returned future
    /// before it completes closes the half-opened connection.
    pub async fn open_async(&self) -> Result<Arc<dyn DbConnection>, ConnectionError> {
        let guard = ReleaseGuard::new(self.factory.create_connection()?, &self.diagnostics);
        guard.connection().open_async().await?;
        self.apply_session_settings(guard.connection())?;
        Ok(guard.disarm())
    }

    pub fn apply_session_settings(&self, connection: &dyn DbConnection) -> Result<(), ConnectionError> {
        for statement in self.session_settings.iter() {
            debug!("Applying session setting: {}", statement);
            connection.execute(statement)?;
        }
        Ok(())
    }
}

/// Closes the connection unless disarmed; covers errors and cancellation.
struct ReleaseGuard<'a> {
    connection: Option<Arc<dyn DbConnection>>,
    diagnostics: &'a Diagnostics,
}

impl<'a> ReleaseGuard<'a> {
    fn new(connection: Arc<dyn DbConnection>, diagnostics: &'a Diagnostics) -> Self {
        Self {
            connection: Some(connection),
            diagnostics,
        }
    }

    fn connection(&self) -> &dyn DbConnection {
        // Only `disarm` empties the slot, and it consumes the guard.
        match &self.connection {
            Some(connection) => connection.as_ref(),
            None => unreachable!("release guard used after disarm"),
        }
    }

    fn disarm(mut self) -> Arc<dyn DbConnection> {
        match self.connection.take() {
            Some(connection) => connection,
            None => unreachable!("release guard disarmed twice"),
        }
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.diagnostics.raise(
                DiagnosticKind::ConnectionLifecycle,
                "releasing connection after failed or cancelled acquisition",
            );
            if let Err(e) = connection.close() {
                warn!("Failed to release connection after aborted acquisition: {}", e);
            }
        }
    }
}
