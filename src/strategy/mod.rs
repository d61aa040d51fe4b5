//! Connection strategies
//!
//! A strategy decides which physical connection serves a request and what
//! releasing it means. Exclusive handles belong to the caller and are closed
//! on release; the Shared handle belongs to the strategy and is only closed by
//! [`ConnectionStrategy::teardown`].

mod opener;
mod single_connection;
mod single_writer;
mod standard;

pub use opener::ConnectionOpener;
pub use single_connection::SingleConnectionStrategy;
pub use single_writer::SingleWriterStrategy;
pub use standard::StandardStrategy;

use async_trait::async_trait;
use log::debug;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::diagnostics::DiagnosticKind;
use crate::error::ConnectionError;
use crate::provider::DbConnection;
use crate::resolver::{ConnectionMode, ExecutionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Owned and released by the caller
    Exclusive,
    /// Owned by the strategy until teardown
    Shared,
}

/// A physical connection handle tagged with who owns it.
pub struct TrackedConnection {
    connection: Arc<dyn DbConnection>,
    ownership: Ownership,
}

impl TrackedConnection {
    pub(crate) fn exclusive(connection: Arc<dyn DbConnection>) -> Self {
        Self {
            connection,
            ownership: Ownership::Exclusive,
        }
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_shared(&self) -> bool {
        self.ownership == Ownership::Shared
    }

    /// Identity comparison: both refer to the same physical handle.
    pub fn same_handle(&self, other: &TrackedConnection) -> bool {
        Arc::ptr_eq(&self.connection, &other.connection)
    }
}

impl Deref for TrackedConnection {
    type Target = dyn DbConnection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl fmt::Debug for TrackedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedConnection")
            .field("ownership", &self.ownership)
            .field("handle", &Arc::as_ptr(&self.connection).cast::<()>())
            .field("open", &self.connection.is_open())
            .finish()
    }
}

/// The single Shared handle of a SingleWriter/SingleConnection strategy.
pub(crate) struct SharedHandle {
    connection: Arc<dyn DbConnection>,
    torn_down: AtomicBool,
}

impl SharedHandle {
    pub(crate) fn new(connection: Arc<dyn DbConnection>) -> Self {
        Self {
            connection,
            torn_down: AtomicBool::new(false),
        }
    }

    pub(crate) fn tracked(&self) -> Result<TrackedConnection, ConnectionError> {
        if self.torn_down.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed);
        }
        Ok(TrackedConnection {
            connection: Arc::clone(&self.connection),
            ownership: Ownership::Shared,
        })
    }

    pub(crate) fn is(&self, connection: &TrackedConnection) -> bool {
        Arc::ptr_eq(&self.connection, &connection.connection)
    }

    pub(crate) fn teardown(&self, opener: &ConnectionOpener) -> Result<(), ConnectionError> {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        opener
            .diagnostics()
            .raise(DiagnosticKind::ConnectionLifecycle, "closing shared connection at teardown");
        self.connection.close()
    }
}

/// How physical connections are acquired and released per execution type.
#[async_trait]
pub trait ConnectionStrategy: Send + Sync {
    fn mode(&self) -> ConnectionMode;

    fn get_connection(&self, execution: ExecutionType, is_shared: bool) -> Result<TrackedConnection, ConnectionError>;

    async fn get_connection_async(
        &self,
        execution: ExecutionType,
        is_shared: bool,
    ) -> Result<TrackedConnection, ConnectionError>;

    /// Whether `connection` is this strategy's Shared handle (by identity).
    fn is_shared_handle(&self, connection: &TrackedConnection) -> bool;

    /// Close the strategy's Shared handle, if any. Idempotent.
    fn teardown(&self) -> Result<(), ConnectionError>;

    fn close_and_dispose_connection(&self, connection: TrackedConnection) -> Result<(), ConnectionError> {
        if self.is_shared_handle(&connection) {
            debug!("Release of shared connection ignored until teardown");
            return Ok(());
        }
        connection.connection.close()
    }

    async fn close_and_dispose_connection_async(&self, connection: TrackedConnection) -> Result<(), ConnectionError> {
        if self.is_shared_handle(&connection) {
            debug!("Release of shared connection ignored until teardown");
            return Ok(());
        }
        connection.connection.close_async().await
    }
}

/// Build the strategy for a resolved mode. `probe` is the already-open
/// connection used for detection; modes with a Shared handle adopt it,
/// Standard closes it.
pub fn build_strategy(
    mode: ConnectionMode,
    opener: ConnectionOpener,
    probe: Arc<dyn DbConnection>,
) -> Result<Box<dyn ConnectionStrategy>, ConnectionError> {
    let strategy: Box<dyn ConnectionStrategy> = match mode {
        // Best never survives resolution.
        ConnectionMode::Standard | ConnectionMode::Best => {
            probe.close()?;
            Box::new(StandardStrategy::new(opener))
        }
        ConnectionMode::SingleWriter => {
            opener.apply_session_settings(probe.as_ref())?;
            Box::new(SingleWriterStrategy::new(opener, probe))
        }
        ConnectionMode::SingleConnection => {
            opener.apply_session_settings(probe.as_ref())?;
            Box::new(SingleConnectionStrategy::new(opener, probe))
        }
    };
    Ok(strategy)
}
