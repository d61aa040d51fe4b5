use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use super::{ConnectionOpener, ConnectionStrategy, SharedHandle, TrackedConnection};
use crate::diagnostics::DiagnosticKind;
use crate::error::ConnectionError;
use crate::provider::DbConnection;
use crate::resolver::{ConnectionMode, ExecutionType};

/// Reads get fresh Exclusive connections; every write goes through the one
/// Shared connection so writes are sequenced on a single handle.
pub struct SingleWriterStrategy {
    opener: ConnectionOpener,
    shared: SharedHandle,
}

impl SingleWriterStrategy {
    /// `writer` must already be open.
    pub fn new(opener: ConnectionOpener, writer: Arc<dyn DbConnection>) -> Self {
        opener
            .diagnostics()
            .raise(DiagnosticKind::ConnectionLifecycle, "shared writer connection established");
        Self {
            opener,
            shared: SharedHandle::new(writer),
        }
    }

    /// Open a dedicated writer connection.
    pub fn connect(opener: ConnectionOpener) -> Result<Self, ConnectionError> {
        let writer = opener.open()?;
        Ok(Self::new(opener, writer))
    }

    fn wants_shared(execution: ExecutionType, is_shared: bool) -> bool {
        execution != ExecutionType::Read || is_shared
    }
}

#[async_trait]
impl ConnectionStrategy for SingleWriterStrategy {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::SingleWriter
    }

    fn get_connection(&self, execution: ExecutionType, is_shared: bool) -> Result<TrackedConnection, ConnectionError> {
        if Self::wants_shared(execution, is_shared) {
            return self.shared.tracked();
        }
        debug!("Opening exclusive reader connection");
        Ok(TrackedConnection::exclusive(self.opener.open()?))
    }

    async fn get_connection_async(
        &self,
        execution: ExecutionType,
        is_shared: bool,
    ) -> Result<TrackedConnection, ConnectionError> {
        if Self::wants_shared(execution, is_shared) {
            return self.shared.tracked();
        }
        debug!("Opening exclusive reader connection");
        Ok(TrackedConnection::exclusive(self.opener.open_async().await?))
    }

    fn is_shared_handle(&self, connection: &TrackedConnection) -> bool {
        self.shared.is(connection)
    }

    fn teardown(&self) -> Result<(), ConnectionError> {
        self.shared.teardown(&self.opener)
    }
}
