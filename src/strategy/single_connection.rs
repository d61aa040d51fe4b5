use async_trait::async_trait;
use std::sync::Arc;

use super::{ConnectionOpener, ConnectionStrategy, SharedHandle, TrackedConnection};
use crate::diagnostics::DiagnosticKind;
use crate::error::ConnectionError;
use crate::provider::DbConnection;
use crate::resolver::{ConnectionMode, ExecutionType};

/// Every request, read or write, is served by the one Shared connection.
pub struct SingleConnectionStrategy {
    opener: ConnectionOpener,
    shared: SharedHandle,
}

impl SingleConnectionStrategy {
    /// `connection` must already be open.
    pub fn new(opener: ConnectionOpener, connection: Arc<dyn DbConnection>) -> Self {
        opener
            .diagnostics()
            .raise(DiagnosticKind::ConnectionLifecycle, "single shared connection established");
        Self {
            opener,
            shared: SharedHandle::new(connection),
        }
    }

    pub fn connect(opener: ConnectionOpener) -> Result<Self, ConnectionError> {
        let connection = opener.open()?;
        Ok(Self::new(opener, connection))
    }
}

#[async_trait]
impl ConnectionStrategy for SingleConnectionStrategy {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::SingleConnection
    }

    fn get_connection(&self, _execution: ExecutionType, _is_shared: bool) -> Result<TrackedConnection, ConnectionError> {
        self.shared.tracked()
    }

    async fn get_connection_async(
        &self,
        _execution: ExecutionType,
        _is_shared: bool,
    ) -> Result<TrackedConnection, ConnectionError> {
        self.shared.tracked()
    }

    fn is_shared_handle(&self, connection: &TrackedConnection) -> bool {
        self.shared.is(connection)
    }

    fn teardown(&self) -> Result<(), ConnectionError> {
        self.shared.teardown(&self.opener)
    }
}
