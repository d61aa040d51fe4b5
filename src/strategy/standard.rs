use async_trait::async_trait;
use log::debug;

use super::{ConnectionOpener, ConnectionStrategy, TrackedConnection};
use crate::error::ConnectionError;
use crate::resolver::{ConnectionMode, ExecutionType};

/// A fresh Exclusive connection for every request; the engine handles
/// concurrency itself.
pub struct StandardStrategy {
    opener: ConnectionOpener,
}

impl StandardStrategy {
    pub fn new(opener: ConnectionOpener) -> Self {
        Self { opener }
    }
}

#[async_trait]
impl ConnectionStrategy for StandardStrategy {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Standard
    }

    fn get_connection(&self, execution: ExecutionType, _is_shared: bool) -> Result<TrackedConnection, ConnectionError> {
        debug!("Opening exclusive connection for {:?}", execution);
        Ok(TrackedConnection::exclusive(self.opener.open()?))
    }

    async fn get_connection_async(
        &self,
        execution: ExecutionType,
        _is_shared: bool,
    ) -> Result<TrackedConnection, ConnectionError> {
        debug!("Opening exclusive connection for {:?}", execution);
        Ok(TrackedConnection::exclusive(self.opener.open_async().await?))
    }

    fn is_shared_handle(&self, _connection: &TrackedConnection) -> bool {
        false
    }

    fn teardown(&self) -> Result<(), ConnectionError> {
        Ok(())
    }
}
