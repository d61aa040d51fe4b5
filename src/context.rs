//! Context facade: the single entry point for the operation layer.
//!
//! A context detects the dialect once, resolves the connection mode once, and
//! then routes every parameter, identifier and connection request through the
//! resulting descriptor and strategy until it is closed.

use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::diagnostics::{DiagnosticKind, DiagnosticSink, Diagnostics, LogSink};
use crate::dialects::{wrap_procedure_call, DialectDescriptor, DialectDetector};
use crate::error::{ContextError, Result};
use crate::model::Config;
use crate::params::{ParameterBuilder, StatementParameters, DEFAULT_GENERATED_NAME_LENGTH};
use crate::provider::{DbConnection, DbParameter, DbType, DbValue, ProviderFactory};
use crate::resolver::{resolve_mode, ActiveMode, ConnectionMode, ExecutionType};
use crate::strategy::{build_strategy, ConnectionOpener, ConnectionStrategy, TrackedConnection};

#[derive(Clone)]
pub struct ContextOptions {
    pub mode: ConnectionMode,
    /// Refuse Write acquisitions
    pub read_only: bool,
    pub generated_name_length: usize,
    /// Applied to async acquisition; needs a tokio timer
    pub acquire_timeout: Option<Duration>,
    pub sink: Arc<dyn DiagnosticSink>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Best,
            read_only: false,
            generated_name_length: DEFAULT_GENERATED_NAME_LENGTH,
            acquire_timeout: None,
            sink: Arc::new(LogSink),
        }
    }
}

impl fmt::Debug for ContextOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextOptions")
            .field("mode", &self.mode)
            .field("read_only", &self.read_only)
            .field("generated_name_length", &self.generated_name_length)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl ContextOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            mode: config.context.mode,
            read_only: config.context.read_only,
            generated_name_length: config.parameters.generated_name_length,
            acquire_timeout: config.database.acquire_timeout_secs.map(Duration::from_secs),
            ..Self::default()
        })
    }

    pub fn with_mode(mut self, mode: ConnectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }
}

pub struct DbContext {
    factory: Arc<dyn ProviderFactory>,
    dialect: Arc<DialectDescriptor>,
    active: ActiveMode,
    strategy: Box<dyn ConnectionStrategy>,
    diagnostics: Diagnostics,
    read_only: bool,
    generated_name_length: usize,
    acquire_timeout: Option<Duration>,
}

impl fmt::Debug for DbContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbContext")
            .field("provider", &self.factory.provider_name())
            .field("dialect", &self.dialect.rule_name())
            .field("mode", &self.active.mode())
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl DbContext {
    /// Open a probe connection, detect the dialect, resolve the mode and
    /// build the strategy. Only connectivity failures are errors.
    pub fn connect(factory: Arc<dyn ProviderFactory>, options: ContextOptions) -> Result<Self> {
        let probe = factory.create_connection()?;
        if let Err(e) = probe.open() {
            discard_probe(probe.as_ref());
            return Err(e.into());
        }
        Self::assemble(factory, options, probe)
    }

    /// Same as [`connect`](Self::connect) with an async probe open.
    pub async fn connect_async(factory: Arc<dyn ProviderFactory>, options: ContextOptions) -> Result<Self> {
        let probe = factory.create_connection()?;
        if let Err(e) = probe.open_async().await {
            discard_probe(probe.as_ref());
            return Err(e.into());
        }
        Self::assemble(factory, options, probe)
    }

    fn assemble(factory: Arc<dyn ProviderFactory>, options: ContextOptions, probe: Arc<dyn DbConnection>) -> Result<Self> {
        let detection = match DialectDetector::new().detect(probe.as_ref(), factory.as_ref()) {
            Ok(detection) => detection,
            Err(e) => {
                discard_probe(probe.as_ref());
                return Err(e.into());
            }
        };
        let dialect = detection.descriptor;

        let diagnostics = Diagnostics::new(Arc::clone(&options.sink), options.mode)
            .with_product(dialect.product_name(), dialect.product_version());
        if let Some(reason) = &detection.degraded {
            diagnostics.raise(DiagnosticKind::DialectDetection, reason.clone());
        }

        let resolution = resolve_mode(options.mode, &dialect);
        let diagnostics = diagnostics.with_resolved(resolution.resolved);
        if resolution.is_coerced() {
            diagnostics.raise(DiagnosticKind::ModeCoerced, resolution.rationale.clone());
        } else if resolution.mismatch {
            diagnostics.raise(DiagnosticKind::ModeMismatch, resolution.rationale.clone());
        }
        let active = resolution.activate();

        let opener = ConnectionOpener::new(
            Arc::clone(&factory),
            dialect.session_settings().to_vec(),
            diagnostics.clone(),
        );
        let strategy = match build_strategy(active.mode(), opener, Arc::clone(&probe)) {
            Ok(strategy) => strategy,
            Err(e) => {
                discard_probe(probe.as_ref());
                return Err(e.into());
            }
        };

        info!(
            "Context ready: dialect '{}', mode {} (requested {})",
            dialect.rule_name(),
            active.mode(),
            active.requested()
        );

        Ok(Self {
            factory,
            dialect: Arc::new(dialect),
            active,
            strategy,
            diagnostics,
            read_only: options.read_only,
            generated_name_length: options.generated_name_length,
            acquire_timeout: options.acquire_timeout,
        })
    }

    pub fn dialect(&self) -> &DialectDescriptor {
        &self.dialect
    }

    /// Shared, immutable handle to the descriptor
    pub fn dialect_handle(&self) -> Arc<DialectDescriptor> {
        Arc::clone(&self.dialect)
    }

    pub fn mode(&self) -> ConnectionMode {
        self.active.mode()
    }

    pub fn active_mode(&self) -> &ActiveMode {
        &self.active
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn parameter_builder(&self) -> ParameterBuilder<'_> {
        ParameterBuilder::new(&self.dialect).with_name_length(self.generated_name_length)
    }

    pub fn wrap_object_name(&self, name: &str) -> String {
        self.parameter_builder().wrap_object_name(name)
    }

    pub fn make_parameter_name(&self, name: &str) -> String {
        self.parameter_builder().make_parameter_name(name)
    }

    pub fn create_parameter<V: Into<DbValue>>(&self, name: Option<&str>, db_type: DbType, value: V) -> Result<DbParameter> {
        self.parameter_builder()
            .create_parameter(self.factory.as_ref(), name, db_type, value)
    }

    /// Empty parameter set for one statement.
    pub fn statement_parameters(&self) -> StatementParameters<'_> {
        StatementParameters::new(self.parameter_builder())
    }

    pub fn add_parameter<'s, V: Into<DbValue>>(
        &self,
        parameters: &'s mut StatementParameters<'_>,
        name: Option<&str>,
        db_type: DbType,
        value: V,
    ) -> Result<&'s DbParameter> {
        parameters.create(self.factory.as_ref(), name, db_type, value)
    }

    /// Quote `procedure` and render the dialect's call syntax.
    pub fn wrap_procedure_call(&self, procedure: &str, args: &[String]) -> Result<String> {
        wrap_procedure_call(&self.dialect, &self.wrap_object_name(procedure), args)
    }

    fn check_writable(&self, execution: ExecutionType) -> Result<()> {
        if self.read_only && execution == ExecutionType::Write {
            return Err(ContextError::ReadOnly);
        }
        Ok(())
    }

    pub fn get_connection(&self, execution: ExecutionType, is_shared: bool) -> Result<TrackedConnection> {
        self.check_writable(execution)?;
        Ok(self.strategy.get_connection(execution, is_shared)?)
    }

    /// Async acquisition. Honors the configured acquire timeout; dropping
    /// the future releases any half-opened Exclusive connection.
    pub async fn get_connection_async(&self, execution: ExecutionType, is_shared: bool) -> Result<TrackedConnection> {
        match self.acquire_timeout {
            Some(timeout) => self.get_connection_timeout(execution, is_shared, timeout).await,
            None => {
                self.check_writable(execution)?;
                Ok(self.strategy.get_connection_async(execution, is_shared).await?)
            }
        }
    }

    pub async fn get_connection_timeout(
        &self,
        execution: ExecutionType,
        is_shared: bool,
        timeout: Duration,
    ) -> Result<TrackedConnection> {
        self.check_writable(execution)?;
        match tokio::time::timeout(timeout, self.strategy.get_connection_async(execution, is_shared)).await {
            Ok(acquired) => Ok(acquired?),
            Err(_) => {
                self.diagnostics.raise(
                    DiagnosticKind::ConnectionLifecycle,
                    format!("connection acquisition timed out after {:?}", timeout),
                );
                Err(ContextError::Timeout(timeout))
            }
        }
    }

    pub fn close_and_dispose_connection(&self, connection: TrackedConnection) -> Result<()> {
        Ok(self.strategy.close_and_dispose_connection(connection)?)
    }

    pub async fn close_and_dispose_connection_async(&self, connection: TrackedConnection) -> Result<()> {
        Ok(self.strategy.close_and_dispose_connection_async(connection).await?)
    }

    /// Tear the context down, closing the Shared connection if there is one.
    pub fn close(self) -> Result<()> {
        debug!("Closing context");
        Ok(self.strategy.teardown()?)
    }
}

/// Close a probe on a failed connect; the original error wins.
fn discard_probe(probe: &dyn DbConnection) {
    if let Err(e) = probe.close() {
        warn!("Failed to close probe connection after connect error: {}", e);
    }
}

impl Drop for DbContext {
    fn drop(&mut self) {
        if let Err(e) = self.strategy.teardown() {
            warn!("Failed to close shared connection during teardown: {}", e);
        }
    }
}
