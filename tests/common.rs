#![allow(dead_code)]

use assert_cmd::Command;
use async_trait::async_trait;
use dialectic_rs::diagnostics::{ChannelSink, DiagnosticEvent};
use dialectic_rs::error::ConnectionError;
use dialectic_rs::provider::{DbConnection, DbParameter, ProviderFactory, ServerInfo};
use dialectic_rs::{ContextOptions, ConnectionMode};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns a configured Command for `dialectic_rs`
pub fn dialectic_cmd() -> Command {
    Command::cargo_bin("dialectic_rs").expect("Binary not found")
}

/// Counters shared by every connection a [`FakeProvider`] hands out.
#[derive(Debug, Default)]
pub struct Stats {
    pub created: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub executed: Mutex<Vec<String>>,
}

impl Stats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

pub struct FakeConnection {
    connection_string: String,
    info: ServerInfo,
    open: AtomicBool,
    fail_open: bool,
    fail_close: bool,
    async_delay: Option<Duration>,
    stats: Arc<Stats>,
}

#[async_trait]
impl DbConnection for FakeConnection {
    fn connection_string(&self) -> &str {
        &self.connection_string
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn open(&self) -> Result<(), ConnectionError> {
        if self.fail_open {
            return Err(ConnectionError::ConnectionFailed("server unreachable".to_string()));
        }
        if !self.open.swap(true, Ordering::SeqCst) {
            self.stats.opens.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn close(&self) -> Result<(), ConnectionError> {
        self.open.store(false, Ordering::SeqCst);
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(ConnectionError::QueryFailed("close rejected".to_string()));
        }
        Ok(())
    }

    fn server_info(&self) -> Result<ServerInfo, ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::Closed);
        }
        Ok(self.info.clone())
    }

    fn execute(&self, sql: &str) -> Result<(), ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::Closed);
        }
        self.stats.executed.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    async fn open_async(&self) -> Result<(), ConnectionError> {
        if let Some(delay) = self.async_delay {
            tokio::time::sleep(delay).await;
        }
        self.open()
    }
}

/// In-process provider reporting a fixed product and version.
pub struct FakeProvider {
    pub product: String,
    pub version: String,
    pub connection_string: String,
    pub fail_open: bool,
    pub fail_close: bool,
    pub async_delay: Option<Duration>,
    pub no_parameters: bool,
    pub stats: Arc<Stats>,
}

impl FakeProvider {
    pub fn new(product: &str, version: &str, connection_string: &str) -> Self {
        Self {
            product: product.to_string(),
            version: version.to_string(),
            connection_string: connection_string.to_string(),
            fail_open: false,
            fail_close: false,
            async_delay: None,
            no_parameters: false,
            stats: Arc::new(Stats::default()),
        }
    }

    pub fn sqlite_file() -> Self {
        Self::new("SQLite", "3.45.1", "Data Source=app.db")
    }

    pub fn sqlite_memory() -> Self {
        Self::new("SQLite", "3.45.1", "Data Source=:memory:")
    }

    pub fn postgres() -> Self {
        Self::new("PostgreSQL", "15.4", "Host=db;Database=app")
    }

    pub fn failing(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn slow_async(mut self, delay: Duration) -> Self {
        self.async_delay = Some(delay);
        self
    }

    pub fn without_parameters(mut self) -> Self {
        self.no_parameters = true;
        self
    }

    /// Split into the factory handed to a context and the stats kept by the test.
    pub fn build(self) -> (Arc<dyn ProviderFactory>, Arc<Stats>) {
        let stats = Arc::clone(&self.stats);
        (Arc::new(self), stats)
    }
}

impl ProviderFactory for FakeProvider {
    fn provider_name(&self) -> &str {
        "fake"
    }

    fn create_connection(&self) -> Result<Arc<dyn DbConnection>, ConnectionError> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeConnection {
            connection_string: self.connection_string.clone(),
            info: ServerInfo {
                product_name: self.product.clone(),
                product_version: self.version.clone(),
            },
            open: AtomicBool::new(false),
            fail_open: self.fail_open,
            fail_close: self.fail_close,
            async_delay: self.async_delay,
            stats: Arc::clone(&self.stats),
        }))
    }

    fn create_parameter(&self) -> Option<DbParameter> {
        (!self.no_parameters).then(DbParameter::default)
    }
}

/// Options for `mode` with a channel sink attached.
pub fn options_with_channel(mode: ConnectionMode) -> (ContextOptions, Receiver<DiagnosticEvent>) {
    let (tx, rx) = mpsc::channel();
    let options = ContextOptions::default()
        .with_mode(mode)
        .with_sink(Arc::new(ChannelSink::new(tx)));
    (options, rx)
}
