//! Diagnostic events raised to an external observability collaborator.
//!
//! Emission is fire-and-forget: a failing sink never fails the operation that
//! raised the event.

use log::{debug, info, warn};
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::resolver::ConnectionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    ModeMismatch,
    ModeCoerced,
    DialectDetection,
    ConnectionLifecycle,
    MetricsIssue,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::ModeMismatch => "ModeMismatch",
            DiagnosticKind::ModeCoerced => "ModeCoerced",
            DiagnosticKind::DialectDetection => "DialectDetection",
            DiagnosticKind::ConnectionLifecycle => "ConnectionLifecycle",
            DiagnosticKind::MetricsIssue => "MetricsIssue",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub kind: DiagnosticKind,
    pub requested_mode: ConnectionMode,
    /// `None` until the mode has been resolved
    pub resolved_mode: Option<ConnectionMode>,
    pub product: String,
    pub version: String,
    pub rationale: String,
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (requested={}, resolved={}, product={} {})",
            self.kind,
            self.rationale,
            self.requested_mode,
            self.resolved_mode.map_or("unresolved", ConnectionMode::as_str),
            self.product,
            self.version
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Diagnostic sink disconnected")]
    Disconnected,

    #[error("Diagnostic sink failed: {0}")]
    Failed(String),
}

/// Receives diagnostic events. Implementations must not block.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: &DiagnosticEvent) -> Result<(), SinkError>;
}

/// Writes events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, event: &DiagnosticEvent) -> Result<(), SinkError> {
        match event.kind {
            DiagnosticKind::ModeCoerced | DiagnosticKind::DialectDetection | DiagnosticKind::MetricsIssue => {
                warn!("{}", event)
            }
            DiagnosticKind::ModeMismatch => info!("{}", event),
            DiagnosticKind::ConnectionLifecycle => debug!("{}", event),
        }
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _event: &DiagnosticEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Forwards events over an unbounded channel.
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<DiagnosticEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<DiagnosticEvent>) -> Self {
        Self { sender }
    }
}

impl DiagnosticSink for ChannelSink {
    fn emit(&self, event: &DiagnosticEvent) -> Result<(), SinkError> {
        self.sender.send(event.clone()).map_err(|_| SinkError::Disconnected)
    }
}

/// Stamps events with the context's mode and product before handing them to
/// the sink.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn DiagnosticSink>,
    requested_mode: ConnectionMode,
    resolved_mode: Option<ConnectionMode>,
    product: String,
    version: String,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("requested_mode", &self.requested_mode)
            .field("resolved_mode", &self.resolved_mode)
            .field("product", &self.product)
            .finish()
    }
}

impl Diagnostics {
    pub fn new(sink: Arc<dyn DiagnosticSink>, requested_mode: ConnectionMode) -> Self {
        Self {
            sink,
            requested_mode,
            resolved_mode: None,
            product: String::new(),
            version: String::new(),
        }
    }

    pub fn with_product(mut self, product: &str, version: &str) -> Self {
        self.product = product.to_string();
        self.version = version.to_string();
        self
    }

    pub fn with_resolved(mut self, mode: ConnectionMode) -> Self {
        self.resolved_mode = Some(mode);
        self
    }

    pub fn raise(&self, kind: DiagnosticKind, rationale: impl Into<String>) {
        let event = DiagnosticEvent {
            kind,
            requested_mode: self.requested_mode,
            resolved_mode: self.resolved_mode,
            product: self.product.clone(),
            version: self.version.clone(),
            rationale: rationale.into(),
        };

        if let Err(e) = self.sink.emit(&event) {
            // The sink itself is broken; report through the log facade only.
            warn!("[{}] dropped {} event: {}", DiagnosticKind::MetricsIssue, event.kind, e);
        }
    }
}
