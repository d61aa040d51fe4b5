//! dialectic: backend-agnostic SQL dialect detection and connection-mode
//! strategy.
//!
//! Given a provider factory for a database known only at runtime,
//! [`DbContext`] detects the product's SQL dialect, resolves a safe
//! connection mode for its concurrency model, and exposes identifier quoting,
//! parameter construction and connection acquisition on top of both.

pub mod context;
pub mod diagnostics;
pub mod dialects;
pub mod error;
pub mod logger;
pub mod model;
pub mod params;
pub mod provider;
pub mod resolver;
pub mod strategy;

pub use context::{ContextOptions, DbContext};
pub use diagnostics::{DiagnosticEvent, DiagnosticKind, DiagnosticSink};
pub use dialects::{DialectDescriptor, DialectDetector, EngineClass};
pub use error::{ConnectionError, ContextError};
pub use provider::{DbConnection, DbParameter, DbType, DbValue, NoValue, ProviderFactory};
pub use resolver::{resolve_mode, ConnectionMode, ExecutionType};
pub use strategy::{ConnectionStrategy, Ownership, TrackedConnection};
