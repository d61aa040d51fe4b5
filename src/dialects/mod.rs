//! Database dialect system
//!
//! Per-product syntax and capability facts live as flat records in
//! `rules/*.toml`. The registry selects a record by matching the product name
//! and version read from a live connection; the detector turns the match into
//! an immutable [`DialectDescriptor`].

pub mod base;
pub mod detector;
pub mod procedure;
pub mod registry;

// Re-export main types
pub use base::{
    DialectDescriptor, DialectFeatures, DialectRule, EngineClass, ProcWrappingStyle, SqlStandardLevel, Version,
    POSITIONAL_MARKER,
};
pub use detector::{Detection, DialectDetector};
pub use procedure::wrap_procedure_call;
pub use registry::{get_registry, DialectRegistry, RuleMatch};

/// List all built-in dialect rule names
pub fn list_dialects() -> Vec<String> {
    get_registry().list_dialects()
}
