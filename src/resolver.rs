//! Connection-mode resolution.
//!
//! A pure function of the requested mode and the detected engine class. The
//! per-engine judgments live in [`MODE_POLICY`] so that "suboptimal but safe"
//! (logged) and "unsafe" (corrected) stay distinct.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dialects::{DialectDescriptor, EngineClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionMode {
    /// Fresh connection per operation
    Standard,
    /// One connection for everything
    SingleConnection,
    /// Fresh connections for reads, one shared connection for writes
    SingleWriter,
    /// Let the resolver pick the optimal mode for the engine
    #[default]
    Best,
}

impl ConnectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionMode::Standard => "standard",
            ConnectionMode::SingleConnection => "single-connection",
            ConnectionMode::SingleWriter => "single-writer",
            ConnectionMode::Best => "best",
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "standard" => Ok(ConnectionMode::Standard),
            "single-connection" | "singleconnection" => Ok(ConnectionMode::SingleConnection),
            "single-writer" | "singlewriter" => Ok(ConnectionMode::SingleWriter),
            "best" => Ok(ConnectionMode::Best),
            other => Err(format!(
                "unknown connection mode '{}' (expected standard, single-connection, single-writer or best)",
                other
            )),
        }
    }
}

/// Classifies an operation before a connection is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionType {
    Read,
    Write,
}

/// How a concrete mode fares against an engine class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgment {
    Optimal,
    /// Safe but leaves concurrency on the table
    Suboptimal,
    /// Breaks correctness; the payload is the minimal safe substitute
    Unsafe(ConnectionMode),
}

pub const MODE_POLICY: &[(EngineClass, ConnectionMode, Judgment)] = &[
    (EngineClass::ClientServer, ConnectionMode::Standard, Judgment::Optimal),
    (EngineClass::ClientServer, ConnectionMode::SingleWriter, Judgment::Suboptimal),
    (EngineClass::ClientServer, ConnectionMode::SingleConnection, Judgment::Suboptimal),
    (
        EngineClass::FileSingleWriter,
        ConnectionMode::Standard,
        Judgment::Unsafe(ConnectionMode::SingleWriter),
    ),
    (EngineClass::FileSingleWriter, ConnectionMode::SingleWriter, Judgment::Optimal),
    (EngineClass::FileSingleWriter, ConnectionMode::SingleConnection, Judgment::Suboptimal),
    (
        EngineClass::InMemory,
        ConnectionMode::Standard,
        Judgment::Unsafe(ConnectionMode::SingleConnection),
    ),
    (
        EngineClass::InMemory,
        ConnectionMode::SingleWriter,
        Judgment::Unsafe(ConnectionMode::SingleConnection),
    ),
    (EngineClass::InMemory, ConnectionMode::SingleConnection, Judgment::Optimal),
];

/// Policy lookup; `Best` is never judged, it is replaced by the optimum.
pub fn judge(engine: EngineClass, mode: ConnectionMode) -> Judgment {
    MODE_POLICY
        .iter()
        .find(|(e, m, _)| *e == engine && *m == mode)
        .map_or(Judgment::Optimal, |(_, _, j)| *j)
}

pub fn optimal_mode(engine: EngineClass) -> ConnectionMode {
    MODE_POLICY
        .iter()
        .find(|(e, _, j)| *e == engine && *j == Judgment::Optimal)
        .map_or(ConnectionMode::Standard, |(_, m, _)| *m)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeState {
    Requested,
    Validated,
    Coerced,
    Active,
}

/// Outcome of resolving a requested mode against one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeResolution {
    pub requested: ConnectionMode,
    pub resolved: ConnectionMode,
    pub engine_class: EngineClass,
    pub state: ModeState,
    /// Safe but suboptimal choice; log-only
    pub mismatch: bool,
    pub rationale: String,
}

impl ModeResolution {
    pub fn is_coerced(&self) -> bool {
        self.state == ModeState::Coerced
    }

    /// Fix the resolution for the lifetime of a context.
    pub fn activate(self) -> ActiveMode {
        ActiveMode { resolution: self }
    }
}

/// A resolution that has been committed to. It exposes no way to change the
/// mode again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMode {
    resolution: ModeResolution,
}

impl ActiveMode {
    pub fn mode(&self) -> ConnectionMode {
        self.resolution.resolved
    }

    pub fn requested(&self) -> ConnectionMode {
        self.resolution.requested
    }

    pub fn state(&self) -> ModeState {
        ModeState::Active
    }

    /// How the mode got here: `Validated` or `Coerced`
    pub fn resolution(&self) -> &ModeResolution {
        &self.resolution
    }
}

pub fn resolve_mode(requested: ConnectionMode, dialect: &DialectDescriptor) -> ModeResolution {
    let engine = dialect.engine_class();
    let product = if dialect.product_name().is_empty() {
        dialect.rule_name()
    } else {
        dialect.product_name()
    };

    let (resolved, state, mismatch, rationale) = if requested == ConnectionMode::Best {
        let best = optimal_mode(engine);
        (
            best,
            ModeState::Validated,
            false,
            format!("{} is the optimal mode for {} engine {}", best, engine, product),
        )
    } else {
        match judge(engine, requested) {
            Judgment::Optimal => (
                requested,
                ModeState::Validated,
                false,
                format!("{} is optimal for {} engine {}", requested, engine, product),
            ),
            Judgment::Suboptimal => (
                requested,
                ModeState::Validated,
                true,
                format!(
                    "{} is safe but suboptimal for {} engine {}; {} would allow more concurrency",
                    requested,
                    engine,
                    product,
                    optimal_mode(engine)
                ),
            ),
            Judgment::Unsafe(substitute) => (
                substitute,
                ModeState::Coerced,
                false,
                format!(
                    "{} is unsafe for {} engine {}; using {}",
                    requested, engine, product, substitute
                ),
            ),
        }
    };

    ModeResolution {
        requested,
        resolved,
        engine_class: engine,
        state,
        mismatch,
        rationale,
    }
}
