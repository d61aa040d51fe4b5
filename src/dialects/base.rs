use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// SQL standard compliance, ordered from oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlStandardLevel {
    PreStandard,
    Sql86,
    Sql89,
    Sql92,
    Sql99,
    Sql2003,
    Sql2006,
    Sql2008,
    Sql2011,
    Sql2016,
    Sql2019,
    Sql2023,
}

/// How a stored procedure call is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcWrappingStyle {
    None,
    Call,
    Exec,
    #[serde(rename = "postgresql")]
    PostgreSql,
    Oracle,
    ExecuteProcedure,
}

/// Concurrency profile of an engine, used by the mode resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineClass {
    /// Single-session store living in one connection's memory
    InMemory,
    /// File-locked engine: many readers, one writer
    FileSingleWriter,
    /// Server with its own inter-connection concurrency control
    ClientServer,
}

impl fmt::Display for EngineClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineClass::InMemory => "in-memory",
            EngineClass::FileSingleWriter => "file-single-writer",
            EngineClass::ClientServer => "client-server",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct DialectFeatures {
    #[serde(default)]
    pub merge: bool,
    #[serde(default)]
    pub insert_on_conflict: bool,
    #[serde(default)]
    pub on_duplicate_key: bool,
    #[serde(default)]
    pub requires_stored_proc_parameter_name_match: bool,
}

/// Parsed `major.minor.patch` product version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Extract the first dotted number from a free-form version banner,
    /// e.g. `"PostgreSQL 15.3 on x86_64"` or `"16.00.4135"`.
    pub fn parse(text: &str) -> Option<Self> {
        static VERSION_RE: OnceLock<Regex> = OnceLock::new();
        let re = VERSION_RE.get_or_init(|| {
            Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("version pattern is valid")
        });

        let caps = re.captures(text)?;
        let part = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(0)
        };
        let major = caps.get(1)?.as_str().parse::<u32>().ok()?;
        Some(Self::new(major, part(2), part(3)))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// One row of the dialect rule table, as written in `rules/*.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DialectRule {
    pub name: String,
    pub description: String,
    /// Case-insensitive patterns matched against the product name
    pub product_patterns: Vec<String>,
    /// Patterns that must all match the raw version string
    #[serde(default)]
    pub version_patterns: Vec<String>,
    /// Lowest product version this rule applies to
    pub min_version: Option<String>,
    pub engine: EngineClass,
    /// Connection-string patterns that turn the engine into an in-memory one
    #[serde(default)]
    pub memory_patterns: Vec<String>,
    pub standard: SqlStandardLevel,
    #[serde(default = "default_quote")]
    pub quote_prefix: String,
    #[serde(default = "default_quote")]
    pub quote_suffix: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_marker")]
    pub parameter_marker: String,
    #[serde(default = "default_named_parameters")]
    pub named_parameters: bool,
    pub max_parameter_name_length: usize,
    pub max_parameter_count: usize,
    pub procedure_style: ProcWrappingStyle,
    #[serde(default)]
    pub session_settings: Vec<String>,
    #[serde(default)]
    pub features: DialectFeatures,
}

fn default_quote() -> String {
    "\"".to_string()
}
fn default_separator() -> String {
    ".".to_string()
}
fn default_marker() -> String {
    "@".to_string()
}
fn default_named_parameters() -> bool {
    true
}

/// Immutable syntax and capability facts for one product/version. Built
/// only from a rule or as the fallback; read through getters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectDescriptor {
    /// Rule that produced this descriptor, `"generic"` for the fallback
    rule_name: String,
    product_name: String,
    product_version: String,
    parsed_version: Option<Version>,
    standard_compliance: SqlStandardLevel,
    quote_prefix: String,
    quote_suffix: String,
    composite_separator: String,
    parameter_marker: String,
    supports_named_parameters: bool,
    max_parameter_name_length: usize,
    max_parameter_count: usize,
    procedure_style: ProcWrappingStyle,
    features: DialectFeatures,
    engine_class: EngineClass,
    session_settings: Vec<String>,
    is_fallback: bool,
}

/// Placeholder used by every positional dialect.
pub const POSITIONAL_MARKER: &str = "?";

impl DialectDescriptor {
    pub fn from_rule(rule: &DialectRule, product_name: &str, product_version: &str, engine_class: EngineClass) -> Self {
        Self {
            rule_name: rule.name.clone(),
            product_name: product_name.to_string(),
            product_version: product_version.to_string(),
            parsed_version: Version::parse(product_version),
            standard_compliance: rule.standard,
            quote_prefix: rule.quote_prefix.clone(),
            quote_suffix: rule.quote_suffix.clone(),
            composite_separator: rule.separator.clone(),
            parameter_marker: rule.parameter_marker.clone(),
            supports_named_parameters: rule.named_parameters,
            max_parameter_name_length: rule.max_parameter_name_length,
            max_parameter_count: rule.max_parameter_count,
            procedure_style: rule.procedure_style,
            features: rule.features,
            engine_class,
            session_settings: rule.session_settings.clone(),
            is_fallback: false,
        }
    }

    /// Generic SQL-92 descriptor used when no rule matches.
    pub fn fallback(product_name: &str, product_version: &str) -> Self {
        Self {
            rule_name: "generic".to_string(),
            product_name: product_name.to_string(),
            product_version: product_version.to_string(),
            parsed_version: Version::parse(product_version),
            standard_compliance: SqlStandardLevel::Sql92,
            quote_prefix: default_quote(),
            quote_suffix: default_quote(),
            composite_separator: default_separator(),
            parameter_marker: POSITIONAL_MARKER.to_string(),
            supports_named_parameters: false,
            max_parameter_name_length: 18,
            max_parameter_count: 255,
            procedure_style: ProcWrappingStyle::Call,
            features: DialectFeatures::default(),
            engine_class: EngineClass::ClientServer,
            session_settings: Vec::new(),
            is_fallback: true,
        }
    }

    /// Force `?` placeholders for providers that cannot bind by name.
    pub fn with_positional_parameters(mut self) -> Self {
        self.parameter_marker = POSITIONAL_MARKER.to_string();
        self.supports_named_parameters = false;
        self
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn product_version(&self) -> &str {
        &self.product_version
    }

    pub fn parsed_version(&self) -> Option<Version> {
        self.parsed_version
    }

    pub fn standard_compliance(&self) -> SqlStandardLevel {
        self.standard_compliance
    }

    pub fn quote_prefix(&self) -> &str {
        &self.quote_prefix
    }

    pub fn quote_suffix(&self) -> &str {
        &self.quote_suffix
    }

    pub fn composite_separator(&self) -> &str {
        &self.composite_separator
    }

    pub fn parameter_marker(&self) -> &str {
        &self.parameter_marker
    }

    pub fn supports_named_parameters(&self) -> bool {
        self.supports_named_parameters
    }

    pub fn max_parameter_name_length(&self) -> usize {
        self.max_parameter_name_length
    }

    pub fn max_parameter_count(&self) -> usize {
        self.max_parameter_count
    }

    pub fn procedure_style(&self) -> ProcWrappingStyle {
        self.procedure_style
    }

    pub fn features(&self) -> DialectFeatures {
        self.features
    }

    pub fn engine_class(&self) -> EngineClass {
        self.engine_class
    }

    /// Statements run on every freshly opened connection
    pub fn session_settings(&self) -> &[String] {
        &self.session_settings
    }

    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }
}

#[cfg(test)]
impl DialectDescriptor {
    pub(crate) fn with_limits(mut self, max_parameter_count: usize, max_parameter_name_length: usize) -> Self {
        self.max_parameter_count = max_parameter_count;
        self.max_parameter_name_length = max_parameter_name_length;
        self
    }

    pub(crate) fn with_procedure_style(mut self, style: ProcWrappingStyle) -> Self {
        self.procedure_style = style;
        self
    }

    pub(crate) fn with_engine_class(mut self, engine_class: EngineClass) -> Self {
        self.engine_class = engine_class;
        self
    }
}
