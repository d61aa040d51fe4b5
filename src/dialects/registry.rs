use crate::dialects::base::{DialectRule, EngineClass, Version};
use crate::error::ContextError;
use crate::model::ConfigError;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::sync::OnceLock;

/// Rule files compiled into the binary, one per product family.
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("sqlite.toml", include_str!("rules/sqlite.toml")),
    ("postgres.toml", include_str!("rules/postgres.toml")),
    ("mysql.toml", include_str!("rules/mysql.toml")),
    ("sqlserver.toml", include_str!("rules/sqlserver.toml")),
    ("oracle.toml", include_str!("rules/oracle.toml")),
    ("duckdb.toml", include_str!("rules/duckdb.toml")),
    ("firebird.toml", include_str!("rules/firebird.toml")),
];

#[derive(Debug, Deserialize)]
struct RuleFile {
    rule: Vec<DialectRule>,
}

/// A rule with its patterns compiled once.
#[derive(Debug)]
struct CompiledRule {
    rule: DialectRule,
    product: Vec<Regex>,
    version: Vec<Regex>,
    memory: Vec<Regex>,
    floor: Option<Version>,
}

impl CompiledRule {
    fn compile(rule: DialectRule) -> Result<Self, ContextError> {
        let compile_all = |patterns: &[String]| -> Result<Vec<Regex>, ContextError> {
            patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p).case_insensitive(true).build().map_err(|e| {
                        ContextError::from(ConfigError::Parse(rule.name.clone(), format!("bad pattern '{}': {}", p, e)))
                    })
                })
                .collect()
        };

        let product = compile_all(&rule.product_patterns)?;
        let version = compile_all(&rule.version_patterns)?;
        let memory = compile_all(&rule.memory_patterns)?;
        let floor = match &rule.min_version {
            Some(text) => Some(Version::parse(text).ok_or_else(|| {
                ConfigError::Parse(rule.name.clone(), format!("bad min_version '{}'", text))
            })?),
            None => None,
        };

        Ok(Self {
            rule,
            product,
            version,
            memory,
            floor,
        })
    }

    /// Specificity score when the rule applies, `None` otherwise.
    fn score(&self, product_name: &str, product_version: &str, parsed: Option<Version>) -> Option<u32> {
        if !self.product.iter().any(|re| re.is_match(product_name)) {
            return None;
        }
        let mut score = 1;

        if !self.version.is_empty() {
            if !self.version.iter().all(|re| re.is_match(product_version)) {
                return None;
            }
            score += 2;
        }

        if let Some(floor) = self.floor {
            match parsed {
                Some(v) if v >= floor => score += 1,
                _ => return None,
            }
        }

        Some(score)
    }
}

/// Outcome of a rule lookup.
#[derive(Debug, Clone)]
pub struct RuleMatch<'a> {
    pub rule: &'a DialectRule,
    pub engine_class: EngineClass,
    pub score: u32,
    /// Other rules that matched with the same score
    pub tied_with: Vec<String>,
}

/// Ordered table of dialect rules.
#[derive(Debug, Default)]
pub struct DialectRegistry {
    rules: Vec<CompiledRule>,
}

impl DialectRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Registry with all built-in rules
    pub fn builtin() -> Result<Self, ContextError> {
        let mut registry = Self::new();
        for (file, content) in BUILTIN_RULES {
            registry.load_toml(file, content)?;
        }
        Ok(registry)
    }

    /// Append every `[[rule]]` found in a TOML document.
    pub fn load_toml(&mut self, source: &str, content: &str) -> Result<(), ContextError> {
        let file: RuleFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(source.to_string(), e.to_string()))?;
        for rule in file.rule {
            self.register(rule)?;
        }
        Ok(())
    }

    pub fn register(&mut self, rule: DialectRule) -> Result<(), ContextError> {
        debug!("Registering dialect rule: {}", rule.name);
        self.rules.push(CompiledRule::compile(rule)?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DialectRule> {
        self.rules.iter().map(|c| &c.rule).find(|r| r.name == name)
    }

    /// List all registered rule names in table order
    pub fn list_dialects(&self) -> Vec<String> {
        self.rules.iter().map(|c| c.rule.name.clone()).collect()
    }

    /// Find the best rule for a product. Specificity wins, then the most
    /// recent version floor, then table order.
    pub fn find(&self, product_name: &str, product_version: &str, connection_string: &str) -> Option<RuleMatch<'_>> {
        let parsed = Version::parse(product_version);

        let mut candidates: Vec<(&CompiledRule, u32)> = self
            .rules
            .iter()
            .filter_map(|c| c.score(product_name, product_version, parsed).map(|s| (c, s)))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        // Stable sort keeps table order for full ties.
        candidates.sort_by(|(a, sa), (b, sb)| sb.cmp(sa).then_with(|| b.floor.cmp(&a.floor)));

        let (best, score) = candidates[0];
        let tied_with: Vec<String> = candidates[1..]
            .iter()
            .filter(|(c, s)| *s == score && c.floor == best.floor)
            .map(|(c, _)| c.rule.name.clone())
            .collect();
        if !tied_with.is_empty() {
            warn!(
                "Dialect rule '{}' tied with {:?} for product '{}'",
                best.rule.name, tied_with, product_name
            );
        }

        let engine_class = if best.memory.iter().any(|re| re.is_match(connection_string)) {
            EngineClass::InMemory
        } else {
            best.rule.engine
        };

        debug!(
            "Selected dialect rule: {} (score: {}, engine: {})",
            best.rule.name, score, engine_class
        );

        Some(RuleMatch {
            rule: &best.rule,
            engine_class,
            score,
            tied_with,
        })
    }
}

static BUILTIN_REGISTRY: OnceLock<DialectRegistry> = OnceLock::new();

/// Get the built-in registry (initialized lazily)
pub fn get_registry() -> &'static DialectRegistry {
    BUILTIN_REGISTRY.get_or_init(|| DialectRegistry::builtin().expect("Failed to parse built-in dialect rules"))
}
