//! Identifier quoting and parameter construction on top of a dialect.

mod statement;

pub use statement::StatementParameters;

use log::debug;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::dialects::{DialectDescriptor, POSITIONAL_MARKER};
use crate::error::ContextError;
use crate::provider::{DbParameter, DbType, DbValue, ProviderFactory};

/// Length of generated parameter names before the dialect bound is applied.
pub const DEFAULT_GENERATED_NAME_LENGTH: usize = 8;

/// Shortest configurable length for generated names.
pub const MIN_GENERATED_NAME_LENGTH: usize = 4;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy)]
pub struct ParameterBuilder<'d> {
    dialect: &'d DialectDescriptor,
    name_length: usize,
}

impl<'d> ParameterBuilder<'d> {
    pub fn new(dialect: &'d DialectDescriptor) -> Self {
        Self {
            dialect,
            name_length: DEFAULT_GENERATED_NAME_LENGTH,
        }
    }

    /// Preferred length for generated names; still clipped to the dialect.
    pub fn with_name_length(mut self, length: usize) -> Self {
        self.name_length = length;
        self
    }

    pub fn dialect(&self) -> &'d DialectDescriptor {
        self.dialect
    }

    /// Quote a possibly composite identifier. Existing quotes are stripped
    /// first, so applying this twice gives the same result as once.
    pub fn wrap_object_name(&self, name: &str) -> String {
        let prefix = self.dialect.quote_prefix();
        let suffix = self.dialect.quote_suffix();
        let separator = self.dialect.composite_separator();

        let stripped = name.replace(prefix, "").replace(suffix, "");
        if stripped.trim().is_empty() {
            return String::new();
        }

        stripped
            .split(separator)
            .map(|segment| format!("{}{}{}", prefix, segment.trim(), suffix))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Marker-prefixed name for named dialects, the positional placeholder
    /// otherwise. The name is not echoed back for positional dialects.
    pub fn make_parameter_name(&self, name: &str) -> String {
        if !self.dialect.supports_named_parameters() {
            return POSITIONAL_MARKER.to_string();
        }

        let marker = self.dialect.parameter_marker();
        if name.starts_with(marker) {
            name.to_string()
        } else {
            format!("{}{}", marker, name)
        }
    }

    /// Render the reference for an existing parameter.
    pub fn make_parameter_name_for(&self, parameter: &DbParameter) -> String {
        self.make_parameter_name(&parameter.name)
    }

    /// Effective length of generated names after the dialect bound.
    pub fn generated_name_length(&self) -> usize {
        self.name_length.min(self.dialect.max_parameter_name_length()).max(1)
    }

    /// Random name starting with a letter, bounded by the dialect's
    /// maximum parameter name length.
    pub fn generate_parameter_name(&self) -> String {
        let length = self.generated_name_length();

        let mut rng = rand::thread_rng();
        let mut name = String::with_capacity(length);
        name.push(char::from(LETTERS[rng.gen_range(0..LETTERS.len())]));
        name.extend((1..length).map(|_| char::from(rng.sample(Alphanumeric))));
        name
    }

    /// Build a provider parameter. Null-like values become database NULL and
    /// carry no size; variable-length text gets `size = max(chars, 1)`.
    pub fn create_parameter<V: Into<DbValue>>(
        &self,
        factory: &dyn ProviderFactory,
        name: Option<&str>,
        db_type: DbType,
        value: V,
    ) -> Result<DbParameter, ContextError> {
        let mut parameter = factory.create_parameter().ok_or_else(|| {
            ContextError::ParameterConstruction(format!(
                "provider '{}' returned no parameter object",
                factory.provider_name()
            ))
        })?;

        parameter.name = match name.map(str::trim) {
            Some(given) if !given.is_empty() => given.to_string(),
            _ => self.generate_parameter_name(),
        };
        parameter.db_type = db_type;
        parameter.size = None;

        let value = value.into();
        if value.is_null_like() {
            parameter.value = DbValue::Null;
        } else {
            if db_type.is_variable_text() {
                if let DbValue::Text(text) = &value {
                    parameter.size = Some(text.chars().count().max(1));
                }
            }
            parameter.value = value;
        }

        debug!("Created parameter '{}' ({:?})", parameter.name, parameter.db_type);
        Ok(parameter)
    }
}
