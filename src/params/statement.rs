use super::ParameterBuilder;
use crate::error::ContextError;
use crate::provider::{DbParameter, DbType, DbValue, ProviderFactory};

const MAX_NAME_DRAWS: usize = 64;

/// Parameter set of one statement: unique names, bounded by the dialect's
/// maximum parameter count.
#[derive(Debug, Clone)]
pub struct StatementParameters<'d> {
    builder: ParameterBuilder<'d>,
    parameters: Vec<DbParameter>,
}

impl<'d> StatementParameters<'d> {
    pub fn new(builder: ParameterBuilder<'d>) -> Self {
        Self {
            builder,
            parameters: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DbParameter> {
        self.parameters.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Add a parameter built elsewhere.
    pub fn add(&mut self, parameter: DbParameter) -> Result<&DbParameter, ContextError> {
        if self.contains(&parameter.name) {
            return Err(ContextError::DuplicateParameter(parameter.name));
        }

        let dialect = self.builder.dialect();
        if self.parameters.len() >= dialect.max_parameter_count() {
            return Err(ContextError::TooManyParameters {
                dialect: dialect.rule_name().to_string(),
                count: self.parameters.len() + 1,
                max: dialect.max_parameter_count(),
            });
        }

        self.parameters.push(parameter);
        Ok(&self.parameters[self.parameters.len() - 1])
    }

    /// Create and add a parameter. A generated name is redrawn until it is
    /// unique within this statement, giving up after a bounded number of draws.
    pub fn create<V: Into<DbValue>>(
        &mut self,
        factory: &dyn ProviderFactory,
        name: Option<&str>,
        db_type: DbType,
        value: V,
    ) -> Result<&DbParameter, ContextError> {
        let mut parameter = self.builder.create_parameter(factory, name, db_type, value)?;
        if name.is_none_or(|n| n.trim().is_empty()) {
            let mut draws = 1;
            while self.contains(&parameter.name) {
                if draws >= MAX_NAME_DRAWS {
                    return Err(ContextError::ParameterNamesExhausted {
                        length: self.builder.generated_name_length(),
                        count: self.parameters.len(),
                    });
                }
                parameter.name = self.builder.generate_parameter_name();
                draws += 1;
            }
        }
        self.add(parameter)
    }

    pub fn into_vec(self) -> Vec<DbParameter> {
        self.parameters
    }
}
