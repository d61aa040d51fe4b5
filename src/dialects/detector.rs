use crate::dialects::base::DialectDescriptor;
use crate::dialects::registry::{get_registry, DialectRegistry};
use crate::error::ConnectionError;
use crate::provider::{DbConnection, ParameterStyle, ProviderFactory, ServerInfo};
use log::{debug, info, warn};

/// Result of dialect detection
#[derive(Debug, Clone)]
pub struct Detection {
    pub descriptor: DialectDescriptor,
    /// Set when detection fell back or had to break a tie
    pub degraded: Option<String>,
}

/// Turns connection metadata into a [`DialectDescriptor`].
pub struct DialectDetector<'r> {
    registry: &'r DialectRegistry,
}

impl DialectDetector<'static> {
    pub fn new() -> Self {
        Self {
            registry: get_registry(),
        }
    }
}

impl Default for DialectDetector<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> DialectDetector<'r> {
    pub fn with_registry(registry: &'r DialectRegistry) -> Self {
        Self { registry }
    }

    /// Detect the dialect behind a live connection. Only connectivity
    /// failures are errors; an unknown product yields the fallback.
    pub fn detect(&self, connection: &dyn DbConnection, factory: &dyn ProviderFactory) -> Result<Detection, ConnectionError> {
        if !connection.is_open() {
            debug!("Opening connection for dialect detection");
            connection.open()?;
        }

        let info = connection.server_info()?;
        Ok(self.describe(&info, connection.connection_string(), factory.parameter_style()))
    }

    /// Pure lookup from product metadata to a descriptor.
    pub fn describe(&self, info: &ServerInfo, connection_string: &str, style: ParameterStyle) -> Detection {
        let product = info.product_name.trim();
        let version = info.product_version.trim();

        let (descriptor, degraded) = match self.registry.find(product, version, connection_string) {
            Some(found) => {
                info!("Detected dialect '{}' for {} {}", found.rule.name, product, version);
                let degraded = (!found.tied_with.is_empty()).then(|| {
                    format!(
                        "rule '{}' tied with {:?}; kept the first in table order",
                        found.rule.name, found.tied_with
                    )
                });
                (
                    DialectDescriptor::from_rule(found.rule, product, version, found.engine_class),
                    degraded,
                )
            }
            None => {
                warn!(
                    "No dialect rule matches product '{}' version '{}'; using generic SQL-92",
                    product, version
                );
                (
                    DialectDescriptor::fallback(product, version),
                    Some(format!("unrecognized product '{}' version '{}'", product, version)),
                )
            }
        };

        let descriptor = match style {
            ParameterStyle::Positional if descriptor.supports_named_parameters() => {
                debug!("Provider binds positionally; overriding marker '{}'", descriptor.parameter_marker());
                descriptor.with_positional_parameters()
            }
            _ => descriptor,
        };

        Detection { descriptor, degraded }
    }
}
