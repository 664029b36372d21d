use crate::dim::{PrefixSpec, RegistryBuilder, UnitRegistry, UnitSpec};
use crate::error::{Error, Result};
use crate::numeric::DEFAULT_PRECISION;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // Significant digits of the decimal context
    #[serde(default = "default_precision")]
    pub precision: u64,

    #[serde(default)]
    pub registry: RegistrySettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistrySettings {
    // Start from the embedded definitions before adding custom ones
    #[serde(default = "default_true")]
    pub include_builtin: bool,

    #[serde(default)]
    pub prefixes: Vec<PrefixSpec>,

    #[serde(default)]
    pub units: Vec<UnitSpec>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            include_builtin: true,
            prefixes: Vec::new(),
            units: Vec::new(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            registry: RegistrySettings::default(),
        }
    }
}

fn default_precision() -> u64 {
    DEFAULT_PRECISION
}

fn default_true() -> bool {
    true
}

impl Settings {
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    pub fn load_from_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Build the registry and freeze it together with the precision.
    pub fn build_context(&self) -> Result<QuantityContext> {
        if self.precision == 0 {
            return Err(Error::Config("precision must be at least 1".to_string()));
        }

        let mut builder = if self.registry.include_builtin {
            RegistryBuilder::with_builtin()?
        } else {
            RegistryBuilder::new()
        };
        for prefix in &self.registry.prefixes {
            builder.define_prefix(prefix)?;
        }
        for unit in &self.registry.units {
            builder.define(unit)?;
        }

        Ok(QuantityContext::new(Arc::new(builder.build()), self.precision))
    }
}

/// The frozen registry and decimal precision every operation runs under.
/// Cheap to clone; fields share one registry.
#[derive(Debug, Clone)]
pub struct QuantityContext {
    registry: Arc<UnitRegistry>,
    precision: u64,
}

impl QuantityContext {
    pub fn new(registry: Arc<UnitRegistry>, precision: u64) -> Self {
        Self {
            registry,
            precision,
        }
    }

    /// Builtin registry at the default precision.
    pub fn builtin() -> Result<Self> {
        Settings::default().build_context()
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn shared_registry(&self) -> Arc<UnitRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn precision(&self) -> u64 {
        self.precision
    }

    pub fn with_precision(&self, precision: u64) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            precision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load_from_str("").unwrap();
        assert_eq!(settings.precision, 28);
        assert!(settings.registry.include_builtin);

        let context = settings.build_context().unwrap();
        assert_eq!(context.precision(), 28);
        assert!(context.registry().contains("kilogram"));
    }

    #[test]
    fn test_custom_units_from_toml() {
        let settings = Settings::load_from_str(
            r#"
precision = 34

[[registry.units]]
name = "smoot"
definition = "1.7018 meter"
aliases = ["smoots"]
"#,
        )
        .unwrap();

        let context = settings.build_context().unwrap();
        assert_eq!(context.precision(), 34);
        let smoot = context.registry().resolve("smoot").unwrap();
        assert!(smoot.is_compatible(&context.registry().resolve("foot").unwrap()));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            Settings::load_from_str("precision = \"many\""),
            Err(Error::Config(_))
        ));

        let settings = Settings::load_from_str(
            r#"
[[registry.units]]
name = "gram"
definition = "2 gram"
"#,
        )
        .unwrap();
        assert!(matches!(settings.build_context(), Err(Error::Config(_))));

        let settings = Settings {
            precision: 0,
            ..Settings::default()
        };
        assert!(settings.build_context().is_err());
    }

    #[test]
    fn test_without_builtin_units() {
        let settings = Settings::load_from_str(
            r#"
[registry]
include_builtin = false

[[registry.units]]
name = "widget"
dimension = "substance"
"#,
        )
        .unwrap();
        let context = settings.build_context().unwrap();
        assert!(context.registry().contains("widget"));
        assert!(!context.registry().contains("gram"));
    }
}
