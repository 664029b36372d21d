//! Configuration: the process-wide context (registry + decimal precision)
//! and per-column field configuration.
//!
//! Every operation takes its configuration explicitly. The global context
//! below only exists for front-ends that have no other place to keep it;
//! it is installed at most once and never mutated afterwards.

pub mod field;
pub mod settings;

pub use field::{CompositeLayout, FieldConfig, FieldSpec, RoundingMethod, UnitChoice};
pub use settings::{QuantityContext, RegistrySettings, Settings};

use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

static CONTEXT: OnceCell<QuantityContext> = OnceCell::new();

/// Install the process-wide context. Fails if one is already in place.
pub fn init(context: QuantityContext) -> Result<()> {
    CONTEXT
        .set(context)
        .map_err(|_| Error::Config("quantity context is already initialised".to_string()))?;
    log::debug!("Installed process-wide quantity context");
    Ok(())
}

/// The process-wide context, falling back to the builtin registry at the
/// default precision if `init` was never called.
pub fn context() -> Result<&'static QuantityContext> {
    CONTEXT.get_or_try_init(QuantityContext::builtin)
}

/// A settings file that may also declare a single field, as used by the
/// command line and wasm front-ends.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub field: Option<FieldSpec>,
}

impl ConfigFile {
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    pub fn load_from_str(content: &str) -> Result<Self> {
        let config: ConfigFile = toml::from_str(content)?;
        Ok(config)
    }
}
