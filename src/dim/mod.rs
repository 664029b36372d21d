// Dimensional analysis and unit conversion.
// Definitions come from the embedded units.toml plus any custom units
// declared at startup; the resulting registry is immutable.

pub mod detector;
pub mod error;
pub mod parser;
pub mod registry;
pub mod types;

pub use detector::{classify_text, TextShape};
pub use error::DimError;
pub use registry::{
    DefinitionFile, PrefixSpec, RegistryBuilder, UnitRegistry, UnitSpec, UnitSummary,
};
pub use types::{BaseDimension, Dimension, RegistryId, Unit};
