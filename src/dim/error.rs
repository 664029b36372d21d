use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DimError {
    #[error("Unknown unit: '{0}'")]
    UnknownUnit(String),

    #[error("Cannot convert from '{from}' ({from_dimension}) to '{to}' ({to_dimension})")]
    IncompatibleDimension {
        from: String,
        from_dimension: String,
        to: String,
        to_dimension: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid definition for '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },
}
