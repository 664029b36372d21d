//! Error taxonomy shared by every stage of the quantity pipeline.

use crate::dim::DimError;
use thiserror::Error;

/// Errors raised while converting, validating, encoding, decoding or
/// translating quantity values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown unit: '{0}'")]
    UnknownUnit(String),

    #[error("Cannot convert from '{from}' ({from_dimension}) to '{to}' ({to_dimension})")]
    IncompatibleDimension {
        from: String,
        from_dimension: String,
        to: String,
        to_dimension: String,
    },

    #[error("This field cannot be null")]
    NullNotAllowed,

    #[error("This field cannot be blank")]
    BlankNotAllowed,

    #[error("Value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        value: String,
        min: String,
        max: String,
    },

    #[error("Magnitude {value} has {digits} digits, more than the allowed precision of {precision}")]
    PrecisionExceeded {
        value: String,
        digits: u64,
        precision: u64,
    },

    #[error("Cannot convert {0} to a quantity")]
    UnconvertibleInput(String),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Malformed composite value '{text}': {reason}")]
    CompositeParseError { text: String, reason: String },

    #[error("Lookup '{0}' is not supported for quantity fields")]
    UnsupportedLookup(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Payload-free discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownUnit,
    IncompatibleDimension,
    NullNotAllowed,
    BlankNotAllowed,
    OutOfRange,
    PrecisionExceeded,
    UnconvertibleInput,
    MissingField,
    CompositeParseError,
    UnsupportedLookup,
    Config,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownUnit(_) => ErrorKind::UnknownUnit,
            Error::IncompatibleDimension { .. } => ErrorKind::IncompatibleDimension,
            Error::NullNotAllowed => ErrorKind::NullNotAllowed,
            Error::BlankNotAllowed => ErrorKind::BlankNotAllowed,
            Error::OutOfRange { .. } => ErrorKind::OutOfRange,
            Error::PrecisionExceeded { .. } => ErrorKind::PrecisionExceeded,
            Error::UnconvertibleInput(_) => ErrorKind::UnconvertibleInput,
            Error::MissingField(_) => ErrorKind::MissingField,
            Error::CompositeParseError { .. } => ErrorKind::CompositeParseError,
            Error::UnsupportedLookup(_) => ErrorKind::UnsupportedLookup,
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn composite(text: &str, reason: impl Into<String>) -> Self {
        Error::CompositeParseError {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<DimError> for Error {
    fn from(e: DimError) -> Self {
        match e {
            DimError::UnknownUnit(token) => Error::UnknownUnit(token),
            DimError::IncompatibleDimension {
                from,
                from_dimension,
                to,
                to_dimension,
            } => Error::IncompatibleDimension {
                from,
                from_dimension,
                to,
                to_dimension,
            },
            DimError::Parse(msg) => Error::UnconvertibleInput(msg),
            DimError::InvalidDefinition { name, reason } => {
                Error::Config(format!("invalid definition for '{}': {}", name, reason))
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dim_errors_map_onto_taxonomy() {
        let err: Error = DimError::UnknownUnit("furlongs".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::UnknownUnit);
        assert_eq!(err.to_string(), "Unknown unit: 'furlongs'");

        let err: Error = DimError::Parse("unexpected ')'".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);
    }
}
