pub mod codec;
pub mod config;
pub mod convert;
pub mod dim;
pub mod error;
pub mod field;
pub mod model;
pub mod numeric;
pub mod query;
pub mod validation;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use error::{Error, ErrorKind, Result};
pub use field::QuantityField;
pub use model::{FieldKind, Quantity};
