// Composite codec: Quantity <-> (comparator, magnitude, units)

pub mod connection;
pub mod encoding;
pub mod record;

pub use connection::{create_all_types_sql, create_type_sql, CompositeRegistrar, ConnectionTypes};
pub use encoding::{decode, encode, encode_nullable, widen_for_layout, DbValue};
pub use record::{CompositeRecord, SqlParam, StoredMagnitude};

#[cfg(test)]
mod tests;
