pub mod aggregate;
pub mod lookup;

pub use aggregate::{Aggregate, AggregateValue};
pub use lookup::{lookup_table, translate_lookup, ColumnRef, CompiledLookup, LookupRhs, LookupTable};
