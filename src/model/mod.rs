// Quantity value model: magnitude + unit, with the comparator derived
// from the unit's factor to root units.

pub mod display;
pub mod quantity;

pub use display::{display_in, format_quantity};
pub use quantity::{FieldKind, Origin, Quantity, RegistryMismatch};
