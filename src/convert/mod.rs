// Quantity converter: raw input shapes -> Quantity

pub mod converter;
pub mod input;

pub use converter::{convert, convert_detailed, Converted};
pub use input::RawInput;

#[cfg(test)]
mod tests;
