//! Normalises every accepted input shape into a [`Quantity`].
//!
//! Input is first classified into a [`Shape`]; each shape has its own
//! conversion function. Every path resolves its unit and passes the
//! field's dimension gate before the magnitude is bounded for the kind.

use crate::codec::CompositeRecord;
use crate::config::FieldConfig;
use crate::convert::input::RawInput;
use crate::dim::{classify_text, TextShape, Unit};
use crate::error::{Error, Result};
use crate::model::{FieldKind, Quantity, RegistryMismatch};
use crate::numeric;
use crate::validation;
use bigdecimal::BigDecimal;

/// A converted value plus the non-fatal registry signal, if any.
#[derive(Debug, Clone)]
pub struct Converted {
    pub quantity: Quantity,
    pub warning: Option<RegistryMismatch>,
}

#[derive(Debug)]
enum Shape<'a> {
    Empty,
    Native(&'a Quantity),
    Dict(&'a [(String, RawInput)]),
    Pair {
        magnitude: &'a RawInput,
        units: &'a RawInput,
    },
    // The leading comparator is never trusted
    Triple {
        magnitude: &'a RawInput,
        units: &'a RawInput,
    },
    CompositeText(&'a str),
    NumericText(BigDecimal),
    Expression(&'a str),
    Numeric(BigDecimal),
    Unconvertible(&'a RawInput),
}

fn classify(raw: &RawInput) -> Shape<'_> {
    if raw.is_empty() {
        return Shape::Empty;
    }
    match raw {
        RawInput::Quantity(q) => Shape::Native(q),
        RawInput::Map(entries) => Shape::Dict(entries),
        RawInput::Sequence(items) => match items.as_slice() {
            [magnitude, units] => Shape::Pair { magnitude, units },
            [_, magnitude, units] => Shape::Triple { magnitude, units },
            _ => Shape::Unconvertible(raw),
        },
        RawInput::Text(text) => match classify_text(text) {
            TextShape::Blank => Shape::Empty,
            TextShape::Composite => Shape::CompositeText(text),
            TextShape::Number => match numeric::parse_decimal(text) {
                Some(value) => Shape::NumericText(value),
                None => Shape::Unconvertible(raw),
            },
            TextShape::Expression => Shape::Expression(text),
        },
        RawInput::Integer(_) | RawInput::Float(_) | RawInput::Decimal(_) => {
            match raw.as_decimal() {
                Some(value) => Shape::Numeric(value),
                None => Shape::Unconvertible(raw),
            }
        }
        RawInput::Null | RawInput::Bool(_) => Shape::Unconvertible(raw),
    }
}

/// Convert raw input for `field`. Empty input yields `None`.
pub fn convert(raw: &RawInput, field: &FieldConfig) -> Result<Option<Quantity>> {
    Ok(convert_detailed(raw, field)?.map(|c| c.quantity))
}

/// Like [`convert`], also returning the registry mismatch signal.
pub fn convert_detailed(raw: &RawInput, field: &FieldConfig) -> Result<Option<Converted>> {
    let shape = classify(raw);
    log::debug!("Converting {} input as {:?}", raw.type_name(), shape);

    let (quantity, warning) = match shape {
        Shape::Empty => return Ok(None),
        Shape::Native(q) => from_native(q, field)?,
        Shape::Dict(entries) => (from_dict(entries, field)?, None),
        Shape::Pair { magnitude, units } | Shape::Triple { magnitude, units } => {
            (from_parts(magnitude, units, field)?, None)
        }
        Shape::CompositeText(text) => (from_composite_text(text, field)?, None),
        Shape::NumericText(value) | Shape::Numeric(value) => {
            (from_magnitude(value, field)?, None)
        }
        Shape::Expression(text) => (from_expression(text, field)?, None),
        Shape::Unconvertible(raw) => {
            return Err(Error::UnconvertibleInput(format!(
                "{} value {}",
                raw.type_name(),
                raw
            )))
        }
    };

    Ok(Some(Converted { quantity, warning }))
}

fn construct(magnitude: BigDecimal, unit: Unit, field: &FieldConfig) -> Result<Quantity> {
    validation::validate_unit_dimensionality(&unit, field.default_unit())?;
    Quantity::new(magnitude, unit, field.kind())
}

fn from_native(
    quantity: &Quantity,
    field: &FieldConfig,
) -> Result<(Quantity, Option<RegistryMismatch>)> {
    let (rescaled, warning) = quantity.rescale_registry(field.registry())?;
    validation::validate_dimensionality(&rescaled, field.default_unit())?;
    Ok((rescaled.with_kind(field.kind())?, warning))
}

fn from_dict(entries: &[(String, RawInput)], field: &FieldConfig) -> Result<Quantity> {
    if let Some((key, _)) = entries
        .iter()
        .find(|(k, _)| k != "magnitude" && k != "units")
    {
        return Err(Error::UnconvertibleInput(format!(
            "dict with unexpected key '{}'",
            key
        )));
    }

    let lookup = |key: &'static str| {
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or(Error::MissingField(key))
    };
    let magnitude = lookup("magnitude")?;
    let units = lookup("units")?;
    from_parts(magnitude, units, field)
}

fn from_parts(magnitude: &RawInput, units: &RawInput, field: &FieldConfig) -> Result<Quantity> {
    let magnitude = magnitude
        .as_decimal()
        .ok_or_else(|| Error::UnconvertibleInput(format!("magnitude {}", magnitude)))?;
    let unit = match units {
        RawInput::Text(name) => field.registry().resolve(name.trim())?,
        other => {
            return Err(Error::UnconvertibleInput(format!(
                "units must be a string, got {}",
                other.type_name()
            )))
        }
    };
    construct(magnitude, unit, field)
}

fn from_composite_text(text: &str, field: &FieldConfig) -> Result<Quantity> {
    let record = CompositeRecord::parse(text, FieldKind::Decimal)?;
    let unit = field.registry().resolve(&record.units)?;
    construct(record.magnitude.widen(), unit, field)
}

fn from_magnitude(value: BigDecimal, field: &FieldConfig) -> Result<Quantity> {
    construct(value, field.default_unit().clone(), field)
}

fn from_expression(text: &str, field: &FieldConfig) -> Result<Quantity> {
    let (magnitude, unit) = field.registry().parse_expression(text)?;
    construct(magnitude, unit, field)
}
