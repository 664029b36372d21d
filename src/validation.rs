//! Field validation. Checks run in a fixed order, each one assuming the
//! previous ones passed:
//!
//! 1. required / blank
//! 2. unit choices (at configuration time)
//! 3. dimensionality
//! 4. value range
//! 5. decimal precision (new values only)

use crate::config::{FieldConfig, UnitChoice};
use crate::convert::{self, RawInput};
use crate::dim::{DimError, Unit, UnitRegistry};
use crate::error::{Error, Result};
use crate::model::Quantity;
use crate::numeric;
use bigdecimal::BigDecimal;

pub fn validate_required_value(value: &RawInput, required: bool, blank: bool) -> Result<()> {
    if value.is_null() {
        if required {
            return Err(Error::NullNotAllowed);
        }
    } else if value.is_empty() && !blank {
        return Err(Error::BlankNotAllowed);
    }
    Ok(())
}

/// Normalise declared choices to `(display, value)` pairs with the default
/// unit first. Every unit must resolve and share the default unit's
/// dimension.
pub fn validate_unit_choices(
    raw_choices: &[UnitChoice],
    default_unit: &str,
    registry: &UnitRegistry,
) -> Result<Vec<(String, String)>> {
    let default = registry.resolve(default_unit)?;

    let mut choices: Vec<(String, String)> = Vec::with_capacity(raw_choices.len() + 1);
    choices.push((default_unit.to_string(), default_unit.to_string()));

    for choice in raw_choices {
        let (display, value) = match choice {
            UnitChoice::Name(name) => (name.clone(), name.clone()),
            UnitChoice::Pair(display, value) => (display.clone(), value.clone()),
        };

        let unit = registry.resolve(&value).map_err(|e| match e {
            DimError::UnknownUnit(_) => Error::UnknownUnit(value.clone()),
            other => Error::from(other),
        })?;
        check_dimension(&unit, &default)?;

        if value == default_unit {
            // Keep a custom label for the default, but never a second entry
            choices[0].0 = display;
        } else if !choices.iter().any(|(_, v)| *v == value) {
            choices.push((display, value));
        }
    }

    Ok(choices)
}

fn check_dimension(unit: &Unit, expected: &Unit) -> Result<()> {
    if unit.is_compatible(expected) {
        Ok(())
    } else {
        Err(Error::IncompatibleDimension {
            from: unit.name().to_string(),
            from_dimension: unit.dimension().to_string(),
            to: expected.name().to_string(),
            to_dimension: expected.dimension().to_string(),
        })
    }
}

pub fn validate_dimensionality(quantity: &Quantity, default_unit: &Unit) -> Result<()> {
    validate_unit_dimensionality(quantity.unit(), default_unit)
}

/// Check 3 on a bare unit, so it can run before the magnitude is bounded.
pub fn validate_unit_dimensionality(unit: &Unit, default_unit: &Unit) -> Result<()> {
    check_dimension(unit, default_unit)
}

/// Inclusive range check; either bound may be open.
pub fn validate_value_range(
    magnitude: &BigDecimal,
    min: Option<&BigDecimal>,
    max: Option<&BigDecimal>,
) -> Result<()> {
    let below = min.map_or(false, |min| magnitude < min);
    let above = max.map_or(false, |max| magnitude > max);
    if below || above {
        let bound = |b: Option<&BigDecimal>| b.map_or("unbounded".to_string(), numeric::to_plain_string);
        return Err(Error::OutOfRange {
            value: numeric::to_plain_string(magnitude),
            min: bound(min),
            max: bound(max),
        });
    }
    Ok(())
}

/// Write-time precision gate. Values loaded from storage are trusted.
pub fn validate_decimal_precision(
    quantity: &Quantity,
    precision: u64,
    allow_rounding: bool,
) -> Result<()> {
    if quantity.is_from_storage() || allow_rounding {
        return Ok(());
    }

    let digits = numeric::significant_digits(quantity.magnitude());
    if digits > precision {
        return Err(Error::PrecisionExceeded {
            value: numeric::to_plain_string(quantity.magnitude()),
            digits,
            precision,
        });
    }
    Ok(())
}

/// Checks 3 to 5 for a converted quantity.
pub fn validate(quantity: &Quantity, field: &FieldConfig) -> Result<()> {
    validate_dimensionality(quantity, field.default_unit())?;

    if let Some((min, max)) = field.kind().bounds() {
        validate_value_range(
            &quantity.effective_magnitude(),
            Some(&BigDecimal::from(min)),
            Some(&BigDecimal::from(max)),
        )?;
    }
    if field.min_value().is_some() || field.max_value().is_some() {
        let in_default = quantity.to_unit(field.default_unit(), field.precision())?;
        validate_value_range(in_default.magnitude(), field.min_value(), field.max_value())?;
    }

    validate_decimal_precision(quantity, field.precision(), field.allow_rounding())
}

/// The full input pipeline: required check, conversion, validation.
/// With `allow_rounding`, over-long magnitudes are rounded to the context
/// precision instead of rejected.
pub fn clean(raw: &RawInput, field: &FieldConfig) -> Result<Option<Quantity>> {
    validate_required_value(raw, field.required(), field.blank())?;

    let quantity = match convert::convert(raw, field)? {
        Some(q) => q,
        None => return Ok(None),
    };
    validate(&quantity, field)?;

    if field.allow_rounding()
        && !quantity.is_from_storage()
        && numeric::significant_digits(quantity.magnitude()) > field.precision()
    {
        let rounded = numeric::round_to_precision(quantity.magnitude(), field.precision());
        let rounded = Quantity::new(rounded, quantity.unit().clone(), quantity.kind())?;
        return Ok(Some(rounded));
    }
    Ok(Some(quantity))
}
