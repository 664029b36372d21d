use crate::dim::{RegistryId, Unit, UnitRegistry};
use crate::error::{Error, Result};
use crate::numeric;
use bigdecimal::BigDecimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Storage kind of a field's magnitude column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInteger,
    #[default]
    Decimal,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::Integer, FieldKind::BigInteger, FieldKind::Decimal];

    /// Inclusive bounds of the stored magnitude, `None` for decimals.
    pub fn bounds(self) -> Option<(i64, i64)> {
        match self {
            FieldKind::Integer => Some((i32::MIN as i64, i32::MAX as i64)),
            FieldKind::BigInteger => Some((i64::MIN, i64::MAX)),
            FieldKind::Decimal => None,
        }
    }

    pub fn is_integral(self) -> bool {
        self != FieldKind::Decimal
    }

    /// Reject magnitudes the column can never hold. Width is checked on
    /// the exponent before any rounding, so literals like `1e400000000`
    /// fail without being expanded.
    pub fn check_magnitude(self, magnitude: &BigDecimal) -> Result<()> {
        let out_of_range = |min: String, max: String| Error::OutOfRange {
            value: numeric::describe(magnitude),
            min,
            max,
        };

        let adjusted = numeric::adjusted_exponent(magnitude);
        let too_wide = adjusted >= numeric::MAX_INTEGER_DIGITS
            || numeric::scale(magnitude) > numeric::MAX_FRACTION_DIGITS;

        match self.bounds() {
            Some((min, max)) => {
                // Anything of 1e19 or more is past every integer kind
                let fits = !too_wide && adjusted < 19 && {
                    let rounded = numeric::round_half_even(magnitude);
                    rounded >= BigDecimal::from(min) && rounded <= BigDecimal::from(max)
                };
                if !fits {
                    return Err(out_of_range(min.to_string(), max.to_string()));
                }
            }
            None if too_wide => {
                return Err(out_of_range(
                    format!("-1E{}", numeric::MAX_INTEGER_DIGITS),
                    format!("1E{}", numeric::MAX_INTEGER_DIGITS),
                ));
            }
            None => {}
        }
        Ok(())
    }

    /// SQL type of the magnitude column.
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::BigInteger => "bigint",
            FieldKind::Decimal => "decimal",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Integer => "integer",
            FieldKind::BigInteger => "big_integer",
            FieldKind::Decimal => "decimal",
        };
        write!(f, "{}", name)
    }
}

/// Where a quantity came from. Precision is only enforced on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Input,
    Storage,
}

/// Non-fatal signal raised when a quantity built under another registry
/// is re-expressed under the field's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryMismatch {
    pub from: RegistryId,
    pub to: RegistryId,
}

impl fmt::Display for RegistryMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quantity was built under {} and rescaled into {}",
            self.from, self.to
        )
    }
}

/// A magnitude paired with a resolved unit.
///
/// Equality and ordering go through the comparator, the magnitude in root
/// units: `1 kilogram == 1000 gram`. Quantities of different dimensions
/// are unordered and never equal.
#[derive(Debug, Clone)]
pub struct Quantity {
    magnitude: BigDecimal,
    unit: Unit,
    kind: FieldKind,
    origin: Origin,
}

impl Quantity {
    /// Build a fresh quantity. Integral kinds must round into their bounds.
    pub fn new(magnitude: BigDecimal, unit: Unit, kind: FieldKind) -> Result<Self> {
        Self::build(magnitude, unit, kind, Origin::Input)
    }

    /// Build a quantity read back from the database.
    pub fn from_storage(magnitude: BigDecimal, unit: Unit, kind: FieldKind) -> Result<Self> {
        Self::build(magnitude, unit, kind, Origin::Storage)
    }

    fn build(magnitude: BigDecimal, unit: Unit, kind: FieldKind, origin: Origin) -> Result<Self> {
        kind.check_magnitude(&magnitude)?;
        Ok(Self {
            magnitude,
            unit,
            kind,
            origin,
        })
    }

    pub fn magnitude(&self) -> &BigDecimal {
        &self.magnitude
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn units(&self) -> &str {
        self.unit.name()
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_from_storage(&self) -> bool {
        self.origin == Origin::Storage
    }

    /// Same value, re-checked against another kind's bounds.
    pub fn with_kind(self, kind: FieldKind) -> Result<Self> {
        if kind == self.kind {
            return Ok(self);
        }
        Self::build(self.magnitude, self.unit, kind, self.origin)
    }

    /// The magnitude as the column will hold it: integral kinds round
    /// half to even.
    pub fn effective_magnitude(&self) -> BigDecimal {
        if self.kind.is_integral() {
            numeric::round_half_even(&self.magnitude)
        } else {
            self.magnitude.clone()
        }
    }

    fn exact_comparator(&self) -> BigDecimal {
        self.effective_magnitude() * self.unit.factor()
    }

    /// The comparator: magnitude in the root units of its dimension,
    /// rounded to `precision` significant digits.
    pub fn to_base(&self, precision: u64) -> BigDecimal {
        numeric::trim(&numeric::round_to_precision(
            &self.exact_comparator(),
            precision,
        ))
    }

    pub fn is_compatible(&self, other: &Quantity) -> bool {
        self.unit.is_compatible(&other.unit)
    }

    /// Convert into another unit of the same dimension.
    pub fn to_unit(&self, target: &Unit, precision: u64) -> Result<Quantity> {
        let magnitude = self.convert_magnitude(target, precision)?;
        Self::build(magnitude, target.clone(), self.kind, Origin::Input)
    }

    fn convert_magnitude(&self, target: &Unit, precision: u64) -> Result<BigDecimal> {
        if !self.unit.is_compatible(target) {
            return Err(Error::IncompatibleDimension {
                from: self.unit.name().to_string(),
                from_dimension: self.unit.dimension().to_string(),
                to: target.name().to_string(),
                to_dimension: target.dimension().to_string(),
            });
        }
        if self.unit.factor() == target.factor() {
            return Ok(self.magnitude.clone());
        }
        let converted = (&self.magnitude * self.unit.factor()) / target.factor();
        Ok(numeric::round_to_precision(&converted, precision))
    }

    /// Sum in the left operand's unit.
    pub fn checked_add(&self, other: &Quantity, precision: u64) -> Result<Quantity> {
        let rhs = other.convert_magnitude(&self.unit, precision)?;
        let sum = numeric::round_to_precision(&(&self.magnitude + rhs), precision);
        Self::build(sum, self.unit.clone(), self.kind, Origin::Input)
    }

    /// Difference in the left operand's unit.
    pub fn checked_sub(&self, other: &Quantity, precision: u64) -> Result<Quantity> {
        let rhs = other.convert_magnitude(&self.unit, precision)?;
        let difference = numeric::round_to_precision(&(&self.magnitude - rhs), precision);
        Self::build(difference, self.unit.clone(), self.kind, Origin::Input)
    }

    pub fn scale(&self, factor: &BigDecimal) -> Result<Quantity> {
        Self::build(
            &self.magnitude * factor,
            self.unit.clone(),
            self.kind,
            Origin::Input,
        )
    }

    /// The dict form `{"magnitude", "units"}` handed to serializers and
    /// accepted back by the converter.
    pub fn to_native(&self) -> serde_json::Value {
        serde_json::json!({
            "magnitude": numeric::to_plain_string(&self.magnitude),
            "units": self.unit.name(),
        })
    }

    /// Re-express under `registry` by resolving the unit name there.
    /// Quantities already under `registry` come back unchanged.
    pub fn rescale_registry(
        &self,
        registry: &UnitRegistry,
    ) -> Result<(Quantity, Option<RegistryMismatch>)> {
        if self.unit.registry_id() == registry.id() {
            return Ok((self.clone(), None));
        }

        let mismatch = RegistryMismatch {
            from: self.unit.registry_id(),
            to: registry.id(),
        };
        log::warn!("{}: {} {}", mismatch, self.magnitude, self.unit);

        let unit = registry.resolve(self.unit.name())?;
        let rescaled = Self::build(self.magnitude.clone(), unit, self.kind, self.origin)?;
        Ok((rescaled, Some(mismatch)))
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.is_compatible(other) && self.exact_comparator() == other.exact_comparator()
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.is_compatible(other) {
            return None;
        }
        self.exact_comparator().partial_cmp(&other.exact_comparator())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            numeric::to_plain_string(&self.magnitude),
            self.unit
        )
    }
}

/// Serialises to the dict shape the converter accepts back:
/// `{"magnitude": "<plain decimal>", "units": "<unit>"}`.
impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("magnitude", &numeric::to_plain_string(&self.magnitude))?;
        map.serialize_entry("units", self.unit.name())?;
        map.end()
    }
}
