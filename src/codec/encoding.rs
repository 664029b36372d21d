use crate::codec::record::{CompositeRecord, StoredMagnitude};
use crate::config::{CompositeLayout, FieldConfig};
use crate::error::{Error, Result};
use crate::model::{FieldKind, Quantity};
use crate::numeric;
use crate::validation;
use bigdecimal::BigDecimal;

/// A value as the database driver hands it back.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    /// Native composite value from the binary protocol.
    Record(CompositeRecord),
    /// Textual composite fallback, `(comparator,magnitude,units)`.
    Text(String),
    // Bare scalars only come out of aggregates over the comparator
    Integer(i64),
    Float(f64),
    Decimal(BigDecimal),
}

/// Unified schemas store every magnitude as decimal.
pub fn widen_for_layout(magnitude: StoredMagnitude, layout: CompositeLayout) -> StoredMagnitude {
    match layout {
        CompositeLayout::Unified => StoredMagnitude::Decimal(magnitude.widen()),
        CompositeLayout::PerKind => magnitude,
    }
}

pub fn encode(quantity: &Quantity, field: &FieldConfig) -> Result<CompositeRecord> {
    validation::validate_dimensionality(quantity, field.default_unit())?;

    let quantity = quantity.clone().with_kind(field.kind())?;
    let magnitude = StoredMagnitude::cast(quantity.magnitude(), field.kind(), field.decimal_places())?;
    // The comparator must match what decoding the stored magnitude yields
    let stored = Quantity::from_storage(magnitude.widen(), quantity.unit().clone(), field.kind())?;
    let comparator = stored.to_base(field.precision());

    let record = CompositeRecord {
        comparator,
        magnitude: widen_for_layout(magnitude, field.layout()),
        units: quantity.units().to_string(),
    };
    log::debug!("Encoded {} as {}::{}", quantity, record, field.type_name());
    Ok(record)
}

/// Null quantities map to a null column, never to a zero record.
pub fn encode_nullable(
    quantity: Option<&Quantity>,
    field: &FieldConfig,
) -> Result<Option<CompositeRecord>> {
    quantity.map(|q| encode(q, field)).transpose()
}

pub fn decode(value: &DbValue, field: &FieldConfig) -> Result<Option<Quantity>> {
    let quantity = match value {
        DbValue::Null => return Ok(None),
        DbValue::Record(record) => from_record(record, field)?,
        DbValue::Text(text) => {
            let column_kind = field.layout().column_kind(field.kind());
            from_record(&CompositeRecord::parse(text, column_kind)?, field)?
        }
        DbValue::Integer(n) => from_scalar(BigDecimal::from(*n), field)?,
        DbValue::Float(x) => {
            let value = numeric::decimal_from_f64(*x)
                .ok_or_else(|| Error::UnconvertibleInput(format!("aggregate value {}", x)))?;
            from_scalar(value, field)?
        }
        DbValue::Decimal(d) => from_scalar(d.clone(), field)?,
    };
    log::debug!("Decoded {:?} as {}", value, quantity);
    Ok(Some(quantity))
}

// The stored comparator is a cache; only magnitude and units are read.
fn from_record(record: &CompositeRecord, field: &FieldConfig) -> Result<Quantity> {
    let unit = field.registry().resolve(&record.units)?;
    Quantity::from_storage(record.magnitude.widen(), unit, field.kind())
}

/// A scalar is already in root units of the field's dimension, so it is
/// wrapped in that root unit rather than the default unit.
pub(crate) fn from_scalar(value: BigDecimal, field: &FieldConfig) -> Result<Quantity> {
    let root = field
        .registry()
        .root_unit(field.default_unit().dimension())?;
    Quantity::from_storage(value, root, FieldKind::Decimal)
}
