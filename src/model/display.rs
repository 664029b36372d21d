use crate::config::FieldConfig;
use crate::error::Result;
use crate::model::Quantity;
use crate::numeric;

/// Render `"<magnitude> <unit>"` for presentation. Decimal fields with
/// `display_decimal_places` are rounded with the field's rounding method;
/// the stored value is untouched.
pub fn format_quantity(quantity: &Quantity, field: &FieldConfig) -> String {
    let magnitude = match (field.kind().is_integral(), field.display_decimal_places()) {
        (false, Some(places)) => quantity
            .magnitude()
            .with_scale_round(places as i64, field.rounding_method().mode()),
        _ => quantity.effective_magnitude(),
    };
    format!(
        "{} {}",
        numeric::to_plain_string(&magnitude),
        quantity.units()
    )
}

/// Convert into one of the field's units first, then format.
pub fn display_in(quantity: &Quantity, unit: &str, field: &FieldConfig) -> Result<String> {
    let target = field.registry().resolve(unit)?;
    let converted = quantity.to_unit(&target, field.precision())?;
    Ok(format_quantity(&converted, field))
}
