use super::*;
use crate::config::{CompositeLayout, FieldConfig, FieldSpec, QuantityContext};
use crate::convert::{convert, RawInput};
use crate::error::{Error, ErrorKind, Result};
use crate::model::{FieldKind, Quantity};
use bigdecimal::BigDecimal;
use proptest::prelude::*;
use std::str::FromStr;

fn field(default_unit: &str, kind: FieldKind) -> FieldConfig {
    FieldConfig::new(
        &FieldSpec::new(default_unit, kind),
        &QuantityContext::builtin().unwrap(),
    )
    .unwrap()
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn quantity(field: &FieldConfig, magnitude: &str, unit: &str) -> Quantity {
    Quantity::new(
        dec(magnitude),
        field.registry().resolve(unit).unwrap(),
        field.kind(),
    )
    .unwrap()
}

#[test]
fn test_basic_persistence() {
    let field = field("gram", FieldKind::Integer);
    let q = quantity(&field, "100", "gram");

    let record = encode(&q, &field).unwrap();
    assert_eq!(record.comparator, dec("100"));
    assert_eq!(record.magnitude, StoredMagnitude::Integer(100));
    assert_eq!(record.units, "gram");
    assert_eq!(record.to_text(), "(100,100,gram)");

    let decoded = decode(&DbValue::Record(record.clone()), &field)
        .unwrap()
        .unwrap();
    assert_eq!(decoded, q);
    assert_eq!(*decoded.magnitude(), dec("100"));
    assert_eq!(decoded.units(), "gram");
    assert!(decoded.is_from_storage());

    let from_text = decode(&DbValue::Text(record.to_text()), &field)
        .unwrap()
        .unwrap();
    assert_eq!(from_text, q);
}

#[test]
fn test_encode_rejects_other_dimensions() {
    let field = field("gram", FieldKind::Integer);
    let meters = Quantity::new(
        dec("100"),
        field.registry().resolve("meter").unwrap(),
        FieldKind::Integer,
    )
    .unwrap();
    let err = encode(&meters, &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleDimension);
}

#[test]
fn test_encode_rounds_integer_magnitudes() {
    let field = field("meter", FieldKind::Integer);
    let q = convert(&RawInput::Sequence(vec![2.7.into(), "kilometer".into()]), &field)
        .unwrap()
        .unwrap();
    let record = encode(&q, &field).unwrap();
    assert_eq!(record.comparator, dec("3000"));
    assert_eq!(record.magnitude, StoredMagnitude::Integer(3));
    assert_eq!(record.units, "kilometer");
}

#[test]
fn test_encode_rechecks_native_kind_bounds() {
    let field = field("gram", FieldKind::Integer);
    let big = Quantity::new(
        dec("5000000000"),
        field.registry().resolve("gram").unwrap(),
        FieldKind::BigInteger,
    )
    .unwrap();
    assert_eq!(encode(&big, &field).unwrap_err().kind(), ErrorKind::OutOfRange);
}

#[test]
fn test_decimal_places_quantize() {
    let mut spec = FieldSpec::new("gram", FieldKind::Decimal);
    spec.decimal_places = Some(2);
    let field = FieldConfig::new(&spec, &QuantityContext::builtin().unwrap()).unwrap();

    let q = quantity(&field, "1.005", "kilogram");
    let record = encode(&q, &field).unwrap();
    assert_eq!(record.magnitude, StoredMagnitude::Decimal(dec("1.00")));
    assert_eq!(record.comparator, dec("1000"));

    // Reading the row back yields the comparator that was stored
    let decoded = decode(&DbValue::Record(record.clone()), &field)
        .unwrap()
        .unwrap();
    assert_eq!(decoded.to_base(field.precision()), record.comparator);

    let one_kg = quantity(&field, "1", "kilogram");
    assert_eq!(encode(&one_kg, &field).unwrap().comparator, record.comparator);
}

#[test]
fn test_unified_layout_widens() {
    let mut spec = FieldSpec::new("gram", FieldKind::Integer);
    spec.composite_layout = CompositeLayout::Unified;
    let field = FieldConfig::new(&spec, &QuantityContext::builtin().unwrap()).unwrap();

    let q = quantity(&field, "20", "ounce");
    let record = encode(&q, &field).unwrap();
    assert_eq!(record.magnitude, StoredMagnitude::Decimal(dec("20")));
    assert_eq!(record.to_text(), "(566.9904625,20,ounce)");
    assert_eq!(record.to_sql(field.type_name()).0, "ROW(%s::decimal, %s::decimal, %s::text)::pint_field");

    let decoded = decode(&DbValue::Text("(566.9904625,20.0,ounce)".to_string()), &field)
        .unwrap()
        .unwrap();
    assert_eq!(decoded, q);
}

#[test]
fn test_null_round_trip() {
    let field = field("gram", FieldKind::Integer);
    assert_eq!(encode_nullable(None, &field).unwrap(), None);
    assert_eq!(decode(&DbValue::Null, &field).unwrap(), None);
}

#[test]
fn test_decode_malformed_text() {
    let field = field("gram", FieldKind::Integer);
    let err = decode(&DbValue::Text("(1,2)".to_string()), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CompositeParseError);

    let err = decode(&DbValue::Text("(1,2,furlong)".to_string()), &field).unwrap_err();
    assert_eq!(err, Error::UnknownUnit("furlong".to_string()));
}

#[test]
fn test_decode_ignores_stale_comparator() {
    let field = field("gram", FieldKind::Integer);
    let decoded = decode(&DbValue::Text("(999,5,kilogram)".to_string()), &field)
        .unwrap()
        .unwrap();
    assert_eq!(decoded.to_base(28), dec("5000"));
}

#[test]
fn test_aggregate_scalar_decodes_in_root_unit() {
    let field = field("kilogram", FieldKind::Decimal);
    let decoded = decode(&DbValue::Decimal(dec("0.1")), &field)
        .unwrap()
        .unwrap();
    assert_eq!(decoded.units(), "gram");
    assert_eq!(*decoded.magnitude(), dec("0.1"));
    assert_eq!(decoded.to_base(28), dec("0.1"));

    let decoded = decode(&DbValue::Integer(1500), &field).unwrap().unwrap();
    let kg = field.registry().resolve("kilogram").unwrap();
    assert_eq!(*decoded.to_unit(&kg, 28).unwrap().magnitude(), dec("1.5"));

    let decoded = decode(&DbValue::Float(0.1), &field).unwrap().unwrap();
    assert_eq!(*decoded.magnitude(), dec("0.1"));
    assert!(decode(&DbValue::Float(f64::NAN), &field).is_err());
}

#[derive(Default)]
struct RecordingConnection {
    calls: Vec<String>,
    fail: bool,
}

impl CompositeRegistrar for RecordingConnection {
    fn register_composite(&mut self, type_name: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Io(format!("type {} does not exist", type_name)));
        }
        self.calls.push(type_name.to_string());
        Ok(())
    }
}

#[test]
fn test_registration_is_idempotent() {
    let field = field("gram", FieldKind::BigInteger);
    let mut connection = RecordingConnection::default();
    let mut types = ConnectionTypes::new();

    assert!(types.register_field(&mut connection, &field).unwrap());
    assert!(!types.register_field(&mut connection, &field).unwrap());
    assert!(types.is_registered("big_integer_pint_field"));
    assert_eq!(connection.calls, vec!["big_integer_pint_field".to_string()]);
}

#[test]
fn test_failed_registration_is_retried() {
    let mut connection = RecordingConnection {
        fail: true,
        ..Default::default()
    };
    let mut types = ConnectionTypes::new();
    assert!(types.ensure_registered(&mut connection, "pint_field").is_err());
    assert!(!types.is_registered("pint_field"));

    connection.fail = false;
    assert!(types.ensure_registered(&mut connection, "pint_field").unwrap());
}

#[test]
fn test_create_type_sql() {
    assert_eq!(
        create_type_sql(CompositeLayout::PerKind, FieldKind::Integer),
        "CREATE TYPE integer_pint_field AS (comparator decimal, magnitude integer, units text);"
    );
    assert_eq!(
        create_type_sql(CompositeLayout::Unified, FieldKind::BigInteger),
        "CREATE TYPE pint_field AS (comparator decimal, magnitude decimal, units text);"
    );
    assert_eq!(create_all_types_sql(CompositeLayout::PerKind).len(), 3);
    assert_eq!(create_all_types_sql(CompositeLayout::Unified).len(), 1);
}

fn length_unit() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["meter", "kilometer", "centimeter", "foot", "inch", "mile"])
}

proptest! {
    #[test]
    fn prop_round_trip_integer(magnitude in i32::MIN..=i32::MAX, unit in length_unit()) {
        let field = field("meter", FieldKind::Integer);
        let q = quantity(&field, &magnitude.to_string(), unit);

        let record = encode(&q, &field).unwrap();
        let decoded = decode(&DbValue::Text(record.to_text()), &field).unwrap().unwrap();
        prop_assert_eq!(decoded.magnitude(), q.magnitude());
        prop_assert_eq!(decoded.units(), q.units());

        let meter = field.registry().resolve("meter").unwrap();
        let expected = field
            .registry()
            .convert(&BigDecimal::from(magnitude), q.unit(), &meter, 28)
            .unwrap();
        prop_assert_eq!(decoded.to_base(28), expected);
    }

    #[test]
    fn prop_round_trip_decimal(
        units in -10_000_000_000i64..10_000_000_000,
        scale in 0i64..8,
        unit in length_unit(),
    ) {
        let field = field("meter", FieldKind::Decimal);
        let magnitude = BigDecimal::new(units.into(), scale);
        let q = Quantity::new(magnitude.clone(), field.registry().resolve(unit).unwrap(), FieldKind::Decimal).unwrap();

        let record = encode(&q, &field).unwrap();
        let decoded = decode(&DbValue::Record(record), &field).unwrap().unwrap();
        prop_assert_eq!(decoded.magnitude(), &magnitude);
        prop_assert_eq!(decoded.units(), unit);
    }
}
