use super::*;
use crate::config::{FieldConfig, FieldSpec, QuantityContext};
use crate::dim::RegistryBuilder;
use crate::error::{Error, ErrorKind};
use crate::model::{FieldKind, Quantity};
use bigdecimal::BigDecimal;
use proptest::prelude::*;
use serde_json::json;
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

fn converted(raw: RawInput, field: &FieldConfig) -> Quantity {
    convert(&raw, field)
        .unwrap()
        .expect("input converts to a quantity")
}

#[test]
fn test_empty_values_convert_to_none() {
    let field = field("gram", FieldKind::Integer);
    for raw in [
        RawInput::Null,
        RawInput::from(""),
        RawInput::from("   "),
        RawInput::Sequence(vec![]),
        RawInput::Map(vec![]),
    ] {
        assert!(convert(&raw, &field).unwrap().is_none(), "{}", raw);
    }
}

#[test]
fn test_native_quantity_passes_through() {
    let field = field("gram", FieldKind::Integer);
    let q = Quantity::new(
        dec("5"),
        field.registry().resolve("kilogram").unwrap(),
        FieldKind::Integer,
    )
    .unwrap();

    let result = convert_detailed(&RawInput::from(q.clone()), &field)
        .unwrap()
        .unwrap();
    assert!(result.warning.is_none());
    assert_eq!(result.quantity.unit(), q.unit());
    assert_eq!(*result.quantity.magnitude(), dec("5"));
}

#[test]
fn test_foreign_quantity_is_rescaled_with_warning() {
    let field = field("gram", FieldKind::Integer);
    let foreign = RegistryBuilder::with_builtin().unwrap().build();
    let q = Quantity::new(
        dec("5"),
        foreign.resolve("kilogram").unwrap(),
        FieldKind::Integer,
    )
    .unwrap();

    let result = convert_detailed(&RawInput::from(q), &field).unwrap().unwrap();
    let warning = result.warning.expect("rescale is signalled");
    assert_eq!(warning.to, field.registry().id());
    assert_eq!(
        result.quantity.unit().registry_id(),
        field.registry().id()
    );
    assert_eq!(result.quantity.to_base(28), dec("5000"));
}

#[test]
fn test_native_quantity_of_wrong_dimension() {
    let field = field("gram", FieldKind::Integer);
    let q = Quantity::new(
        dec("5"),
        field.registry().resolve("meter").unwrap(),
        FieldKind::Integer,
    )
    .unwrap();
    let err = convert(&RawInput::from(q), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleDimension);
}

#[test]
fn test_dict_input() {
    let field = field("gram", FieldKind::Decimal);
    let q = converted(json!({"magnitude": "1.5", "units": "kilogram"}).into(), &field);
    assert_eq!(*q.magnitude(), dec("1.5"));
    assert_eq!(q.units(), "kilogram");

    let q = converted(json!({"units": "gram", "magnitude": 7}).into(), &field);
    assert_eq!(*q.magnitude(), dec("7"));
}

#[test]
fn test_dict_errors() {
    let field = field("gram", FieldKind::Decimal);
    let err = convert(&json!({"magnitude": 1}).into(), &field).unwrap_err();
    assert_eq!(err, Error::MissingField("units"));

    let err = convert(&json!({"units": "gram"}).into(), &field).unwrap_err();
    assert_eq!(err, Error::MissingField("magnitude"));

    let err = convert(
        &json!({"magnitude": 1, "units": "gram", "comparator": 1}).into(),
        &field,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);

    let err = convert(&json!({"magnitude": "lots", "units": "gram"}).into(), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);

    let err = convert(&json!({"magnitude": 1, "units": 5}).into(), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);
}

#[test]
fn test_sequence_input() {
    let field = field("gram", FieldKind::Decimal);
    let q = converted(json!([3, "pound"]).into(), &field);
    assert_eq!(*q.magnitude(), dec("3"));
    assert_eq!(q.units(), "pound");

    // A stale comparator is ignored
    let q = converted(json!(["0", 20, "ounce"]).into(), &field);
    assert_eq!(q.to_base(28), dec("566.9904625"));

    let err = convert(&json!([1, "gram", 2, 3]).into(), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);
    let err = convert(&json!([1]).into(), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);
}

#[test]
fn test_composite_text_input() {
    let field = field("gram", FieldKind::Integer);
    let q = converted("(0.566990,20,ounce)".into(), &field);
    assert_eq!(*q.magnitude(), dec("20"));
    assert_eq!(q.units(), "ounce");
    assert_eq!(q.to_base(28), dec("566.9904625"));

    let err = convert(&"(1,2)".into(), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CompositeParseError);
}

#[test]
fn test_numeric_string_uses_default_unit() {
    let field = field("kilogram", FieldKind::Decimal);
    let q = converted(" 2.5 ".into(), &field);
    assert_eq!(*q.magnitude(), dec("2.5"));
    assert_eq!(q.units(), "kilogram");
}

#[test]
fn test_expression_string() {
    let field = field("gram", FieldKind::Decimal);
    let q = converted("10 kg".into(), &field);
    assert_eq!(*q.magnitude(), dec("10"));
    assert_eq!(q.units(), "kilogram");

    let q = converted("pound".into(), &field);
    assert_eq!(*q.magnitude(), dec("1"));

    let err = convert(&"10 furlong".into(), &field).unwrap_err();
    assert_eq!(err, Error::UnknownUnit("furlong".to_string()));

    let err = convert(&"10 meter".into(), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleDimension);

    let err = convert(&"10 $$".into(), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);
}

#[test]
fn test_bare_numbers() {
    let field = field("gram", FieldKind::Decimal);
    assert_eq!(*converted(RawInput::from(42i64), &field).magnitude(), dec("42"));
    assert_eq!(*converted(RawInput::from(dec("1.10")), &field).magnitude(), dec("1.10"));

    // Floats go through their shortest string form
    let q = converted(RawInput::from(0.1), &field);
    assert_eq!(crate::numeric::to_plain_string(q.magnitude()), "0.1");
}

#[test]
fn test_float_rounds_on_integer_field() {
    let field = field("meter", FieldKind::Integer);
    let q = converted(json!([2.7, "kilometer"]).into(), &field);
    assert_eq!(q.to_base(28), dec("3000"));
}

#[test]
fn test_unconvertible_shapes() {
    let field = field("gram", FieldKind::Decimal);
    let err = convert(&RawInput::Bool(true), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);

    let err = convert(&RawInput::from(f64::INFINITY), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);
}

#[test]
fn test_integer_bounds_on_input() {
    let field = field("gram", FieldKind::Integer);
    let err = convert(&RawInput::from(3_000_000_000i64), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

#[test]
fn test_dimension_checked_before_bounds() {
    let field = field("gram", FieldKind::Integer);
    for raw in [
        RawInput::from("1e20 meter"),
        json!([3_000_000_000i64, "meter"]).into(),
        json!({"magnitude": "1e400000000", "units": "second"}).into(),
        RawInput::from("(0,1e20,meter)"),
    ] {
        let err = convert(&raw, &field).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleDimension, "{}", raw);
    }
}

#[test]
fn test_large_unit_powers_fail_the_gate() {
    let field = field("gram", FieldKind::Decimal);
    // meter^256 must never collapse to a dimensionless factor
    let err = convert(&RawInput::from("5 gram*meter^256"), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);

    let err = convert(&RawInput::from("1 (meter^65536)^65536"), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);

    let err = convert(&RawInput::from("1 km^2000000"), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnconvertibleInput);
}

#[test]
fn test_huge_exponent_literals_are_out_of_range() {
    for kind in FieldKind::ALL {
        let field = field("gram", kind);
        for text in ["1e400000000", "-1e400000000 gram", "1e-400000000"] {
            let err = convert(&RawInput::from(text), &field).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::OutOfRange, "{} on {}", text, kind);
        }
    }

    let field = field("gram", FieldKind::Integer);
    let err = convert(&RawInput::from("1e40000"), &field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

fn mass_unit() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["gram", "kg", "milligram", "lb", "ounce", "tonne"])
}

fn length_unit() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["meter", "km", "foot", "inch", "mile"])
}

proptest! {
    #[test]
    fn prop_native_form_is_idempotent(
        magnitude in -1_000_000i64..1_000_000,
        unit in mass_unit(),
        shape in 0usize..4,
    ) {
        let field = field("gram", FieldKind::Decimal);
        let raw = match shape {
            0 => RawInput::from(format!("{} {}", magnitude, unit)),
            1 => json!([magnitude, unit]).into(),
            2 => json!({"magnitude": magnitude, "units": unit}).into(),
            _ => json!(["999", magnitude.to_string(), unit]).into(),
        };

        let first = convert(&raw, &field).unwrap().unwrap();
        let native: RawInput = serde_json::to_value(&first).unwrap().into();
        let second = convert(&native, &field).unwrap().unwrap();

        prop_assert_eq!(first.magnitude(), second.magnitude());
        prop_assert_eq!(first.unit(), second.unit());
        prop_assert_eq!(&first, &second);
    }

    #[test]
    fn prop_dimension_gate(
        magnitude in -1_000i64..1_000,
        mass in mass_unit(),
        length in length_unit(),
    ) {
        let field = field("gram", FieldKind::BigInteger);
        let ok = convert(&json!([magnitude, mass]).into(), &field);
        prop_assert!(ok.is_ok());

        let err = convert(&json!([magnitude, length]).into(), &field).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::IncompatibleDimension);
    }
}
