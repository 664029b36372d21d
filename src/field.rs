//! The narrow interface an ORM column talks to.

use crate::codec::{self, CompositeRecord, CompositeRegistrar, ConnectionTypes, DbValue};
use crate::config::{self, FieldConfig, FieldSpec, QuantityContext};
use crate::convert::{self, Converted, RawInput};
use crate::error::Result;
use crate::model::{self, Quantity};
use crate::query::{self, Aggregate, AggregateValue, ColumnRef, CompiledLookup, LookupRhs};
use crate::validation;

/// A quantity column: its configuration plus every operation the ORM
/// performs on its values.
#[derive(Debug, Clone)]
pub struct QuantityField {
    config: FieldConfig,
}

impl QuantityField {
    pub fn new(spec: &FieldSpec, context: &QuantityContext) -> Result<Self> {
        Ok(Self {
            config: FieldConfig::new(spec, context)?,
        })
    }

    /// Configure against the process-wide context.
    pub fn from_spec(spec: &FieldSpec) -> Result<Self> {
        Self::new(spec, config::context()?)
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn convert(&self, raw: &RawInput) -> Result<Option<Quantity>> {
        convert::convert(raw, &self.config)
    }

    pub fn convert_detailed(&self, raw: &RawInput) -> Result<Option<Converted>> {
        convert::convert_detailed(raw, &self.config)
    }

    pub fn validate(&self, quantity: &Quantity) -> Result<()> {
        validation::validate(quantity, &self.config)
    }

    /// Required check, conversion and validation in one pass.
    pub fn clean(&self, raw: &RawInput) -> Result<Option<Quantity>> {
        validation::clean(raw, &self.config)
    }

    pub fn encode(&self, quantity: Option<&Quantity>) -> Result<Option<CompositeRecord>> {
        codec::encode_nullable(quantity, &self.config)
    }

    pub fn decode(&self, value: &DbValue) -> Result<Option<Quantity>> {
        codec::decode(value, &self.config)
    }

    pub fn translate_lookup(
        &self,
        op: &str,
        column: &ColumnRef,
        rhs: &LookupRhs,
    ) -> Result<CompiledLookup> {
        query::translate_lookup(op, column, rhs, &self.config)
    }

    pub fn aggregate_sql(&self, aggregate: Aggregate, column: &ColumnRef) -> String {
        aggregate.sql(column)
    }

    pub fn resolve_aggregate(
        &self,
        aggregate: Aggregate,
        scalar: &DbValue,
    ) -> Result<Option<AggregateValue>> {
        aggregate.resolve(scalar, &self.config)
    }

    pub fn display(&self, quantity: &Quantity) -> String {
        model::format_quantity(quantity, &self.config)
    }

    pub fn display_in(&self, quantity: &Quantity, unit: &str) -> Result<String> {
        model::display_in(quantity, unit, &self.config)
    }

    pub fn create_type_sql(&self) -> String {
        codec::create_type_sql(self.config.layout(), self.config.kind())
    }

    pub fn register(
        &self,
        types: &mut ConnectionTypes,
        registrar: &mut dyn CompositeRegistrar,
    ) -> Result<bool> {
        types.register_field(registrar, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::FieldKind;
    use bigdecimal::BigDecimal;
    use serde_json::json;
    use std::str::FromStr;

    fn weight_field() -> QuantityField {
        let spec: FieldSpec = toml::from_str(
            r#"
default_unit = "gram"
kind = "integer"
unit_choices = ["kilogram", "pound"]
"#,
        )
        .unwrap();
        QuantityField::from_spec(&spec).unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let field = weight_field();
        let q = field.clean(&json!("2 kilogram").into()).unwrap().unwrap();
        let record = field.encode(Some(&q)).unwrap().unwrap();
        assert_eq!(record.to_text(), "(2000,2,kilogram)");

        let back = field
            .decode(&DbValue::Text(record.to_text()))
            .unwrap()
            .unwrap();
        assert_eq!(back, q);
        assert_eq!(field.display(&back), "2 kilogram");
        assert_eq!(field.display_in(&back, "gram").unwrap(), "2000 gram");
    }

    #[test]
    fn test_unit_mismatch_rejected() {
        let field = weight_field();
        let err = field.clean(&json!([100, "meter"]).into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleDimension);
    }

    #[test]
    fn test_query_surface() {
        let field = weight_field();
        let column = ColumnRef::new("weight");
        let compiled = field
            .translate_lookup("lte", &column, &LookupRhs::value("1 lb"))
            .unwrap();
        assert_eq!(compiled.sql, "(\"weight\").comparator <= %s");

        assert_eq!(field.aggregate_sql(Aggregate::Max, &column), "MAX((\"weight\").comparator)");
        let max = field
            .resolve_aggregate(Aggregate::Max, &DbValue::Integer(453))
            .unwrap();
        assert!(matches!(max, Some(AggregateValue::Quantity(q)) if q.units() == "gram"));
    }

    #[test]
    fn test_schema_surface() {
        let field = weight_field();
        assert_eq!(
            field.create_type_sql(),
            "CREATE TYPE integer_pint_field AS (comparator decimal, magnitude integer, units text);"
        );
        assert_eq!(field.config().kind(), FieldKind::Integer);
        assert_eq!(field.config().unit_choices().len(), 3);
    }

    #[test]
    fn test_precision_scenario() {
        let spec = FieldSpec::new("gram", FieldKind::Decimal);
        let field = QuantityField::new(&spec, &QuantityContext::builtin().unwrap()).unwrap();
        let thirty = "123456789012345678901234567890";

        let err = field.clean(&json!([thirty, "gram"]).into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrecisionExceeded);

        let stored = field
            .decode(&DbValue::Text(format!("({0},{0},gram)", thirty)))
            .unwrap()
            .unwrap();
        assert!(field.validate(&stored).is_ok());
        assert_eq!(*stored.magnitude(), BigDecimal::from_str(thirty).unwrap());
    }
}
