use crate::error::{Error, Result};
use crate::model::FieldKind;
use crate::numeric;
use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::ToPrimitive;
use serde::{Serialize, Serializer};
use std::fmt;

/// The magnitude column as stored, typed by the column's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredMagnitude {
    Integer(i32),
    BigInteger(i64),
    Decimal(BigDecimal),
}

impl StoredMagnitude {
    /// Cast a magnitude to a column kind. Integral kinds round half to
    /// even; decimals are quantized only when `decimal_places` is set.
    pub fn cast(value: &BigDecimal, kind: FieldKind, decimal_places: Option<u32>) -> Result<Self> {
        let out_of_range = || {
            let (min, max) = kind.bounds().unwrap_or((i64::MIN, i64::MAX));
            Error::OutOfRange {
                value: numeric::describe(value),
                min: min.to_string(),
                max: max.to_string(),
            }
        };

        match kind {
            FieldKind::Integer => numeric::round_half_even(value)
                .to_i32()
                .map(StoredMagnitude::Integer)
                .ok_or_else(out_of_range),
            FieldKind::BigInteger => numeric::round_half_even(value)
                .to_i64()
                .map(StoredMagnitude::BigInteger)
                .ok_or_else(out_of_range),
            FieldKind::Decimal => Ok(StoredMagnitude::Decimal(match decimal_places {
                Some(places) => value.with_scale_round(places as i64, RoundingMode::HalfEven),
                None => value.clone(),
            })),
        }
    }

    /// Widening cast to decimal; lossless for every kind.
    pub fn widen(&self) -> BigDecimal {
        match self {
            StoredMagnitude::Integer(n) => BigDecimal::from(*n),
            StoredMagnitude::BigInteger(n) => BigDecimal::from(*n),
            StoredMagnitude::Decimal(d) => d.clone(),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            StoredMagnitude::Integer(_) => FieldKind::Integer,
            StoredMagnitude::BigInteger(_) => FieldKind::BigInteger,
            StoredMagnitude::Decimal(_) => FieldKind::Decimal,
        }
    }

    fn parse(text: &str, kind: FieldKind) -> std::result::Result<Self, String> {
        let value = numeric::parse_decimal(text)
            .ok_or_else(|| format!("magnitude '{}' is not a number", text))?;
        if !kind.is_integral() {
            return Ok(StoredMagnitude::Decimal(value));
        }

        let integer = numeric::to_i64_exact(&value)
            .ok_or_else(|| format!("magnitude '{}' is not a {} value", text, kind))?;
        match kind {
            FieldKind::Integer => i32::try_from(integer)
                .map(StoredMagnitude::Integer)
                .map_err(|_| format!("magnitude '{}' overflows a 32-bit integer", text)),
            _ => Ok(StoredMagnitude::BigInteger(integer)),
        }
    }
}

impl fmt::Display for StoredMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredMagnitude::Integer(n) => write!(f, "{}", n),
            StoredMagnitude::BigInteger(n) => write!(f, "{}", n),
            StoredMagnitude::Decimal(d) => write!(f, "{}", numeric::to_plain_string(d)),
        }
    }
}

impl Serialize for StoredMagnitude {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            StoredMagnitude::Integer(n) => serializer.serialize_i32(*n),
            StoredMagnitude::BigInteger(n) => serializer.serialize_i64(*n),
            StoredMagnitude::Decimal(d) => serializer.serialize_str(&numeric::to_plain_string(d)),
        }
    }
}

/// A bound query or insert parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Decimal(BigDecimal),
    Integer(i64),
    Text(String),
}

impl From<StoredMagnitude> for SqlParam {
    fn from(magnitude: StoredMagnitude) -> Self {
        match magnitude {
            StoredMagnitude::Integer(n) => SqlParam::Integer(n as i64),
            StoredMagnitude::BigInteger(n) => SqlParam::Integer(n),
            StoredMagnitude::Decimal(d) => SqlParam::Decimal(d),
        }
    }
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlParam::Decimal(d) => write!(f, "{}", numeric::to_plain_string(d)),
            SqlParam::Integer(n) => write!(f, "{}", n),
            SqlParam::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl Serialize for SqlParam {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SqlParam::Decimal(d) => serializer.serialize_str(&numeric::to_plain_string(d)),
            SqlParam::Integer(n) => serializer.serialize_i64(*n),
            SqlParam::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// The three-field composite stored per non-null cell:
/// `(comparator decimal, magnitude <kind>, units text)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeRecord {
    #[serde(serialize_with = "serialize_decimal")]
    pub comparator: BigDecimal,
    pub magnitude: StoredMagnitude,
    pub units: String,
}

fn serialize_decimal<S: Serializer>(
    value: &BigDecimal,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&numeric::to_plain_string(value))
}

impl CompositeRecord {
    /// Parse the textual record form a driver returns without the binary
    /// composite protocol, e.g. `(566.9904625,20,ounce)`. The magnitude is
    /// read as `column_kind`.
    pub fn parse(text: &str, column_kind: FieldKind) -> Result<Self> {
        let inner = text
            .trim()
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .ok_or_else(|| Error::composite(text, "expected a parenthesised record"))?;

        let fields = split_fields(inner).map_err(|reason| Error::composite(text, reason))?;
        let [comparator, magnitude, units]: [String; 3] = fields.try_into().map_err(
            |fields: Vec<String>| {
                Error::composite(text, format!("expected 3 fields, found {}", fields.len()))
            },
        )?;

        let comparator = numeric::parse_decimal(&comparator).ok_or_else(|| {
            Error::composite(text, format!("comparator '{}' is not a number", comparator))
        })?;
        let magnitude = StoredMagnitude::parse(magnitude.trim(), column_kind)
            .map_err(|reason| Error::composite(text, reason))?;
        let units = units.trim().to_string();
        if units.is_empty() {
            return Err(Error::composite(text, "units are empty"));
        }

        Ok(Self {
            comparator,
            magnitude,
            units,
        })
    }

    /// The database's textual form: no spaces, units quoted only when
    /// they contain record delimiters.
    pub fn to_text(&self) -> String {
        format!(
            "({},{},{})",
            numeric::to_plain_string(&self.comparator),
            self.magnitude,
            quote_field(&self.units)
        )
    }

    /// Parameterised row constructor for inserts and updates.
    pub fn to_sql(&self, type_name: &str) -> (String, Vec<SqlParam>) {
        let sql = format!(
            "ROW(%s::decimal, %s::{}, %s::text)::{}",
            self.magnitude.kind().sql_type(),
            type_name
        );
        let params = vec![
            SqlParam::Decimal(self.comparator.clone()),
            SqlParam::from(self.magnitude.clone()),
            SqlParam::Text(self.units.clone()),
        ];
        (sql, params)
    }

    /// Inline literal, for DDL defaults and debugging output.
    pub fn to_sql_literal(&self, type_name: &str) -> String {
        format!(
            "ROW({}, {}, {})::{}",
            SqlParam::Decimal(self.comparator.clone()),
            self.magnitude,
            SqlParam::Text(self.units.clone()),
            type_name
        )
    }
}

impl fmt::Display for CompositeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

fn quote_field(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| matches!(c, '"' | '\\' | '(' | ')' | ',') || c.is_whitespace());
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Split on top-level commas, honouring double-quoted fields with `""`
/// and backslash escapes.
fn split_fields(inner: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            '\\' if in_quotes => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err("dangling escape".to_string()),
            },
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_text_form() {
        let record = CompositeRecord::parse("(0.566990,20,ounce)", FieldKind::Integer).unwrap();
        assert_eq!(record.comparator, dec("0.566990"));
        assert_eq!(record.magnitude, StoredMagnitude::Integer(20));
        assert_eq!(record.units, "ounce");

        let record =
            CompositeRecord::parse("(1000,1.500,\"kilogram/meter^3\")", FieldKind::Decimal).unwrap();
        assert_eq!(record.magnitude, StoredMagnitude::Decimal(dec("1.500")));
        assert_eq!(record.units, "kilogram/meter^3");
    }

    #[test]
    fn test_parse_quoted_units_with_delimiters() {
        let record = CompositeRecord::parse("(1,1,\"odd,\"\"unit\"\"\")", FieldKind::BigInteger)
            .unwrap();
        assert_eq!(record.units, "odd,\"unit\"");
        assert_eq!(record.to_text(), "(1,1,\"odd,\"\"unit\"\"\")");
    }

    #[test]
    fn test_malformed_text() {
        for text in [
            "100,100,gram",
            "(100,100)",
            "(100,100,gram,extra)",
            "(abc,100,gram)",
            "(100,1.5,gram)",
            "(100,100,)",
            "(100,100,\"gram)",
        ] {
            let err = CompositeRecord::parse(text, FieldKind::Integer).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CompositeParseError, "{}", text);
        }

        let err = CompositeRecord::parse("(1,3000000000,gram)", FieldKind::Integer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CompositeParseError);
        assert!(CompositeRecord::parse("(1,3000000000,gram)", FieldKind::BigInteger).is_ok());
    }

    #[test]
    fn test_text_form_has_no_spaces() {
        let record = CompositeRecord {
            comparator: dec("566.9904625"),
            magnitude: StoredMagnitude::Integer(20),
            units: "ounce".to_string(),
        };
        assert_eq!(record.to_text(), "(566.9904625,20,ounce)");
        assert_eq!(
            CompositeRecord::parse(&record.to_text(), FieldKind::Integer).unwrap(),
            record
        );
    }

    #[test]
    fn test_cast_magnitude() {
        assert_eq!(
            StoredMagnitude::cast(&dec("2.5"), FieldKind::Integer, None).unwrap(),
            StoredMagnitude::Integer(2)
        );
        assert_eq!(
            StoredMagnitude::cast(&dec("2.7"), FieldKind::BigInteger, None).unwrap(),
            StoredMagnitude::BigInteger(3)
        );
        assert_eq!(
            StoredMagnitude::cast(&dec("1.23456"), FieldKind::Decimal, Some(2)).unwrap(),
            StoredMagnitude::Decimal(dec("1.23"))
        );
        let err = StoredMagnitude::cast(&dec("2147483648"), FieldKind::Integer, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_sql_rendering() {
        let record = CompositeRecord {
            comparator: dec("100"),
            magnitude: StoredMagnitude::Integer(100),
            units: "gram".to_string(),
        };
        let (sql, params) = record.to_sql("integer_pint_field");
        assert_eq!(
            sql,
            "ROW(%s::decimal, %s::integer, %s::text)::integer_pint_field"
        );
        assert_eq!(
            params,
            vec![
                SqlParam::Decimal(dec("100")),
                SqlParam::Integer(100),
                SqlParam::Text("gram".to_string()),
            ]
        );
        assert_eq!(
            record.to_sql_literal("integer_pint_field"),
            "ROW(100, 100, 'gram')::integer_pint_field"
        );
    }

    #[test]
    fn test_widen() {
        assert_eq!(StoredMagnitude::Integer(-7).widen(), dec("-7"));
        assert_eq!(StoredMagnitude::BigInteger(i64::MAX).widen(), dec("9223372036854775807"));
    }
}
