use crate::model::Quantity;
use crate::numeric;
use bigdecimal::BigDecimal;
use serde_json::Value;
use std::fmt;

/// Raw value handed to a field by a form, serializer or ORM call.
#[derive(Debug, Clone)]
pub enum RawInput {
    Null,
    Quantity(Quantity),
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(BigDecimal),
    Sequence(Vec<RawInput>),
    Map(Vec<(String, RawInput)>),
    Bool(bool),
}

impl RawInput {
    pub fn is_null(&self) -> bool {
        matches!(self, RawInput::Null)
    }

    /// Empty values: null, blank text, and empty sequences or maps.
    pub fn is_empty(&self) -> bool {
        match self {
            RawInput::Null => true,
            RawInput::Text(text) => text.trim().is_empty(),
            RawInput::Sequence(items) => items.is_empty(),
            RawInput::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Numeric value of a magnitude position: numbers, or text that is a
    /// complete decimal literal.
    pub fn as_decimal(&self) -> Option<BigDecimal> {
        match self {
            RawInput::Integer(n) => Some(BigDecimal::from(*n)),
            RawInput::Float(f) => numeric::decimal_from_f64(*f),
            RawInput::Decimal(d) => Some(d.clone()),
            RawInput::Text(text) => numeric::parse_decimal(text),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RawInput::Null => "null",
            RawInput::Quantity(_) => "quantity",
            RawInput::Text(_) => "string",
            RawInput::Integer(_) => "integer",
            RawInput::Float(_) => "float",
            RawInput::Decimal(_) => "decimal",
            RawInput::Sequence(_) => "sequence",
            RawInput::Map(_) => "dict",
            RawInput::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for RawInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawInput::Null => write!(f, "null"),
            RawInput::Quantity(q) => write!(f, "{}", q),
            RawInput::Text(text) => write!(f, "'{}'", text),
            RawInput::Integer(n) => write!(f, "{}", n),
            RawInput::Float(x) => write!(f, "{}", x),
            RawInput::Decimal(d) => write!(f, "{}", numeric::describe(d)),
            RawInput::Bool(b) => write!(f, "{}", b),
            RawInput::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            RawInput::Map(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<Value> for RawInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawInput::Null,
            Value::Bool(b) => RawInput::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawInput::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    RawInput::Decimal(BigDecimal::from(u))
                } else {
                    RawInput::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => RawInput::Text(s),
            Value::Array(items) => RawInput::Sequence(items.into_iter().map(RawInput::from).collect()),
            Value::Object(map) => RawInput::Map(
                map.into_iter()
                    .map(|(k, v)| (k, RawInput::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Quantity> for RawInput {
    fn from(q: Quantity) -> Self {
        RawInput::Quantity(q)
    }
}

impl From<&str> for RawInput {
    fn from(text: &str) -> Self {
        RawInput::Text(text.to_string())
    }
}

impl From<String> for RawInput {
    fn from(text: String) -> Self {
        RawInput::Text(text)
    }
}

impl From<i64> for RawInput {
    fn from(n: i64) -> Self {
        RawInput::Integer(n)
    }
}

impl From<i32> for RawInput {
    fn from(n: i32) -> Self {
        RawInput::Integer(n as i64)
    }
}

impl From<f64> for RawInput {
    fn from(x: f64) -> Self {
        RawInput::Float(x)
    }
}

impl From<BigDecimal> for RawInput {
    fn from(d: BigDecimal) -> Self {
        RawInput::Decimal(d)
    }
}

impl<T: Into<RawInput>> From<Option<T>> for RawInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawInput::Null, Into::into)
    }
}
