use crate::codec::encoding::from_scalar;
use crate::codec::DbValue;
use crate::config::FieldConfig;
use crate::error::{Error, Result};
use crate::model::{FieldKind, Quantity};
use crate::numeric;
use crate::query::lookup::ColumnRef;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregates over the comparator column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    StdDev,
    Variance,
}

/// Resolved aggregate result.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateValue {
    Quantity(Quantity),
    Count(u64),
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Quantity(q) => write!(f, "{}", q),
            AggregateValue::Count(n) => write!(f, "{}", n),
        }
    }
}

impl Aggregate {
    pub fn function(self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Count => "COUNT",
            Aggregate::StdDev => "STDDEV",
            Aggregate::Variance => "VARIANCE",
        }
    }

    /// `SUM(("weight").comparator)`; `COUNT` counts non-null cells.
    pub fn sql(self, column: &ColumnRef) -> String {
        match self {
            Aggregate::Count => format!("COUNT({})", column),
            _ => format!("{}({})", self.function(), column.comparator()),
        }
    }

    /// Turn the scalar the database returned into a value. An aggregate
    /// over no rows returns `None` (except `Count`, which is zero).
    pub fn resolve(self, scalar: &DbValue, field: &FieldConfig) -> Result<Option<AggregateValue>> {
        let value = match scalar_value(scalar)? {
            Some(value) => value,
            None if self == Aggregate::Count => return Ok(Some(AggregateValue::Count(0))),
            None => return Ok(None),
        };

        match self {
            Aggregate::Count => numeric::to_i64_exact(&value)
                .and_then(|n| u64::try_from(n).ok())
                .map(|n| Some(AggregateValue::Count(n)))
                .ok_or_else(|| {
                    Error::UnconvertibleInput(format!("count {}", numeric::describe(&value)))
                }),
            Aggregate::Variance => {
                let squared = field
                    .registry()
                    .root_unit(field.default_unit().dimension().powi(2)?)?;
                let quantity = Quantity::from_storage(value, squared, FieldKind::Decimal)?;
                Ok(Some(AggregateValue::Quantity(quantity)))
            }
            _ => Ok(Some(AggregateValue::Quantity(from_scalar(value, field)?))),
        }
    }
}

fn scalar_value(scalar: &DbValue) -> Result<Option<BigDecimal>> {
    match scalar {
        DbValue::Null => Ok(None),
        DbValue::Integer(n) => Ok(Some(BigDecimal::from(*n))),
        DbValue::Decimal(d) => Ok(Some(d.clone())),
        DbValue::Float(x) => numeric::decimal_from_f64(*x)
            .map(Some)
            .ok_or_else(|| Error::UnconvertibleInput(format!("aggregate value {}", x))),
        DbValue::Text(text) => numeric::parse_decimal(text)
            .map(Some)
            .ok_or_else(|| Error::UnconvertibleInput(format!("aggregate value '{}'", text))),
        DbValue::Record(_) => Err(Error::UnconvertibleInput(
            "aggregate returned a composite record".to_string(),
        )),
    }
}

impl std::str::FromStr for Aggregate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregate::Sum),
            "avg" => Ok(Aggregate::Avg),
            "min" => Ok(Aggregate::Min),
            "max" => Ok(Aggregate::Max),
            "count" => Ok(Aggregate::Count),
            "stddev" => Ok(Aggregate::StdDev),
            "variance" => Ok(Aggregate::Variance),
            other => Err(Error::UnsupportedLookup(other.to_string())),
        }
    }
}
