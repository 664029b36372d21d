//! Comparator-based lookup translation.
//!
//! Ordering and equality on a quantity column compare the `comparator`
//! field only, so `1 kilogram` matches a stored `1000 gram`. Generic ORM
//! lookups with text or date semantics have no meaning on a composite
//! column and are rejected up front.

use crate::codec::SqlParam;
use crate::config::FieldConfig;
use crate::convert::{self, RawInput};
use crate::error::{Error, Result};
use crate::model::FieldKind;
use bigdecimal::BigDecimal;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// (lookup name, SQL template). `{lhs}` is the comparator expression.
const SUPPORTED: &[(&str, &str)] = &[
    ("exact", "{lhs} = %s"),
    ("gt", "{lhs} > %s"),
    ("gte", "{lhs} >= %s"),
    ("lt", "{lhs} < %s"),
    ("lte", "{lhs} <= %s"),
    ("range", "{lhs} BETWEEN %s AND %s"),
];

/// Generic lookups registered as invalid for quantity columns.
const DENIED: &[&str] = &[
    "iexact",
    "contains",
    "icontains",
    "in",
    "startswith",
    "istartswith",
    "endswith",
    "iendswith",
    "regex",
    "iregex",
    "search",
    "date",
    "time",
    "year",
    "iso_year",
    "month",
    "day",
    "week",
    "week_day",
    "iso_week_day",
    "quarter",
    "hour",
    "minute",
    "second",
];

/// Lookups registered for one magnitude kind.
#[derive(Debug)]
pub struct LookupTable {
    kind: FieldKind,
    templates: HashMap<&'static str, &'static str>,
    denied: HashSet<&'static str>,
}

impl LookupTable {
    fn build(kind: FieldKind) -> Self {
        Self {
            kind,
            templates: SUPPORTED.iter().copied().collect(),
            denied: DENIED.iter().copied().collect(),
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn template(&self, op: &str) -> Option<&'static str> {
        self.templates.get(op).copied()
    }

    pub fn is_denied(&self, op: &str) -> bool {
        self.denied.contains(op)
    }

    pub fn supported(&self) -> impl Iterator<Item = &'static str> + '_ {
        SUPPORTED.iter().map(|(name, _)| *name).chain(std::iter::once("isnull"))
    }
}

lazy_static! {
    static ref LOOKUP_TABLES: HashMap<FieldKind, LookupTable> = FieldKind::ALL
        .iter()
        .map(|kind| (*kind, LookupTable::build(*kind)))
        .collect();
}

pub fn lookup_table(kind: FieldKind) -> &'static LookupTable {
    &LOOKUP_TABLES[&kind]
}

/// A column reference, rendered as quoted identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: &str) -> Self {
        Self {
            table: None,
            column: column.to_string(),
        }
    }

    pub fn qualified(table: &str, column: &str) -> Self {
        Self {
            table: Some(table.to_string()),
            column: column.to_string(),
        }
    }

    /// `("table"."column").comparator`
    pub fn comparator(&self) -> String {
        format!("({}).comparator", self)
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", quote_ident(table), quote_ident(&self.column)),
            None => write!(f, "{}", quote_ident(&self.column)),
        }
    }
}

/// Right-hand side of a lookup.
#[derive(Debug, Clone)]
pub enum LookupRhs {
    Value(RawInput),
    Range(RawInput, RawInput),
    Flag(bool),
}

impl LookupRhs {
    pub fn value(value: impl Into<RawInput>) -> Self {
        LookupRhs::Value(value.into())
    }

    pub fn range(low: impl Into<RawInput>, high: impl Into<RawInput>) -> Self {
        LookupRhs::Range(low.into(), high.into())
    }
}

/// A compiled predicate with positional `%s` parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLookup {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Translate `column <op> rhs` into a predicate on the comparator.
pub fn translate_lookup(
    op: &str,
    column: &ColumnRef,
    rhs: &LookupRhs,
    field: &FieldConfig,
) -> Result<CompiledLookup> {
    let table = lookup_table(field.kind());

    if op == "isnull" {
        return match rhs {
            LookupRhs::Flag(true) => Ok(CompiledLookup {
                sql: format!("{} IS NULL", column),
                params: Vec::new(),
            }),
            LookupRhs::Flag(false) => Ok(CompiledLookup {
                sql: format!("{} IS NOT NULL", column),
                params: Vec::new(),
            }),
            _ => Err(Error::UnconvertibleInput(
                "isnull takes a boolean".to_string(),
            )),
        };
    }

    if table.is_denied(op) {
        return Err(Error::UnsupportedLookup(op.to_string()));
    }
    let template = table
        .template(op)
        .ok_or_else(|| Error::UnsupportedLookup(op.to_string()))?;

    let params = match (op, rhs) {
        ("range", LookupRhs::Range(low, high)) => {
            vec![comparator_param(low, field)?, comparator_param(high, field)?]
        }
        ("range", _) => {
            return Err(Error::UnconvertibleInput(
                "range takes exactly two bounds".to_string(),
            ))
        }
        (_, LookupRhs::Value(value)) => vec![comparator_param(value, field)?],
        (_, _) => {
            return Err(Error::UnconvertibleInput(format!(
                "{} takes a single quantity",
                op
            )))
        }
    };

    let sql = template.replace("{lhs}", &column.comparator());
    log::debug!("Translated lookup {} to {}", op, sql);
    Ok(CompiledLookup { sql, params })
}

/// Comparator of a lookup operand, converted exactly like field input.
fn comparator_param(raw: &RawInput, field: &FieldConfig) -> Result<SqlParam> {
    Ok(SqlParam::Decimal(comparator_value(raw, field)?))
}

fn comparator_value(raw: &RawInput, field: &FieldConfig) -> Result<BigDecimal> {
    let quantity = convert::convert(raw, field)?.ok_or_else(|| {
        Error::UnconvertibleInput("cannot compare against an empty value".to_string())
    })?;
    let quantity = quantity.with_kind(field.kind())?;
    Ok(quantity.to_base(field.precision()))
}
