use crate::config::{CompositeLayout, FieldConfig};
use crate::error::Result;
use crate::model::FieldKind;
use std::collections::HashSet;

/// A database connection able to map a named composite type onto the
/// codec. Implemented by the driver glue.
pub trait CompositeRegistrar {
    fn register_composite(&mut self, type_name: &str) -> Result<()>;
}

/// Composite types already registered on one connection.
#[derive(Debug, Default)]
pub struct ConnectionTypes {
    registered: HashSet<String>,
}

impl ConnectionTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `type_name` unless it already is. Returns whether the
    /// registrar was called; a failed registration is not remembered.
    pub fn ensure_registered(
        &mut self,
        registrar: &mut dyn CompositeRegistrar,
        type_name: &str,
    ) -> Result<bool> {
        if self.registered.contains(type_name) {
            return Ok(false);
        }
        registrar.register_composite(type_name)?;
        self.registered.insert(type_name.to_string());
        log::debug!("Registered composite type {}", type_name);
        Ok(true)
    }

    pub fn register_field(
        &mut self,
        registrar: &mut dyn CompositeRegistrar,
        field: &FieldConfig,
    ) -> Result<bool> {
        self.ensure_registered(registrar, field.type_name())
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.registered.contains(type_name)
    }
}

pub fn create_type_sql(layout: CompositeLayout, kind: FieldKind) -> String {
    format!(
        "CREATE TYPE {} AS (comparator decimal, magnitude {}, units text);",
        layout.type_name(kind),
        layout.column_kind(kind).sql_type()
    )
}

/// Every type a layout needs, one statement each.
pub fn create_all_types_sql(layout: CompositeLayout) -> Vec<String> {
    match layout {
        CompositeLayout::Unified => vec![create_type_sql(layout, FieldKind::Decimal)],
        CompositeLayout::PerKind => FieldKind::ALL
            .iter()
            .map(|kind| create_type_sql(layout, *kind))
            .collect(),
    }
}
