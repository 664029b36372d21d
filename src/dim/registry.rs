//! Runtime unit registry.
//!
//! A registry is assembled once through [`RegistryBuilder`] (builtin
//! definitions plus any custom units declared at startup) and is
//! immutable afterwards, so it can be shared behind an `Arc` by every
//! field without locking.
//!
//! Every unit carries a factor to the root units of its dimension:
//!
//! ```text
//! v_root = v * unit.factor
//! v_dst  = v_src * src.factor / dst.factor
//! ```

use crate::dim::error::DimError;
use crate::dim::parser::{self, UnitTerm};
use crate::dim::types::{BaseDimension, Dimension, RegistryId, Unit};
use crate::numeric;
use bigdecimal::BigDecimal;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BUILTIN_UNITS: &str = include_str!("units.toml");

/// Digits kept for factors that needed a division (e.g. `1/foot`).
const FACTOR_PRECISION: u64 = 50;

/// A set of prefix and unit definitions, as read from TOML.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub prefixes: Vec<PrefixSpec>,
    #[serde(default)]
    pub units: Vec<UnitSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrefixSpec {
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub factor: String,
}

/// A unit is either a root unit of a base dimension or a definition
/// expression over previously defined units ("0.45359237 kilogram").
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitSpec {
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub dimension: Option<BaseDimension>,
    #[serde(default)]
    pub definition: Option<String>,
}

impl UnitSpec {
    pub fn defined_as(name: &str, definition: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: None,
            aliases: Vec::new(),
            dimension: None,
            definition: Some(definition.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct Prefix {
    name: String,
    symbols: Vec<String>,
    factor: BigDecimal,
}

#[derive(Debug, Clone)]
struct UnitEntry {
    name: String,
    symbol: Option<String>,
    factor: BigDecimal,
    dimension: Dimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Name,
    Symbol,
}

/// Definitions shared by the builder (while loading) and the frozen registry.
#[derive(Debug, Clone, Default)]
struct UnitTable {
    prefixes: Vec<Prefix>,
    units: Vec<UnitEntry>,
    lookup: HashMap<String, (usize, NameKind)>,
    roots: HashMap<BaseDimension, String>,
}

impl UnitTable {
    fn add_prefix(&mut self, spec: &PrefixSpec) -> Result<(), DimError> {
        let factor = numeric::parse_decimal(&spec.factor)
            .filter(|f| *f > BigDecimal::zero())
            .ok_or_else(|| DimError::InvalidDefinition {
                name: spec.name.clone(),
                reason: format!("prefix factor '{}' is not a positive number", spec.factor),
            })?;

        let mut symbols: Vec<String> = spec.symbol.iter().cloned().collect();
        symbols.extend(spec.aliases.iter().cloned());

        self.prefixes.push(Prefix {
            name: spec.name.clone(),
            symbols,
            factor,
        });
        // Longest first so "deca" is tried before "d"-style overlaps
        self.prefixes
            .sort_by(|a, b| b.name.chars().count().cmp(&a.name.chars().count()));
        Ok(())
    }

    fn add_unit(&mut self, spec: &UnitSpec) -> Result<(), DimError> {
        let invalid = |reason: String| DimError::InvalidDefinition {
            name: spec.name.clone(),
            reason,
        };

        let mut names: Vec<(&str, NameKind)> = vec![(spec.name.as_str(), NameKind::Name)];
        names.extend(spec.aliases.iter().map(|a| (a.as_str(), NameKind::Name)));
        if let Some(symbol) = &spec.symbol {
            names.push((symbol.as_str(), NameKind::Symbol));
        }
        for (name, _) in &names {
            if name.is_empty() {
                return Err(invalid("names and symbols cannot be empty".to_string()));
            }
            if self.lookup.contains_key(*name) {
                return Err(invalid(format!("'{}' is already defined", name)));
            }
        }

        let (factor, dimension) = match (&spec.dimension, &spec.definition) {
            (Some(base), None) => {
                self.roots.insert(*base, spec.name.clone());
                (BigDecimal::one(), Dimension::of(*base))
            }
            (None, Some(definition)) => {
                let (number, terms) = parser::parse_quantity_expression(definition)
                    .map_err(|e| invalid(e.to_string()))?;
                let (_, factor, dimension) = self.resolve_terms(&terms)?;
                let factor = number.unwrap_or_else(BigDecimal::one) * factor;
                if factor.is_zero() {
                    return Err(invalid("definition evaluates to zero".to_string()));
                }
                (factor, dimension)
            }
            _ => {
                return Err(invalid(
                    "exactly one of `dimension` or `definition` is required".to_string(),
                ))
            }
        };

        let index = self.units.len();
        self.units.push(UnitEntry {
            name: spec.name.clone(),
            symbol: spec.symbol.clone(),
            factor,
            dimension,
        });
        for (name, kind) in names {
            self.lookup.insert(name.to_string(), (index, kind));
        }
        Ok(())
    }

    fn entry(&self, token: &str, kind: Option<NameKind>) -> Option<&UnitEntry> {
        self.lookup
            .get(token)
            .filter(|(_, k)| kind.map_or(true, |wanted| *k == wanted))
            .map(|(index, _)| &self.units[*index])
    }

    /// Name or alias, allowing a plural "-s".
    fn entry_by_name(&self, token: &str) -> Option<&UnitEntry> {
        self.entry(token, Some(NameKind::Name)).or_else(|| {
            token
                .strip_suffix('s')
                .and_then(|singular| self.entry(singular, Some(NameKind::Name)))
        })
    }

    /// Resolve a single unit token to (canonical name, factor, dimension).
    fn lookup_token(&self, token: &str) -> Option<(String, BigDecimal, Dimension)> {
        let found = |entry: &UnitEntry| {
            (
                entry.name.clone(),
                entry.factor.clone(),
                entry.dimension,
            )
        };

        if let Some(entry) = self.entry(token, None).or_else(|| self.entry_by_name(token)) {
            return Some(found(entry));
        }

        let prefixed = |prefix: &Prefix, entry: &UnitEntry| {
            (
                format!("{}{}", prefix.name, entry.name),
                &prefix.factor * &entry.factor,
                entry.dimension,
            )
        };

        for prefix in &self.prefixes {
            if let Some(rest) = token.strip_prefix(prefix.name.as_str()) {
                if let Some(entry) = self.entry_by_name(rest) {
                    return Some(prefixed(prefix, entry));
                }
            }
        }

        for prefix in &self.prefixes {
            for symbol in &prefix.symbols {
                if let Some(rest) = token.strip_prefix(symbol.as_str()) {
                    if let Some(entry) = self.entry(rest, Some(NameKind::Symbol)) {
                        return Some(prefixed(prefix, entry));
                    }
                }
            }
        }

        None
    }

    fn resolve_terms(
        &self,
        terms: &[UnitTerm],
    ) -> Result<(Vec<UnitTerm>, BigDecimal, Dimension), DimError> {
        let mut canonical = Vec::with_capacity(terms.len());
        let mut factor = BigDecimal::one();
        let mut dimension = Dimension::DIMENSIONLESS;

        for (token, exp) in terms {
            let (name, unit_factor, unit_dimension) = self
                .lookup_token(token)
                .ok_or_else(|| DimError::UnknownUnit(token.clone()))?;
            factor = factor * pow(&unit_factor, *exp);
            dimension = dimension.mul(&unit_dimension.powi(*exp)?)?;
            canonical.push((name, *exp));
        }

        Ok((parser::merge_terms(canonical)?, factor, dimension))
    }
}

fn pow(base: &BigDecimal, exp: i32) -> BigDecimal {
    let mut result = BigDecimal::one();
    for _ in 0..exp.unsigned_abs() {
        result = result * base;
    }
    if exp < 0 {
        numeric::round_to_precision(&(BigDecimal::one() / result), FACTOR_PRECISION)
    } else {
        result
    }
}

/// Assembles a registry; the only place definitions can be added.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    table: UnitTable,
}

impl RegistryBuilder {
    /// An empty builder with no prefixes or units.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preloaded with the builtin definitions.
    pub fn with_builtin() -> Result<Self, DimError> {
        let mut builder = Self::new();
        builder.load_str(BUILTIN_UNITS)?;
        Ok(builder)
    }

    pub fn load_str(&mut self, content: &str) -> Result<(), DimError> {
        let file: DefinitionFile =
            toml::from_str(content).map_err(|e| DimError::InvalidDefinition {
                name: "<definitions>".to_string(),
                reason: e.to_string(),
            })?;
        self.load(&file)
    }

    pub fn load(&mut self, file: &DefinitionFile) -> Result<(), DimError> {
        for prefix in &file.prefixes {
            self.table.add_prefix(prefix)?;
        }
        for unit in &file.units {
            self.table.add_unit(unit)?;
        }
        Ok(())
    }

    pub fn define(&mut self, spec: &UnitSpec) -> Result<(), DimError> {
        self.table.add_unit(spec)
    }

    pub fn define_prefix(&mut self, spec: &PrefixSpec) -> Result<(), DimError> {
        self.table.add_prefix(spec)
    }

    pub fn build(self) -> UnitRegistry {
        let registry = UnitRegistry {
            id: RegistryId::next(),
            table: self.table,
        };
        log::debug!(
            "Built {} with {} units and {} prefixes",
            registry.id,
            registry.table.units.len(),
            registry.table.prefixes.len()
        );
        registry
    }
}

/// Listing entry for a defined unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    pub name: String,
    pub symbol: Option<String>,
    pub dimension: String,
    pub factor: String,
}

#[derive(Debug)]
pub struct UnitRegistry {
    id: RegistryId,
    table: UnitTable,
}

impl UnitRegistry {
    /// The builtin registry with no custom units.
    pub fn builtin() -> Result<Self, DimError> {
        Ok(RegistryBuilder::with_builtin()?.build())
    }

    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// Resolve a unit expression ("gram", "kg/m^3") to a [`Unit`].
    pub fn resolve(&self, expression: &str) -> Result<Unit, DimError> {
        let terms = parser::parse_unit_expression(expression)?;
        self.unit_from_terms(&terms)
    }

    fn unit_from_terms(&self, terms: &[UnitTerm]) -> Result<Unit, DimError> {
        let (canonical, factor, dimension) = self.table.resolve_terms(terms)?;
        Ok(Unit {
            name: parser::format_terms(&canonical),
            factor,
            dimension,
            registry: self.id,
        })
    }

    pub fn contains(&self, expression: &str) -> bool {
        self.resolve(expression).is_ok()
    }

    pub fn dimensionality(&self, unit: &Unit) -> Dimension {
        unit.dimension()
    }

    pub fn dimensionality_of(&self, expression: &str) -> Result<Dimension, DimError> {
        Ok(self.resolve(expression)?.dimension())
    }

    /// Convert a magnitude between two compatible units, rounding the
    /// result to `precision` significant digits.
    pub fn convert(
        &self,
        magnitude: &BigDecimal,
        from: &Unit,
        to: &Unit,
        precision: u64,
    ) -> Result<BigDecimal, DimError> {
        if !from.is_compatible(to) {
            return Err(DimError::IncompatibleDimension {
                from: from.name().to_string(),
                from_dimension: from.dimension().to_string(),
                to: to.name().to_string(),
                to_dimension: to.dimension().to_string(),
            });
        }
        if from.factor() == to.factor() {
            return Ok(magnitude.clone());
        }

        let root = magnitude * from.factor();
        let converted = if to.factor().is_one() {
            root
        } else {
            root / to.factor()
        };
        Ok(numeric::round_to_precision(&converted, precision))
    }

    /// The unit comparators are expressed in: root units of `dimension`,
    /// e.g. `gram/meter^3` for a density.
    pub fn root_unit(&self, dimension: Dimension) -> Result<Unit, DimError> {
        let mut terms = Vec::new();
        for (base, exp) in dimension.terms() {
            let name = self
                .table
                .roots
                .get(&base)
                .ok_or_else(|| DimError::UnknownUnit(base.label().to_string()))?;
            terms.push((name.clone(), exp as i32));
        }
        self.unit_from_terms(&terms)
    }

    /// Parse "10 gram" style text; a missing number means one.
    pub fn parse_expression(&self, text: &str) -> Result<(BigDecimal, Unit), DimError> {
        let (number, terms) = parser::parse_quantity_expression(text)?;
        let unit = if terms.is_empty() {
            self.root_unit(Dimension::DIMENSIONLESS)?
        } else {
            self.unit_from_terms(&terms)?
        };
        Ok((number.unwrap_or_else(BigDecimal::one), unit))
    }

    pub fn units(&self) -> Vec<UnitSummary> {
        self.table
            .units
            .iter()
            .map(|entry| UnitSummary {
                name: entry.name.clone(),
                symbol: entry.symbol.clone(),
                dimension: entry.dimension.to_string(),
                factor: numeric::to_plain_string(&numeric::trim(&entry.factor)),
            })
            .collect()
    }
}
