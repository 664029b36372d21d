use crate::config::settings::QuantityContext;
use crate::dim::{Unit, UnitRegistry};
use crate::error::{Error, Result};
use crate::model::FieldKind;
use crate::numeric;
use crate::validation;
use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};

/// A unit choice as declared: a bare unit name, or a
/// `[display, value]` pair.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UnitChoice {
    Name(String),
    Pair(String, String),
}

impl From<&str> for UnitChoice {
    fn from(name: &str) -> Self {
        UnitChoice::Name(name.to_string())
    }
}

impl From<(&str, &str)> for UnitChoice {
    fn from((display, value): (&str, &str)) -> Self {
        UnitChoice::Pair(display.to_string(), value.to_string())
    }
}

/// Presentation rounding for decimal fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingMethod {
    #[default]
    RoundHalfEven,
    RoundHalfUp,
    RoundHalfDown,
    RoundUp,
    RoundDown,
    RoundCeiling,
    RoundFloor,
}

impl RoundingMethod {
    pub fn mode(self) -> RoundingMode {
        match self {
            RoundingMethod::RoundHalfEven => RoundingMode::HalfEven,
            RoundingMethod::RoundHalfUp => RoundingMode::HalfUp,
            RoundingMethod::RoundHalfDown => RoundingMode::HalfDown,
            RoundingMethod::RoundUp => RoundingMode::Up,
            RoundingMethod::RoundDown => RoundingMode::Down,
            RoundingMethod::RoundCeiling => RoundingMode::Ceiling,
            RoundingMethod::RoundFloor => RoundingMode::Floor,
        }
    }
}

/// Database schema generation: one composite type per magnitude kind,
/// or a single type with a decimal magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeLayout {
    #[default]
    PerKind,
    Unified,
}

impl CompositeLayout {
    pub fn type_name(self, kind: FieldKind) -> &'static str {
        match (self, kind) {
            (CompositeLayout::Unified, _) => "pint_field",
            (CompositeLayout::PerKind, FieldKind::Integer) => "integer_pint_field",
            (CompositeLayout::PerKind, FieldKind::BigInteger) => "big_integer_pint_field",
            (CompositeLayout::PerKind, FieldKind::Decimal) => "decimal_pint_field",
        }
    }

    /// Kind of the magnitude column actually stored in the database.
    pub fn column_kind(self, kind: FieldKind) -> FieldKind {
        match self {
            CompositeLayout::Unified => FieldKind::Decimal,
            CompositeLayout::PerKind => kind,
        }
    }
}

/// Column declaration as written in a model definition or TOML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldSpec {
    pub default_unit: String,

    #[serde(default)]
    pub kind: FieldKind,

    #[serde(default)]
    pub unit_choices: Vec<UnitChoice>,

    // Null is rejected unless this is false
    #[serde(default = "default_true")]
    pub required: bool,

    // Empty-but-present input is accepted only when true
    #[serde(default)]
    pub blank: bool,

    // Bounds on the magnitude expressed in `default_unit`
    #[serde(default)]
    pub min_value: Option<String>,
    #[serde(default)]
    pub max_value: Option<String>,

    #[serde(default)]
    pub allow_rounding: bool,

    // Legacy storage quantize for decimal magnitudes
    #[serde(default)]
    pub decimal_places: Option<u32>,

    #[serde(default)]
    pub display_decimal_places: Option<u32>,

    #[serde(default)]
    pub rounding_method: RoundingMethod,

    #[serde(default)]
    pub composite_layout: CompositeLayout,
}

fn default_true() -> bool {
    true
}

impl FieldSpec {
    pub fn new(default_unit: &str, kind: FieldKind) -> Self {
        Self {
            default_unit: default_unit.to_string(),
            kind,
            unit_choices: Vec::new(),
            required: true,
            blank: false,
            min_value: None,
            max_value: None,
            allow_rounding: false,
            decimal_places: None,
            display_decimal_places: None,
            rounding_method: RoundingMethod::default(),
            composite_layout: CompositeLayout::default(),
        }
    }
}

/// A validated, immutable column configuration shared by every row.
#[derive(Debug, Clone)]
pub struct FieldConfig {
    context: QuantityContext,
    default_unit: Unit,
    kind: FieldKind,
    unit_choices: Vec<(String, String)>,
    required: bool,
    blank: bool,
    min_value: Option<BigDecimal>,
    max_value: Option<BigDecimal>,
    allow_rounding: bool,
    decimal_places: Option<u32>,
    display_decimal_places: Option<u32>,
    rounding_method: RoundingMethod,
    layout: CompositeLayout,
}

impl FieldConfig {
    pub fn new(spec: &FieldSpec, context: &QuantityContext) -> Result<Self> {
        let registry = context.registry();
        let default_unit = registry.resolve(&spec.default_unit)?;
        let unit_choices =
            validation::validate_unit_choices(&spec.unit_choices, &spec.default_unit, registry)?;

        let bound = |name: &str, text: &Option<String>| -> Result<Option<BigDecimal>> {
            text.as_deref()
                .map(|t| {
                    numeric::parse_decimal(t).ok_or_else(|| {
                        Error::Config(format!("{} '{}' is not a number", name, t))
                    })
                })
                .transpose()
        };
        let min_value = bound("min_value", &spec.min_value)?;
        let max_value = bound("max_value", &spec.max_value)?;
        if let (Some(min), Some(max)) = (&min_value, &max_value) {
            if min > max {
                return Err(Error::Config(format!(
                    "min_value {} is greater than max_value {}",
                    min, max
                )));
            }
        }

        if spec.kind.is_integral()
            && (spec.decimal_places.is_some() || spec.display_decimal_places.is_some())
        {
            return Err(Error::Config(format!(
                "decimal places only apply to decimal fields, not {}",
                spec.kind
            )));
        }

        log::debug!(
            "Configured {} field in '{}' ({} unit choices)",
            spec.kind,
            default_unit,
            unit_choices.len()
        );

        Ok(Self {
            context: context.clone(),
            default_unit,
            kind: spec.kind,
            unit_choices,
            required: spec.required,
            blank: spec.blank,
            min_value,
            max_value,
            allow_rounding: spec.allow_rounding,
            decimal_places: spec.decimal_places,
            display_decimal_places: spec.display_decimal_places,
            rounding_method: spec.rounding_method,
            layout: spec.composite_layout,
        })
    }

    pub fn context(&self) -> &QuantityContext {
        &self.context
    }

    pub fn registry(&self) -> &UnitRegistry {
        self.context.registry()
    }

    pub fn precision(&self) -> u64 {
        self.context.precision()
    }

    pub fn default_unit(&self) -> &Unit {
        &self.default_unit
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Normalised `(display, value)` pairs, default unit first.
    pub fn unit_choices(&self) -> &[(String, String)] {
        &self.unit_choices
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn blank(&self) -> bool {
        self.blank
    }

    pub fn min_value(&self) -> Option<&BigDecimal> {
        self.min_value.as_ref()
    }

    pub fn max_value(&self) -> Option<&BigDecimal> {
        self.max_value.as_ref()
    }

    pub fn allow_rounding(&self) -> bool {
        self.allow_rounding
    }

    pub fn decimal_places(&self) -> Option<u32> {
        self.decimal_places
    }

    pub fn display_decimal_places(&self) -> Option<u32> {
        self.display_decimal_places
    }

    pub fn rounding_method(&self) -> RoundingMethod {
        self.rounding_method
    }

    pub fn layout(&self) -> CompositeLayout {
        self.layout
    }

    pub fn type_name(&self) -> &'static str {
        self.layout.type_name(self.kind)
    }
}
