use crate::dim::error::DimError;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The seven base dimensions, in the order they are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseDimension {
    Mass,
    Length,
    Time,
    Temperature,
    Substance,
    Current,
    Luminosity,
}

impl BaseDimension {
    pub const ALL: [BaseDimension; 7] = [
        BaseDimension::Mass,
        BaseDimension::Length,
        BaseDimension::Time,
        BaseDimension::Temperature,
        BaseDimension::Substance,
        BaseDimension::Current,
        BaseDimension::Luminosity,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            BaseDimension::Mass => "[mass]",
            BaseDimension::Length => "[length]",
            BaseDimension::Time => "[time]",
            BaseDimension::Temperature => "[temperature]",
            BaseDimension::Substance => "[substance]",
            BaseDimension::Current => "[current]",
            BaseDimension::Luminosity => "[luminosity]",
        }
    }
}

/// Physical dimension as integer exponents of the base dimensions.
/// Two units are compatible iff their dimensions are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension([i8; 7]);

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension([0; 7]);

    pub fn of(base: BaseDimension) -> Self {
        let mut exponents = [0; 7];
        exponents[base.index()] = 1;
        Dimension(exponents)
    }

    pub fn exponent(&self, base: BaseDimension) -> i8 {
        self.0[base.index()]
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|e| *e == 0)
    }

    pub fn mul(&self, other: &Dimension) -> Result<Dimension, DimError> {
        let mut exponents = self.0;
        for (e, o) in exponents.iter_mut().zip(other.0.iter()) {
            *e = e.checked_add(*o).ok_or_else(|| self.overflow())?;
        }
        Ok(Dimension(exponents))
    }

    pub fn powi(&self, power: i32) -> Result<Dimension, DimError> {
        let mut exponents = self.0;
        for e in exponents.iter_mut() {
            *e = i32::from(*e)
                .checked_mul(power)
                .and_then(|p| i8::try_from(p).ok())
                .ok_or_else(|| self.overflow())?;
        }
        Ok(Dimension(exponents))
    }

    fn overflow(&self) -> DimError {
        DimError::Parse(format!("dimension exponent overflow in {}", self))
    }

    /// Non-zero exponents in rendering order.
    pub fn terms(&self) -> impl Iterator<Item = (BaseDimension, i8)> + '_ {
        BaseDimension::ALL
            .iter()
            .map(move |b| (*b, self.exponent(*b)))
            .filter(|(_, e)| *e != 0)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }

        let render = |base: BaseDimension, exp: i8| {
            if exp == 1 {
                base.label().to_string()
            } else {
                format!("{} ** {}", base.label(), exp)
            }
        };

        let numerator: Vec<String> = self
            .terms()
            .filter(|(_, e)| *e > 0)
            .map(|(b, e)| render(b, e))
            .collect();
        let denominator: Vec<String> = self
            .terms()
            .filter(|(_, e)| *e < 0)
            .map(|(b, e)| render(b, -e))
            .collect();

        if numerator.is_empty() {
            write!(f, "1")?;
        } else {
            write!(f, "{}", numerator.join(" * "))?;
        }
        for term in denominator {
            write!(f, " / {}", term)?;
        }
        Ok(())
    }
}

/// Identity of a registry instance, used to spot quantities built
/// against a different registry than the field's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

impl RegistryId {
    pub(crate) fn next() -> Self {
        RegistryId(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry#{}", self.0)
    }
}

/// A resolved unit: canonical name, scale factor to the root units of
/// its dimension, and the dimension itself.
#[derive(Debug, Clone)]
pub struct Unit {
    pub(crate) name: String,
    pub(crate) factor: BigDecimal,
    pub(crate) dimension: Dimension,
    pub(crate) registry: RegistryId,
}

impl Unit {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Multiplier taking a magnitude in this unit to root units.
    pub fn factor(&self) -> &BigDecimal {
        &self.factor
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn registry_id(&self) -> RegistryId {
        self.registry
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.registry == other.registry && self.name == other.name
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
