//! Units of measure and conversion factors

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Unit in which a raw item is stocked or a recipe quantity is expressed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MeasureUnit {
    G,
    Ml,
    Pcs,
    Kg,
    L,
}

impl MeasureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureUnit::G => "g",
            MeasureUnit::Ml => "ml",
            MeasureUnit::Pcs => "pcs",
            MeasureUnit::Kg => "kg",
            MeasureUnit::L => "l",
        }
    }
}

impl fmt::Display for MeasureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MeasureUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "g" => Ok(MeasureUnit::G),
            "ml" => Ok(MeasureUnit::Ml),
            "pcs" => Ok(MeasureUnit::Pcs),
            "kg" => Ok(MeasureUnit::Kg),
            "l" => Ok(MeasureUnit::L),
            _ => Err(DomainError::UnknownVariant {
                kind: "unit",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for MeasureUnit {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Tenant-defined conversion: `1 from_unit = factor to_unit`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitConversion {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub from_unit: MeasureUnit,
    pub to_unit: MeasureUnit,
    pub factor: Decimal,
}

/// Metric pairs that never need a tenant row
fn builtin_factor(from: MeasureUnit, to: MeasureUnit) -> Option<Decimal> {
    let thousand = Decimal::from(1000);
    match (from, to) {
        (MeasureUnit::Kg, MeasureUnit::G) | (MeasureUnit::L, MeasureUnit::Ml) => Some(thousand),
        (MeasureUnit::G, MeasureUnit::Kg) | (MeasureUnit::Ml, MeasureUnit::L) => {
            Some(Decimal::ONE / thousand)
        }
        _ => None,
    }
}

/// Lookup table of conversion factors available to one tenant.
///
/// Resolution order: identical units, a direct tenant row, the inverse of a
/// tenant row, then the built-in metric pairs. Anything else is an error;
/// quantities in mismatched units are never multiplied as if they matched.
#[derive(Debug, Clone, Default)]
pub struct ConversionTable {
    factors: HashMap<(MeasureUnit, MeasureUnit), Decimal>,
}

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_conversions<'a, I>(conversions: I) -> Self
    where
        I: IntoIterator<Item = &'a UnitConversion>,
    {
        let mut table = Self::new();
        for c in conversions {
            table.insert(c.from_unit, c.to_unit, c.factor);
        }
        table
    }

    /// Register a factor; non-positive factors are ignored
    pub fn insert(&mut self, from: MeasureUnit, to: MeasureUnit, factor: Decimal) {
        if factor > Decimal::ZERO && from != to {
            self.factors.insert((from, to), factor);
        }
    }

    /// Factor to multiply a quantity in `from` by to express it in `to`
    pub fn factor(&self, from: MeasureUnit, to: MeasureUnit) -> Result<Decimal, DomainError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        if let Some(f) = self.factors.get(&(from, to)) {
            return Ok(*f);
        }
        if let Some(f) = self.factors.get(&(to, from)) {
            return Ok(Decimal::ONE / *f);
        }
        builtin_factor(from, to).ok_or(DomainError::UnitConversionMissing { from, to })
    }

    pub fn convert(
        &self,
        quantity: Decimal,
        from: MeasureUnit,
        to: MeasureUnit,
    ) -> Result<Decimal, DomainError> {
        quantity
            .checked_mul(self.factor(from, to)?)
            .ok_or(DomainError::QuantityOverflow)
    }
}
