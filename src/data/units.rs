//! Display units reported by and sent to the scale.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::utils::{kilograms_to_pounds, kilograms_to_stones};

/// A unit the scale can show on its display.
///
/// Each unit carries the code used on the wire in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum WeightUnit {
    /// Kilograms (wire code 0).
    Kg = 0,
    /// Pounds (wire code 1).
    Lb = 1,
    /// Stones (wire code 2).
    St = 2,
}

impl WeightUnit {
    /// All units, in wire-code order.
    pub const ALL: [WeightUnit; 3] = [Self::Kg, Self::Lb, Self::St];

    /// Map a wire code to a unit, if recognized.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Kg),
            1 => Some(Self::Lb),
            2 => Some(Self::St),
            _ => None,
        }
    }

    /// The wire code for this unit.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Multiplier converting a kilogram value into this unit.
    pub fn factor_from_kilograms(&self) -> f64 {
        match self {
            Self::Kg => 1.0,
            Self::Lb => kilograms_to_pounds(1.0),
            Self::St => kilograms_to_stones(1.0),
        }
    }

    /// Reinterpret a kilogram weight in this unit.
    pub fn convert_kilograms(&self, kilograms: f64) -> f64 {
        match self {
            Self::Kg => kilograms,
            Self::Lb => kilograms_to_pounds(kilograms),
            Self::St => kilograms_to_stones(kilograms),
        }
    }

    /// Short unit symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::Lb => "lb",
            Self::St => "st",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for WeightUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" => Ok(Self::Kg),
            "lb" => Ok(Self::Lb),
            "st" => Ok(Self::St),
            _ => Err(Error::InvalidParameter {
                name: "unit".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// The display unit attached to a reading.
///
/// Unknown wire codes are carried through rather than mapped to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayUnit {
    /// A unit this crate understands.
    Known(WeightUnit),
    /// A code the scale sent that maps to no known unit.
    Unrecognized(u8),
}

impl DisplayUnit {
    /// Map a wire code, keeping unknown codes as [`DisplayUnit::Unrecognized`].
    pub fn from_code(code: u8) -> Self {
        match WeightUnit::from_code(code) {
            Some(unit) => Self::Known(unit),
            None => Self::Unrecognized(code),
        }
    }

    /// The recognized unit, if any.
    pub fn weight_unit(&self) -> Option<WeightUnit> {
        match self {
            Self::Known(unit) => Some(*unit),
            Self::Unrecognized(_) => None,
        }
    }

    /// Check whether the code was recognized.
    pub fn is_recognized(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl From<WeightUnit> for DisplayUnit {
    fn from(unit: WeightUnit) -> Self {
        Self::Known(unit)
    }
}

impl PartialEq<WeightUnit> for DisplayUnit {
    fn eq(&self, other: &WeightUnit) -> bool {
        self.weight_unit() == Some(*other)
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(unit) => write!(f, "{}", unit),
            Self::Unrecognized(code) => write!(f, "unrecognized({:#04x})", code),
        }
    }
}
