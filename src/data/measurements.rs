//! Per-frame measurement mapping.
//!
//! A key that is absent means the frame did not carry that value. Zero is a
//! legitimate reading and is never used as a placeholder.

use std::collections::BTreeMap;
use std::fmt;

/// The kind of value a frame can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MeasurementKind {
    /// Weight in kilograms.
    Weight,
    /// Primary body impedance in ohms.
    Impedance,
    /// Secondary resistance channel in ohms.
    SecondaryImpedance,
    /// Raw display-unit code as sent by the scale.
    DisplayUnit,
}

impl MeasurementKind {
    /// Stable string key for this kind.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Impedance => "impedance",
            Self::SecondaryImpedance => "impedance2",
            Self::DisplayUnit => "display_unit",
        }
    }

    /// Look up a kind by its string key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "weight" => Some(Self::Weight),
            "impedance" => Some(Self::Impedance),
            "impedance2" => Some(Self::SecondaryImpedance),
            "display_unit" => Some(Self::DisplayUnit),
            _ => None,
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Values decoded from a single frame, keyed by kind.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurements {
    values: BTreeMap<MeasurementKind, f64>,
}

impl Measurements {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value, replacing any previous value of the same kind.
    pub fn insert(&mut self, kind: MeasurementKind, value: f64) {
        self.values.insert(kind, value);
    }

    /// Get the value of a kind, if present.
    pub fn get(&self, kind: MeasurementKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    /// Get a value by its string key (`"weight"`, `"impedance"`, ...).
    pub fn get_by_key(&self, key: &str) -> Option<f64> {
        MeasurementKind::from_key(key).and_then(|kind| self.get(kind))
    }

    /// Check whether a kind is present.
    pub fn contains(&self, kind: MeasurementKind) -> bool {
        self.values.contains_key(&kind)
    }

    /// Weight in kilograms.
    pub fn weight(&self) -> Option<f64> {
        self.get(MeasurementKind::Weight)
    }

    /// Primary impedance in ohms.
    pub fn impedance(&self) -> Option<u16> {
        self.get(MeasurementKind::Impedance).map(|v| v as u16)
    }

    /// Secondary resistance channel in ohms.
    pub fn secondary_impedance(&self) -> Option<u16> {
        self.get(MeasurementKind::SecondaryImpedance)
            .map(|v| v as u16)
    }

    /// Raw display-unit code.
    pub fn display_unit_code(&self) -> Option<u8> {
        self.get(MeasurementKind::DisplayUnit).map(|v| v as u8)
    }

    /// Number of values present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether no values are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over present values in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (MeasurementKind, f64)> + '_ {
        self.values.iter().map(|(kind, value)| (*kind, *value))
    }
}

impl FromIterator<(MeasurementKind, f64)> for Measurements {
    fn from_iter<I: IntoIterator<Item = (MeasurementKind, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl std::ops::Index<MeasurementKind> for Measurements {
    type Output = f64;

    fn index(&self, kind: MeasurementKind) -> &f64 {
        &self.values[&kind]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_not_zero() {
        let mut m = Measurements::new();
        m.insert(MeasurementKind::Weight, 0.0);

        assert_eq!(m.weight(), Some(0.0));
        assert_eq!(m.impedance(), None);
        assert!(!m.contains(MeasurementKind::Impedance));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_key_lookup() {
        let m: Measurements = [
            (MeasurementKind::Weight, 72.4),
            (MeasurementKind::Impedance, 512.0),
            (MeasurementKind::DisplayUnit, 1.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(m.get_by_key("weight"), Some(72.4));
        assert_eq!(m.impedance(), Some(512));
        assert_eq!(m.display_unit_code(), Some(1));
        assert_eq!(m.get_by_key("impedance2"), None);
        assert_eq!(m.get_by_key("bogus"), None);
        assert_eq!(m[MeasurementKind::Weight], 72.4);
    }

    #[test]
    fn test_kind_keys_roundtrip() {
        for kind in [
            MeasurementKind::Weight,
            MeasurementKind::Impedance,
            MeasurementKind::SecondaryImpedance,
            MeasurementKind::DisplayUnit,
        ] {
            assert_eq!(MeasurementKind::from_key(kind.key()), Some(kind));
        }
    }

    #[test]
    fn test_iter_in_kind_order() {
        let m: Measurements = [
            (MeasurementKind::DisplayUnit, 0.0),
            (MeasurementKind::Weight, 1.0),
        ]
        .into_iter()
        .collect();

        let kinds: Vec<_> = m.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![MeasurementKind::Weight, MeasurementKind::DisplayUnit]);
    }
}
