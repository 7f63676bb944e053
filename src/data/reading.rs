//! The externally visible reading delivered to observers.

use chrono::{DateTime, Utc};

use crate::data::measurements::Measurements;
use crate::data::units::DisplayUnit;

/// One reading from a scale, built per successfully decoded frame.
///
/// `measurements` holds only the values of the frame that produced this
/// reading; nothing is accumulated across frames.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleData {
    /// Advertised device name.
    pub name: String,
    /// Device address as reported by the transport.
    pub address: String,
    /// Hardware revision, if the scale has announced it.
    pub hw_version: Option<String>,
    /// Firmware revision, if the scale has announced it.
    pub sw_version: Option<String>,
    /// Unit shown on the scale display.
    pub display_unit: DisplayUnit,
    /// Values decoded from this frame.
    pub measurements: Measurements,
    /// When the reading was assembled.
    pub timestamp: DateTime<Utc>,
}

impl ScaleData {
    /// Weight in kilograms, if the frame carried one.
    pub fn weight(&self) -> Option<f64> {
        self.measurements.weight()
    }

    /// Weight converted to the display unit.
    ///
    /// Falls back to kilograms when the display unit is unrecognized.
    pub fn weight_in_display_unit(&self) -> Option<f64> {
        let kilograms = self.weight()?;
        Some(match self.display_unit.weight_unit() {
            Some(unit) => unit.convert_kilograms(kilograms),
            None => kilograms,
        })
    }

    /// Primary impedance in ohms, if measured.
    pub fn impedance(&self) -> Option<u16> {
        self.measurements.impedance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MeasurementKind, WeightUnit};

    fn reading(unit: DisplayUnit, weight: Option<f64>) -> ScaleData {
        let mut measurements = Measurements::new();
        if let Some(weight) = weight {
            measurements.insert(MeasurementKind::Weight, weight);
        }
        ScaleData {
            name: "QN-Scale".to_string(),
            address: "00:11:22:33:44:55".to_string(),
            hw_version: None,
            sw_version: None,
            display_unit: unit,
            measurements,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_weight_in_display_unit() {
        let kg = reading(WeightUnit::Kg.into(), Some(50.0));
        assert_eq!(kg.weight_in_display_unit(), Some(50.0));

        let lb = reading(WeightUnit::Lb.into(), Some(50.0));
        assert!((lb.weight_in_display_unit().unwrap() - 110.231131).abs() < 0.0001);

        let unknown = reading(DisplayUnit::Unrecognized(9), Some(50.0));
        assert_eq!(unknown.weight_in_display_unit(), Some(50.0));
    }

    #[test]
    fn test_missing_weight() {
        let r = reading(WeightUnit::St.into(), None);
        assert_eq!(r.weight(), None);
        assert_eq!(r.weight_in_display_unit(), None);
        assert_eq!(r.impedance(), None);
    }
}
