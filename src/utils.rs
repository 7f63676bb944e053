//! Utility functions for the qn-scale-ble crate.

/// Pounds per kilogram.
pub const POUNDS_PER_KILOGRAM: f64 = 2.204_622_62;

/// Stones per kilogram.
pub const STONES_PER_KILOGRAM: f64 = 0.157_473_044;

/// Convert kilograms to pounds.
///
/// # Example
///
/// ```
/// use qn_scale_ble::kilograms_to_pounds;
///
/// let pounds = kilograms_to_pounds(100.0);
/// assert!((pounds - 220.462262).abs() < 0.0001);
/// ```
#[inline]
pub fn kilograms_to_pounds(kilograms: f64) -> f64 {
    kilograms * POUNDS_PER_KILOGRAM
}

/// Convert kilograms to stones.
#[inline]
pub fn kilograms_to_stones(kilograms: f64) -> f64 {
    kilograms * STONES_PER_KILOGRAM
}

/// Convert pounds to kilograms.
///
/// # Example
///
/// ```
/// use qn_scale_ble::pounds_to_kilograms;
///
/// let kilograms = pounds_to_kilograms(220.462262);
/// assert!((kilograms - 100.0).abs() < 0.0001);
/// ```
#[inline]
pub fn pounds_to_kilograms(pounds: f64) -> f64 {
    pounds / POUNDS_PER_KILOGRAM
}

/// Render a packed revision byte as `major.minor` (high nibble, low nibble).
pub(crate) fn format_revision(raw: u8) -> String {
    format!("{}.{}", raw >> 4, raw & 0x0F)
}

/// Round to two decimal places, as the scale's own display does.
#[inline]
pub(crate) fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
