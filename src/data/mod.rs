//! Data structures for scale readings.
//!
//! This module contains the unit, measurement, reading and session types
//! shared by the decoder and the notification path.

pub mod measurements;
pub mod reading;
pub mod session;
pub mod units;

pub use measurements::{MeasurementKind, Measurements};
pub use reading::ScaleData;
pub use session::{ScaleSession, SessionView};
pub use units::{DisplayUnit, WeightUnit};
