// Allow derivable impls for clarity
#![allow(clippy::derivable_impls)]
// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # qn-scale-ble
//!
//! A Rust library for decoding Bluetooth Low Energy frames from QN/Etekcity
//! body-composition scales.
//!
//! The scale advertises weight frames; this crate validates and decodes them,
//! tracks the per-scale session (firmware versions, display unit) and hands
//! one [`ScaleData`] reading per measurement frame to an observer. Changing
//! the scale's display unit is a local request that is sent with the next
//! received frame.
//!
//! ## Features
//!
//! - **Frame decoding**: QN weight/info frames and Etekcity 22-byte reports
//! - **Body composition**: Impedance channels when the scale measures them
//! - **Display units**: kg/lb/st, with unknown codes passed through
//! - **Transport seam**: Any receiver that delivers raw frames; btleplug included
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qn_scale_ble::{QnScale, Result, ScaleData, WeightUnit};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scale = QnScale::new("00:11:22:33:44:55", |reading: ScaleData| {
//!         if let Some(weight) = reading.weight() {
//!             println!("{}: {:.2} kg", reading.name, weight);
//!         }
//!     });
//!
//!     scale.set_display_unit(WeightUnit::Lb);
//!     scale.async_start().await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!
//!     scale.async_stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Decoding without a transport
//!
//! ```
//! use qn_scale_ble::protocol::decode;
//!
//! let frame = [0x10, 0x0b, 0xff, 0x00, 0x64, 0x01, 0x00, 0x00, 0x00, 0x00, 0xcf];
//! assert_eq!(decode(&frame).unwrap().weight(), Some(1.0));
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod data;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod scale;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, Result};
pub use handler::{CommandSink, NotificationHandler, ScaleObserver};
pub use scale::QnScale;
pub use utils::{kilograms_to_pounds, kilograms_to_stones, pounds_to_kilograms};

// Re-export commonly used types from submodules
pub use ble::{Advertisement, AdvertisementReceiver, ReceiverConfig, ReceiverFactory};
pub use data::{
    DisplayUnit, MeasurementKind, Measurements, ScaleData, ScaleSession, WeightUnit,
};
pub use protocol::{decode, DecodeError, UnitCommand};
