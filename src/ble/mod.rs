//! BLE transport module.
//!
//! This module provides the receiver seam the scale depends on and a
//! btleplug-backed implementation of it.

pub mod receiver;
pub mod scanner;
pub mod uuids;

pub use receiver::{Advertisement, AdvertisementReceiver, NotificationCallback, ReceiverFactory};
pub use scanner::{BtleplugReceiver, BtleplugReceiverFactory, ReceiverConfig};
pub use uuids::*;
