//! Error types for the qn-scale-ble crate.

use thiserror::Error;

use crate::protocol::frames::DecodeError;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// `async_start` was called while the receiver is already running.
    #[error("Advertisement receiver already running")]
    AlreadyRunning,

    /// `async_stop` was called without a running receiver.
    #[error("Advertisement receiver not running")]
    NotRunning,

    /// A frame could not be decoded.
    #[error("Frame decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The advertisement transport failed.
    #[error("Transport error: {reason}")]
    Transport {
        /// Description of the transport failure.
        reason: String,
    },

    /// A command frame could not be delivered to the scale.
    #[error("Command delivery failed: {reason}")]
    CommandFailed {
        /// Description of why the command was not delivered.
        reason: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
