//! Protocol module for decoding and constructing scale frames.
//!
//! This module contains the implementations for:
//! - Inbound frame decoding
//! - Outbound unit command construction
//! - Additive checksum calculation

pub mod checksum;
pub mod commands;
pub mod frames;

pub use checksum::calculate_checksum;
pub use commands::UnitCommand;
pub use frames::{decode, decode_frame, DecodeError, Frame, FrameType, MeasurementFrame, ScaleInfo};
