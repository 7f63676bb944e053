//! Frame decoding for QN/Etekcity scale notifications.
//!
//! Every layout has one exact length. Anything else is rejected before a
//! single field is read, so a failed decode never yields partial values.
//!
//! QN frames (11 bytes, opcode first):
//!
//! | Offset | Weight frame (`0x10`)           | Info frame (`0x12`)      |
//! |--------|---------------------------------|--------------------------|
//! | 0      | opcode                          | opcode                   |
//! | 1      | declared length (`0x0b`)        | declared length (`0x0b`) |
//! | 2      | protocol type                   | protocol type            |
//! | 3-4    | weight, u16 BE, kg x 100        | hw revision, sw revision |
//! | 5      | stable flag                     | reserved                 |
//! | 6-7    | primary resistance, u16 BE      | reserved                 |
//! | 8-9    | secondary resistance, u16 BE    | reserved                 |
//! | 10     | trailer (not verified)          | trailer (not verified)   |
//!
//! Etekcity report frame (22 bytes): `a5 02`, sequence, payload length
//! (u16 LE, 16), checksum over bytes 6..22, report marker `01 61 a1 00`,
//! weight (u24 LE, grams), impedance (u16 LE), reserved, report flag (1),
//! impedance flag, display-unit code.

use bytes::Buf;
use std::fmt;
use thiserror::Error;

use crate::data::{MeasurementKind, Measurements};
use crate::protocol::checksum::calculate_checksum;
use crate::utils::{format_revision, round_hundredths};

/// Length of every QN frame.
pub const QN_FRAME_LEN: usize = 11;

/// Length of an Etekcity report frame.
pub const ETEKCITY_FRAME_LEN: usize = 22;

/// Leading bytes of an Etekcity report frame.
pub const ETEKCITY_MAGIC: [u8; 2] = [0xA5, 0x02];

/// Marker identifying a weight report inside an Etekcity frame.
pub const ETEKCITY_REPORT_MARKER: [u8; 4] = [0x01, 0x61, 0xA1, 0x00];

/// Payload length declared in an Etekcity report header.
const ETEKCITY_PAYLOAD_LEN: u16 = 16;

/// Offset of the Etekcity header checksum.
const ETEKCITY_CHECKSUM_OFFSET: usize = 5;

/// Start of the checksummed Etekcity payload.
const ETEKCITY_PAYLOAD_OFFSET: usize = 6;

/// QN weights are kilograms x 100.
const QN_WEIGHT_DIVISOR: f64 = 100.0;

/// Etekcity weights are grams.
const ETEKCITY_WEIGHT_DIVISOR: f64 = 1000.0;

/// Protocol type assumed until the scale reports one.
pub const DEFAULT_PROTOCOL_TYPE: u8 = 0xFF;

/// Errors that can occur while decoding a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer size matches no known frame layout.
    #[error("Buffer length {len} matches no known frame layout")]
    InvalidLength {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// A magic byte, marker or declared length is wrong.
    #[error("Invalid frame marker: {context}")]
    InvalidMarker {
        /// Which marker failed.
        context: String,
    },

    /// The frame checksum does not match its payload.
    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    InvalidChecksum {
        /// Checksum computed over the payload.
        expected: u8,
        /// Checksum carried by the frame.
        actual: u8,
    },

    /// The frame is valid but carries no measurements.
    #[error("{frame_type} frame carries no measurements")]
    NotAMeasurement {
        /// The type of the decoded frame.
        frame_type: FrameType,
    },
}

/// Known inbound frame layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameType {
    /// QN live/stable weight frame (`0x10`).
    QnWeight,
    /// QN scale information frame (`0x12`).
    QnInfo,
    /// Etekcity weight report (`a5 02`).
    EtekcityReport,
}

impl FrameType {
    /// Identify a layout from the first byte of a buffer.
    pub fn from_leading_byte(byte: u8) -> Option<Self> {
        match byte {
            0x10 => Some(Self::QnWeight),
            0x12 => Some(Self::QnInfo),
            0xA5 => Some(Self::EtekcityReport),
            _ => None,
        }
    }

    /// Exact length of this layout.
    pub fn frame_len(&self) -> usize {
        match self {
            Self::QnWeight | Self::QnInfo => QN_FRAME_LEN,
            Self::EtekcityReport => ETEKCITY_FRAME_LEN,
        }
    }

    /// Human-readable layout name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::QnWeight => "QN weight",
            Self::QnInfo => "QN info",
            Self::EtekcityReport => "Etekcity report",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A frame carrying measurement values.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementFrame {
    /// Layout the frame was decoded from.
    pub frame_type: FrameType,
    /// Protocol type echoed by QN frames.
    pub protocol_type: Option<u8>,
    /// Whether the scale considers the weight settled.
    pub stable: bool,
    /// Decoded values.
    pub measurements: Measurements,
}

/// Version information announced by the scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleInfo {
    /// Protocol type the scale expects in commands.
    pub protocol_type: u8,
    /// Hardware revision, `major.minor`.
    pub hw_version: String,
    /// Firmware revision, `major.minor`.
    pub sw_version: String,
}

/// A validated, typed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Weight and body-composition values.
    Measurement(MeasurementFrame),
    /// Scale information.
    Info(ScaleInfo),
}

impl Frame {
    /// Layout the frame was decoded from.
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Measurement(m) => m.frame_type,
            Self::Info(_) => FrameType::QnInfo,
        }
    }
}

/// Decode a buffer into its measurement values.
///
/// Info frames are valid but fail with [`DecodeError::NotAMeasurement`].
///
/// # Example
///
/// ```
/// use qn_scale_ble::protocol::decode;
///
/// let frame = [0x10, 0x0b, 0xff, 0x00, 0x64, 0x01, 0x00, 0x00, 0x00, 0x00, 0xcf];
/// let measurements = decode(&frame).unwrap();
/// assert_eq!(measurements.weight(), Some(1.0));
/// assert_eq!(measurements.impedance(), None);
///
/// assert!(decode(&[0u8; 22]).is_err());
/// ```
pub fn decode(data: &[u8]) -> Result<Measurements, DecodeError> {
    match decode_frame(data)? {
        Frame::Measurement(frame) => Ok(frame.measurements),
        Frame::Info(_) => Err(DecodeError::NotAMeasurement {
            frame_type: FrameType::QnInfo,
        }),
    }
}

/// Decode a buffer into a typed frame.
///
/// The leading byte selects the layout and with it the expected length. A
/// known leading byte in a buffer sized for the other layout (`0x10` in 22
/// bytes, `0xa5` in 11) is a length error, not a marker error.
///
/// # Arguments
///
/// * `data` - One complete frame as received from the transport
///
/// # Returns
///
/// The typed frame, or the first validation failure
pub fn decode_frame(data: &[u8]) -> Result<Frame, DecodeError> {
    let Some(&leading) = data.first() else {
        return Err(DecodeError::InvalidLength { len: 0 });
    };

    let frame_type = match FrameType::from_leading_byte(leading) {
        Some(frame_type) => frame_type,
        None if data.len() == QN_FRAME_LEN || data.len() == ETEKCITY_FRAME_LEN => {
            return Err(DecodeError::InvalidMarker {
                context: format!("unknown frame type {:#04x}", leading),
            });
        }
        None => return Err(DecodeError::InvalidLength { len: data.len() }),
    };

    if data.len() != frame_type.frame_len() {
        return Err(DecodeError::InvalidLength { len: data.len() });
    }

    match frame_type {
        FrameType::QnWeight => decode_qn_weight(data).map(Frame::Measurement),
        FrameType::QnInfo => decode_qn_info(data).map(Frame::Info),
        FrameType::EtekcityReport => decode_etekcity_report(data).map(Frame::Measurement),
    }
}

fn check_declared_length(data: &[u8]) -> Result<(), DecodeError> {
    let declared = data[1] as usize;
    if declared != data.len() {
        return Err(DecodeError::InvalidMarker {
            context: format!(
                "declared length {} does not match frame length {}",
                declared,
                data.len()
            ),
        });
    }
    Ok(())
}

fn decode_qn_weight(data: &[u8]) -> Result<MeasurementFrame, DecodeError> {
    check_declared_length(data)?;

    let protocol_type = data[2];
    let mut fields = &data[3..10];
    let raw_weight = fields.get_u16();
    let stable = fields.get_u8() == 1;
    let primary = fields.get_u16();
    let secondary = fields.get_u16();

    let mut measurements = Measurements::new();
    measurements.insert(
        MeasurementKind::Weight,
        raw_weight as f64 / QN_WEIGHT_DIVISOR,
    );

    // Resistance is only measured once the weight has settled.
    if stable {
        if primary != 0 {
            measurements.insert(MeasurementKind::Impedance, primary as f64);
        }
        if secondary != 0 {
            measurements.insert(MeasurementKind::SecondaryImpedance, secondary as f64);
        }
    }

    Ok(MeasurementFrame {
        frame_type: FrameType::QnWeight,
        protocol_type: Some(protocol_type),
        stable,
        measurements,
    })
}

fn decode_qn_info(data: &[u8]) -> Result<ScaleInfo, DecodeError> {
    check_declared_length(data)?;

    Ok(ScaleInfo {
        protocol_type: data[2],
        hw_version: format_revision(data[3]),
        sw_version: format_revision(data[4]),
    })
}

fn decode_etekcity_report(data: &[u8]) -> Result<MeasurementFrame, DecodeError> {
    if data[..2] != ETEKCITY_MAGIC {
        return Err(DecodeError::InvalidMarker {
            context: format!("bad magic {:02x} {:02x}", data[0], data[1]),
        });
    }

    let payload_len = (&data[3..5]).get_u16_le();
    if payload_len != ETEKCITY_PAYLOAD_LEN {
        return Err(DecodeError::InvalidMarker {
            context: format!("declared payload length {}", payload_len),
        });
    }

    if data[6..10] != ETEKCITY_REPORT_MARKER {
        return Err(DecodeError::InvalidMarker {
            context: format!("not a weight report: {:02x?}", &data[6..10]),
        });
    }

    if data[19] != 1 {
        return Err(DecodeError::InvalidMarker {
            context: format!("report flag {:#04x}", data[19]),
        });
    }

    let expected = calculate_checksum(&data[ETEKCITY_PAYLOAD_OFFSET..]);
    let actual = data[ETEKCITY_CHECKSUM_OFFSET];
    if expected != actual {
        return Err(DecodeError::InvalidChecksum { expected, actual });
    }

    let mut fields = &data[10..15];
    let grams = fields.get_uint_le(3);
    let impedance = fields.get_u16_le();
    let impedance_present = data[20] == 1;
    let unit_code = data[21];

    let mut measurements = Measurements::new();
    measurements.insert(
        MeasurementKind::Weight,
        round_hundredths(grams as f64 / ETEKCITY_WEIGHT_DIVISOR),
    );
    measurements.insert(MeasurementKind::DisplayUnit, unit_code as f64);
    if impedance_present && impedance != 0 {
        measurements.insert(MeasurementKind::Impedance, impedance as f64);
    }

    Ok(MeasurementFrame {
        frame_type: FrameType::EtekcityReport,
        protocol_type: None,
        stable: true,
        measurements,
    })
}
