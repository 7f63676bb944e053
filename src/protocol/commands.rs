//! Outbound command frames.
//!
//! Format: `opcode(1) + length(1) + protocol type(1) + body + checksum(1)`,
//! where the checksum is the additive checksum of every preceding byte.

use crate::data::WeightUnit;
use crate::protocol::checksum::{append_checksum, verify_trailing_checksum};

/// Opcode of the unit configuration command.
pub const UNIT_COMMAND_OPCODE: u8 = 0x13;

/// Total length of the unit configuration command.
pub const UNIT_COMMAND_LEN: usize = 9;

/// Fixed configuration flags sent after the unit code.
const UNIT_COMMAND_FLAGS: [u8; 4] = [0x10, 0x00, 0x00, 0x00];

/// Command asking the scale to switch its display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitCommand {
    /// Protocol type last reported by the scale.
    pub protocol_type: u8,
    /// Unit to display.
    pub unit: WeightUnit,
}

impl UnitCommand {
    /// Create a new unit command.
    pub fn new(protocol_type: u8, unit: WeightUnit) -> Self {
        Self {
            protocol_type,
            unit,
        }
    }

    /// Serialize to the wire format.
    ///
    /// # Returns
    ///
    /// The nine command bytes, ending in the additive checksum
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(UNIT_COMMAND_LEN);
        body.push(UNIT_COMMAND_OPCODE);
        body.push(UNIT_COMMAND_LEN as u8);
        body.push(self.protocol_type);
        body.push(self.unit.code());
        body.extend_from_slice(&UNIT_COMMAND_FLAGS);
        append_checksum(&body)
    }

    /// Parse a serialized unit command.
    ///
    /// Returns `None` for anything that is not a well-formed unit command
    /// with a known unit code.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() != UNIT_COMMAND_LEN
            || data[0] != UNIT_COMMAND_OPCODE
            || data[1] as usize != UNIT_COMMAND_LEN
            || !verify_trailing_checksum(data)
        {
            return None;
        }

        WeightUnit::from_code(data[3]).map(|unit| Self::new(data[2], unit))
    }
}
