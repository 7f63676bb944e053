//! Per-scale session state.
//!
//! A session lives as long as its scale object. It is mutated from two
//! places: the notification path (which applies decoded frames) and the
//! display-unit setter. Callers sharing a session across threads must put
//! it behind a single mutex, as [`crate::QnScale`] does.

use tracing::debug;

use crate::data::units::{DisplayUnit, WeightUnit};
use crate::protocol::commands::UnitCommand;
use crate::protocol::frames::{Frame, MeasurementFrame, ScaleInfo, DEFAULT_PROTOCOL_TYPE};

/// Session fields a reading is assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Hardware revision.
    pub hw_version: Option<String>,
    /// Firmware revision.
    pub sw_version: Option<String>,
    /// Unit to report for the current frame.
    pub display_unit: DisplayUnit,
}

/// Long-lived state for one scale.
#[derive(Debug, Clone)]
pub struct ScaleSession {
    address: String,
    hw_version: Option<String>,
    sw_version: Option<String>,
    /// Last unit confirmed by the scale, or requested locally.
    display_unit: Option<WeightUnit>,
    /// Set between a unit change request and the command carrying it.
    unit_update_pending: bool,
    protocol_type: u8,
}

impl ScaleSession {
    /// Create a session for the scale at `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            hw_version: None,
            sw_version: None,
            display_unit: None,
            unit_update_pending: false,
            protocol_type: DEFAULT_PROTOCOL_TYPE,
        }
    }

    /// The scale address this session was created for.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Hardware revision, if known.
    pub fn hw_version(&self) -> Option<&str> {
        self.hw_version.as_deref()
    }

    /// Firmware revision, if known.
    pub fn sw_version(&self) -> Option<&str> {
        self.sw_version.as_deref()
    }

    /// Record version strings obtained out of band (e.g. a device information service).
    pub fn set_versions(&mut self, hw_version: Option<String>, sw_version: Option<String>) {
        self.hw_version = hw_version;
        self.sw_version = sw_version;
    }

    /// Last known or requested display unit.
    pub fn display_unit(&self) -> Option<WeightUnit> {
        self.display_unit
    }

    /// Whether a unit change is waiting to be sent.
    pub fn is_unit_update_pending(&self) -> bool {
        self.unit_update_pending
    }

    /// Protocol type last reported by the scale.
    pub fn protocol_type(&self) -> u8 {
        self.protocol_type
    }

    /// Request a new display unit.
    ///
    /// The unit is visible through [`display_unit`](Self::display_unit)
    /// immediately; nothing is transmitted until a command is generated
    /// from [`pending_unit_command`](Self::pending_unit_command).
    pub fn request_unit_change(&mut self, unit: WeightUnit) {
        debug!(address = %self.address, %unit, "Unit change requested");
        self.display_unit = Some(unit);
        self.unit_update_pending = true;
    }

    /// Build the command for a pending unit change, if any.
    pub fn pending_unit_command(&self) -> Option<UnitCommand> {
        match (self.unit_update_pending, self.display_unit) {
            (true, Some(unit)) => Some(UnitCommand::new(self.protocol_type, unit)),
            _ => None,
        }
    }

    /// Clear the pending flag once the command has been handed to the transport.
    pub fn mark_unit_command_sent(&mut self) {
        self.unit_update_pending = false;
    }

    /// Merge a decoded frame into the session and return the fields for its reading.
    pub fn apply(&mut self, frame: &Frame) -> SessionView {
        match frame {
            Frame::Info(info) => self.apply_info(info),
            Frame::Measurement(measurement) => self.apply_measurement(measurement),
        }
    }

    fn apply_info(&mut self, info: &ScaleInfo) -> SessionView {
        self.protocol_type = info.protocol_type;
        self.hw_version = Some(info.hw_version.clone());
        self.sw_version = Some(info.sw_version.clone());
        debug!(
            address = %self.address,
            hw = %info.hw_version,
            sw = %info.sw_version,
            "Scale info received"
        );

        self.view(None)
    }

    fn apply_measurement(&mut self, frame: &MeasurementFrame) -> SessionView {
        if let Some(protocol_type) = frame.protocol_type {
            self.protocol_type = protocol_type;
        }

        let frame_unit = frame
            .measurements
            .display_unit_code()
            .map(DisplayUnit::from_code);

        // A pending request wins over whatever the scale still shows.
        if !self.unit_update_pending {
            if let Some(DisplayUnit::Known(unit)) = frame_unit {
                if self.display_unit != Some(unit) {
                    debug!(address = %self.address, %unit, "Display unit confirmed");
                }
                self.display_unit = Some(unit);
            }
        }

        self.view(frame_unit)
    }

    fn view(&self, frame_unit: Option<DisplayUnit>) -> SessionView {
        let display_unit = match (self.unit_update_pending, frame_unit, self.display_unit) {
            (true, _, Some(requested)) => requested.into(),
            (_, Some(reported), _) => reported,
            (_, None, Some(known)) => known.into(),
            // QN weight frames report kilograms.
            (_, None, None) => WeightUnit::Kg.into(),
        };

        SessionView {
            hw_version: self.hw_version.clone(),
            sw_version: self.sw_version.clone(),
            display_unit,
        }
    }
}
