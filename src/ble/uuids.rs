//! BLE Service UUIDs.
//!
//! Contains the service UUIDs advertised by QN/Etekcity scales.

use uuid::Uuid;

/// QN scale service UUID.
pub const QN_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_ffe0_0000_1000_8000_00805f9b34fb);

/// Etekcity scale service UUID.
pub const ETEKCITY_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_fff0_0000_1000_8000_00805f9b34fb);

/// Services that carry scale frames.
pub const SCALE_SERVICE_UUIDS: [Uuid; 2] = [QN_SERVICE_UUID, ETEKCITY_SERVICE_UUID];

/// Check if a service UUID belongs to a supported scale.
pub fn is_scale_service(uuid: &Uuid) -> bool {
    SCALE_SERVICE_UUIDS.contains(uuid)
}
