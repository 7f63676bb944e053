//! btleplug-backed advertisement receiver.
//!
//! Scans for advertisements from a single scale and forwards every
//! manufacturer-data payload, and service-data payloads of the scale
//! services, to the notification callback.

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use crate::ble::receiver::{
    Advertisement, AdvertisementReceiver, NotificationCallback, ReceiverFactory,
};
use crate::ble::uuids::{is_scale_service, SCALE_SERVICE_UUIDS};
use crate::error::{Error, Result};

/// Configuration for [`BtleplugReceiver`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReceiverConfig {
    /// Service UUIDs passed to the platform scan filter. Empty scans everything.
    pub services: Vec<Uuid>,
    /// Only forward advertisements whose local name starts with this prefix.
    pub name_prefix: Option<String>,
    /// How often the event loop checks for a stop request.
    pub poll_interval: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            name_prefix: None,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ReceiverConfig {
    /// Configuration that asks the platform to report only scale services.
    ///
    /// Some platforms only match service UUIDs present in the advertisement
    /// itself; scales that advertise bare manufacturer data are then missed.
    pub fn scales() -> Self {
        Self::default().with_services(SCALE_SERVICE_UUIDS)
    }

    /// Restrict the platform scan to the given services.
    pub fn with_services(mut self, services: impl IntoIterator<Item = Uuid>) -> Self {
        self.services = services.into_iter().collect();
        self
    }

    /// Only forward devices whose name starts with `prefix`.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }
}

/// Rebuild the raw frame from a manufacturer-data entry.
///
/// btleplug splits the first two payload bytes off as a little-endian
/// company identifier; scale frames use those bytes as their header.
///
/// # Arguments
///
/// * `company_id` - The company identifier reported by btleplug
/// * `data` - The remaining manufacturer-data bytes
///
/// # Returns
///
/// The frame as the scale sent it
pub fn manufacturer_frame(company_id: u16, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() + 2);
    frame.extend_from_slice(&company_id.to_le_bytes());
    frame.extend_from_slice(data);
    frame
}

/// Keep the service-data payloads published under a scale service.
fn scale_service_frames(service_data: HashMap<Uuid, Vec<u8>>) -> Vec<Vec<u8>> {
    service_data
        .into_iter()
        .filter(|(uuid, _)| is_scale_service(uuid))
        .map(|(_, data)| data)
        .collect()
}

/// Wait for the event loop to finish, reporting a panicked or cancelled task.
async fn join_scan_task(handle: tokio::task::JoinHandle<()>) -> Result<()> {
    handle.await.map_err(|e| {
        error!("Scan event loop failed: {}", e);
        Error::Transport {
            reason: format!("scan task failed: {}", e),
        }
    })
}

fn address_matches(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

fn name_matches(prefix: Option<&str>, name: &str) -> bool {
    prefix.map_or(true, |prefix| name.starts_with(prefix))
}

/// Advertisement receiver for one scale, backed by the first Bluetooth adapter.
pub struct BtleplugReceiver {
    config: ReceiverConfig,
    address: String,
    callback: NotificationCallback,
    /// Adapter in use while scanning.
    adapter: Arc<RwLock<Option<Adapter>>>,
    /// Whether scanning is currently active.
    is_scanning: Arc<RwLock<bool>>,
    /// Handle to the event loop task.
    scan_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl BtleplugReceiver {
    /// Create a receiver for `address`. No Bluetooth resources are acquired until `start`.
    pub fn new(
        config: ReceiverConfig,
        address: impl Into<String>,
        callback: NotificationCallback,
    ) -> Self {
        Self {
            config,
            address: address.into(),
            callback,
            adapter: Arc::new(RwLock::new(None)),
            is_scanning: Arc::new(RwLock::new(false)),
            scan_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Check if currently scanning.
    pub fn is_scanning(&self) -> bool {
        *self.is_scanning.read()
    }

    async fn first_adapter() -> Result<Adapter> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(adapter)
    }

    async fn handle_event(
        event: CentralEvent,
        adapter: &Adapter,
        address: &str,
        config: &ReceiverConfig,
        callback: &NotificationCallback,
    ) {
        let (id, frames): (PeripheralId, Vec<Vec<u8>>) = match event {
            CentralEvent::ManufacturerDataAdvertisement {
                id,
                manufacturer_data,
            } => {
                let frames: Vec<Vec<u8>> = manufacturer_data
                    .iter()
                    .map(|(company_id, data)| manufacturer_frame(*company_id, data))
                    .collect();
                (id, frames)
            }
            CentralEvent::ServiceDataAdvertisement { id, service_data } => {
                (id, scale_service_frames(service_data))
            }
            _ => return,
        };

        if frames.is_empty() {
            return;
        }

        let Some((device_address, name)) = Self::identify(adapter, &id).await else {
            return;
        };

        if !address_matches(address, &device_address)
            || !name_matches(config.name_prefix.as_deref(), &name)
        {
            return;
        }

        for frame in frames {
            trace!("Frame from {}: {:02X?}", device_address, frame);
            callback(&Advertisement::new(frame, name.clone(), device_address.clone()));
        }
    }

    /// Look up the address and local name of a peripheral.
    async fn identify(adapter: &Adapter, id: &PeripheralId) -> Option<(String, String)> {
        let peripheral = match adapter.peripheral(id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return None;
            }
        };

        let properties = peripheral.properties().await.ok()??;
        Some((
            properties.address.to_string(),
            properties.local_name.unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl AdvertisementReceiver for BtleplugReceiver {
    async fn start(&self) -> Result<()> {
        if self.is_scanning() {
            return Err(Error::AlreadyRunning);
        }

        let adapter = Self::first_adapter().await?;

        info!("Starting BLE scan for scale {}", self.address);

        adapter
            .start_scan(ScanFilter {
                services: self.config.services.clone(),
            })
            .await?;

        *self.is_scanning.write() = true;
        *self.adapter.write() = Some(adapter.clone());

        let address = self.address.clone();
        let config = self.config.clone();
        let callback = self.callback.clone();
        let is_scanning = self.is_scanning.clone();

        let handle = tokio::spawn(async move {
            let mut events = match adapter.events().await {
                Ok(events) => events,
                Err(e) => {
                    error!("Failed to get adapter events: {}", e);
                    return;
                }
            };

            while *is_scanning.read() {
                tokio::select! {
                    Some(event) = events.next() => {
                        Self::handle_event(event, &adapter, &address, &config, &callback).await;
                    }
                    _ = tokio::time::sleep(config.poll_interval) => {}
                }
            }

            debug!("Scan event loop ended");
        });

        *self.scan_handle.write() = Some(handle);

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.is_scanning() {
            return Err(Error::NotRunning);
        }

        info!("Stopping BLE scan for scale {}", self.address);

        *self.is_scanning.write() = false;

        let adapter = self.adapter.write().take();
        if let Some(adapter) = adapter {
            adapter.stop_scan().await?;
        }

        let handle = self.scan_handle.write().take();
        match handle {
            Some(handle) => join_scan_task(handle).await,
            None => Ok(()),
        }
    }
}

impl Drop for BtleplugReceiver {
    fn drop(&mut self) {
        *self.is_scanning.write() = false;
    }
}

/// Factory producing [`BtleplugReceiver`]s with a shared configuration.
#[derive(Debug, Clone, Default)]
pub struct BtleplugReceiverFactory {
    config: ReceiverConfig,
}

impl BtleplugReceiverFactory {
    /// Create a factory with the given configuration.
    pub fn new(config: ReceiverConfig) -> Self {
        Self { config }
    }
}

impl ReceiverFactory for BtleplugReceiverFactory {
    fn create(
        &self,
        address: &str,
        callback: NotificationCallback,
    ) -> Result<Box<dyn AdvertisementReceiver>> {
        Ok(Box::new(BtleplugReceiver::new(
            self.config.clone(),
            address,
            callback,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::{ETEKCITY_SERVICE_UUID, QN_SERVICE_UUID};
    use crate::protocol::decode;
    use crate::protocol::frames::fixtures::QN_WEIGHT_1KG;

    #[test]
    fn test_manufacturer_frame_restores_header() {
        // 0x0b10 little-endian is the `10 0b` header of a QN weight frame.
        let frame = manufacturer_frame(
            0x0b10,
            &[0xff, 0x00, 0x64, 0x01, 0x00, 0x00, 0x00, 0x00, 0xcf],
        );
        assert_eq!(frame[..2], [0x10, 0x0b]);
        assert_eq!(decode(&frame).unwrap().weight(), Some(1.0));
    }

    #[test]
    fn test_address_matches() {
        assert!(address_matches("00:11:22:AA:BB:CC", "00:11:22:aa:bb:cc"));
        assert!(!address_matches("00:11:22:AA:BB:CC", "00:11:22:AA:BB:CD"));
    }

    #[test]
    fn test_name_matches() {
        assert!(name_matches(None, ""));
        assert!(name_matches(Some("QN-"), "QN-Scale"));
        assert!(!name_matches(Some("QN-"), "Etekcity"));
    }

    #[test]
    fn test_receiver_config() {
        let config = ReceiverConfig::default();
        assert!(config.services.is_empty());
        assert_eq!(config.poll_interval, Duration::from_millis(100));

        let config = config
            .with_services([QN_SERVICE_UUID])
            .with_name_prefix("QN-");
        assert_eq!(config.services, vec![QN_SERVICE_UUID]);
        assert_eq!(config.name_prefix.as_deref(), Some("QN-"));
    }

    #[test]
    fn test_scales_config() {
        let config = ReceiverConfig::scales();
        assert_eq!(config.services, vec![QN_SERVICE_UUID, ETEKCITY_SERVICE_UUID]);
        assert_eq!(config.name_prefix, None);
    }

    #[test]
    fn test_service_data_filtered_to_scale_services() {
        let battery = Uuid::from_u128(0x0000_180f_0000_1000_8000_00805f9b34fb);
        let service_data = HashMap::from([
            (QN_SERVICE_UUID, QN_WEIGHT_1KG.to_vec()),
            (battery, vec![0x64]),
        ]);

        let frames = scale_service_frames(service_data);
        assert_eq!(frames, vec![QN_WEIGHT_1KG.to_vec()]);
    }

    #[tokio::test]
    async fn test_join_scan_task() {
        let finished = tokio::spawn(async {});
        assert!(join_scan_task(finished).await.is_ok());

        let panicked = tokio::spawn(async { panic!("observer failed") });
        assert!(matches!(
            join_scan_task(panicked).await,
            Err(Error::Transport { .. })
        ));
    }

    #[test]
    fn test_receiver_not_scanning_until_started() {
        let receiver = BtleplugReceiver::new(
            ReceiverConfig::default(),
            "00:11:22:33:44:55",
            Arc::new(|_: &Advertisement| {}),
        );
        assert!(!receiver.is_scanning());
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let receiver = BtleplugReceiver::new(
            ReceiverConfig::default(),
            "00:11:22:33:44:55",
            Arc::new(|_: &Advertisement| {}),
        );
        assert!(matches!(receiver.stop().await, Err(Error::NotRunning)));
    }
}
