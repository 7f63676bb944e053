//! The advertisement receiver seam.
//!
//! The scale object only depends on this shape: something that can be
//! started and stopped and, while running, hands raw frames plus device
//! metadata to a callback.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::error::Result;

/// One raw frame delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Raw frame bytes.
    pub data: Bytes,
    /// Advertised device name.
    pub name: String,
    /// Device address.
    pub address: String,
}

impl Advertisement {
    /// Create a new advertisement event.
    pub fn new(data: impl Into<Bytes>, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Callback a receiver invokes for every frame.
pub type NotificationCallback = Arc<dyn Fn(&Advertisement) + Send + Sync>;

/// A source of advertisement frames for one device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdvertisementReceiver: Send + Sync {
    /// Begin delivering frames to the callback.
    async fn start(&self) -> Result<()>;

    /// Stop delivering frames.
    async fn stop(&self) -> Result<()>;
}

/// Creates receivers bound to a device address and a callback.
pub trait ReceiverFactory: Send + Sync {
    /// Build a receiver for `address` that feeds `callback`.
    fn create(
        &self,
        address: &str,
        callback: NotificationCallback,
    ) -> Result<Box<dyn AdvertisementReceiver>>;
}

impl<F> ReceiverFactory for F
where
    F: Fn(&str, NotificationCallback) -> Result<Box<dyn AdvertisementReceiver>> + Send + Sync,
{
    fn create(
        &self,
        address: &str,
        callback: NotificationCallback,
    ) -> Result<Box<dyn AdvertisementReceiver>> {
        self(address, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertisement_new() {
        let adv = Advertisement::new(vec![0x10, 0x0b], "QN-Scale", "00:11:22:33:44:55");
        assert_eq!(adv.data.as_ref(), &[0x10, 0x0b]);
        assert_eq!(adv.name, "QN-Scale");
        assert_eq!(adv.address, "00:11:22:33:44:55");
    }

    #[tokio::test]
    async fn test_closure_factory() {
        let factory = |_address: &str, _callback: NotificationCallback| {
            let mut receiver = MockAdvertisementReceiver::new();
            receiver.expect_start().times(1).returning(|| Ok(()));
            Ok::<_, crate::error::Error>(Box::new(receiver) as Box<dyn AdvertisementReceiver>)
        };

        let receiver = factory
            .create("00:11:22:33:44:55", Arc::new(|_: &Advertisement| {}))
            .unwrap();
        receiver.start().await.unwrap();
    }
}
