//! The scale object.
//!
//! [`QnScale`] owns the session for one scale, the notification handler
//! wired to it, and the start/stop lifecycle of the advertisement receiver.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::ble::receiver::{AdvertisementReceiver, ReceiverFactory};
use crate::ble::scanner::BtleplugReceiverFactory;
use crate::data::{ScaleSession, WeightUnit};
use crate::error::{Error, Result};
use crate::handler::{CommandSink, NotificationHandler, ScaleObserver};

/// A QN/Etekcity body-composition scale.
///
/// The session is guarded by a single mutex shared between the notification
/// path and [`set_display_unit`](Self::set_display_unit); both may run
/// concurrently.
pub struct QnScale {
    /// Scale address.
    address: String,
    /// Session shared with the handler.
    session: Arc<Mutex<ScaleSession>>,
    /// Handler wired into every receiver this scale creates.
    handler: NotificationHandler,
    /// Source of receivers.
    factory: Arc<dyn ReceiverFactory>,
    /// The active receiver, if started.
    receiver: tokio::sync::Mutex<Option<Box<dyn AdvertisementReceiver>>>,
}

impl QnScale {
    /// Create a scale that listens through the system Bluetooth adapter.
    pub fn new(address: impl Into<String>, observer: impl ScaleObserver + 'static) -> Self {
        Self::with_receiver_factory(
            address,
            observer,
            Arc::new(BtleplugReceiverFactory::default()),
        )
    }

    /// Create a scale that obtains receivers from `factory`.
    pub fn with_receiver_factory(
        address: impl Into<String>,
        observer: impl ScaleObserver + 'static,
        factory: Arc<dyn ReceiverFactory>,
    ) -> Self {
        let address = address.into();
        let session = Arc::new(Mutex::new(ScaleSession::new(address.clone())));
        let handler = NotificationHandler::new(session.clone(), Arc::new(observer));

        Self {
            address,
            session,
            handler,
            factory,
            receiver: tokio::sync::Mutex::new(None),
        }
    }

    /// Send pending unit changes through `sink`.
    ///
    /// Must be set before [`async_start`](Self::async_start); receivers
    /// created earlier keep the previous handler.
    pub fn with_command_sink(mut self, sink: impl CommandSink + 'static) -> Self {
        self.handler = self.handler.with_command_sink(Arc::new(sink));
        self
    }

    // === Identification ===

    /// Get the scale address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Get the hardware revision, if announced.
    pub fn hw_version(&self) -> Option<String> {
        self.session.lock().hw_version().map(str::to_string)
    }

    /// Get the firmware revision, if announced.
    pub fn sw_version(&self) -> Option<String> {
        self.session.lock().sw_version().map(str::to_string)
    }

    /// Record version strings obtained outside the frame stream.
    pub fn set_versions(&self, hw_version: Option<String>, sw_version: Option<String>) {
        self.session.lock().set_versions(hw_version, sw_version);
    }

    // === Display unit ===

    /// Get the last confirmed or requested display unit.
    pub fn display_unit(&self) -> Option<WeightUnit> {
        self.session.lock().display_unit()
    }

    /// Request a new display unit.
    ///
    /// Takes effect locally at once; the command goes out with the next
    /// received frame if a command sink is attached.
    pub fn set_display_unit(&self, unit: WeightUnit) {
        self.session.lock().request_unit_change(unit);
    }

    /// Check whether a unit change is waiting to be sent.
    pub fn is_unit_update_pending(&self) -> bool {
        self.session.lock().is_unit_update_pending()
    }

    /// Get a copy of the current session.
    pub fn session(&self) -> ScaleSession {
        self.session.lock().clone()
    }

    /// Get the handler, for transports that push frames directly.
    pub fn notification_handler(&self) -> &NotificationHandler {
        &self.handler
    }

    // === Lifecycle ===

    /// Check if the receiver is running.
    ///
    /// Reports `false` while a start or stop is in progress.
    pub fn is_running(&self) -> bool {
        self.receiver
            .try_lock()
            .map_or(false, |slot| slot.is_some())
    }

    /// Acquire a receiver and start delivering frames.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if already started, or the
    /// receiver's error if it fails to start.
    pub async fn async_start(&self) -> Result<()> {
        let mut slot = self.receiver.lock().await;
        if slot.is_some() {
            debug!("Receiver for {} already running", self.address);
            return Err(Error::AlreadyRunning);
        }

        info!("Starting receiver for scale {}", self.address);

        let receiver = self.factory.create(&self.address, self.handler.callback())?;
        self.handler.open();
        receiver.start().await?;

        *slot = Some(receiver);

        Ok(())
    }

    /// Stop the receiver and release it.
    ///
    /// No notification reaches the observer after this returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] if the receiver was not started, or the
    /// receiver's error if it fails to stop. The receiver is released either way.
    pub async fn async_stop(&self) -> Result<()> {
        let mut slot = self.receiver.lock().await;
        let Some(receiver) = slot.take() else {
            debug!("Receiver for {} not running", self.address);
            return Err(Error::NotRunning);
        };

        info!("Stopping receiver for scale {}", self.address);

        self.handler.close();
        receiver.stop().await
    }
}

impl std::fmt::Debug for QnScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QnScale")
            .field("address", &self.address)
            .field("session", &*self.session.lock())
            .field("is_running", &self.is_running())
            .finish()
    }
}
