//! Per-frame notification handling.
//!
//! [`NotificationHandler`] is the callback a receiver drives. For every
//! buffer it decodes the frame, merges it into the session, emits a pending
//! unit command if a sink is available, and hands one [`ScaleData`] to the
//! observer. Decode failures are logged and dropped; they never reach the
//! transport.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::ble::receiver::{Advertisement, NotificationCallback};
use crate::data::{ScaleData, ScaleSession};
use crate::error::Result;
use crate::protocol::frames::{decode_frame, Frame};

/// Receives one reading per decoded measurement frame.
///
/// Implemented for any `Fn(ScaleData)` closure.
pub trait ScaleObserver: Send + Sync {
    /// Called synchronously from the notification path.
    fn notify(&self, reading: ScaleData);
}

impl<F> ScaleObserver for F
where
    F: Fn(ScaleData) + Send + Sync,
{
    fn notify(&self, reading: ScaleData) {
        self(reading)
    }
}

/// Delivers command frames to the scale.
///
/// Called while the session lock is held, so implementations must not block;
/// queue the frame and return.
pub trait CommandSink: Send + Sync {
    /// Hand a serialized command to the transport.
    fn send_command(&self, frame: &[u8]) -> Result<()>;
}

impl<F> CommandSink for F
where
    F: Fn(&[u8]) -> Result<()> + Send + Sync,
{
    fn send_command(&self, frame: &[u8]) -> Result<()> {
        self(frame)
    }
}

/// Decodes incoming frames and feeds the observer.
#[derive(Clone)]
pub struct NotificationHandler {
    session: Arc<Mutex<ScaleSession>>,
    observer: Arc<dyn ScaleObserver>,
    command_sink: Option<Arc<dyn CommandSink>>,
    /// Held for reading by every in-flight notification.
    delivering: Arc<RwLock<bool>>,
}

impl NotificationHandler {
    /// Create a handler over a shared session.
    pub fn new(session: Arc<Mutex<ScaleSession>>, observer: Arc<dyn ScaleObserver>) -> Self {
        Self {
            session,
            observer,
            command_sink: None,
            delivering: Arc::new(RwLock::new(true)),
        }
    }

    /// Attach a sink for unit-change commands.
    pub fn with_command_sink(mut self, sink: Arc<dyn CommandSink>) -> Self {
        self.command_sink = Some(sink);
        self
    }

    /// Process one received buffer.
    pub fn on_notification(&self, data: &[u8], name: &str, address: &str) {
        let delivering = self.delivering.read();
        if !*delivering {
            trace!("Delivery closed, dropping frame from {}", address);
            return;
        }

        let frame = match decode_frame(data) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Dropping frame from {}: {} ({:02X?})", address, e, data);
                return;
            }
        };

        let view = {
            let mut session = self.session.lock();
            let view = session.apply(&frame);
            self.flush_unit_command(&mut session);
            view
        };

        // Info frames only update the session.
        let Frame::Measurement(measurement) = frame else {
            return;
        };

        trace!(
            "Reading from {}: {:?} ({})",
            address,
            measurement.measurements,
            view.display_unit
        );

        self.observer.notify(ScaleData {
            name: name.to_string(),
            address: address.to_string(),
            hw_version: view.hw_version,
            sw_version: view.sw_version,
            display_unit: view.display_unit,
            measurements: measurement.measurements,
            timestamp: Utc::now(),
        });
    }

    /// Process one advertisement event.
    pub fn handle(&self, advertisement: &Advertisement) {
        self.on_notification(
            &advertisement.data,
            &advertisement.name,
            &advertisement.address,
        );
    }

    /// Wrap this handler as a receiver callback.
    pub fn callback(&self) -> NotificationCallback {
        let handler = self.clone();
        Arc::new(move |advertisement: &Advertisement| handler.handle(advertisement))
    }

    /// Allow notifications to reach the observer.
    pub(crate) fn open(&self) {
        *self.delivering.write() = true;
    }

    /// Stop delivering notifications.
    ///
    /// Waits for in-flight notifications; none start after this returns.
    pub(crate) fn close(&self) {
        *self.delivering.write() = false;
    }

    fn flush_unit_command(&self, session: &mut ScaleSession) {
        let Some(sink) = &self.command_sink else {
            return;
        };
        let Some(command) = session.pending_unit_command() else {
            return;
        };

        match sink.send_command(&command.to_bytes()) {
            Ok(()) => {
                session.mark_unit_command_sent();
                info!(
                    "Sent unit change to {} on {}",
                    command.unit,
                    session.address()
                );
            }
            Err(e) => {
                warn!("Unit change to {} not sent, will retry: {}", command.unit, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DisplayUnit, MeasurementKind, WeightUnit};
    use crate::error::Error;
    use crate::protocol::commands::UnitCommand;
    use crate::protocol::frames::fixtures::*;
    use pretty_assertions::assert_eq;

    const NAME: &str = "Test Scale";
    const ADDRESS: &str = "00:11:22:33:44:55";

    type Readings = Arc<Mutex<Vec<ScaleData>>>;

    fn recording_handler() -> (NotificationHandler, Arc<Mutex<ScaleSession>>, Readings) {
        let session = Arc::new(Mutex::new(ScaleSession::new(ADDRESS)));
        let readings: Readings = Arc::new(Mutex::new(Vec::new()));
        let sink = readings.clone();
        let handler = NotificationHandler::new(
            session.clone(),
            Arc::new(move |reading: ScaleData| sink.lock().push(reading)),
        );
        (handler, session, readings)
    }

    #[test]
    fn test_weight_frame_reaches_observer() {
        let (handler, session, readings) = recording_handler();
        session
            .lock()
            .set_versions(Some("1.0".to_string()), Some("2.0".to_string()));

        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);

        let readings = readings.lock();
        assert_eq!(readings.len(), 1);
        let reading = &readings[0];
        assert_eq!(reading.name, NAME);
        assert_eq!(reading.address, ADDRESS);
        assert_eq!(reading.hw_version.as_deref(), Some("1.0"));
        assert_eq!(reading.sw_version.as_deref(), Some("2.0"));
        assert_eq!(reading.display_unit, WeightUnit::Kg);
        assert_eq!(reading.measurements.get_by_key("weight"), Some(1.0));
    }

    #[test]
    fn test_address_comes_from_transport() {
        let (handler, _session, readings) = recording_handler();
        handler.on_notification(&QN_WEIGHT_1KG, NAME, "AA:BB:CC:DD:EE:FF");
        assert_eq!(readings.lock()[0].address, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_invalid_frames_are_silent() {
        let (handler, _session, readings) = recording_handler();

        handler.on_notification(&[0u8; 22], NAME, ADDRESS);
        handler.on_notification(&QN_WEIGHT_1KG[..10], NAME, ADDRESS);
        handler.on_notification(&[], NAME, ADDRESS);

        assert!(readings.lock().is_empty());
    }

    #[test]
    fn test_info_frame_updates_session_only() {
        let (handler, session, readings) = recording_handler();

        handler.on_notification(&qn_info(0x21, 0x11, 0x24), NAME, ADDRESS);
        assert!(readings.lock().is_empty());
        assert_eq!(session.lock().hw_version(), Some("1.1"));

        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);
        let readings = readings.lock();
        assert_eq!(readings[0].hw_version.as_deref(), Some("1.1"));
        assert_eq!(readings[0].sw_version.as_deref(), Some("2.4"));
    }

    #[test]
    fn test_measurements_are_per_frame() {
        let (handler, _session, readings) = recording_handler();

        handler.on_notification(&etekcity_report(70_000, Some(480), 0), NAME, ADDRESS);
        handler.on_notification(&etekcity_report(70_100, None, 0), NAME, ADDRESS);

        let readings = readings.lock();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].impedance(), Some(480));
        assert_eq!(readings[1].impedance(), None);
        assert_eq!(readings[1].weight(), Some(70.1));
    }

    #[test]
    fn test_unrecognized_unit_reported() {
        let (handler, _session, readings) = recording_handler();
        handler.on_notification(&etekcity_report(70_000, None, 5), NAME, ADDRESS);

        let readings = readings.lock();
        assert_eq!(readings[0].display_unit, DisplayUnit::Unrecognized(5));
        assert_eq!(
            readings[0].measurements.get(MeasurementKind::DisplayUnit),
            Some(5.0)
        );
    }

    #[test]
    fn test_frames_flow_while_unit_change_pending() {
        let (handler, session, readings) = recording_handler();
        session.lock().request_unit_change(WeightUnit::Lb);

        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);
        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);

        let readings = readings.lock();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].display_unit, WeightUnit::Lb);
        // No sink: the request stays pending.
        assert!(session.lock().is_unit_update_pending());
    }

    #[test]
    fn test_pending_unit_sent_once() {
        let (handler, session, _readings) = recording_handler();
        let sent: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let outbox = sent.clone();
        let handler = handler.with_command_sink(Arc::new(move |frame: &[u8]| -> Result<()> {
            outbox.lock().push(frame.to_vec());
            Ok(())
        }));

        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);
        assert!(sent.lock().is_empty());

        session.lock().request_unit_change(WeightUnit::St);
        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);
        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);

        let sent = sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            UnitCommand::from_bytes(&sent[0]),
            Some(UnitCommand::new(0xff, WeightUnit::St))
        );
        assert!(!session.lock().is_unit_update_pending());
        assert_eq!(session.lock().display_unit(), Some(WeightUnit::St));
    }

    #[test]
    fn test_unit_change_races_with_notifications() {
        const REQUESTS: usize = 200;

        let (handler, session, readings) = recording_handler();
        let sent: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let outbox = sent.clone();
        let handler = handler.with_command_sink(Arc::new(move |frame: &[u8]| -> Result<()> {
            outbox.lock().push(frame.to_vec());
            Ok(())
        }));

        let requester = {
            let session = session.clone();
            std::thread::spawn(move || {
                for i in 0..REQUESTS {
                    let unit = if i % 2 == 0 {
                        WeightUnit::Lb
                    } else {
                        WeightUnit::St
                    };
                    session.lock().request_unit_change(unit);
                    std::thread::yield_now();
                }
            })
        };
        let pump = {
            let handler = handler.clone();
            std::thread::spawn(move || {
                for _ in 0..REQUESTS {
                    handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);
                    std::thread::yield_now();
                }
            })
        };
        requester.join().unwrap();
        pump.join().unwrap();

        // Flush whatever the last request left pending.
        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);

        assert!(!session.lock().is_unit_update_pending());
        assert_eq!(readings.lock().len(), REQUESTS + 1);

        // Each send consumed one request; none was sent twice.
        let sent = sent.lock();
        assert!(!sent.is_empty());
        assert!(sent.len() <= REQUESTS);
        let last = UnitCommand::from_bytes(&sent[sent.len() - 1]);
        assert_eq!(last, Some(UnitCommand::new(0xff, WeightUnit::St)));
        assert_eq!(session.lock().display_unit(), Some(WeightUnit::St));
    }

    #[test]
    fn test_failed_send_keeps_request_pending() {
        let (handler, session, readings) = recording_handler();
        let handler = handler.with_command_sink(Arc::new(|_: &[u8]| -> Result<()> {
            Err(Error::CommandFailed {
                reason: "write queue full".to_string(),
            })
        }));

        session.lock().request_unit_change(WeightUnit::Lb);
        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);

        assert!(session.lock().is_unit_update_pending());
        assert_eq!(readings.lock().len(), 1);
    }

    #[test]
    fn test_closed_handler_drops_frames() {
        let (handler, _session, readings) = recording_handler();

        handler.close();
        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);
        assert!(readings.lock().is_empty());

        handler.open();
        handler.on_notification(&QN_WEIGHT_1KG, NAME, ADDRESS);
        assert_eq!(readings.lock().len(), 1);
    }

    #[test]
    fn test_callback_wraps_handler() {
        let (handler, _session, readings) = recording_handler();
        let callback = handler.callback();

        callback(&Advertisement::new(QN_WEIGHT_1KG.to_vec(), NAME, ADDRESS));
        assert_eq!(readings.lock().len(), 1);
    }
}
