use std::sync::mpsc::{self, Receiver, Sender};

use crate::InstallerEvent;

/// Trait for consuming installer events.
///
/// Each frontend (CLI, future GUI, test harness) provides its own implementation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: InstallerEvent);
}

/// Channel-based event sink.
///
/// Sends events through a standard mpsc channel. The receiver end can be polled by any
/// consumer.
pub struct ChannelSink {
    sender: Sender<InstallerEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<InstallerEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: InstallerEvent) {
        let _ = self.sender.send(event);
    }
}

/// No-op event sink for tests or headless operation.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: InstallerEvent) {}
}

/// Collector sink that stores all events for inspection.
///
/// Useful in tests to verify that expected events were emitted.
#[derive(Default)]
pub struct CollectorSink {
    events: std::sync::Mutex<Vec<InstallerEvent>>,
}

impl CollectorSink {
    pub fn events(&self) -> Vec<InstallerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: InstallerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;

    #[test]
    fn test_null_sink() {
        let sink = NullSink;
        sink.emit(InstallerEvent::Log {
            level: LogLevel::Info,
            message: "test".to_string(),
        });
    }

    #[test]
    fn test_channel_sink() {
        let (sink, rx) = ChannelSink::new();
        sink.emit(InstallerEvent::DownloadStarting {
            op_id: 1,
            target: "owner/repo".to_string(),
            total: 1024,
        });
        sink.emit(InstallerEvent::DownloadProgress {
            op_id: 1,
            target: "owner/repo".to_string(),
            current: 512,
            total: 1024,
        });
        sink.emit(InstallerEvent::DownloadComplete {
            op_id: 1,
            target: "owner/repo".to_string(),
            total: 1024,
        });

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            InstallerEvent::DownloadStarting { total: 1024, .. }
        ));
        assert!(matches!(
            &events[2],
            InstallerEvent::DownloadComplete { .. }
        ));
    }

    #[test]
    fn test_channel_sink_receiver_dropped() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(InstallerEvent::Log {
            level: LogLevel::Info,
            message: "orphaned".to_string(),
        });
    }

    #[test]
    fn test_collector_sink() {
        let sink = CollectorSink::default();
        assert!(sink.is_empty());

        sink.emit(InstallerEvent::Resolving {
            op_id: 1,
            target: "owner/repo".into(),
        });
        sink.emit(InstallerEvent::OperationComplete {
            op_id: 1,
            target: "owner/repo".into(),
        });

        assert_eq!(sink.len(), 2);
        let events = sink.events();
        assert!(matches!(&events[0], InstallerEvent::Resolving { .. }));
        assert!(matches!(&events[1], InstallerEvent::OperationComplete { .. }));
    }

    #[test]
    fn test_event_sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullSink>();
        assert_send_sync::<ChannelSink>();
        assert_send_sync::<CollectorSink>();
    }
}
