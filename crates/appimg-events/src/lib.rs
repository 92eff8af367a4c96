mod event;
mod progress;
mod sink;

use std::sync::Arc;

pub use event::*;
pub use progress::*;
pub use sink::*;

/// Unique identifier for a running per-target install operation.
pub type OperationId = u64;

/// Shared handle to an event sink.
pub type EventSinkHandle = Arc<dyn EventSink>;

/// Shared handle to a progress reporter.
pub type ProgressReporterHandle = Arc<dyn ProgressReporter>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_sink_handle() {
        let sink: EventSinkHandle = Arc::new(NullSink);
        sink.emit(InstallerEvent::BatchProgress {
            completed: 5,
            total: 10,
            failed: 0,
        });

        let collector = Arc::new(CollectorSink::default());
        let sink: EventSinkHandle = collector.clone();
        sink.emit(InstallerEvent::OperationComplete {
            op_id: 42,
            target: "owner/repo".to_string(),
        });
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_progress_reporter_handle() {
        let reporter: ProgressReporterHandle = Arc::new(NullProgressReporter);
        let id = reporter.add_task("fetch", TaskKind::ApiFetch, None);
        reporter.finish_task(id, true, None);
    }

    #[test]
    fn test_all_event_variants() {
        let collector = CollectorSink::default();

        collector.emit(InstallerEvent::Resolving {
            op_id: 1,
            target: "a/b".into(),
        });
        collector.emit(InstallerEvent::SelectingAsset {
            op_id: 1,
            target: "a/b".into(),
            candidate_count: 3,
        });
        collector.emit(InstallerEvent::DownloadStarting {
            op_id: 1,
            target: "a/b".into(),
            total: 100,
        });
        collector.emit(InstallerEvent::DownloadResuming {
            op_id: 1,
            target: "a/b".into(),
            current: 50,
            total: 100,
        });
        collector.emit(InstallerEvent::DownloadProgress {
            op_id: 1,
            target: "a/b".into(),
            current: 75,
            total: 100,
        });
        collector.emit(InstallerEvent::DownloadComplete {
            op_id: 1,
            target: "a/b".into(),
            total: 100,
        });
        collector.emit(InstallerEvent::DownloadRetry {
            op_id: 1,
            target: "a/b".into(),
            attempt: 2,
        });
        collector.emit(InstallerEvent::DownloadAborted {
            op_id: 1,
            target: "a/b".into(),
        });
        collector.emit(InstallerEvent::DownloadRecovered {
            op_id: 1,
            target: "a/b".into(),
        });

        collector.emit(InstallerEvent::Verifying {
            op_id: 1,
            target: "a/b".into(),
            stage: VerifyStage::Digest,
        });
        collector.emit(InstallerEvent::Verifying {
            op_id: 1,
            target: "a/b".into(),
            stage: VerifyStage::ChecksumFile {
                source: "SHA256SUMS".into(),
            },
        });
        collector.emit(InstallerEvent::Verifying {
            op_id: 1,
            target: "a/b".into(),
            stage: VerifyStage::Passed,
        });
        collector.emit(InstallerEvent::Verifying {
            op_id: 1,
            target: "a/b".into(),
            stage: VerifyStage::Unverified,
        });
        collector.emit(InstallerEvent::Verifying {
            op_id: 1,
            target: "a/b".into(),
            stage: VerifyStage::Failed("mismatch".into()),
        });

        collector.emit(InstallerEvent::Installing {
            op_id: 1,
            target: "a/b".into(),
            stage: InstallStage::Moving,
        });
        collector.emit(InstallerEvent::Installing {
            op_id: 1,
            target: "a/b".into(),
            stage: InstallStage::SettingPermissions,
        });
        collector.emit(InstallerEvent::Installing {
            op_id: 1,
            target: "a/b".into(),
            stage: InstallStage::Renaming,
        });
        collector.emit(InstallerEvent::Installing {
            op_id: 1,
            target: "a/b".into(),
            stage: InstallStage::Complete,
        });

        collector.emit(InstallerEvent::AcquiringIcon {
            op_id: 1,
            target: "a/b".into(),
            stage: IconStage::Extracting,
        });
        collector.emit(InstallerEvent::AcquiringIcon {
            op_id: 1,
            target: "a/b".into(),
            stage: IconStage::Downloading,
        });
        collector.emit(InstallerEvent::AcquiringIcon {
            op_id: 1,
            target: "a/b".into(),
            stage: IconStage::Complete {
                source: IconSource::Extraction,
            },
        });
        collector.emit(InstallerEvent::AcquiringIcon {
            op_id: 1,
            target: "a/b".into(),
            stage: IconStage::None,
        });

        collector.emit(InstallerEvent::ConfigWritten {
            op_id: 1,
            target: "a/b".into(),
        });
        collector.emit(InstallerEvent::DesktopEntryWritten {
            op_id: 1,
            target: "a/b".into(),
        });
        collector.emit(InstallerEvent::OperationComplete {
            op_id: 1,
            target: "a/b".into(),
        });
        collector.emit(InstallerEvent::OperationFailed {
            op_id: 2,
            target: "c/d".into(),
            error: "not found".into(),
        });
        collector.emit(InstallerEvent::AlreadyInstalled {
            op_id: 3,
            target: "e/f".into(),
        });
        collector.emit(InstallerEvent::BatchProgress {
            completed: 2,
            total: 3,
            failed: 1,
        });
        collector.emit(InstallerEvent::Log {
            level: LogLevel::Debug,
            message: "debug".into(),
        });
        collector.emit(InstallerEvent::Log {
            level: LogLevel::Info,
            message: "info".into(),
        });
        collector.emit(InstallerEvent::Log {
            level: LogLevel::Warning,
            message: "warning".into(),
        });
        collector.emit(InstallerEvent::Log {
            level: LogLevel::Error,
            message: "error".into(),
        });

        assert_eq!(collector.len(), 28);
    }
}
