//! Streaming download of a single asset to disk, with resume, retry/backoff, progress
//! reporting, and cooperative cancellation.

use std::{
    fs::{File, OpenOptions, Permissions},
    io::{Read as _, Write as _},
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use appimg_events::{ProgressReporterHandle, TaskId, TaskKind};
use appimg_utils::fs::is_elf;
use tracing::{debug, trace, warn};
use ureq::http::{
    header::{CONTENT_LENGTH, CONTENT_RANGE, ETAG},
    Response,
};
use ureq::Body;

use crate::{
    error::DownloadError,
    http_client::SHARED_AGENT,
    types::{Progress, ResumeInfo},
    xattr::{read_resume, remove_resume, write_resume},
};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const CHUNK_SIZE: usize = 64 * 1024;
const RESUME_CHECKPOINT_INTERVAL: u64 = 1024 * 1024;

/// Cooperative cancellation handle shared between an orchestrator and an in-flight download.
/// Checked once per chunk rather than torn down mid-read.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configures and executes a single asset download.
pub struct Download {
    url: String,
    destination: PathBuf,
    max_attempts: u32,
    timeout: Option<Duration>,
    cancellation: CancellationToken,
    on_progress: Option<Box<dyn Fn(Progress) + Send + Sync>>,
    progress: Option<ProgressReporterHandle>,
    task_name: String,
}

impl Download {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: None,
            cancellation: CancellationToken::new(),
            on_progress: None,
            progress: None,
            task_name: "download".to_string(),
        }
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Registers a callback invoked with raw [`Progress`] events as the download proceeds.
    pub fn on_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub fn progress(mut self, progress: ProgressReporterHandle) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn task_name(mut self, name: impl Into<String>) -> Self {
        self.task_name = name.into();
        self
    }

    /// Runs the configured download to completion, retrying retryable failures with exponential
    /// backoff. Returns the final destination path.
    pub fn execute(self) -> Result<PathBuf, DownloadError> {
        if let Some(parent) = self.destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let task_id = self
            .progress
            .as_ref()
            .map(|p| p.add_task(&self.task_name, TaskKind::Download, None));

        let mut last_err = None;
        for attempt in 1..=self.max_attempts {
            if self.cancellation.is_cancelled() {
                self.cleanup_partial();
                self.finish(task_id, false);
                return Err(DownloadError::Cancelled);
            }

            match self.attempt_once(task_id) {
                Ok(()) => {
                    self.finish(task_id, true);
                    return Ok(self.destination.clone());
                }
                Err(e) if e.is_cancellation() => {
                    self.cleanup_partial();
                    self.finish(task_id, false);
                    return Err(e);
                }
                Err(e) if attempt < self.max_attempts && e.is_retryable() => {
                    warn!(
                        url = %self.url,
                        attempt,
                        error = %e,
                        "download attempt failed, retrying"
                    );
                    self.cleanup_partial();
                    self.emit(Progress::Retry { attempt });
                    thread::sleep(Duration::from_secs(2u64.saturating_pow(attempt)));
                    last_err = Some(e);
                }
                Err(e) => {
                    self.cleanup_partial();
                    self.finish(task_id, false);
                    return Err(e);
                }
            }
        }

        self.finish(task_id, false);
        Err(last_err.unwrap_or(DownloadError::NoFilename {
            url: self.url.clone(),
        }))
    }

    fn attempt_once(&self, task_id: Option<TaskId>) -> Result<(), DownloadError> {
        let resume_info = read_resume(&self.destination);
        self.download_to_file(resume_info, task_id)
    }

    fn download_to_file(
        &self,
        resume_info: Option<ResumeInfo>,
        task_id: Option<TaskId>,
    ) -> Result<(), DownloadError> {
        let (resume_from, etag) = resume_info
            .as_ref()
            .map(|r| (Some(r.downloaded), r.etag.as_deref()))
            .unwrap_or((None, None));

        let resp = self.fetch(resume_from, etag)?;
        let status = resp.status().as_u16();

        if resume_from.is_some() && status != 206 {
            debug!(url = %self.url, "server ignored range request, restarting from scratch");
            return self.download_to_file(None, task_id);
        }

        if (500..600).contains(&status) {
            return Err(DownloadError::HttpError {
                status,
                url: self.url.clone(),
            });
        }
        if !(200..300).contains(&status) && status != 206 {
            return Err(DownloadError::HttpError {
                status,
                url: self.url.clone(),
            });
        }

        let total = parse_content_length(&resp);
        let new_etag = resp
            .headers()
            .get(ETAG)
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        if resume_from.is_some() {
            self.emit(Progress::Resuming {
                current: resume_from.unwrap_or(0),
                total,
            });
        } else {
            self.emit(Progress::Starting { total });
        }
        if let (Some(reporter), Some(task_id)) = (&self.progress, task_id) {
            reporter.update_task(task_id, resume_from.unwrap_or(0), Some(total), None, None);
        }

        let mut file = if resume_from.is_some() {
            OpenOptions::new().append(true).open(&self.destination)?
        } else {
            File::create(&self.destination)?
        };

        let mut reader = resp.into_body().into_reader();
        let mut buffer = [0u8; CHUNK_SIZE];
        let mut downloaded = resume_from.unwrap_or(0);
        let mut last_checkpoint = downloaded;

        loop {
            if self.cancellation.is_cancelled() {
                self.emit(Progress::Aborted);
                return Err(DownloadError::Cancelled);
            }

            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }

            file.write_all(&buffer[..n])?;
            downloaded += n as u64;

            if downloaded - last_checkpoint >= RESUME_CHECKPOINT_INTERVAL {
                write_resume(
                    &self.destination,
                    &ResumeInfo {
                        downloaded,
                        total,
                        etag: new_etag.clone(),
                    },
                )?;
                last_checkpoint = downloaded;
            }

            self.emit(Progress::Chunk {
                current: downloaded,
                total,
            });
            if let (Some(reporter), Some(task_id)) = (&self.progress, task_id) {
                reporter.update_task(task_id, downloaded, Some(total), None, None);
            }
        }

        if resume_from.is_some() {
            self.emit(Progress::Recovered);
        }
        self.emit(Progress::Complete { total });

        if is_elf(&self.destination) {
            std::fs::set_permissions(&self.destination, Permissions::from_mode(0o755))?;
        }
        remove_resume(&self.destination)?;

        Ok(())
    }

    fn fetch(
        &self,
        resume_from: Option<u64>,
        etag: Option<&str>,
    ) -> Result<Response<Body>, DownloadError> {
        trace!(url = %self.url, resume_from = ?resume_from, "fetching");
        let mut req = SHARED_AGENT.get(&self.url);
        if let Some(timeout) = self.timeout {
            req = req.config().timeout_per_call(Some(timeout)).build();
        }
        if let Some(pos) = resume_from {
            req = req.header("Range", format!("bytes={pos}-"));
            if let Some(tag) = etag {
                req = req.header("If-Range", tag);
            }
        }
        req.call().map_err(DownloadError::from)
    }

    fn cleanup_partial(&self) {
        if self.destination.is_file() {
            if let Err(e) = std::fs::remove_file(&self.destination) {
                warn!(path = %self.destination.display(), error = %e, "failed to clean up partial download");
            }
        }
    }

    fn emit(&self, progress: Progress) {
        if let Some(cb) = &self.on_progress {
            cb(progress);
        }
    }

    fn finish(&self, task_id: Option<TaskId>, success: bool) {
        if let (Some(reporter), Some(task_id)) = (&self.progress, task_id) {
            reporter.finish_task(task_id, success, None);
        }
    }
}

impl DownloadError {
    fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Network(_) => true,
            DownloadError::HttpError { status: 500..=599, .. } => true,
            // A read timeout or dropped connection mid-stream (`reader.read()` during
            // `download_to_file`) surfaces as a bare `io::Error` via the `#[from]` conversion,
            // not as `Network`; treat the transport-shaped io error kinds as retryable too.
            DownloadError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    fn is_cancellation(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }
}

fn parse_content_length(resp: &Response<Body>) -> u64 {
    resp.headers()
        .get(CONTENT_RANGE)
        .and_then(|h| h.to_str().ok())
        .and_then(|range| range.rsplit_once('/').and_then(|(_, total)| total.parse().ok()))
        .or_else(|| {
            resp.headers()
                .get(CONTENT_LENGTH)
                .and_then(|h| h.to_str().ok())
                .and_then(|len| len.parse::<u64>().ok())
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_shared_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_download_builder_defaults() {
        let dl = Download::new("https://example.com/app.AppImage", "/tmp/app.AppImage");
        assert_eq!(dl.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(!dl.cancellation.is_cancelled());
    }

    #[test]
    fn test_max_attempts_floor_is_one() {
        let dl = Download::new("https://example.com/app.AppImage", "/tmp/app.AppImage")
            .max_attempts(0);
        assert_eq!(dl.max_attempts, 1);
    }

    #[test]
    fn test_on_progress_callback_is_stored_and_invoked() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let dl = Download::new("https://example.com/app.AppImage", "/tmp/app.AppImage")
            .on_progress(move |p| seen_clone.lock().unwrap().push(p));

        dl.emit(Progress::Starting { total: 100 });
        dl.emit(Progress::Complete { total: 100 });

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Progress::Starting { total: 100 }));
        assert!(matches!(events[1], Progress::Complete { total: 100 }));
    }

    #[test]
    fn test_is_retryable_classification() {
        assert!(DownloadError::HttpError {
            status: 503,
            url: String::new(),
        }
        .is_retryable());
        assert!(!DownloadError::HttpError {
            status: 404,
            url: String::new(),
        }
        .is_retryable());
        assert!(!DownloadError::Cancelled.is_retryable());
    }

    #[test]
    fn test_read_timeout_io_error_is_retryable() {
        let timed_out: DownloadError =
            std::io::Error::from(std::io::ErrorKind::TimedOut).into();
        assert!(timed_out.is_retryable());

        let reset: DownloadError =
            std::io::Error::from(std::io::ErrorKind::ConnectionReset).into();
        assert!(reset.is_retryable());

        let not_found: DownloadError =
            std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert!(!not_found.is_retryable());
    }
}
