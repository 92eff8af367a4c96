//! Process-wide collaborators the orchestrator needs for every target: a shared release cache
//! and rate-limit tracker (so concurrent targets against the same repo don't refetch or trip
//! GitHub's rate limit independently), a semaphore bounding in-flight installs, and a single
//! cancellation token all targets in a batch share.

use std::sync::Arc;

use appimg_dl::github::{GithubResolver, RateLimitTracker, ReleaseCache};
use appimg_dl::CancellationToken;
use appimg_events::{EventSinkHandle, ProgressReporterHandle};
use tokio::sync::Semaphore;

use crate::types::InstallOptions;

/// Shared state constructed once per `install` call and handed to every per-target task.
pub struct InstallerContext {
    release_cache: ReleaseCache,
    rate_limit: RateLimitTracker,
    semaphore: Arc<Semaphore>,
    cancellation: CancellationToken,
    events: EventSinkHandle,
    progress: ProgressReporterHandle,
    options: InstallOptions,
}

impl InstallerContext {
    pub fn new(options: InstallOptions, events: EventSinkHandle, progress: ProgressReporterHandle) -> Self {
        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        Self {
            release_cache: ReleaseCache::default(),
            rate_limit: RateLimitTracker::default(),
            semaphore,
            cancellation: CancellationToken::new(),
            events,
            progress,
            options,
        }
    }

    /// A `GithubResolver` wired to this context's shared cache and rate-limit tracker.
    pub fn resolver(&self) -> GithubResolver<'_> {
        GithubResolver::new()
            .with_cache(&self.release_cache)
            .with_rate_limit(&self.rate_limit)
    }

    pub fn semaphore(&self) -> Arc<Semaphore> {
        self.semaphore.clone()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Requests that any not-yet-started or in-flight target abort at its next checkpoint.
    pub fn cancel_all(&self) {
        self.cancellation.cancel();
    }

    pub fn events(&self) -> &EventSinkHandle {
        &self.events
    }

    pub fn progress(&self) -> &ProgressReporterHandle {
        &self.progress
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }
}
