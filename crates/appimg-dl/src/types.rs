use serde::{Deserialize, Serialize};

/// Download progress events emitted to a [`appimg_events::ProgressReporter`]-backed callback.
#[derive(Debug, Clone, Copy)]
pub enum Progress {
    Starting { total: u64 },
    Resuming { current: u64, total: u64 },
    Chunk { current: u64, total: u64 },
    Complete { total: u64 },
    Retry { attempt: u32 },
    Aborted,
    Recovered,
}

/// Resume checkpoint persisted in the destination file's extended attributes, allowing a
/// retried download to pick up where a prior attempt left off instead of re-fetching bytes
/// already on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeInfo {
    pub downloaded: u64,
    pub total: u64,
    pub etag: Option<String>,
}
