/// Unique identifier for a tracked unit of work within a progress reporter.
pub type TaskId = u64;

/// The kind of work a progress task represents, used by frontends to pick an icon/label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    ApiFetch,
    Download,
    Verification,
    IconExtraction,
    Installation,
}

/// Contract a frontend implements to render task-level progress.
///
/// The core never depends on how a reporter renders; it only calls these three methods across
/// a task's lifetime: one `add_task`, zero or more `update_task`, and exactly one `finish_task`.
pub trait ProgressReporter: Send + Sync {
    /// Registers a new task and returns an opaque id used in subsequent calls.
    fn add_task(&self, name: &str, kind: TaskKind, total: Option<u64>) -> TaskId;

    /// Reports incremental progress for a task.
    fn update_task(
        &self,
        task_id: TaskId,
        completed: u64,
        total: Option<u64>,
        description: Option<&str>,
        speed: Option<f64>,
    );

    /// Marks a task finished, successfully or not.
    fn finish_task(&self, task_id: TaskId, success: bool, description: Option<&str>);
}

/// A reporter that discards all updates, for headless or test use.
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn add_task(&self, _name: &str, _kind: TaskKind, _total: Option<u64>) -> TaskId {
        0
    }

    fn update_task(
        &self,
        _task_id: TaskId,
        _completed: u64,
        _total: Option<u64>,
        _description: Option<&str>,
        _speed: Option<f64>,
    ) {
    }

    fn finish_task(&self, _task_id: TaskId, _success: bool, _description: Option<&str>) {}
}
