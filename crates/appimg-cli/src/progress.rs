//! Renders task lifecycle events onto a terminal via `indicatif`. The core never knows how
//! progress is drawn; it only calls `add_task`/`update_task`/`finish_task` across a task's
//! lifetime, as specified by the `ProgressReporter` contract.

use std::collections::HashMap;
use std::sync::Mutex;

use appimg_events::{ProgressReporter, TaskId, TaskKind};
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressState, ProgressStyle};

use crate::utils::progress_enabled;

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

fn task_icon(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::ApiFetch => "api",
        TaskKind::Download => "download",
        TaskKind::Verification => "verify",
        TaskKind::IconExtraction => "icon",
        TaskKind::Installation => "install",
    }
}

fn format_bytes(state: &ProgressState, w: &mut dyn std::fmt::Write) {
    write!(
        w,
        "{}/{}",
        HumanBytes(state.pos()),
        HumanBytes(state.len().unwrap_or(state.pos()))
    )
    .unwrap();
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {prefix} [{wide_bar:.green/dim}] {computed_bytes:>22}",
    )
    .unwrap()
    .with_key("computed_bytes", format_bytes)
    .tick_chars(SPINNER_CHARS)
    .progress_chars("━━─")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix} {msg}")
        .unwrap()
        .tick_chars(SPINNER_CHARS)
}

/// Implements [`ProgressReporter`] by mapping each task id onto its own bar within one
/// `MultiProgress` terminal region.
pub struct IndicatifProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
    next_id: Mutex<TaskId>,
}

impl IndicatifProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
        }
    }
}

impl Default for IndicatifProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn add_task(&self, name: &str, kind: TaskKind, total: Option<u64>) -> TaskId {
        let mut next_id = self.next_id.lock().unwrap();
        let task_id = *next_id;
        *next_id += 1;
        drop(next_id);

        let bar = if !progress_enabled() {
            ProgressBar::hidden()
        } else if let Some(total) = total {
            let bar = self.multi.add(ProgressBar::new(total));
            bar.set_style(bar_style());
            bar.enable_steady_tick(std::time::Duration::from_millis(80));
            bar
        } else {
            let bar = self.multi.add(ProgressBar::new_spinner());
            bar.set_style(spinner_style());
            bar.enable_steady_tick(std::time::Duration::from_millis(80));
            bar
        };
        bar.set_prefix(format!("[{}] {name}", task_icon(kind)));

        self.bars.lock().unwrap().insert(task_id, bar);
        task_id
    }

    fn update_task(
        &self,
        task_id: TaskId,
        completed: u64,
        total: Option<u64>,
        description: Option<&str>,
        _speed: Option<f64>,
    ) {
        let bars = self.bars.lock().unwrap();
        if let Some(bar) = bars.get(&task_id) {
            if let Some(total) = total {
                bar.set_length(total);
            }
            bar.set_position(completed);
            if let Some(description) = description {
                bar.set_message(description.to_string());
            }
        }
    }

    fn finish_task(&self, task_id: TaskId, success: bool, description: Option<&str>) {
        let mut bars = self.bars.lock().unwrap();
        if let Some(bar) = bars.remove(&task_id) {
            match description {
                Some(msg) => {
                    if success {
                        bar.finish_with_message(msg.to_string())
                    } else {
                        bar.abandon_with_message(msg.to_string())
                    }
                }
                None if success => bar.finish(),
                None => bar.abandon(),
            }
        }
    }
}
