//! Task lifecycle registry.
//!
//! Tracks N concurrent asynchronous operations by opaque id. The registry is
//! the one component intentionally shared across the whole session: clone the
//! handle freely, all clones see the same collection.
//!
//! State machine: `InProgress -> {Succeeded, Failed, Cancelled}`, all
//! terminal. Mutating an unknown or terminal task is a silent no-op rather
//! than an error - completion signals race UI actions by design, and callers
//! fire them without checking liveness first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::task::AbortHandle;

use despacho_types::{RuntimeSettings, Task, TaskId, TaskOutcome, TaskState};

/// Signal shape reported by whatever drives the remote submission backing a
/// task. The registry does not own the transport; callers translate their
/// transport's events into these and feed them in.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitSignal {
    /// Partial-progress estimate, percentage.
    Progress(i32),
    /// The remote operation finished with a result payload.
    Succeeded(serde_json::Value),
    /// The remote operation failed with a human-readable message.
    Failed(String),
}

/// Live registry record: the observable snapshot plus the pending
/// auto-removal timer, if one has been scheduled.
struct TrackedTask {
    task: Task,
    /// Cancellable deferred removal, armed by the terminal transition and
    /// disarmed by an explicit `remove`.
    eviction: Option<AbortHandle>,
}

#[derive(Default)]
struct Inner {
    tasks: HashMap<TaskId, TrackedTask>,
}

/// Shared, cloneable task lifecycle registry.
///
/// All operations are synchronous and non-blocking; the only asynchronous
/// machinery is the grace-period timer that evicts finished entries.
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<Mutex<Inner>>,
    settings: RuntimeSettings,
}

impl TaskRegistry {
    #[must_use]
    pub fn new(settings: RuntimeSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            settings,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-mutation;
        // the bookkeeping here stays consistent per-operation.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a new operation. The task is visible to all observers
    /// immediately, `InProgress` with zero progress.
    pub fn start(
        &self,
        label: impl Into<String>,
        category: impl Into<String>,
        extra: serde_json::Value,
    ) -> TaskId {
        let task = Task::started(label, category, extra);
        let id = task.id;
        tracing::debug!(%id, label = %task.label, category = %task.category, "task started");
        self.lock().tasks.insert(
            id,
            TrackedTask {
                task,
                eviction: None,
            },
        );
        id
    }

    /// Update the progress estimate of an in-progress task.
    ///
    /// Clamped to [0, 99]: 100% is only ever observed as a consequence of a
    /// genuine `complete`, so a stale estimate can never claim the operation
    /// is done before the completion signal arrives.
    pub fn update_progress(&self, id: TaskId, value: i32) {
        let mut inner = self.lock();
        let Some(record) = inner.tasks.get_mut(&id) else {
            return;
        };
        if record.task.state != TaskState::InProgress {
            return;
        }
        record.task.progress = value.clamp(0, 99) as u8;
    }

    /// Transition `InProgress -> Succeeded`, forcing progress to 100 and
    /// scheduling removal after the success grace period.
    pub fn complete(&self, id: TaskId, result: serde_json::Value) {
        let grace = self.settings.success_grace;
        self.finish(id, grace, |task| {
            task.state = TaskState::Succeeded;
            task.progress = 100;
            task.outcome = Some(TaskOutcome::Result(result));
        });
    }

    /// Transition `InProgress -> Failed`, recording the caller-supplied
    /// error. The failure grace period is the longest one: the user needs
    /// time to read the message.
    pub fn fail(&self, id: TaskId, error: impl Into<String>) {
        let grace = self.settings.failure_grace;
        let message = error.into();
        self.finish(id, grace, |task| {
            task.state = TaskState::Failed;
            task.outcome = Some(TaskOutcome::Error(message));
        });
    }

    /// Transition `InProgress -> Cancelled`.
    ///
    /// Bookkeeping only: aborting the underlying remote operation is the
    /// caller's job, and a late `complete`/`fail` from that abort race is
    /// silently ignored by the terminal no-op rule.
    pub fn cancel(&self, id: TaskId) {
        let grace = self.settings.cancel_grace;
        self.finish(id, grace, |task| {
            task.state = TaskState::Cancelled;
        });
    }

    /// Delete a task immediately, disarming its pending eviction timer.
    /// Idempotent: removing an unknown id does nothing.
    pub fn remove(&self, id: TaskId) {
        let mut inner = self.lock();
        if let Some(record) = inner.tasks.remove(&id)
            && let Some(handle) = record.eviction
        {
            handle.abort();
        }
    }

    /// Snapshot of every tracked task, ordered by start time.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        let inner = self.lock();
        let mut tasks: Vec<Task> = inner.tasks.values().map(|r| r.task.clone()).collect();
        tasks.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.label.cmp(&b.label)));
        tasks
    }

    /// Snapshot filtered by category, ordered by start time.
    #[must_use]
    pub fn tasks_in(&self, category: &str) -> Vec<Task> {
        let mut tasks = self.tasks();
        tasks.retain(|t| t.category == category);
        tasks
    }

    /// Single-task lookup.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.lock().tasks.get(&id).map(|r| r.task.clone())
    }

    /// Whether any task in the given category is still in progress. Used to
    /// gate dependent UI and data loads.
    #[must_use]
    pub fn has_active(&self, category: &str) -> bool {
        self.lock()
            .tasks
            .values()
            .any(|r| r.task.category == category && r.task.state == TaskState::InProgress)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().tasks.is_empty()
    }

    /// Route a remote submission signal to the matching transition. Late
    /// signals after a terminal state fall under the usual no-op rule.
    pub fn apply_signal(&self, id: TaskId, signal: SubmitSignal) {
        match signal {
            SubmitSignal::Progress(value) => self.update_progress(id, value),
            SubmitSignal::Succeeded(result) => self.complete(id, result),
            SubmitSignal::Failed(message) => self.fail(id, message),
        }
    }

    /// Apply a terminal transition and arm the grace-period eviction timer.
    /// No-op unless the task exists and is `InProgress`.
    fn finish(&self, id: TaskId, grace: Duration, apply: impl FnOnce(&mut Task)) {
        let mut inner = self.lock();
        let Some(record) = inner.tasks.get_mut(&id) else {
            return;
        };
        if record.task.state != TaskState::InProgress {
            return;
        }
        apply(&mut record.task);
        record.task.ended_at = Some(Utc::now());
        tracing::debug!(%id, state = ?record.task.state, "task finished");
        record.eviction = schedule_eviction(Arc::downgrade(&self.inner), id, grace);
    }
}

/// Spawn the deferred removal for a finished task.
///
/// The timer holds only a weak reference to the registry state, so dropping
/// the last registry handle drops the collection without waiting for
/// timers. Outside a tokio runtime no timer is armed and the entry stays
/// until explicitly removed.
fn schedule_eviction(inner: Weak<Mutex<Inner>>, id: TaskId, grace: Duration) -> Option<AbortHandle> {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::debug!(%id, "no runtime; finished task kept until explicit removal");
        return None;
    };
    let join = handle.spawn(async move {
        tokio::time::sleep(grace).await;
        if let Some(inner) = inner.upgrade() {
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            guard.tasks.remove(&id);
        }
    });
    Some(join.abort_handle())
}
