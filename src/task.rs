use serde::Serialize;
use std::fmt;

/// The normalized lifecycle state of a remote generation task.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Accepted by the vendor but not started, or in a state we do not recognize.
    Pending,
    /// Actively generating.
    Running,
    /// Finished; the artifact URL should be available.
    Done,
    /// Finished without an artifact.
    Failed,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps one vendor's status vocabulary onto [`TaskState`].
///
/// Lookups are exact and case-sensitive. Anything missing from the table is
/// treated as [`TaskState::Pending`], i.e. still in progress.
#[derive(Debug, Clone, Copy)]
pub struct StatusTable {
    entries: &'static [(&'static str, TaskState)],
}

impl StatusTable {
    pub const fn new(entries: &'static [(&'static str, TaskState)]) -> Self {
        Self { entries }
    }

    pub fn normalize(&self, vendor_status: &str) -> TaskState {
        self.entries
            .iter()
            .find(|(name, _)| *name == vendor_status)
            .map(|(_, state)| *state)
            .unwrap_or(TaskState::Pending)
    }
}

/// A snapshot of one remote asynchronous job.
///
/// Tasks are never mutated locally: each poll produces a fresh snapshot.
/// `result` is only ever set on a `Done` task and `error` only on a `Failed` one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// The vendor-assigned identifier.
    pub id: String,
    /// The normalized state.
    pub status: TaskState,
    /// The raw status string the vendor reported.
    pub vendor_status: String,
    /// The artifact URL, when `status` is `Done`.
    pub result: Option<String>,
    /// The vendor's error message, when `status` is `Failed`.
    pub error: Option<String>,
}

impl Task {
    /// A freshly submitted task.
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskState::Pending,
            vendor_status: "submitted".to_string(),
            result: None,
            error: None,
        }
    }

    /// Builds a snapshot from a vendor status string, dropping fields that do not
    /// belong to the normalized state.
    pub fn from_vendor(
        id: impl Into<String>,
        table: &StatusTable,
        vendor_status: &str,
        result: Option<String>,
        error: Option<String>,
    ) -> Self {
        let status = table.normalize(vendor_status);
        Self {
            id: id.into(),
            status,
            vendor_status: vendor_status.to_string(),
            result: result
                .filter(|url| !url.is_empty())
                .filter(|_| status == TaskState::Done),
            error: error
                .filter(|msg| !msg.is_empty())
                .filter(|_| status == TaskState::Failed),
        }
    }

    /// A failed snapshot for a task the vendor rejected at the envelope level
    /// (e.g. a non-success business code on an otherwise successful response).
    pub fn rejected(id: impl Into<String>, vendor_status: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: id.into(),
            status: TaskState::Failed,
            vendor_status: vendor_status.to_string(),
            result: None,
            error: (!message.is_empty()).then_some(message),
        }
    }
}
