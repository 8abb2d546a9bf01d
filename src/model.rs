use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Checkbox markers for task status.
const CHECKBOX_PENDING: &str = "[ ]";
const CHECKBOX_IN_PROGRESS: &str = "[-]";
const CHECKBOX_COMPLETED: &str = "[x]";

/// Default filename requirement links point into.
pub const DEFAULT_REQUIREMENTS_FILE: &str = "requirements.md";

/// Stream tasks fall into when no explicit `Stream:` is set.
pub const DEFAULT_STREAM: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub fn checkbox(self) -> &'static str {
        match self {
            Self::Pending => CHECKBOX_PENDING,
            Self::InProgress => CHECKBOX_IN_PROGRESS,
            Self::Completed => CHECKBOX_COMPLETED,
        }
    }

    /// Parses a checkbox token. `[X]` is accepted as completed for
    /// hand-edited files but never rendered.
    pub fn from_checkbox(s: &str) -> Option<Self> {
        match s {
            CHECKBOX_PENDING => Some(Self::Pending),
            CHECKBOX_IN_PROGRESS => Some(Self::InProgress),
            CHECKBOX_COMPLETED | "[X]" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Batch requests arrive from agents in either numeric or named form;
// output is always numeric.
impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u8),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(0) => Ok(Self::Pending),
            Raw::Num(1) => Ok(Self::InProgress),
            Raw::Num(2) => Ok(Self::Completed),
            Raw::Num(n) => Err(de::Error::custom(format!(
                "invalid status value: {n} (must be 0-2)"
            ))),
            Raw::Text(s) => match s.as_str() {
                "Pending" | "pending" => Ok(Self::Pending),
                "InProgress" | "inprogress" | "in-progress" | "in_progress" => {
                    Ok(Self::InProgress)
                }
                "Completed" | "completed" => Ok(Self::Completed),
                other => Err(de::Error::custom(format!("invalid status string: {other}"))),
            },
        }
    }
}

/// A single node in the hierarchical task list.
///
/// `id` is derived from document position and recomputed on every
/// structural change; `stable_id` is assigned once and survives
/// renumbering, so all cross-references (`blocked_by`) use it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    pub title: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub requirements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub blocked_by: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<Task>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Stream this task belongs to, defaulting to stream 1.
    pub fn effective_stream(&self) -> u32 {
        self.stream.unwrap_or(DEFAULT_STREAM)
    }

    /// True when the task carries metadata that requires a stable ID and
    /// metadata sub-lines in the rendered document.
    pub fn has_work_metadata(&self) -> bool {
        self.stream.is_some() || self.owner.is_some() || !self.blocked_by.is_empty()
    }
}

/// A named `## Section` boundary in the document. Markers index document
/// position, not task content: `after_task_id` is the top-level task the
/// header follows, empty when the header precedes all tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMarker {
    pub name: String,
    pub after_task_id: String,
}

/// Leading YAML block of a task document. Metadata is a flat
/// string-to-string map; nested keys are rejected at input time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub metadata: BTreeMap<String, String>,
}

impl FrontMatter {
    pub fn is_empty(&self) -> bool {
        self.references.is_empty() && self.metadata.is_empty()
    }
}

/// Root aggregate: the whole document's task tree plus front matter.
/// Tasks are owned exclusively by the list; all mutation goes through
/// the operations in `ops`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskList {
    pub title: String,
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_matter: Option<FrontMatter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements_file: Option<String>,
}

impl TaskList {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn requirements_file(&self) -> &str {
        self.requirements_file
            .as_deref()
            .unwrap_or(DEFAULT_REQUIREMENTS_FILE)
    }

    pub fn stats(&self) -> Stats {
        fn walk(tasks: &[Task], stats: &mut Stats) {
            for task in tasks {
                stats.total += 1;
                match task.status {
                    Status::Pending => stats.pending += 1,
                    Status::InProgress => stats.in_progress += 1,
                    Status::Completed => stats.completed += 1,
                }
                walk(&task.children, stats);
            }
        }
        let mut stats = Stats::default();
        walk(&self.tasks, &mut stats);
        stats
    }
}

/// Aggregate counts over the whole tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_round_trip() {
        for status in [Status::Pending, Status::InProgress, Status::Completed] {
            assert_eq!(Status::from_checkbox(status.checkbox()), Some(status));
        }
        assert_eq!(Status::from_checkbox("[X]"), Some(Status::Completed));
        assert_eq!(Status::from_checkbox("[?]"), None);
    }

    #[test]
    fn status_serde_accepts_numbers_and_names() {
        assert_eq!(serde_json::to_string(&Status::Completed).unwrap(), "2");
        let s: Status = serde_json::from_str("1").unwrap();
        assert_eq!(s, Status::InProgress);
        let s: Status = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(s, Status::InProgress);
        assert!(serde_json::from_str::<Status>("7").is_err());
        assert!(serde_json::from_str::<Status>("\"done\"").is_err());
    }

    #[test]
    fn effective_stream_defaults_to_one() {
        let mut task = Task::new("t");
        assert_eq!(task.effective_stream(), 1);
        task.stream = Some(3);
        assert_eq!(task.effective_stream(), 3);
    }

    #[test]
    fn stats_counts_nested_tasks() {
        let mut list = TaskList::new("Test");
        let mut parent = Task::new("parent");
        let mut child = Task::new("child");
        child.status = Status::Completed;
        parent.children.push(child);
        parent.status = Status::InProgress;
        list.tasks.push(parent);
        list.tasks.push(Task::new("other"));

        let stats = list.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed, 1);
    }
}
