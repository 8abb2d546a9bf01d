use std::collections::HashMap;

use serde::Serialize;

use crate::error::{ConflictKind, Error, Result};
use crate::model::{Status, Task, TaskList};

/// Bound on dependency-chain traversal.
const MAX_DEPENDENCY_DEPTH: usize = 1000;

#[derive(Debug, Clone)]
struct TaskSnapshot {
    status: Status,
    blocked_by: Vec<String>,
}

/// Flattened lookup over a task tree for blocking and cycle queries.
/// Built once per analysis; mutations invalidate it.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    by_stable: HashMap<String, TaskSnapshot>,
}

impl DependencyIndex {
    pub fn build(tasks: &[Task]) -> Self {
        let mut index = DependencyIndex::default();
        fn walk(tasks: &[Task], index: &mut DependencyIndex) {
            for task in tasks {
                if let Some(sid) = &task.stable_id {
                    index.by_stable.insert(
                        sid.clone(),
                        TaskSnapshot {
                            status: task.status,
                            blocked_by: task.blocked_by.clone(),
                        },
                    );
                }
                walk(&task.children, index);
            }
        }
        walk(tasks, &mut index);
        index
    }

    /// A task is blocked while any blocker is not Completed. A reference
    /// that resolves to nothing also blocks: a dangling edge means the
    /// dependency state is unknowable, and an unknowable dependency must
    /// not release work.
    pub fn is_blocked(&self, task: &Task) -> bool {
        task.blocked_by.iter().any(|blocker| {
            self.by_stable
                .get(blocker)
                .map(|snap| snap.status != Status::Completed)
                .unwrap_or(true)
        })
    }

    /// Blockers of `task` that are still outstanding, dangling references
    /// included.
    pub fn blocking_ids(&self, task: &Task) -> Vec<String> {
        task.blocked_by
            .iter()
            .filter(|blocker| {
                self.by_stable
                    .get(*blocker)
                    .map(|snap| snap.status != Status::Completed)
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    /// Checks whether adding edge `from -> target` would close a cycle.
    /// Returns the cycle path (stable IDs, starting and ending at `from`)
    /// when it would.
    pub fn detect_cycle(&self, from: &str, target: &str) -> Option<Vec<String>> {
        let mut path = vec![from.to_string()];
        if self.reaches(target, from, &mut path, 0) {
            path.push(from.to_string());
            return Some(path);
        }
        None
    }

    fn reaches(&self, current: &str, goal: &str, path: &mut Vec<String>, depth: usize) -> bool {
        if depth >= MAX_DEPENDENCY_DEPTH {
            return false;
        }
        path.push(current.to_string());
        if current == goal {
            // goal appears as the closing element added by the caller
            path.pop();
            return true;
        }
        if let Some(snap) = self.by_stable.get(current) {
            for blocker in &snap.blocked_by {
                if self.reaches(blocker, goal, path, depth + 1) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }
}

/// A task reference in stream and next-task reports.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<String>,
}

impl TaskRef {
    fn from_task(task: &Task) -> Self {
        TaskRef {
            id: task.id.clone(),
            stable_id: task.stable_id.clone(),
            title: task.title.clone(),
            owner: task.owner.clone(),
            blocked_by: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub stream: u32,
    pub ready: Vec<TaskRef>,
    pub active: Vec<TaskRef>,
    pub blocked: Vec<TaskRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    pub streams: Vec<StreamInfo>,
    pub available: Vec<u32>,
}

/// Groups every incomplete task by effective stream and classifies it.
/// Streams with no ready, active, or blocked task are not reported.
pub fn analyze_streams(list: &TaskList) -> StreamReport {
    let index = DependencyIndex::build(&list.tasks);
    let mut streams: HashMap<u32, StreamInfo> = HashMap::new();

    fn walk(tasks: &[Task], index: &DependencyIndex, streams: &mut HashMap<u32, StreamInfo>) {
        for task in tasks {
            classify(task, index, streams);
            walk(&task.children, index, streams);
        }
    }

    fn classify(task: &Task, index: &DependencyIndex, streams: &mut HashMap<u32, StreamInfo>) {
        if task.status == Status::Completed {
            return;
        }
        let entry = streams
            .entry(task.effective_stream())
            .or_insert_with(|| StreamInfo {
                stream: task.effective_stream(),
                ready: Vec::new(),
                active: Vec::new(),
                blocked: Vec::new(),
            });
        match task.status {
            Status::InProgress => entry.active.push(TaskRef::from_task(task)),
            Status::Pending => {
                if index.is_blocked(task) {
                    let mut r = TaskRef::from_task(task);
                    r.blocked_by = index.blocking_ids(task);
                    entry.blocked.push(r);
                } else if task.owner.is_none() {
                    entry.ready.push(TaskRef::from_task(task));
                }
                // pending but already owned: neither ready nor blocked
            }
            Status::Completed => unreachable!(),
        }
    }

    walk(&list.tasks, &index, &mut streams);

    let mut infos: Vec<StreamInfo> = streams
        .into_values()
        .filter(|s| !s.ready.is_empty() || !s.active.is_empty() || !s.blocked.is_empty())
        .collect();
    infos.sort_by_key(|s| s.stream);
    let available = infos
        .iter()
        .filter(|s| !s.ready.is_empty())
        .map(|s| s.stream)
        .collect();
    StreamReport {
        streams: infos,
        available,
    }
}

/// Ready tasks (pending, unblocked, unowned) in document order, optionally
/// restricted to one stream.
pub fn ready_tasks(list: &TaskList, stream: Option<u32>) -> Vec<TaskRef> {
    let index = DependencyIndex::build(&list.tasks);
    let mut out = Vec::new();
    fn walk(tasks: &[Task], index: &DependencyIndex, stream: Option<u32>, out: &mut Vec<TaskRef>) {
        for task in tasks {
            let in_stream = stream.map_or(true, |s| task.effective_stream() == s);
            if in_stream
                && task.status == Status::Pending
                && task.owner.is_none()
                && !index.is_blocked(task)
            {
                out.push(TaskRef::from_task(task));
            }
            walk(&task.children, index, stream, out);
        }
    }
    walk(&list.tasks, &index, stream, &mut out);
    out
}

/// The next unit of work: the first incomplete task in document order,
/// carried with its incomplete children for context.
#[derive(Debug, Clone, Serialize)]
pub struct NextTask {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    pub title: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub incomplete_children: Vec<TaskRef>,
}

pub fn next_task(list: &TaskList) -> Option<NextTask> {
    fn has_incomplete_work(task: &Task) -> bool {
        task.status != Status::Completed || task.children.iter().any(has_incomplete_work)
    }

    let task = list.tasks.iter().find(|t| has_incomplete_work(t))?;
    Some(NextTask {
        id: task.id.clone(),
        stable_id: task.stable_id.clone(),
        title: task.title.clone(),
        status: task.status,
        incomplete_children: task
            .children
            .iter()
            .filter(|c| has_incomplete_work(c))
            .map(TaskRef::from_task)
            .collect(),
    })
}

/// Assigns `owner` to a ready task and flips it to InProgress. This is
/// the one transition a concurrent worker may perform; anything not
/// ready is rejected as a conflict.
pub fn claim_task(list: &mut TaskList, id: &str, owner: &str) -> Result<()> {
    crate::validate::validate_owner(owner)?;
    let index = DependencyIndex::build(&list.tasks);
    let task = list
        .find_task(id)
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
    if let Some(current) = &task.owner {
        return Err(Error::Conflict(ConflictKind::AlreadyOwned {
            id: id.to_string(),
            owner: current.clone(),
        }));
    }
    if task.status != Status::Pending || index.is_blocked(task) {
        return Err(Error::Conflict(ConflictKind::NotReady(id.to_string())));
    }
    list.ensure_stable_id(id)?;
    let task = list.find_task_mut(id).expect("checked above");
    task.owner = Some(owner.to_string());
    task.status = Status::InProgress;
    Ok(())
}
