use crate::deps::DependencyIndex;
use crate::error::{ConflictKind, Error, Result};
use crate::model::{Status, Task, TaskList};
use crate::stable_id::StableIdGenerator;
use crate::validate::{
    is_valid_id, validate_details, validate_owner, validate_references, validate_requirements,
    validate_title,
};

/// Maximum number of tasks in a single document.
pub const MAX_TASK_COUNT: usize = 10_000;

/// Maximum nesting depth for the task hierarchy.
pub const MAX_HIERARCHY_DEPTH: usize = 10;

/// Optional fields for inserting a task.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// 1-based ordinal among the intended siblings; values past the end
    /// append. `None` appends.
    pub position: Option<String>,
    pub details: Vec<String>,
    pub references: Vec<String>,
    pub requirements: Vec<String>,
    pub stream: Option<u32>,
    /// Hierarchical IDs of blocking tasks; resolved to stable IDs.
    pub blocked_by: Vec<String>,
    pub owner: Option<String>,
}

/// Field updates for a task; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub title: Option<String>,
    pub status: Option<Status>,
    pub details: Option<Vec<String>>,
    pub references: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub stream: Option<u32>,
    /// Hierarchical IDs; `Some(vec![])` clears the set.
    pub blocked_by: Option<Vec<String>>,
    pub owner: Option<String>,
    /// Clears the owner.
    pub release: bool,
}

/// Result of an update, reporting auto-completion side effects.
#[derive(Debug, Clone, Default)]
pub struct UpdateOutcome {
    /// Parent IDs that flipped to Completed as a cascade.
    pub auto_completed: Vec<String>,
}

/// Result of removing a subtree.
#[derive(Debug, Clone, Default)]
pub struct RemoveOutcome {
    /// Tasks removed, the subtree root included.
    pub removed: usize,
    /// Hierarchical IDs of surviving tasks whose blocked-by set referenced
    /// a removed task. Their reference is gone; the caller should warn.
    pub dependents: Vec<String>,
}

impl TaskList {
    pub fn find_task(&self, id: &str) -> Option<&Task> {
        fn walk<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
            for task in tasks {
                if task.id == id {
                    return Some(task);
                }
                if let Some(found) = walk(&task.children, id) {
                    return Some(found);
                }
            }
            None
        }
        if id.is_empty() {
            return None;
        }
        walk(&self.tasks, id)
    }

    pub fn find_task_mut(&mut self, id: &str) -> Option<&mut Task> {
        fn walk<'a>(tasks: &'a mut [Task], id: &str) -> Option<&'a mut Task> {
            for task in tasks {
                if task.id == id {
                    return Some(task);
                }
                if let Some(found) = walk(&mut task.children, id) {
                    return Some(found);
                }
            }
            None
        }
        if id.is_empty() {
            return None;
        }
        walk(&mut self.tasks, id)
    }

    pub fn count_tasks(&self) -> usize {
        fn walk(tasks: &[Task]) -> usize {
            tasks.iter().map(|t| 1 + walk(&t.children)).sum()
        }
        walk(&self.tasks)
    }

    /// Recomputes every hierarchical ID top-down by current document
    /// order. Stable IDs, statuses, and all metadata are untouched.
    pub fn renumber(&mut self) {
        fn renumber_children(parent: &mut Task) {
            let parent_id = parent.id.clone();
            for (i, child) in parent.children.iter_mut().enumerate() {
                child.id = format!("{parent_id}.{}", i + 1);
                renumber_children(child);
            }
        }
        for (i, task) in self.tasks.iter_mut().enumerate() {
            task.id = format!("{}", i + 1);
            renumber_children(task);
        }
    }

    /// Inserts a new pending task under `parent_id` (empty for root).
    /// Returns the hierarchical ID of the new task.
    pub fn add_task(&mut self, parent_id: &str, title: &str, opts: AddOptions) -> Result<String> {
        validate_title(title)?;
        self.check_resource_limits(parent_id)?;
        if let Some(owner) = &opts.owner {
            validate_owner(owner)?;
        }
        validate_details(&opts.details)?;
        validate_references(&opts.references)?;
        validate_requirements(&opts.requirements)?;

        let blocked_by = if opts.blocked_by.is_empty() {
            Vec::new()
        } else {
            self.resolve_to_stable_ids(&opts.blocked_by)?
        };

        let mut new_task = Task {
            title: title.to_string(),
            status: Status::Pending,
            details: opts.details,
            references: opts.references,
            requirements: opts.requirements,
            stream: opts.stream,
            owner: opts.owner,
            blocked_by,
            ..Task::default()
        };
        // Dependency, stream, or owner metadata forces a stable ID so the
        // new task can participate in cross-references immediately.
        if new_task.has_work_metadata() {
            let mut gen = StableIdGenerator::new(self.collect_stable_ids());
            new_task.stable_id = Some(gen.generate()?);
        }

        match opts.position {
            Some(position) => self.insert_at_position(parent_id, new_task, &position),
            None => self.append_task(parent_id, new_task),
        }
    }

    fn append_task(&mut self, parent_id: &str, mut task: Task) -> Result<String> {
        let id = if parent_id.is_empty() {
            task.id = format!("{}", self.tasks.len() + 1);
            let id = task.id.clone();
            self.tasks.push(task);
            id
        } else {
            let parent = self
                .find_task_mut(parent_id)
                .ok_or_else(|| Error::ParentNotFound(parent_id.to_string()))?;
            task.id = format!("{parent_id}.{}", parent.children.len() + 1);
            let id = task.id.clone();
            parent.children.push(task);
            id
        };
        Ok(id)
    }

    fn insert_at_position(&mut self, parent_id: &str, task: Task, position: &str) -> Result<String> {
        if !is_valid_id(position) {
            return Err(Error::validation(format!(
                "invalid position format: {position}"
            )));
        }
        // Only the last component matters: the ordinal among siblings.
        let ordinal: usize = position
            .rsplit('.')
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| Error::validation(format!("invalid position format: {position}")))?;
        let mut index = ordinal - 1;

        if parent_id.is_empty() {
            index = index.min(self.tasks.len());
            self.tasks.insert(index, task);
        } else {
            let parent = self
                .find_task_mut(parent_id)
                .ok_or_else(|| Error::ParentNotFound(parent_id.to_string()))?;
            index = index.min(parent.children.len());
            parent.children.insert(index, task);
        }

        self.renumber();

        let id = if parent_id.is_empty() {
            self.tasks[index].id.clone()
        } else {
            let parent = self.find_task(parent_id).expect("parent exists");
            parent.children[index].id.clone()
        };
        Ok(id)
    }

    /// Removes the task and its whole subtree, renumbering the remaining
    /// tasks and scrubbing its stable IDs from other tasks' blocked-by
    /// sets.
    pub fn remove_task(&mut self, id: &str) -> Result<RemoveOutcome> {
        fn take(tasks: &mut Vec<Task>, id: &str) -> Option<Task> {
            if let Some(i) = tasks.iter().position(|t| t.id == id) {
                return Some(tasks.remove(i));
            }
            for task in tasks.iter_mut() {
                if let Some(found) = take(&mut task.children, id) {
                    return Some(found);
                }
            }
            None
        }

        fn subtree_size(task: &Task) -> usize {
            1 + task.children.iter().map(subtree_size).sum::<usize>()
        }

        fn collect_subtree_stable_ids(task: &Task, out: &mut Vec<String>) {
            if let Some(sid) = &task.stable_id {
                out.push(sid.clone());
            }
            for child in &task.children {
                collect_subtree_stable_ids(child, out);
            }
        }

        let removed = take(&mut self.tasks, id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;

        // Renumber before scrubbing so reported dependent IDs are the
        // post-removal ones.
        self.renumber();

        let mut stale = Vec::new();
        collect_subtree_stable_ids(&removed, &mut stale);
        let mut dependents = Vec::new();
        for sid in &stale {
            dependents.extend(self.remove_from_blocked_by(sid));
        }
        dependents.sort_by(|a, b| crate::batch::compare_ids(a, b));
        dependents.dedup();

        Ok(RemoveOutcome {
            removed: subtree_size(&removed),
            dependents,
        })
    }

    /// Applies the supplied fields to the task. Unset fields are no-ops.
    /// A status change to Completed cascades auto-completion upward and
    /// reports the completed parents.
    pub fn update_task(&mut self, id: &str, opts: UpdateOptions) -> Result<UpdateOutcome> {
        if self.find_task(id).is_none() {
            return Err(Error::TaskNotFound(id.to_string()));
        }

        if let Some(title) = &opts.title {
            validate_title(title)?;
        }
        if let Some(details) = &opts.details {
            validate_details(details)?;
        }
        if let Some(refs) = &opts.references {
            validate_references(refs)?;
        }
        if let Some(reqs) = &opts.requirements {
            validate_requirements(reqs)?;
        }
        if let Some(owner) = &opts.owner {
            validate_owner(owner)?;
        }

        // Resolve and cycle-check the new blocked-by set before touching
        // anything, so a rejected edit leaves the graph unchanged.
        let blocked_by = match &opts.blocked_by {
            Some(ids) if !ids.is_empty() => {
                let own_stable = self.ensure_stable_id(id)?;
                let stable_ids = self.resolve_to_stable_ids(ids)?;
                let index = DependencyIndex::build(&self.tasks);
                for target in &stable_ids {
                    if *target == own_stable {
                        return Err(Error::Conflict(ConflictKind::SelfDependency(own_stable)));
                    }
                    if let Some(path) = index.detect_cycle(&own_stable, target) {
                        return Err(Error::Conflict(ConflictKind::CircularDependency(path)));
                    }
                }
                Some(stable_ids)
            }
            Some(_) => Some(Vec::new()),
            None => None,
        };

        if opts.stream.is_some() || opts.owner.is_some() {
            self.ensure_stable_id(id)?;
        }

        let task = self.find_task_mut(id).expect("checked above");
        if let Some(title) = opts.title {
            task.title = title;
        }
        if let Some(details) = opts.details {
            task.details = details;
        }
        if let Some(refs) = opts.references {
            task.references = refs;
        }
        if let Some(reqs) = opts.requirements {
            task.requirements = reqs;
        }
        if let Some(stream) = opts.stream {
            task.stream = Some(stream);
        }
        if let Some(blocked_by) = blocked_by {
            task.blocked_by = blocked_by;
        }
        if let Some(owner) = opts.owner {
            task.owner = Some(owner);
        }
        if opts.release {
            task.owner = None;
        }

        let mut outcome = UpdateOutcome::default();
        if let Some(status) = opts.status {
            let task = self.find_task_mut(id).expect("checked above");
            task.status = status;
            if status == Status::Completed {
                outcome.auto_completed = self.auto_complete_parents(id);
            }
        }
        Ok(outcome)
    }

    /// Walks up from `id`, completing each ancestor whose children are now
    /// all complete. Returns the IDs completed, nearest first.
    pub fn auto_complete_parents(&mut self, id: &str) -> Vec<String> {
        fn all_complete(task: &Task) -> bool {
            task.children
                .iter()
                .all(|c| c.status == Status::Completed && all_complete(c))
        }

        let mut completed = Vec::new();
        let mut current = parent_id(id);
        while !current.is_empty() {
            let Some(parent) = self.find_task_mut(&current) else {
                break;
            };
            if !parent.children.is_empty()
                && parent.status != Status::Completed
                && all_complete(parent)
            {
                parent.status = Status::Completed;
                completed.push(current.clone());
            }
            current = parent_id(&current);
        }
        completed
    }

    pub fn check_resource_limits(&self, parent_id: &str) -> Result<()> {
        if self.count_tasks() >= MAX_TASK_COUNT {
            return Err(Error::limit(format!(
                "maximum task limit of {MAX_TASK_COUNT} reached"
            )));
        }
        if !parent_id.is_empty() && parent_id.split('.').count() >= MAX_HIERARCHY_DEPTH {
            return Err(Error::limit(format!(
                "maximum hierarchy depth of {MAX_HIERARCHY_DEPTH} reached"
            )));
        }
        Ok(())
    }

    pub fn collect_stable_ids(&self) -> Vec<String> {
        fn walk(tasks: &[Task], out: &mut Vec<String>) {
            for task in tasks {
                if let Some(sid) = &task.stable_id {
                    out.push(sid.clone());
                }
                walk(&task.children, out);
            }
        }
        let mut ids = Vec::new();
        walk(&self.tasks, &mut ids);
        ids
    }

    /// Returns the task's stable ID, lazily assigning one to legacy tasks
    /// the first time a dependency, stream, or owner touches them.
    pub fn ensure_stable_id(&mut self, id: &str) -> Result<String> {
        let existing = self
            .find_task(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?
            .stable_id
            .clone();
        if let Some(sid) = existing {
            return Ok(sid);
        }
        let mut gen = StableIdGenerator::new(self.collect_stable_ids());
        let sid = gen.generate()?;
        let task = self.find_task_mut(id).expect("checked above");
        task.stable_id = Some(sid.clone());
        Ok(sid)
    }

    /// Converts hierarchical IDs into stable IDs, assigning stable IDs to
    /// legacy targets as needed.
    pub fn resolve_to_stable_ids(&mut self, ids: &[String]) -> Result<Vec<String>> {
        let mut stable_ids = Vec::with_capacity(ids.len());
        for hid in ids {
            if self.find_task(hid).is_none() {
                return Err(Error::TaskNotFound(hid.clone()));
            }
            stable_ids.push(self.ensure_stable_id(hid)?);
        }
        Ok(stable_ids)
    }

    /// Drops `stable_id` from every blocked-by set, returning the
    /// hierarchical IDs of the tasks that lost the reference.
    fn remove_from_blocked_by(&mut self, stable_id: &str) -> Vec<String> {
        fn walk(tasks: &mut [Task], stable_id: &str, affected: &mut Vec<String>) {
            for task in tasks {
                let before = task.blocked_by.len();
                task.blocked_by.retain(|b| b != stable_id);
                if task.blocked_by.len() != before {
                    affected.push(task.id.clone());
                }
                walk(&mut task.children, stable_id, affected);
            }
        }
        let mut affected = Vec::new();
        walk(&mut self.tasks, stable_id, &mut affected);
        affected
    }
}

/// Parent of a hierarchical ID: "1.2.3" -> "1.2", "1" -> "".
pub fn parent_id(id: &str) -> String {
    match id.rfind('.') {
        Some(pos) => id[..pos].to_string(),
        None => String::new(),
    }
}

/// Root component of a hierarchical ID: "3.2.1" -> "3".
pub fn root_id(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_with(titles: &[&str]) -> TaskList {
        let mut list = TaskList::new("Test");
        for title in titles {
            list.add_task("", title, AddOptions::default()).unwrap();
        }
        list
    }

    #[test]
    fn append_assigns_sequential_ids() {
        let list = list_with(&["A", "B", "C"]);
        let ids: Vec<_> = list.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn append_under_parent() {
        let mut list = list_with(&["A"]);
        let id = list.add_task("1", "child", AddOptions::default()).unwrap();
        assert_eq!(id, "1.1");
        assert_eq!(list.find_task("1.1").unwrap().title, "child");
    }

    #[test]
    fn missing_parent_fails() {
        let mut list = list_with(&["A"]);
        let err = list.add_task("9", "child", AddOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ParentNotFound(_)));
    }

    #[test]
    fn position_insert_shifts_siblings() {
        let mut list = list_with(&["A", "B", "C"]);
        let id = list
            .add_task(
                "",
                "X",
                AddOptions {
                    position: Some("2".into()),
                    ..AddOptions::default()
                },
            )
            .unwrap();
        assert_eq!(id, "2");
        let titles: Vec<_> = list.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["A", "X", "B", "C"]);
        let ids: Vec<_> = list.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4"]);
    }

    #[test]
    fn position_past_end_appends() {
        let mut list = list_with(&["A"]);
        let id = list
            .add_task(
                "",
                "X",
                AddOptions {
                    position: Some("9".into()),
                    ..AddOptions::default()
                },
            )
            .unwrap();
        assert_eq!(id, "2");
    }

    #[test]
    fn malformed_position_fails() {
        let mut list = list_with(&["A"]);
        for bad in ["0", "abc", "1..2", ""] {
            let err = list
                .add_task(
                    "",
                    "X",
                    AddOptions {
                        position: Some(bad.into()),
                        ..AddOptions::default()
                    },
                )
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "position {bad:?}");
        }
    }

    #[test]
    fn metadata_shaped_detail_fails() {
        let mut list = list_with(&["A"]);
        let err = list
            .add_task(
                "",
                "X",
                AddOptions {
                    details: vec!["Stream: 5".into()],
                    ..AddOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = list
            .update_task(
                "1",
                UpdateOptions {
                    details: Some(vec!["Owner: bob".into()]),
                    ..UpdateOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn oversized_title_fails() {
        let mut list = list_with(&[]);
        let err = list
            .add_task("", &"x".repeat(501), AddOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn remove_renumbers_and_reports_count() {
        let mut list = list_with(&["A", "B", "C"]);
        list.add_task("2", "B child", AddOptions::default()).unwrap();
        let outcome = list.remove_task("2").unwrap();
        assert_eq!(outcome.removed, 2);
        let ids: Vec<_> = list.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(list.tasks[1].title, "C");
    }

    #[test]
    fn remove_missing_fails() {
        let mut list = list_with(&["A"]);
        assert!(matches!(
            list.remove_task("5"),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn remove_scrubs_blocked_by_references() {
        let mut list = list_with(&["A", "B"]);
        list.update_task(
            "2",
            UpdateOptions {
                blocked_by: Some(vec!["1".into()]),
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        assert!(!list.tasks[1].blocked_by.is_empty());
        let outcome = list.remove_task("1").unwrap();
        assert!(list.tasks[0].blocked_by.is_empty());
        // B slid into slot 1 before the scrub was reported
        assert_eq!(outcome.dependents, vec!["1"]);
    }

    #[test]
    fn update_only_touches_supplied_fields() {
        let mut list = list_with(&["A"]);
        list.update_task(
            "1",
            UpdateOptions {
                details: Some(vec!["d1".into()]),
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        list.update_task(
            "1",
            UpdateOptions {
                title: Some("A2".into()),
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        let task = list.find_task("1").unwrap();
        assert_eq!(task.title, "A2");
        assert_eq!(task.details, vec!["d1"]);
    }

    #[test]
    fn auto_complete_cascades_upward() {
        let mut list = list_with(&["P"]);
        list.add_task("1", "c1", AddOptions::default()).unwrap();
        list.add_task("1", "c2", AddOptions::default()).unwrap();

        let outcome = list
            .update_task(
                "1.1",
                UpdateOptions {
                    status: Some(Status::Completed),
                    ..UpdateOptions::default()
                },
            )
            .unwrap();
        assert!(outcome.auto_completed.is_empty());
        assert_eq!(list.find_task("1").unwrap().status, Status::Pending);

        let outcome = list
            .update_task(
                "1.2",
                UpdateOptions {
                    status: Some(Status::Completed),
                    ..UpdateOptions::default()
                },
            )
            .unwrap();
        assert_eq!(outcome.auto_completed, vec!["1"]);
        assert_eq!(list.find_task("1").unwrap().status, Status::Completed);
    }

    #[test]
    fn auto_complete_cascades_through_grandparents() {
        let mut list = list_with(&["P"]);
        list.add_task("1", "c", AddOptions::default()).unwrap();
        list.add_task("1.1", "gc", AddOptions::default()).unwrap();
        let outcome = list
            .update_task(
                "1.1.1",
                UpdateOptions {
                    status: Some(Status::Completed),
                    ..UpdateOptions::default()
                },
            )
            .unwrap();
        assert_eq!(outcome.auto_completed, vec!["1.1", "1"]);
    }

    #[test]
    fn renumber_is_idempotent_and_preserves_metadata() {
        let mut list = list_with(&["A", "B"]);
        list.update_task(
            "2",
            UpdateOptions {
                stream: Some(3),
                blocked_by: Some(vec!["1".into()]),
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        let before = list.clone();
        list.renumber();
        assert_eq!(
            serde_json::to_string(&before).unwrap(),
            serde_json::to_string(&list).unwrap()
        );
    }

    #[test]
    fn blocked_by_update_assigns_stable_ids_lazily() {
        let mut list = list_with(&["A", "B"]);
        assert!(list.tasks[0].stable_id.is_none());
        list.update_task(
            "2",
            UpdateOptions {
                blocked_by: Some(vec!["1".into()]),
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        let a_sid = list.tasks[0].stable_id.clone().unwrap();
        assert_eq!(list.tasks[1].blocked_by, vec![a_sid]);
        assert!(list.tasks[1].stable_id.is_some());
    }

    #[test]
    fn self_dependency_rejected_without_mutation() {
        let mut list = list_with(&["A"]);
        let err = list
            .update_task(
                "1",
                UpdateOptions {
                    blocked_by: Some(vec!["1".into()]),
                    ..UpdateOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Conflict(ConflictKind::SelfDependency(_))
        ));
        assert!(list.tasks[0].blocked_by.is_empty());
    }

    #[test]
    fn cycle_rejected_without_mutation() {
        let mut list = list_with(&["A", "B"]);
        list.update_task(
            "2",
            UpdateOptions {
                blocked_by: Some(vec!["1".into()]),
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        let b_blocked = list.tasks[1].blocked_by.clone();
        let err = list
            .update_task(
                "1",
                UpdateOptions {
                    blocked_by: Some(vec!["2".into()]),
                    ..UpdateOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Conflict(ConflictKind::CircularDependency(_))
        ));
        assert!(list.tasks[0].blocked_by.is_empty());
        assert_eq!(list.tasks[1].blocked_by, b_blocked);
    }

    #[test]
    fn clearing_blocked_by_with_empty_set() {
        let mut list = list_with(&["A", "B"]);
        list.update_task(
            "2",
            UpdateOptions {
                blocked_by: Some(vec!["1".into()]),
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        list.update_task(
            "2",
            UpdateOptions {
                blocked_by: Some(vec![]),
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        assert!(list.tasks[1].blocked_by.is_empty());
    }

    #[test]
    fn release_clears_owner() {
        let mut list = list_with(&["A"]);
        list.update_task(
            "1",
            UpdateOptions {
                owner: Some("agent".into()),
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        assert_eq!(list.tasks[0].owner.as_deref(), Some("agent"));
        list.update_task(
            "1",
            UpdateOptions {
                release: true,
                ..UpdateOptions::default()
            },
        )
        .unwrap();
        assert!(list.tasks[0].owner.is_none());
    }

    #[test]
    fn depth_limit_enforced() {
        let mut list = list_with(&["A"]);
        let mut parent = String::from("1");
        for _ in 0..9 {
            parent = list.add_task(&parent, "deep", AddOptions::default()).unwrap();
        }
        let err = list.add_task(&parent, "too deep", AddOptions::default());
        assert!(matches!(err, Err(Error::ResourceLimit(_))));
    }

    #[test]
    fn parent_id_helper() {
        assert_eq!(parent_id("1.2.3"), "1.2");
        assert_eq!(parent_id("1"), "");
        assert_eq!(root_id("3.2.1"), "3");
    }
}
